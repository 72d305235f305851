use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, Level};

use dumpshift::monitoring::ConversionReport;
use dumpshift::{convert_file, ConversionConfig, ConvertError};

#[derive(Parser)]
#[command(name = "dumpshift")]
#[command(about = "Convert a PostgreSQL data dump into a MariaDB batch INSERT script")]
#[command(version)]
#[command(long_about = "Dumpshift reads the data section of a PostgreSQL dump, either COPY blocks or INSERT statements, converts every value to MariaDB syntax and writes one batch INSERT per table.")]
#[command(after_help = "EXAMPLES:
    # Convert a pg_dump data file
    dumpshift backup.sql mariadb_import.sql")]
struct Cli {
    /// PostgreSQL dump file to read
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// MariaDB script to write
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging()?;

    info!("Starting dumpshift v{}", env!("CARGO_PKG_VERSION"));

    match execute_conversion(&cli).await {
        Ok(report) => {
            info!("Conversion completed successfully!");
            info!("Output written to: {:?}", cli.output);
            info!("Summary: {}", report.summary());
            for (table, rows) in &report.tables {
                info!("  {}: {} rows", table, rows);
            }
        }
        Err(e) => {
            eprintln!("Conversion failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Run the conversion with the built-in MariaDB configuration
async fn execute_conversion(cli: &Cli) -> Result<ConversionReport, ConvertError> {
    let config = ConversionConfig::default();
    debug!("Configuration: {}", serde_json::to_string(&config)?);

    let report = convert_file(&cli.input, &cli.output, config).await?;
    debug!("Report: {}", serde_json::to_string(&report)?);
    Ok(report)
}

/// Initialize logging to stderr so the script path stays the only output
fn initialize_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
