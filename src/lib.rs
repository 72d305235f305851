pub mod error;
pub mod types;
pub mod dump_parser;
pub mod data_converter;
pub mod monitoring;
pub mod pipeline;

pub use error::{ConvertError, Result};
pub use pipeline::{convert_file, convert_lines, convert_str, ConversionConfig, ConversionSession};
