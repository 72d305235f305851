// Data converter module: projection, value conversion and batch emission
pub mod dialect;
pub mod projector;
pub mod sql_emitter;
pub mod value_converter;


pub use dialect::{validate_identifier, TargetDialect};
pub use projector::{default_rules, ColumnProjector, USERS_EXTENSION_COLUMNS};
pub use sql_emitter::{BatchAccumulator, SqlEmitter, TableAccumulator, DEFAULT_HEADER_LINES};
pub use value_converter::{decode_string_literal, normalize_timestamp, ValueConverter};
