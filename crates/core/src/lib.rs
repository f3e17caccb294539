pub mod error;
pub mod field_value;
pub mod group;
pub mod ids;
pub mod parse;
pub mod record;

pub use error::CoreError;
pub use field_value::{FieldType, FieldValue};
pub use group::DisplayGroup;
pub use ids::*;
pub use parse::{InputFormat, parse_file, parse_str};
pub use record::{PropertyRecord, ValueKind};
