use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::ids::ItemId;

/// Storage type of a field, either on an item or in a schema definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Integer,
    Number,
    /// Reference to another item. Only host-owned fields carry this type.
    Reference,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Reference => "reference",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "text" => Ok(Self::Text),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "reference" => Ok(Self::Reference),
            _ => Err(CoreError::Serialization(format!("unknown field type: {s}"))),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Number(f64),
    Reference(ItemId),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b).is_eq(),
            (Self::Reference(a), Self::Reference(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    /// The value a cleared field of the given type holds.
    pub fn zero(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => FieldValue::Text(String::new()),
            FieldType::Integer => FieldValue::Integer(0),
            FieldType::Number => FieldValue::Number(0.0),
            FieldType::Reference => FieldValue::Null,
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("<null>"),
            FieldValue::Text(s) => write!(f, "'{s}'"),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Reference(id) => write!(f, "-> {id}"),
        }
    }
}
