use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::field_value::{FieldType, FieldValue};
use crate::ids::ItemId;

/// How a record's raw value is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Text,
    Int,
    Double,
    Link,
    File,
    DeleteOverride,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Int => "Int",
            Self::Double => "Double",
            Self::Link => "Link",
            Self::File => "File",
            Self::DeleteOverride => "DeleteOverride",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Text" => Some(Self::Text),
            "Int" | "Integer" => Some(Self::Int),
            "Double" | "Number" => Some(Self::Double),
            "Link" => Some(Self::Link),
            "File" => Some(Self::File),
            "DeleteOverride" => Some(Self::DeleteOverride),
            _ => None,
        }
    }

    /// Field type a new field for this kind is created with.
    /// `None` for `DeleteOverride`, which only ever targets existing fields.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Text | Self::Link | Self::File => Some(FieldType::Text),
            Self::Int => Some(FieldType::Integer),
            Self::Double => Some(FieldType::Number),
            Self::DeleteOverride => None,
        }
    }

    pub fn accepts(&self, field_type: FieldType) -> bool {
        match self.field_type() {
            Some(required) => required == field_type,
            None => true,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One imported property fact, targeting a single item field.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    target_id: String,
    component: String,
    group_name: String,
    field_name: String,
    raw_value: String,
    value_kind: ValueKind,
    link_target: String,
    file_ref: String,
    file_name: String,
    can_apply: bool,
}

impl PropertyRecord {
    pub fn new(
        target_id: impl Into<String>,
        component: impl Into<String>,
        group_name: impl Into<String>,
        field_name: impl Into<String>,
        raw_value: impl Into<String>,
        value_kind: ValueKind,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            component: component.into(),
            group_name: group_name.into(),
            field_name: field_name.into(),
            raw_value: raw_value.into(),
            value_kind,
            link_target: String::new(),
            file_ref: String::new(),
            file_name: String::new(),
            can_apply: false,
        }
    }

    pub fn with_link(mut self, link_target: impl Into<String>) -> Self {
        self.link_target = link_target.into();
        self
    }

    pub fn with_file(mut self, file_ref: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.file_ref = file_ref.into();
        self.file_name = file_name.into();
        self
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn item_id(&self) -> ItemId {
        ItemId::new(self.target_id.as_str())
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub fn link_target(&self) -> &str {
        &self.link_target
    }

    pub fn file_ref(&self) -> &str {
        &self.file_ref
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn can_apply(&self) -> bool {
        self.can_apply
    }

    /// Set once planning has proven a usable target field exists or will exist.
    pub fn mark_applicable(&mut self) {
        self.can_apply = true;
    }

    /// Whether this record targets the model as a whole rather than an item.
    pub fn is_model_property(&self, prefix: &str) -> bool {
        self.target_id.starts_with(prefix)
    }

    /// Text written for text-like kinds.
    pub fn display_value(&self) -> String {
        match self.value_kind {
            ValueKind::Link => format!("link:{}:{}", self.raw_value, self.link_target),
            ValueKind::File => {
                format!("file:{}:{}:{}", self.raw_value, self.file_ref, self.file_name)
            }
            ValueKind::DeleteOverride => String::new(),
            ValueKind::Text | ValueKind::Int | ValueKind::Double => self.raw_value.clone(),
        }
    }

    /// Convert the raw value into what gets stored in a field of `field_type`.
    pub fn to_field_value(&self, field_type: FieldType) -> Result<FieldValue, CoreError> {
        match self.value_kind {
            ValueKind::Text | ValueKind::Link | ValueKind::File => {
                Ok(FieldValue::Text(self.display_value()))
            }
            ValueKind::Int => parse_integer(&self.raw_value).map(FieldValue::Integer),
            ValueKind::Double => parse_number(&self.raw_value).map(FieldValue::Number),
            ValueKind::DeleteOverride => Ok(FieldValue::zero(field_type)),
        }
    }

    /// Check that the raw value converts, without a target field at hand.
    pub fn validate_value(&self) -> Result<(), CoreError> {
        match self.value_kind {
            ValueKind::Int => parse_integer(&self.raw_value).map(|_| ()),
            ValueKind::Double => parse_number(&self.raw_value).map(|_| ()),
            ValueKind::Text | ValueKind::Link | ValueKind::File | ValueKind::DeleteOverride => {
                Ok(())
            }
        }
    }
}

fn parse_integer(raw: &str) -> Result<i64, CoreError> {
    raw.trim().parse::<i64>().map_err(|_| CoreError::ValueParse {
        raw: raw.to_string(),
        expected: "integer",
    })
}

fn parse_number(raw: &str) -> Result<f64, CoreError> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(CoreError::ValueParse {
            raw: raw.to_string(),
            expected: "number",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ValueKind, raw: &str) -> PropertyRecord {
        PropertyRecord::new("W1", "Wall 1", "Data", "Cost", raw, kind)
    }

    #[test]
    fn link_and_file_display_values() {
        let link = record(ValueKind::Link, "Spec").with_link("https://example.com/spec");
        assert_eq!(link.display_value(), "link:Spec:https://example.com/spec");

        let file = record(ValueKind::File, "Drawing").with_file("urn:abc", "drawing.pdf");
        assert_eq!(file.display_value(), "file:Drawing:urn:abc:drawing.pdf");
        assert_eq!(
            file.to_field_value(FieldType::Text).unwrap(),
            FieldValue::Text("file:Drawing:urn:abc:drawing.pdf".into())
        );
    }

    #[test]
    fn numeric_conversion() {
        assert_eq!(
            record(ValueKind::Int, " 150 ").to_field_value(FieldType::Integer).unwrap(),
            FieldValue::Integer(150)
        );
        assert_eq!(
            record(ValueKind::Double, "2.5").to_field_value(FieldType::Number).unwrap(),
            FieldValue::Number(2.5)
        );
    }

    #[test]
    fn numeric_parse_failure_is_not_zero() {
        let err = record(ValueKind::Int, "twelve").to_field_value(FieldType::Integer);
        assert!(matches!(err, Err(CoreError::ValueParse { expected: "integer", .. })));
        assert!(record(ValueKind::Double, "NaN").validate_value().is_err());
        assert!(record(ValueKind::Double, "").validate_value().is_err());
    }

    #[test]
    fn delete_override_writes_type_zero() {
        let rec = record(ValueKind::DeleteOverride, "ignored");
        assert_eq!(rec.to_field_value(FieldType::Integer).unwrap(), FieldValue::Integer(0));
        assert_eq!(rec.to_field_value(FieldType::Number).unwrap(), FieldValue::Number(0.0));
        assert_eq!(rec.to_field_value(FieldType::Text).unwrap(), FieldValue::Text(String::new()));
        assert_eq!(rec.to_field_value(FieldType::Reference).unwrap(), FieldValue::Null);
    }

    #[test]
    fn compatibility() {
        assert!(ValueKind::Link.accepts(FieldType::Text));
        assert!(!ValueKind::Text.accepts(FieldType::Integer));
        assert!(!ValueKind::Int.accepts(FieldType::Number));
        assert!(ValueKind::DeleteOverride.accepts(FieldType::Reference));
    }

    #[test]
    fn model_prefix() {
        let rec = PropertyRecord::new("doc_1234", "Model", "Data", "Client", "ACME", ValueKind::Text);
        assert!(rec.is_model_property("doc_"));
        assert!(!record(ValueKind::Text, "x").is_model_property("doc_"));
    }
}
