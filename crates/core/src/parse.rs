use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::error::CoreError;
use crate::record::{PropertyRecord, ValueKind};

const MIN_FIELDS: usize = 7;
const MAX_FIELDS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma-separated, header row first, 7 to 9 positional fields per row.
    Tabular,
    /// JSON array of objects with named fields.
    Structured,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "csv" => Ok(Self::Tabular),
            "json" => Ok(Self::Structured),
            _ => Err(CoreError::UnrecognizedFileFormat(if ext.is_empty() {
                "<none>".to_string()
            } else {
                format!(".{ext}")
            })),
        }
    }
}

/// Read and parse an input file, picking the format from its extension.
pub fn parse_file(path: &Path) -> Result<(InputFormat, Vec<PropertyRecord>), CoreError> {
    let format = InputFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    let records = parse_str(&text, format)?;
    Ok((format, records))
}

/// Parse input text into records, preserving input order.
pub fn parse_str(input: &str, format: InputFormat) -> Result<Vec<PropertyRecord>, CoreError> {
    match format {
        InputFormat::Tabular => parse_tabular(input),
        InputFormat::Structured => parse_structured(input),
    }
}

fn parse_tabular(input: &str) -> Result<Vec<PropertyRecord>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(0);
        let n = row.len();
        if !(MIN_FIELDS..=MAX_FIELDS).contains(&n) {
            return Err(CoreError::MalformedRecord {
                line,
                reason: format!(
                    "expected {MIN_FIELDS} to {MAX_FIELDS} fields in CSV record, found {n}"
                ),
            });
        }
        let field = |i: usize| row.get(i).unwrap_or("").to_string();
        let kind = parse_kind(&field(5), line)?;
        records.push(
            PropertyRecord::new(field(0), field(1), field(2), field(3), field(4), kind)
                .with_file(field(6), field(7))
                .with_link(field(8)),
        );
    }
    Ok(records)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StructuredRow {
    #[serde(deserialize_with = "lenient_string")]
    external_id: String,
    #[serde(deserialize_with = "lenient_string")]
    component: String,
    #[serde(deserialize_with = "lenient_string")]
    display_category: String,
    #[serde(deserialize_with = "lenient_string")]
    display_name: String,
    #[serde(deserialize_with = "lenient_string")]
    display_value: String,
    #[serde(deserialize_with = "lenient_string")]
    meta_type: String,
    #[serde(deserialize_with = "lenient_string")]
    filelink: String,
    #[serde(deserialize_with = "lenient_string")]
    filename: String,
    #[serde(deserialize_with = "lenient_string")]
    link: String,
}

fn parse_structured(input: &str) -> Result<Vec<PropertyRecord>, CoreError> {
    let rows: Vec<StructuredRow> = serde_json::from_str(input)?;
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let kind = parse_kind(&row.meta_type, i + 1)?;
            Ok(PropertyRecord::new(
                row.external_id,
                row.component,
                row.display_category,
                row.display_name,
                row.display_value,
                kind,
            )
            .with_file(row.filelink, row.filename)
            .with_link(row.link))
        })
        .collect()
}

// An absent value kind means plain text.
fn parse_kind(raw: &str, line: usize) -> Result<ValueKind, CoreError> {
    if raw.trim().is_empty() {
        return Ok(ValueKind::Text);
    }
    ValueKind::parse(raw).ok_or_else(|| CoreError::MalformedRecord {
        line,
        reason: format!("unexpected value kind {raw:?}"),
    })
}

/// Accept strings, numbers, booleans and null where a string is expected.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "externalId,component,displayCategory,displayName,displayValue,metaType,filelink,filename,link\n";

    #[test]
    fn tabular_rows_of_seven_to_nine_fields() {
        let input = format!(
            "{HEADER}W1,Wall 1,Data,Cost,150,Int,\n\
             W2,Wall 2,Data,Sheet,Drawing,File,urn:x,a.pdf\n\
             W3,Wall 3,Data,Spec,Vendor,Link,,,https://example.com\n"
        );
        let records = parse_str(&input, InputFormat::Tabular).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].target_id(), "W1");
        assert_eq!(records[0].value_kind(), ValueKind::Int);
        assert_eq!(records[1].file_ref(), "urn:x");
        assert_eq!(records[1].file_name(), "a.pdf");
        assert_eq!(records[2].link_target(), "https://example.com");
        assert!(records.iter().all(|r| !r.can_apply()));
    }

    #[test]
    fn tabular_row_with_six_fields_is_malformed() {
        let input = format!("{HEADER}W1,Wall 1,Data,Cost,150,Int,\nW2,Wall 2,Data,Cost,150,Int\n");
        match parse_str(&input, InputFormat::Tabular) {
            Err(CoreError::MalformedRecord { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("found 6"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn tabular_row_with_ten_fields_is_malformed() {
        let input = format!("{HEADER}W1,Wall 1,Data,Cost,150,Int,a,b,c,d\n");
        assert!(matches!(
            parse_str(&input, InputFormat::Tabular),
            Err(CoreError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn unknown_value_kind_is_malformed() {
        let input = format!("{HEADER}W1,Wall 1,Data,Cost,150,Currency,\n");
        assert!(matches!(
            parse_str(&input, InputFormat::Tabular),
            Err(CoreError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn structured_defaults_missing_fields() {
        let input = r#"[
            {"externalId": "W1", "component": "Wall 1", "displayCategory": "Data",
             "displayName": "Cost", "displayValue": 150, "metaType": "Int"},
            {"externalId": "W2", "displayName": "Note"}
        ]"#;
        let records = parse_str(input, InputFormat::Structured).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw_value(), "150");
        assert_eq!(records[1].component(), "");
        assert_eq!(records[1].group_name(), "");
        assert_eq!(records[1].value_kind(), ValueKind::Text);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a/props.CSV")).unwrap(), InputFormat::Tabular);
        assert_eq!(InputFormat::from_path(Path::new("props.json")).unwrap(), InputFormat::Structured);
        match InputFormat::from_path(Path::new("props.xlsx")) {
            Err(CoreError::UnrecognizedFileFormat(ext)) => assert_eq!(ext, ".xlsx"),
            other => panic!("expected UnrecognizedFileFormat, got {other:?}"),
        }
    }
}
