use std::path::PathBuf;

use metaprop_core::{FieldType, ValueKind};
use thiserror::Error;

/// Why a single record was left out of the apply phase.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("{count} fields share that name")]
    AmbiguousFieldName { count: usize },

    #[error("field has type {existing}, record value kind is {kind}")]
    TypeMismatch { existing: FieldType, kind: ValueKind },

    #[error("field is read-only")]
    ReadOnlyField,

    #[error("unrecognized grouping {label:?}")]
    UnrecognizedGroup { label: String },

    #[error("value does not parse: {message}")]
    ValueParseFailure { message: String },

    #[error("no field to clear")]
    NoFieldToClear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub target_id: String,
    pub component: String,
    pub field_name: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingFailure {
    pub field_name: String,
    pub cause: String,
}

/// Counts and diagnostics for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub input: Option<PathBuf>,
    pub parsed: usize,
    pub model_properties: usize,
    /// Component labels of records whose target item does not exist.
    pub missing_targets: Vec<String>,
    pub rejections: Vec<Rejection>,
    pub schema_requests: usize,
    pub fields_created: Vec<String>,
    pub binding_failures: Vec<BindingFailure>,
    pub applied: usize,
    /// Applicable records whose field failed to materialize.
    pub skipped: usize,
}

impl ImportReport {
    pub fn rejected(&self, reason: fn(&RejectReason) -> bool) -> usize {
        self.rejections.iter().filter(|r| reason(&r.reason)).count()
    }
}
