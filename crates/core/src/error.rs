use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unhandled meta property file format: {0}")]
    UnrecognizedFileFormat(String),

    #[error("malformed record {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cannot parse {raw:?} as {expected}")]
    ValueParse { raw: String, expected: &'static str },
}
