use metaprop_core::CoreError;
use metaprop_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("{component} property {field}: {source}")]
    ValueParse {
        component: String,
        field: String,
        source: CoreError,
    },
}
