use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no schema store is configured")]
    NoSchemaStore,

    #[error("no open transaction group")]
    NoTransaction,

    #[error("transaction state: {0}")]
    TransactionState(String),

    #[error("field {0} is read-only")]
    ReadOnlyField(String),

    #[error("field {field} holds {expected} values")]
    ValueTypeMismatch { field: String, expected: String },

    #[error("definition {name} already exists with type {existing}, requested {requested}")]
    DefinitionTypeConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("cannot bind {name}: {reason}")]
    BindingRejected { name: String, reason: String },

    #[error("core error: {0}")]
    Core(#[from] metaprop_core::CoreError),
}
