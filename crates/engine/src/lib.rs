pub mod apply;
pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod import;
pub mod log;
pub mod plan;
pub mod report;
pub mod sync;

pub use batch::Batch;
pub use config::ImportConfig;
pub use error::EngineError;
pub use import::{FixedInput, ImportOutcome, Importer, InputSelector};
pub use log::ImportLog;
pub use plan::{Plan, SchemaFieldRequest};
pub use report::{BindingFailure, ImportReport, RejectReason, Rejection};
pub use sync::ScratchStore;
