pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod undo;

pub use error::StorageError;
pub use sqlite::SqliteHost;
pub use traits::*;
