pub mod model;

pub use model::{CSV_HEADER, TestModel};
