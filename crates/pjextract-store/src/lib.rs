//! Output layer: formatted tables serialized to an `.xlsx` workbook.

mod error;
pub use error::StoreError;

pub mod workbook;
pub use workbook::{Artifact, export_workbook, write_sheets};
