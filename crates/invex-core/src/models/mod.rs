//! Runtime data models: extracted rows and extraction results.

pub mod result;
pub mod row;

pub use result::{ExtractionResult, ExtractionStatus};
pub use row::{ExtractedRow, FieldValue};
