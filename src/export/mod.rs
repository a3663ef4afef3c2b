//! Export decoded contents to disk.

pub mod content;

pub use content::{export_contents, ExportFilter};
