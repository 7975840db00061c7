//! Cast vote record exports as produced by scanners, before they reach the
//! database.

mod export;
mod record;
mod report;

pub use export::{CvrExportMetadata, ExportDirectoryName};
pub use record::{PageImage, PageImageRef, ParsedRecord, WriteInMark};
pub use report::{BatchMetadata, RecordRootHasher, ReportMetadata};
