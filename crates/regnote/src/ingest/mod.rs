//! Ingest stage: directory scanning and result extraction.

pub mod extractor;
pub mod scanner;

pub use extractor::{ResultExtractor, REQUIRED_COLUMNS};
pub use scanner::{FileScanner, ScanOutcome};
