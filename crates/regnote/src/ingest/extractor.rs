//! Result file extractor
//!
//! Files are comma-delimited with a header row. Columns are positional:
//! accession, test code, raw result value. Extra columns are ignored.

use crate::config::TrackedTest;
use crate::error::ExtractionError;
use csv::{ReaderBuilder, Trim};
use regnote_db::RawResult;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Minimum number of columns every data row must carry.
pub const REQUIRED_COLUMNS: usize = 3;

/// Parses result files and keeps rows for tracked test codes.
#[derive(Debug, Clone)]
pub struct ResultExtractor {
    tracked_codes: HashSet<String>,
}

impl ResultExtractor {
    pub fn new<'a>(tracked: impl IntoIterator<Item = &'a TrackedTest>) -> Self {
        Self {
            tracked_codes: tracked.into_iter().map(|t| t.code.clone()).collect(),
        }
    }

    pub fn is_tracked(&self, code: &str) -> bool {
        self.tracked_codes.contains(code)
    }

    /// Parse the whole file and return the tracked rows in file order.
    ///
    /// Nothing is written here: one short row fails the whole file, so the
    /// caller can commit all rows or none.
    pub fn extract(&self, path: &Path) -> Result<Vec<RawResult>, ExtractionError> {
        let file = File::open(path).map_err(|source| ExtractionError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);

        let source_file = path.to_string_lossy().into_owned();
        let mut results = Vec::new();

        for record in reader.records() {
            let record = record.map_err(|source| ExtractionError::Read {
                path: path.to_path_buf(),
                source,
            })?;

            if record.len() < REQUIRED_COLUMNS {
                return Err(ExtractionError::MalformedRow {
                    path: path.to_path_buf(),
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    expected: REQUIRED_COLUMNS,
                    found: record.len(),
                });
            }

            let test_code = &record[1];
            if !self.is_tracked(test_code) {
                continue;
            }

            results.push(RawResult::new(
                source_file.as_str(),
                &record[0],
                test_code,
                &record[2],
            ));
        }

        debug!(path = %path.display(), kept = results.len(), "Extracted result file");
        Ok(results)
    }
}
