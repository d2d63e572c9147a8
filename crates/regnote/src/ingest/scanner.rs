//! Source directory scanner
//!
//! Lists the drop directory once per run and hands every regular file to the
//! ledger. Deduplication is the ledger's job: known paths are ignored there, so
//! scanning an unchanged directory registers nothing.

use crate::error::{DirectoryError, PipelineError};
use regnote_db::LedgerStore;
use std::path::PathBuf;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Regular files present in the directory
    pub seen: usize,
    /// Files the ledger did not know before this scan
    pub registered: u64,
}

/// Non-recursive scanner over one source directory.
#[derive(Debug, Clone)]
pub struct FileScanner {
    directory: PathBuf,
}

impl FileScanner {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// List regular files directly inside the directory, sorted by path.
    ///
    /// Subdirectories are not descended into and symlinks are not followed.
    pub fn list(&self) -> Result<Vec<String>, DirectoryError> {
        let metadata = std::fs::metadata(&self.directory).map_err(|_| DirectoryError::NotFound {
            path: self.directory.clone(),
        })?;
        if !metadata.is_dir() {
            return Err(DirectoryError::NotADirectory {
                path: self.directory.clone(),
            });
        }

        let walker = WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        let mut paths = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|source| DirectoryError::Unreadable {
                path: self.directory.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                debug!(path = %entry.path().display(), "Skipping non-file entry");
                continue;
            }
            paths.push(entry.path().to_string_lossy().into_owned());
        }

        Ok(paths)
    }

    /// List the directory and register every file with the ledger.
    pub async fn scan(&self, ledger: &dyn LedgerStore) -> Result<ScanOutcome, PipelineError> {
        let paths = self.list()?;
        let registered = ledger.register_files(&paths).await?;

        info!(
            directory = %self.directory.display(),
            seen = paths.len(),
            registered,
            "Scanned source directory"
        );

        Ok(ScanOutcome {
            seen: paths.len(),
            registered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_regular_files_only() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.csv"), "h\n").unwrap();
        fs::write(tmp.path().join("a.csv"), "h\n").unwrap();
        fs::create_dir(tmp.path().join("archive")).unwrap();
        fs::write(tmp.path().join("archive").join("old.csv"), "h\n").unwrap();

        let paths = FileScanner::new(tmp.path()).list().unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.csv"));
        assert!(paths[1].ends_with("b.csv"));
    }

    #[test]
    fn test_empty_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(FileScanner::new(tmp.path()).list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = FileScanner::new(tmp.path().join("missing")).list().unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound { .. }));
    }

    #[test]
    fn test_file_instead_of_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("results.csv");
        fs::write(&file, "h\n").unwrap();

        let err = FileScanner::new(&file).list().unwrap_err();
        assert!(matches!(err, DirectoryError::NotADirectory { .. }));
    }
}
