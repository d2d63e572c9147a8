//! Process-level run locking.
//!
//! The ledger assumes a single writer. Every pipeline run takes an exclusive
//! lock on a file next to the ledger so that a second invocation (e.g. an
//! overlapping scheduler tick) fails fast instead of interleaving writes.
//!
//! Uses the `fs2` crate for cross-platform file locking (MSRV 1.75 compatible).

use chrono::Utc;
use fs2::FileExt;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Ledger is locked by another run: {0}")]
    Locked(PathBuf),

    #[error("Failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    #[error("Failed to acquire lock: {0}")]
    AcquireFailed(#[source] io::Error),
}

/// Holds the exclusive run lock until dropped.
pub struct RunLockGuard {
    _file: File,
    lock_path: PathBuf,
    sidecar_path: Option<PathBuf>,
}

impl RunLockGuard {
    /// Get the path to the lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

#[derive(Serialize)]
struct LockSidecar {
    pid: u32,
    exe: Option<String>,
    timestamp: String,
}

fn sidecar_path_for(lock_path: &Path) -> PathBuf {
    let ext = lock_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("lock");
    lock_path.with_extension(format!("{ext}.json"))
}

fn write_lock_sidecar(lock_path: &Path) -> Option<PathBuf> {
    let sidecar = LockSidecar {
        pid: std::process::id(),
        exe: std::env::current_exe().ok().map(|p| p.display().to_string()),
        timestamp: Utc::now().to_rfc3339(),
    };
    let sidecar_path = sidecar_path_for(lock_path);
    match serde_json::to_vec_pretty(&sidecar)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        .and_then(|payload| fs::write(&sidecar_path, payload))
    {
        Ok(()) => Some(sidecar_path),
        Err(e) => {
            warn!(
                "Failed to write lock sidecar {}: {}",
                sidecar_path.display(),
                e
            );
            None
        }
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        debug!("Releasing run lock: {}", self.lock_path.display());
        if let Some(path) = &self.sidecar_path {
            if let Err(e) = fs::remove_file(path) {
                debug!("Failed to remove lock sidecar {}: {}", path.display(), e);
            }
        }
        // File is unlocked when closed (fs2 uses flock/LockFileEx)
    }
}

impl std::fmt::Debug for RunLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLockGuard")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

/// Get the lock file path for a ledger path.
///
/// Examples:
/// - `/data/regnote.sqlite3` → `/data/regnote.sqlite3.lock`
/// - `/data/ledger` → `/data/ledger.lock`
pub fn lock_path_for(ledger_path: &Path) -> PathBuf {
    let mut lock_path = ledger_path.to_path_buf();
    match lock_path.extension() {
        Some(ext) => {
            let new_ext = format!("{}.lock", ext.to_string_lossy());
            lock_path.set_extension(new_ext);
        }
        None => {
            lock_path.set_extension("lock");
        }
    }
    lock_path
}

/// Try to take the run lock for a ledger.
///
/// Non-blocking: if another process holds the lock this returns
/// `Err(LockError::Locked)` immediately.
pub fn try_lock_exclusive(ledger_path: &Path) -> Result<RunLockGuard, LockError> {
    let lock_path = lock_path_for(ledger_path);

    if let Some(parent) = lock_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(LockError::CreateFailed)?;
        }
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(LockError::CreateFailed)?;

    // Fully qualified: std::fs::File::try_lock_exclusive (1.89+) has a different error type
    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            info!("Acquired run lock: {}", lock_path.display());
            let sidecar_path = write_lock_sidecar(&lock_path);
            Ok(RunLockGuard {
                _file: file,
                lock_path,
                sidecar_path,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            debug!("Ledger is locked by another process");
            Err(LockError::Locked(ledger_path.to_path_buf()))
        }
        Err(e) => Err(LockError::AcquireFailed(e)),
    }
}
