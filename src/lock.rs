//! File-based locking for per-scope writer serialization.
//!
//! Cross-platform (fs2) advisory locks:
//! - Exclusive: ровно один писатель на scope; read-increment-write счётчика
//!   выполняется только под этим локом (плюс in-process mutex в Timeline).
//!
//! Lock file path: <scope_dir>/LOCK
//! Lock is released on Drop.

use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::consts::LOCK_FILE;
use crate::errors::StoreError;

pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

fn lock_file_path(scope_dir: &Path) -> PathBuf {
    scope_dir.join(LOCK_FILE)
}

/// Acquire the scope's exclusive lock. Blocks until acquired.
pub fn acquire_exclusive_lock(scope_dir: &Path) -> Result<LockGuard, StoreError> {
    let path = lock_file_path(scope_dir);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|e| StoreError::io(&path, e))?;
    file.lock_exclusive()
        .map_err(|e| StoreError::io(&path, e))?;
    Ok(LockGuard { file, path })
}
