//! Bounded file loading for container parsing.
//!
//! Inputs are memory-mapped read-only and handed out as `Bytes`, so archive
//! members and sections slice the one mapping without copying. `IOLimits`
//! caps what a single open may map and what a single content read may copy.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Defines the resource limits for I/O operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
    /// The largest number of bytes a single section content read may return.
    ///
    /// Defaults to `max_file_size`, so any section of an accepted file can be
    /// read whole unless a caller lowers it.
    pub max_read_bytes: u64,
}

const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_read_bytes: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl IOLimits {
    /// Fails with `ReadLimitExceeded` when `len` is over the per-read cap.
    pub fn check_read(&self, len: u64) -> Result<()> {
        if len > self.max_read_bytes {
            warn!(
                requested = len,
                limit = self.max_read_bytes,
                "Read limit exceeded"
            );
            return Err(IoError::ReadLimitExceeded {
                limit: self.max_read_bytes,
                requested: len,
            });
        }
        Ok(())
    }
}

/// Maps an already open file. `path` is only used for diagnostics.
pub fn load_file(file: &File, path: &Path, limits: &IOLimits) -> Result<Bytes> {
    let file_size = file.metadata()?.len();

    debug!(
        path = %path.display(),
        size = file_size,
        limits.max_file_size = limits.max_file_size,
        "Mapping file"
    );

    if file_size > limits.max_file_size {
        warn!(
            path = %path.display(),
            size = file_size,
            limit = limits.max_file_size,
            "File is too large"
        );
        return Err(IoError::FileTooLarge {
            limit: limits.max_file_size,
            found: file_size,
        });
    }

    // memmap cannot map empty files
    if file_size == 0 {
        return Ok(Bytes::new());
    }

    // Safety: read-only map of a regular file; the mapping owns its own reference.
    let mmap = unsafe { Mmap::map(file)? };
    trace!(path = %path.display(), len = mmap.len(), "Mapped file");
    Ok(Bytes::from_owner(mmap))
}

/// Opens and maps the file at `path`.
pub fn load_path(path: &Path, limits: &IOLimits) -> Result<Bytes> {
    let file = File::open(path)?;
    load_file(&file, path, limits)
}

/// True when `path` itself is a symbolic link (not followed).
pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
