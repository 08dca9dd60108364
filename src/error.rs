//! Error types for container inspection and decoding sessions.
//!
//! Every public operation on a [`crate::bfd::Bfd`] or
//! [`crate::opcodes::Opcodes`] returns [`Result`], so callers see failures at
//! the call that caused them instead of through a shared "last error" slot.

use thiserror::Error;

use crate::core::arch::ArchId;
use crate::core::binary::Endian;

/// Main error type for objscope operations.
#[derive(Debug, Error)]
pub enum BfdError {
    /// Operation attempted on a closed or never-opened container or session
    #[error("BFD not initialized")]
    Uninitialized,

    /// Bad argument shape, symlinked descriptor, out-of-range content read
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The binary could not be acquired by the native engine
    #[error("Unable to open {path}: {reason}")]
    OpenFailure { path: String, reason: String },

    /// None of the archive, object or core probes matched
    #[error("File format not recognized: {0}")]
    FormatUnrecognized(String),

    /// The decoding engine cannot handle this architecture triple
    #[error("Unsupported decoder configuration: arch {arch}, machine {machine:#x}, endian {endian}")]
    DecodeUnsupported {
        arch: ArchId,
        machine: u64,
        endian: Endian,
    },

    /// Native release failed; the handle is still marked closed
    #[error("Close failed: {0}")]
    CloseFailure(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for objscope operations
pub type Result<T> = std::result::Result<T, BfdError>;
