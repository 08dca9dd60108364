//! The native format engine seam.
//!
//! A [`NativeHandle`] is what a [`crate::bfd::Bfd`] drives: format probes,
//! container attributes, section and symbol enumeration, archive members.
//! Every call returns its own diagnostic on failure; there is no shared
//! "last error" to read afterwards.
//!
//! The object-file engine in [`object_file`] is the default implementation.
//! Tests and embedders can supply their own handle through
//! [`crate::bfd::Source::Native`].

pub mod elf;
pub mod object_file;

use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::core::arch::ArchId;
use crate::core::binary::{Endian, FileFlags, Format};
use crate::core::section::SectionFlags;
use crate::error::{BfdError, Result};

/// Failure reported by a native engine call, with the engine's diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NativeError {
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Container level attributes exposed through get/set calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub filename: String,
    pub target: String,
    pub arch: ArchId,
    pub machine: u64,
    pub endian: Endian,
    pub header_endian: Endian,
    /// Pointer width in bits, 0 when it cannot be determined
    pub arch_size: u32,
    pub cacheable: bool,
    pub start_address: u64,
    pub file_flags: FileFlags,
    /// Flags the target format can represent at all
    pub applicable_file_flags: FileFlags,
    pub has_map: bool,
    pub is_thin_archive: bool,
    pub symbol_leading_char: Option<char>,
    pub symbol_count: usize,
    pub dynamic_symbol_count: usize,
}

/// One section entry as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSection {
    pub index: usize,
    pub name: String,
    pub size: u64,
    pub vma: u64,
    pub lma: u64,
    /// Alignment as a power-of-two exponent
    pub alignment_power: u32,
    pub file_offset: u64,
    pub entry_size: u64,
    pub flags: SectionFlags,
}

/// One symbol entry: owning section index, name, section-relative value, raw flag mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSymbol {
    pub section_index: Option<usize>,
    pub name: String,
    pub value: u64,
    pub flags: u32,
}

/// An archive member as produced by the engine; opening it may have failed.
pub struct NativeMember {
    pub name: String,
    pub handle: NativeResult<Box<dyn NativeHandle>>,
}

/// Operations a container needs from a binary-format engine.
pub trait NativeHandle: Send + Sync {
    /// Probe whether the underlying bytes are of `format`.
    ///
    /// On mismatch the error carries the engine's diagnostic for this probe.
    fn check_format(&mut self, format: Format) -> NativeResult<()>;

    fn attributes(&self) -> &Attributes;

    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Sections in engine order; empty until an object or core probe matched.
    fn sections(&self) -> &[NativeSection];

    fn section(&self, index: usize) -> Option<&NativeSection> {
        self.sections().iter().find(|s| s.index == index)
    }

    /// Raw bytes of `[offset, offset + len)` inside section `index`.
    fn section_contents(&self, index: usize, offset: u64, len: u64) -> NativeResult<Vec<u8>>;

    fn symbols(&self) -> NativeResult<Vec<NativeSymbol>>;

    /// Opens every member of an archive, in archive order.
    fn archive_members(&mut self) -> Vec<NativeMember>;

    /// Releases engine resources. Later calls on the handle are not expected.
    fn close(&mut self) -> NativeResult<()>;
}

/// The handle slot shared by a container and the section wrappers it hands out.
///
/// `None` means closed; every accessor maps that to [`BfdError::Uninitialized`].
pub type SharedHandle = Arc<RwLock<Option<Box<dyn NativeHandle>>>>;

pub(crate) fn empty_handle() -> SharedHandle {
    Arc::new(RwLock::new(None))
}

/// Runs `f` against the open handle.
pub(crate) fn with_handle<T>(
    shared: &SharedHandle,
    f: impl FnOnce(&dyn NativeHandle) -> Result<T>,
) -> Result<T> {
    let guard = shared
        .read()
        .map_err(|_| BfdError::Internal("native handle lock poisoned".to_string()))?;
    match guard.as_deref() {
        Some(handle) => f(handle),
        None => Err(BfdError::Uninitialized),
    }
}

/// Runs `f` against the open handle with mutable access.
pub(crate) fn with_handle_mut<T>(
    shared: &SharedHandle,
    f: impl FnOnce(&mut dyn NativeHandle) -> Result<T>,
) -> Result<T> {
    let mut guard = shared
        .write()
        .map_err(|_| BfdError::Internal("native handle lock poisoned".to_string()))?;
    match guard.as_deref_mut() {
        Some(handle) => f(handle),
        None => Err(BfdError::Uninitialized),
    }
}

/// Takes the handle out of its slot, leaving the slot empty even if the lock was poisoned.
pub(crate) fn take_handle(shared: &SharedHandle) -> Option<Box<dyn NativeHandle>> {
    match shared.write() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}
