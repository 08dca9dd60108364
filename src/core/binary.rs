//! Container format and byte order.
//!
//! [`Format`] is the detected kind of a container. It is set once by
//! [`crate::bfd::Bfd::open`] and reset to `Unknown` by close.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The detected kind of a binary container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    /// Nothing detected yet, or the container was closed
    #[default]
    Unknown,
    /// Linker/assembler/compiler output: relocatables, executables, shared objects
    Object,
    /// Static archive of member objects
    Archive,
    /// Process core dump
    Core,
}

impl Format {
    /// Probe order used by format detection.
    pub const PROBE_ORDER: [Format; 3] = [Format::Archive, Format::Object, Format::Core];

    /// Long human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Format::Unknown => "File format is unknown.",
            Format::Object => "Linker/assembler/compiler output.",
            Format::Archive => "Object archive file",
            Format::Core => "Core dump.",
        }
    }

    /// Numeric code matching the native engine's format ids.
    pub fn code(&self) -> u32 {
        match self {
            Format::Unknown => 0,
            Format::Object => 1,
            Format::Archive => 2,
            Format::Core => 3,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Unknown => write!(f, "unknown"),
            Format::Object => write!(f, "object"),
            Format::Archive => write!(f, "archive"),
            Format::Core => write!(f, "core"),
        }
    }
}

/// Byte order of a container or decoding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Endian {
    Big,
    Little,
    /// Byte order not known or not meaningful (single-byte targets)
    #[default]
    Unknown,
}

impl Endian {
    pub fn code(&self) -> u32 {
        match self {
            Endian::Big => 0,
            Endian::Little => 1,
            Endian::Unknown => 2,
        }
    }

    pub fn is_big(&self) -> bool {
        matches!(self, Endian::Big)
    }

    pub fn is_little(&self) -> bool {
        matches!(self, Endian::Little)
    }
}

impl From<object::Endianness> for Endian {
    fn from(e: object::Endianness) -> Self {
        match e {
            object::Endianness::Big => Endian::Big,
            object::Endianness::Little => Endian::Little,
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Big => write!(f, "big"),
            Endian::Little => write!(f, "little"),
            Endian::Unknown => write!(f, "unknown"),
        }
    }
}

bitflags! {
    /// Container level flags, numbered like BFD's `abfd->flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FileFlags: u32 {
        const HAS_RELOC = 0x1;
        const EXEC_P = 0x2;
        const HAS_LINENO = 0x4;
        const HAS_DEBUG = 0x8;
        const HAS_SYMS = 0x10;
        const HAS_LOCALS = 0x20;
        const DYNAMIC = 0x40;
        const WP_TEXT = 0x80;
        const D_PAGED = 0x100;
        const IS_RELAXABLE = 0x200;
        const TRADITIONAL_FORMAT = 0x400;
        const IN_MEMORY = 0x800;
        const HAS_LOAD_PAGE = 0x1000;
        const LINKER_CREATED = 0x2000;
        const DETERMINISTIC_OUTPUT = 0x4000;
        const COMPRESS = 0x8000;
        const DECOMPRESS = 0x10000;
        const PLUGIN = 0x20000;
    }
}

impl FileFlags {
    /// Flags reserved for the engine's own bookkeeping; hidden from file header reports.
    pub const FOR_ENGINE_USE: FileFlags = FileFlags::IN_MEMORY
        .union(FileFlags::COMPRESS)
        .union(FileFlags::DECOMPRESS)
        .union(FileFlags::LINKER_CREATED)
        .union(FileFlags::PLUGIN)
        .union(FileFlags::TRADITIONAL_FORMAT)
        .union(FileFlags::DETERMINISTIC_OUTPUT);

    /// Flags meaningful to callers, i.e. without [`FileFlags::FOR_ENGINE_USE`].
    pub fn reportable(&self) -> FileFlags {
        self.difference(Self::FOR_ENGINE_USE)
    }

    /// Names of the set flags, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
