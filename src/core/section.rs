//! Sections and the per-container section registry.
//!
//! A [`Section`] is a thin wrapper around the container's native handle and a
//! section index. Its accessors read through to the engine on every call, so
//! they fail with [`BfdError::Uninitialized`] as soon as the owning container is
//! closed.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

use crate::core::address_space;
use crate::error::{BfdError, Result};
use crate::native::{with_handle, NativeSection, SharedHandle};

bitflags! {
    /// Section flags, numbered like BFD's `asection->flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SectionFlags: u32 {
        const ALLOC = 0x1;
        const LOAD = 0x2;
        const RELOC = 0x4;
        const READONLY = 0x8;
        const CODE = 0x10;
        const DATA = 0x20;
        const ROM = 0x40;
        const CONSTRUCTOR = 0x80;
        const HAS_CONTENTS = 0x100;
        const NEVER_LOAD = 0x200;
        const THREAD_LOCAL = 0x400;
        const HAS_GOT_REF = 0x800;
        const IS_COMMON = 0x1000;
        const DEBUGGING = 0x2000;
        const IN_MEMORY = 0x4000;
        const EXCLUDE = 0x8000;
        const SORT_ENTRIES = 0x10000;
        const LINK_ONCE = 0x20000;
        const ONE_ONLY = 0x40000;
        const SAME_SIZE = 0x80000;
        const LINK_DUPLICATES = 0xc0000;
        const LINKER_CREATED = 0x100000;
        const KEEP = 0x200000;
        const SMALL_DATA = 0x400000;
        const MERGE = 0x800000;
        const STRINGS = 0x1000000;
        const GROUP = 0x2000000;
        const COFF_SHARED_LIBRARY = 0x4000000;
        const COFF_SHARED = 0x8000000;
        const TIC54X_BLOCK = 0x10000000;
        const TIC54X_CLINK = 0x20000000;
        const COFF_NOREAD = 0x40000000;
    }
}

impl SectionFlags {
    /// Flags a section must carry to be disassembled by default.
    pub const DISASSEMBLABLE: SectionFlags = SectionFlags::CODE.union(SectionFlags::HAS_CONTENTS);

    /// Names of the set flags, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// One section of an open container.
#[derive(Clone)]
pub struct Section {
    handle: SharedHandle,
    index: usize,
}

impl Section {
    /// Wraps section `index` of the open handle.
    pub(crate) fn new(handle: &SharedHandle, index: usize) -> Result<Self> {
        with_handle(handle, |h| {
            if h.section(index).is_none() {
                return Err(BfdError::InvalidInput(format!(
                    "no section with index {}",
                    index
                )));
            }
            Ok(())
        })?;
        Ok(Self {
            handle: handle.clone(),
            index,
        })
    }

    fn read<T>(&self, f: impl FnOnce(&NativeSection) -> T) -> Result<T> {
        with_handle(&self.handle, |h| {
            h.section(self.index)
                .map(f)
                .ok_or(BfdError::Uninitialized)
        })
    }

    /// Stable index assigned by the engine. Does not touch the handle.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Result<String> {
        self.read(|s| s.name.clone())
    }

    pub fn size(&self) -> Result<u64> {
        self.read(|s| s.size)
    }

    pub fn vma(&self) -> Result<u64> {
        self.read(|s| s.vma)
    }

    pub fn lma(&self) -> Result<u64> {
        self.read(|s| s.lma)
    }

    /// Alignment as a power-of-two exponent.
    pub fn alignment(&self) -> Result<u32> {
        self.read(|s| s.alignment_power)
    }

    pub fn flags(&self) -> Result<SectionFlags> {
        self.read(|s| s.flags)
    }

    pub fn file_offset(&self) -> Result<u64> {
        self.read(|s| s.file_offset)
    }

    pub fn entry_size(&self) -> Result<u64> {
        self.read(|s| s.entry_size)
    }

    pub fn has_flags(&self, wanted: SectionFlags) -> Result<bool> {
        Ok(self.flags()?.contains(wanted))
    }

    /// Whole section contents.
    pub fn content(&self) -> Result<Vec<u8>> {
        let size = self.size()?;
        self.content_at(0, size)
    }

    /// Reads `len` bytes at `offset`; the range must lie inside the section.
    pub fn content_at(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        with_handle(&self.handle, |h| {
            let section = h.section(self.index).ok_or(BfdError::Uninitialized)?;
            if !address_space::range_within(offset, len, section.size) {
                return Err(BfdError::InvalidInput(format!(
                    "content range {:#x}+{:#x} outside section {} of size {:#x}",
                    offset, len, section.name, section.size
                )));
            }
            trace!(section = %section.name, offset, len, "Reading section content");
            h.section_contents(self.index, offset, len)
                .map_err(|e| BfdError::InvalidInput(e.message))
        })
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.read(|s| s.clone()) {
            Ok(s) => f
                .debug_struct("Section")
                .field("index", &s.index)
                .field("name", &s.name)
                .field("size", &s.size)
                .field("vma", &format_args!("{:#x}", s.vma))
                .field("flags", &s.flags)
                .finish(),
            Err(_) => f
                .debug_struct("Section")
                .field("index", &self.index)
                .field("closed", &true)
                .finish(),
        }
    }
}

/// Sections of one container keyed by name.
///
/// Registering a name twice replaces the earlier section; the last one wins.
#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    by_name: HashMap<String, Section>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from every section the open handle reports.
    pub(crate) fn populate(handle: &SharedHandle) -> Result<Self> {
        let entries: Vec<(usize, String)> = with_handle(handle, |h| {
            Ok(h.sections()
                .iter()
                .map(|s| (s.index, s.name.clone()))
                .collect())
        })?;
        let mut registry = Self::new();
        for (index, name) in entries {
            let section = Section::new(handle, index)?;
            if registry.insert(name.clone(), section).is_some() {
                trace!(name = %name, index, "Section name registered twice, keeping the later one");
            }
        }
        Ok(registry)
    }

    /// Registers `section` under `name`, returning the section it replaced.
    pub fn insert(&mut self, name: String, section: Section) -> Option<Section> {
        self.by_name.insert(name, section)
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.by_name.get(name)
    }

    pub fn by_index(&self, index: usize) -> Option<&Section> {
        self.by_name.values().find(|s| s.index == index)
    }

    /// Index to section map, used to resolve symbol owners.
    pub fn index_map(&self) -> HashMap<usize, &Section> {
        self.by_name.values().map(|s| (s.index, s)).collect()
    }

    /// Sections ordered by index.
    pub fn ordered(&self) -> Vec<&Section> {
        let mut out: Vec<&Section> = self.by_name.values().collect();
        out.sort_by_key(|s| s.index);
        out
    }

    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Section)> {
        self.by_name.iter()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}
