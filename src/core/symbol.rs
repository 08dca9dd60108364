//! Symbols and the address-keyed symbol table.

use bitflags::{bitflags, Flags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::address_space;
use crate::core::section::{Section, SectionRegistry};
use crate::error::Result;
use crate::native::NativeSymbol;

bitflags! {
    /// Symbol classification bits, numbered like BFD's `asymbol->flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SymbolFlags: u32 {
        const LOCAL = 1 << 0;
        const GLOBAL = 1 << 1;
        const EXPORT = 1 << 1;
        const DEBUGGING = 1 << 2;
        const FUNCTION = 1 << 3;
        const KEEP = 1 << 5;
        const KEEP_G = 1 << 6;
        const WEAK = 1 << 7;
        const SECTION_SYM = 1 << 8;
        const OLD_COMMON = 1 << 9;
        const NOT_AT_END = 1 << 10;
        const CONSTRUCTOR = 1 << 11;
        const WARNING = 1 << 12;
        const INDIRECT = 1 << 13;
        const FILE = 1 << 14;
        const DYNAMIC = 1 << 15;
        const OBJECT = 1 << 16;
        const DEBUGGING_RELOC = 1 << 17;
        const THREAD_LOCAL = 1 << 18;
        const RELC = 1 << 19;
        const SRELC = 1 << 20;
        const SYNTHETIC = 1 << 21;
        const GNU_INDIRECT_FUNCTION = 1 << 22;
        const GNU_UNIQUE = 1 << 23;
    }
}

impl SymbolFlags {
    /// Every named flag fully contained in `raw`, aliases included.
    ///
    /// Each flag is tested on its own (`raw & flag == flag`), so `EXPORT`
    /// shows up next to `GLOBAL`. Bits without a name are ignored.
    pub fn members(raw: u32) -> Vec<&'static str> {
        <SymbolFlags as Flags>::FLAGS
            .iter()
            .filter(|f| {
                let bits = f.value().bits();
                bits != 0 && raw & bits == bits
            })
            .map(|f| f.name())
            .collect()
    }
}

/// A symbol resolved against its owning section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    section_index: usize,
    name: String,
    value: u64,
    flags: SymbolFlags,
    flag_names: Vec<&'static str>,
    address: u64,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset relative to the owning section.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Owning section's VMA plus [`Symbol::value`].
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn flags(&self) -> SymbolFlags {
        self.flags
    }

    /// Decoded flag names, see [`SymbolFlags::members`].
    pub fn flag_names(&self) -> &[&'static str] {
        &self.flag_names
    }

    pub fn has_flag(&self, flag: SymbolFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    /// Looks the owning section up again; the symbol holds only its index.
    pub fn section<'a>(&self, sections: &'a SectionRegistry) -> Option<&'a Section> {
        sections.by_index(self.section_index)
    }
}

/// Symbols keyed by absolute address, in address order.
///
/// One entry per address: a later symbol at the same address replaces the
/// earlier one.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    by_address: BTreeMap<u64, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `native` symbols against `sections`.
    ///
    /// Symbols without a section, or whose section index is not registered,
    /// are dropped.
    pub(crate) fn populate(native: Vec<NativeSymbol>, sections: &SectionRegistry) -> Result<Self> {
        let owners = sections.index_map();
        let mut table = Self::new();
        let mut dropped = 0usize;
        let mut replaced = 0usize;
        for sym in native {
            let section = match sym.section_index.and_then(|i| owners.get(&i)) {
                Some(section) => *section,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            let address = address_space::absolute(section.vma()?, sym.value);
            let symbol = Symbol {
                section_index: section.index(),
                flag_names: SymbolFlags::members(sym.flags),
                flags: SymbolFlags::from_bits_retain(sym.flags),
                name: sym.name,
                value: sym.value,
                address,
            };
            if table.insert(symbol).is_some() {
                replaced += 1;
            }
        }
        debug!(
            symbols = table.len(),
            dropped,
            replaced,
            "Populated symbol table"
        );
        Ok(table)
    }

    /// Stores `symbol` under its address, returning the one it replaced.
    pub fn insert(&mut self, symbol: Symbol) -> Option<Symbol> {
        self.by_address.insert(symbol.address, symbol)
    }

    pub fn get(&self, address: u64) -> Option<&Symbol> {
        self.by_address.get(&address)
    }

    /// First symbol with this name, in address order.
    pub fn find_by_name(&self, name: &str) -> Option<&Symbol> {
        self.by_address.values().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &Symbol)> {
        self.by_address.iter()
    }

    pub fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_address.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_address.clear();
    }
}

impl std::ops::Index<u64> for SymbolTable {
    type Output = Symbol;

    fn index(&self, address: u64) -> &Symbol {
        &self.by_address[&address]
    }
}
