//! Address arithmetic between section-relative offsets and absolute addresses.
//!
//! All helpers wrap on overflow the way the native engines do, so a section
//! placed near the top of the address space still yields a defined address.

use std::fmt;

/// Absolute address of `offset` inside a region that starts at `base`.
#[inline]
pub fn absolute(base: u64, offset: u64) -> u64 {
    base.wrapping_add(offset)
}

/// Offset of `address` relative to `base`, if `address` is not below `base`.
#[inline]
pub fn relative(base: u64, address: u64) -> Option<u64> {
    address.checked_sub(base)
}

/// True if `address` falls inside `[base, base + size)`.
pub fn contains(base: u64, size: u64, address: u64) -> bool {
    match relative(base, address) {
        Some(off) => off < size,
        None => false,
    }
}

/// Checks that `[offset, offset + len)` lies inside a region of `size` bytes.
pub fn range_within(offset: u64, len: u64, size: u64) -> bool {
    match offset.checked_add(len) {
        Some(end) => end <= size,
        None => false,
    }
}

/// Display width for addresses in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    Bits32,
    Bits64,
}

impl AddressWidth {
    /// Picks the width from an architecture size in bits; anything above 32 is 64.
    pub fn from_arch_size(bits: u32) -> Self {
        if bits > 32 {
            AddressWidth::Bits64
        } else {
            AddressWidth::Bits32
        }
    }

    pub fn digits(&self) -> usize {
        match self {
            AddressWidth::Bits32 => 8,
            AddressWidth::Bits64 => 16,
        }
    }

    /// Zero padded lowercase hex of `address` at this width.
    pub fn format(&self, address: u64) -> String {
        format!("{:0width$x}", address, width = self.digits())
    }
}

impl fmt::Display for AddressWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressWidth::Bits32 => write!(f, "32-bit"),
            AddressWidth::Bits64 => write!(f, "64-bit"),
        }
    }
}
