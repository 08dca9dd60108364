//! Raw ELF header fields the `object` read API does not surface.
//!
//! Only what the object engine needs: the file type, per-section entry size
//! and the program headers used to derive load addresses and core sections.

pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;
pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const ET_REL: u16 = 1;
pub const ET_CORE: u16 = 4;
pub const SHT_NOBITS: u32 = 8;

fn read_u16(data: &[u8], off: usize, le: bool) -> Option<u16> {
    let b = data.get(off..off + 2)?;
    Some(if le {
        u16::from_le_bytes([b[0], b[1]])
    } else {
        u16::from_be_bytes([b[0], b[1]])
    })
}
fn read_u32(data: &[u8], off: usize, le: bool) -> Option<u32> {
    let b = data.get(off..off + 4)?;
    Some(if le {
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    } else {
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    })
}
fn read_u64(data: &[u8], off: usize, le: bool) -> Option<u64> {
    let b = data.get(off..off + 8)?;
    Some(if le {
        u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    } else {
        u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    })
}

/// Word-sized read: 8 bytes for ELFCLASS64, 4 otherwise.
fn read_word(data: &[u8], off: usize, le: bool, is64: bool) -> Option<u64> {
    if is64 {
        read_u64(data, off, le)
    } else {
        read_u32(data, off, le).map(u64::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shdr {
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_entsize: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phdr {
    pub p_type: u32,
    pub p_flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub align: u64,
}

/// Header fields of one ELF image, indexed like the section header table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElfHeaders {
    pub e_type: u16,
    pub shdrs: Vec<Shdr>,
    pub phdrs: Vec<Phdr>,
}

impl ElfHeaders {
    /// Parses `data`; `None` when it is not an ELF image.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 0x34 || &data[0..4] != b"\x7FELF" {
            return None;
        }
        let is64 = data[4] == 2;
        let le = data[5] != 2;
        let e_type = read_u16(data, 16, le)?;
        let (e_phoff, e_shoff, tail) = if is64 {
            (read_u64(data, 32, le)?, read_u64(data, 40, le)?, 54)
        } else {
            (
                read_u32(data, 28, le)? as u64,
                read_u32(data, 32, le)? as u64,
                42,
            )
        };
        let e_phentsize = read_u16(data, tail, le)? as usize;
        let e_phnum = read_u16(data, tail + 2, le)? as usize;
        let e_shentsize = read_u16(data, tail + 4, le)? as usize;
        let e_shnum = read_u16(data, tail + 6, le)? as usize;

        let mut shdrs = Vec::with_capacity(e_shnum);
        if e_shoff != 0 && e_shentsize != 0 {
            for i in 0..e_shnum {
                let off = e_shoff as usize + i * e_shentsize;
                // sh_type at 4, sh_flags at 8; sh_entsize is the last word
                let sh_type = match read_u32(data, off + 4, le) {
                    Some(t) => t,
                    None => break,
                };
                let sh_flags = read_word(data, off + 8, le, is64).unwrap_or(0);
                let ent_off = if is64 { off + 56 } else { off + 36 };
                let sh_entsize = read_word(data, ent_off, le, is64).unwrap_or(0);
                shdrs.push(Shdr {
                    sh_type,
                    sh_flags,
                    sh_entsize,
                });
            }
        }

        let mut phdrs = Vec::with_capacity(e_phnum);
        if e_phoff != 0 && e_phentsize != 0 {
            for i in 0..e_phnum {
                let off = e_phoff as usize + i * e_phentsize;
                let p_type = match read_u32(data, off, le) {
                    Some(t) => t,
                    None => break,
                };
                // ELFCLASS64 moves p_flags up to sit right after p_type
                let phdr = if is64 {
                    Phdr {
                        p_type,
                        p_flags: read_u32(data, off + 4, le).unwrap_or(0),
                        offset: read_u64(data, off + 8, le).unwrap_or(0),
                        vaddr: read_u64(data, off + 16, le).unwrap_or(0),
                        paddr: read_u64(data, off + 24, le).unwrap_or(0),
                        filesz: read_u64(data, off + 32, le).unwrap_or(0),
                        memsz: read_u64(data, off + 40, le).unwrap_or(0),
                        align: read_u64(data, off + 48, le).unwrap_or(0),
                    }
                } else {
                    Phdr {
                        p_type,
                        offset: read_u32(data, off + 4, le).unwrap_or(0) as u64,
                        vaddr: read_u32(data, off + 8, le).unwrap_or(0) as u64,
                        paddr: read_u32(data, off + 12, le).unwrap_or(0) as u64,
                        filesz: read_u32(data, off + 16, le).unwrap_or(0) as u64,
                        memsz: read_u32(data, off + 20, le).unwrap_or(0) as u64,
                        p_flags: read_u32(data, off + 24, le).unwrap_or(0),
                        align: read_u32(data, off + 28, le).unwrap_or(0) as u64,
                    }
                };
                phdrs.push(phdr);
            }
        }

        Some(Self {
            e_type,
            shdrs,
            phdrs,
        })
    }

    pub fn is_relocatable(&self) -> bool {
        self.e_type == ET_REL
    }

    pub fn is_core(&self) -> bool {
        self.e_type == ET_CORE
    }

    pub fn shdr(&self, index: usize) -> Option<&Shdr> {
        self.shdrs.get(index)
    }

    /// Load address of a section at `vma` spanning `size` bytes.
    ///
    /// Falls back to `vma` when no loadable segment covers the section.
    pub fn lma_for(&self, vma: u64, size: u64) -> u64 {
        self.phdrs
            .iter()
            .filter(|seg| seg.p_type == PT_LOAD)
            .find(|seg| {
                vma >= seg.vaddr
                    && vma.saturating_add(size) <= seg.vaddr.saturating_add(seg.memsz)
            })
            .map(|seg| seg.paddr.wrapping_add(vma - seg.vaddr))
            .unwrap_or(vma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elf64_with_load(paddr: u64) -> Vec<u8> {
        let mut d = vec![0u8; 0x40 + 0x38];
        d[0..4].copy_from_slice(b"\x7FELF");
        d[4] = 2;
        d[5] = 1;
        d[16..18].copy_from_slice(&2u16.to_le_bytes());
        d[32..40].copy_from_slice(&0x40u64.to_le_bytes());
        d[54..56].copy_from_slice(&0x38u16.to_le_bytes());
        d[56..58].copy_from_slice(&1u16.to_le_bytes());
        let ph = 0x40;
        d[ph..ph + 4].copy_from_slice(&PT_LOAD.to_le_bytes());
        d[ph + 16..ph + 24].copy_from_slice(&0x400000u64.to_le_bytes());
        d[ph + 24..ph + 32].copy_from_slice(&paddr.to_le_bytes());
        d[ph + 40..ph + 48].copy_from_slice(&0x1000u64.to_le_bytes());
        d
    }

    #[test]
    fn rejects_non_elf() {
        assert!(ElfHeaders::parse(b"MZ\x90\x00").is_none());
        assert!(ElfHeaders::parse(&[0u8; 0x40]).is_none());
    }

    #[test]
    fn lma_follows_load_segment() {
        let h = ElfHeaders::parse(&elf64_with_load(0x8000)).unwrap();
        assert_eq!(h.e_type, 2);
        assert!(!h.is_relocatable());
        assert_eq!(h.phdrs.len(), 1);
        assert!(!h.is_core());
        assert_eq!(h.lma_for(0x400100, 0x10), 0x8100);
        // outside any segment
        assert_eq!(h.lma_for(0x900000, 0x10), 0x900000);
    }

    #[test]
    fn note_segments_do_not_relocate() {
        let mut d = elf64_with_load(0x8000);
        d[16..18].copy_from_slice(&ET_CORE.to_le_bytes());
        d[0x40..0x44].copy_from_slice(&PT_NOTE.to_le_bytes());
        let h = ElfHeaders::parse(&d).unwrap();
        assert!(h.is_core());
        assert_eq!(h.phdrs[0].p_type, PT_NOTE);
        assert_eq!(h.lma_for(0x400100, 0x10), 0x400100);
    }
}
