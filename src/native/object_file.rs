//! Native engine backed by the `object` crate.
//!
//! The probes parse the mapped bytes once and copy out everything later
//! calls need (attributes, section table, symbols, archive member slices),
//! so the handle owns its data and carries no borrow of the parser.

use bytes::Bytes;
use object::read::archive::ArchiveFile;
use object::{
    Architecture, BinaryFormat, Endianness, Object, ObjectKind, ObjectSection, ObjectSymbol,
    SectionKind, SymbolKind, SymbolScope, SymbolSection,
};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::elf::{ElfHeaders, PF_W, PF_X, PT_LOAD, PT_NOTE, SHT_NOBITS};
use super::{Attributes, NativeError, NativeHandle, NativeMember, NativeResult, NativeSection, NativeSymbol};
use crate::core::arch::{self, mach, ArchId};
use crate::core::binary::{Endian, FileFlags, Format};
use crate::core::section::SectionFlags;
use crate::core::symbol::SymbolFlags;
use crate::io::{self, IOLimits};

pub const FORMAT_NOT_RECOGNIZED: &str = "file format not recognized";
pub const WRONG_FORMAT: &str = "file in wrong format";
pub const INVALID_TARGET: &str = "invalid bfd target";
pub const ARCHIVE_TARGET: &str = "archive";

/// Flags an object-file target can carry at all.
const APPLICABLE_FLAGS: FileFlags = FileFlags::HAS_RELOC
    .union(FileFlags::EXEC_P)
    .union(FileFlags::HAS_LINENO)
    .union(FileFlags::HAS_DEBUG)
    .union(FileFlags::HAS_SYMS)
    .union(FileFlags::HAS_LOCALS)
    .union(FileFlags::DYNAMIC)
    .union(FileFlags::WP_TEXT)
    .union(FileFlags::D_PAGED);

// ELF section header flags and types consulted for the BFD flag mapping.
const SHF_WRITE: u64 = 0x1;
const SHF_ALLOC: u64 = 0x2;
const SHF_EXECINSTR: u64 = 0x4;
const SHF_MERGE: u64 = 0x10;
const SHF_STRINGS: u64 = 0x20;
const SHF_GROUP: u64 = 0x200;
const SHF_TLS: u64 = 0x400;
const SHF_EXCLUDE: u64 = 0x8000_0000;
const SHT_NULL: u32 = 0;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_RELA: u32 = 4;
const SHT_REL: u32 = 9;
const SHT_SYMTAB_SHNDX: u32 = 18;

const STT_GNU_IFUNC: u8 = 10;
const STB_GNU_UNIQUE: u8 = 10;

// COFF characteristics
const IMAGE_SCN_LNK_REMOVE: u32 = 0x800;
const IMAGE_SCN_MEM_DISCARDABLE: u32 = 0x0200_0000;
const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
const IMAGE_SCN_MEM_WRITE: u32 = 0x8000_0000;

struct ArchiveEntry {
    name: String,
    data: NativeResult<Bytes>,
}

/// An input opened through the `object` crate.
pub struct ObjectHandle {
    data: Bytes,
    requested_target: String,
    limits: IOLimits,
    attrs: Attributes,
    sections: Vec<NativeSection>,
    // (offset, size) in `data`; `None` for sections with no file contents
    ranges: HashMap<usize, Option<(u64, u64)>>,
    symbols: Vec<NativeSymbol>,
    members: Vec<ArchiveEntry>,
}

impl ObjectHandle {
    /// Wraps bytes already in memory.
    ///
    /// `target` is either `"default"` or a name from [`arch::targets`].
    pub fn from_bytes(
        data: Bytes,
        filename: impl Into<String>,
        target: &str,
        limits: IOLimits,
    ) -> NativeResult<Self> {
        if !arch::is_known_target(target) {
            return Err(NativeError::new(format!("{}: {}", INVALID_TARGET, target)));
        }
        let attrs = Attributes {
            filename: filename.into(),
            target: target.to_string(),
            ..Attributes::default()
        };
        Ok(Self {
            data,
            requested_target: target.to_string(),
            limits,
            attrs,
            sections: Vec::new(),
            ranges: HashMap::new(),
            symbols: Vec::new(),
            members: Vec::new(),
        })
    }

    /// Maps and wraps the file at `path`.
    pub fn from_path(path: &Path, target: &str, limits: IOLimits) -> NativeResult<Self> {
        let data = io::load_path(path, &limits).map_err(|e| NativeError::new(e.to_string()))?;
        let mut handle = Self::from_bytes(data, path.display().to_string(), target, limits)?;
        handle.attrs.cacheable = true;
        Ok(handle)
    }

    /// Maps an open file; the handle keeps the mapping, not the descriptor.
    pub fn from_file(file: &File, path: &Path, target: &str, limits: IOLimits) -> NativeResult<Self> {
        let data =
            io::load_file(file, path, &limits).map_err(|e| NativeError::new(e.to_string()))?;
        Self::from_bytes(data, path.display().to_string(), target, limits)
    }

    fn is_default_target(&self) -> bool {
        self.requested_target == arch::DEFAULT_TARGET
    }

    fn check_requested(&self, detected: &str) -> NativeResult<()> {
        if self.is_default_target() || self.requested_target == detected {
            Ok(())
        } else {
            Err(NativeError::new(WRONG_FORMAT))
        }
    }

    fn reset_contents(&mut self) {
        self.sections.clear();
        self.ranges.clear();
        self.symbols.clear();
        self.members.clear();
    }

    fn probe_archive(&mut self) -> NativeResult<()> {
        let data = self.data.clone();
        let archive =
            ArchiveFile::parse(&*data).map_err(|_| NativeError::new(FORMAT_NOT_RECOGNIZED))?;
        let is_thin = archive.is_thin();
        let has_map = matches!(archive.symbols(), Ok(Some(_)));
        let base_dir: Option<PathBuf> = Path::new(&self.attrs.filename)
            .parent()
            .map(Path::to_path_buf);

        let mut members = Vec::new();
        for (index, member) in archive.members().enumerate() {
            let member = match member {
                Ok(m) => m,
                Err(e) => {
                    // a broken header ends the member list
                    debug!(index, error = %e, "Stopping at malformed archive member");
                    break;
                }
            };
            let name = String::from_utf8_lossy(member.name()).into_owned();
            let data = if member.is_thin() {
                let path = match &base_dir {
                    Some(dir) => dir.join(&name),
                    None => PathBuf::from(&name),
                };
                io::load_path(&path, &self.limits).map_err(|e| NativeError::new(e.to_string()))
            } else {
                member
                    .data(&*data)
                    .map(|slice| data.slice_ref(slice))
                    .map_err(|e| NativeError::new(e.to_string()))
            };
            members.push(ArchiveEntry { name, data });
        }

        let detected = members
            .iter()
            .find_map(|m| m.data.as_ref().ok().and_then(|d| object_target(d)))
            .unwrap_or_else(|| ARCHIVE_TARGET.to_string());
        if detected != ARCHIVE_TARGET {
            self.check_requested(&detected)?;
        }

        self.reset_contents();
        self.members = members;
        self.attrs.target = detected;
        self.attrs.has_map = has_map;
        self.attrs.is_thin_archive = is_thin;
        self.attrs.applicable_file_flags = APPLICABLE_FLAGS;
        debug!(
            filename = %self.attrs.filename,
            members = self.members.len(),
            thin = is_thin,
            "Matched archive"
        );
        Ok(())
    }

    fn probe_object(&mut self, want_core: bool) -> NativeResult<()> {
        let data = self.data.clone();
        let file =
            object::File::parse(&*data).map_err(|_| NativeError::new(FORMAT_NOT_RECOGNIZED))?;
        let is_core = file.kind() == ObjectKind::Core;
        if is_core != want_core {
            return Err(NativeError::new(WRONG_FORMAT));
        }
        let detected = target_name(file.format(), file.architecture(), file.endianness(), file.is_64());
        self.check_requested(&detected)?;

        self.reset_contents();
        self.attrs.target = detected;
        self.load_object(&file, &data);
        Ok(())
    }

    fn load_object(&mut self, file: &object::File<'_>, data: &[u8]) {
        let elf = if file.format() == BinaryFormat::Elf {
            ElfHeaders::parse(data)
        } else {
            None
        };
        let (arch_id, machine) = map_architecture(file.architecture());
        let endian = Endian::from(file.endianness());

        for section in file.sections() {
            let index = section.index().0;
            let shdr = elf.as_ref().and_then(|h| h.shdr(index));
            if let Some(shdr) = shdr {
                if is_hidden_elf_section(shdr.sh_type, shdr.sh_flags) {
                    continue;
                }
            }
            let name = section.name().unwrap_or("").to_string();
            let vma = section.address();
            let size = section.size();
            let align = section.align();
            let range = section.file_range();
            let nobits = shdr.map(|s| s.sh_type == SHT_NOBITS).unwrap_or(false);
            let range = if nobits { None } else { range };
            let lma = match &elf {
                Some(h) => h.lma_for(vma, size),
                None => vma,
            };
            let mut flags = map_section_flags(section.kind(), section.flags());
            if section.relocations().next().is_some() {
                flags |= SectionFlags::RELOC;
            }
            self.sections.push(NativeSection {
                index,
                name,
                size,
                vma,
                lma,
                alignment_power: if align > 0 { align.trailing_zeros() } else { 0 },
                file_offset: range.map(|(off, _)| off).unwrap_or(0),
                entry_size: shdr.map(|s| s.sh_entsize).unwrap_or(0),
                flags,
            });
            self.ranges.insert(index, range);
        }
        if self.sections.is_empty() {
            if let Some(h) = elf.as_ref().filter(|h| h.is_core()) {
                self.load_segment_sections(h);
            }
        }

        let relocatable = elf.as_ref().map(ElfHeaders::is_relocatable).unwrap_or(false);
        let section_vmas: HashMap<usize, (u64, String)> = self
            .sections
            .iter()
            .map(|s| (s.index, (s.vma, s.name.clone())))
            .collect();
        let mut has_locals = false;
        let mut symbol_count = 0usize;
        for symbol in file.symbols() {
            symbol_count += 1;
            if let Some(sym) = convert_symbol(&symbol, &section_vmas, relocatable, false) {
                has_locals |= sym.flags & SymbolFlags::LOCAL.bits() != 0;
                self.symbols.push(sym);
            }
        }
        let mut dynamic_symbol_count = 0usize;
        for symbol in file.dynamic_symbols() {
            dynamic_symbol_count += 1;
            if let Some(sym) = convert_symbol(&symbol, &section_vmas, relocatable, true) {
                self.symbols.push(sym);
            }
        }

        let mut file_flags = FileFlags::empty();
        match file.kind() {
            ObjectKind::Relocatable => file_flags |= FileFlags::HAS_RELOC,
            ObjectKind::Executable => file_flags |= FileFlags::EXEC_P,
            ObjectKind::Dynamic => file_flags |= FileFlags::DYNAMIC,
            _ => {}
        }
        if matches!(file.kind(), ObjectKind::Executable | ObjectKind::Dynamic)
            && file.segments().next().is_some()
        {
            file_flags |= FileFlags::D_PAGED;
        }
        if symbol_count + dynamic_symbol_count > 0 {
            file_flags |= FileFlags::HAS_SYMS;
        }
        if has_locals {
            file_flags |= FileFlags::HAS_LOCALS;
        }
        if file.has_debug_symbols() {
            file_flags |= FileFlags::HAS_DEBUG;
        }

        let leading_char = match (file.format(), file.architecture()) {
            (BinaryFormat::MachO, _) => Some('_'),
            (BinaryFormat::Coff | BinaryFormat::Pe, Architecture::I386) => Some('_'),
            _ => None,
        };

        self.attrs.arch = arch_id;
        self.attrs.machine = machine;
        self.attrs.endian = endian;
        self.attrs.header_endian = endian;
        self.attrs.arch_size = if file.is_64() { 64 } else { 32 };
        self.attrs.start_address = file.entry();
        self.attrs.file_flags = file_flags;
        self.attrs.applicable_file_flags = APPLICABLE_FLAGS;
        self.attrs.symbol_leading_char = leading_char;
        self.attrs.symbol_count = symbol_count;
        self.attrs.dynamic_symbol_count = dynamic_symbol_count;
        debug!(
            filename = %self.attrs.filename,
            target = %self.attrs.target,
            sections = self.sections.len(),
            symbols = self.symbols.len(),
            "Loaded object"
        );
    }

    /// Core images usually carry no section headers; their loadable and note
    /// segments stand in as `loadN` and `noteN` sections, N being the
    /// program header index.
    fn load_segment_sections(&mut self, headers: &ElfHeaders) {
        for (index, phdr) in headers.phdrs.iter().enumerate() {
            let (name, mut flags) = match phdr.p_type {
                PT_LOAD => {
                    let mut flags = SectionFlags::ALLOC | SectionFlags::LOAD;
                    if phdr.p_flags & PF_W == 0 {
                        flags |= SectionFlags::READONLY;
                    }
                    if phdr.p_flags & PF_X != 0 {
                        flags |= SectionFlags::CODE;
                    }
                    (format!("load{}", index), flags)
                }
                PT_NOTE => (format!("note{}", index), SectionFlags::READONLY),
                _ => continue,
            };
            let range = (phdr.filesz > 0).then_some((phdr.offset, phdr.filesz));
            if range.is_some() {
                flags |= SectionFlags::HAS_CONTENTS;
            }
            let size = if phdr.p_type == PT_LOAD {
                phdr.memsz
            } else {
                phdr.filesz
            };
            self.sections.push(NativeSection {
                index,
                name,
                size,
                vma: phdr.vaddr,
                lma: phdr.paddr,
                alignment_power: if phdr.align > 0 {
                    phdr.align.trailing_zeros()
                } else {
                    0
                },
                file_offset: phdr.offset,
                entry_size: 0,
                flags,
            });
            self.ranges.insert(index, range);
        }
        trace!(sections = self.sections.len(), "Built sections from core segments");
    }
}

impl NativeHandle for ObjectHandle {
    fn check_format(&mut self, format: Format) -> NativeResult<()> {
        trace!(filename = %self.attrs.filename, ?format, "Probing");
        match format {
            Format::Archive => self.probe_archive(),
            Format::Object => self.probe_object(false),
            Format::Core => self.probe_object(true),
            Format::Unknown => Err(NativeError::new(FORMAT_NOT_RECOGNIZED)),
        }
    }

    fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    fn sections(&self) -> &[NativeSection] {
        &self.sections
    }

    fn section_contents(&self, index: usize, offset: u64, len: u64) -> NativeResult<Vec<u8>> {
        self.limits
            .check_read(len)
            .map_err(|e| NativeError::new(e.to_string()))?;
        let range = self
            .ranges
            .get(&index)
            .ok_or_else(|| NativeError::new(format!("no section with index {}", index)))?;
        let mut out = vec![0u8; len as usize];
        // bytes past the file-backed part read as zero
        if let Some((start, file_size)) = *range {
            if offset < file_size {
                let avail = (file_size - offset).min(len) as usize;
                let from = (start + offset) as usize;
                let src = self
                    .data
                    .get(from..from + avail)
                    .ok_or_else(|| NativeError::new("section contents truncated"))?;
                out[..avail].copy_from_slice(src);
            }
        }
        Ok(out)
    }

    fn symbols(&self) -> NativeResult<Vec<NativeSymbol>> {
        Ok(self.symbols.clone())
    }

    fn archive_members(&mut self) -> Vec<NativeMember> {
        let target = self.requested_target.clone();
        let limits = self.limits.clone();
        self.members
            .iter()
            .map(|entry| NativeMember {
                name: entry.name.clone(),
                handle: entry.data.clone().and_then(|data| {
                    ObjectHandle::from_bytes(data, entry.name.clone(), &target, limits.clone())
                        .map(|h| Box::new(h) as Box<dyn NativeHandle>)
                }),
            })
            .collect()
    }

    fn close(&mut self) -> NativeResult<()> {
        self.reset_contents();
        self.data = Bytes::new();
        Ok(())
    }
}

fn is_hidden_elf_section(sh_type: u32, sh_flags: u64) -> bool {
    match sh_type {
        SHT_NULL | SHT_SYMTAB | SHT_SYMTAB_SHNDX => true,
        SHT_STRTAB | SHT_REL | SHT_RELA => sh_flags & SHF_ALLOC == 0,
        _ => false,
    }
}

/// Target name of a standalone object image, if it parses.
fn object_target(data: &[u8]) -> Option<String> {
    let file = object::File::parse(data).ok()?;
    Some(target_name(
        file.format(),
        file.architecture(),
        file.endianness(),
        file.is_64(),
    ))
}

/// Target name in the conventional `elf64-x86-64` form.
pub fn target_name(
    format: BinaryFormat,
    architecture: Architecture,
    endian: Endianness,
    is_64: bool,
) -> String {
    let little = endian == Endianness::Little;
    let bits = if is_64 { 64 } else { 32 };
    let pick = |le: &str, be: &str| if little { le.to_string() } else { be.to_string() };
    match format {
        BinaryFormat::Elf => match architecture {
            Architecture::X86_64 => "elf64-x86-64".to_string(),
            Architecture::X86_64_X32 => "elf32-x86-64".to_string(),
            Architecture::I386 => "elf32-i386".to_string(),
            Architecture::Arm => pick("elf32-littlearm", "elf32-bigarm"),
            Architecture::Aarch64 => pick("elf64-littleaarch64", "elf64-bigaarch64"),
            Architecture::Mips => pick("elf32-tradlittlemips", "elf32-tradbigmips"),
            Architecture::Mips64 => pick("elf64-tradlittlemips", "elf64-tradbigmips"),
            Architecture::PowerPc => pick("elf32-powerpcle", "elf32-powerpc"),
            Architecture::PowerPc64 => pick("elf64-powerpcle", "elf64-powerpc"),
            Architecture::Riscv32 => "elf32-littleriscv".to_string(),
            Architecture::Riscv64 => "elf64-littleriscv".to_string(),
            Architecture::Sparc => "elf32-sparc".to_string(),
            Architecture::Sparc64 => "elf64-sparc".to_string(),
            Architecture::S390x => "elf64-s390".to_string(),
            _ => format!("elf{}-{}", bits, if little { "little" } else { "big" }),
        },
        BinaryFormat::Pe => match architecture {
            Architecture::X86_64 => "pei-x86-64".to_string(),
            Architecture::Aarch64 => "pei-aarch64-little".to_string(),
            _ => "pei-i386".to_string(),
        },
        BinaryFormat::Coff => match architecture {
            Architecture::X86_64 => "pe-x86-64".to_string(),
            _ => "pe-i386".to_string(),
        },
        BinaryFormat::MachO => match architecture {
            Architecture::X86_64 => "mach-o-x86-64".to_string(),
            Architecture::I386 => "mach-o-i386".to_string(),
            Architecture::Aarch64 => "mach-o-arm64".to_string(),
            Architecture::Arm => "mach-o-arm".to_string(),
            _ => pick("mach-o-le", "mach-o-be"),
        },
        BinaryFormat::Xcoff => {
            if is_64 {
                "aixcoff64-rs6000".to_string()
            } else {
                "aixcoff-rs6000".to_string()
            }
        }
        BinaryFormat::Wasm => "wasm".to_string(),
        other => format!("{:?}", other).to_ascii_lowercase(),
    }
}

/// Maps an `object` architecture onto the numeric architecture and machine tables.
pub fn map_architecture(architecture: Architecture) -> (ArchId, u64) {
    match architecture {
        Architecture::I386 => (ArchId::I386, mach::I386_I386),
        Architecture::X86_64 => (ArchId::I386, mach::X86_64),
        Architecture::X86_64_X32 => (ArchId::I386, mach::X64_32),
        Architecture::Arm => (ArchId::ARM, mach::ARM_UNKNOWN),
        Architecture::Aarch64 => (ArchId::AARCH64, mach::AARCH64),
        Architecture::Aarch64_Ilp32 => (ArchId::AARCH64, mach::AARCH64_ILP32),
        Architecture::Mips => (ArchId::MIPS, mach::MIPSISA32),
        Architecture::Mips64 => (ArchId::MIPS, mach::MIPSISA64),
        Architecture::PowerPc => (ArchId::POWERPC, mach::PPC),
        Architecture::PowerPc64 => (ArchId::POWERPC, mach::PPC64),
        Architecture::Riscv32 => (ArchId::RISCV, mach::RISCV32),
        Architecture::Riscv64 => (ArchId::RISCV, mach::RISCV64),
        Architecture::Sparc => (ArchId::SPARC, mach::SPARC),
        Architecture::Sparc64 => (ArchId::SPARC, mach::SPARC_V9),
        Architecture::S390x => (ArchId::S390, mach::S390_64),
        Architecture::Msp430 => (ArchId::MSP430, mach::UNKNOWN),
        Architecture::Xtensa => (ArchId::XTENSA, mach::UNKNOWN),
        Architecture::Avr => (ArchId::AVR, mach::UNKNOWN),
        _ => (ArchId::UNKNOWN, mach::UNKNOWN),
    }
}

fn map_section_flags(kind: SectionKind, native: object::SectionFlags) -> SectionFlags {
    let contents = SectionFlags::HAS_CONTENTS;
    let loaded = SectionFlags::ALLOC | SectionFlags::LOAD | contents;
    let mut flags = match kind {
        SectionKind::Text => loaded | SectionFlags::CODE | SectionFlags::READONLY,
        SectionKind::Data => loaded | SectionFlags::DATA,
        SectionKind::ReadOnlyData
        | SectionKind::ReadOnlyDataWithRel
        | SectionKind::ReadOnlyString => loaded | SectionFlags::DATA | SectionFlags::READONLY,
        SectionKind::UninitializedData => SectionFlags::ALLOC,
        SectionKind::Tls => loaded | SectionFlags::DATA | SectionFlags::THREAD_LOCAL,
        SectionKind::UninitializedTls => SectionFlags::ALLOC | SectionFlags::THREAD_LOCAL,
        SectionKind::Common => SectionFlags::ALLOC | SectionFlags::IS_COMMON,
        SectionKind::Debug | SectionKind::DebugString => {
            contents | SectionFlags::READONLY | SectionFlags::DEBUGGING
        }
        _ => contents | SectionFlags::READONLY,
    };
    match native {
        object::SectionFlags::Elf { sh_flags } => {
            if sh_flags & SHF_ALLOC != 0 {
                flags |= SectionFlags::ALLOC;
                if flags.contains(contents) {
                    flags |= SectionFlags::LOAD;
                }
            }
            if sh_flags & SHF_WRITE != 0 {
                flags.remove(SectionFlags::READONLY);
            }
            if sh_flags & SHF_EXECINSTR != 0 {
                flags |= SectionFlags::CODE;
            }
            if sh_flags & SHF_MERGE != 0 {
                flags |= SectionFlags::MERGE;
            }
            if sh_flags & SHF_STRINGS != 0 {
                flags |= SectionFlags::STRINGS;
            }
            if sh_flags & SHF_GROUP != 0 {
                flags |= SectionFlags::GROUP;
            }
            if sh_flags & SHF_TLS != 0 {
                flags |= SectionFlags::THREAD_LOCAL;
            }
            if sh_flags & SHF_EXCLUDE != 0 {
                flags |= SectionFlags::EXCLUDE;
            }
        }
        object::SectionFlags::Coff { characteristics } => {
            if characteristics & IMAGE_SCN_MEM_EXECUTE != 0 {
                flags |= SectionFlags::CODE;
            }
            if characteristics & IMAGE_SCN_MEM_WRITE != 0 {
                flags.remove(SectionFlags::READONLY);
            }
            if characteristics & (IMAGE_SCN_LNK_REMOVE | IMAGE_SCN_MEM_DISCARDABLE) != 0 {
                flags |= SectionFlags::EXCLUDE;
            }
        }
        _ => {}
    }
    flags
}

fn convert_symbol<'data, S>(
    symbol: &S,
    sections: &HashMap<usize, (u64, String)>,
    relocatable: bool,
    dynamic: bool,
) -> Option<NativeSymbol>
where
    S: ObjectSymbol<'data>,
{
    let section_index = match symbol.section() {
        SymbolSection::Section(index) => Some(index.0),
        _ => None,
    };
    let owner = section_index.and_then(|i| sections.get(&i));
    let kind = symbol.kind();
    let name = match (kind, owner) {
        (SymbolKind::Section, Some((_, section_name))) => section_name.clone(),
        _ => symbol.name().unwrap_or("").to_string(),
    };
    if name.is_empty() && kind != SymbolKind::Section {
        return None;
    }
    let address = symbol.address();
    let value = match owner {
        Some((vma, _)) if !relocatable => address.wrapping_sub(*vma),
        _ => address,
    };

    let mut flags = SymbolFlags::empty();
    if symbol.is_weak() {
        flags |= SymbolFlags::WEAK;
    } else {
        match symbol.scope() {
            SymbolScope::Compilation => flags |= SymbolFlags::LOCAL,
            SymbolScope::Linkage | SymbolScope::Dynamic => {
                if !symbol.is_undefined() {
                    flags |= SymbolFlags::GLOBAL;
                }
            }
            _ => {}
        }
    }
    match kind {
        SymbolKind::Text => flags |= SymbolFlags::FUNCTION,
        SymbolKind::Data => flags |= SymbolFlags::OBJECT,
        SymbolKind::Tls => flags |= SymbolFlags::OBJECT | SymbolFlags::THREAD_LOCAL,
        SymbolKind::Section => flags |= SymbolFlags::SECTION_SYM | SymbolFlags::LOCAL,
        SymbolKind::File => flags |= SymbolFlags::FILE | SymbolFlags::DEBUGGING | SymbolFlags::LOCAL,
        _ => {}
    }
    if let object::SymbolFlags::Elf { st_info, .. } = symbol.flags() {
        if st_info & 0xf == STT_GNU_IFUNC {
            flags |= SymbolFlags::GNU_INDIRECT_FUNCTION;
        }
        if st_info >> 4 == STB_GNU_UNIQUE {
            flags |= SymbolFlags::GNU_UNIQUE;
            flags.remove(SymbolFlags::GLOBAL);
        }
    }
    if dynamic {
        flags |= SymbolFlags::DYNAMIC;
    }

    Some(NativeSymbol {
        section_index,
        name,
        value,
        flags: flags.bits(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_target_is_rejected() {
        let err = ObjectHandle::from_bytes(Bytes::new(), "x", "elf64-vax", IOLimits::default())
            .err()
            .unwrap();
        assert!(err.message.starts_with(INVALID_TARGET));
    }

    #[test]
    fn garbage_matches_no_probe() {
        let mut h = ObjectHandle::from_bytes(
            Bytes::from_static(b"not a binary at all"),
            "junk",
            arch::DEFAULT_TARGET,
            IOLimits::default(),
        )
        .unwrap();
        for format in Format::PROBE_ORDER {
            let err = h.check_format(format).unwrap_err();
            assert_eq!(err.message, FORMAT_NOT_RECOGNIZED);
        }
        assert!(h.sections().is_empty());
    }

    #[test]
    fn target_names() {
        assert_eq!(
            target_name(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little, true),
            "elf64-x86-64"
        );
        assert_eq!(
            target_name(BinaryFormat::Elf, Architecture::Mips, Endianness::Big, false),
            "elf32-tradbigmips"
        );
        assert_eq!(
            target_name(BinaryFormat::MachO, Architecture::Aarch64, Endianness::Little, true),
            "mach-o-arm64"
        );
        assert!(arch::is_known_target(&target_name(
            BinaryFormat::Pe,
            Architecture::X86_64,
            Endianness::Little,
            true
        )));
    }

    #[test]
    fn architecture_mapping() {
        assert_eq!(map_architecture(Architecture::X86_64), (ArchId::I386, mach::X86_64));
        assert_eq!(map_architecture(Architecture::Riscv64), (ArchId::RISCV, mach::RISCV64));
        assert_eq!(map_architecture(Architecture::Unknown), (ArchId::UNKNOWN, 0));
    }

    #[test]
    fn elf_section_flags() {
        let text = map_section_flags(
            SectionKind::Text,
            object::SectionFlags::Elf {
                sh_flags: SHF_ALLOC | SHF_EXECINSTR,
            },
        );
        assert!(text.contains(SectionFlags::DISASSEMBLABLE | SectionFlags::ALLOC | SectionFlags::READONLY));
        let data = map_section_flags(
            SectionKind::Data,
            object::SectionFlags::Elf {
                sh_flags: SHF_ALLOC | SHF_WRITE,
            },
        );
        assert!(!data.contains(SectionFlags::READONLY));
        assert!(!data.contains(SectionFlags::CODE));
        let bss = map_section_flags(
            SectionKind::UninitializedData,
            object::SectionFlags::Elf {
                sh_flags: SHF_ALLOC | SHF_WRITE,
            },
        );
        assert_eq!(bss, SectionFlags::ALLOC);
    }

    #[test]
    fn hidden_sections() {
        assert!(is_hidden_elf_section(SHT_SYMTAB, 0));
        assert!(is_hidden_elf_section(SHT_STRTAB, 0));
        assert!(!is_hidden_elf_section(SHT_STRTAB, SHF_ALLOC));
        assert!(!is_hidden_elf_section(1, SHF_ALLOC));
    }
}
