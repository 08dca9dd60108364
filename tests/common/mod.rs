//! Common test utilities and helpers.
//!
//! Builds small ELF and `ar` images in memory, writes them to temporary
//! files, and provides a scriptable native handle for container tests.

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

use objscope::core::arch::ArchId;
use objscope::core::binary::Format;
use objscope::core::section::SectionFlags;
use objscope::native::{
    Attributes, NativeError, NativeHandle, NativeMember, NativeResult, NativeSection, NativeSymbol,
};

/// Address `.text` is placed at in the generated executables.
pub const TEXT_VMA: u64 = 0x400000;

/// push rbp; mov rbp, rsp; xor eax, eax; pop rbp; ret; then nop padding.
pub const TEXT_BYTES: [u8; 16] = [
    0x55, 0x48, 0x89, 0xe5, 0x31, 0xc0, 0x5d, 0xc3, 0x90, 0x90, 0x90, 0x90, 0x90, 0x90, 0x90, 0x90,
];

const ET_REL: u16 = 1;
const ET_EXEC: u16 = 2;
const ET_CORE: u16 = 4;
const EM_X86_64: u16 = 62;

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

#[allow(clippy::too_many_arguments)]
fn section_header(
    buf: &mut Vec<u8>,
    name: u32,
    sh_type: u32,
    flags: u64,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    info: u32,
    align: u64,
    entsize: u64,
) {
    put_u32(buf, name);
    put_u32(buf, sh_type);
    put_u64(buf, flags);
    put_u64(buf, addr);
    put_u64(buf, offset);
    put_u64(buf, size);
    put_u32(buf, link);
    put_u32(buf, info);
    put_u64(buf, align);
    put_u64(buf, entsize);
}

/// ELF64 x86-64 image with `text` at [`TEXT_VMA`] and one global function
/// named `symbol` at the start of it.
fn build_elf(e_type: u16, symbol: &str, text: &[u8]) -> Vec<u8> {
    let symbol_value = if e_type == ET_REL { 0 } else { TEXT_VMA };
    let strtab_owned = format!("\0{}\0", symbol);
    let strtab: &[u8] = strtab_owned.as_bytes();
    let shstrtab: &[u8] = b"\0.text\0.symtab\0.strtab\0.shstrtab\0";

    let text_off = 0x40u64;
    let symtab_off = text_off + text.len() as u64;
    let symtab_size = 2 * 24u64;
    let strtab_off = symtab_off + symtab_size;
    let shstrtab_off = strtab_off + strtab.len() as u64;
    let shoff = (shstrtab_off + shstrtab.len() as u64 + 7) & !7;

    let mut buf = Vec::new();
    buf.extend_from_slice(b"\x7FELF");
    buf.extend_from_slice(&[2, 1, 1, 0]);
    buf.extend_from_slice(&[0u8; 8]);
    put_u16(&mut buf, e_type);
    put_u16(&mut buf, EM_X86_64);
    put_u32(&mut buf, 1);
    put_u64(&mut buf, if e_type == ET_REL { 0 } else { TEXT_VMA });
    put_u64(&mut buf, 0); // e_phoff
    put_u64(&mut buf, shoff);
    put_u32(&mut buf, 0);
    put_u16(&mut buf, 64);
    put_u16(&mut buf, 56);
    put_u16(&mut buf, 0);
    put_u16(&mut buf, 64);
    put_u16(&mut buf, 5);
    put_u16(&mut buf, 4);
    assert_eq!(buf.len() as u64, text_off);

    buf.extend_from_slice(text);

    // null symbol, then GLOBAL FUNC in section 1
    buf.extend_from_slice(&[0u8; 24]);
    put_u32(&mut buf, 1);
    buf.push(0x12);
    buf.push(0);
    put_u16(&mut buf, 1);
    put_u64(&mut buf, symbol_value);
    put_u64(&mut buf, 8);

    buf.extend_from_slice(strtab);
    buf.extend_from_slice(shstrtab);
    buf.resize(shoff as usize, 0);

    section_header(&mut buf, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0);
    section_header(
        &mut buf,
        1,
        1,
        0x6,
        TEXT_VMA,
        text_off,
        text.len() as u64,
        0,
        0,
        16,
        0,
    );
    section_header(&mut buf, 7, 2, 0, 0, symtab_off, symtab_size, 3, 1, 8, 24);
    section_header(&mut buf, 15, 3, 0, 0, strtab_off, strtab.len() as u64, 0, 0, 1, 0);
    section_header(
        &mut buf,
        23,
        3,
        0,
        0,
        shstrtab_off,
        shstrtab.len() as u64,
        0,
        0,
        1,
        0,
    );
    buf
}

pub fn elf_executable() -> Vec<u8> {
    build_elf(ET_EXEC, "main", &TEXT_BYTES)
}

pub fn elf_relocatable() -> Vec<u8> {
    build_elf(ET_REL, "main", &TEXT_BYTES)
}

/// Executable whose only symbol is `name`.
pub fn elf_with_symbol(name: &str) -> Vec<u8> {
    build_elf(ET_EXEC, name, &TEXT_BYTES)
}

/// Executable whose `.text` is [`TEXT_BYTES`] followed by nops up to `size` bytes.
pub fn elf_with_text_size(size: usize) -> Vec<u8> {
    let mut text = TEXT_BYTES.to_vec();
    text.resize(size, 0x90);
    build_elf(ET_EXEC, "main", &text)
}

/// Where the core image's loadable segment sits in memory.
pub const CORE_LOAD_VMA: u64 = 0x400000;
/// Its physical address.
pub const CORE_LOAD_PADDR: u64 = 0x1000;
pub const CORE_LOAD_SIZE: u64 = 0x100;

/// ELF64 x86-64 core image with no section headers: program header 0 is a
/// PT_NOTE holding one `CORE` note, program header 1 a readable and
/// executable PT_LOAD of [`CORE_LOAD_SIZE`] bytes filled with `0xcc`.
pub fn elf_core() -> Vec<u8> {
    const PT_LOAD: u32 = 1;
    const PT_NOTE: u32 = 4;
    let phoff = 0x40u64;
    let note_off = phoff + 2 * 56;
    let mut note = Vec::new();
    put_u32(&mut note, 5); // namesz
    put_u32(&mut note, 0); // descsz
    put_u32(&mut note, 1); // NT_PRSTATUS
    note.extend_from_slice(b"CORE\0\0\0\0");
    let load_off = 0x100u64;

    let mut buf = Vec::new();
    buf.extend_from_slice(b"\x7FELF");
    buf.extend_from_slice(&[2, 1, 1, 0]);
    buf.extend_from_slice(&[0u8; 8]);
    put_u16(&mut buf, ET_CORE);
    put_u16(&mut buf, EM_X86_64);
    put_u32(&mut buf, 1);
    put_u64(&mut buf, 0); // e_entry
    put_u64(&mut buf, phoff);
    put_u64(&mut buf, 0); // e_shoff
    put_u32(&mut buf, 0);
    put_u16(&mut buf, 64);
    put_u16(&mut buf, 56);
    put_u16(&mut buf, 2);
    put_u16(&mut buf, 64);
    put_u16(&mut buf, 0);
    put_u16(&mut buf, 0);
    assert_eq!(buf.len() as u64, phoff);

    for (p_type, flags, offset, vaddr, paddr, size, align) in [
        (PT_NOTE, 0u32, note_off, 0u64, 0u64, note.len() as u64, 4u64),
        (PT_LOAD, 0x5, load_off, CORE_LOAD_VMA, CORE_LOAD_PADDR, CORE_LOAD_SIZE, 0x1000),
    ] {
        put_u32(&mut buf, p_type);
        put_u32(&mut buf, flags);
        put_u64(&mut buf, offset);
        put_u64(&mut buf, vaddr);
        put_u64(&mut buf, paddr);
        put_u64(&mut buf, size); // p_filesz
        put_u64(&mut buf, size); // p_memsz
        put_u64(&mut buf, align);
    }
    assert_eq!(buf.len() as u64, note_off);
    buf.extend_from_slice(&note);
    buf.resize(load_off as usize, 0);
    buf.resize((load_off + CORE_LOAD_SIZE) as usize, 0xcc);
    buf
}

/// A System V `ar` archive holding `members` in order.
pub fn ar_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = b"!<arch>\n".to_vec();
    for (name, data) in members {
        let header = format!(
            "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
            format!("{}/", name),
            0,
            0,
            0,
            644,
            data.len()
        );
        assert_eq!(header.len(), 60);
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(data);
        if data.len() % 2 == 1 {
            buf.push(b'\n');
        }
    }
    buf
}

/// Writes `bytes` to a fresh temporary file.
pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// A scriptable native handle: matches the listed formats and reports the
/// given sections, symbols and members.
#[derive(Default)]
pub struct MockHandle {
    pub attrs: Attributes,
    pub matches: Vec<Format>,
    pub sections: Vec<NativeSection>,
    pub symbols: Vec<NativeSymbol>,
    pub members: Vec<(String, Option<MockHandle>)>,
}

impl MockHandle {
    pub fn named(filename: &str, matches: &[Format]) -> Self {
        Self {
            attrs: Attributes {
                filename: filename.to_string(),
                target: "elf64-x86-64".to_string(),
                arch: ArchId::I386,
                arch_size: 64,
                ..Attributes::default()
            },
            matches: matches.to_vec(),
            ..Self::default()
        }
    }

    /// An x86-64 object with a 16 byte `.text` at [`TEXT_VMA`] and `main` at value 0.
    pub fn text_object(filename: &str) -> Self {
        let mut mock = Self::named(filename, &[Format::Object]);
        mock.sections.push(NativeSection {
            index: 1,
            name: ".text".to_string(),
            size: TEXT_BYTES.len() as u64,
            vma: TEXT_VMA,
            lma: TEXT_VMA,
            alignment_power: 4,
            file_offset: 0x40,
            entry_size: 0,
            flags: SectionFlags::ALLOC | SectionFlags::LOAD | SectionFlags::DISASSEMBLABLE,
        });
        mock.symbols.push(NativeSymbol {
            section_index: Some(1),
            name: "main".to_string(),
            value: 0,
            flags: 0x2 | 0x8,
        });
        mock
    }
}

impl NativeHandle for MockHandle {
    fn check_format(&mut self, format: Format) -> NativeResult<()> {
        if self.matches.contains(&format) {
            Ok(())
        } else {
            Err(NativeError::new(format!("not a {:?}", format)))
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
        if index != 1 {
            return Err(NativeError::new("no contents"));
        }
        let start = offset as usize;
        let end = start + len as usize;
        TEXT_BYTES
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or_else(|| NativeError::new("out of range"))
    }

    fn symbols(&self) -> NativeResult<Vec<NativeSymbol>> {
        Ok(self.symbols.clone())
    }

    fn archive_members(&mut self) -> Vec<NativeMember> {
        self.members
            .drain(..)
            .map(|(name, handle)| NativeMember {
                handle: handle
                    .map(|h| Box::new(h) as Box<dyn NativeHandle>)
                    .ok_or_else(|| NativeError::new(format!("{}: truncated member", name))),
                name,
            })
            .collect()
    }

    fn close(&mut self) -> NativeResult<()> {
        Ok(())
    }
}
