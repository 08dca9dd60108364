//! Text reports for the dump tool, in the layout of GNU objdump.

use tracing::debug;

use crate::bfd::Bfd;
use crate::core::address_space::AddressWidth;
use crate::core::arch;
use crate::core::section::SectionFlags;
use crate::demangle;
use crate::disasm::registry::BackendKind;
use crate::error::Result;
use crate::opcodes::Opcodes;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = "binary container inspection and disassembly";

/// Which report to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ArchiveHeaders,
    FileHeaders,
    SectionHeaders,
    Disassemble,
    DisassembleAll,
    FullContents,
    Syms,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOptions {
    pub demangle: bool,
    /// Instructions per section; 0 is unlimited
    pub max_instructions: usize,
    pub prefer_backend: Option<BackendKind>,
}

/// `"\n{filename}:     file format {target}\n"`
pub fn banner(bfd: &Bfd) -> Result<String> {
    Ok(format!(
        "\n{}:     file format {}\n",
        bfd.filename()?,
        bfd.target()?
    ))
}

/// Full report for one opened file, banner included.
///
/// Archives print each member's report under its own banner.
pub fn render(bfd: &Bfd, mode: Mode, opts: &DumpOptions) -> Result<String> {
    if bfd.is_archive() {
        let mut out = format!("In archive {}:\n", bfd.filename()?);
        for member in bfd.archive_members() {
            out.push_str(&banner(member)?);
            if mode != Mode::ArchiveHeaders {
                out.push_str(&body(member, mode, opts)?);
            }
        }
        for diag in bfd.archive_diagnostics() {
            out.push_str(&format!("{}: {}\n", diag.name, diag.error));
        }
        return Ok(out);
    }
    let mut out = banner(bfd)?;
    out.push_str(&body(bfd, mode, opts)?);
    Ok(out)
}

fn body(bfd: &Bfd, mode: Mode, opts: &DumpOptions) -> Result<String> {
    match mode {
        Mode::ArchiveHeaders => Ok(String::new()),
        Mode::FileHeaders => file_headers(bfd),
        Mode::SectionHeaders => section_headers(bfd),
        Mode::Disassemble => disassembly(bfd, false, opts),
        Mode::DisassembleAll => disassembly(bfd, true, opts),
        Mode::FullContents => full_contents(bfd),
        Mode::Syms => symbol_table(bfd, opts),
    }
}

fn width(bfd: &Bfd) -> Result<AddressWidth> {
    Ok(AddressWidth::from_arch_size(bfd.arch_size()?))
}

pub fn file_headers(bfd: &Bfd) -> Result<String> {
    let flags = bfd.file_flags()?.reportable();
    let mut out = format!(
        "architecture: {}, flags 0x{:08x}:\n",
        bfd.printable_arch_mach()?,
        flags.bits()
    );
    out.push_str(&flags.names().join(", "));
    out.push('\n');
    out.push_str(&format!(
        "start address 0x{}\n",
        width(bfd)?.format(bfd.start_address()?)
    ));
    Ok(out)
}

pub fn section_headers(bfd: &Bfd) -> Result<String> {
    let width = width(bfd)?;
    // column is the address digits plus two spaces
    let pad = " ".repeat(width.digits() - 1);
    let mut out = String::from("Sections:\n");
    out.push_str(&format!(
        "Idx Name          Size      VMA{pad}LMA{pad}File off  Algn\n"
    ));
    for section in bfd.sections().ordered() {
        out.push_str(&format!(
            "{:3} {:<13} {:08x}  {}  {}  {:08x}  2**{}\n",
            section.index(),
            section.name()?,
            section.size()?,
            width.format(section.vma()?),
            width.format(section.lma()?),
            section.file_offset()?,
            section.alignment()?
        ));
        out.push_str(&format!(
            "                  {}\n",
            section.flags()?.names().join(", ")
        ));
    }
    Ok(out)
}

/// Disassembly of code sections, or of every section with contents when `all`.
pub fn disassembly(bfd: &Bfd, all: bool, opts: &DumpOptions) -> Result<String> {
    let session = Opcodes::from_bfd_with_backend(bfd, opts.prefer_backend)?;
    let mut out = String::new();
    for section in bfd.sections().ordered() {
        let flags = section.flags()?;
        let wanted = if all {
            flags.contains(SectionFlags::HAS_CONTENTS)
        } else {
            flags.contains(SectionFlags::DISASSEMBLABLE)
        };
        if !wanted {
            continue;
        }
        let name = section.name()?;
        let content = section.content()?;
        let vma = section.vma()?;
        debug!(section = %name, bytes = content.len(), "Disassembling section");
        out.push_str(&format!("\nDisassembly of section {}:\n\n", name));
        let limit = match opts.max_instructions {
            0 => usize::MAX,
            n => n,
        };
        for insn in session.instructions(&content, vma)?.take(limit) {
            out.push_str(&format!("{:8x} ({})\t{}\n", insn.address, insn.size, insn.text));
        }
    }
    Ok(out)
}

/// Hex and ASCII rows of `data`, 16 bytes each, addressed from `start`.
pub fn hex_rows(data: &[u8], start: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        out.push_str(&format!(
            " {:08x} {:<47}  {}\n",
            start.wrapping_add(i as u64 * 16),
            hex.join(" "),
            ascii
        ));
    }
    out
}

pub fn full_contents(bfd: &Bfd) -> Result<String> {
    let mut out = String::new();
    for section in bfd.sections().ordered() {
        if !section.has_flags(SectionFlags::HAS_CONTENTS)? {
            continue;
        }
        out.push_str(&format!("Contents of section {}:\n", section.name()?));
        out.push_str(&hex_rows(&section.content()?, section.vma()?));
    }
    Ok(out)
}

pub fn symbol_table(bfd: &Bfd, opts: &DumpOptions) -> Result<String> {
    let width = width(bfd)?;
    let mut out = String::from("SYMBOL TABLE:\n");
    for (address, symbol) in bfd.symbols().iter() {
        let section = match bfd.symbol_section(symbol) {
            Some(s) => s.name()?,
            None => "*UND*".to_string(),
        };
        let name = if opts.demangle {
            demangle::display_name(symbol.name())
        } else {
            symbol.name().to_string()
        };
        out.push_str(&format!(
            "{} {:<15} {:<15} {} {}\n",
            width.format(*address),
            section,
            name,
            width.format(symbol.value()),
            symbol.flag_names().join(", ")
        ));
    }
    Ok(out)
}

/// Version line, architectures and targets.
pub fn info(prog: &str) -> String {
    let mut out = format!("{} {} ({})\n", prog, VERSION, DESCRIPTION);
    let names: Vec<&str> = arch::architectures().iter().map(|a| a.name()).collect();
    out.push_str(&format!(" {}\n", names.join(" ")));
    let decodable: Vec<&str> = arch::supported_architectures()
        .iter()
        .map(|a| a.name())
        .collect();
    out.push_str(&format!(" disassembly: {}\n", decodable.join(" ")));
    for target in arch::targets() {
        out.push_str(&format!("  {}\n", target));
    }
    out
}
