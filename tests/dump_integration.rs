mod common;

use common::{ar_archive, elf_core, elf_executable, write_temp};
use objscope::bfd::{Bfd, Source};
use objscope::dump::{self, DumpOptions, Mode};

fn open_elf() -> (tempfile::NamedTempFile, Bfd) {
    let tmp = write_temp(&elf_executable());
    let bfd = Bfd::open(Source::Path(tmp.path().to_path_buf()), "default").unwrap();
    (tmp, bfd)
}

#[test]
fn banner_names_file_and_target() {
    let (tmp, bfd) = open_elf();
    let banner = dump::banner(&bfd).unwrap();
    assert_eq!(
        banner,
        format!("\n{}:     file format elf64-x86-64\n", tmp.path().display())
    );
}

#[test]
fn file_headers_report() {
    let (_tmp, bfd) = open_elf();
    let text = dump::render(&bfd, Mode::FileHeaders, &DumpOptions::default()).unwrap();
    assert!(text.contains("architecture: i386:x86-64, flags 0x"));
    assert!(text.contains("EXEC_P"));
    assert!(text.contains("start address 0x0000000000400000"));
}

#[test]
fn core_section_headers_list_segments() {
    let tmp = write_temp(&elf_core());
    let bfd = Bfd::open(Source::Path(tmp.path().to_path_buf()), "default").unwrap();
    let text = dump::section_headers(&bfd).unwrap();
    assert!(text.contains("  0 note0         00000014  0000000000000000  0000000000000000  000000b0  2**2"));
    assert!(text.contains("  1 load1         00000100  0000000000400000  0000000000001000  00000100  2**12"));
}

#[test]
fn section_headers_report() {
    let (_tmp, bfd) = open_elf();
    let text = dump::section_headers(&bfd).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Sections:"));
    let header = lines.next().unwrap();
    assert!(header.starts_with("Idx Name          Size      VMA"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("  1 .text         00000010  0000000000400000  0000000000400000  00000040  2**4"));
    assert!(lines.next().unwrap().contains("CODE"));
}

#[test]
fn disassembly_report() {
    let (_tmp, bfd) = open_elf();
    let text = dump::disassembly(&bfd, false, &DumpOptions::default()).unwrap();
    assert!(text.contains("Disassembly of section .text:"));
    assert!(text.contains("  400000 (1)\tpush"));
    assert!(text.contains("\tret"));

    let opts = DumpOptions {
        max_instructions: 2,
        ..DumpOptions::default()
    };
    let short = dump::disassembly(&bfd, false, &opts).unwrap();
    assert_eq!(short.lines().filter(|l| l.contains('\t')).count(), 2);
}

#[test]
fn full_contents_report() {
    let (_tmp, bfd) = open_elf();
    let text = dump::full_contents(&bfd).unwrap();
    assert!(text.starts_with("Contents of section .text:\n 00400000 55 48 89 e5"));
}

#[test]
fn symbol_table_report() {
    let (_tmp, bfd) = open_elf();
    let text = dump::symbol_table(&bfd, &DumpOptions::default()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("SYMBOL TABLE:"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("0000000000400000 .text "));
    assert!(row.contains(" main "));
    assert!(row.contains("GLOBAL"));
}

#[test]
fn archive_report_lists_members() {
    let exe = elf_executable();
    let ar = ar_archive(&[("one", &exe[..]), ("two", &exe[..])]);
    let tmp = write_temp(&ar);
    let bfd = Bfd::open(Source::Path(tmp.path().to_path_buf()), "default").unwrap();
    let text = dump::render(&bfd, Mode::ArchiveHeaders, &DumpOptions::default()).unwrap();
    assert!(text.starts_with("In archive "));
    assert!(text.contains("\none:     file format elf64-x86-64\n"));
    assert!(text.contains("\ntwo:     file format elf64-x86-64\n"));

    let syms = dump::render(&bfd, Mode::Syms, &DumpOptions::default()).unwrap();
    assert_eq!(syms.matches("SYMBOL TABLE:").count(), 2);
}

#[test]
fn reports_on_system_binary_if_present() {
    let path = "/bin/ls";
    match Bfd::open(Source::Path(path.into()), "default") {
        Ok(bfd) => {
            let opts = DumpOptions {
                demangle: true,
                max_instructions: 16,
                ..DumpOptions::default()
            };
            for mode in [Mode::FileHeaders, Mode::SectionHeaders, Mode::Syms, Mode::Disassemble] {
                let text = dump::render(&bfd, mode, &opts);
                // foreign architectures may have no decoder
                if mode != Mode::Disassemble {
                    assert!(text.is_ok(), "{:?} failed on {}", mode, path);
                }
            }
        }
        Err(e) => eprintln!("Skipping system binary report; {} not usable: {}", path, e),
    }
}
