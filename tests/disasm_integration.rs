mod common;

use std::ops::ControlFlow;

use common::{elf_executable, write_temp, MockHandle, TEXT_BYTES, TEXT_VMA};
use objscope::bfd::{Bfd, Source};
use objscope::core::arch::{mach, ArchId};
use objscope::core::binary::Endian;
use objscope::core::section::SectionFlags;
use objscope::disasm::registry::BackendKind;
use objscope::error::BfdError;
use objscope::opcodes::Opcodes;

fn x64() -> Opcodes {
    Opcodes::with_triple(ArchId::I386, mach::X86_64_INTEL_SYNTAX, Endian::Little).unwrap()
}

#[test]
fn walk_is_contiguous_and_bounded() {
    let session = x64();
    let base = 0x7000u64;
    let mut expected = base;
    let mut count = 0;
    let mut walk = session.instructions(&TEXT_BYTES, base).unwrap();
    while let Some(insn) = walk.next() {
        assert_eq!(insn.address, expected);
        assert!(insn.size > 0);
        expected = insn.end();
        assert_eq!(walk.position() as u64, expected - base);
        count += 1;
    }
    assert!(expected <= base + TEXT_BYTES.len() as u64);
    assert_eq!(expected, base + TEXT_BYTES.len() as u64);
    // push, mov, xor, pop, ret and eight nops
    assert_eq!(count, 13);
}

#[test]
fn stopping_at_k_delivers_k_plus_one() {
    for k in 0..5usize {
        let mut session = x64();
        session.initialize_smart_disassemble(TEXT_BYTES.to_vec(), TEXT_VMA);
        let mut delivered = 0usize;
        session
            .start_smart_disassemble(0, |_| {
                delivered += 1;
                if delivered == k + 1 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(delivered, k + 1);
    }
}

#[test]
fn walk_offset_past_buffer_is_invalid() {
    let mut session = x64();
    session.initialize_smart_disassemble(vec![0x90; 4], 0);
    let err = session
        .start_smart_disassemble(5, |_| ControlFlow::Continue(()))
        .unwrap_err();
    assert!(matches!(err, BfdError::InvalidInput(_)));
}

#[test]
fn rejected_offset_keeps_buffer_bound() {
    let mut session = x64();
    session.initialize_smart_disassemble(vec![0x90; 4], 0x1000);
    assert!(session
        .start_smart_disassemble(9, |_| ControlFlow::Continue(()))
        .is_err());

    let mut addresses = Vec::new();
    let consumed = session
        .start_smart_disassemble(2, |insn| {
            addresses.push(insn.address);
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(consumed, 2);
    assert_eq!(addresses, vec![0x1002, 0x1003]);

    // the successful walk used the buffer up
    let err = session
        .start_smart_disassemble(0, |_| ControlFlow::Continue(()))
        .unwrap_err();
    assert!(matches!(err, BfdError::Uninitialized));
}

#[test]
fn session_without_triple_is_uninitialized() {
    let mut session = Opcodes::new();
    session.initialize_smart_disassemble(vec![0x90], 0);
    let err = session
        .start_smart_disassemble(0, |_| ControlFlow::Continue(()))
        .unwrap_err();
    assert!(matches!(err, BfdError::Uninitialized));
}

#[test]
fn triple_round_trips() {
    let mut session = Opcodes::new();
    session.set_architecture(ArchId::AARCH64).unwrap();
    session.set_machine(mach::AARCH64).unwrap();
    session.set_endian(Endian::Little).unwrap();
    assert_eq!(session.architecture(), Some(ArchId::AARCH64));
    assert_eq!(session.machine(), Some(mach::AARCH64));
    assert_eq!(session.endian(), Some(Endian::Little));
    assert_eq!(session.backend_name(), Some("capstone"));
}

#[test]
fn from_bfd_overrides_x86_machine_by_width() {
    let mut mock = MockHandle::text_object("a.o");
    mock.attrs.machine = mach::X86_64;
    mock.attrs.endian = Endian::Little;
    let bfd = Bfd::open(Source::Native(Box::new(mock)), "default").unwrap();
    let session = Opcodes::from_bfd(&bfd).unwrap();
    assert_eq!(session.architecture(), Some(ArchId::I386));
    assert_eq!(session.machine(), Some(mach::X86_64_INTEL_SYNTAX));
    assert_eq!(session.endian(), Some(Endian::Little));

    let mut mock32 = MockHandle::text_object("b.o");
    mock32.attrs.arch_size = 32;
    let bfd32 = Bfd::open(Source::Native(Box::new(mock32)), "default").unwrap();
    let session32 = Opcodes::from_bfd(&bfd32).unwrap();
    assert_eq!(session32.machine(), Some(mach::I386_I386_INTEL_SYNTAX));
}

#[test]
fn from_bfd_keeps_non_x86_triple() {
    let mut mock = MockHandle::text_object("arm.o");
    mock.attrs.arch = ArchId::AARCH64;
    mock.attrs.machine = mach::AARCH64;
    mock.attrs.endian = Endian::Little;
    let bfd = Bfd::open(Source::Native(Box::new(mock)), "default").unwrap();
    let session = Opcodes::from_bfd_with_backend(&bfd, Some(BackendKind::Capstone)).unwrap();
    assert_eq!(session.architecture(), Some(ArchId::AARCH64));
    assert_eq!(session.machine(), Some(mach::AARCH64));
}

#[test]
fn from_closed_bfd_is_uninitialized() {
    let mut bfd = Bfd::open(
        Source::Native(Box::new(MockHandle::text_object("a.o"))),
        "default",
    )
    .unwrap();
    bfd.close().unwrap();
    assert!(matches!(Opcodes::from_bfd(&bfd), Err(BfdError::Uninitialized)));
}

#[test]
fn disassemble_text_section_of_elf() {
    let tmp = write_temp(&elf_executable());
    let bfd = Bfd::open(Source::Path(tmp.path().to_path_buf()), "default").unwrap();
    let session = Opcodes::from_bfd(&bfd).unwrap();
    let text = bfd
        .sections()
        .ordered()
        .into_iter()
        .find(|s| s.has_flags(SectionFlags::DISASSEMBLABLE).unwrap())
        .expect("code section");
    let bytes = text.content().unwrap();
    let vma = text.vma().unwrap();
    let out = session.disassemble(&bytes, vma).unwrap();
    assert_eq!(out[0].0, TEXT_VMA);
    assert!(out[0].2.to_ascii_lowercase().starts_with("push"));
    assert!(out.iter().any(|(_, _, text)| text.starts_with("ret")));

    let mut walker = Opcodes::from_bfd(&bfd).unwrap();
    walker.initialize_smart_disassemble(bytes.clone(), vma);
    let mut callback_triples = Vec::new();
    walker
        .start_smart_disassemble(0, |insn| {
            callback_triples.push(insn.to_triple());
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(callback_triples, out);
}
