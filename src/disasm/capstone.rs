use capstone::{Arch, Capstone, Endian as CsEndian, Mode, NO_EXTRA_MODE};

use crate::core::binary::Endian;
use crate::core::disassembler::{
    Architecture, Disassembler, DisassemblerConfig, DisassemblerError, DisassemblerResult,
};
use crate::core::instruction::{DecodedInstruction, InstructionType};

pub struct CapstoneDisassembler {
    cs: capstone::Capstone,
    arch: Architecture,
    endian: Endian,
}

// Unknown byte order decodes as little endian.
fn cs_endian(end: Endian) -> CsEndian {
    if end.is_big() {
        CsEndian::Big
    } else {
        CsEndian::Little
    }
}

fn cs_arch_mode(arch: Architecture, end: Endian) -> Option<(Arch, Mode, Option<CsEndian>)> {
    match arch {
        Architecture::ARM => Some((Arch::ARM, Mode::Arm, Some(cs_endian(end)))),
        Architecture::ARM64 => Some((Arch::ARM64, Mode::Arm, Some(cs_endian(end)))),
        Architecture::MIPS => Some((Arch::MIPS, Mode::Mips32, Some(cs_endian(end)))),
        Architecture::MIPS64 => Some((Arch::MIPS, Mode::Mips64, Some(cs_endian(end)))),
        Architecture::PPC => Some((Arch::PPC, Mode::Mode32, Some(cs_endian(end)))),
        Architecture::PPC64 => Some((Arch::PPC, Mode::Mode64, Some(cs_endian(end)))),
        // capstone only decodes little-endian RISC-V
        Architecture::RISCV if !end.is_big() => Some((Arch::RISCV, Mode::RiscV32, None)),
        Architecture::RISCV64 if !end.is_big() => Some((Arch::RISCV, Mode::RiscV64, None)),
        _ => None,
    }
}

const ARM_CONDS: [&str; 16] = [
    "eq", "ne", "cs", "hs", "cc", "lo", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt", "le",
];

fn is_arm_cond(s: &str) -> bool {
    ARM_CONDS.contains(&s)
}

/// First `0x` literal in the operand text.
pub(crate) fn parse_hex_target(op_str: &str) -> Option<u64> {
    let start = op_str.find("0x")? + 2;
    let digits: String = op_str[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    u64::from_str_radix(&digits, 16).ok()
}

/// Classifies by mnemonic text, per family.
pub(crate) fn classify(arch: Architecture, mnemonic: &str, op_str: &str) -> InstructionType {
    let m = mnemonic.to_ascii_lowercase();
    let m = m
        .trim_end_matches(".w")
        .trim_end_matches(".n")
        .trim_end_matches('+')
        .trim_end_matches('-');
    match arch {
        Architecture::ARM => {
            let ops = op_str.to_ascii_lowercase();
            match m {
                "b" | "bx" => InstructionType::Branch,
                "bl" | "blx" => InstructionType::Jsr,
                "cbz" | "cbnz" => InstructionType::CondBranch,
                "pop" | "ldm" | "ldmia" if ops.contains("pc") => InstructionType::Branch,
                "ldr" | "mov" if ops.starts_with("pc") => InstructionType::Branch,
                _ if m.len() == 3 && m.starts_with('b') && is_arm_cond(&m[1..]) => {
                    InstructionType::CondBranch
                }
                _ if m.len() == 4 && m.starts_with("bl") && is_arm_cond(&m[2..]) => {
                    InstructionType::CondJsr
                }
                _ if m.len() == 4 && m.starts_with("bx") && is_arm_cond(&m[2..]) => {
                    InstructionType::CondBranch
                }
                "adr" => InstructionType::Dref,
                _ => InstructionType::NonBranch,
            }
        }
        Architecture::ARM64 => match m {
            "b" | "br" | "ret" | "retaa" | "retab" | "braa" | "brab" => InstructionType::Branch,
            "bl" | "blr" | "blraa" | "blrab" => InstructionType::Jsr,
            "cbz" | "cbnz" | "tbz" | "tbnz" => InstructionType::CondBranch,
            "adr" | "adrp" => InstructionType::Dref,
            _ if m.starts_with("b.") => InstructionType::CondBranch,
            _ => InstructionType::NonBranch,
        },
        Architecture::MIPS | Architecture::MIPS64 => match m {
            "j" | "jr" | "b" | "jr.hb" => InstructionType::Branch,
            "jal" | "jalr" | "bal" | "jalx" | "jalr.hb" => InstructionType::Jsr,
            "bgezal" | "bltzal" | "bgezall" | "bltzall" => InstructionType::CondJsr,
            "break" => InstructionType::NonBranch,
            _ if m.starts_with('b') => InstructionType::CondBranch,
            _ => InstructionType::NonBranch,
        },
        Architecture::PPC | Architecture::PPC64 => match m {
            "b" | "ba" | "blr" | "bctr" => InstructionType::Branch,
            "bl" | "bla" | "bctrl" | "blrl" => InstructionType::Jsr,
            _ if m.starts_with('b') && m.ends_with('l') && !m.ends_with("lr") => {
                InstructionType::CondJsr
            }
            _ if m.starts_with('b') => InstructionType::CondBranch,
            _ => InstructionType::NonBranch,
        },
        Architecture::RISCV | Architecture::RISCV64 => {
            let m = m.trim_start_matches("c.");
            match m {
                "j" | "jr" | "ret" | "tail" => InstructionType::Branch,
                "jal" | "jalr" | "call" => InstructionType::Jsr,
                _ if m.starts_with('b') => InstructionType::CondBranch,
                _ => InstructionType::NonBranch,
            }
        }
        _ => InstructionType::NonBranch,
    }
}

/// Branch target from operand text.
///
/// Absolute `0x` literals are taken as is. RISC-V prints PC-relative offsets
/// in decimal, so a trailing signed decimal operand is added to `address`.
pub(crate) fn branch_target(arch: Architecture, address: u64, op_str: &str) -> Option<u64> {
    if let Some(t) = parse_hex_target(op_str) {
        return Some(t);
    }
    if matches!(arch, Architecture::RISCV | Architecture::RISCV64) {
        let last = op_str.rsplit(',').next()?.trim();
        let off: i64 = last.parse().ok()?;
        return Some(address.wrapping_add(off as u64));
    }
    None
}

impl CapstoneDisassembler {
    pub fn new(config: &DisassemblerConfig) -> Option<Self> {
        let arch = config.architecture();
        let (a, m, endian) = cs_arch_mode(arch, config.endian)?;
        let cs = Capstone::new_raw(a, m, NO_EXTRA_MODE, endian).ok()?;
        let endian = match endian {
            Some(CsEndian::Big) => Endian::Big,
            _ => Endian::Little,
        };
        Some(Self { cs, arch, endian })
    }
}

impl Disassembler for CapstoneDisassembler {
    fn decode(&self, address: u64, bytes: &[u8]) -> DisassemblerResult<DecodedInstruction> {
        if bytes.len() < self.arch.min_instruction_length() {
            return Err(DisassemblerError::InsufficientBytes());
        }
        let insns = self
            .cs
            .disasm_count(bytes, address, 1)
            .map_err(|e| DisassemblerError::InternalError(e.to_string()))?;
        let insn = insns
            .iter()
            .next()
            .ok_or(DisassemblerError::InvalidInstruction())?;
        let mnemonic = insn.mnemonic().unwrap_or("");
        let op_str = insn.op_str().unwrap_or("");
        let insn_type = classify(self.arch, mnemonic, op_str);
        let target = match insn_type {
            InstructionType::NonBranch | InstructionType::NonInsn => None,
            _ => branch_target(self.arch, address, op_str),
        };
        let text = if op_str.is_empty() {
            mnemonic.to_string()
        } else {
            format!("{} {}", mnemonic, op_str)
        };
        Ok(DecodedInstruction {
            address,
            size: insn.bytes().len(),
            branch_delay: false,
            insn_type,
            target,
            target2: None,
            text,
        })
    }

    fn architecture(&self) -> Architecture {
        self.arch
    }

    fn endian(&self) -> Endian {
        self.endian
    }

    fn has_delay_slot(&self, insn: &DecodedInstruction) -> bool {
        matches!(self.arch, Architecture::MIPS | Architecture::MIPS64)
            && insn.insn_type.is_flow_change()
    }

    fn name(&self) -> &str {
        "capstone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arch::{mach, ArchId};

    #[test]
    fn arm_mnemonics() {
        assert_eq!(classify(Architecture::ARM, "bx", "lr"), InstructionType::Branch);
        assert_eq!(classify(Architecture::ARM, "bl", "#0x100"), InstructionType::Jsr);
        assert_eq!(classify(Architecture::ARM, "bne", "#0x100"), InstructionType::CondBranch);
        assert_eq!(classify(Architecture::ARM, "bleq", "#0x100"), InstructionType::CondJsr);
        assert_eq!(classify(Architecture::ARM, "bic", "r0, r0, #1"), InstructionType::NonBranch);
        assert_eq!(classify(Architecture::ARM, "pop", "{r4, pc}"), InstructionType::Branch);
    }

    #[test]
    fn other_family_mnemonics() {
        assert_eq!(classify(Architecture::ARM64, "ret", ""), InstructionType::Branch);
        assert_eq!(classify(Architecture::ARM64, "b.ne", "#0x10"), InstructionType::CondBranch);
        assert_eq!(classify(Architecture::MIPS, "jal", "0x400"), InstructionType::Jsr);
        assert_eq!(classify(Architecture::MIPS, "beq", "$a0, $a1, 0x10"), InstructionType::CondBranch);
        assert_eq!(classify(Architecture::MIPS, "break", ""), InstructionType::NonBranch);
        assert_eq!(classify(Architecture::PPC, "blr", ""), InstructionType::Branch);
        assert_eq!(classify(Architecture::PPC, "bl", "0x100"), InstructionType::Jsr);
        assert_eq!(classify(Architecture::PPC, "bne", "0x100"), InstructionType::CondBranch);
        assert_eq!(classify(Architecture::RISCV64, "c.jr", "ra"), InstructionType::Branch);
        assert_eq!(classify(Architecture::RISCV64, "bnez", "a0, 8"), InstructionType::CondBranch);
    }

    #[test]
    fn targets_from_text() {
        assert_eq!(parse_hex_target("#0x1008"), Some(0x1008));
        assert_eq!(parse_hex_target("r0, r1"), None);
        assert_eq!(branch_target(Architecture::RISCV64, 0x100, "a0, a1, -4"), Some(0xfc));
        assert_eq!(branch_target(Architecture::ARM, 0x100, "lr"), None);
    }

    #[test]
    fn decodes_arm64() {
        let cfg = DisassemblerConfig::new(ArchId::AARCH64, mach::AARCH64, Endian::Little);
        let d = CapstoneDisassembler::new(&cfg).expect("arm64 backend");
        // mov x0, #1; ret
        let bytes: [u8; 8] = [0x20, 0x00, 0x80, 0xD2, 0xC0, 0x03, 0x5F, 0xD6];
        let first = d.decode(0x1000, &bytes).unwrap();
        assert_eq!(first.size, 4);
        assert!(first.text.starts_with("mov"));
        let second = d.decode(0x1004, &bytes[4..]).unwrap();
        assert_eq!(second.insn_type, InstructionType::Branch);
    }

    #[test]
    fn short_buffer_is_insufficient() {
        let cfg = DisassemblerConfig::new(ArchId::AARCH64, mach::AARCH64, Endian::Little);
        let d = CapstoneDisassembler::new(&cfg).unwrap();
        assert_eq!(
            d.decode(0, &[0x20, 0x00]).unwrap_err(),
            DisassemblerError::InsufficientBytes()
        );
    }
}
