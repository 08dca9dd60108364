use iced_x86::{
    Decoder, DecoderError, DecoderOptions, FlowControl, Formatter, GasFormatter, IntelFormatter,
    OpKind,
};

use crate::core::binary::Endian;
use crate::core::disassembler::{
    Architecture, Disassembler, DisassemblerConfig, DisassemblerError, DisassemblerResult,
};
use crate::core::instruction::{DecodedInstruction, InstructionType};

pub struct IcedDisassembler {
    bits: u32,
    arch: Architecture,
    intel_syntax: bool,
    endian: Endian,
}

impl IcedDisassembler {
    /// Builds an x86 decoder; big-endian x86 does not exist, so that is refused.
    pub fn new(config: &DisassemblerConfig) -> Option<Self> {
        let arch = config.architecture();
        let bits = match arch {
            Architecture::X86_16 => 16,
            Architecture::X86 => 32,
            Architecture::X86_64 => 64,
            _ => return None,
        };
        if config.endian.is_big() {
            return None;
        }
        Some(Self {
            bits,
            arch,
            intel_syntax: config.intel_syntax(),
            endian: Endian::Little,
        })
    }

    fn format(&self, instr: &iced_x86::Instruction) -> String {
        let mut out = String::new();
        if self.intel_syntax {
            let mut fmt = IntelFormatter::new();
            fmt.format(instr, &mut out);
        } else {
            let mut fmt = GasFormatter::new();
            fmt.format(instr, &mut out);
        }
        out
    }

    fn classify(instr: &iced_x86::Instruction) -> (InstructionType, Option<u64>) {
        let near_target = match instr.op0_kind() {
            OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
                Some(instr.near_branch_target())
            }
            _ => None,
        };
        match instr.flow_control() {
            FlowControl::UnconditionalBranch | FlowControl::IndirectBranch => {
                (InstructionType::Branch, near_target)
            }
            FlowControl::Return => (InstructionType::Branch, None),
            FlowControl::ConditionalBranch => (InstructionType::CondBranch, near_target),
            FlowControl::Call | FlowControl::IndirectCall => (InstructionType::Jsr, near_target),
            _ if instr.is_ip_rel_memory_operand() => {
                (InstructionType::Dref, Some(instr.ip_rel_memory_address()))
            }
            _ => (InstructionType::NonBranch, None),
        }
    }
}

impl Disassembler for IcedDisassembler {
    fn decode(&self, address: u64, bytes: &[u8]) -> DisassemblerResult<DecodedInstruction> {
        let mut decoder = Decoder::with_ip(self.bits, bytes, address, DecoderOptions::NONE);
        let instr = decoder.decode();
        if instr.is_invalid() {
            return Err(match decoder.last_error() {
                DecoderError::NoMoreBytes => DisassemblerError::InsufficientBytes(),
                _ => DisassemblerError::InvalidInstruction(),
            });
        }
        let (insn_type, target) = Self::classify(&instr);
        Ok(DecodedInstruction {
            address,
            size: instr.len(),
            branch_delay: false,
            insn_type,
            target,
            target2: None,
            text: self.format(&instr),
        })
    }

    fn architecture(&self) -> Architecture {
        self.arch
    }

    fn endian(&self) -> Endian {
        self.endian
    }

    fn name(&self) -> &str {
        "iced-x86"
    }
}
