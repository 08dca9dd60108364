//! Disassembler trait and error types for instruction decoding.
//!
//! A [`Disassembler`] decodes exactly one instruction per call. Walking a
//! buffer, classifying bad bytes and cancellation are the session's job
//! ([`crate::opcodes`]), not the backend's.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::arch::{mach, ArchId};
use crate::core::binary::Endian;
use crate::core::instruction::DecodedInstruction;

/// Why a backend could not produce a record.
///
/// The session turns the first two into `(bad)` records; the last two never
/// reach a walk because they surface when the engine is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisassemblerError {
    #[error("InvalidInstruction")]
    InvalidInstruction(),
    /// Bytes end inside an instruction
    #[error("InsufficientBytes")]
    InsufficientBytes(),
    #[error("UnsupportedArchitecture")]
    UnsupportedArchitecture(),
    /// Engine failure, with the engine's message
    #[error("InternalError: {0}")]
    InternalError(String),
}

/// Result type for disassembly operations
pub type DisassemblerResult<T> = Result<T, DisassemblerError>;

/// Instruction set families a backend can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    /// x86 real mode (16-bit)
    X86_16,
    /// x86 (32-bit)
    X86,
    /// x86-64 (64-bit)
    X86_64,
    /// ARM (32-bit)
    ARM,
    /// ARM64/AArch64 (64-bit)
    ARM64,
    /// MIPS (32-bit)
    MIPS,
    /// MIPS64 (64-bit)
    MIPS64,
    /// PowerPC (32-bit)
    PPC,
    /// PowerPC64 (64-bit)
    PPC64,
    /// RISC-V (32-bit)
    RISCV,
    /// RISC-V (64-bit)
    RISCV64,
    /// Unknown/unsupported architecture
    Unknown,
}

impl Architecture {
    /// Resolves the family from an architecture id and machine number.
    pub fn from_arch_mach(arch: ArchId, machine: u64) -> Self {
        match arch {
            ArchId::I386 => {
                let core = machine & !mach::I386_INTEL_SYNTAX;
                if core & (mach::X86_64 | mach::X64_32) != 0 {
                    Architecture::X86_64
                } else if core == mach::I386_I8086 {
                    Architecture::X86_16
                } else {
                    Architecture::X86
                }
            }
            ArchId::ARM => Architecture::ARM,
            ArchId::AARCH64 => Architecture::ARM64,
            ArchId::MIPS => match machine {
                mach::MIPSISA64 | mach::MIPSISA64R2 => Architecture::MIPS64,
                _ => Architecture::MIPS,
            },
            ArchId::POWERPC => match machine {
                mach::PPC64 => Architecture::PPC64,
                _ => Architecture::PPC,
            },
            ArchId::RISCV => match machine {
                mach::RISCV64 => Architecture::RISCV64,
                _ => Architecture::RISCV,
            },
            _ => Architecture::Unknown,
        }
    }

    /// Smallest instruction unit; undecodable bytes are skipped in steps of this size.
    pub fn min_instruction_length(&self) -> usize {
        match self {
            Architecture::X86_16 | Architecture::X86 | Architecture::X86_64 => 1,
            Architecture::RISCV | Architecture::RISCV64 => 2,
            Architecture::Unknown => 1,
            _ => 4,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_16 => write!(f, "x86_16"),
            Architecture::X86 => write!(f, "x86"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::ARM => write!(f, "arm"),
            Architecture::ARM64 => write!(f, "arm64"),
            Architecture::MIPS => write!(f, "mips"),
            Architecture::MIPS64 => write!(f, "mips64"),
            Architecture::PPC => write!(f, "ppc"),
            Architecture::PPC64 => write!(f, "ppc64"),
            Architecture::RISCV => write!(f, "riscv"),
            Architecture::RISCV64 => write!(f, "riscv64"),
            Architecture::Unknown => write!(f, "unknown"),
        }
    }
}

/// Core disassembler trait that provides a common interface for instruction decoding
pub trait Disassembler {
    /// Decode the instruction at the start of `bytes`, which sits at `address`.
    ///
    /// `bytes` may extend past the instruction; only the decoded length is
    /// consumed and reported in the record's `size`.
    fn decode(&self, address: u64, bytes: &[u8]) -> DisassemblerResult<DecodedInstruction>;

    /// Get the architecture family this disassembler supports
    fn architecture(&self) -> Architecture;

    /// Get the endianness this disassembler uses
    fn endian(&self) -> Endian;

    /// True if `insn` is followed by a delay slot that executes before the transfer.
    fn has_delay_slot(&self, _insn: &DecodedInstruction) -> bool {
        false
    }

    /// Get a human-readable name for this disassembler
    fn name(&self) -> &str {
        "Generic Disassembler"
    }
}

/// Architecture triple a session hands to the backend registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassemblerConfig {
    pub arch: ArchId,
    pub machine: u64,
    pub endian: Endian,
}

impl DisassemblerConfig {
    pub fn new(arch: ArchId, machine: u64, endian: Endian) -> Self {
        Self {
            arch,
            machine,
            endian,
        }
    }

    pub fn architecture(&self) -> Architecture {
        Architecture::from_arch_mach(self.arch, self.machine)
    }

    /// Intel mnemonic syntax requested through the machine number (x86 only).
    pub fn intel_syntax(&self) -> bool {
        self.arch == ArchId::I386 && self.machine & mach::I386_INTEL_SYNTAX != 0
    }
}
