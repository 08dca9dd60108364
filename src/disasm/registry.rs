use serde::{Deserialize, Serialize};

use crate::core::binary::Endian;
use crate::core::disassembler::{
    Architecture, Disassembler, DisassemblerConfig, DisassemblerError, DisassemblerResult,
};
use crate::core::instruction::DecodedInstruction;

pub enum Backend {
    Iced(super::iced::IcedDisassembler),
    Cap(super::capstone::CapstoneDisassembler),
}

impl Disassembler for Backend {
    fn decode(&self, address: u64, bytes: &[u8]) -> DisassemblerResult<DecodedInstruction> {
        match self {
            Backend::Iced(d) => d.decode(address, bytes),
            Backend::Cap(d) => d.decode(address, bytes),
        }
    }

    fn architecture(&self) -> Architecture {
        match self {
            Backend::Iced(d) => d.architecture(),
            Backend::Cap(d) => d.architecture(),
        }
    }

    fn endian(&self) -> Endian {
        match self {
            Backend::Iced(d) => d.endian(),
            Backend::Cap(d) => d.endian(),
        }
    }

    fn has_delay_slot(&self, insn: &DecodedInstruction) -> bool {
        match self {
            Backend::Iced(d) => d.has_delay_slot(insn),
            Backend::Cap(d) => d.has_delay_slot(insn),
        }
    }

    fn name(&self) -> &str {
        match self {
            Backend::Iced(d) => d.name(),
            Backend::Cap(d) => d.name(),
        }
    }
}

/// Select a disassembler backend for the given architecture triple.
pub fn for_config(config: &DisassemblerConfig) -> Option<Backend> {
    match config.architecture() {
        Architecture::X86_16 | Architecture::X86 | Architecture::X86_64 => {
            super::iced::IcedDisassembler::new(config).map(Backend::Iced)
        }
        Architecture::ARM
        | Architecture::ARM64
        | Architecture::MIPS
        | Architecture::MIPS64
        | Architecture::PPC
        | Architecture::PPC64
        | Architecture::RISCV
        | Architecture::RISCV64 => {
            super::capstone::CapstoneDisassembler::new(config).map(Backend::Cap)
        }
        Architecture::Unknown => None,
    }
}

/// Preferred backend kind for explicit selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Iced,
    Capstone,
}

/// Explicit backend selector. Returns an error if the backend cannot support the arch.
pub fn for_config_with(
    config: &DisassemblerConfig,
    prefer: Option<BackendKind>,
) -> Result<Backend, DisassemblerError> {
    match prefer {
        Some(BackendKind::Iced) => super::iced::IcedDisassembler::new(config)
            .map(Backend::Iced)
            .ok_or(DisassemblerError::UnsupportedArchitecture()),
        Some(BackendKind::Capstone) => super::capstone::CapstoneDisassembler::new(config)
            .map(Backend::Cap)
            .ok_or(DisassemblerError::UnsupportedArchitecture()),
        None => for_config(config).ok_or(DisassemblerError::UnsupportedArchitecture()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arch::{mach, ArchId};

    #[test]
    fn picks_backend_by_family() {
        let x86 = DisassemblerConfig::new(ArchId::I386, mach::X86_64, Endian::Little);
        assert_eq!(for_config(&x86).unwrap().name(), "iced-x86");
        let arm = DisassemblerConfig::new(ArchId::ARM, mach::ARM_UNKNOWN, Endian::Unknown);
        assert_eq!(for_config(&arm).unwrap().name(), "capstone");
        let vax = DisassemblerConfig::new(ArchId::VAX, 0, Endian::Little);
        assert!(for_config(&vax).is_none());
    }

    #[test]
    fn iced_rejects_arm64() {
        let cfg = DisassemblerConfig::new(ArchId::AARCH64, mach::AARCH64, Endian::Little);
        assert!(for_config_with(&cfg, Some(BackendKind::Iced)).is_err());
    }
}
