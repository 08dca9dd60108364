//! Decoded instruction records produced by a decoding session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse control-flow classification of one decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstructionType {
    /// Not a valid instruction (undecodable bytes)
    NonInsn,
    /// Falls through to the next instruction
    #[default]
    NonBranch,
    /// Unconditional branch, including returns
    Branch,
    CondBranch,
    /// Subroutine call
    Jsr,
    CondJsr,
    /// Single data reference
    Dref,
    /// Two data references
    Dref2,
}

impl InstructionType {
    pub fn code(&self) -> u32 {
        match self {
            InstructionType::NonInsn => 0,
            InstructionType::NonBranch => 1,
            InstructionType::Branch => 2,
            InstructionType::CondBranch => 3,
            InstructionType::Jsr => 4,
            InstructionType::CondJsr => 5,
            InstructionType::Dref => 6,
            InstructionType::Dref2 => 7,
        }
    }

    /// True for anything that may transfer control away from the next address.
    pub fn is_flow_change(&self) -> bool {
        matches!(
            self,
            InstructionType::Branch
                | InstructionType::CondBranch
                | InstructionType::Jsr
                | InstructionType::CondJsr
        )
    }
}

impl fmt::Display for InstructionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstructionType::NonInsn => "noninsn",
            InstructionType::NonBranch => "nonbranch",
            InstructionType::Branch => "branch",
            InstructionType::CondBranch => "condbranch",
            InstructionType::Jsr => "jsr",
            InstructionType::CondJsr => "condjsr",
            InstructionType::Dref => "dref",
            InstructionType::Dref2 => "dref2",
        };
        write!(f, "{}", s)
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    pub address: u64,
    /// Bytes consumed; the next record starts at `address + size`
    pub size: usize,
    /// Instruction sits in the delay slot of the preceding branch (MIPS style)
    pub branch_delay: bool,
    pub insn_type: InstructionType,
    pub target: Option<u64>,
    pub target2: Option<u64>,
    pub text: String,
}

impl DecodedInstruction {
    /// Placeholder record for bytes the engine could not decode.
    pub fn bad(address: u64, size: usize) -> Self {
        Self {
            address,
            size,
            branch_delay: false,
            insn_type: InstructionType::NonInsn,
            target: None,
            target2: None,
            text: "(bad)".to_string(),
        }
    }

    pub fn is_bad(&self) -> bool {
        self.insn_type == InstructionType::NonInsn
    }

    /// Address of the byte after this instruction.
    pub fn end(&self) -> u64 {
        self.address.wrapping_add(self.size as u64)
    }

    /// The `(address, size, text)` triple used by the eager disassembly form.
    pub fn to_triple(&self) -> (u64, usize, String) {
        (self.address, self.size, self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes() {
        assert_eq!(InstructionType::NonInsn.code(), 0);
        assert_eq!(InstructionType::CondJsr.code(), 5);
        assert_eq!(InstructionType::Dref2.code(), 7);
        assert!(InstructionType::Jsr.is_flow_change());
        assert!(!InstructionType::Dref.is_flow_change());
    }

    #[test]
    fn bad_record() {
        let r = DecodedInstruction::bad(0x1000, 1);
        assert!(r.is_bad());
        assert_eq!(r.end(), 0x1001);
        assert_eq!(r.to_triple(), (0x1000, 1, "(bad)".to_string()));
    }

    #[test]
    fn serializes_to_json() {
        let r = DecodedInstruction {
            address: 0x10,
            size: 1,
            branch_delay: false,
            insn_type: InstructionType::Branch,
            target: None,
            target2: None,
            text: "ret".to_string(),
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"insn_type\":\"Branch\""));
        let back: DecodedInstruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
