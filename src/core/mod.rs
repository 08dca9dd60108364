//! Core data types for container inspection.
//!
//! Leaf types shared by the container, the native engines and the decoding
//! session: address arithmetic, format and byte order, static architecture
//! tables, sections, symbols and decoded instructions.

pub mod address_space;
pub mod arch;
pub mod binary;
pub mod disassembler;
pub mod instruction;
pub mod section;
pub mod symbol;
