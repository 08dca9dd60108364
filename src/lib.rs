//! objscope: binary container inspection and instruction decoding.
//!
//! [`bfd::Bfd`] opens archives, object files and core dumps and exposes their
//! sections and symbols. [`opcodes::Opcodes`] decodes machine code for a chosen
//! architecture, either through a callback walk or an iterator.

/// Core data types module
pub mod core;

pub mod bfd;
pub mod config;
pub mod demangle;
pub mod disasm;
pub mod dump;
pub mod error;
pub mod io;
pub mod logging;
pub mod native;
pub mod opcodes;

pub use bfd::{Bfd, MemberDiagnostic, Source};
pub use config::Config;
pub use error::{BfdError, Result};
pub use opcodes::Opcodes;
