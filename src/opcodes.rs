//! Instruction decoding sessions.
//!
//! An [`Opcodes`] session holds an architecture triple and the decoding
//! engine built for it. Walks are single pass: each record starts where the
//! previous one ended, and bytes the engine cannot decode still yield a
//! `(bad)` record so the walk always moves forward.

use std::fmt;
use std::ops::ControlFlow;
use tracing::{debug, trace};

use crate::bfd::Bfd;
use crate::core::arch::{mach, ArchId};
use crate::core::binary::Endian;
use crate::core::disassembler::{Disassembler, DisassemblerConfig};
use crate::core::instruction::DecodedInstruction;
use crate::disasm::registry::{self, Backend, BackendKind};
use crate::error::{BfdError, Result};

/// A decoding session.
#[derive(Default)]
pub struct Opcodes {
    arch: Option<ArchId>,
    machine: Option<u64>,
    endian: Option<Endian>,
    prefer: Option<BackendKind>,
    engine: Option<Backend>,
    pending: Option<(Vec<u8>, u64)>,
}

impl fmt::Debug for Opcodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opcodes")
            .field("arch", &self.arch)
            .field("machine", &self.machine)
            .field("endian", &self.endian)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl Opcodes {
    /// A session with no triple; set all three parts before decoding.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_triple(arch: ArchId, machine: u64, endian: Endian) -> Result<Self> {
        Self::with_triple_and_backend(arch, machine, endian, None)
    }

    pub fn with_triple_and_backend(
        arch: ArchId,
        machine: u64,
        endian: Endian,
        prefer: Option<BackendKind>,
    ) -> Result<Self> {
        let mut session = Self {
            arch: Some(arch),
            machine: Some(machine),
            endian: Some(endian),
            prefer,
            ..Self::default()
        };
        session.rebuild()?;
        Ok(session)
    }

    /// Takes the triple from `bfd`.
    ///
    /// x86 containers always decode in Intel syntax, in the sub-mode that
    /// matches the container's address width.
    pub fn from_bfd(bfd: &Bfd) -> Result<Self> {
        Self::from_bfd_with_backend(bfd, None)
    }

    pub fn from_bfd_with_backend(bfd: &Bfd, prefer: Option<BackendKind>) -> Result<Self> {
        let arch = bfd.architecture()?;
        let mut machine = bfd.machine()?;
        if arch == ArchId::I386 {
            machine = match bfd.arch_size()? {
                32 => mach::I386_I386_INTEL_SYNTAX,
                64 => mach::X86_64_INTEL_SYNTAX,
                _ => machine,
            };
        }
        Self::with_triple_and_backend(arch, machine, bfd.endian()?, prefer)
    }

    /// Recreates the engine once the triple is complete.
    fn rebuild(&mut self) -> Result<()> {
        self.engine = None;
        let (arch, machine, endian) = match (self.arch, self.machine, self.endian) {
            (Some(a), Some(m), Some(e)) => (a, m, e),
            _ => return Ok(()),
        };
        let config = DisassemblerConfig::new(arch, machine, endian);
        let engine = registry::for_config_with(&config, self.prefer).map_err(|_| {
            BfdError::DecodeUnsupported {
                arch,
                machine,
                endian,
            }
        })?;
        debug!(
            arch = %arch,
            machine,
            endian = %endian,
            backend = engine.name(),
            "Created decoding engine"
        );
        self.engine = Some(engine);
        Ok(())
    }

    pub fn architecture(&self) -> Option<ArchId> {
        self.arch
    }

    pub fn set_architecture(&mut self, arch: ArchId) -> Result<()> {
        self.arch = Some(arch);
        self.rebuild()
    }

    pub fn machine(&self) -> Option<u64> {
        self.machine
    }

    pub fn set_machine(&mut self, machine: u64) -> Result<()> {
        self.machine = Some(machine);
        self.rebuild()
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) -> Result<()> {
        self.endian = Some(endian);
        self.rebuild()
    }

    /// True once a complete, supported triple has produced an engine.
    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Name of the engine in use.
    pub fn backend_name(&self) -> Option<&str> {
        self.engine.as_ref().map(|e| e.name())
    }

    fn engine(&self) -> Result<&Backend> {
        self.engine.as_ref().ok_or(BfdError::Uninitialized)
    }

    /// Binds `buffer`, which sits at `base`, for the next walk. Decodes nothing.
    pub fn initialize_smart_disassemble(&mut self, buffer: impl Into<Vec<u8>>, base: u64) {
        self.pending = Some((buffer.into(), base));
    }

    /// Walks the bound buffer from `base + offset`, handing each record to `callback`.
    ///
    /// Breaking from the callback stops before the next decode. Returns the
    /// number of bytes the delivered records cover. A walk that starts uses up
    /// the bound buffer: another walk needs another `initialize_smart_disassemble`.
    pub fn start_smart_disassemble<F>(&mut self, offset: u64, mut callback: F) -> Result<usize>
    where
        F: FnMut(&DecodedInstruction) -> ControlFlow<()>,
    {
        let engine = self.engine.as_ref().ok_or(BfdError::Uninitialized)?;
        let bound_len = self
            .pending
            .as_ref()
            .map(|(buffer, _)| buffer.len())
            .ok_or(BfdError::Uninitialized)?;
        // a rejected offset leaves the buffer bound for a corrected retry
        let start = usize::try_from(offset)
            .ok()
            .filter(|o| *o <= bound_len)
            .ok_or_else(|| {
                BfdError::InvalidInput(format!(
                    "offset {:#x} outside buffer of {:#x} bytes",
                    offset, bound_len
                ))
            })?;
        let (buffer, base) = self.pending.take().ok_or(BfdError::Uninitialized)?;
        let mut consumed = 0usize;
        for insn in Instructions::starting_at(engine, &buffer, base, start) {
            consumed += insn.size;
            if callback(&insn).is_break() {
                trace!(address = insn.address, "Walk stopped by callback");
                break;
            }
        }
        Ok(consumed)
    }

    /// Lazy walk over `buffer` placed at `base`.
    pub fn instructions<'a>(&'a self, buffer: &'a [u8], base: u64) -> Result<Instructions<'a>> {
        Ok(Instructions::starting_at(self.engine()?, buffer, base, 0))
    }

    /// Decodes all of `buffer` into `(address, size, text)` triples.
    pub fn disassemble(&self, buffer: &[u8], base: u64) -> Result<Vec<(u64, usize, String)>> {
        Ok(self
            .instructions(buffer, base)?
            .map(|insn| insn.to_triple())
            .collect())
    }
}

/// Address-ordered decoded instructions over one buffer.
///
/// Finite and not restartable; dropping it ends the walk.
pub struct Instructions<'a> {
    engine: &'a Backend,
    buffer: &'a [u8],
    base: u64,
    pos: usize,
    delay_pending: bool,
}

impl<'a> Instructions<'a> {
    fn starting_at(engine: &'a Backend, buffer: &'a [u8], base: u64, pos: usize) -> Self {
        Self {
            engine,
            buffer,
            base,
            pos,
            delay_pending: false,
        }
    }

    /// Offset of the next record inside the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Instructions<'_> {
    type Item = DecodedInstruction;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.buffer.get(self.pos..).filter(|r| !r.is_empty())?;
        let address = self.base.wrapping_add(self.pos as u64);
        let mut insn = match self.engine.decode(address, rest) {
            Ok(insn) if insn.size > 0 && insn.size <= rest.len() => insn,
            Ok(_) | Err(_) => {
                let unit = self
                    .engine
                    .architecture()
                    .min_instruction_length()
                    .clamp(1, rest.len());
                trace!(address, size = unit, "Undecodable bytes");
                DecodedInstruction::bad(address, unit)
            }
        };
        insn.branch_delay = self.delay_pending;
        self.delay_pending = !insn.is_bad() && self.engine.has_delay_slot(&insn);
        self.pos += insn.size;
        Some(insn)
    }
}
