//! Static architecture, machine and target tables.
//!
//! The numeric architecture ids follow the BFD enumeration so values read from
//! tooling built on libbfd line up with ours. The tables are built once and
//! never change at runtime.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Numeric architecture identifier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ArchId(pub u32);

impl ArchId {
    pub const UNKNOWN: ArchId = ArchId(0);
    pub const OBSCURE: ArchId = ArchId(1);
    pub const M68K: ArchId = ArchId(2);
    pub const VAX: ArchId = ArchId(3);
    pub const I960: ArchId = ArchId(4);
    pub const OR32: ArchId = ArchId(5);
    pub const SPARC: ArchId = ArchId(6);
    pub const SPU: ArchId = ArchId(7);
    pub const MIPS: ArchId = ArchId(8);
    pub const I386: ArchId = ArchId(9);
    pub const L1OM: ArchId = ArchId(10);
    pub const K1OM: ArchId = ArchId(11);
    pub const I860: ArchId = ArchId(14);
    pub const I370: ArchId = ArchId(15);
    pub const M88K: ArchId = ArchId(18);
    pub const H8300: ArchId = ArchId(21);
    pub const PDP11: ArchId = ArchId(22);
    pub const POWERPC: ArchId = ArchId(24);
    pub const RS6000: ArchId = ArchId(25);
    pub const HPPA: ArchId = ArchId(26);
    pub const D10V: ArchId = ArchId(27);
    pub const D30V: ArchId = ArchId(28);
    pub const DLX: ArchId = ArchId(29);
    pub const M68HC11: ArchId = ArchId(30);
    pub const Z8K: ArchId = ArchId(34);
    pub const H8500: ArchId = ArchId(35);
    pub const SH: ArchId = ArchId(36);
    pub const ALPHA: ArchId = ArchId(37);
    pub const ARM: ArchId = ArchId(38);
    pub const NS32K: ArchId = ArchId(39);
    pub const W65: ArchId = ArchId(40);
    pub const TIC30: ArchId = ArchId(41);
    pub const TIC4X: ArchId = ArchId(42);
    pub const TIC54X: ArchId = ArchId(43);
    pub const TIC6X: ArchId = ArchId(44);
    pub const TIC80: ArchId = ArchId(45);
    pub const M32C: ArchId = ArchId(48);
    pub const M32R: ArchId = ArchId(49);
    pub const MN10200: ArchId = ArchId(50);
    pub const MN10300: ArchId = ArchId(51);
    pub const FR30: ArchId = ArchId(52);
    pub const FRV: ArchId = ArchId(53);
    pub const MOXIE: ArchId = ArchId(54);
    pub const MCORE: ArchId = ArchId(55);
    pub const MEP: ArchId = ArchId(56);
    pub const IA64: ArchId = ArchId(57);
    pub const IQ2000: ArchId = ArchId(59);
    pub const MT: ArchId = ArchId(61);
    pub const PJ: ArchId = ArchId(62);
    pub const AVR: ArchId = ArchId(63);
    pub const BFIN: ArchId = ArchId(64);
    pub const CR16C: ArchId = ArchId(66);
    pub const CRX: ArchId = ArchId(67);
    pub const RL78: ArchId = ArchId(69);
    pub const RX: ArchId = ArchId(70);
    pub const S390: ArchId = ArchId(71);
    pub const SCORE: ArchId = ArchId(72);
    pub const OPENRISC: ArchId = ArchId(73);
    pub const MMIX: ArchId = ArchId(74);
    pub const XSTORMY16: ArchId = ArchId(75);
    pub const MSP430: ArchId = ArchId(76);
    pub const XC16X: ArchId = ArchId(77);
    pub const XTENSA: ArchId = ArchId(79);
    pub const Z80: ArchId = ArchId(80);
    pub const LM32: ArchId = ArchId(81);
    pub const MICROBLAZE: ArchId = ArchId(82);
    pub const TILEPRO: ArchId = ArchId(83);
    pub const TILEGX: ArchId = ArchId(84);
    pub const AARCH64: ArchId = ArchId(85);
    pub const RISCV: ArchId = ArchId(86);

    /// Short printable name ("i386", "aarch64"), or "unknown".
    pub fn name(&self) -> &'static str {
        ARCH_BY_ID.get(self).map(|e| e.name).unwrap_or("unknown")
    }

    /// Long descriptive name ("Intel 386"), or "Unknown architecture".
    pub fn description(&self) -> &'static str {
        ARCH_BY_ID
            .get(self)
            .map(|e| e.description)
            .unwrap_or("Unknown architecture")
    }

    /// True when a decoding engine backs this architecture.
    pub fn is_decodable(&self) -> bool {
        DECODABLE.contains(self)
    }
}

impl fmt::Display for ArchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Machine (sub-architecture) numbers, scoped by architecture.
pub mod mach {
    pub const UNKNOWN: u64 = 0;

    pub const I386_INTEL_SYNTAX: u64 = 1 << 0;
    pub const I386_I8086: u64 = 1 << 1;
    pub const I386_I386: u64 = 1 << 2;
    pub const X86_64: u64 = 1 << 3;
    pub const X64_32: u64 = 1 << 4;
    pub const I386_I386_INTEL_SYNTAX: u64 = I386_I386 | I386_INTEL_SYNTAX;
    pub const X86_64_INTEL_SYNTAX: u64 = X86_64 | I386_INTEL_SYNTAX;
    pub const X64_32_INTEL_SYNTAX: u64 = X64_32 | I386_INTEL_SYNTAX;
    pub const L1OM: u64 = 1 << 5;
    pub const L1OM_INTEL_SYNTAX: u64 = L1OM | I386_INTEL_SYNTAX;
    pub const K1OM: u64 = 1 << 6;
    pub const K1OM_INTEL_SYNTAX: u64 = K1OM | I386_INTEL_SYNTAX;

    pub const ARM_UNKNOWN: u64 = 0;
    pub const ARM_2: u64 = 1;
    pub const ARM_4T: u64 = 6;
    pub const ARM_5TE: u64 = 9;
    pub const ARM_XSCALE: u64 = 10;

    pub const AARCH64: u64 = 0;
    pub const AARCH64_ILP32: u64 = 32;

    pub const MIPS3000: u64 = 3000;
    pub const MIPSISA32: u64 = 32;
    pub const MIPSISA32R2: u64 = 33;
    pub const MIPSISA64: u64 = 64;
    pub const MIPSISA64R2: u64 = 65;

    pub const PPC: u64 = 32;
    pub const PPC64: u64 = 64;

    pub const SPARC: u64 = 1;
    pub const SPARC_V9: u64 = 7;

    pub const RISCV32: u64 = 132;
    pub const RISCV64: u64 = 164;

    pub const M68K_68020: u64 = 4;
    pub const S390_31: u64 = 31;
    pub const S390_64: u64 = 64;
}

struct ArchEntry {
    id: ArchId,
    name: &'static str,
    description: &'static str,
}

macro_rules! arch_table {
    ($(($id:ident, $name:expr, $desc:expr)),* $(,)?) => {
        &[$(ArchEntry { id: ArchId::$id, name: $name, description: $desc }),*]
    };
}

static ARCH_TABLE: &[ArchEntry] = arch_table![
    (M68K, "m68k", "Motorola 68xxx"),
    (VAX, "vax", "DEC Vax"),
    (I960, "i960", "Intel 960"),
    (OR32, "or32", "OpenRISC 32"),
    (SPARC, "sparc", "SPARC"),
    (SPU, "spu", "PowerPC SPU"),
    (MIPS, "mips", "MIPS Rxxxx"),
    (I386, "i386", "Intel 386"),
    (L1OM, "l1om", "Intel L1OM"),
    (K1OM, "k1om", "Intel K1OM"),
    (I860, "i860", "Intel 860"),
    (I370, "i370", "IBM 360/370 Mainframes"),
    (M88K, "m88k", "Motorola 88xxx"),
    (H8300, "h8300", "Renesas H8/300 (formerly Hitachi H8/300)"),
    (PDP11, "pdp11", "DEC PDP-11"),
    (POWERPC, "powerpc", "PowerPC"),
    (RS6000, "rs6000", "IBM RS/6000"),
    (HPPA, "hppa", "HP PA RISC"),
    (D10V, "d10v", "Mitsubishi D10V"),
    (D30V, "d30v", "Mitsubishi D30V"),
    (DLX, "dlx", "DLX"),
    (M68HC11, "m68hc11", "Motorola 68HC11"),
    (Z8K, "z8k", "Zilog Z8000"),
    (H8500, "h8500", "Renesas H8/500 (formerly Hitachi H8/500)"),
    (SH, "sh", "Renesas / SuperH SH (formerly Hitachi SH)"),
    (ALPHA, "alpha", "Dec Alpha"),
    (ARM, "arm", "Advanced Risc Machines ARM."),
    (NS32K, "ns32k", "National Semiconductors ns32000"),
    (W65, "w65", "WDC 65816"),
    (TIC30, "tic30", "Texas Instruments TMS320C30"),
    (TIC4X, "tic4x", "Texas Instruments TMS320C3X/4X"),
    (TIC54X, "tic54x", "Texas Instruments TMS320C54X"),
    (TIC6X, "tic6x", "Texas Instruments TMS320C6X"),
    (TIC80, "tic80", "TI TMS320c80 (MVP)"),
    (M32C, "m32c", "Renesas M16C/M32C."),
    (M32R, "m32r", "Renesas M32R (formerly Mitsubishi M32R/D)"),
    (MN10200, "mn10200", "Matsushita MN10200"),
    (MN10300, "mn10300", "Matsushita MN10300"),
    (FR30, "fr30", "Fujitsu FR30"),
    (FRV, "frv", "Fujitsu FRV"),
    (MOXIE, "moxie", "The moxie processor"),
    (MCORE, "mcore", "Motorola MCore"),
    (MEP, "mep", "Toshiba Media Embedded Processor (MEP)"),
    (IA64, "ia64", "HP/Intel ia64"),
    (IQ2000, "iq2000", "Vitesse IQ2000."),
    (MT, "mt", "Morpho Technologies MT"),
    (PJ, "pj", "Pico Java architecture"),
    (AVR, "avr", "Atmel AVR microcontrollers."),
    (BFIN, "bfin", "ADI Blackfin"),
    (CR16C, "cr16c", "National Semiconductor CompactRISC."),
    (CRX, "crx", "National Semiconductor CRX."),
    (RL78, "rl78", "RL78"),
    (RX, "rx", "Renesas RX."),
    (S390, "s390", "IBM s390"),
    (SCORE, "score", "Sunplus score"),
    (OPENRISC, "openrisc", "OpenRISC"),
    (MMIX, "mmix", "Donald Knuth educational processor."),
    (XSTORMY16, "xstormy16", "XStormy16"),
    (MSP430, "msp430", "Texas Instruments MSP430 architecture."),
    (XC16X, "xc16x", "Infineon's XC16X Series."),
    (XTENSA, "xtensa", "Tensilica's Xtensa cores."),
    (Z80, "z80", "Zilog Z80"),
    (LM32, "lm32", "Lattice Mico32"),
    (MICROBLAZE, "microblaze", "Xilinx MicroBlaze."),
    (TILEPRO, "tilepro", "Tilera TILEPro"),
    (TILEGX, "tilegx", "Tilera TILE-Gx"),
    (AARCH64, "aarch64", "ARM AArch64"),
    (RISCV, "riscv", "RISC-V"),
];

static ARCH_BY_ID: Lazy<HashMap<ArchId, &'static ArchEntry>> =
    Lazy::new(|| ARCH_TABLE.iter().map(|e| (e.id, e)).collect());

/// Architectures a decoding engine is compiled in for.
static DECODABLE: &[ArchId] = &[
    ArchId::I386,
    ArchId::ARM,
    ArchId::AARCH64,
    ArchId::MIPS,
    ArchId::POWERPC,
    ArchId::RISCV,
];

/// Every architecture id known to the table, in id order.
pub fn architectures() -> Vec<ArchId> {
    let mut ids: Vec<ArchId> = ARCH_TABLE.iter().map(|e| e.id).collect();
    ids.sort();
    ids
}

/// Architecture ids with a decoding engine.
pub fn supported_architectures() -> &'static [ArchId] {
    DECODABLE
}

/// Looks up an architecture by its short printable name.
pub fn arch_from_name(name: &str) -> Option<ArchId> {
    ARCH_TABLE.iter().find(|e| e.name == name).map(|e| e.id)
}

/// Printable `arch:machine` form used in file header reports.
pub fn printable_arch_mach(arch: ArchId, machine: u64) -> String {
    let base = arch.name();
    let suffix = match arch {
        ArchId::I386 => {
            let intel = machine & mach::I386_INTEL_SYNTAX != 0;
            let core = machine & !mach::I386_INTEL_SYNTAX;
            let sub = match core {
                mach::X86_64 => Some("x86-64"),
                mach::X64_32 => Some("x64-32"),
                mach::I386_I8086 => Some("i8086"),
                _ => None,
            };
            match (sub, intel) {
                (Some(s), true) => Some(format!("{}:intel", s)),
                (Some(s), false) => Some(s.to_string()),
                (None, true) => Some("intel".to_string()),
                (None, false) => None,
            }
        }
        ArchId::MIPS => match machine {
            mach::MIPSISA32 => Some("isa32".to_string()),
            mach::MIPSISA32R2 => Some("isa32r2".to_string()),
            mach::MIPSISA64 => Some("isa64".to_string()),
            mach::MIPSISA64R2 => Some("isa64r2".to_string()),
            _ => None,
        },
        ArchId::POWERPC => match machine {
            mach::PPC64 => Some("common64".to_string()),
            _ => Some("common".to_string()),
        },
        ArchId::SPARC => match machine {
            mach::SPARC_V9 => Some("v9".to_string()),
            _ => None,
        },
        ArchId::RISCV => match machine {
            mach::RISCV32 => Some("rv32".to_string()),
            mach::RISCV64 => Some("rv64".to_string()),
            _ => None,
        },
        ArchId::AARCH64 if machine == mach::AARCH64_ILP32 => Some("ilp32".to_string()),
        _ => None,
    };
    match suffix {
        Some(s) => format!("{}:{}", base, s),
        None => base.to_string(),
    }
}

/// Target names understood by the object engine, plus `default` for auto-detection.
static TARGETS: &[&str] = &[
    "elf64-x86-64",
    "elf32-i386",
    "elf32-x86-64",
    "elf32-littlearm",
    "elf32-bigarm",
    "elf64-littleaarch64",
    "elf64-bigaarch64",
    "elf32-tradlittlemips",
    "elf32-tradbigmips",
    "elf64-tradlittlemips",
    "elf64-tradbigmips",
    "elf32-powerpc",
    "elf32-powerpcle",
    "elf64-powerpc",
    "elf64-powerpcle",
    "elf32-littleriscv",
    "elf64-littleriscv",
    "elf32-sparc",
    "elf64-sparc",
    "elf32-m68k",
    "elf64-s390",
    "elf32-little",
    "elf32-big",
    "elf64-little",
    "elf64-big",
    "pe-i386",
    "pei-i386",
    "pe-x86-64",
    "pei-x86-64",
    "pei-aarch64-little",
    "pe-bigobj-x86-64",
    "mach-o-i386",
    "mach-o-x86-64",
    "mach-o-arm",
    "mach-o-arm64",
    "mach-o-le",
    "mach-o-be",
    "aixcoff-rs6000",
    "aixcoff64-rs6000",
    "wasm",
    "default",
];

pub const DEFAULT_TARGET: &str = "default";

pub fn targets() -> &'static [&'static str] {
    TARGETS
}

pub fn is_known_target(name: &str) -> bool {
    TARGETS.contains(&name)
}
