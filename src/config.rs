//! Configuration for opening containers and running the dump tool.
//!
//! Every section has sensible defaults; a JSON file only needs to name the
//! fields it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::disasm::registry::BackendKind;
use crate::error::{BfdError, Result};
use crate::io::IOLimits;

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Limits on mapped input size and content reads.
    pub io: IOLimits,
    /// Archive traversal.
    pub archive: ArchiveConfig,
    /// Decoding session and report settings.
    pub disasm: DisasmConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| BfdError::InvalidInput(format!("invalid configuration: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BfdError::Internal(e.to_string()))
    }
}

/// Archive traversal configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Members past this count are not opened (default: 4096).
    pub max_members: usize,
    /// Open archives nested inside archives as archives (default: true).
    pub recurse_nested: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_members: 4096,
            recurse_nested: true,
        }
    }
}

/// Decoding configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisasmConfig {
    /// Force a backend instead of picking by architecture.
    pub prefer_backend: Option<BackendKind>,
    /// Instructions listed per section in disassembly reports; 0 is unlimited.
    pub max_instructions: usize,
}
