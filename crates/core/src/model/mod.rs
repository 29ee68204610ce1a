//! Core data model shared by the indexer, the signal detectors and the engine.
//!
//! - `SourceMatch`: one located function body plus derived metrics.
//! - `GhidraData`: decompiler/ASM metadata for one address.
//! - `Finding` / `Severity`: a single detector verdict.
//! - `ParityStatus`: the aggregated tri-level outcome.
//! - `HookEntry`: one row of the hook registry.
//! - `SemanticRule` / `ManualCheckEntry`: externally authored overrides.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

mod address;

pub use address::{format_address, normalize_address};

/// Severity carried by a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Red,
    Yellow,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Red => "red",
            Severity::Yellow => "yellow",
            Severity::Info => "info",
        }
    }

    /// Parse a severity string from an external document.
    ///
    /// Unknown or malformed values map to `Red`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "yellow" => Severity::Yellow,
            "info" => Severity::Info,
            _ => Severity::Red,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parity finding. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub level: Severity,
    pub reason: String,
}

impl Finding {
    pub fn new(level: Severity, reason: impl Into<String>) -> Self {
        Self { level, reason: reason.into() }
    }

    pub fn red(reason: impl Into<String>) -> Self {
        Self::new(Severity::Red, reason)
    }

    pub fn yellow(reason: impl Into<String>) -> Self {
        Self::new(Severity::Yellow, reason)
    }

    pub fn info(reason: impl Into<String>) -> Self {
        Self::new(Severity::Info, reason)
    }
}

/// Aggregated parity triage status, ordered by severity (`Red` is greatest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityStatus {
    Green,
    Yellow,
    Red,
}

impl ParityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParityStatus::Green => "green",
            ParityStatus::Yellow => "yellow",
            ParityStatus::Red => "red",
        }
    }
}

impl fmt::Display for ParityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located source function body with derived metrics.
///
/// `body` always starts at `{` and ends at the matching `}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMatch {
    pub path: PathBuf,
    /// 1-based line of the matched name token.
    pub line: usize,
    pub body: String,
    pub body_no_comments: String,
    pub body_lines: usize,
    pub call_count: usize,
    pub plugin_call_count: usize,
    pub non_plugin_call_count: usize,
    pub control_flow_count: usize,
    pub has_stub_marker: bool,
    pub has_fp_token: bool,
    pub is_inline_internal_forwarder: bool,
}

/// Decompiler and disassembly metadata for one function address.
///
/// Built once per function per run by the backend layer; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhidraData {
    pub decompile_ok: bool,
    pub decompile_error: Option<String>,
    pub callers: Option<u32>,
    pub callees: Option<u32>,
    pub decompile_has_nan: bool,
    pub asm_ok: bool,
    pub asm_error: Option<String>,
    pub asm_instruction_count: u32,
    pub asm_call_count: u32,
    pub asm_has_fp_sensitive: bool,
    pub refs_call_count: u32,
    pub refs_global_rw_count: u32,
    pub used_containing_fallback: bool,
    pub resolved_address: Option<String>,
}

/// One hook from the hook registry (or synthesized for an address-only query).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEntry {
    /// Hierarchical class path, `/`-separated (e.g. `Entity/Vehicle/CTrain`).
    pub class_path: String,
    pub fn_name: String,
    /// Address in its display form (lowercase, `0x`-prefixed when read from a registry).
    pub address: String,
    pub reversed: bool,
    pub locked: bool,
    pub is_virtual: bool,
}

impl HookEntry {
    /// Entry for a bare address with no class/function metadata.
    pub fn address_only(address: &str) -> Self {
        Self {
            class_path: String::new(),
            fn_name: String::new(),
            address: format_address(address),
            reversed: true,
            locked: false,
            is_virtual: false,
        }
    }

    /// Last segment of the class path.
    pub fn class_name(&self) -> &str {
        self.class_path.rsplit('/').next().unwrap_or("")
    }

    /// Fully-qualified `Class::Function` symbol.
    pub fn symbol(&self) -> String {
        format!("{}::{}", self.class_name(), self.fn_name)
    }

    /// Normalized address used for every lookup and cache key.
    pub fn key(&self) -> String {
        normalize_address(&self.address)
    }
}

/// Externally authored semantic parity rule.
///
/// Pattern entries are literal substrings, or regular expressions when
/// prefixed with `re:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticRule {
    pub id: String,
    pub reason: String,
    pub severity: Severity,
    /// Normalized addresses; empty means "any address".
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub source_all_of: Vec<String>,
    #[serde(default)]
    pub source_any_of: Vec<String>,
    #[serde(default)]
    pub source_none_of: Vec<String>,
}

/// Human sign-off for one address; forces a green status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCheckEntry {
    pub line: usize,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_entry_derives_class_and_symbol() {
        let entry = HookEntry {
            class_path: "Entity/Vehicle/CTrain".into(),
            fn_name: "ProcessControl".into(),
            address: "0x6f86a0".into(),
            reversed: true,
            locked: false,
            is_virtual: false,
        };
        assert_eq!(entry.class_name(), "CTrain");
        assert_eq!(entry.symbol(), "CTrain::ProcessControl");
        assert_eq!(entry.key(), "006f86a0");
    }

    #[test]
    fn status_orders_by_severity() {
        assert!(ParityStatus::Red > ParityStatus::Yellow);
        assert!(ParityStatus::Yellow > ParityStatus::Green);
    }

    #[test]
    fn unknown_severity_defaults_to_red() {
        assert_eq!(Severity::parse_lenient("YELLOW"), Severity::Yellow);
        assert_eq!(Severity::parse_lenient("critical"), Severity::Red);
    }
}
