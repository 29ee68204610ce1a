use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::db::ParityDb;
use crate::model::GhidraData;
use crate::scan::has_fp_asm_opcode;

/// Cache prefix for raw decompiler output.
pub const DECOMPILE_CACHE_PREFIX: &str = "decompile";
/// Cache prefix for raw disassembly listings.
pub const ASM_CACHE_PREFIX: &str = "asm";

static CALLERS_CALLEES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Callers:\s*(\d+)\s*\|\s*Callees:\s*(\d+)").unwrap());

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed: {args}\n{output}")]
    Failed { tool: String, args: String, output: String },
    #[error("{tool} timed out after {timeout_s}s: {args}")]
    Timeout { tool: String, args: String, timeout_s: u64 },
    #[error("Unknown backend type '{0}'. Supported: ghidra-bridge, stub")]
    UnknownType(String),
    #[error("Backend error: {0}")]
    Other(String),
}

/// Which optional operations a backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapabilities {
    pub has_decompile: bool,
    pub has_asm: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self { has_decompile: true, has_asm: false }
    }
}

/// Parsed decompiler output for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompileResult {
    pub target: String,
    pub text: String,
    pub callers: Option<u32>,
    pub callees: Option<u32>,
}

impl DecompileResult {
    /// Parse raw decompiler text, picking up a `Callers: N | Callees: M` line if present.
    pub fn from_output(target: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        let (callers, callees) = CALLERS_CALLEES_RE
            .captures(&text)
            .map(|caps| (caps[1].parse().ok(), caps[2].parse().ok()))
            .unwrap_or((None, None));
        Self { target: target.to_string(), text, callers, callees }
    }

    pub fn has_nan_logic(&self) -> bool {
        self.text.to_uppercase().contains("NAN")
    }
}

/// Disassembly listing for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmListing {
    pub target: String,
    pub text: String,
    pub instruction_count: u32,
    pub call_count: u32,
    pub has_fp_sensitive: bool,
}

impl AsmListing {
    /// One instruction per non-blank line; calls are lines mentioning `CALL`.
    pub fn from_output(target: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let instruction_count = lines.len() as u32;
        let call_count = lines.iter().filter(|l| l.to_uppercase().contains("CALL")).count() as u32;
        let has_fp_sensitive = has_fp_asm_opcode(&text);
        Self { target: target.to_string(), text, instruction_count, call_count, has_fp_sensitive }
    }
}

/// Trait implemented by decompiler backends (Ghidra CLI bridge, stub).
pub trait DecompilerBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn capabilities(&self) -> BackendCapabilities;
    /// Decompile a function by hex address or symbol name.
    fn decompile(&self, target: &str) -> Result<DecompileResult, BackendError>;
    /// Disassembly for a function, or `None` when the tool has none to offer.
    fn asm(&self, target: &str) -> Result<Option<AsmListing>, BackendError>;
}

/// Registry for decompiler backends; callers select by name.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn DecompilerBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    pub fn register<B: DecompilerBackend + 'static>(&mut self, backend: B) -> &mut Self {
        self.backends.insert(backend.name().to_string(), Box::new(backend));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn DecompilerBackend> {
        self.backends.get(name).map(|b| &**b)
    }

    /// Return a sorted list of registered backend names for error messages/help.
    pub fn names(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.backends.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Registry populated with every compiled-in backend using default settings.
pub fn default_backend_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(crate::services::backends::StubBackend);
    #[cfg(feature = "ghidra-backend")]
    {
        let defaults = BackendConfig::default();
        registry.register(crate::services::backends::GhidraCliBackend::new(
            defaults.cli_path,
            defaults.timeout_s,
        ));
    }
    registry
}

/// Build the backend selected by `config.kind` (`ghidra-bridge`/`ghidra` or `stub`).
pub fn create_backend(config: &BackendConfig) -> Result<Box<dyn DecompilerBackend>, BackendError> {
    let kind = config.kind.to_lowercase().replace('_', "-");
    match kind.as_str() {
        #[cfg(feature = "ghidra-backend")]
        "ghidra-bridge" | "ghidra" => Ok(Box::new(crate::services::backends::GhidraCliBackend::new(
            config.cli_path.clone(),
            config.timeout_s,
        ))),
        "stub" => Ok(Box::new(crate::services::backends::StubBackend)),
        _ => Err(BackendError::UnknownType(config.kind.clone())),
    }
}

/// Collect decompiler and ASM metadata for one address.
///
/// Failures never escape: they are recorded in `decompile_error`/`asm_error`.
/// Raw tool output is read from and written to `cache` when one is given.
pub fn fetch_ghidra_data(
    address: &str,
    backend: &dyn DecompilerBackend,
    cache: Option<&ParityDb>,
) -> GhidraData {
    let mut data = GhidraData { resolved_address: Some(address.to_string()), ..Default::default() };
    let caps = backend.capabilities();

    match cached_or_fetch(cache, DECOMPILE_CACHE_PREFIX, address, |target| {
        backend.decompile(target).map(|dec| Some(dec.text))
    }) {
        Ok(Some(text)) => {
            let dec = DecompileResult::from_output(address, text);
            data.decompile_ok = true;
            data.callers = dec.callers;
            data.callees = dec.callees;
            data.decompile_has_nan = dec.has_nan_logic();
        }
        Ok(None) => {}
        Err(err) => data.decompile_error = Some(err.to_string()),
    }

    if caps.has_asm {
        match cached_or_fetch(cache, ASM_CACHE_PREFIX, address, |target| {
            backend.asm(target).map(|asm| asm.map(|a| a.text))
        }) {
            Ok(Some(text)) => {
                let asm = AsmListing::from_output(address, text);
                data.asm_ok = true;
                data.asm_instruction_count = asm.instruction_count;
                data.asm_call_count = asm.call_count;
                data.asm_has_fp_sensitive = asm.has_fp_sensitive;
            }
            Ok(None) => {}
            Err(err) => data.asm_error = Some(err.to_string()),
        }
    }

    data
}

fn cached_or_fetch<F>(
    cache: Option<&ParityDb>,
    prefix: &str,
    address: &str,
    fetch: F,
) -> Result<Option<String>, BackendError>
where
    F: FnOnce(&str) -> Result<Option<String>, BackendError>,
{
    if let Some(db) = cache {
        match db.cache_get(prefix, address) {
            Ok(Some(text)) => {
                log::debug!("cache hit {prefix}/{address}");
                return Ok(Some(text));
            }
            Ok(None) => {}
            Err(err) => log::warn!("parity cache read failed for {prefix}/{address}: {err}"),
        }
    }

    let fetched = fetch(address)?;
    if let (Some(db), Some(text)) = (cache, fetched.as_deref()) {
        if let Err(err) = db.cache_put(prefix, address, text) {
            log::warn!("parity cache write failed for {prefix}/{address}: {err}");
        }
    }
    Ok(fetched)
}
