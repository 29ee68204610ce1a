use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use regex::Regex;
use serde::Serialize;

use parity_core::db::{ParityDb, ParityRunRecord};
use parity_core::parity::{ParityResult, ParityRunner, StatusCounts};
use parity_core::services::{create_backend, DecompilerBackend};
use parity_core::{normalize_address, read_hooks, Finding, HookEntry};

use crate::commands::Workspace;
use crate::sha256_file;

/// Selection and output flags for a parity batch run.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub addresses: Vec<String>,
    pub filter: Option<String>,
    pub limit: Option<usize>,
    pub skip_ghidra: bool,
    pub include_unreversed: bool,
    pub output: Option<PathBuf>,
    pub strict_exit: bool,
    pub record: bool,
}

#[derive(Debug, Serialize)]
pub struct ParityReport {
    pub generated_at: String,
    pub results: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
pub struct ReportRow {
    pub symbol: String,
    pub address: String,
    pub status: String,
    pub findings: Vec<Finding>,
}

impl ParityReport {
    pub fn from_results(results: &[ParityResult]) -> Self {
        let results = results
            .iter()
            .map(|r| ReportRow {
                symbol: r.entry.symbol(),
                address: r.entry.address.clone(),
                status: r.status.as_str().to_string(),
                findings: r.findings.clone(),
            })
            .collect();
        Self { generated_at: Utc::now().to_rfc3339(), results }
    }
}

/// Run parity checks over the selected hooks and print one line per function.
///
/// Returns the status tally; with `strict_exit` any RED result is an error.
pub fn check_command(ws: &Workspace, opts: &CheckOptions) -> Result<StatusCounts> {
    let config = &ws.config;
    if !config.parity.enabled {
        let config_path = ws.config_path.display();
        bail!("Parity checks are disabled (parity.enabled = false in {config_path})");
    }

    let source_root = ws.source_root();
    if !source_root.is_dir() {
        bail!("Source root not found: {}", source_root.display());
    }

    let registry = load_registry(ws, opts.include_unreversed)?;
    let hooks = select_hooks(registry.as_deref().unwrap_or_default(), opts)?;
    if hooks.is_empty() {
        println!("No hooks selected.");
        return Ok(StatusCounts::default());
    }

    let backend = if opts.skip_ghidra { None } else { build_backend(ws) };
    let cache = if backend.is_some() || opts.record { open_cache_or_warn(ws) } else { None };

    let started_at = Utc::now().to_rfc3339();
    let results = ParityRunner::new(config)
        .with_backend(backend.as_deref())
        .with_cache(cache.as_ref())
        .run(&hooks, &source_root);

    for r in &results {
        println!(
            "  {} ({}) -> {}",
            r.entry.symbol(),
            r.entry.address,
            r.status.as_str().to_uppercase()
        );
    }
    let counts = StatusCounts::tally(results.iter().map(|r| r.status));
    println!("\nSummary: GREEN={} YELLOW={} RED={}", counts.green, counts.yellow, counts.red);

    if let Some(output) = &opts.output {
        write_report(output, &ParityReport::from_results(&results))?;
        println!("Report written to {}", output.display());
    }

    if opts.record {
        let db =
            cache.as_ref().ok_or_else(|| anyhow!("Parity cache unavailable; run not recorded"))?;
        let hooks_hash = match ws.hooks_csv() {
            Some(path) if path.is_file() => Some(sha256_file(&path)?),
            _ => None,
        };
        let record = ParityRunRecord {
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            hooks_hash,
            backend: backend.as_ref().map(|b| b.name().to_string()),
            total: results.len() as u32,
            green: counts.green as u32,
            yellow: counts.yellow as u32,
            red: counts.red as u32,
        };
        let id = record_run(db, &record)?;
        println!("Recorded parity run #{id}");
    }

    if opts.strict_exit && counts.red > 0 {
        bail!("{} function(s) scored RED", counts.red);
    }
    Ok(counts)
}

/// Hook registry rows, or `None` when no registry is configured or present.
fn load_registry(ws: &Workspace, include_unreversed: bool) -> Result<Option<Vec<HookEntry>>> {
    let Some(path) = ws.hooks_csv() else {
        return Ok(None);
    };
    if !path.is_file() {
        log::warn!("hooks CSV not found: {}", path.display());
        return Ok(None);
    }
    let hooks = read_hooks(&path, include_unreversed)
        .with_context(|| format!("Failed to read hook registry {}", path.display()))?;
    log::info!("loaded {} hooks from {}", hooks.len(), path.display());
    Ok(Some(hooks))
}

/// Apply `--address`, `--filter` and `--limit` to the registry rows.
///
/// Requested addresses missing from the registry become address-only entries,
/// appended in the order they were given and keeping their given digits.
pub fn select_hooks(registry: &[HookEntry], opts: &CheckOptions) -> Result<Vec<HookEntry>> {
    let mut hooks = if !opts.addresses.is_empty() {
        let mut wanted: Vec<(String, &str)> = Vec::new();
        for addr in &opts.addresses {
            let key = normalize_address(addr);
            if !wanted.iter().any(|(k, _)| *k == key) {
                wanted.push((key, addr.trim()));
            }
        }
        let mut matched: Vec<HookEntry> = registry
            .iter()
            .filter(|h| wanted.iter().any(|(k, _)| *k == h.key()))
            .cloned()
            .collect();
        let found: HashSet<String> = matched.iter().map(HookEntry::key).collect();
        for (_, addr) in wanted.iter().filter(|(k, _)| !found.contains(k)) {
            matched.push(HookEntry::address_only(addr));
        }
        matched
    } else if registry.is_empty() {
        bail!("No hooks loaded. Provide --address or configure project_profile.hooks_csv");
    } else {
        registry.to_vec()
    };

    if let Some(filter) = &opts.filter {
        let rx = Regex::new(filter).with_context(|| format!("Invalid --filter regex: {filter}"))?;
        hooks.retain(|h| rx.is_match(&h.symbol()) || rx.is_match(&h.class_path));
    }

    if let Some(limit) = opts.limit {
        hooks.truncate(limit);
    }

    Ok(hooks)
}

fn build_backend(ws: &Workspace) -> Option<Box<dyn DecompilerBackend>> {
    match create_backend(&ws.config.backend) {
        Ok(backend) => {
            log::info!("using decompiler backend '{}'", backend.name());
            Some(backend)
        }
        Err(err) => {
            log::warn!("could not initialize backend ({err}), running source-only checks");
            None
        }
    }
}

fn open_cache_or_warn(ws: &Workspace) -> Option<ParityDb> {
    match ws.open_cache() {
        Ok(db) => Some(db),
        Err(err) => {
            log::warn!("{err:#}");
            None
        }
    }
}

fn write_report(path: &Path, report: &ParityReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report dir: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))
}

fn record_run(db: &ParityDb, record: &ParityRunRecord) -> Result<i64> {
    db.insert_parity_run(record).context("Failed to record parity run")
}
