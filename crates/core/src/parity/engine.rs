use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::{ParityConfig, ToolConfig};
use crate::db::ParityDb;
use crate::index::SourceIndexer;
use crate::model::{
    Finding, GhidraData, HookEntry, ManualCheckEntry, ParityStatus, SemanticRule, Severity,
    SourceMatch,
};
use crate::parity::rules::{apply_semantic_rules, read_manual_checks, read_semantic_rules};
use crate::parity::scoring::{score, StatusCounts};
use crate::parity::signals::{run_detectors, DetectorInput};
use crate::services::{fetch_ghidra_data, DecompilerBackend};

/// Outcome of checking one hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParityResult {
    pub entry: HookEntry,
    pub status: ParityStatus,
    pub findings: Vec<Finding>,
    pub source: Option<SourceMatch>,
    pub ghidra: Option<GhidraData>,
}

/// Manual sign-offs and semantic rules, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Keyed by normalized address.
    pub manual_checks: HashMap<String, ManualCheckEntry>,
    pub semantic_rules: Vec<SemanticRule>,
}

impl Overrides {
    /// Load the files named in `config`; missing or malformed files contribute nothing.
    pub fn load(config: &ParityConfig) -> Self {
        let manual_checks = config
            .manual_checks_file
            .as_deref()
            .map(|path| read_manual_checks(Path::new(path)))
            .unwrap_or_default();
        let semantic_rules = config
            .semantic_rules_file
            .as_deref()
            .map(|path| read_semantic_rules(Path::new(path)))
            .unwrap_or_default();
        log::debug!(
            "loaded {} manual checks and {} semantic rules",
            manual_checks.len(),
            semantic_rules.len()
        );
        Self { manual_checks, semantic_rules }
    }

    pub fn manual_check(&self, entry: &HookEntry) -> Option<&ManualCheckEntry> {
        self.manual_checks.get(&entry.key())
    }
}

fn manual_override(check: &ManualCheckEntry) -> (ParityStatus, Vec<Finding>) {
    let finding = Finding::info(format!("Manual check override: {}", check.note));
    (ParityStatus::Green, vec![finding])
}

/// Score one function.
///
/// A manual check for the entry's address wins outright. Otherwise every
/// detector runs, semantic rules are applied to the comment-stripped body, and
/// a reversed hook without a source body is guaranteed a red finding.
pub fn score_single(
    entry: &HookEntry,
    source: Option<&SourceMatch>,
    ghidra: Option<&GhidraData>,
    config: &ParityConfig,
    overrides: &Overrides,
    stub_markers: &[String],
) -> (ParityStatus, Vec<Finding>) {
    if let Some(check) = overrides.manual_check(entry) {
        return manual_override(check);
    }

    let inline_skip =
        config.inline_wrapper_autoskip && source.is_some_and(|s| s.is_inline_internal_forwarder);
    let input = DetectorInput {
        source,
        ghidra,
        inline_skip,
        call_count_warn_diff: config.call_count_warn_diff,
        stub_markers,
    };
    let mut findings = run_detectors(&input);

    if let Some(source) = source {
        if !overrides.semantic_rules.is_empty() {
            findings.extend(apply_semantic_rules(
                entry,
                &source.body_no_comments,
                &overrides.semantic_rules,
            ));
        }
    }

    if entry.reversed && source.is_none() && !findings.iter().any(|f| f.level == Severity::Red) {
        findings.push(Finding::red("Reversed hook has no source body"));
    }

    (score(&findings), findings)
}

/// Batch parity run over a set of hooks.
///
/// Decompiler data comes from the prefetched map first, then the backend
/// (through the cache when one is attached). Backend calls are made
/// sequentially; source resolution and scoring run in parallel.
pub struct ParityRunner<'a> {
    config: &'a ToolConfig,
    backend: Option<&'a dyn DecompilerBackend>,
    cache: Option<&'a ParityDb>,
    prefetched: HashMap<String, GhidraData>,
    overrides: Option<Overrides>,
}

impl<'a> ParityRunner<'a> {
    pub fn new(config: &'a ToolConfig) -> Self {
        Self { config, backend: None, cache: None, prefetched: HashMap::new(), overrides: None }
    }

    pub fn with_backend(mut self, backend: Option<&'a dyn DecompilerBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_cache(mut self, cache: Option<&'a ParityDb>) -> Self {
        self.cache = cache;
        self
    }

    /// Pre-fetched decompiler data keyed by normalized address.
    pub fn with_prefetched(mut self, prefetched: HashMap<String, GhidraData>) -> Self {
        self.prefetched = prefetched;
        self
    }

    /// Use these overrides instead of loading the files named in the config.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn run(&self, entries: &[HookEntry], source_root: &Path) -> Vec<ParityResult> {
        let indexer = SourceIndexer::new(source_root, &self.config.project_profile);
        self.run_with_indexer(&indexer, entries)
    }

    /// Run against an already built indexer. Results keep the input order.
    pub fn run_with_indexer(
        &self,
        indexer: &SourceIndexer,
        entries: &[HookEntry],
    ) -> Vec<ParityResult> {
        let loaded;
        let overrides = match &self.overrides {
            Some(overrides) => overrides,
            None => {
                loaded = Overrides::load(&self.config.parity);
                &loaded
            }
        };

        let ghidra: Vec<Option<GhidraData>> = entries
            .iter()
            .map(|entry| {
                if overrides.manual_check(entry).is_some() {
                    return None;
                }
                self.ghidra_for(entry)
            })
            .collect();

        // Only plain config borrows go into the parallel section; the cache handle is not Sync.
        let parity_config = &self.config.parity;
        let stub_markers = &self.config.project_profile.stub_markers;
        let results: Vec<ParityResult> = entries
            .par_iter()
            .zip(ghidra.into_par_iter())
            .map(|(entry, ghidra)| {
                if let Some(check) = overrides.manual_check(entry) {
                    let (status, findings) = manual_override(check);
                    return ParityResult {
                        entry: entry.clone(),
                        status,
                        findings,
                        source: None,
                        ghidra: None,
                    };
                }
                let source = resolve_source(indexer, entry);
                let (status, findings) = score_single(
                    entry,
                    source.as_ref(),
                    ghidra.as_ref(),
                    parity_config,
                    overrides,
                    stub_markers,
                );
                ParityResult { entry: entry.clone(), status, findings, source, ghidra }
            })
            .collect();

        let counts = StatusCounts::tally(results.iter().map(|r| r.status));
        log::info!(
            "parity run: {} entries, GREEN={} YELLOW={} RED={}",
            results.len(),
            counts.green,
            counts.yellow,
            counts.red
        );
        results
    }

    fn ghidra_for(&self, entry: &HookEntry) -> Option<GhidraData> {
        if let Some(data) = self.prefetched.get(&entry.key()) {
            return Some(data.clone());
        }
        let backend = self.backend?;
        let data = fetch_ghidra_data(&entry.address, backend, self.cache);
        if let Some(err) = &data.decompile_error {
            log::warn!("Failed to fetch decompiler data for {}: {err}", entry.address);
        }
        Some(data)
    }
}

/// Class/function lookup first, then the hook-address index.
fn resolve_source(indexer: &SourceIndexer, entry: &HookEntry) -> Option<SourceMatch> {
    let by_name = if entry.fn_name.is_empty() {
        None
    } else {
        indexer.find(entry.class_name(), &entry.fn_name)
    };
    by_name.or_else(|| indexer.find_by_address(&entry.address))
}

/// Check `entries` against the source tree at `source_root`, optionally using
/// a decompiler backend for binary-side metrics.
pub fn run_parity(
    entries: &[HookEntry],
    source_root: &Path,
    config: &ToolConfig,
    backend: Option<&dyn DecompilerBackend>,
) -> Vec<ParityResult> {
    ParityRunner::new(config).with_backend(backend).run(entries, source_root)
}
