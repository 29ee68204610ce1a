//! Source indexer: locate C++ function bodies by `Class::Function` or hook address.
//!
//! Two complementary indexes are built once per source tree:
//! - a token index of every `Identifier::Identifier(` occurrence, and
//! - a hook-address index built from the profile's hook-install macros
//!   (e.g. `RH_ScopedInstall(ProcessControl, 0x6F86A0)`), qualified by the
//!   file's class macro (e.g. `RH_ScopedClass(CTrain)`).
//!
//! Lookups are memoized per indexer instance, including misses.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use walkdir::WalkDir;

use crate::config::ProjectProfile;
use crate::model::{normalize_address, SourceMatch};
use crate::scan::{
    count_calls, count_control_flow, has_fp_source_token, matching_brace, strip_comments,
};

mod forwarder;
mod signature;

use forwarder::is_inline_internal_forwarder;
use signature::{find_body_open, free_function_body_open};

static FUNC_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_~][A-Za-z0-9_]*)::([A-Za-z_~][A-Za-z0-9_]*)\s*\(").unwrap()
});
static IDENT_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_~][A-Za-z0-9_~]*").unwrap());

type LookupKey = (String, String);

/// Occurrence of a `Class::Function(` token: file index and byte offset of the class token.
#[derive(Debug, Clone, Copy)]
struct TokenHit {
    file: usize,
    offset: usize,
}

/// In-memory index over one source tree, configured by a [`ProjectProfile`].
pub struct SourceIndexer {
    source_root: PathBuf,
    source_files: Vec<PathBuf>,
    stub_markers: Vec<String>,
    stub_call_prefix: String,
    token_index: HashMap<LookupKey, Vec<TokenHit>>,
    hook_address_index: HashMap<String, LookupKey>,
    file_text_cache: RwLock<HashMap<usize, Arc<str>>>,
    lookup_cache: RwLock<HashMap<LookupKey, Option<SourceMatch>>>,
    free_lookup_cache: RwLock<HashMap<String, Option<SourceMatch>>>,
}

impl SourceIndexer {
    /// Discover source files under `source_root` and build both indexes.
    ///
    /// Unreadable files and invalid hook patterns are skipped with a warning.
    pub fn new(source_root: impl AsRef<Path>, profile: &ProjectProfile) -> Self {
        let source_root = source_root.as_ref().to_path_buf();
        let source_files = discover_source_files(&source_root, &profile.source_extensions);
        let mut indexer = Self {
            source_root,
            source_files,
            stub_markers: profile.stub_markers.iter().filter(|m| !m.is_empty()).cloned().collect(),
            stub_call_prefix: profile.stub_call_prefix.clone(),
            token_index: HashMap::new(),
            hook_address_index: HashMap::new(),
            file_text_cache: RwLock::new(HashMap::new()),
            lookup_cache: RwLock::new(HashMap::new()),
            free_lookup_cache: RwLock::new(HashMap::new()),
        };
        indexer.build_index(&compile_hook_patterns(profile), class_macro_regex(profile).as_ref());
        indexer
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    /// `(class, function)` registered for an address by a hook-install macro.
    pub fn hook_target(&self, address: &str) -> Option<(&str, &str)> {
        self.hook_address_index
            .get(&normalize_address(address))
            .map(|(cls, func)| (cls.as_str(), func.as_str()))
    }

    pub fn hook_address_count(&self) -> usize {
        self.hook_address_index.len()
    }

    fn build_index(&mut self, hook_patterns: &[Regex], class_macro: Option<&Regex>) {
        for file in 0..self.source_files.len() {
            let text = self.read_text(file);
            for caps in FUNC_TOKEN_RE.captures_iter(&text) {
                let (Some(whole), Some(cls), Some(func)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                self.token_index
                    .entry((cls.as_str().to_string(), func.as_str().to_string()))
                    .or_default()
                    .push(TokenHit { file, offset: whole.start() });
            }

            if hook_patterns.is_empty() {
                continue;
            }
            let file_class = class_macro
                .and_then(|re| re.captures(&text))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            for pattern in hook_patterns {
                for caps in pattern.captures_iter(&text) {
                    let (Some(func), Some(addr)) = (caps.get(1), caps.get(2)) else {
                        continue;
                    };
                    let func = func.as_str().trim();
                    let addr = addr.as_str().trim();
                    if func.is_empty() || addr.is_empty() {
                        continue;
                    }
                    self.hook_address_index
                        .insert(normalize_address(addr), (file_class.clone(), func.to_string()));
                }
            }
        }
        log::debug!(
            "indexed {} files under {}: {} member tokens, {} hook addresses",
            self.source_files.len(),
            self.source_root.display(),
            self.token_index.len(),
            self.hook_address_index.len()
        );
    }

    fn read_text(&self, file: usize) -> Arc<str> {
        if let Some(text) = self.file_text_cache.read().get(&file) {
            return Arc::clone(text);
        }
        let path = &self.source_files[file];
        let text: Arc<str> = match fs::read(path) {
            Ok(bytes) => Arc::from(String::from_utf8_lossy(&bytes).as_ref()),
            Err(e) => {
                log::warn!("failed to read {}: {e}", path.display());
                Arc::from("")
            }
        };
        self.file_text_cache.write().entry(file).or_insert(text).clone()
    }

    /// Locate the definition of `class_name::fn_name`.
    ///
    /// An empty function name never matches. Resolution tries constructor /
    /// destructor spellings, the full name, and its identifier prefix against
    /// the token index, then falls back to a free function of the same name.
    pub fn find(&self, class_name: &str, fn_name: &str) -> Option<SourceMatch> {
        if fn_name.is_empty() {
            return None;
        }
        let key = (class_name.to_string(), fn_name.to_string());
        if let Some(hit) = self.lookup_cache.read().get(&key) {
            return hit.clone();
        }

        let found =
            self.find_member(class_name, fn_name).or_else(|| self.find_free_function(fn_name));
        self.lookup_cache.write().entry(key).or_insert(found).clone()
    }

    /// Resolve an address through the hook-address index, then [`find`](Self::find).
    pub fn find_by_address(&self, address: &str) -> Option<SourceMatch> {
        let (cls, func) = self.hook_target(address)?;
        if func.is_empty() {
            return None;
        }
        self.find(cls, func)
    }

    fn find_member(&self, class_name: &str, fn_name: &str) -> Option<SourceMatch> {
        for (cls, func) in candidate_keys(class_name, fn_name) {
            let Some(hits) = self.token_index.get(&(cls.clone(), func.clone())) else {
                continue;
            };
            for hit in hits {
                let text = self.read_text(hit.file);
                let fn_start = hit.offset + cls.len() + 2;
                let Some(open) = find_body_open(&text, fn_start, func.len()) else {
                    continue;
                };
                let Some(close) = matching_brace(&text, open) else {
                    continue;
                };
                return Some(self.make_source_match(hit.file, &text, hit.offset, open, close));
            }
        }
        None
    }

    fn find_free_function(&self, fn_name: &str) -> Option<SourceMatch> {
        if let Some(hit) = self.free_lookup_cache.read().get(fn_name) {
            return hit.clone();
        }
        let found = self.scan_free_function(fn_name);
        self.free_lookup_cache.write().entry(fn_name.to_string()).or_insert(found).clone()
    }

    fn scan_free_function(&self, fn_name: &str) -> Option<SourceMatch> {
        let boundary = if fn_name.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            r"\b"
        } else {
            ""
        };
        let pattern = Regex::new(&format!(r"{boundary}{}\s*\(", regex::escape(fn_name))).ok()?;
        for file in 0..self.source_files.len() {
            let text = self.read_text(file);
            for m in pattern.find_iter(&text) {
                let idx = m.start();
                if text[..idx].ends_with("::") {
                    continue;
                }
                let Some(open) = free_function_body_open(&text, idx, fn_name.len()) else {
                    continue;
                };
                let Some(close) = matching_brace(&text, open) else {
                    continue;
                };
                return Some(self.make_source_match(file, &text, idx, open, close));
            }
        }
        None
    }

    fn make_source_match(
        &self,
        file: usize,
        text: &str,
        idx: usize,
        open: usize,
        close: usize,
    ) -> SourceMatch {
        let body = &text[open..=close];
        let body_no_comments = strip_comments(body);
        let calls = count_calls(&body_no_comments, &self.stub_call_prefix);
        SourceMatch {
            path: self.source_files[file].clone(),
            line: text[..idx].matches('\n').count() + 1,
            body: body.to_string(),
            body_lines: body.matches('\n').count() + 1,
            call_count: calls.total,
            plugin_call_count: calls.prefixed,
            non_plugin_call_count: calls.non_prefixed,
            control_flow_count: count_control_flow(&body_no_comments),
            has_stub_marker: self
                .stub_markers
                .iter()
                .any(|m| body_no_comments.contains(m.as_str())),
            has_fp_token: has_fp_source_token(&body_no_comments),
            is_inline_internal_forwarder: is_inline_internal_forwarder(&body_no_comments),
            body_no_comments,
        }
    }
}

/// Lookup keys to try, in order, for one `(class, function)` request.
fn candidate_keys(class_name: &str, fn_name: &str) -> Vec<LookupKey> {
    let mut keys = vec![(class_name.to_string(), fn_name.to_string())];
    if let Some(prefix) = IDENT_PREFIX_RE.find(fn_name) {
        if prefix.as_str() != fn_name {
            keys.push((class_name.to_string(), prefix.as_str().to_string()));
        }
    }
    if fn_name.starts_with("Constructor") {
        keys.insert(0, (class_name.to_string(), class_name.to_string()));
    } else if fn_name.starts_with("Destructor") {
        keys.insert(0, (class_name.to_string(), format!("~{class_name}")));
    }
    let mut unique: Vec<LookupKey> = Vec::with_capacity(keys.len());
    for key in keys {
        if !unique.contains(&key) {
            unique.push(key);
        }
    }
    unique
}

fn discover_source_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable path under {}: {e}", root.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            extensions.iter().any(|ext| !ext.is_empty() && name.ends_with(ext.as_str()))
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn compile_hook_patterns(profile: &ProjectProfile) -> Vec<Regex> {
    profile
        .hook_patterns
        .iter()
        .filter_map(|pat| match Regex::new(pat) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("ignoring invalid hook pattern {pat:?}: {e}");
                None
            }
        })
        .collect()
}

fn class_macro_regex(profile: &ProjectProfile) -> Option<Regex> {
    let name = profile.class_macro.trim();
    if name.is_empty() {
        return None;
    }
    Regex::new(&format!(r"{}\s*\(\s*(\w+)\s*\)", regex::escape(name))).ok()
}
