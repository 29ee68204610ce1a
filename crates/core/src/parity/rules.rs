//! Externally authored overrides: manual sign-offs and semantic rules.
//!
//! Manual checks are Markdown checklists:
//!
//! ```text
//! - [x] 0x6F86A0 - verified against vanilla, jump table reordered
//! ```
//!
//! Semantic rules are JSON, either `{"rules": [...]}` or a bare array. Pattern
//! strings are substrings, or regular expressions when prefixed with `re:`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::model::{
    normalize_address, Finding, HookEntry, ManualCheckEntry, SemanticRule, Severity,
};

static MANUAL_CHECK_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-\s*\[(x|X)\]\s*(0x[0-9a-fA-F]+)\b(.*)$").unwrap());

/// Read a manual-check document; a missing file yields no entries.
pub fn read_manual_checks(path: &Path) -> HashMap<String, ManualCheckEntry> {
    match fs::read(path) {
        Ok(bytes) => parse_manual_checks(&String::from_utf8_lossy(&bytes)),
        Err(err) => {
            if path.exists() {
                log::warn!("failed to read manual checks {}: {err}", path.display());
            }
            HashMap::new()
        }
    }
}

/// Parse checked list items keyed by normalized address. Later lines win.
pub fn parse_manual_checks(text: &str) -> HashMap<String, ManualCheckEntry> {
    let mut out = HashMap::new();
    for (idx, line) in text.lines().enumerate() {
        let Some(caps) = MANUAL_CHECK_LINE_RE.captures(line) else {
            continue;
        };
        let note = caps[3].trim_matches(|c| c == ' ' || c == '-' || c == '|').to_string();
        out.insert(normalize_address(&caps[2]), ManualCheckEntry { line: idx + 1, note });
    }
    out
}

/// Read a semantic rules document; missing or unparsable files yield no rules.
pub fn read_semantic_rules(path: &Path) -> Vec<SemanticRule> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            if path.exists() {
                log::warn!("failed to read semantic rules {}: {err}", path.display());
            }
            return Vec::new();
        }
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(raw) => rules_from_json(&raw),
        Err(err) => {
            log::warn!("semantic rules JSON parse failed ({}): {err}", path.display());
            Vec::new()
        }
    }
}

/// Build rules from an already parsed JSON document.
///
/// Non-object rule records and non-string pattern entries are ignored.
pub fn rules_from_json(raw: &Value) -> Vec<SemanticRule> {
    let records = match raw {
        Value::Object(map) => match map.get("rules") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        Value::Array(items) => items.as_slice(),
        _ => {
            log::warn!("semantic rules must be a JSON object or array");
            &[]
        }
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            let record = record.as_object()?;
            let id = match record.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(other) if !other.is_null() => other.to_string(),
                _ => format!("rule-{}", idx + 1),
            };
            let reason = record.get("reason").and_then(Value::as_str).unwrap_or("").trim();
            let reason = if reason.is_empty() {
                format!("Semantic parity rule '{id}' failed")
            } else {
                reason.to_string()
            };
            let severity = record
                .get("severity")
                .and_then(Value::as_str)
                .map(Severity::parse_lenient)
                .unwrap_or(Severity::Red);
            let strings = |key: &str| -> Vec<String> {
                record
                    .get(key)
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            };
            Some(SemanticRule {
                addresses: strings("addresses").iter().map(|a| normalize_address(a)).collect(),
                symbols: strings("symbols"),
                source_all_of: strings("source_all_of"),
                source_any_of: strings("source_any_of"),
                source_none_of: strings("source_none_of"),
                id,
                reason,
                severity,
            })
        })
        .collect()
}

/// Substring match, or regex search for `re:`-prefixed patterns.
///
/// An invalid regular expression never matches.
pub fn match_pattern(text: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("re:") {
        Some(expr) => match Regex::new(expr) {
            Ok(re) => re.is_match(text),
            Err(err) => {
                log::warn!("invalid rule regex '{expr}': {err}");
                false
            }
        },
        None => text.contains(pattern),
    }
}

/// Whether a rule's address and symbol filters select this entry.
pub fn rule_matches_entry(rule: &SemanticRule, entry: &HookEntry) -> bool {
    if !rule.addresses.is_empty() && !rule.addresses.contains(&entry.key()) {
        return false;
    }
    if rule.symbols.is_empty() {
        return true;
    }
    let symbol = entry.symbol();
    rule.symbols.iter().any(|pattern| match_pattern(&symbol, pattern))
}

/// Evaluate rules against comment-stripped source text; each rule fires at most once.
pub fn apply_semantic_rules(
    entry: &HookEntry,
    source_text: &str,
    rules: &[SemanticRule],
) -> Vec<Finding> {
    rules
        .iter()
        .filter(|rule| rule_matches_entry(rule, entry))
        .filter(|rule| {
            rule.source_all_of.iter().any(|p| !match_pattern(source_text, p))
                || (!rule.source_any_of.is_empty()
                    && !rule.source_any_of.iter().any(|p| match_pattern(source_text, p)))
                || rule.source_none_of.iter().any(|p| match_pattern(source_text, p))
        })
        .map(|rule| Finding::new(rule.severity, format!("[semantic:{}] {}", rule.id, rule.reason)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_check_note_is_trimmed() {
        let text = "# Checks\n- [x] 0x6F86A0 - verified | \n- [ ] 0x1234 nope\n";
        let checks = parse_manual_checks(text);
        assert_eq!(checks.len(), 1);
        let entry = &checks["006f86a0"];
        assert_eq!(entry.line, 2);
        assert_eq!(entry.note, "verified");
    }

    #[test]
    fn regex_patterns_are_tagged() {
        assert!(match_pattern("CTrain::ProcessControl", "re:^CTrain::"));
        assert!(match_pattern("CTrain::ProcessControl", "Process"));
        assert!(!match_pattern("CTrain::ProcessControl", "re:("));
    }
}
