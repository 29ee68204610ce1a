//! Tool configuration: project profile, parity thresholds, backend selection.
//!
//! Configuration lives in a YAML document (conventionally `re-parity.yaml`).
//! Every section is optional; missing keys take the defaults below. Loading
//! merges, in order: defaults, the YAML file, `RE_PARITY_*` environment
//! variables, then dotted `key=value` overrides from the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Environment variables mapped onto config keys; `true` marks YAML-typed values.
const ENV_OVERRIDES: &[(&str, &[&str], bool)] = &[
    ("RE_PARITY_SOURCE_ROOT", &["project_profile", "source_root"], false),
    ("RE_PARITY_HOOKS_CSV", &["project_profile", "hooks_csv"], false),
    ("RE_PARITY_BACKEND_TYPE", &["backend", "type"], false),
    ("RE_PARITY_BACKEND_CLI_PATH", &["backend", "cli_path"], false),
    ("RE_PARITY_BACKEND_TIMEOUT", &["backend", "timeout_s"], true),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config root must be a mapping")]
    NotMapping,

    #[error("Invalid override '{0}': expected dotted.key=value")]
    BadOverride(String),

    #[error("Unknown profile template '{0}'. Known: gta-reversed, openrct2")]
    UnknownProfile(String),
}

/// Project-specific source conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectProfile {
    /// Hook-install regexes; capture group 1 is the function name, group 2 the address.
    pub hook_patterns: Vec<String>,
    /// Tokens that mark a function as intentionally unimplemented.
    pub stub_markers: Vec<String>,
    /// Call prefix identifying calls back into the original binary.
    pub stub_call_prefix: String,
    /// Name of the macro declaring a file's class (empty disables it).
    pub class_macro: String,
    pub source_root: String,
    pub source_extensions: Vec<String>,
    pub hooks_csv: Option<String>,
}

impl Default for ProjectProfile {
    fn default() -> Self {
        Self {
            hook_patterns: vec![
                r"RH_ScopedInstall\s*\(\s*(\w+)\s*,\s*(0x[0-9A-Fa-f]+)".to_string(),
                r"RH_ScopedVirtualInstall\s*\(\s*(\w+)\s*,\s*(0x[0-9A-Fa-f]+)".to_string(),
            ],
            stub_markers: vec!["NOTSA_UNREACHABLE".to_string()],
            stub_call_prefix: "plugin::Call".to_string(),
            class_macro: "RH_ScopedClass".to_string(),
            source_root: "source/game_sa".to_string(),
            source_extensions: vec![".cpp".into(), ".h".into(), ".hpp".into()],
            hooks_csv: Some("docs/hooks.csv".to_string()),
        }
    }
}

impl ProjectProfile {
    /// Built-in profile templates by name.
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        match name {
            "gta-reversed" => Ok(Self::default()),
            "openrct2" => Ok(Self {
                hook_patterns: vec![
                    r"HOOK_FUNCTION\s*\(\s*(\w+)\s*,\s*(0x[0-9A-Fa-f]+)".to_string()
                ],
                stub_markers: vec!["NOT_IMPLEMENTED".to_string()],
                stub_call_prefix: "original_function".to_string(),
                class_macro: String::new(),
                source_root: "src".to_string(),
                source_extensions: vec![".cpp".into(), ".h".into(), ".hpp".into()],
                hooks_csv: None,
            }),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

/// Static parity verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParityConfig {
    pub enabled: bool,
    /// Allowed |asm calls - source calls| before a mismatch is reported.
    pub call_count_warn_diff: u32,
    /// Skip body-size/call heuristics for inline internal forwarders.
    pub inline_wrapper_autoskip: bool,
    pub semantic_rules_file: Option<String>,
    pub manual_checks_file: Option<String>,
    pub cache_dir: String,
}

impl Default for ParityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            call_count_warn_diff: 3,
            inline_wrapper_autoskip: false,
            semantic_rules_file: None,
            manual_checks_file: None,
            cache_dir: ".cache/re-parity".to_string(),
        }
    }
}

impl ParityConfig {
    /// Location of the parity cache database for a project rooted at `root`.
    pub fn cache_db_path(&self, root: &Path) -> PathBuf {
        let dir = Path::new(&self.cache_dir);
        let dir = if dir.is_absolute() { dir.to_path_buf() } else { root.join(dir) };
        dir.join("parity.db")
    }
}

/// Decompiler backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub cli_path: String,
    pub timeout_s: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { kind: "ghidra-bridge".to_string(), cli_path: "ghidra".to_string(), timeout_s: 45 }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub project_profile: ProjectProfile,
    pub parity: ParityConfig,
    pub backend: BackendConfig,
}

impl ToolConfig {
    /// Render a complete YAML document for the named profile template.
    pub fn template_yaml(profile: &str) -> Result<String, ConfigError> {
        let config =
            ToolConfig { project_profile: ProjectProfile::named(profile)?, ..Default::default() };
        Ok(serde_yaml::to_string(&config)?)
    }
}

/// Load configuration from an optional YAML file plus environment and CLI overrides.
///
/// A missing file is not an error; defaults are used instead.
pub fn load_config(path: Option<&Path>, overrides: &[String]) -> Result<ToolConfig, ConfigError> {
    let mut raw = match path {
        Some(p) if p.is_file() => read_yaml_mapping(p)?,
        Some(p) => {
            log::warn!("config file {} not found, using defaults", p.display());
            Value::Mapping(Mapping::new())
        }
        None => Value::Mapping(Mapping::new()),
    };

    for (var, key_path, typed) in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(var) {
            let value = if *typed { parse_scalar(&value) } else { Value::String(value) };
            set_path(&mut raw, key_path, value);
        }
    }

    for item in overrides {
        let (key, value) =
            item.split_once('=').ok_or_else(|| ConfigError::BadOverride(item.clone()))?;
        let key_path: Vec<&str> = key.trim().split('.').filter(|p| !p.is_empty()).collect();
        if key_path.is_empty() {
            return Err(ConfigError::BadOverride(item.clone()));
        }
        set_path(&mut raw, &key_path, parse_scalar(value.trim()));
    }

    Ok(serde_yaml::from_value(raw)?)
}

fn read_yaml_mapping(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    match serde_yaml::from_str::<Value>(&text)? {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        v @ Value::Mapping(_) => Ok(v),
        _ => Err(ConfigError::NotMapping),
    }
}

/// Interpret an override as a YAML scalar (`5`, `true`, `~`) or flow sequence
/// (`[.cpp, .h]`), falling back to a string.
fn parse_scalar(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::Null | Value::Sequence(_))) => v,
        _ => Value::String(raw.to_string()),
    }
}

/// Set `root[a][b]...` to `value`, replacing non-mapping intermediates.
fn set_path(root: &mut Value, key_path: &[&str], value: Value) {
    let mut node = root;
    for part in key_path {
        if !node.is_mapping() {
            *node = Value::Mapping(Mapping::new());
        }
        node = &mut node[*part];
    }
    *node = value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_path_creates_intermediate_mappings() {
        let mut root = Value::Mapping(Mapping::new());
        set_path(&mut root, &["parity", "call_count_warn_diff"], Value::from(7));
        let config: ToolConfig = serde_yaml::from_value(root).unwrap();
        assert_eq!(config.parity.call_count_warn_diff, 7);
        assert!(config.parity.enabled);
    }

    #[test]
    fn scalars_parse_as_yaml() {
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("12"), Value::from(12));
        assert_eq!(parse_scalar("plugin::Call"), Value::String("plugin::Call".into()));
    }
}
