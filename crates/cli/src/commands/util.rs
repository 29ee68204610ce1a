use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parity_core::config::{load_config, ToolConfig};
use parity_core::db::ParityDb;

use crate::{canonicalize_or_current, resolve_in_root};

/// Loaded configuration plus the project root its relative paths hang off.
///
/// The root is the directory holding the config file. Source root, hook
/// registry and rule file paths are rewritten to absolute paths on load.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: ToolConfig,
}

impl Workspace {
    pub fn load(config: &str, overrides: &[String]) -> Result<Self> {
        let config_path = canonicalize_or_current(config)?;
        let root = match config_path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => canonicalize_or_current(".")?,
        };

        let mut tool_config = load_config(Some(&config_path), overrides)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?;

        let profile = &mut tool_config.project_profile;
        profile.source_root = absolute(&root, &profile.source_root);
        profile.hooks_csv = profile.hooks_csv.as_deref().map(|p| absolute(&root, p));
        let parity = &mut tool_config.parity;
        parity.semantic_rules_file =
            parity.semantic_rules_file.as_deref().map(|p| absolute(&root, p));
        parity.manual_checks_file =
            parity.manual_checks_file.as_deref().map(|p| absolute(&root, p));

        Ok(Self { root, config_path, config: tool_config })
    }

    pub fn source_root(&self) -> PathBuf {
        PathBuf::from(&self.config.project_profile.source_root)
    }

    pub fn hooks_csv(&self) -> Option<PathBuf> {
        self.config.project_profile.hooks_csv.as_ref().map(PathBuf::from)
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.config.parity.cache_db_path(&self.root)
    }

    /// Open the parity cache, creating its directory on first use.
    pub fn open_cache(&self) -> Result<ParityDb> {
        let db_path = self.cache_db_path();
        if let Some(dir) = db_path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create cache dir: {}", dir.display()))?;
        }
        ParityDb::open(&db_path)
            .with_context(|| format!("Failed to open parity cache at {}", db_path.display()))
    }

    /// Open the parity cache only if it already exists on disk.
    pub fn open_existing_cache(&self) -> Result<Option<ParityDb>> {
        let db_path = self.cache_db_path();
        if !db_path.is_file() {
            return Ok(None);
        }
        self.open_cache().map(Some)
    }
}

fn absolute(root: &Path, path: &str) -> String {
    resolve_in_root(root, path).to_string_lossy().to_string()
}
