use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use parity_core::config::ToolConfig;

/// Write a config template for the named profile (default `gta-reversed`).
pub fn init_command(config_path: &Path, profile: Option<&str>, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!("Config already exists: {} (pass --force to overwrite)", config_path.display());
    }

    let profile = profile.unwrap_or("gta-reversed");
    let body = ToolConfig::template_yaml(profile)?;
    let contents = format!("# re-parity configuration\n# Profile: {profile}\n\n{body}");

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
    }
    fs::write(config_path, contents)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    println!("Created {}", config_path.display());
    println!("  Profile: {profile}");
    Ok(())
}
