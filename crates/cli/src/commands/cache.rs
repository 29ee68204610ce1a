use anyhow::{Context, Result};

use crate::commands::Workspace;

/// Drop every cached decompiler/ASM blob. Run history is kept.
pub fn cache_clear_command(ws: &Workspace) -> Result<()> {
    let db_path = ws.cache_db_path();
    let Some(db) = ws.open_existing_cache()? else {
        println!("Parity cache is empty ({})", db_path.display());
        return Ok(());
    };
    let removed = db.cache_clear().context("Failed to clear parity cache")?;
    println!("Cleared {removed} cached entries from {}", db_path.display());
    Ok(())
}
