use anyhow::{Context, Result};

use crate::commands::Workspace;

/// List recorded parity runs, oldest first.
pub fn list_runs_command(ws: &Workspace, json: bool) -> Result<()> {
    let runs = match ws.open_existing_cache()? {
        Some(db) => db.list_parity_runs().context("Failed to list parity runs")?,
        None => Vec::new(),
    };

    if json {
        let serialized =
            serde_json::to_string_pretty(&runs).context("Failed to serialize runs to JSON")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Parity runs ({}):", runs.len());
    if runs.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for run in runs {
        let backend = run.backend.as_deref().unwrap_or("source-only");
        let hooks = run.hooks_hash.as_deref().map(|h| &h[..h.len().min(12)]).unwrap_or("-");
        println!(
            "  - {} [{}] total={} GREEN={} YELLOW={} RED={} hooks={}",
            run.started_at, backend, run.total, run.green, run.yellow, run.red, hooks
        );
    }

    Ok(())
}
