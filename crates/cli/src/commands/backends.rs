use anyhow::Result;
use serde::Serialize;

use parity_core::services::default_backend_registry;

#[derive(Debug, Serialize)]
pub struct BackendInfo {
    pub name: String,
    pub description: String,
}

/// List decompiler backends compiled into this binary.
pub fn list_backends_command(json: bool) -> Result<()> {
    let registry = default_backend_registry();
    let entries: Vec<BackendInfo> = registry
        .names()
        .into_iter()
        .map(|name| {
            let description = match name.as_str() {
                "stub" => "Canned decompiler output; no binary access".to_string(),
                "ghidra-bridge" => {
                    "Ghidra CLI bridge (`decompile`/`asm` sub-commands, backend.cli_path)"
                        .to_string()
                }
                other => format!("Backend '{}'", other),
            };
            BackendInfo { name, description }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Backends: (none)");
        return Ok(());
    }

    println!("Backends:");
    for entry in entries {
        println!("- {}: {}", entry.name, entry.description);
    }

    Ok(())
}
