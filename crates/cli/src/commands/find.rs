use anyhow::{bail, Result};
use serde::Serialize;

use parity_core::{SourceIndexer, SourceMatch};

use crate::commands::Workspace;

/// What to look up: a `Class::Function` pair or a hook address.
#[derive(Debug, Clone)]
pub enum FindTarget {
    Symbol { class_name: String, fn_name: String },
    Address(String),
}

impl FindTarget {
    fn describe(&self) -> String {
        match self {
            FindTarget::Symbol { class_name, fn_name } => format!("{class_name}::{fn_name}"),
            FindTarget::Address(addr) => addr.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FindReport<'a> {
    query: String,
    #[serde(flatten)]
    source: &'a SourceMatch,
}

/// Locate a function body in the configured source tree and print its metrics.
pub fn find_command(ws: &Workspace, target: &FindTarget, json: bool) -> Result<()> {
    let source_root = ws.source_root();
    if !source_root.is_dir() {
        bail!("Source root not found: {}", source_root.display());
    }

    let indexer = SourceIndexer::new(&source_root, &ws.config.project_profile);
    let found = match target {
        FindTarget::Symbol { class_name, fn_name } => indexer.find(class_name, fn_name),
        FindTarget::Address(addr) => indexer.find_by_address(addr),
    };
    let Some(source) = found else {
        bail!("No source body found for {}", target.describe());
    };

    if json {
        let report = FindReport { query: target.describe(), source: &source };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Found {}", target.describe());
    println!("  Path: {}:{}", source.path.display(), source.line);
    println!("  Body lines: {}", source.body_lines);
    println!(
        "  Calls: {} (plugin {}, other {})",
        source.call_count, source.plugin_call_count, source.non_plugin_call_count
    );
    println!("  Control flow: {}", source.control_flow_count);
    println!("  Stub marker: {}", yes_no(source.has_stub_marker));
    println!("  FP tokens: {}", yes_no(source.has_fp_token));
    println!("  Inline forwarder: {}", yes_no(source.is_inline_internal_forwarder));

    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
