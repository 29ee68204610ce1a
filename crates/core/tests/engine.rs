use std::collections::HashMap;
use std::fs;

use tempfile::{tempdir, TempDir};

use parity_core::config::{ParityConfig, ToolConfig};
use parity_core::db::ParityDb;
use parity_core::parity::{Overrides, ParityRunner};
use parity_core::services::backends::StubBackend;
use parity_core::{
    run_parity, score_single, Finding, GhidraData, HookEntry, ManualCheckEntry, ParityStatus,
    Severity,
};

const TRAIN_CPP: &str = "RH_ScopedClass(CTrain); RH_ScopedInstall(ProcessControl, 0x6F86A0); \
void CTrain::ProcessControl(){ if (m_nStatus==5){ DoStuff(); MoreLogic(); EvenMore(); } }";

fn source_tree() -> TempDir {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("Train.cpp"), TRAIN_CPP).expect("write source");
    dir
}

fn train_entry() -> HookEntry {
    HookEntry {
        class_path: "Entity/Vehicle/CTrain".into(),
        fn_name: "ProcessControl".into(),
        address: "0x6f86a0".into(),
        reversed: true,
        locked: false,
        is_virtual: true,
    }
}

#[test]
fn address_only_entry_resolves_source() {
    let dir = source_tree();
    let config = ToolConfig::default();
    let results = run_parity(&[HookEntry::address_only("0x6f86a0")], dir.path(), &config, None);
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.source.is_some());
    assert!(result.ghidra.is_none());
    assert!(!result.findings.iter().any(|f| f.reason == "Source function body not found"));
    assert_ne!(result.status, ParityStatus::Red);
}

#[test]
fn unknown_address_is_red_missing_source() {
    let dir = source_tree();
    let config = ToolConfig::default();
    let results = run_parity(&[HookEntry::address_only("0x401000")], dir.path(), &config, None);
    let result = &results[0];
    assert_eq!(result.status, ParityStatus::Red);
    assert!(result.source.is_none());
    assert_eq!(result.findings, vec![Finding::red("Source function body not found")]);
}

#[test]
fn reversed_hook_without_source_always_gets_a_red_finding() {
    let entry = HookEntry::address_only("0x401000");
    let (status, findings) =
        score_single(&entry, None, None, &ParityConfig::default(), &Overrides::default(), &[]);
    assert_eq!(status, ParityStatus::Red);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].level, Severity::Red);
}

#[test]
fn manual_check_wins_over_every_detector() {
    let entry = HookEntry::address_only("0x401000");
    let mut overrides = Overrides::default();
    overrides.manual_checks.insert(
        "00401000".to_string(),
        ManualCheckEntry { line: 4, note: "verified by hand".to_string() },
    );
    let (status, findings) =
        score_single(&entry, None, None, &ParityConfig::default(), &overrides, &[]);
    assert_eq!(status, ParityStatus::Green);
    assert_eq!(findings, vec![Finding::info("Manual check override: verified by hand")]);
}

#[test]
fn manual_checks_file_applies_in_batch_runs() {
    let dir = source_tree();
    let checks = dir.path().join("checks.md");
    fs::write(&checks, "- [x] 0x401000 - inlined into caller\n").expect("write checks");

    let mut config = ToolConfig::default();
    config.parity.manual_checks_file = Some(checks.to_string_lossy().to_string());
    let entries = vec![HookEntry::address_only("0x401000"), HookEntry::address_only("0x402000")];
    let results = run_parity(&entries, dir.path(), &config, Some(&StubBackend));

    assert_eq!(results[0].status, ParityStatus::Green);
    assert_eq!(
        results[0].findings,
        vec![Finding::info("Manual check override: inlined into caller")]
    );
    assert!(results[0].ghidra.is_none());
    assert_eq!(results[1].status, ParityStatus::Red);
    assert_eq!(results[1].entry.address, "0x402000");
}

#[test]
fn semantic_rules_are_applied_to_located_source() {
    let dir = source_tree();
    let rules = dir.path().join("rules.json");
    fs::write(
        &rules,
        r#"{"rules":[{"id":"speed","reason":"speed update missing","severity":"yellow",
            "symbols":["CTrain::"],"source_all_of":["UpdateSpeed"]}]}"#,
    )
    .expect("write rules");

    let mut config = ToolConfig::default();
    config.parity.semantic_rules_file = Some(rules.to_string_lossy().to_string());
    let results = run_parity(&[train_entry()], dir.path(), &config, None);
    let result = &results[0];
    assert!(result.source.is_some());
    assert_eq!(result.status, ParityStatus::Yellow);
    assert_eq!(
        result.findings.last().map(|f| f.reason.as_str()),
        Some("[semantic:speed] speed update missing")
    );
}

#[test]
fn results_keep_input_order() {
    let dir = source_tree();
    let config = ToolConfig::default();
    let entries: Vec<HookEntry> = (0..32)
        .map(|i| HookEntry::address_only(&format!("0x{:x}", 0x401000 + i * 0x10)))
        .chain(std::iter::once(train_entry()))
        .collect();
    let results = run_parity(&entries, dir.path(), &config, None);
    let addresses: Vec<&str> = results.iter().map(|r| r.entry.address.as_str()).collect();
    let expected: Vec<&str> = entries.iter().map(|e| e.address.as_str()).collect();
    assert_eq!(addresses, expected);
    assert!(results.last().and_then(|r| r.source.as_ref()).is_some());
}

#[test]
fn stub_backend_data_flows_into_results_and_cache() {
    let dir = source_tree();
    let config = ToolConfig::default();
    let db = ParityDb::open_in_memory().expect("db");

    let results = ParityRunner::new(&config)
        .with_backend(Some(&StubBackend))
        .with_cache(Some(&db))
        .run(&[train_entry()], dir.path());
    let ghidra = results[0].ghidra.as_ref().expect("ghidra data");
    assert!(ghidra.decompile_ok);
    assert_eq!(ghidra.callers, Some(2));
    assert_eq!(ghidra.callees, Some(0));
    assert!(!ghidra.asm_ok);
    assert_eq!(ghidra.resolved_address.as_deref(), Some("0x6f86a0"));
    assert!(db.cache_exists("decompile", "0x6F86A0").expect("exists"));
}

#[test]
fn prefetched_data_takes_priority_over_backend() {
    let dir = source_tree();
    let config = ToolConfig::default();
    let prefetched = GhidraData {
        decompile_ok: true,
        callees: Some(9),
        asm_ok: true,
        asm_instruction_count: 400,
        asm_call_count: 30,
        ..Default::default()
    };
    let mut map = HashMap::new();
    map.insert("006f86a0".to_string(), prefetched.clone());

    let results = ParityRunner::new(&config)
        .with_backend(Some(&StubBackend))
        .with_prefetched(map)
        .with_overrides(Overrides::default())
        .run(&[train_entry()], dir.path());
    let result = &results[0];
    assert_eq!(result.ghidra.as_ref(), Some(&prefetched));
    assert_eq!(result.status, ParityStatus::Red);
    assert!(result
        .findings
        .iter()
        .any(|f| f.reason == "Large ASM body but tiny source body, likely mismatch/stub"));
}

#[test]
fn inline_autoskip_reduces_forwarders_to_info() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("Ped.cpp"),
        "void CPed::Update() {\n    return I_Update<false>();\n}\n",
    )
    .expect("write source");
    let entry = HookEntry {
        class_path: "CPed".into(),
        fn_name: "Update".into(),
        address: "0x5e3e90".into(),
        reversed: true,
        locked: false,
        is_virtual: false,
    };

    let mut config = ToolConfig::default();
    let plain = run_parity(std::slice::from_ref(&entry), dir.path(), &config, None);
    assert_eq!(plain[0].status, ParityStatus::Yellow);

    config.parity.inline_wrapper_autoskip = true;
    let skipped = run_parity(std::slice::from_ref(&entry), dir.path(), &config, None);
    assert_eq!(skipped[0].status, ParityStatus::Green);
    assert_eq!(skipped[0].findings.len(), 1);
    assert_eq!(skipped[0].findings[0].level, Severity::Info);
}
