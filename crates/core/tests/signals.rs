use std::path::PathBuf;

use parity_core::parity::signals::{run_detectors, DetectorInput, DETECTORS};
use parity_core::parity::{score, StatusCounts};
use parity_core::{Finding, GhidraData, ParityStatus, Severity, SourceMatch};

fn source(body_lines: usize, plugin: usize, non_plugin: usize, control_flow: usize) -> SourceMatch {
    SourceMatch {
        path: PathBuf::from("Ped.cpp"),
        line: 1,
        body: "{}".into(),
        body_no_comments: "{}".into(),
        body_lines,
        call_count: plugin + non_plugin,
        plugin_call_count: plugin,
        non_plugin_call_count: non_plugin,
        control_flow_count: control_flow,
        has_stub_marker: false,
        has_fp_token: false,
        is_inline_internal_forwarder: false,
    }
}

fn asm(instructions: u32, calls: u32) -> GhidraData {
    GhidraData {
        decompile_ok: true,
        asm_ok: true,
        asm_instruction_count: instructions,
        asm_call_count: calls,
        ..Default::default()
    }
}

fn input<'a>(
    source: Option<&'a SourceMatch>,
    ghidra: Option<&'a GhidraData>,
    inline_skip: bool,
    markers: &'a [String],
) -> DetectorInput<'a> {
    DetectorInput { source, ghidra, inline_skip, call_count_warn_diff: 3, stub_markers: markers }
}

fn reasons(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|f| f.reason.as_str()).collect()
}

#[test]
fn detector_table_has_fixed_order() {
    assert_eq!(DETECTORS.len(), 11);
}

#[test]
fn missing_source_is_the_only_finding_without_a_body() {
    let ghidra = asm(200, 20);
    let findings = run_detectors(&input(None, Some(&ghidra), false, &[]));
    assert_eq!(reasons(&findings), vec!["Source function body not found"]);
    assert_eq!(score(&findings), ParityStatus::Red);
}

#[test]
fn trivial_plugin_stub_is_red() {
    let src = source(5, 2, 0, 0);
    let findings = run_detectors(&input(Some(&src), None, false, &[]));
    assert!(reasons(&findings).contains(&"Source appears to be a trivial plugin::Call* stub"));
    assert!(!findings.iter().any(|f| f.reason.starts_with("Source relies heavily")));
    assert_eq!(score(&findings), ParityStatus::Red);
}

#[test]
fn plugin_heavy_but_not_trivial_is_yellow() {
    let src = source(30, 3, 2, 4);
    let findings = run_detectors(&input(Some(&src), None, false, &[]));
    assert_eq!(
        reasons(&findings),
        vec!["Source relies heavily on plugin::Call* (3 plugin vs 2 non-plugin calls)"]
    );
    assert_eq!(score(&findings), ParityStatus::Yellow);
}

#[test]
fn stub_marker_reason_lists_configured_markers() {
    let mut src = source(20, 0, 4, 2);
    src.has_stub_marker = true;
    let markers = vec!["NOTSA_UNREACHABLE".to_string(), "TODO_STUB".to_string()];
    let findings = run_detectors(&input(Some(&src), None, false, &markers));
    assert_eq!(
        reasons(&findings),
        vec!["Source contains stub marker (NOTSA_UNREACHABLE, TODO_STUB)"]
    );
}

#[test]
fn large_asm_against_tiny_body_and_call_mismatch() {
    let src = source(8, 0, 1, 1);
    let ghidra = asm(120, 9);
    let findings = run_detectors(&input(Some(&src), Some(&ghidra), false, &[]));
    assert_eq!(
        reasons(&findings),
        vec![
            "Large ASM body but tiny source body, likely mismatch/stub",
            "Call count mismatch: vanilla has 9 calls, source has 1 calls (diff: 8)",
        ]
    );
}

#[test]
fn call_count_within_threshold_is_quiet() {
    let src = source(20, 0, 6, 2);
    let ghidra = asm(60, 9);
    let findings = run_detectors(&input(Some(&src), Some(&ghidra), false, &[]));
    assert!(findings.is_empty(), "{findings:?}");
    assert_eq!(score(&findings), ParityStatus::Green);
}

#[test]
fn short_body_and_low_call_count() {
    let src = source(4, 0, 1, 0);
    let ghidra = GhidraData { decompile_ok: true, callees: Some(7), ..Default::default() };
    let findings = run_detectors(&input(Some(&src), Some(&ghidra), false, &[]));
    assert_eq!(
        reasons(&findings),
        vec![
            "Very short body (4 lines), inspect manually",
            "Source call count is very low (1) vs Ghidra callees (7)",
        ]
    );
}

#[test]
fn fp_sensitive_asm_needs_math_tokens() {
    let mut src = source(20, 0, 3, 1);
    let mut ghidra = asm(40, 3);
    ghidra.asm_has_fp_sensitive = true;
    let findings = run_detectors(&input(Some(&src), Some(&ghidra), false, &[]));
    assert_eq!(
        reasons(&findings),
        vec!["ASM contains floating-point sensitive ops but source has no obvious math tokens"]
    );

    src.has_fp_token = true;
    assert!(run_detectors(&input(Some(&src), Some(&ghidra), false, &[])).is_empty());
}

#[test]
fn nan_logic_requires_a_nan_check_in_source() {
    let mut src = source(20, 0, 3, 1);
    let ghidra = GhidraData { decompile_ok: true, decompile_has_nan: true, ..Default::default() };
    let findings = run_detectors(&input(Some(&src), Some(&ghidra), false, &[]));
    assert_eq!(
        reasons(&findings),
        vec!["Decompile includes NAN-sensitive logic; verify NaN behavior manually"]
    );

    src.body_no_comments = "{ if (std::isnan(x)) return; }".into();
    assert!(run_detectors(&input(Some(&src), Some(&ghidra), false, &[])).is_empty());
}

#[test]
fn inline_skip_silences_body_heuristics() {
    let mut src = source(3, 0, 1, 0);
    src.is_inline_internal_forwarder = true;
    let mut ghidra = asm(150, 12);
    ghidra.callees = Some(10);
    ghidra.asm_has_fp_sensitive = true;

    let skipped = run_detectors(&input(Some(&src), Some(&ghidra), true, &[]));
    assert_eq!(
        reasons(&skipped),
        vec!["Source is an inline forwarding wrapper to internal I_* implementation"]
    );
    assert_eq!(skipped[0].level, Severity::Info);
    assert_eq!(score(&skipped), ParityStatus::Green);

    let unskipped = run_detectors(&input(Some(&src), Some(&ghidra), false, &[]));
    assert!(unskipped.len() > 1);
    assert_eq!(score(&unskipped), ParityStatus::Red);
}

#[test]
fn asm_detectors_need_asm_data() {
    let src = source(8, 0, 1, 1);
    let ghidra =
        GhidraData { decompile_ok: true, asm_instruction_count: 500, ..Default::default() };
    assert!(run_detectors(&input(Some(&src), Some(&ghidra), false, &[])).is_empty());
}

#[test]
fn scoring_is_strict_severity_dominance() {
    assert_eq!(score(&[]), ParityStatus::Green);
    assert_eq!(score(&[Finding::info("a"), Finding::info("b")]), ParityStatus::Green);

    let mut findings = vec![Finding::yellow("y"), Finding::info("i")];
    assert_eq!(score(&findings), ParityStatus::Yellow);
    findings.push(Finding::red("r"));
    assert_eq!(score(&findings), ParityStatus::Red);
    findings.push(Finding::yellow("y2"));
    findings.push(Finding::info("i2"));
    assert_eq!(score(&findings), ParityStatus::Red);
}

#[test]
fn status_counts_tally() {
    let counts = StatusCounts::tally([
        ParityStatus::Green,
        ParityStatus::Red,
        ParityStatus::Red,
        ParityStatus::Yellow,
    ]);
    assert_eq!(counts, StatusCounts { green: 1, yellow: 1, red: 2 });
}
