//! Built-in parity heuristics.
//!
//! Each detector inspects one function's source metrics and (optionally) its
//! decompiler/ASM metrics and emits at most one finding. [`DETECTORS`] fixes the
//! order in which findings are reported.

use crate::model::{Finding, GhidraData, SourceMatch};

/// Everything a detector may look at for one function.
#[derive(Debug, Clone, Copy)]
pub struct DetectorInput<'a> {
    pub source: Option<&'a SourceMatch>,
    pub ghidra: Option<&'a GhidraData>,
    /// Source is an inline forwarder and auto-skip is enabled.
    pub inline_skip: bool,
    pub call_count_warn_diff: u32,
    /// Marker tokens shown in the stub-marker reason.
    pub stub_markers: &'a [String],
}

pub type Detector = fn(&DetectorInput<'_>) -> Option<Finding>;

/// All built-in detectors, in reporting order.
pub const DETECTORS: &[Detector] = &[
    missing_source,
    stub_marker,
    trivial_stub,
    large_asm_tiny_source,
    plugin_call_heavy,
    short_body,
    low_call_count,
    fp_sensitivity,
    call_count_mismatch,
    nan_logic,
    inline_wrapper,
];

/// Run every detector and collect the findings in declaration order.
pub fn run_detectors(input: &DetectorInput<'_>) -> Vec<Finding> {
    DETECTORS.iter().filter_map(|detect| detect(input)).collect()
}

const TRIVIAL_MAX_LINES: usize = 14;
const TINY_SOURCE_MAX_LINES: usize = 12;
const LARGE_ASM_MIN_INSTRUCTIONS: u32 = 80;
const SHORT_BODY_LINES: usize = 6;
const LOW_CALL_MIN_CALLEES: u32 = 6;

fn is_trivial_stub(source: &SourceMatch) -> bool {
    source.plugin_call_count > 0
        && source.body_lines <= TRIVIAL_MAX_LINES
        && source.non_plugin_call_count <= 1
        && source.control_flow_count == 0
}

/// Source and ASM metadata, unless ASM is unavailable or the source is a skipped forwarder.
fn with_asm<'a>(input: &DetectorInput<'a>) -> Option<(&'a SourceMatch, &'a GhidraData)> {
    let (source, ghidra) = (input.source?, input.ghidra?);
    (ghidra.asm_ok && !input.inline_skip).then_some((source, ghidra))
}

pub fn missing_source(input: &DetectorInput<'_>) -> Option<Finding> {
    input.source.is_none().then(|| Finding::red("Source function body not found"))
}

pub fn stub_marker(input: &DetectorInput<'_>) -> Option<Finding> {
    let source = input.source?;
    source.has_stub_marker.then(|| {
        Finding::red(format!("Source contains stub marker ({})", input.stub_markers.join(", ")))
    })
}

pub fn trivial_stub(input: &DetectorInput<'_>) -> Option<Finding> {
    let source = input.source?;
    is_trivial_stub(source)
        .then(|| Finding::red("Source appears to be a trivial plugin::Call* stub"))
}

pub fn large_asm_tiny_source(input: &DetectorInput<'_>) -> Option<Finding> {
    let (source, ghidra) = with_asm(input)?;
    (ghidra.asm_instruction_count >= LARGE_ASM_MIN_INSTRUCTIONS
        && source.body_lines <= TINY_SOURCE_MAX_LINES)
        .then(|| Finding::red("Large ASM body but tiny source body, likely mismatch/stub"))
}

pub fn plugin_call_heavy(input: &DetectorInput<'_>) -> Option<Finding> {
    let source = input.source?;
    if source.plugin_call_count == 0 {
        return None;
    }
    let heavy = source.plugin_call_count >= source.non_plugin_call_count.max(2);
    (heavy && !is_trivial_stub(source)).then(|| {
        Finding::yellow(format!(
            "Source relies heavily on plugin::Call* ({} plugin vs {} non-plugin calls)",
            source.plugin_call_count, source.non_plugin_call_count
        ))
    })
}

pub fn short_body(input: &DetectorInput<'_>) -> Option<Finding> {
    let source = input.source?;
    if input.inline_skip {
        return None;
    }
    (source.body_lines < SHORT_BODY_LINES).then(|| {
        Finding::yellow(format!("Very short body ({} lines), inspect manually", source.body_lines))
    })
}

pub fn low_call_count(input: &DetectorInput<'_>) -> Option<Finding> {
    let (source, ghidra) = (input.source?, input.ghidra?);
    if !ghidra.decompile_ok || input.inline_skip {
        return None;
    }
    let callees = ghidra.callees?;
    (callees >= LOW_CALL_MIN_CALLEES && source.call_count <= 1).then(|| {
        Finding::yellow(format!(
            "Source call count is very low ({}) vs Ghidra callees ({callees})",
            source.call_count
        ))
    })
}

pub fn fp_sensitivity(input: &DetectorInput<'_>) -> Option<Finding> {
    let (source, ghidra) = with_asm(input)?;
    (ghidra.asm_has_fp_sensitive && !source.has_fp_token).then(|| {
        Finding::yellow(
            "ASM contains floating-point sensitive ops but source has no obvious math tokens",
        )
    })
}

pub fn call_count_mismatch(input: &DetectorInput<'_>) -> Option<Finding> {
    let (source, ghidra) = with_asm(input)?;
    let asm_calls = ghidra.asm_call_count as usize;
    let diff = asm_calls.abs_diff(source.call_count);
    (diff > input.call_count_warn_diff as usize).then(|| {
        let source_calls = source.call_count;
        Finding::yellow(format!(
            "Call count mismatch: vanilla has {asm_calls} calls, \
             source has {source_calls} calls (diff: {diff})"
        ))
    })
}

pub fn nan_logic(input: &DetectorInput<'_>) -> Option<Finding> {
    let (source, ghidra) = (input.source?, input.ghidra?);
    if !ghidra.decompile_ok || !ghidra.decompile_has_nan {
        return None;
    }
    let body = &source.body_no_comments;
    (!body.contains("isnan") && !body.contains("NAN(")).then(|| {
        Finding::yellow("Decompile includes NAN-sensitive logic; verify NaN behavior manually")
    })
}

pub fn inline_wrapper(input: &DetectorInput<'_>) -> Option<Finding> {
    let source = input.source?;
    source.is_inline_internal_forwarder.then(|| {
        Finding::info("Source is an inline forwarding wrapper to internal I_* implementation")
    })
}
