use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static COMMENT_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static TOKEN_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_:]*)\s*\(").unwrap());
static CONTROL_FLOW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:if|for|while|switch|do|goto)\b").unwrap());
static ASM_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{8}\s+([A-Z]+)").unwrap());

/// Identifiers that look like calls when followed by `(` but are not.
const NON_CALL_KEYWORDS: &[&str] = &[
    "if",
    "for",
    "while",
    "switch",
    "return",
    "sizeof",
    "alignof",
    "decltype",
    "static_cast",
    "reinterpret_cast",
    "const_cast",
    "dynamic_cast",
    "catch",
    "new",
    "delete",
];

/// Math-library spellings that indicate the source deals with floating point.
pub const FP_SOURCE_TOKENS: &[&str] = &[
    "std::sin",
    "std::cos",
    "std::tan",
    "std::sqrt",
    "std::pow",
    "std::asin",
    "std::acos",
    "std::atan",
    "std::atan2",
    "std::fabs",
    "std::abs",
    "std::ceil",
    "std::floor",
    "std::isnan",
    "std::isfinite",
    "std::copysign",
    "sin(",
    "cos(",
    "sqrt(",
    "atan2(",
    "fabs(",
];

/// x87 opcode prefixes whose results are sensitive to evaluation order/precision.
pub const FP_ASM_PREFIXES: &[&str] = &[
    "FCOM", "FUCOM", "FSIN", "FCOS", "FPTAN", "FPATAN", "FSQRT", "FDIV", "FMUL", "FADD", "FSUB",
    "FABS", "FRNDINT", "FNSTSW",
];

/// Call-site counts for one comment-stripped body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub total: usize,
    pub prefixed: usize,
    pub non_prefixed: usize,
}

/// Remove `/* ... */` (non-nested, may span lines) and `// ...` comments.
pub fn strip_comments(text: &str) -> String {
    let without_blocks = COMMENT_BLOCK_RE.replace_all(text, "");
    COMMENT_LINE_RE.replace_all(&without_blocks, "").into_owned()
}

/// Count identifier tokens directly followed by `(`, split by `stub_prefix`.
///
/// Control/cast/allocation keywords and `operator` tokens are not calls.
pub fn count_calls(stripped_body: &str, stub_prefix: &str) -> CallCounts {
    let mut counts = CallCounts::default();
    for caps in TOKEN_CALL_RE.captures_iter(stripped_body) {
        let tok = &caps[1];
        if NON_CALL_KEYWORDS.contains(&tok) {
            continue;
        }
        if tok == "operator" || tok.ends_with("::operator") {
            continue;
        }
        counts.total += 1;
        if tok.starts_with(stub_prefix) {
            counts.prefixed += 1;
        } else {
            counts.non_prefixed += 1;
        }
    }
    counts
}

/// Count whole-word `if|for|while|switch|do|goto` occurrences.
pub fn count_control_flow(stripped_body: &str) -> usize {
    CONTROL_FLOW_RE.find_iter(stripped_body).count()
}

pub fn has_fp_source_token(text: &str) -> bool {
    FP_SOURCE_TOKENS.iter().any(|tok| text.contains(tok))
}

/// Opcode of a listing line shaped `XXXXXXXX  OPCODE ...` (8 hex digit address).
pub fn parse_asm_line_op(line: &str) -> Option<&str> {
    ASM_LINE_RE.captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// True when any listing line uses a floating-point sensitive opcode.
pub fn has_fp_asm_opcode(listing: &str) -> bool {
    listing
        .lines()
        .filter_map(parse_asm_line_op)
        .any(|op| FP_ASM_PREFIXES.iter().any(|prefix| op.starts_with(prefix)))
}
