//! Lexical primitives for C-family source and disassembly listings.
//!
//! Nothing here understands C++ grammar. The scanner only knows enough to
//! keep string/char literals and comments opaque while delimiting a balanced
//! region, and to count a handful of token classes inside a body.

mod lexer;
mod tokens;

pub use lexer::{balanced_close, matching_brace, matching_paren};
pub use tokens::{
    count_calls, count_control_flow, has_fp_asm_opcode, has_fp_source_token, parse_asm_line_op,
    strip_comments, CallCounts, FP_ASM_PREFIXES, FP_SOURCE_TOKENS,
};
