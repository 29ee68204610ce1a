//! Signature walking: from a function-name token to the `{` opening its body.

use crate::scan::matching_paren;

/// Trailing function specifiers that may sit between `)` and the body.
const TRAILING_SPECIFIERS: &[&str] = &["const", "override", "final"];

/// Characters allowed just before a free function name in a definition
/// (end of a return type, pointer/reference declarator, template close, scope).
const FREE_DEF_PRECEDING: &[u8] = b"&*>:_";

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn skip_ws(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

/// `word` starts at `idx` and is not part of a longer identifier.
pub(crate) fn starts_with_word(bytes: &[u8], idx: usize, word: &str) -> bool {
    let end = idx + word.len();
    if end > bytes.len() || &bytes[idx..end] != word.as_bytes() {
        return false;
    }
    if idx > 0 && is_ident_byte(bytes[idx - 1]) {
        return false;
    }
    !(end < bytes.len() && is_ident_byte(bytes[end]))
}

/// Locate the opening brace of the body for the definition whose name token
/// starts at `fn_idx` and is `name_len` bytes long.
///
/// Returns `None` for declarations (a `;` before the body), truncated input,
/// or anything that does not look like `name(params) [specifiers] [-> T]
/// [: initializers] {`.
pub(crate) fn find_body_open(text: &str, fn_idx: usize, name_len: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let paren_open = skip_ws(bytes, fn_idx + name_len);
    if bytes.get(paren_open) != Some(&b'(') {
        return None;
    }
    let paren_close = matching_paren(text, paren_open)?;
    let mut k = skip_ws(bytes, paren_close + 1);

    loop {
        if let Some(word) = TRAILING_SPECIFIERS.iter().find(|w| starts_with_word(bytes, k, w)) {
            k = skip_ws(bytes, k + word.len());
            continue;
        }
        if starts_with_word(bytes, k, "noexcept") {
            k = skip_ws(bytes, k + "noexcept".len());
            if bytes.get(k) == Some(&b'(') {
                let close = matching_paren(text, k)?;
                k = skip_ws(bytes, close + 1);
            }
            continue;
        }
        break;
    }

    if bytes[k..].starts_with(b"->") {
        k += 2;
        while k < bytes.len() && bytes[k] != b'{' && bytes[k] != b';' {
            k += 1;
        }
        k = skip_ws(bytes, k);
    }

    if bytes.get(k) == Some(&b':') {
        return skip_initializer_list(bytes, k + 1);
    }

    if bytes.get(k) != Some(&b'{') {
        return None;
    }
    if bytes[fn_idx..k].contains(&b';') {
        return None;
    }
    Some(k)
}

/// Walk a constructor initializer list starting just after its `:`.
///
/// Brace-initialized members (`m_a{1}`) are told apart from the body by the
/// character before the `{`: an identifier character or `>` means a member
/// initializer.
fn skip_initializer_list(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth_paren = 0usize;
    let mut depth_brace = 0usize;
    let mut depth_bracket = 0usize;
    for i in start..bytes.len() {
        let at_top = depth_paren == 0 && depth_brace == 0 && depth_bracket == 0;
        match bytes[i] {
            b'(' => depth_paren += 1,
            b')' if depth_paren > 0 => depth_paren -= 1,
            b'[' => depth_bracket += 1,
            b']' if depth_bracket > 0 => depth_bracket -= 1,
            b'{' if at_top => {
                let prev = bytes[..i].iter().rev().find(|b| !b.is_ascii_whitespace());
                match prev {
                    Some(&p) if is_ident_byte(p) || p == b'>' => depth_brace += 1,
                    _ => return Some(i),
                }
            }
            b'{' => depth_brace += 1,
            b'}' if depth_brace > 0 => depth_brace -= 1,
            b';' if at_top => return None,
            _ => {}
        }
    }
    None
}

/// Heuristic guard for free functions: the previous non-space character must
/// be able to end a return type. Macro-wrapped declarations can still slip
/// through.
pub(crate) fn free_function_body_open(
    text: &str,
    fn_idx: usize,
    name_len: usize,
) -> Option<usize> {
    let bytes = text.as_bytes();
    let prev = bytes[..fn_idx].iter().rev().find(|b| !b.is_ascii_whitespace())?;
    if !(prev.is_ascii_alphanumeric() || FREE_DEF_PRECEDING.contains(prev)) {
        return None;
    }
    find_body_open(text, fn_idx, name_len)
}
