/// Lexer state while walking a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    LineComment,
    BlockComment,
    Literal { quote: u8, escaped: bool },
}

/// Find the index of the character closing the region opened at `open_index`.
///
/// `text[open_index]` must be `open`. Nesting is tracked with a depth counter;
/// `//` comments, `/* */` comments and `'`/`"` literals (with backslash
/// escapes) are skipped. Returns `None` when the input ends before the region
/// is balanced. Runs in one linear pass and never panics on truncated input.
pub fn balanced_close(text: &str, open_index: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open_index) != Some(&open) {
        return None;
    }

    let mut state = State::Normal;
    let mut depth: usize = 0;
    let mut i = open_index;
    while i < bytes.len() {
        let ch = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::LineComment => {
                if ch == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if ch == b'*' && next == Some(b'/') {
                    state = State::Normal;
                    i += 2;
                    continue;
                }
            }
            State::Literal { quote, escaped } => {
                state = if escaped {
                    State::Literal { quote, escaped: false }
                } else if ch == b'\\' {
                    State::Literal { quote, escaped: true }
                } else if ch == quote {
                    State::Normal
                } else {
                    state
                };
            }
            State::Normal => {
                if ch == b'/' && next == Some(b'/') {
                    state = State::LineComment;
                    i += 2;
                    continue;
                }
                if ch == b'/' && next == Some(b'*') {
                    state = State::BlockComment;
                    i += 2;
                    continue;
                }
                if ch == b'\'' || ch == b'"' {
                    state = State::Literal { quote: ch, escaped: false };
                } else if ch == open {
                    depth += 1;
                } else if ch == close {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
            }
        }
        i += 1;
    }
    None
}

/// `{ ... }` instantiation of [`balanced_close`].
pub fn matching_brace(text: &str, open_index: usize) -> Option<usize> {
    balanced_close(text, open_index, b'{', b'}')
}

/// `( ... )` instantiation of [`balanced_close`].
pub fn matching_paren(text: &str, open_index: usize) -> Option<usize> {
    balanced_close(text, open_index, b'(', b')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_braces_in_literals_and_comments() {
        let src = r#"{ const char* s = "{"; char c = '}'; /* { */ // }
 x(); }"#;
        assert_eq!(matching_brace(src, 0), Some(src.len() - 1));
    }

    #[test]
    fn escaped_quote_does_not_end_literal() {
        let src = r#"{ s = "\"}"; }"#;
        assert_eq!(matching_brace(src, 0), Some(src.len() - 1));
    }

    #[test]
    fn truncated_input_returns_none() {
        assert_eq!(matching_brace("{ if (a) { b(); }", 0), None);
        assert_eq!(matching_paren("(a, \"b)", 0), None);
        assert_eq!(matching_brace("{ /* } ", 0), None);
    }

    #[test]
    fn wrong_open_char_returns_none() {
        assert_eq!(matching_brace("x{}", 0), None);
    }
}
