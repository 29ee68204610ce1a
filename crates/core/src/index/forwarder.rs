/// True when a comment-stripped body has the exact shape
/// `{ [return] Callee(...); }` and the callee names an internal
/// implementation: its unqualified name starts with `I_`, or it is an
/// `IName`-style identifier called with explicit template arguments.
pub(crate) fn is_inline_internal_forwarder(body_no_comments: &str) -> bool {
    let s = body_no_comments.trim();
    let Some(inner) = s.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) else {
        return false;
    };
    let mut inner = inner.trim();
    if inner.is_empty() {
        return false;
    }
    if let Some(rest) = inner.strip_prefix("return") {
        if rest.starts_with(|c: char| c.is_whitespace()) {
            inner = rest.trim();
        }
    }
    let Some(stmt) = inner.strip_suffix(';') else {
        return false;
    };
    let stmt = stmt.trim();
    if !stmt.ends_with(')') || stmt.contains(';') {
        return false;
    }
    let open_idx = match stmt.find('(') {
        Some(idx) if idx > 0 => idx,
        _ => return false,
    };
    if !parens_balanced(&stmt[open_idx..]) {
        return false;
    }

    let callee = stmt[..open_idx].trim();
    let mut base = callee.strip_prefix("this->").unwrap_or(callee);
    base = base.rsplit("::").next().unwrap_or(base);
    base = base.split('<').next().unwrap_or(base);

    if base.starts_with("I_") {
        return true;
    }
    let mut chars = base.chars();
    callee.contains('<')
        && chars.next() == Some('I')
        && chars.next().is_some_and(|c| c.is_uppercase())
}

fn parens_balanced(expr: &str) -> bool {
    let mut depth: i32 = 0;
    for ch in expr.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
