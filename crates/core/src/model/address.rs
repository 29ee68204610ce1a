/// Normalize an address to the lookup/cache key form: lowercase hex, no `0x`
/// prefix, left-padded with zeros to 8 digits.
///
/// `"0x5E3E90"`, `"5e3e90"` and `"0x005E3E90"` all become `"005e3e90"`.
pub fn normalize_address(addr: &str) -> String {
    let cleaned = addr.trim().to_ascii_lowercase();
    let digits = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
    format!("{digits:0>8}")
}

/// Lowercase an address and make sure it carries a `0x` prefix (display form).
pub fn format_address(addr: &str) -> String {
    let cleaned = addr.trim().to_ascii_lowercase();
    if cleaned.starts_with("0x") {
        cleaned
    } else {
        format!("0x{cleaned}")
    }
}
