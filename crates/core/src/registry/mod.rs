//! Hook registry reader.
//!
//! The registry is a CSV document with a header row. Two schemas are accepted:
//!
//! ```text
//! class,fn_name,address,reversed,locked,is_virtual
//! Entity/Vehicle/CTrain,ProcessControl,0x6F86A0,1,0,1
//! ```
//!
//! or a combined name column:
//!
//! ```text
//! address,name
//! 0x6F86A0,CTrain::ProcessControl
//! ```
//!
//! `reversed`, `locked` and `is_virtual` are optional 0/1 columns defaulting to
//! true, false and false.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::HookEntry;

static HOOK_ADDR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]+$").unwrap());

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read hook registry at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Hook registry has no 'address' column")]
    MissingAddressColumn,
}

/// Read hook entries from a CSV file.
pub fn read_hooks(path: &Path, include_unreversed: bool) -> Result<Vec<HookEntry>, RegistryError> {
    let bytes =
        fs::read(path).map_err(|source| RegistryError::Io { path: path.to_path_buf(), source })?;
    parse_hooks(&String::from_utf8_lossy(&bytes), include_unreversed)
}

/// Parse hook entries from CSV text.
///
/// Rows whose address is not `0x`-prefixed hex are skipped silently; rows with
/// a malformed flag column are skipped with a warning. An empty document
/// yields no entries.
pub fn parse_hooks(text: &str, include_unreversed: bool) -> Result<Vec<HookEntry>, RegistryError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text).into_iter();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let columns: HashMap<String, usize> =
        header.iter().enumerate().map(|(idx, name)| (name.trim().to_string(), idx)).collect();
    if !columns.contains_key("address") {
        return Err(RegistryError::MissingAddressColumn);
    }

    let mut out = Vec::new();
    for (row_idx, row) in records.enumerate() {
        let field = |name: &str| -> Option<&str> {
            columns.get(name).map(|&idx| row.get(idx).map(|v| v.trim()).unwrap_or(""))
        };
        let row_no = row_idx + 1;

        let address = field("address").unwrap_or("");
        if !HOOK_ADDR_RE.is_match(address) {
            continue;
        }

        let flag = |name: &str, default: bool| -> Option<bool> {
            match field(name) {
                None => Some(default),
                Some(value) => match value.parse::<i64>() {
                    Ok(n) => Some(n != 0),
                    Err(_) => {
                        log::warn!("hook registry row {row_no}: invalid {name} value '{value}'");
                        None
                    }
                },
            }
        };
        let (Some(reversed), Some(locked), Some(is_virtual)) =
            (flag("reversed", true), flag("locked", false), flag("is_virtual", false))
        else {
            continue;
        };
        if !include_unreversed && !reversed {
            continue;
        }

        let mut class_path = field("class").unwrap_or("").to_string();
        let mut fn_name = field("fn_name").unwrap_or("").to_string();
        if class_path.is_empty() && fn_name.is_empty() {
            if let Some(full_name) = field("name") {
                match full_name.rsplit_once("::") {
                    Some((class, func)) => {
                        class_path = class.to_string();
                        fn_name = func.to_string();
                    }
                    None => fn_name = full_name.to_string(),
                }
            }
        }

        out.push(HookEntry {
            class_path,
            fn_name,
            address: address.to_lowercase(),
            reversed,
            locked,
            is_virtual,
        });
    }
    Ok(out)
}

/// Split CSV text into records, honouring double-quoted fields (with `""`
/// escapes and embedded newlines). Blank lines are dropped.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }
    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|f| f.trim().is_empty());
    if !blank {
        records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let records = split_records("a,\"b, c\",\"say \"\"hi\"\"\"\r\n\n1,2,3");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["a", "b, c", "say \"hi\""]);
        assert_eq!(records[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_address_column_is_an_error() {
        let err = parse_hooks("class,fn_name\nCTrain,ProcessControl\n", false).unwrap_err();
        assert!(matches!(err, RegistryError::MissingAddressColumn));
    }
}
