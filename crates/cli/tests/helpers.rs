use std::fs;
use std::path::{Path, PathBuf};

use re_parity::{resolve_in_root, sha256_file};
use tempfile::tempdir;

#[test]
fn resolve_in_root_joins_relative_paths() {
    let root = Path::new("/work/project");
    assert_eq!(
        resolve_in_root(root, "source/game_sa"),
        PathBuf::from("/work/project/source/game_sa")
    );
}

#[test]
fn resolve_in_root_keeps_absolute_paths() {
    let tmp = tempdir().expect("tempdir");
    let abs = tmp.path().join("hooks.csv");
    let abs_str = abs.to_string_lossy().to_string();
    assert_eq!(resolve_in_root(Path::new("/elsewhere"), &abs_str), abs);
}

#[test]
fn sha256_file_hashes_contents() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("hooks.csv");
    fs::write(&path, "abc").expect("write");
    assert_eq!(
        sha256_file(&path).expect("hash"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn sha256_file_reports_missing_file() {
    let tmp = tempdir().expect("tempdir");
    let err = sha256_file(&tmp.path().join("missing.csv")).unwrap_err();
    assert!(err.to_string().contains("Failed to open file for hashing"));
}
