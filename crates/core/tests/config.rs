use std::fs;

use tempfile::tempdir;

use parity_core::config::{load_config, ConfigError, ProjectProfile, ToolConfig};

#[test]
fn defaults_match_gta_reversed_profile() {
    let config = ToolConfig::default();
    assert_eq!(config.project_profile.stub_call_prefix, "plugin::Call");
    assert_eq!(config.project_profile.class_macro, "RH_ScopedClass");
    assert_eq!(config.project_profile.stub_markers, vec!["NOTSA_UNREACHABLE".to_string()]);
    assert_eq!(config.parity.call_count_warn_diff, 3);
    assert!(!config.parity.inline_wrapper_autoskip);
    assert_eq!(config.backend.kind, "ghidra-bridge");
    assert_eq!(config.backend.timeout_s, 45);
}

#[test]
fn partial_yaml_merges_over_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("re-parity.yaml");
    fs::write(
        &path,
        "project_profile:\n  source_root: src/game\nparity:\n  inline_wrapper_autoskip: true\n\
         backend:\n  type: stub\n",
    )
    .expect("write config");

    let config = load_config(Some(&path), &[]).expect("load config");
    assert_eq!(config.project_profile.source_root, "src/game");
    assert_eq!(config.project_profile.stub_call_prefix, "plugin::Call");
    assert!(config.parity.inline_wrapper_autoskip);
    assert_eq!(config.parity.call_count_warn_diff, 3);
    assert_eq!(config.backend.kind, "stub");
    assert_eq!(config.backend.cli_path, "ghidra");
}

#[test]
fn cli_overrides_win_over_file_values() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("re-parity.yaml");
    fs::write(&path, "parity:\n  call_count_warn_diff: 8\n").expect("write config");

    let overrides = vec![
        "parity.call_count_warn_diff=5".to_string(),
        "parity.semantic_rules_file=docs/rules.json".to_string(),
        "project_profile.source_extensions=[.cc, .hh]".to_string(),
    ];
    let config = load_config(Some(&path), &overrides).expect("load config");
    assert_eq!(config.parity.call_count_warn_diff, 5);
    assert_eq!(config.parity.semantic_rules_file.as_deref(), Some("docs/rules.json"));
    assert_eq!(
        config.project_profile.source_extensions,
        vec![".cc".to_string(), ".hh".to_string()]
    );
}

#[test]
fn missing_file_uses_defaults() {
    let dir = tempdir().expect("tempdir");
    let config = load_config(Some(&dir.path().join("absent.yaml")), &[]).expect("defaults");
    assert_eq!(config.parity.cache_dir, ToolConfig::default().parity.cache_dir);
}

#[test]
fn malformed_inputs_are_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("list.yaml");
    fs::write(&path, "- a\n- b\n").expect("write config");
    assert!(matches!(load_config(Some(&path), &[]), Err(ConfigError::NotMapping)));

    let bad = vec!["parity.enabled".to_string()];
    assert!(matches!(load_config(None, &bad), Err(ConfigError::BadOverride(_))));

    let wrong_type = vec!["parity.call_count_warn_diff=lots".to_string()];
    assert!(matches!(load_config(None, &wrong_type), Err(ConfigError::Yaml(_))));
}

#[test]
fn templates_round_trip_through_yaml() {
    let yaml = ToolConfig::template_yaml("openrct2").expect("template");
    let config: ToolConfig = serde_yaml::from_str(&yaml).expect("parse template");
    assert_eq!(config.project_profile, ProjectProfile::named("openrct2").expect("profile"));
    assert_eq!(config.project_profile.stub_call_prefix, "original_function");
    assert!(matches!(ToolConfig::template_yaml("quake"), Err(ConfigError::UnknownProfile(_))));
}

#[test]
fn cache_db_path_is_rooted() {
    let config = ToolConfig::default();
    let root = std::path::Path::new("/work/project");
    assert_eq!(
        config.parity.cache_db_path(root),
        root.join(".cache/re-parity").join("parity.db")
    );
}
