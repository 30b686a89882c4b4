use bcplan::load_config::{load_config, CliConfig, AR_ENV, EXTRACTION_LOG_ENV, EXTRACTOR_LOG_ENV};
use bcplan_core::config::PlanConfig;
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var(AR_ENV);
    env::remove_var(EXTRACTION_LOG_ENV);
    env::remove_var(EXTRACTOR_LOG_ENV);
}

/// Fields given in YAML replace the defaults; everything else keeps them.
#[test]
#[serial]
fn test_load_config_overrides_selected_fields() {
    clear_env();
    let config_yaml = r#"
plan:
  standalone_objects:
    - arch/arm64/kernel/head.o
  layout:
    arch_exceptions: [lib, mm]
  toolchain:
    compiler: clang-15
  trailer:
    static_libraries:
      - archive: lib/lib.a
tools:
  ar: llvm-ar
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.plan.standalone_objects, vec!["arch/arm64/kernel/head.o"]);
    assert_eq!(config.plan.layout.arch_exceptions, vec!["lib", "mm"]);
    assert_eq!(config.plan.layout.arch_root, "arch");
    assert_eq!(config.plan.toolchain.compiler, "clang-15");
    assert_eq!(config.plan.toolchain.extractor, "get-bc");
    assert_eq!(config.plan.trailer.static_libraries.len(), 1);
    assert!(!config.plan.trailer.static_libraries[0].scan_assembly);
    assert_eq!(config.tools.ar, "llvm-ar");
    assert_eq!(
        config.tools.extraction_log,
        PathBuf::from("wrapper-logs/wrapper.log")
    );
}

/// An empty file is the all-defaults configuration.
#[test]
#[serial]
fn test_load_config_empty_file_gives_defaults() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");

    let config = load_config(config_file.path()).expect("Empty config should load");
    assert_eq!(config, CliConfig::default());
    assert_eq!(config.plan, PlanConfig::default());
}

#[test]
#[serial]
fn test_load_config_environment_wins_over_file() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "tools:\n  ar: llvm-ar\n").unwrap();

    env::set_var(AR_ENV, "/opt/binutils/bin/ar");
    env::set_var(EXTRACTOR_LOG_ENV, "/var/log/gllvm.log");
    let config = load_config(config_file.path()).expect("Config should load");
    assert_eq!(config.tools.ar, "/opt/binutils/bin/ar");
    assert_eq!(config.tools.extraction_log, PathBuf::from("/var/log/gllvm.log"));

    env::set_var(EXTRACTION_LOG_ENV, "custom.log");
    let config = CliConfig::from_env();
    assert_eq!(config.tools.extraction_log, PathBuf::from("custom.log"));
    clear_env();
}

#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();

    let err = load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    let err = load_config("/nonexistent/bcplan.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
