use docflow::config::{Config, ConfigError};
use std::io::Write;

fn write_config(dir: &tempfile::TempDir, toml: &str) -> std::path::PathBuf {
    let path = dir.path().join("docflow.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    path
}

#[test]
fn test_from_file_sets_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
        [engine]
        drop_disabled_fields = false

        [pipelines.people]
        definition_path = "people.json"
        "#,
    );

    let config = Config::from_file(&path).expect("config should load");
    assert_eq!(config.base_dir, dir.path());
    assert!(!config.engine.drop_disabled_fields);
    let people = config.pipeline("people").unwrap();
    assert_eq!(config.definition_path(people), dir.path().join("people.json"));
}

#[test]
fn test_missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[engine\nfail_on_error = true");
    assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn test_wrongly_typed_engine_option_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[engine]\nfail_on_error = \"yes\"");
    assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn test_validation_runs_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
        [logging]
        log_to_file = true
        log_file_path = ""
        "#,
    );
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::MissingLogFilePath)
    ));
}
