use redeploy_core::config::{ConfigError, UpdaterConfig};
use std::path::PathBuf;

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = UpdaterConfig::load(&dir.path().join("nope.yaml")).unwrap();
    assert_eq!(config, UpdaterConfig::default());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "backupRetention: 2\ntimestampFormat: \"%Y-%m-%d_%H-%M-%S\"\nprojects:\n  - /srv/a\n  - /srv/b\nlogTailLines: 50\n",
    )
    .unwrap();

    let config = UpdaterConfig::load(&path).unwrap();
    assert_eq!(config.backup_retention, 2);
    assert_eq!(config.timestamp_format, "%Y-%m-%d_%H-%M-%S");
    assert_eq!(
        config.projects,
        vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
    );
    assert_eq!(config.log_tail_lines, 50);
    assert_eq!(config.stop_timeout_secs, 10);
}

#[test]
fn test_load_invalid_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "backupRetention: [unclosed").unwrap();

    let err = UpdaterConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn test_builder_overrides() {
    let config = UpdaterConfig::default()
        .with_projects(vec![PathBuf::from("/srv/x")])
        .with_backup_retention(1);
    assert_eq!(config.projects.len(), 1);
    assert_eq!(config.backup_retention, 1);
    assert!(config.validate().is_ok());
}
