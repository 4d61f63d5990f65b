use std::io::Write;

use crud_api::{CommitMode, CrudError, StoreConfig};

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "commit = \"staged\"").unwrap();
    writeln!(file, "strict_columns = true").unwrap();

    let config = StoreConfig::load(file.path()).unwrap();
    assert_eq!(config.commit, CommitMode::Staged);
    assert!(config.strict_columns);
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.toml");
    let err = StoreConfig::load(&path).unwrap_err();
    match err {
        CrudError::Config(msg) => assert!(msg.starts_with(&path.display().to_string())),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn invalid_file_is_reported_with_its_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "strict_columns = \"yes\"").unwrap();
    let err = StoreConfig::load(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("config error: "));
    assert!(msg.contains(&file.path().display().to_string()));
}
