//! Configuration loading: error messages and file handling.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use wikimirror_core::{config, ConfigError, Site, Title};

const VALID: &str = r#"{
    "sites": {
        "src": {"fam": "wikipedia", "code": "en"},
        "dst": {"fam": "kiwix", "code": "en"}
    },
    "pages": ["Main Page"],
    "categories": [],
    "modifications": []
}"#;

#[test]
fn load_valid_file() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("mirror.json");
    file.write_str(VALID).expect("write");

    let cfg = config::load_at(file.path()).expect("load");
    assert_eq!(cfg.sites.dst, Site::new("kiwix", "en"));
    assert_eq!(cfg.pages, vec![Title::new("Main Page")]);
}

#[test]
fn load_missing_file_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("absent.json");
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn load_malformed_json_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("broken.json");
    file.write_str(r#"{"sites": {"src": "#).expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("broken.json"), "must contain file path, got: {msg}");
    let source_msg = match &err {
        ConfigError::Parse { source, .. } => source.to_string(),
        _ => unreachable!(),
    };
    assert!(!source_msg.is_empty(), "serde_json must provide error context");
}

#[test]
fn load_wrong_shape_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("list.json");
    file.write_str(r#"["this is a list, not an object"]"#).expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn loading_never_modifies_the_file() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("mirror.json");
    file.write_str(VALID).expect("write");

    config::load_at(file.path()).expect("load");
    file.assert(predicate::str::diff(VALID));
}
