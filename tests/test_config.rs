use std::collections::HashMap;
use std::path::PathBuf;

use rawhttp::config::Config;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.listen_addr, "0.0.0.0:4221");
    assert_eq!(cfg.directory, PathBuf::from("."));
    assert_eq!(cfg.read_buffer_size, 4096);
}

#[test]
fn test_config_without_env_keeps_defaults() {
    let cfg = Config::default().with_env(env(&[]));
    assert_eq!(cfg, Config::default());
}

#[test]
fn test_config_env_overrides() {
    let cfg = Config::default().with_env(env(&[
        ("LISTEN", "127.0.0.1:8000"),
        ("DIRECTORY", "/tmp/served"),
    ]));

    assert_eq!(cfg.listen_addr, "127.0.0.1:8000");
    assert_eq!(cfg.directory, PathBuf::from("/tmp/served"));
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml_str(
        "listen_addr: 127.0.0.1:9000\ndirectory: /srv/files\nmax_body_size: 1024\n",
    )
    .unwrap();

    assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.directory, PathBuf::from("/srv/files"));
    assert_eq!(cfg.max_body_size, 1024);
    // Unspecified fields fall back to defaults
    assert_eq!(cfg.read_buffer_size, 4096);
}

#[test]
fn test_config_empty_yaml_is_default() {
    assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
}

#[test]
fn test_config_invalid_yaml_is_error() {
    assert!(Config::from_yaml_str("read_buffer_size: lots").is_err());
}

#[test]
fn test_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.yaml");
    std::fs::write(&path, "listen_addr: 127.0.0.1:9000\n").unwrap();

    let cfg = Config::from_file(&path)
        .unwrap()
        .with_env(env(&[("LISTEN", "0.0.0.0:5000")]));

    assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
}

#[test]
fn test_missing_config_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::from_file(&dir.path().join("absent.yaml")).is_err());
}

#[test]
fn test_connection_settings_follow_config() {
    let cfg = Config {
        read_buffer_size: 512,
        max_head_size: 100,
        max_body_size: 200,
        ..Config::default()
    };

    let settings = cfg.connection_settings();
    assert_eq!(settings.read_buffer_size, 512);
    assert_eq!(settings.limits.max_head_size, 100);
    assert_eq!(settings.limits.max_body_size, 200);
}
