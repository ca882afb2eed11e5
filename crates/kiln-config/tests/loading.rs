use std::fs;

use kiln_config::{ConfigError, ConfigLoader, DevConfig, CONFIG_FILE_NAME, DEFAULT_HMR_PORT};
use serial_test::serial;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) {
    fs::write(dir.path().join(CONFIG_FILE_NAME), contents).unwrap();
}

#[test]
#[serial]
fn defaults_without_file() {
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::new(dir.path()).without_env().load().unwrap();

    assert_eq!(config.root, dir.path());
    assert_eq!(config.mode, "development");
    assert_eq!(config.hmr.port, DEFAULT_HMR_PORT);
    assert_eq!(config.hmr.subprotocol, "kiln-hmr");
    assert_eq!(config.watch.debounce_ms, 100);
}

#[test]
#[serial]
fn file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        r#"
mode = "staging"

[hmr]
port = 3001
path = "/__hmr"

[watch]
ignore = ["target"]
"#,
    );

    let config = ConfigLoader::new(dir.path()).without_env().load().unwrap();
    assert_eq!(config.mode, "staging");
    assert_eq!(config.hmr.port, 3001);
    assert_eq!(config.hmr.path, "/__hmr");
    assert_eq!(config.hmr.host, "127.0.0.1");
    assert_eq!(config.watch.ignore, vec!["target".to_string()]);
}

#[test]
#[serial]
fn relative_root_in_file_is_joined() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "root = \"app\"\n");

    let config = ConfigLoader::new(dir.path()).without_env().load().unwrap();
    assert_eq!(config.root, dir.path().join("app"));
}

#[test]
#[serial]
fn explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[hmr]\npath = \"/__hmr\"\n").unwrap();

    let loader = ConfigLoader::new(dir.path()).config_file(&path).without_env();
    assert_eq!(loader.find(), Some(path));
    assert_eq!(loader.load().unwrap().hmr.path, "/__hmr");
}

#[test]
#[serial]
fn env_overrides_file() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "[hmr]\nport = 3001\n");

    temp_env(&[("KILN_HMR__PORT", "4000"), ("KILN_MODE", "test")], || {
        let config = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(config.hmr.port, 4000);
        assert_eq!(config.mode, "test");
    });
}

#[test]
#[serial]
fn overrides_win_over_everything() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "mode = \"staging\"\n");

    temp_env(&[("KILN_MODE", "test")], || {
        let config = ConfigLoader::new(dir.path())
            .load_with_overrides(production_override())
            .unwrap();
        assert_eq!(config.mode, "production");
    });
}

#[test]
#[serial]
fn local_mode_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "mode = \"local\"\n");

    let err = ConfigLoader::new(dir.path()).without_env().load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMode { .. }));
}

#[test]
#[serial]
fn malformed_value_is_extract_error() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "[hmr]\nport = \"not a port\"\n");

    let err = ConfigLoader::new(dir.path()).without_env().load().unwrap_err();
    assert!(matches!(err, ConfigError::Extract(_)));
}

#[test]
fn default_config_is_valid() {
    assert!(DevConfig::default().validate().is_ok());
}

#[derive(serde::Serialize)]
struct ModeOverride {
    mode: &'static str,
}

fn production_override() -> ModeOverride {
    ModeOverride { mode: "production" }
}

fn temp_env(vars: &[(&str, &str)], f: impl FnOnce()) {
    for (key, value) in vars {
        // SAFETY: env tests run under #[serial]
        unsafe { std::env::set_var(key, value) };
    }
    f();
    for (key, _) in vars {
        // SAFETY: env tests run under #[serial]
        unsafe { std::env::remove_var(key) };
    }
}
