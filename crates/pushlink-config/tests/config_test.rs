#![allow(clippy::unwrap_used)]
// Integration tests for profile loading and saving.

use std::time::Duration;

use pretty_assertions::assert_eq;

use pushlink_config::{
    Config, ConfigError, Profile, load_config_from, profile_to_settings, profile_transport,
    save_config_to,
};

const SAMPLE: &str = r#"
default_profile = "staging"

[defaults]
timeout = 12

[profiles.staging]
app_name = "bohr-staging"
sender_id = "push@example.com"
resource = "laptop"
account = "alice"
device_id = "dev-1"
auth_cookie_name = "ACSID"

[profiles.local]
app_name = "bohr"
base_url = "http://localhost:8080"
timeout = 2
"#;

#[test]
fn test_load_layers_file_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.default_profile.as_deref(), Some("staging"));
    assert_eq!(cfg.defaults.timeout, 12);
    assert_eq!(cfg.defaults.output, "table");

    let staging = cfg.profile("staging").unwrap();
    assert_eq!(
        staging.base_url().unwrap().as_str(),
        "https://bohr-staging.appspot.com/"
    );
    let settings = profile_to_settings(staging);
    assert_eq!(settings.auth_cookie_name, "ACSID");
    assert_eq!(settings.resource, "laptop");
    assert_eq!(
        profile_transport(staging, &cfg.defaults).timeout,
        Duration::from_secs(12)
    );

    let local = cfg.profile("local").unwrap();
    assert_eq!(
        profile_transport(local, &cfg.defaults).timeout,
        Duration::from_secs(2)
    );

    assert!(matches!(
        cfg.profile("prod"),
        Err(ConfigError::UnknownProfile { profile }) if profile == "prod"
    ));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert!(cfg.profiles.is_empty());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.profiles.insert(
        "default".into(),
        Profile {
            app_name: "bohr".into(),
            sender_id: "push@example.com".into(),
            device_id: Some("dev-7".into()),
            ..Profile::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let profile = loaded.profile("default").unwrap();
    assert_eq!(profile.app_name, "bohr");
    assert_eq!(profile.device_id.as_deref(), Some("dev-7"));
    assert_eq!(profile.base_url, None);
}

#[test]
fn test_bad_toml_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.x\napp_name = ").unwrap();
    assert!(matches!(
        load_config_from(&path),
        Err(ConfigError::Figment(_))
    ));
}
