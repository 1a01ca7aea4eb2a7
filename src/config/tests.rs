use super::*;
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = ClientSettings::default();
    assert_eq!(settings.url, "ws://127.0.0.1:8080");
    assert_eq!(settings.request_timeout_ms, 10_000);
    assert_eq!(settings.protocol_version, "1.0.0");
    assert!(!settings.cancel_pending_on_disconnect);
    assert!(settings.reconnect.enabled);
    assert_eq!(settings.reconnect.delay_ms, 1_000);
    assert_eq!(settings.reconnect.max_attempts, None);
}

#[test]
fn test_builder_setters() {
    let settings = ClientSettings::new("ws://broker:9000")
        .with_request_timeout(Duration::from_millis(250))
        .with_reconnect_delay(Duration::from_millis(20))
        .with_max_reconnect_attempts(Some(3))
        .with_reconnect(false)
        .with_protocol_version("1.2.0");
    assert_eq!(settings.url, "ws://broker:9000");
    assert_eq!(settings.request_timeout(), Duration::from_millis(250));
    assert_eq!(settings.reconnect_delay(), Duration::from_millis(20));
    assert_eq!(settings.reconnect.max_attempts, Some(3));
    assert!(!settings.reconnect.enabled);
    assert_eq!(settings.protocol_version, "1.2.0");
}

#[test]
fn test_builder_saturates_oversized_durations() {
    let settings = ClientSettings::default()
        .with_request_timeout(Duration::MAX)
        .with_reconnect_delay(Duration::MAX);
    assert_eq!(settings.request_timeout_ms, u64::MAX);
    assert_eq!(settings.reconnect.delay_ms, u64::MAX);
}

#[test]
fn test_merge_keeps_defaults_for_missing_fields() {
    let partial = PartialSettings {
        url: Some("ws://other:1".into()),
        reconnect: Some(PartialReconnectSettings {
            max_attempts: Some(5),
            ..Default::default()
        }),
        ..Default::default()
    };
    let merged = ClientSettings::default().merge(partial);
    assert_eq!(merged.url, "ws://other:1");
    assert_eq!(merged.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    assert_eq!(merged.reconnect.delay_ms, DEFAULT_RECONNECT_DELAY_MS);
    assert_eq!(merged.reconnect.max_attempts, Some(5));
    assert!(merged.reconnect.enabled);
}

#[test]
#[serial]
fn test_load_config_from_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("client.toml");
    let toml = r#"
        url = "ws://10.0.0.1:9001"
        request_timeout_ms = 500

        [reconnect]
        enabled = false
        delay_ms = 50
    "#;
    fs::write(&path, toml).expect("write config file");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.url, "ws://10.0.0.1:9001");
    assert_eq!(cfg.request_timeout_ms, 500);
    assert!(!cfg.reconnect.enabled);
    assert_eq!(cfg.reconnect.delay_ms, 50);
    assert_eq!(cfg.reconnect.max_attempts, None);
    assert_eq!(cfg.protocol_version, "1.0.0");
}

#[test]
#[serial]
fn test_load_config_from_env() {
    temp_env::with_vars(
        [
            ("POPSUB__URL", Some("ws://env-host:7000")),
            ("POPSUB__REQUEST_TIMEOUT_MS", Some("1234")),
        ],
        || {
            let cfg = load_config_from("does/not/exist").expect("load_config failed");
            assert_eq!(cfg.url, "ws://env-host:7000");
            assert_eq!(cfg.request_timeout_ms, 1234);
            assert!(cfg.reconnect.enabled);
        },
    );
}

#[test]
#[serial]
fn test_load_config_without_sources_uses_defaults() {
    let cfg = load_config_from("does/not/exist").expect("load_config failed");
    assert_eq!(cfg, ClientSettings::default());
}

#[test]
#[serial]
fn test_load_config_reports_bad_values() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("client.toml");
    fs::write(&path, "request_timeout_ms = \"soon\"\n").expect("write config file");

    let err = load_config_from(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, crate::utils::error::SessionError::Config(_)));
}
