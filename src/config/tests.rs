use super::settings::Settings;
use super::{load_config_from, load_config};
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 8000);
    assert_eq!(settings.server.request_timeout(), Duration::from_secs(30));
    assert_eq!(settings.broker.topic, "logs");
    assert_eq!(settings.broker.dispatch_interval_ms, 100);
    assert!(settings.broker.eager_dispatch);
    assert_eq!(settings.broker.delivery_retries, 0);
    assert_eq!(settings.dataset.path, None);
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn test_dispatch_config_from_settings() {
    let mut settings = Settings::default();
    let dispatch = settings.broker.dispatch_config();
    assert_eq!(dispatch.interval, Duration::from_millis(100));
    assert_eq!(dispatch.max_delivery_attempts, None);

    settings.broker.delivery_retries = 3;
    settings.broker.dispatch_interval_ms = 0;
    let dispatch = settings.broker.dispatch_config();
    assert_eq!(dispatch.max_delivery_attempts, Some(3));
    assert_eq!(dispatch.interval, Duration::from_millis(1));
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");
    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn test_load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "127.0.0.1"
        port = 9000

        [broker]
        topic = "audit"
        delivery_retries = 5

        [dataset]
        path = "data/weblogs.json"
    "#;
    let path = tmp.path().join("default.toml");
    fs::write(&path, toml).expect("write config file");

    let base = tmp.path().join("default");
    let cfg = load_config_from(base.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.request_timeout_ms, 30_000);
    assert_eq!(cfg.broker.topic, "audit");
    assert_eq!(cfg.broker.delivery_retries, 5);
    assert!(cfg.broker.eager_dispatch);
    assert_eq!(cfg.dataset.path.as_deref(), Some("data/weblogs.json"));
    assert_eq!(cfg.logging.level, "info");
}

#[test]
#[serial]
fn test_environment_overrides() {
    temp_env::with_vars(
        [
            ("LOGSTREAM_SERVER__PORT", Some("9100")),
            ("LOGSTREAM_BROKER__TOPIC", Some("env-topic")),
            ("LOGSTREAM_BROKER__EAGER_DISPATCH", Some("false")),
            ("LOGSTREAM_LOGGING__LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.broker.topic, "env-topic");
            assert!(!cfg.broker.eager_dispatch);
            assert_eq!(cfg.logging.level, "debug");
        },
    );
}
