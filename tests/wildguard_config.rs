use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use wildguard::config::WildguardConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "WILDGUARD_CONFIG",
        "WILDGUARD_API_ADDR",
        "WILDGUARD_BACKEND",
        "WILDGUARD_FALLBACK_BACKEND",
        "WILDGUARD_REMOTE_URL",
        "WILDGUARD_REMOTE_API_KEY",
        "WILDGUARD_REMOTE_TIMEOUT_SECS",
        "WILDGUARD_SCRIPT_PATH",
        "WILDGUARD_SCRIPT_INTERPRETER",
        "WILDGUARD_VEHICLE_SPEED",
        "WILDGUARD_MAX_UPLOAD_BYTES",
        "WILDGUARD_HISTORY_CAPACITY",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_use_remote_with_fixture_fallback() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = WildguardConfig::load().expect("load defaults");

    assert_eq!(cfg.api_addr, "127.0.0.1:8787");
    assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
    assert_eq!(cfg.detector.backend, "remote");
    assert_eq!(cfg.detector.fallback.as_deref(), Some("fixture"));
    assert_eq!(
        cfg.detector.remote.url,
        "https://detect.roboflow.com/wildlife-detection/2"
    );
    assert_eq!(cfg.detector.remote.timeout, Duration::from_secs(30));
    assert!(cfg.detector.subprocess.is_none());
    assert_eq!(cfg.vehicle_speed, 65);
    assert_eq!(cfg.history_capacity, 50);
}

#[test]
fn loads_json_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "api": { "addr": "127.0.0.1:9100", "max_upload_bytes": 2048 },
        "detector": {
            "backend": "subprocess",
            "fallback": "",
            "remote": { "url": "http://127.0.0.1:9999/model/1", "timeout_secs": 5 },
            "subprocess": { "script": "/opt/wildguard/detect_cli.py", "interpreter": "python3" }
        },
        "report": { "vehicle_speed": 70 },
        "history": { "capacity": 10 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("WILDGUARD_CONFIG", file.path());
    std::env::set_var("WILDGUARD_VEHICLE_SPEED", "90");
    std::env::set_var("WILDGUARD_REMOTE_API_KEY", "secret_key");

    let cfg = WildguardConfig::load().expect("load config");

    assert_eq!(cfg.api_addr, "127.0.0.1:9100");
    assert_eq!(cfg.max_upload_bytes, 2048);
    assert_eq!(cfg.detector.backend, "subprocess");
    assert_eq!(cfg.detector.fallback, None);
    assert_eq!(cfg.detector.remote.url, "http://127.0.0.1:9999/model/1");
    assert_eq!(cfg.detector.remote.api_key, "secret_key");
    assert_eq!(cfg.detector.remote.timeout, Duration::from_secs(5));
    let sub = cfg.detector.subprocess.expect("subprocess settings");
    assert_eq!(sub.script, PathBuf::from("/opt/wildguard/detect_cli.py"));
    assert_eq!(sub.interpreter.as_deref(), Some("python3"));
    assert_eq!(cfg.vehicle_speed, 90);
    assert_eq!(cfg.history_capacity, 10);

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[api]
addr = "127.0.0.1:9200"

[detector]
backend = "fixture"
fallback = ""

[report]
vehicle_speed = 55
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("WILDGUARD_CONFIG", file.path());

    let cfg = WildguardConfig::load().expect("load config");

    assert_eq!(cfg.api_addr, "127.0.0.1:9200");
    assert_eq!(cfg.detector.backend, "fixture");
    assert_eq!(cfg.detector.fallback, None);
    assert_eq!(cfg.vehicle_speed, 55);

    clear_env();
}

#[test]
fn env_script_path_enables_subprocess_backend() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WILDGUARD_BACKEND", "subprocess");
    std::env::set_var("WILDGUARD_FALLBACK_BACKEND", "fixture");
    std::env::set_var("WILDGUARD_SCRIPT_PATH", "/srv/detect.sh");
    std::env::set_var("WILDGUARD_SCRIPT_INTERPRETER", "sh");

    let cfg = WildguardConfig::load().expect("load config");
    assert_eq!(cfg.detector.backend, "subprocess");
    assert_eq!(cfg.detector.fallback.as_deref(), Some("fixture"));
    let sub = cfg.detector.subprocess.expect("subprocess settings");
    assert_eq!(sub.script, PathBuf::from("/srv/detect.sh"));
    assert_eq!(sub.interpreter.as_deref(), Some("sh"));

    clear_env();
}

#[test]
fn rejects_unknown_backend() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WILDGUARD_BACKEND", "onnx");
    let err = WildguardConfig::load().expect_err("unknown backend");
    assert!(err.to_string().contains("unknown detector backend 'onnx'"));

    clear_env();
}

#[test]
fn rejects_subprocess_without_script() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WILDGUARD_BACKEND", "subprocess");
    let err = WildguardConfig::load().expect_err("missing script");
    assert!(err.to_string().contains("no detector script configured"));

    clear_env();
}

#[test]
fn rejects_fallback_equal_to_backend() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WILDGUARD_BACKEND", "fixture");
    std::env::set_var("WILDGUARD_FALLBACK_BACKEND", "fixture");
    let err = WildguardConfig::load().expect_err("fallback equals backend");
    assert!(err.to_string().contains("same as the primary backend"));

    clear_env();
}

#[test]
fn rejects_non_numeric_vehicle_speed() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WILDGUARD_VEHICLE_SPEED", "fast");
    assert!(WildguardConfig::load().is_err());

    clear_env();
}
