//! Integration tests for configuration loading.

use std::fs;

use login_sim_app::{AppError, ENV_CONFIG_PATH, load_config_from};
use login_sim_core::{ENV_MAX_DELAY_MS, SimulationConfig};

#[test]
fn config_loading_tests_defaults_without_any_source() {
    let config = load_config_from(|_| None).expect("defaults should load");
    assert_eq!(config, SimulationConfig::default());
}

#[test]
fn config_loading_tests_file_then_env_override() {
    let path = std::env::temp_dir().join(format!(
        "login-sim-config-{}.json",
        std::process::id()
    ));
    fs::write(&path, r#"{"min_delay_ms": 1000, "max_delay_ms": 2000}"#)
        .expect("temp config should be writable");
    let path_text = path.display().to_string();

    let config = load_config_from(|key| match key {
        ENV_CONFIG_PATH => Some(path_text.clone()),
        ENV_MAX_DELAY_MS => Some("3000".to_string()),
        _ => None,
    })
    .expect("config should load");
    let _ = fs::remove_file(&path);

    assert_eq!(config.min_delay_ms, 1_000);
    assert_eq!(config.max_delay_ms, 3_000);
    assert_eq!(config.progress_interval_ms, 100);
}

#[test]
fn config_loading_tests_missing_file_is_reported() {
    let result = load_config_from(|key| {
        (key == ENV_CONFIG_PATH).then(|| "/nonexistent/login-sim.json".to_string())
    });
    assert!(matches!(result, Err(AppError::ReadConfig { .. })));
}
