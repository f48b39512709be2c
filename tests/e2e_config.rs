//! E2E tests for configuration loading
//!
//! Writes config files to a temporary directory and checks what the
//! application would select at startup.

use breathpacer::config::{AppConfig, DEFAULT_CONFIG_FILE};
use breathpacer::Pattern;

/// Test that every section of a hand-written file is picked up
#[test]
fn test_full_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    std::fs::write(
        &path,
        r#"{
            "preset": 2,
            "sound_enabled": false,
            "tone": { "hold_hz": 220.0 },
            "waveform": { "max_points": 300 }
        }"#,
    )
    .unwrap();

    let config = AppConfig::load(&path);
    assert!(!config.sound_enabled);
    assert_eq!(config.tone.hold_hz, 220.0);
    assert_eq!(config.tone.sweep_volume, 0.15);
    assert_eq!(config.waveform.max_points, 300);
    assert_eq!(config.initial_pattern(), Pattern::new([4, 0, 4, 0]));
}

/// Test that loading leaves the file untouched
#[test]
fn test_load_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    let contents = r#"{ "preset": 9 }"#;
    std::fs::write(&path, contents).unwrap();

    let config = AppConfig::load(&path);
    assert_eq!(config.initial_pattern(), Pattern::new([4, 4, 4, 4]));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);

    let missing = dir.path().join("absent.json");
    AppConfig::load(&missing);
    assert!(!missing.exists());
}

/// Test that a hand-written partial file fills in the rest
#[test]
fn test_partial_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    std::fs::write(&path, r#"{ "pattern": "5-5-5" }"#).unwrap();

    let config = AppConfig::load(&path);
    assert!(config.sound_enabled);
    assert_eq!(config.waveform.sample_interval_ms, 16);
    assert_eq!(config.initial_pattern(), Pattern::new([5, 5, 5, 0]));
}

/// Test that a missing file yields the default selection
#[test]
fn test_missing_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(&dir.path().join("missing.json"));
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.initial_pattern(), Pattern::new([4, 4, 4, 4]));
}
