//! Application configuration
//!
//! Loaded from a JSON file (`breathpacer.json` in the working directory
//! unless `--config` names another). Every field is optional; missing
//! fields take their defaults and a missing or broken file yields the
//! default configuration.

use breathpacer_core::catalog;
use breathpacer_core::{Pattern, ToneSettings, WaveformSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "breathpacer.json";

fn default_sound_enabled() -> bool {
    true
}

/// Persistent application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Index into the predefined patterns
    #[serde(default)]
    pub preset: usize,
    /// Custom pattern text such as `4-7-8`; wins over `preset` when valid
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default = "default_sound_enabled")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub tone: ToneSettings,
    #[serde(default)]
    pub waveform: WaveformSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preset: 0,
            pattern: None,
            sound_enabled: default_sound_enabled(),
            tone: ToneSettings::default(),
            waveform: WaveformSettings::default(),
        }
    }
}

impl AppConfig {
    /// Default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Load config from `path`, falling back to defaults on any error
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Pattern to select at startup
    ///
    /// Custom text is tried first, then the preset index. Anything invalid
    /// is logged and skipped, ending at the first preset.
    pub fn initial_pattern(&self) -> Pattern {
        if let Some(text) = self.pattern.as_deref() {
            match Pattern::parse_custom(text) {
                Ok(pattern) => return pattern,
                Err(e) => {
                    tracing::warn!(pattern = text, error = %e, "Ignoring invalid custom pattern");
                }
            }
        }
        match catalog::preset(self.preset) {
            Some(preset) => preset.pattern,
            None => {
                tracing::warn!(preset = self.preset, "Unknown preset, using the first one");
                catalog::PRESETS[0].pattern
            }
        }
    }
}
