//! Breathpacer - guided breathing pacer
//!
//! This library re-exports the phase-cycle engine, tone synthesis and
//! waveform recording from `breathpacer-core`, and adds the application
//! layer: configuration plus the desktop and terminal front ends.

pub mod config;
pub mod ui;

pub use breathpacer_core::{animator, audio, catalog, clock, easing, orchestrator, pattern, waveform};

pub use breathpacer_core::{
    AudioEngineError, CycleError, CycleOrchestrator, FormatError, Pattern, Phase, Presenter,
    RunSnapshot, RunState, SessionStats, ToneOutput, ToneSettings, ToneSynthesizer,
    WaveformSettings,
};
pub use breathpacer_core::{BUILD_DATE, PRESETS, VERSION};
pub use config::AppConfig;
