//! Breathpacer Core - phase-cycle engine for guided breathing
//!
//! This library sequences breathing phases (inhale, hold, exhale, hold after
//! exhale) and keeps three time-based subsystems in lockstep with them:
//! the scale animator driving the pulsing circle, the tone synthesizer
//! driving the audio output, and the waveform recorder feeding the live plot.
//!
//! All timing is expressed against caller-supplied [`std::time::Instant`]s so
//! the same engine runs under a GUI frame loop, a terminal ticker, or a test
//! with synthetic clocks.

pub mod animator;
pub mod audio;
pub mod catalog;
pub mod clock;
pub mod easing;
pub mod orchestrator;
pub mod pattern;
pub mod waveform;

pub use animator::ScaleAnimator;
pub use audio::engine::{AudioEngine, AudioEngineError};
pub use audio::synth::{ToneOutput, ToneSynthesizer};
pub use audio::tone::ToneSettings;
pub use catalog::{Preset, PRESETS};
pub use clock::{PhaseClock, Token};
pub use orchestrator::{
    ActivePhase, CycleError, CycleOrchestrator, Presenter, RunSnapshot, RunState, SessionStats,
};
pub use pattern::{Cycle, FormatError, Pattern, Phase};
pub use waveform::{WaveformRecorder, WaveformSettings};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (YYYY-MM-DD), set by build.rs
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Scale of the circle at rest (idle, before the first phase)
pub const REST_SCALE: f32 = 1.0;

/// Duration of the glide back to [`REST_SCALE`] after a stop
pub const RESET_GLIDE_MS: u64 = 500;
