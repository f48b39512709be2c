//! Phase tone synthesizer
//!
//! Owns the single audio output and its one active tone. The output device
//! is opened lazily on first use; if that fails, sound is disabled for the
//! rest of the session and every call becomes a silent no-op.

use super::engine::{AudioEngine, AudioEngineError};
use super::tone::{ToneSettings, ToneSpec};
use crate::pattern::Phase;
use std::time::Duration;

/// Destination for rendered tones
pub trait ToneOutput {
    /// Start `tone`, replacing anything already sounding
    fn play(&mut self, tone: &ToneSpec);
    /// Silence the active tone immediately
    fn silence(&mut self);
}

/// Opens the output device on demand
pub type OutputFactory = Box<dyn FnMut() -> Result<Box<dyn ToneOutput>, AudioEngineError>>;

enum OutputSlot {
    Unopened,
    Ready(Box<dyn ToneOutput>),
    /// Opening failed; never retried this session
    Unavailable,
}

/// Plays one tone per phase on the shared output
pub struct ToneSynthesizer {
    settings: ToneSettings,
    enabled: bool,
    slot: OutputSlot,
    factory: OutputFactory,
    /// Phase of the tone currently sounding
    active: Option<Phase>,
}

impl ToneSynthesizer {
    /// Create a synthesizer that opens outputs through `factory`
    pub fn new(settings: ToneSettings, factory: OutputFactory) -> Self {
        Self {
            settings,
            enabled: true,
            slot: OutputSlot::Unopened,
            factory,
            active: None,
        }
    }

    /// Create a synthesizer backed by the default cpal output device
    pub fn with_default_device(settings: ToneSettings) -> Self {
        Self::new(
            settings,
            Box::new(|| {
                AudioEngine::open_default().map(|engine| Box::new(engine) as Box<dyn ToneOutput>)
            }),
        )
    }

    /// Play the tone for `phase`, stopping any tone already sounding
    pub fn play(&mut self, phase: Phase, duration: Duration) {
        if !self.enabled || !self.ensure_output() {
            return;
        }
        self.stop();

        let tone = ToneSpec::for_phase(phase, duration, &self.settings);
        if let OutputSlot::Ready(output) = &mut self.slot {
            output.play(&tone);
            self.active = Some(phase);
            tracing::debug!(phase = ?phase, duration_ms = duration.as_millis() as u64, "Tone started");
        }
    }

    /// Silence the active tone; safe to call repeatedly
    pub fn stop(&mut self) {
        if self.active.take().is_none() {
            return;
        }
        if let OutputSlot::Ready(output) = &mut self.slot {
            output.silence();
        }
    }

    /// Turn sound on or off
    ///
    /// Disabling silences the active tone. Enabling opens the output device
    /// if it has not been opened yet.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.ensure_output();
        } else {
            self.stop();
        }
        tracing::info!(enabled, "Sound toggled");
    }

    /// Open the output device if needed; false when sound is unavailable
    pub fn ensure_output(&mut self) -> bool {
        match self.slot {
            OutputSlot::Ready(_) => true,
            OutputSlot::Unavailable => false,
            OutputSlot::Unopened => match (self.factory)() {
                Ok(output) => {
                    self.slot = OutputSlot::Ready(output);
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Audio output unavailable, sound disabled for this session");
                    self.slot = OutputSlot::Unavailable;
                    false
                }
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// False once opening the output has failed
    pub fn is_available(&self) -> bool {
        !matches!(self.slot, OutputSlot::Unavailable)
    }

    /// Phase of the tone currently sounding
    pub fn active_tone(&self) -> Option<Phase> {
        self.active
    }

    pub fn settings(&self) -> &ToneSettings {
        &self.settings
    }
}
