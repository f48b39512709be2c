//! Phase tone shapes and sample rendering
//!
//! Every phase tone is a sine with a trapezoidal gain envelope:
//! silence → volume → volume → silence keyed at
//! `[0, fade, duration - fade, duration]`. Holds use a steady pitch,
//! inhale and exhale sweep linearly between two pitches.

use crate::pattern::Phase;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::time::Duration;

fn default_inhale_start_hz() -> f32 {
    200.0
}

fn default_inhale_end_hz() -> f32 {
    400.0
}

fn default_exhale_start_hz() -> f32 {
    400.0
}

fn default_exhale_end_hz() -> f32 {
    200.0
}

fn default_hold_hz() -> f32 {
    200.0
}

fn default_hold_volume() -> f32 {
    0.12
}

fn default_sweep_volume() -> f32 {
    0.15
}

fn default_fade_ms() -> u64 {
    100
}

/// Tunable pitches, volumes and fade window for phase tones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSettings {
    #[serde(default = "default_inhale_start_hz")]
    pub inhale_start_hz: f32,
    #[serde(default = "default_inhale_end_hz")]
    pub inhale_end_hz: f32,
    #[serde(default = "default_exhale_start_hz")]
    pub exhale_start_hz: f32,
    #[serde(default = "default_exhale_end_hz")]
    pub exhale_end_hz: f32,
    #[serde(default = "default_hold_hz")]
    pub hold_hz: f32,
    /// Linear gain of hold tones (0.0 to 1.0)
    #[serde(default = "default_hold_volume")]
    pub hold_volume: f32,
    /// Linear gain of sweep tones (0.0 to 1.0)
    #[serde(default = "default_sweep_volume")]
    pub sweep_volume: f32,
    /// Fade-in and fade-out length in milliseconds
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            inhale_start_hz: default_inhale_start_hz(),
            inhale_end_hz: default_inhale_end_hz(),
            exhale_start_hz: default_exhale_start_hz(),
            exhale_end_hz: default_exhale_end_hz(),
            hold_hz: default_hold_hz(),
            hold_volume: default_hold_volume(),
            sweep_volume: default_sweep_volume(),
            fade_ms: default_fade_ms(),
        }
    }
}

/// Pitch contour of a tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneShape {
    Steady { frequency: f32 },
    Sweep { from: f32, to: f32 },
}

/// A fully specified tone, ready to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub shape: ToneShape,
    pub volume: f32,
    pub duration: Duration,
    pub fade: Duration,
}

impl ToneSpec {
    /// Tone for `phase` lasting `duration`
    ///
    /// # Example
    /// ```
    /// use breathpacer_core::audio::tone::{ToneSettings, ToneShape, ToneSpec};
    /// use breathpacer_core::Phase;
    /// use std::time::Duration;
    ///
    /// let spec = ToneSpec::for_phase(Phase::Inhale, Duration::from_secs(4), &ToneSettings::default());
    /// assert_eq!(spec.shape, ToneShape::Sweep { from: 200.0, to: 400.0 });
    /// ```
    pub fn for_phase(phase: Phase, duration: Duration, settings: &ToneSettings) -> Self {
        let (shape, volume) = match phase {
            Phase::Inhale => (
                ToneShape::Sweep {
                    from: settings.inhale_start_hz,
                    to: settings.inhale_end_hz,
                },
                settings.sweep_volume,
            ),
            Phase::Exhale => (
                ToneShape::Sweep {
                    from: settings.exhale_start_hz,
                    to: settings.exhale_end_hz,
                },
                settings.sweep_volume,
            ),
            Phase::Hold | Phase::HoldAfterExhale => (
                ToneShape::Steady {
                    frequency: settings.hold_hz,
                },
                settings.hold_volume,
            ),
        };

        Self {
            shape,
            volume: volume.clamp(0.0, 1.0),
            duration,
            fade: Duration::from_millis(settings.fade_ms),
        }
    }

    /// Fade length actually used, at most half the tone
    pub fn fade_window(&self) -> Duration {
        self.fade.min(self.duration / 2)
    }

    /// Envelope gain `t` seconds into the tone
    pub fn gain_at(&self, t: f32) -> f32 {
        let total = self.duration.as_secs_f32();
        if t <= 0.0 || t >= total {
            return 0.0;
        }
        let fade = self.fade_window().as_secs_f32();
        if fade <= 0.0 {
            return self.volume;
        }
        if t < fade {
            self.volume * t / fade
        } else if t > total - fade {
            self.volume * (total - t) / fade
        } else {
            self.volume
        }
    }

    /// Instantaneous pitch `t` seconds into the tone
    pub fn frequency_at(&self, t: f32) -> f32 {
        match self.shape {
            ToneShape::Steady { frequency } => frequency,
            ToneShape::Sweep { from, to } => {
                let total = self.duration.as_secs_f32();
                if total <= 0.0 {
                    return to;
                }
                let progress = (t / total).clamp(0.0, 1.0);
                from + (to - from) * progress
            }
        }
    }
}

/// Sample-by-sample renderer for one [`ToneSpec`]
///
/// Owned by the audio callback; never shared.
#[derive(Debug, Clone)]
pub struct ToneVoice {
    spec: ToneSpec,
    sample_rate: u32,
    position: u64,
    total_samples: u64,
    /// Oscillator phase in radians (0..TAU)
    phase: f32,
}

impl ToneVoice {
    pub fn new(spec: ToneSpec, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let total_samples = (spec.duration.as_secs_f64() * sample_rate as f64).round() as u64;
        Self {
            spec,
            sample_rate,
            position: 0,
            total_samples,
            phase: 0.0,
        }
    }

    /// Next sample; silence once the tone has ended
    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let t = self.position as f32 / self.sample_rate as f32;
        let sample = self.phase.sin() * self.spec.gain_at(t);

        self.phase += TAU * self.spec.frequency_at(t) / self.sample_rate as f32;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        self.position += 1;
        sample
    }

    /// Fill a mono buffer with sequential samples
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn spec(&self) -> &ToneSpec {
        &self.spec
    }
}
