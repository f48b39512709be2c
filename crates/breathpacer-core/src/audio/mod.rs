//! Audio module
//!
//! This module contains all audio-related functionality:
//! - Phase tone shapes and sample rendering ([`tone`])
//! - Lazy, failure-tolerant tone playback ([`synth`])
//! - cpal output device management ([`engine`])

pub mod engine;
pub mod synth;
pub mod tone;

/// Sample rate assumed before an output device reports its own
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;
