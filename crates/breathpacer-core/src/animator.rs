//! Scale animation for the breathing circle
//!
//! The animator is the single source of truth for the circle's scale. It
//! interpolates from a start scale to the phase's target scale along the
//! phase's easing curve, and is advanced by [`ScaleAnimator::tick`] from the
//! event loop.
//!
//! Continuity rule: the value returned by [`ScaleAnimator::current_value`]
//! is always the value actually rendered at the last sample point, including
//! the instant of a pause. Starting the next animation from it therefore
//! never produces a visual jump.

use crate::clock::Token;
use crate::easing::Easing;
use crate::pattern::Phase;
use std::time::{Duration, Instant};

/// Outcome of advancing the animator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationEvent {
    /// Nothing in flight, or paused
    Idle,
    /// Scale moved to the given value
    Progress(f32),
    /// Run finished; `at` is the exact instant it reached 100%
    Completed { token: Token, at: Instant, scale: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Run {
    /// `None` for runs that report no completion (the reset glide)
    token: Option<Token>,
    duration: Duration,
    easing: Easing,
    /// Shifted forward by every pause so `now - started_at` is active time
    started_at: Instant,
    paused_at: Option<Instant>,
}

impl Run {
    fn elapsed(&self, now: Instant) -> Duration {
        let until = self.paused_at.unwrap_or(now);
        until
            .saturating_duration_since(self.started_at)
            .min(self.duration)
    }

    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        self.elapsed(now).as_secs_f32() / self.duration.as_secs_f32()
    }
}

/// Drives the circle scale from phase to phase
#[derive(Debug, Clone)]
pub struct ScaleAnimator {
    current_scale: f32,
    start_scale: f32,
    target_scale: f32,
    phase: Option<Phase>,
    run: Option<Run>,
    /// Progress of the run at the last sample, kept for `progress()`
    last_progress: f32,
}

impl ScaleAnimator {
    /// Create an animator resting at [`crate::REST_SCALE`]
    pub fn new() -> Self {
        Self {
            current_scale: crate::REST_SCALE,
            start_scale: crate::REST_SCALE,
            target_scale: crate::REST_SCALE,
            phase: None,
            run: None,
            last_progress: 0.0,
        }
    }

    /// Begin animating toward `phase`'s target scale
    ///
    /// # Arguments
    /// * `phase` - Phase whose style supplies target scale and easing
    /// * `duration` - Time to reach the target
    /// * `start_scale` - Starting value; defaults to the current value
    /// * `token` - Stamped on the eventual [`AnimationEvent::Completed`]
    /// * `now` - Start instant
    pub fn animate_to(
        &mut self,
        phase: Phase,
        duration: Duration,
        start_scale: Option<f32>,
        token: Token,
        now: Instant,
    ) {
        let style = phase.style();
        self.start_scale = start_scale.unwrap_or(self.current_scale);
        self.current_scale = self.start_scale;
        self.target_scale = style.target_scale;
        self.phase = Some(phase);
        self.last_progress = 0.0;
        self.run = Some(Run {
            token: Some(token),
            duration,
            easing: style.easing,
            started_at: now,
            paused_at: None,
        });
    }

    /// Show `phase` while keeping the scale where it is
    pub fn hold(&mut self, phase: Phase) {
        self.run = None;
        self.phase = Some(phase);
        self.start_scale = self.current_scale;
        self.target_scale = self.current_scale;
    }

    /// Glide to `scale` without reporting completion
    pub fn settle(&mut self, scale: f32, duration: Duration, now: Instant) {
        self.phase = None;
        self.start_scale = self.current_scale;
        self.target_scale = scale;
        self.last_progress = 0.0;
        self.run = Some(Run {
            token: None,
            duration,
            easing: Easing::EaseOutCubic,
            started_at: now,
            paused_at: None,
        });
    }

    /// Advance to `now`
    ///
    /// Returns [`AnimationEvent::Completed`] exactly once per run, unless the
    /// run was stopped or replaced first.
    pub fn tick(&mut self, now: Instant) -> AnimationEvent {
        let Some(run) = self.run else {
            return AnimationEvent::Idle;
        };
        if run.paused_at.is_some() {
            return AnimationEvent::Idle;
        }

        if now.saturating_duration_since(run.started_at) >= run.duration {
            self.current_scale = self.target_scale;
            self.last_progress = 1.0;
            self.run = None;
            return match run.token {
                Some(token) => AnimationEvent::Completed {
                    token,
                    at: run.started_at + run.duration,
                    scale: self.current_scale,
                },
                None => AnimationEvent::Progress(self.current_scale),
            };
        }

        self.sample(&run, now);
        AnimationEvent::Progress(self.current_scale)
    }

    /// Suspend interpolation, capturing the value at `now`
    pub fn pause(&mut self, now: Instant) {
        let Some(run) = self.run else {
            return;
        };
        if run.paused_at.is_some() {
            return;
        }
        self.sample(&run, now);
        if let Some(run) = self.run.as_mut() {
            run.paused_at = Some(now);
        }
    }

    /// Continue a paused interpolation from where it stopped
    pub fn resume(&mut self, now: Instant) {
        if let Some(run) = self.run.as_mut() {
            if let Some(paused_at) = run.paused_at.take() {
                run.started_at += now.saturating_duration_since(paused_at);
            }
        }
    }

    /// Cancel the in-flight run; the scale stays where it is
    pub fn stop(&mut self) {
        self.run = None;
    }

    /// Instantaneous scale as last rendered
    pub fn current_value(&self) -> f32 {
        self.current_scale
    }

    /// Fraction of the current run elapsed (0 when nothing is running)
    pub fn progress(&self) -> f32 {
        if self.run.is_some() {
            self.last_progress
        } else {
            0.0
        }
    }

    /// Time left in the current run at `now`
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.run
            .map(|run| run.duration.saturating_sub(run.elapsed(now)))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_animating(&self) -> bool {
        self.run.is_some_and(|run| run.paused_at.is_none())
    }

    pub fn is_paused(&self) -> bool {
        self.run.is_some_and(|run| run.paused_at.is_some())
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn start_scale(&self) -> f32 {
        self.start_scale
    }

    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    fn sample(&mut self, run: &Run, now: Instant) {
        let progress = run.progress(now);
        let eased = run.easing.apply(progress);
        let value = self.start_scale + (self.target_scale - self.start_scale) * eased;
        if value.is_finite() {
            self.current_scale = value;
            self.last_progress = progress;
        } else {
            tracing::debug!(
                progress,
                last = self.current_scale,
                "Discarding non-finite scale sample"
            );
        }
    }
}

impl Default for ScaleAnimator {
    fn default() -> Self {
        Self::new()
    }
}
