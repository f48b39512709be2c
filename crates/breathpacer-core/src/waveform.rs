//! Live breathing waveform
//!
//! Records a trailing window of `{x, y}` samples that rise during inhale,
//! fall during exhale and run flat through holds. Sampling runs on its own
//! fixed cadence, independent of the scale animator, so the plot advances
//! at a constant horizontal speed regardless of frame rate.

use crate::easing::Easing;
use crate::pattern::Phase;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

fn default_max_points() -> usize {
    200
}

fn default_sample_interval_ms() -> u64 {
    16
}

fn default_amplitude() -> f32 {
    1.0
}

/// Window size, cadence and vertical range of the waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSettings {
    /// Samples kept in the trailing window
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    /// Interval between samples in milliseconds
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Distance from the baseline reached at the end of inhale/exhale
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
}

impl Default for WaveformSettings {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            sample_interval_ms: default_sample_interval_ms(),
            amplitude: default_amplitude(),
        }
    }
}

/// A single recorded sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavePoint {
    pub x: f64,
    pub y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    phase: Phase,
    start_y: f32,
    target_y: f32,
    duration: Duration,
    /// Shifted forward by every pause so progress excludes paused time
    started_at: Instant,
    paused_at: Option<Instant>,
}

impl Segment {
    fn y_at(&self, at: Instant) -> f32 {
        if self.phase.is_hold() {
            return self.start_y;
        }
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            at.saturating_duration_since(self.started_at).as_secs_f32()
                / self.duration.as_secs_f32()
        };
        let eased = Easing::EaseInOutCubic.apply(progress);
        self.start_y + (self.target_y - self.start_y) * eased
    }
}

/// Bounded trailing buffer of waveform samples
#[derive(Debug, Clone)]
pub struct WaveformRecorder {
    points: VecDeque<WavePoint>,
    max_points: usize,
    sample_interval: Duration,
    baseline: f32,
    amplitude: f32,
    segment: Option<Segment>,
    /// Instant of the next sample while recording
    next_sample_at: Option<Instant>,
}

impl WaveformRecorder {
    /// Create a recorder holding a single baseline sample
    pub fn new(settings: &WaveformSettings) -> Self {
        let max_points = settings.max_points.max(2);
        let mut recorder = Self {
            points: VecDeque::with_capacity(max_points + 1),
            max_points,
            sample_interval: Duration::from_millis(settings.sample_interval_ms.max(1)),
            baseline: 0.0,
            amplitude: settings.amplitude,
            segment: None,
            next_sample_at: None,
        };
        recorder.reset();
        recorder
    }

    /// Set the interpolation target for `phase`
    ///
    /// # Arguments
    /// * `phase` - Inhale rises, exhale falls, holds stay flat
    /// * `duration` - Time to reach the target
    /// * `start_y` - Starting height; defaults to the last recorded sample
    /// * `now` - Phase start instant
    pub fn start_phase(
        &mut self,
        phase: Phase,
        duration: Duration,
        start_y: Option<f32>,
        now: Instant,
    ) {
        let start_y = start_y.unwrap_or_else(|| self.current_y());
        let target_y = match phase {
            Phase::Inhale => self.baseline + self.amplitude,
            Phase::Exhale => self.baseline - self.amplitude,
            Phase::Hold | Phase::HoldAfterExhale => start_y,
        };

        self.segment = Some(Segment {
            phase,
            start_y,
            target_y,
            duration,
            started_at: now,
            paused_at: None,
        });
        if self.next_sample_at.is_none() {
            self.next_sample_at = Some(now);
        }
    }

    /// Append every sample due by `now`; returns how many were added
    pub fn tick(&mut self, now: Instant) -> usize {
        let Some(segment) = self.segment else {
            return 0;
        };
        if segment.paused_at.is_some() {
            return 0;
        }
        let Some(mut next) = self.next_sample_at else {
            return 0;
        };
        if now < next {
            return 0;
        }

        // A long stall only needs the last window's worth of samples
        let behind = now.saturating_duration_since(next);
        let due = (behind.as_nanos() / self.sample_interval.as_nanos()) as usize + 1;
        if due > self.max_points {
            next += self.sample_interval * (due - self.max_points) as u32;
        }

        let mut added = 0;
        while next <= now {
            self.push(segment.y_at(next));
            next += self.sample_interval;
            added += 1;
        }
        self.next_sample_at = Some(next);
        added
    }

    /// Halt sampling, keeping history
    pub fn pause(&mut self, now: Instant) {
        self.tick(now);
        if let Some(segment) = self.segment.as_mut() {
            if segment.paused_at.is_none() {
                segment.paused_at = Some(now);
            }
        }
    }

    /// Continue sampling where `pause` left off
    pub fn resume(&mut self, now: Instant) {
        let Some(segment) = self.segment.as_mut() else {
            return;
        };
        let Some(paused_at) = segment.paused_at.take() else {
            return;
        };
        let gap = now.saturating_duration_since(paused_at);
        segment.started_at += gap;
        if let Some(next) = self.next_sample_at.as_mut() {
            *next += gap;
        }
    }

    /// Halt sampling and clear the rendered samples
    pub fn stop(&mut self) {
        self.segment = None;
        self.next_sample_at = None;
        self.points.clear();
    }

    /// Clear history and re-center on the baseline
    pub fn reset(&mut self) {
        self.stop();
        self.points.push_back(WavePoint {
            x: 0.0,
            y: self.baseline,
        });
    }

    /// Samples as `[x, y]` pairs for plotting
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.x, p.y as f64]).collect()
    }

    /// Height of the last sample, or the baseline when empty
    pub fn current_y(&self) -> f32 {
        self.points.back().map(|p| p.y).unwrap_or(self.baseline)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Phase currently being traced
    pub fn phase(&self) -> Option<Phase> {
        self.segment.map(|s| s.phase)
    }

    pub fn is_paused(&self) -> bool {
        self.segment.is_some_and(|s| s.paused_at.is_some())
    }

    fn push(&mut self, y: f32) {
        let x = self.points.back().map(|p| p.x + 1.0).unwrap_or(0.0);
        self.points.push_back(WavePoint { x, y });

        if self.points.len() > self.max_points {
            self.points.pop_front();
            for point in self.points.iter_mut() {
                point.x -= 1.0;
            }
        }
    }
}

impl Default for WaveformRecorder {
    fn default() -> Self {
        Self::new(&WaveformSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn small(max_points: usize) -> WaveformRecorder {
        WaveformRecorder::new(&WaveformSettings {
            max_points,
            sample_interval_ms: 10,
            amplitude: 1.0,
        })
    }

    #[test]
    fn test_starts_centered() {
        let recorder = WaveformRecorder::default();
        assert_eq!(recorder.points(), vec![[0.0, 0.0]]);
        assert_relative_eq!(recorder.current_y(), 0.0);
        assert_eq!(recorder.phase(), None);
    }

    #[test]
    fn test_inhale_rises_exhale_falls() {
        let t0 = Instant::now();
        let mut recorder = small(500);
        recorder.start_phase(Phase::Inhale, ms(1000), None, t0);
        recorder.tick(t0 + ms(1000));
        assert_relative_eq!(recorder.current_y(), 1.0);

        recorder.start_phase(Phase::Exhale, ms(1000), None, t0 + ms(1000));
        recorder.tick(t0 + ms(1500));
        // Ease-in-out midpoint sits halfway between +1 and -1
        assert_relative_eq!(recorder.current_y(), 0.0, epsilon = 1e-5);
        recorder.tick(t0 + ms(2000));
        assert_relative_eq!(recorder.current_y(), -1.0);
    }

    #[test]
    fn test_hold_stays_flat() {
        let t0 = Instant::now();
        let mut recorder = small(500);
        recorder.start_phase(Phase::Hold, ms(1000), Some(0.4), t0);
        recorder.tick(t0 + ms(990));
        let points = recorder.points();
        assert!(points[1..].iter().all(|p| (p[1] - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_samples_on_fixed_cadence() {
        let t0 = Instant::now();
        let mut recorder = small(500);
        recorder.start_phase(Phase::Inhale, ms(4000), None, t0);

        assert_eq!(recorder.tick(t0), 1);
        assert_eq!(recorder.tick(t0 + ms(5)), 0);
        assert_eq!(recorder.tick(t0 + ms(35)), 3);
        assert_eq!(recorder.len(), 5);
    }

    #[test]
    fn test_window_is_bounded_and_rebased() {
        let t0 = Instant::now();
        let mut recorder = small(50);
        recorder.start_phase(Phase::Inhale, ms(4000), None, t0);
        for step in 0..400 {
            recorder.tick(t0 + ms(step * 7));
            assert!(recorder.len() <= 50);
        }

        let points = recorder.points();
        assert_eq!(points.len(), 50);
        assert_relative_eq!(points[0][0], 0.0);
        assert_relative_eq!(points[49][0], 49.0);
    }

    #[test]
    fn test_long_stall_keeps_one_window() {
        let t0 = Instant::now();
        let mut recorder = small(20);
        recorder.start_phase(Phase::Inhale, ms(4000), None, t0);
        let added = recorder.tick(t0 + ms(60_000));
        assert_eq!(added, 20);
        assert_eq!(recorder.len(), 20);
    }

    #[test]
    fn test_pause_excludes_paused_time() {
        let t0 = Instant::now();
        let mut recorder = small(1000);
        recorder.start_phase(Phase::Inhale, ms(1000), None, t0);
        recorder.pause(t0 + ms(500));
        let at_pause = recorder.current_y();
        let len = recorder.len();

        assert_eq!(recorder.tick(t0 + ms(3000)), 0);
        assert_eq!(recorder.len(), len);
        assert!(recorder.is_paused());

        recorder.resume(t0 + ms(5000));
        recorder.tick(t0 + ms(5000));
        assert!((recorder.current_y() - at_pause).abs() < 0.05);
        recorder.tick(t0 + ms(5500));
        assert_relative_eq!(recorder.current_y(), 1.0);
    }

    #[test]
    fn test_stop_clears_and_reset_recenters() {
        let t0 = Instant::now();
        let mut recorder = small(100);
        recorder.start_phase(Phase::Exhale, ms(1000), None, t0);
        recorder.tick(t0 + ms(500));

        recorder.stop();
        assert!(recorder.is_empty());
        assert_eq!(recorder.tick(t0 + ms(900)), 0);
        assert_relative_eq!(recorder.current_y(), 0.0);

        recorder.reset();
        assert_eq!(recorder.points(), vec![[0.0, 0.0]]);
    }
}
