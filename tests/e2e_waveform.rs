//! E2E tests for the waveform recorder
//!
//! Records long runs at the fixed cadence and checks the trailing buffer
//! stays bounded, ordered and within the amplitude band.

use approx::assert_relative_eq;
use breathpacer::waveform::{WaveformRecorder, WaveformSettings};
use breathpacer::Phase;
use std::time::{Duration, Instant};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Test that the buffer never grows past its bound and keeps x in range
#[test]
fn test_buffer_is_bounded() {
    let settings = WaveformSettings::default();
    let mut recorder = WaveformRecorder::new(&settings);
    let t0 = Instant::now();

    let phases = [Phase::Inhale, Phase::Hold, Phase::Exhale, Phase::HoldAfterExhale];
    for (i, phase) in phases.iter().cycle().take(12).enumerate() {
        let start = t0 + ms(i as u64 * 2_000);
        recorder.start_phase(*phase, ms(2_000), None, start);
        let mut now = start;
        while now < start + ms(2_000) {
            now += ms(16);
            recorder.tick(now);
            assert!(recorder.len() <= settings.max_points);
        }
    }

    let points = recorder.points();
    assert_eq!(points.len(), settings.max_points);
    for (i, [x, y]) in points.iter().enumerate() {
        assert_relative_eq!(*x, i as f64);
        assert!(y.abs() <= 1.0 + 1e-6, "y {} outside amplitude", y);
    }
}

/// Test that a full inhale then exhale spans the amplitude band
#[test]
fn test_breath_reaches_both_peaks() {
    let mut recorder = WaveformRecorder::new(&WaveformSettings {
        max_points: 1_000,
        sample_interval_ms: 10,
        amplitude: 2.0,
    });
    let t0 = Instant::now();

    recorder.start_phase(Phase::Inhale, ms(1_000), None, t0);
    recorder.tick(t0 + ms(1_000));
    assert_relative_eq!(recorder.current_y(), 2.0, epsilon = 1e-5);

    recorder.start_phase(Phase::Exhale, ms(1_000), None, t0 + ms(1_000));
    recorder.tick(t0 + ms(2_000));
    assert_relative_eq!(recorder.current_y(), -2.0, epsilon = 1e-5);
}

/// Test that paused time adds no samples
#[test]
fn test_pause_adds_no_samples() {
    let mut recorder = WaveformRecorder::default();
    let t0 = Instant::now();
    recorder.start_phase(Phase::Inhale, ms(4_000), None, t0);
    recorder.tick(t0 + ms(160));

    recorder.pause(t0 + ms(160));
    let frozen = recorder.len();
    assert_eq!(recorder.tick(t0 + ms(5_000)), 0);
    assert_eq!(recorder.len(), frozen);

    recorder.resume(t0 + ms(5_000));
    assert_eq!(recorder.tick(t0 + ms(5_016)), 1);
}
