//! Phase-cycle state machine
//!
//! [`CycleOrchestrator`] sequences the compiled phases of the selected
//! pattern and dispatches each phase to the scale animator, the tone
//! synthesizer and the waveform recorder, then to the [`Presenter`].
//!
//! Everything runs on the caller's event loop: the loop calls
//! [`CycleOrchestrator::tick`] with the current instant and the orchestrator
//! consumes whichever completions are due. Each completion carries the
//! [`Token`] of the phase it was started for; anything stamped with an older
//! token is dropped.

use crate::animator::{AnimationEvent, ScaleAnimator};
use crate::audio::synth::ToneSynthesizer;
use crate::catalog::{self, PhaseStyle, REST_STYLE};
use crate::clock::{HoldTimer, PhaseClock, Token};
use crate::pattern::{Cycle, FormatError, Pattern, Phase};
use crate::waveform::{WaveformRecorder, WaveformSettings};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound on phase advances handled by one tick
const MAX_CATCH_UP: usize = 64;

/// Errors raised by run control and pattern selection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("Please enter a valid pattern")]
    InvalidPattern,

    #[error("No predefined pattern at index {0}")]
    UnknownPattern(usize),
}

/// Receiver of display updates
///
/// Calls are fire-and-forget and are made after the animator, synthesizer
/// and recorder have been updated for the same transition.
pub trait Presenter {
    /// A phase began: `total` is its full length, `start_from` the time left
    fn show_phase(&mut self, phase: Phase, total: Duration, start_from: Duration);
    /// Whole seconds left in the phase, rounded up
    fn show_countdown(&mut self, seconds: u64);
    fn show_running(&mut self);
    fn show_paused(&mut self);
    fn show_idle(&mut self);
    fn show_error(&mut self, error: &CycleError);
}

/// The phase a run is positioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePhase {
    /// Index into the compiled cycle
    pub index: usize,
    /// Time left; authoritative only while paused
    pub remaining: Duration,
}

/// Run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running(ActivePhase),
    Paused(ActivePhase),
}

impl RunState {
    /// True while running or paused
    pub fn is_running(&self) -> bool {
        !matches!(self, RunState::Idle)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, RunState::Paused(_))
    }

    pub fn active(&self) -> Option<ActivePhase> {
        match *self {
            RunState::Idle => None,
            RunState::Running(active) | RunState::Paused(active) => Some(active),
        }
    }
}

/// Flat, read-only view of the run at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub is_running: bool,
    pub is_paused: bool,
    pub current_cycle_index: usize,
    pub phase: Option<Phase>,
    #[serde(with = "duration_secs")]
    pub remaining_time: Duration,
    /// Time spent in the phase, summed across pauses
    #[serde(with = "duration_secs")]
    pub elapsed_time: Duration,
    pub current_scale: f32,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

/// Counters for the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub pattern: Pattern,
    pub phases_completed: u64,
    pub cycles_completed: u64,
}

impl SessionStats {
    fn new(pattern: Pattern) -> Self {
        Self {
            started_at: Utc::now(),
            pattern,
            phases_completed: 0,
            cycles_completed: 0,
        }
    }

    /// Wall-clock time since the run started
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Sequences breathing phases and keeps every subsystem in step
pub struct CycleOrchestrator<P: Presenter> {
    presenter: P,
    animator: ScaleAnimator,
    synth: ToneSynthesizer,
    waveform: WaveformRecorder,
    clock: PhaseClock,
    pattern: Pattern,
    cycle: Cycle,
    state: RunState,
    /// Liveness stamp of the completion currently awaited
    token: Token,
    hold: Option<HoldTimer>,
    last_countdown: Option<u64>,
    session: Option<SessionStats>,
}

impl<P: Presenter> CycleOrchestrator<P> {
    /// Create an idle orchestrator with the first preset selected
    pub fn new(presenter: P, synth: ToneSynthesizer, waveform: &WaveformSettings) -> Self {
        let mut orchestrator = Self {
            presenter,
            animator: ScaleAnimator::new(),
            synth,
            waveform: WaveformRecorder::new(waveform),
            clock: PhaseClock::new(),
            pattern: catalog::PRESETS[0].pattern,
            cycle: Cycle::default(),
            state: RunState::Idle,
            token: Token::default(),
            hold: None,
            last_countdown: None,
            session: None,
        };
        orchestrator.presenter.show_idle();
        orchestrator
    }

    /// Start cycling through the selected pattern
    ///
    /// No-op while running or paused. An empty or invalid pattern is
    /// reported to the presenter and returned; the state stays idle.
    pub fn start(&mut self, now: Instant) -> Result<(), CycleError> {
        if self.state.is_running() {
            return Ok(());
        }

        let cycle = self.pattern.compile();
        if cycle.is_empty() || !self.pattern.validate() {
            let err = CycleError::InvalidPattern;
            tracing::warn!(pattern = %self.pattern, "Refusing to start: {}", err);
            self.presenter.show_error(&err);
            return Err(err);
        }

        let first = cycle.entries()[0];
        self.cycle = cycle;
        self.animator.stop();
        self.waveform.reset();
        self.session = Some(SessionStats::new(self.pattern));
        self.state = RunState::Running(ActivePhase {
            index: 0,
            remaining: first.duration,
        });

        tracing::info!(
            pattern = %self.pattern,
            phases = self.cycle.len(),
            "Session started"
        );
        self.presenter.show_running();
        self.begin_phase(now, None);
        Ok(())
    }

    /// Freeze the active phase
    ///
    /// Completions already due by `now` are delivered first, so a pause that
    /// lands after a phase boundary freezes the next phase.
    pub fn pause(&mut self, now: Instant) {
        if !matches!(self.state, RunState::Running(_)) {
            return;
        }
        self.tick(now);
        let RunState::Running(active) = self.state else {
            return;
        };

        let remaining = match self.hold.take() {
            Some(timer) => timer.remaining_at(now),
            None => {
                self.animator.pause(now);
                self.animator.remaining_at(now)
            }
        };
        self.token = self.token.next();
        self.clock.freeze(remaining);
        self.synth.stop();
        self.waveform.pause(now);

        self.state = RunState::Paused(ActivePhase {
            index: active.index,
            remaining,
        });
        tracing::info!(
            index = active.index,
            remaining_ms = remaining.as_millis() as u64,
            "Session paused"
        );
        self.presenter.show_paused();
    }

    /// Continue the paused phase with its frozen remaining time
    pub fn resume(&mut self, now: Instant) {
        let RunState::Paused(active) = self.state else {
            return;
        };
        self.state = RunState::Running(active);
        self.waveform.resume(now);

        tracing::info!(
            index = active.index,
            remaining_ms = active.remaining.as_millis() as u64,
            "Session resumed"
        );
        self.presenter.show_running();
        self.begin_phase(now, Some(active.remaining));
    }

    /// End the run and glide the circle back to rest
    ///
    /// Returns the counters of the run that was stopped. No-op when idle.
    pub fn stop(&mut self, now: Instant) -> Option<SessionStats> {
        if !self.state.is_running() {
            return None;
        }

        self.token = self.token.next();
        self.hold = None;
        self.animator.stop();
        self.synth.stop();
        self.waveform.reset();
        self.clock.reset();
        self.state = RunState::Idle;
        self.last_countdown = None;
        self.animator.settle(
            crate::REST_SCALE,
            Duration::from_millis(crate::RESET_GLIDE_MS),
            now,
        );

        let session = self.session.take();
        if let Some(stats) = &session {
            tracing::info!(
                phases = stats.phases_completed,
                cycles = stats.cycles_completed,
                "Session stopped"
            );
        }
        self.presenter.show_idle();
        session
    }

    /// Deliver every completion due by `now` and advance the samplers
    pub fn tick(&mut self, now: Instant) {
        let mut advanced = 0;
        while let Some(at) = self.due_completion(now) {
            self.advance(at);
            advanced += 1;
            if advanced >= MAX_CATCH_UP {
                tracing::warn!(advanced, "Tick fell behind, deferring remaining phases");
                break;
            }
        }
        self.waveform.tick(now);
        self.push_countdown(now);
    }

    /// Select a predefined pattern; takes effect on the next start
    pub fn select_pattern(&mut self, index: usize) -> Result<Pattern, CycleError> {
        let preset = catalog::preset(index).ok_or(CycleError::UnknownPattern(index))?;
        tracing::info!(preset = preset.name, "Preset selected");
        self.set_pattern(preset.pattern);
        Ok(preset.pattern)
    }

    /// Parse and select a custom pattern
    ///
    /// On error the selected pattern is unchanged.
    pub fn submit_custom_pattern(&mut self, text: &str) -> Result<Pattern, FormatError> {
        let pattern = Pattern::parse_custom(text)?;
        self.set_pattern(pattern);
        Ok(pattern)
    }

    /// Replace the selected pattern; an active run keeps its cycle
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    /// Enable or disable phase tones
    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.synth.set_enabled(enabled);
    }

    pub fn snapshot(&self, now: Instant) -> RunSnapshot {
        match self.state {
            RunState::Idle => RunSnapshot {
                is_running: false,
                is_paused: false,
                current_cycle_index: 0,
                phase: None,
                remaining_time: Duration::ZERO,
                elapsed_time: Duration::ZERO,
                current_scale: crate::REST_SCALE,
            },
            RunState::Running(active) => RunSnapshot {
                is_running: true,
                is_paused: false,
                current_cycle_index: active.index,
                phase: self.phase_at(active.index),
                remaining_time: self.clock.remaining_at(now),
                elapsed_time: self.clock.elapsed_at(now),
                current_scale: self.animator.current_value(),
            },
            RunState::Paused(active) => RunSnapshot {
                is_running: true,
                is_paused: true,
                current_cycle_index: active.index,
                phase: self.phase_at(active.index),
                remaining_time: active.remaining,
                elapsed_time: self.clock.elapsed_at(now),
                current_scale: self.animator.current_value(),
            },
        }
    }

    /// Scale to render right now, including the post-stop glide
    pub fn current_scale(&self) -> f32 {
        self.animator.current_value()
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.state.active().and_then(|a| self.phase_at(a.index))
    }

    /// Style of the active phase, or the rest style when idle
    pub fn current_style(&self) -> PhaseStyle {
        self.current_phase()
            .map(Phase::style)
            .unwrap_or(REST_STYLE)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Cycle of the current (or last) run
    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    pub fn waveform(&self) -> &WaveformRecorder {
        &self.waveform
    }

    pub fn animator(&self) -> &ScaleAnimator {
        &self.animator
    }

    pub fn synth(&self) -> &ToneSynthesizer {
        &self.synth
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Counters of the active run
    pub fn session(&self) -> Option<&SessionStats> {
        self.session.as_ref()
    }

    fn phase_at(&self, index: usize) -> Option<Phase> {
        self.cycle.get(index).map(|e| e.phase)
    }

    /// Start the phase at the current index
    ///
    /// `resume_remaining` is the frozen time left when continuing a paused
    /// phase; otherwise the phase runs for its full duration.
    fn begin_phase(&mut self, now: Instant, resume_remaining: Option<Duration>) {
        let RunState::Running(active) = self.state else {
            return;
        };
        let Some(entry) = self.cycle.get(active.index).copied() else {
            return;
        };
        let effective = resume_remaining.unwrap_or(entry.duration);

        self.token = self.token.next();
        match resume_remaining {
            Some(_) if self.clock.is_paused() => self.clock.resume(now),
            _ => self.clock.begin(entry.duration, effective, now),
        }
        let start_scale = self.animator.current_value();

        if entry.phase.is_hold() {
            self.animator.hold(entry.phase);
            self.hold = Some(HoldTimer::new(self.token, effective, now));
        } else {
            self.hold = None;
            self.animator
                .animate_to(entry.phase, effective, Some(start_scale), self.token, now);
        }
        self.synth.play(entry.phase, effective);
        self.waveform.start_phase(entry.phase, effective, None, now);

        tracing::debug!(
            phase = ?entry.phase,
            index = active.index,
            remaining_ms = effective.as_millis() as u64,
            start_scale,
            "Phase started"
        );
        self.presenter.show_phase(entry.phase, entry.duration, effective);
        self.last_countdown = None;
        self.push_countdown(now);
    }

    /// Exact instant of the next live completion due by `now`
    fn due_completion(&mut self, now: Instant) -> Option<Instant> {
        let live = matches!(self.state, RunState::Running(_));

        if let AnimationEvent::Completed { token, at, .. } = self.animator.tick(now) {
            if live && token == self.token {
                return Some(at);
            }
            tracing::debug!(?token, "Dropping stale animation completion");
        }

        if let Some(timer) = self.hold {
            if let Some(at) = timer.poll(now) {
                self.hold = None;
                if live && timer.token() == self.token {
                    return Some(at);
                }
                tracing::debug!(token = ?timer.token(), "Dropping stale hold completion");
            }
        }
        None
    }

    /// Move to the next phase, starting it at the completion instant `at`
    fn advance(&mut self, at: Instant) {
        let RunState::Running(active) = self.state else {
            return;
        };
        // Let the recorder reach the end of the finished phase
        self.waveform.tick(at);

        let next = self.cycle.next_index(active.index);
        if let Some(stats) = self.session.as_mut() {
            stats.phases_completed += 1;
            if next == 0 {
                stats.cycles_completed += 1;
            }
        }
        self.state = RunState::Running(ActivePhase {
            index: next,
            remaining: Duration::ZERO,
        });
        self.begin_phase(at, None);
    }

    fn push_countdown(&mut self, now: Instant) {
        let remaining = match self.state {
            RunState::Idle => return,
            RunState::Running(_) => self.clock.remaining_at(now),
            RunState::Paused(active) => active.remaining,
        };
        let seconds = remaining.as_nanos().div_ceil(1_000_000_000) as u64;
        if self.last_countdown != Some(seconds) {
            self.last_countdown = Some(seconds);
            self.presenter.show_countdown(seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::tests::{recording_synth, OutputCall};
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Phase(Phase, Duration, Duration),
        Countdown(u64),
        Running,
        Paused,
        Idle,
        Error(CycleError),
    }

    #[derive(Default)]
    struct RecordingPresenter {
        calls: Vec<Call>,
    }

    impl RecordingPresenter {
        fn phases(&self) -> Vec<Phase> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Phase(p, _, _) => Some(*p),
                    _ => None,
                })
                .collect()
        }
    }

    impl Presenter for RecordingPresenter {
        fn show_phase(&mut self, phase: Phase, total: Duration, start_from: Duration) {
            self.calls.push(Call::Phase(phase, total, start_from));
        }
        fn show_countdown(&mut self, seconds: u64) {
            self.calls.push(Call::Countdown(seconds));
        }
        fn show_running(&mut self) {
            self.calls.push(Call::Running);
        }
        fn show_paused(&mut self) {
            self.calls.push(Call::Paused);
        }
        fn show_idle(&mut self) {
            self.calls.push(Call::Idle);
        }
        fn show_error(&mut self, error: &CycleError) {
            self.calls.push(Call::Error(error.clone()));
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    fn orchestrator(pattern: [u32; 4]) -> CycleOrchestrator<RecordingPresenter> {
        let (synth, _, _) = recording_synth();
        let mut orch = CycleOrchestrator::new(
            RecordingPresenter::default(),
            synth,
            &WaveformSettings::default(),
        );
        orch.set_pattern(Pattern::new(pattern));
        orch
    }

    #[test]
    fn test_new_is_idle() {
        let orch = orchestrator([4, 4, 4, 4]);
        let snap = orch.snapshot(Instant::now());
        assert!(!snap.is_running);
        assert_eq!(snap.remaining_time, Duration::ZERO);
        assert_relative_eq!(snap.current_scale, 1.0);
        assert_eq!(orch.presenter().calls, vec![Call::Idle]);
    }

    #[test]
    fn test_snapshot_serializes_seconds() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 0, 4, 0]);
        orch.start(t0).unwrap();
        let json = serde_json::to_value(orch.snapshot(t0 + ms(1500))).unwrap();
        assert_eq!(json["is_running"], true);
        assert_eq!(json["phase"], "inhale");
        assert_eq!(json["remaining_time"], 2.5);
    }

    #[test]
    fn test_start_rejects_all_zero_pattern() {
        let mut orch = orchestrator([0, 0, 0, 0]);
        assert_eq!(orch.start(Instant::now()), Err(CycleError::InvalidPattern));
        assert_eq!(orch.state(), RunState::Idle);
        assert_eq!(
            orch.presenter().calls.last(),
            Some(&Call::Error(CycleError::InvalidPattern))
        );
    }

    #[test]
    fn test_start_begins_first_phase() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 7, 8, 0]);
        orch.start(t0).unwrap();

        let calls = &orch.presenter().calls;
        assert_eq!(
            &calls[1..],
            &[
                Call::Running,
                Call::Phase(Phase::Inhale, secs(4), secs(4)),
                Call::Countdown(4),
            ]
        );
        assert_eq!(orch.current_phase(), Some(Phase::Inhale));
        assert_eq!(orch.synth().active_tone(), Some(Phase::Inhale));
        assert_eq!(orch.waveform().phase(), Some(Phase::Inhale));
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 4, 4, 4]);
        orch.start(t0).unwrap();
        let before = orch.presenter().calls.len();
        orch.start(t0 + ms(500)).unwrap();
        assert_eq!(orch.presenter().calls.len(), before);
    }

    #[test]
    fn test_box_pattern_loops_back_to_inhale() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 4, 4, 4]);
        orch.start(t0).unwrap();

        for step in 1..=4 {
            orch.tick(t0 + secs(4 * step) + ms(10));
        }
        assert_eq!(
            orch.presenter().phases(),
            vec![
                Phase::Inhale,
                Phase::Hold,
                Phase::Exhale,
                Phase::HoldAfterExhale,
                Phase::Inhale
            ]
        );
        let snap = orch.snapshot(t0 + secs(16) + ms(10));
        assert_eq!(snap.current_cycle_index, 0);
        assert_eq!(orch.session().map(|s| s.cycles_completed), Some(1));
        assert_eq!(orch.session().map(|s| s.phases_completed), Some(4));
    }

    #[test]
    fn test_late_tick_catches_up_without_drift() {
        let t0 = Instant::now();
        let mut orch = orchestrator([1, 1, 1, 1]);
        orch.start(t0).unwrap();

        orch.tick(t0 + ms(10_500));
        let snap = orch.snapshot(t0 + ms(10_500));
        assert_eq!(snap.current_cycle_index, 2);
        assert_eq!(snap.remaining_time, ms(500));
        assert_eq!(orch.session().map(|s| s.phases_completed), Some(10));
    }

    #[test]
    fn test_pause_mid_inhale_and_resume() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 4, 4, 4]);
        orch.start(t0).unwrap();
        orch.tick(t0 + ms(1000));

        orch.pause(t0 + ms(1500));
        let snap = orch.snapshot(t0 + ms(9000));
        assert!(snap.is_paused);
        assert_eq!(snap.remaining_time, ms(2500));
        let frozen = orch.current_scale();
        assert!(frozen > 1.0 && frozen < 1.6);
        assert_eq!(orch.synth().active_tone(), None);

        orch.resume(t0 + ms(9000));
        assert_relative_eq!(orch.animator().start_scale(), frozen);
        assert_eq!(orch.animator().remaining_at(t0 + ms(9000)), ms(2500));
        assert_eq!(
            orch.presenter().calls.iter().rev().find(|c| matches!(c, Call::Phase(..))),
            Some(&Call::Phase(Phase::Inhale, secs(4), ms(2500)))
        );

        orch.tick(t0 + ms(11_500));
        assert_eq!(orch.current_phase(), Some(Phase::Hold));
    }

    #[test]
    fn test_elapsed_spans_repeated_pauses() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 4, 4, 4]);
        orch.start(t0).unwrap();

        orch.pause(t0 + ms(1000));
        orch.resume(t0 + ms(5000));
        orch.pause(t0 + ms(6000));
        let snap = orch.snapshot(t0 + ms(30_000));
        assert_eq!(snap.elapsed_time, ms(2000));
        assert_eq!(snap.remaining_time, ms(2000));

        orch.resume(t0 + ms(40_000));
        let snap = orch.snapshot(t0 + ms(41_500));
        assert_eq!(snap.elapsed_time, ms(3500));
        assert_eq!(snap.remaining_time + snap.elapsed_time, secs(4));

        orch.tick(t0 + ms(42_000));
        assert_eq!(orch.current_phase(), Some(Phase::Hold));
        assert_eq!(orch.snapshot(t0 + ms(42_000)).elapsed_time, Duration::ZERO);
    }

    #[test]
    fn test_pause_twice_is_same_as_once() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 4, 4, 4]);
        orch.start(t0).unwrap();
        orch.pause(t0 + ms(1000));
        let snap = orch.snapshot(t0 + ms(1000));
        let calls = orch.presenter().calls.len();

        orch.pause(t0 + ms(3000));
        assert_eq!(orch.snapshot(t0 + ms(3000)), snap);
        assert_eq!(orch.presenter().calls.len(), calls);
    }

    #[test]
    fn test_hold_timer_is_stale_after_pause() {
        let t0 = Instant::now();
        let mut orch = orchestrator([1, 4, 4, 4]);
        orch.start(t0).unwrap();
        orch.tick(t0 + ms(1000));
        assert_eq!(orch.current_phase(), Some(Phase::Hold));

        orch.pause(t0 + ms(2000));
        // Well past the original hold deadline
        orch.tick(t0 + ms(20_000));
        assert_eq!(orch.current_phase(), Some(Phase::Hold));
        assert_eq!(orch.snapshot(t0 + ms(20_000)).remaining_time, ms(3000));

        orch.resume(t0 + ms(20_000));
        orch.tick(t0 + ms(22_999));
        assert_eq!(orch.current_phase(), Some(Phase::Hold));
        orch.tick(t0 + ms(23_000));
        assert_eq!(orch.current_phase(), Some(Phase::Exhale));
    }

    #[test]
    fn test_pause_delivers_due_completion_first() {
        let t0 = Instant::now();
        let mut orch = orchestrator([1, 2, 1, 0]);
        orch.start(t0).unwrap();

        // No tick since start; the inhale ended at 1s
        orch.pause(t0 + ms(1500));
        assert_eq!(orch.current_phase(), Some(Phase::Hold));
        assert_eq!(orch.snapshot(t0 + ms(1500)).remaining_time, ms(1500));
    }

    #[test]
    fn test_stop_resets_and_glides_home() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 4, 4, 4]);
        orch.start(t0).unwrap();
        orch.tick(t0 + ms(4000));
        let stats = orch.stop(t0 + ms(5000));
        assert_eq!(stats.map(|s| s.phases_completed), Some(1));

        let snap = orch.snapshot(t0 + ms(5000));
        assert!(!snap.is_running);
        assert_eq!(snap.current_cycle_index, 0);
        assert_relative_eq!(snap.current_scale, 1.0);
        assert!(orch.session().is_none());
        assert_eq!(orch.waveform().len(), 1);
        assert_eq!(orch.presenter().calls.last(), Some(&Call::Idle));

        // The circle itself glides back over 500ms
        assert_relative_eq!(orch.current_scale(), 1.6);
        orch.tick(t0 + ms(5500));
        assert_relative_eq!(orch.current_scale(), 1.0);
        assert_eq!(orch.current_phase(), None);

        // Nothing left to fire
        orch.tick(t0 + ms(60_000));
        assert_eq!(orch.state(), RunState::Idle);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut orch = orchestrator([4, 4, 4, 4]);
        assert!(orch.stop(Instant::now()).is_none());
        assert_eq!(orch.presenter().calls, vec![Call::Idle]);
    }

    #[test]
    fn test_countdown_pushed_on_whole_second_change() {
        let t0 = Instant::now();
        let mut orch = orchestrator([3, 0, 3, 0]);
        orch.start(t0).unwrap();
        for step in 1..=20 {
            orch.tick(t0 + ms(step * 100));
        }
        let countdowns: Vec<u64> = orch
            .presenter()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Countdown(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(countdowns, vec![3, 2, 1]);
    }

    #[test]
    fn test_scale_carries_across_transitions() {
        let t0 = Instant::now();
        let mut orch = orchestrator([2, 1, 2, 1]);
        orch.start(t0).unwrap();

        orch.tick(t0 + ms(1990));
        let before = orch.current_scale();
        orch.tick(t0 + ms(2000));
        assert_eq!(orch.current_phase(), Some(Phase::Hold));
        assert_relative_eq!(orch.current_scale(), 1.6);
        assert!((before - 1.6).abs() < 0.01);

        orch.tick(t0 + ms(3000));
        assert_eq!(orch.current_phase(), Some(Phase::Exhale));
        assert_relative_eq!(orch.animator().start_scale(), 1.6);
    }

    #[test]
    fn test_reselecting_does_not_hot_swap() {
        let t0 = Instant::now();
        let mut orch = orchestrator([4, 4, 4, 4]);
        orch.start(t0).unwrap();
        orch.select_pattern(1).unwrap();
        assert_eq!(orch.cycle().len(), 4);
        assert_eq!(orch.pattern(), Pattern::new([4, 7, 8, 0]));

        orch.stop(t0 + ms(100));
        orch.start(t0 + ms(200)).unwrap();
        assert_eq!(orch.cycle().len(), 3);
    }

    #[test]
    fn test_pattern_inputs() {
        let mut orch = orchestrator([4, 4, 4, 4]);
        assert_eq!(orch.select_pattern(9), Err(CycleError::UnknownPattern(9)));

        assert_eq!(
            orch.submit_custom_pattern("5-5"),
            Ok(Pattern::new([5, 5, 0, 0]))
        );
        assert!(orch.submit_custom_pattern("abc-1").is_err());
        assert_eq!(orch.pattern(), Pattern::new([5, 5, 0, 0]));
    }

    #[test]
    fn test_sound_toggle_silences_tone() {
        let (synth, calls, _) = recording_synth();
        let mut orch =
            CycleOrchestrator::new(RecordingPresenter::default(), synth, &WaveformSettings::default());
        let t0 = Instant::now();
        orch.start(t0).unwrap();
        orch.set_sound_enabled(false);
        assert_eq!(calls.borrow().last(), Some(&OutputCall::Silence));
        assert!(!orch.synth().is_enabled());

        // Next phase plays nothing
        let before = calls.borrow().len();
        orch.tick(t0 + ms(4000));
        assert_eq!(calls.borrow().len(), before);
    }
}
