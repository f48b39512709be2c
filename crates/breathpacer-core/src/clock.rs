//! Phase time bookkeeping and one-shot hold timers
//!
//! [`PhaseClock`] answers "how much of this phase is left?" at any instant,
//! across any number of pause/resume boundaries. [`HoldTimer`] is the
//! deferred completion used for hold phases, where nothing animates.

use std::time::{Duration, Instant};

/// Liveness stamp carried by every deferred completion
///
/// The orchestrator issues a fresh token whenever the phase it is waiting on
/// changes (begin, pause, stop). A completion whose token no longer matches
/// is stale and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Token(u64);

impl Token {
    /// Next token in sequence
    pub fn next(self) -> Self {
        Token(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClockState {
    Idle,
    Running { started_at: Instant, budget: Duration },
    Paused { remaining: Duration },
}

/// Elapsed/remaining time of the in-progress phase
#[derive(Debug, Clone)]
pub struct PhaseClock {
    total: Duration,
    state: ClockState,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self {
            total: Duration::ZERO,
            state: ClockState::Idle,
        }
    }

    /// Start timing a phase of length `total` with `effective` time left
    ///
    /// `effective` is the full duration for a fresh phase, or the frozen
    /// remainder when resuming.
    pub fn begin(&mut self, total: Duration, effective: Duration, now: Instant) {
        self.total = total;
        self.state = ClockState::Running {
            started_at: now,
            budget: effective.min(total),
        };
    }

    /// Time left in the phase at `now`
    pub fn remaining_at(&self, now: Instant) -> Duration {
        match self.state {
            ClockState::Idle => Duration::ZERO,
            ClockState::Running { started_at, budget } => {
                budget.saturating_sub(now.saturating_duration_since(started_at))
            }
            ClockState::Paused { remaining } => remaining,
        }
    }

    /// Time spent in the phase at `now`, including time before any pause
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.total.saturating_sub(self.remaining_at(now))
    }

    /// Freeze at `remaining`, the time left read from the paused subsystem
    pub fn freeze(&mut self, remaining: Duration) {
        self.state = ClockState::Paused {
            remaining: remaining.min(self.total),
        };
    }

    /// Continue from the frozen remainder as a fresh sub-phase
    pub fn resume(&mut self, now: Instant) {
        if let ClockState::Paused { remaining } = self.state {
            self.state = ClockState::Running {
                started_at: now,
                budget: remaining,
            };
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, ClockState::Paused { .. })
    }
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot deadline for a hold phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTimer {
    token: Token,
    fires_at: Instant,
}

impl HoldTimer {
    pub fn new(token: Token, duration: Duration, now: Instant) -> Self {
        Self {
            token,
            fires_at: now + duration,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Exact firing instant once `now` has reached it
    pub fn poll(&self, now: Instant) -> Option<Instant> {
        (now >= self.fires_at).then_some(self.fires_at)
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.fires_at.saturating_duration_since(now)
    }
}
