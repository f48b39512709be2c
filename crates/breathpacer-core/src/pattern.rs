//! Breathing patterns and their compiled cycles
//!
//! A [`Pattern`] is the user-facing 4-tuple of phase durations in seconds.
//! [`Pattern::compile`] turns it into a [`Cycle`]: the ordered, looping list
//! of phases actually played, with zero-length slots dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One segment of a breath
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Inhale,
    Hold,
    Exhale,
    HoldAfterExhale,
}

impl Phase {
    /// All phases in pattern slot order
    pub const ALL: [Phase; 4] = [
        Phase::Inhale,
        Phase::Hold,
        Phase::Exhale,
        Phase::HoldAfterExhale,
    ];

    /// Whether the scale stays constant during this phase
    pub fn is_hold(self) -> bool {
        matches!(self, Phase::Hold | Phase::HoldAfterExhale)
    }
}

/// Errors produced while parsing custom pattern text
///
/// Each variant is a distinct reason shown inline next to the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Enter a pattern such as 4-7-8")]
    Empty,

    #[error("Durations cannot be negative")]
    Negative,

    #[error("Expected 2 to 4 durations, got {count}")]
    WrongCount { count: usize },

    #[error("Duration {position} is not a whole number: {token:?}")]
    NotANumber { position: usize, token: String },

    #[error("At least one duration must be greater than zero")]
    AllZero,
}

/// Phase durations in seconds: `[inhale, hold, exhale, hold_after_exhale]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern([u32; 4]);

impl Pattern {
    /// Create a pattern from its four slots
    pub const fn new(slots: [u32; 4]) -> Self {
        Self(slots)
    }

    /// Raw slots in phase order
    pub fn slots(&self) -> [u32; 4] {
        self.0
    }

    /// Duration of a single phase slot in seconds
    pub fn seconds(&self, phase: Phase) -> u32 {
        let idx = Phase::ALL
            .iter()
            .position(|&p| p == phase)
            .unwrap_or_default();
        self.0[idx]
    }

    /// True iff at least one slot is non-zero
    ///
    /// Four non-negative slots are guaranteed by the type itself.
    pub fn validate(&self) -> bool {
        self.0.iter().any(|&s| s > 0)
    }

    /// Compile into the ordered cycle of non-zero phases
    pub fn compile(&self) -> Cycle {
        let entries = Phase::ALL
            .iter()
            .zip(self.0)
            .filter(|(_, secs)| *secs > 0)
            .map(|(&phase, secs)| CycleEntry {
                phase,
                duration: Duration::from_secs(u64::from(secs)),
            })
            .collect();
        Cycle { entries }
    }

    /// Hyphenated form, e.g. `4-7-8-0`
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Parse user text of 2 to 4 hyphen-separated whole seconds
    ///
    /// Missing trailing slots are padded with zero, so `"4-4-4"` becomes
    /// `[4, 4, 4, 0]`.
    ///
    /// # Example
    /// ```
    /// use breathpacer_core::pattern::{FormatError, Pattern};
    ///
    /// assert_eq!(Pattern::parse_custom("4-7-8"), Ok(Pattern::new([4, 7, 8, 0])));
    /// assert!(matches!(
    ///     Pattern::parse_custom("abc-1"),
    ///     Err(FormatError::NotANumber { .. })
    /// ));
    /// ```
    pub fn parse_custom(text: &str) -> Result<Self, FormatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FormatError::Empty);
        }
        // A minus sign can only show up as a leading or doubled separator
        if text.starts_with('-') || text.contains("--") {
            return Err(FormatError::Negative);
        }

        let tokens: Vec<&str> = text.split('-').map(str::trim).collect();
        if !(2..=4).contains(&tokens.len()) {
            return Err(FormatError::WrongCount {
                count: tokens.len(),
            });
        }

        let mut slots = [0u32; 4];
        for (i, token) in tokens.iter().enumerate() {
            let valid_digits = !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit());
            slots[i] = valid_digits
                .then(|| token.parse::<u32>().ok())
                .flatten()
                .ok_or_else(|| FormatError::NotANumber {
                    position: i + 1,
                    token: token.to_string(),
                })?;
        }

        let pattern = Self(slots);
        if !pattern.validate() {
            return Err(FormatError::AllZero);
        }
        Ok(pattern)
    }
}

impl TryFrom<&[u32]> for Pattern {
    type Error = FormatError;

    fn try_from(slots: &[u32]) -> Result<Self, Self::Error> {
        let slots: [u32; 4] = slots
            .try_into()
            .map_err(|_| FormatError::WrongCount { count: slots.len() })?;
        Ok(Self(slots))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A single compiled step of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleEntry {
    pub phase: Phase,
    pub duration: Duration,
}

/// Ordered, looping sequence of non-empty phases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cycle {
    entries: Vec<CycleEntry>,
}

impl Cycle {
    /// Number of phases per loop
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, wrapping past the end
    pub fn get(&self, index: usize) -> Option<&CycleEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.get(index % self.entries.len())
    }

    /// Index following `index`, wrapping to 0 after the last entry
    pub fn next_index(&self, index: usize) -> usize {
        if self.entries.is_empty() {
            0
        } else {
            (index + 1) % self.entries.len()
        }
    }

    pub fn entries(&self) -> &[CycleEntry] {
        &self.entries
    }

    /// Total length of one loop
    pub fn period(&self) -> Duration {
        self.entries.iter().map(|e| e.duration).sum()
    }
}
