//! Predefined patterns and per-phase style data
//!
//! Static lookup tables only; nothing here is mutated at runtime.

use crate::easing::Easing;
use crate::pattern::{Pattern, Phase};

/// A named, selectable breathing pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub pattern: Pattern,
    pub description: &'static str,
}

/// Patterns offered in the selector, in display order
pub const PRESETS: [Preset; 4] = [
    Preset {
        name: "Box Breathing",
        pattern: Pattern::new([4, 4, 4, 4]),
        description: "Inhale-Hold-Exhale-Hold (4-4-4-4)",
    },
    Preset {
        name: "4-7-8 Breathing",
        pattern: Pattern::new([4, 7, 8, 0]),
        description: "Inhale-Hold-Exhale (4-7-8)",
    },
    Preset {
        name: "Equal Breathing",
        pattern: Pattern::new([4, 0, 4, 0]),
        description: "Inhale-Exhale (4-4)",
    },
    Preset {
        name: "Deep Breathing",
        pattern: Pattern::new([6, 2, 6, 2]),
        description: "Inhale-Hold-Exhale-Hold (6-2-6-2)",
    },
];

/// Look up a preset by selector index
pub fn preset(index: usize) -> Option<&'static Preset> {
    PRESETS.get(index)
}

/// Visual style of a phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStyle {
    /// Scale the circle reaches by the end of the phase
    pub target_scale: f32,
    pub easing: Easing,
    /// RGBA, alpha in 0..=255
    pub color: [u8; 4],
    pub label: &'static str,
}

/// Style used while idle
pub const REST_STYLE: PhaseStyle = PhaseStyle {
    target_scale: crate::REST_SCALE,
    easing: Easing::EaseInOutCubic,
    color: [255, 255, 255, 77],
    label: "Ready",
};

impl Phase {
    pub fn style(self) -> PhaseStyle {
        match self {
            Phase::Inhale => PhaseStyle {
                target_scale: 1.6,
                easing: Easing::EaseOutCubic,
                color: [76, 175, 80, 153],
                label: "Inhale",
            },
            Phase::Exhale => PhaseStyle {
                target_scale: 0.75,
                easing: Easing::EaseInCubic,
                color: [33, 150, 243, 153],
                label: "Exhale",
            },
            Phase::Hold | Phase::HoldAfterExhale => PhaseStyle {
                target_scale: 1.3,
                easing: Easing::Linear,
                color: [255, 152, 0, 153],
                label: "Hold",
            },
        }
    }

    pub fn label(self) -> &'static str {
        self.style().label
    }
}
