use std::fmt;

use hyb_core::errors::ErrorInfo;
use hyb_core::{HybError, RngHandle};
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

/// The seven move types of the update kernel, in diagnostic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    /// Toggle an orbital without segments between empty and full.
    ZeroState,
    /// Add an occupied interval.
    InsertSegment,
    /// Delete an occupied interval.
    RemoveSegment,
    /// Add an empty interval inside an occupied region.
    InsertAntiSegment,
    /// Close an empty interval.
    RemoveAntiSegment,
    /// Exchange the segment sets of two orbitals.
    SwapSegment,
    /// Exchange every orbital pair `(2k, 2k + 1)`.
    GlobalFlip,
}

impl UpdateKind {
    /// Every move type, indexed by [`UpdateKind::index`].
    pub const ALL: [UpdateKind; 7] = [
        UpdateKind::ZeroState,
        UpdateKind::InsertSegment,
        UpdateKind::RemoveSegment,
        UpdateKind::InsertAntiSegment,
        UpdateKind::RemoveAntiSegment,
        UpdateKind::SwapSegment,
        UpdateKind::GlobalFlip,
    ];

    /// Position of the move in counters and tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label used in acceptance tables.
    pub fn label(self) -> &'static str {
        match self {
            UpdateKind::ZeroState => "change zero state",
            UpdateKind::InsertSegment => "insert segment",
            UpdateKind::RemoveSegment => "remove segment",
            UpdateKind::InsertAntiSegment => "insert anti-segment",
            UpdateKind::RemoveAntiSegment => "remove anti-segment",
            UpdateKind::SwapSegment => "swap segment",
            UpdateKind::GlobalFlip => "global flip",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Relative selection weights of the move families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveWeights {
    /// Zero-order state changes.
    #[serde(default = "default_zero_state")]
    pub zero_state: f64,
    /// Segment insertion and removal, split evenly.
    #[serde(default = "default_segment")]
    pub segment: f64,
    /// Anti-segment insertion and removal, split evenly.
    #[serde(default = "default_segment")]
    pub anti_segment: f64,
    /// Orbital swaps (requires `SPINFLIP`).
    #[serde(default = "default_flip")]
    pub swap: f64,
    /// Global pair flips (requires `GLOBALFLIP`).
    #[serde(default = "default_flip")]
    pub global_flip: f64,
}

fn default_zero_state() -> f64 {
    0.1
}

fn default_segment() -> f64 {
    0.35
}

fn default_flip() -> f64 {
    0.1
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            zero_state: default_zero_state(),
            segment: default_segment(),
            anti_segment: default_segment(),
            swap: default_flip(),
            global_flip: default_flip(),
        }
    }
}

impl MoveWeights {
    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("zero_state", self.zero_state),
            ("segment", self.segment),
            ("anti_segment", self.anti_segment),
            ("swap", self.swap),
            ("global_flip", self.global_flip),
        ]
    }
}

/// Discrete distribution over [`UpdateKind`].
#[derive(Debug, Clone)]
pub struct MoveSchedule {
    weights: [f64; 7],
    distribution: WeightedIndex<f64>,
}

impl MoveSchedule {
    /// Builds the schedule. Swap and global flip get weight zero unless enabled.
    pub fn new(weights: &MoveWeights, spin_flip: bool, global_flip: bool) -> Result<Self, HybError> {
        for (name, value) in weights.entries() {
            if !value.is_finite() || value < 0.0 {
                return Err(HybError::Config(
                    ErrorInfo::new("move-weight-invalid", "move weights must be finite and non-negative")
                        .with_context("weight", name)
                        .with_context("value", value.to_string()),
                ));
            }
        }
        let weights = [
            weights.zero_state,
            weights.segment / 2.0,
            weights.segment / 2.0,
            weights.anti_segment / 2.0,
            weights.anti_segment / 2.0,
            if spin_flip { weights.swap } else { 0.0 },
            if global_flip { weights.global_flip } else { 0.0 },
        ];
        let distribution = WeightedIndex::new(weights).map_err(|err| {
            HybError::Config(
                ErrorInfo::new("no-enabled-moves", "no enabled move has a positive weight")
                    .with_context("reason", err.to_string())
                    .with_hint("check MOVE_WEIGHTS, SPINFLIP and GLOBALFLIP"),
            )
        })?;
        Ok(Self {
            weights,
            distribution,
        })
    }

    /// Selection probability of a move type.
    pub fn probability(&self, kind: UpdateKind) -> f64 {
        let total: f64 = self.weights.iter().sum();
        self.weights[kind.index()] / total
    }

    /// Returns true when the move type can be drawn.
    pub fn is_enabled(&self, kind: UpdateKind) -> bool {
        self.weights[kind.index()] > 0.0
    }

    /// Draws a move type.
    pub fn sample(&self, rng: &mut RngHandle) -> UpdateKind {
        UpdateKind::ALL[self.distribution.sample(rng.inner_mut())]
    }
}
