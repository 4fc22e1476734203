//! Segment geometry on the imaginary-time circle `[0, beta)`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, HybError};

/// Occupied (or, for anti-segments, empty) interval of one orbital.
///
/// A segment with `t_end < t_start` wraps through `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Time of the creation operator.
    pub t_start: f64,
    /// Time of the annihilation operator.
    pub t_end: f64,
}

impl Segment {
    /// Creates a segment from its endpoints.
    pub fn new(t_start: f64, t_end: f64) -> Self {
        Self { t_start, t_end }
    }

    /// Returns true when the segment wraps through `beta`.
    pub fn wraps(&self) -> bool {
        self.t_end < self.t_start
    }

    /// Length of the segment on a circle of circumference `beta`.
    pub fn length(&self, beta: f64) -> f64 {
        circular_distance(self.t_start, self.t_end, beta)
    }

    /// Returns true if `t` lies in `[t_start, t_end)` on the circle.
    pub fn contains(&self, t: f64) -> bool {
        if self.wraps() {
            t >= self.t_start || t < self.t_end
        } else {
            t >= self.t_start && t < self.t_end
        }
    }

    /// Splits the segment into at most two non-wrapping intervals.
    pub fn pieces(&self, beta: f64) -> [(f64, f64); 2] {
        if self.wraps() {
            [(self.t_start, beta), (0.0, self.t_end)]
        } else {
            [(self.t_start, self.t_end), (0.0, 0.0)]
        }
    }

    /// Length of the intersection with another segment.
    pub fn overlap(&self, other: &Segment, beta: f64) -> f64 {
        let mut total = 0.0;
        for (a_lo, a_hi) in self.pieces(beta) {
            for (b_lo, b_hi) in other.pieces(beta) {
                let lo = a_lo.max(b_lo);
                let hi = a_hi.min(b_hi);
                if hi > lo {
                    total += hi - lo;
                }
            }
        }
        total
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {} , {} ) ", self.t_start, self.t_end)
    }
}

/// Forward distance from `from` to `to` on a circle of circumference `beta`.
pub fn circular_distance(from: f64, to: f64, beta: f64) -> f64 {
    let delta = to - from;
    if delta < 0.0 {
        delta + beta
    } else {
        delta
    }
}

/// Wraps a time into `[0, beta)`.
pub fn wrap_time(t: f64, beta: f64) -> f64 {
    let wrapped = t.rem_euclid(beta);
    if wrapped >= beta {
        0.0
    } else {
        wrapped
    }
}

/// Time-ordered, non-overlapping segment set of a single orbital.
///
/// Segments are kept sorted by `t_start`; a wrapping segment is therefore
/// always the last one. With no segments the orbital is either empty or fully
/// occupied (`full_line`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalSegments {
    beta: f64,
    segments: Vec<Segment>,
    full_line: bool,
}

impl OrbitalSegments {
    /// Creates an empty orbital on `[0, beta)`.
    pub fn new(beta: f64) -> Self {
        Self {
            beta,
            segments: Vec::new(),
            full_line: false,
        }
    }

    /// Inverse temperature bounding the time domain.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Segments in `t_start` order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments (the expansion order of the orbital).
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true when the orbital carries no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true when the orbital has no segments and is fully occupied.
    pub fn is_full_line(&self) -> bool {
        self.full_line
    }

    /// Returns true when the last segment wraps through `beta`.
    pub fn wraps(&self) -> bool {
        self.segments.last().map(Segment::wraps).unwrap_or(false)
    }

    /// Total occupied time.
    pub fn total_length(&self) -> f64 {
        if self.full_line {
            return self.beta;
        }
        self.segments.iter().map(|s| s.length(self.beta)).sum()
    }

    /// Index of the segment containing `t`, if any.
    pub fn containing(&self, t: f64) -> Option<usize> {
        self.segments.iter().position(|s| s.contains(t))
    }

    /// Returns true if the orbital is occupied at time `t`.
    pub fn is_occupied(&self, t: f64) -> bool {
        self.full_line || self.containing(t).is_some()
    }

    /// Forward distance from `t` to the closest segment start, in `(0, beta]`.
    pub fn distance_to_next_start(&self, t: f64) -> Option<f64> {
        self.segments
            .iter()
            .map(|s| {
                let d = circular_distance(t, s.t_start, self.beta);
                if d == 0.0 {
                    self.beta
                } else {
                    d
                }
            })
            .min_by(f64::total_cmp)
    }

    /// Empty interval between segment `index` and its successor.
    pub fn gap_after(&self, index: usize) -> Option<Segment> {
        let current = self.segments.get(index)?;
        let next = self.segments[(index + 1) % self.segments.len()];
        Some(Segment::new(current.t_end, next.t_start))
    }

    /// Occupied time of this orbital inside `interval`.
    pub fn overlap_with(&self, interval: &Segment) -> f64 {
        if self.full_line {
            return interval.length(self.beta);
        }
        self.segments
            .iter()
            .map(|s| s.overlap(interval, self.beta))
            .sum()
    }

    /// Time during which both orbitals are occupied.
    pub fn overlap(&self, other: &OrbitalSegments) -> f64 {
        if self.full_line {
            return other.total_length();
        }
        self.segments.iter().map(|s| other.overlap_with(s)).sum()
    }

    /// Flips an orbital without segments between empty and full.
    pub fn toggle_zero_state(&mut self) -> Result<(), HybError> {
        if !self.segments.is_empty() {
            return Err(HybError::Segment(ErrorInfo::new(
                "zero-state-occupied",
                "zero-order state can only change when no segments are present",
            )
            .with_context("segments", self.segments.len().to_string())));
        }
        self.full_line = !self.full_line;
        Ok(())
    }

    /// Inserts an occupied interval starting in an empty region.
    pub fn insert_segment(&mut self, segment: Segment) -> Result<(), HybError> {
        if self.full_line || self.is_occupied(segment.t_start) {
            return Err(HybError::Segment(ErrorInfo::new(
                "segment-start-occupied",
                "segment must start in an empty region",
            )
            .with_context("t_start", segment.t_start.to_string())));
        }
        let room = self.distance_to_next_start(segment.t_start).unwrap_or(self.beta);
        let length = segment.length(self.beta);
        if length <= 0.0 || length >= room {
            return Err(HybError::Segment(
                ErrorInfo::new("segment-overlap", "segment does not fit the gap")
                    .with_context("length", length.to_string())
                    .with_context("room", room.to_string()),
            ));
        }
        self.segments.push(segment);
        self.sort();
        Ok(())
    }

    /// Removes a segment identified by its exact endpoints.
    pub fn remove_segment(&mut self, segment: Segment) -> Result<(), HybError> {
        let index = self
            .segments
            .iter()
            .position(|s| *s == segment)
            .ok_or_else(|| {
                HybError::Segment(
                    ErrorInfo::new("segment-missing", "no segment with these endpoints")
                        .with_context("segment", segment.to_string()),
                )
            })?;
        self.segments.remove(index);
        Ok(())
    }

    /// Cuts an empty interval out of an occupied region.
    pub fn insert_anti_segment(&mut self, anti: Segment) -> Result<(), HybError> {
        let length = anti.length(self.beta);
        if self.full_line {
            if length <= 0.0 || length >= self.beta {
                return Err(HybError::Segment(
                    ErrorInfo::new("anti-segment-length", "invalid anti-segment length")
                        .with_context("length", length.to_string()),
                ));
            }
            self.full_line = false;
            self.segments.push(Segment::new(anti.t_end, anti.t_start));
            return Ok(());
        }
        let index = self.containing(anti.t_start).ok_or_else(|| {
            HybError::Segment(
                ErrorInfo::new(
                    "anti-segment-start-empty",
                    "anti-segment must start inside a segment",
                )
                .with_context("t_start", anti.t_start.to_string()),
            )
        })?;
        let host = self.segments[index];
        let room = circular_distance(anti.t_start, host.t_end, self.beta);
        if anti.t_start == host.t_start || length <= 0.0 || length >= room {
            return Err(HybError::Segment(ErrorInfo::new(
                "anti-segment-overlap",
                "anti-segment must lie strictly inside its segment",
            )
            .with_context("length", length.to_string())
            .with_context("room", room.to_string())));
        }
        self.segments[index] = Segment::new(host.t_start, anti.t_start);
        self.segments.push(Segment::new(anti.t_end, host.t_end));
        self.sort();
        Ok(())
    }

    /// Closes the empty interval between two consecutive segments.
    pub fn remove_anti_segment(&mut self, anti: Segment) -> Result<(), HybError> {
        let count = self.segments.len();
        let before = self
            .segments
            .iter()
            .position(|s| s.t_end == anti.t_start)
            .ok_or_else(|| {
                HybError::Segment(
                    ErrorInfo::new(
                        "anti-segment-missing",
                        "no segment ends where the gap starts",
                    )
                    .with_context("anti", anti.to_string()),
                )
            })?;
        let after = (before + 1) % count;
        if self.segments[after].t_start != anti.t_end {
            return Err(HybError::Segment(
                ErrorInfo::new("anti-segment-missing", "gap does not end at the next segment")
                    .with_context("anti", anti.to_string()),
            ));
        }
        if count == 1 {
            self.segments.clear();
            self.full_line = true;
            return Ok(());
        }
        let merged = Segment::new(self.segments[before].t_start, self.segments[after].t_end);
        let (low, high) = if before < after {
            (before, after)
        } else {
            (after, before)
        };
        self.segments.remove(high);
        self.segments.remove(low);
        self.segments.push(merged);
        self.sort();
        Ok(())
    }

    fn sort(&mut self) {
        self.segments
            .sort_by(|a, b| a.t_start.partial_cmp(&b.t_start).unwrap_or(Ordering::Equal));
    }
}

impl fmt::Display for OrbitalSegments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.full_line {
            return write!(f, "full line");
        }
        if self.segments.is_empty() {
            return write!(f, "empty");
        }
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Mutation committed to both halves of a configuration pair.
///
/// Segment-valued variants identify their target by exact endpoints, so every
/// update has an exact [`inverse`](SegmentUpdate::inverse).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SegmentUpdate {
    /// Toggle the zero-order state of an orbital without segments.
    ToggleZeroState {
        /// Target orbital.
        orbital: usize,
    },
    /// Add an occupied interval.
    InsertSegment {
        /// Target orbital.
        orbital: usize,
        /// Interval to insert.
        segment: Segment,
    },
    /// Delete an occupied interval.
    RemoveSegment {
        /// Target orbital.
        orbital: usize,
        /// Interval to delete.
        segment: Segment,
    },
    /// Add an empty interval inside an occupied region.
    InsertAntiSegment {
        /// Target orbital.
        orbital: usize,
        /// Empty interval to cut out.
        segment: Segment,
    },
    /// Close an empty interval between two segments.
    RemoveAntiSegment {
        /// Target orbital.
        orbital: usize,
        /// Empty interval to close.
        segment: Segment,
    },
    /// Exchange the segment sets of two orbitals.
    SwapOrbitals {
        /// First orbital.
        first: usize,
        /// Second orbital.
        second: usize,
    },
    /// Exchange every orbital pair `(2k, 2k + 1)`.
    GlobalFlip,
}

impl SegmentUpdate {
    /// Returns the update that undoes `self`.
    pub fn inverse(&self) -> SegmentUpdate {
        match *self {
            SegmentUpdate::InsertSegment { orbital, segment } => {
                SegmentUpdate::RemoveSegment { orbital, segment }
            }
            SegmentUpdate::RemoveSegment { orbital, segment } => {
                SegmentUpdate::InsertSegment { orbital, segment }
            }
            SegmentUpdate::InsertAntiSegment { orbital, segment } => {
                SegmentUpdate::RemoveAntiSegment { orbital, segment }
            }
            SegmentUpdate::RemoveAntiSegment { orbital, segment } => {
                SegmentUpdate::InsertAntiSegment { orbital, segment }
            }
            other => other,
        }
    }

    /// Orbitals whose segment sets change under this update.
    pub fn touched_orbitals(&self, n_orbitals: usize) -> Vec<usize> {
        match *self {
            SegmentUpdate::SwapOrbitals { first, second } => vec![first, second],
            SegmentUpdate::GlobalFlip => (0..n_orbitals - n_orbitals % 2).collect(),
            _ => self.orbital().into_iter().collect(),
        }
    }

    /// Orbital targeted by a single-orbital update.
    pub fn orbital(&self) -> Option<usize> {
        match *self {
            SegmentUpdate::ToggleZeroState { orbital }
            | SegmentUpdate::InsertSegment { orbital, .. }
            | SegmentUpdate::RemoveSegment { orbital, .. }
            | SegmentUpdate::InsertAntiSegment { orbital, .. }
            | SegmentUpdate::RemoveAntiSegment { orbital, .. } => Some(orbital),
            SegmentUpdate::SwapOrbitals { .. } | SegmentUpdate::GlobalFlip => None,
        }
    }

    /// Applies the update to a full orbital set. Fails without mutating on mismatch.
    pub fn apply_to(&self, orbitals: &mut [OrbitalSegments]) -> Result<(), HybError> {
        let n_orbitals = orbitals.len();
        match *self {
            SegmentUpdate::SwapOrbitals { first, second } => {
                let first = check_orbital(first, n_orbitals)?;
                let second = check_orbital(second, n_orbitals)?;
                check_distinct(first, second)?;
                orbitals.swap(first, second);
                Ok(())
            }
            SegmentUpdate::GlobalFlip => {
                for pair in orbitals.chunks_exact_mut(2) {
                    pair.swap(0, 1);
                }
                Ok(())
            }
            _ => {
                let index = self.orbital().unwrap_or(n_orbitals);
                let target = check_orbital(index, n_orbitals)?;
                self.apply_to_orbital(&mut orbitals[target])
            }
        }
    }

    /// Returns the new segment sets of every touched orbital without mutating `orbitals`.
    ///
    /// Weight models use this to evaluate a ratio against the configuration
    /// the update would produce.
    pub fn preview(
        &self,
        orbitals: &[OrbitalSegments],
    ) -> Result<Vec<(usize, OrbitalSegments)>, HybError> {
        let n_orbitals = orbitals.len();
        match *self {
            SegmentUpdate::SwapOrbitals { first, second } => {
                let first = check_orbital(first, n_orbitals)?;
                let second = check_orbital(second, n_orbitals)?;
                check_distinct(first, second)?;
                Ok(vec![
                    (first, orbitals[second].clone()),
                    (second, orbitals[first].clone()),
                ])
            }
            SegmentUpdate::GlobalFlip => Ok(self
                .touched_orbitals(n_orbitals)
                .into_iter()
                .map(|index| (index, orbitals[index ^ 1].clone()))
                .collect()),
            _ => {
                let index = self.orbital().unwrap_or(n_orbitals);
                let target = check_orbital(index, n_orbitals)?;
                let mut changed = orbitals[target].clone();
                self.apply_to_orbital(&mut changed)?;
                Ok(vec![(target, changed)])
            }
        }
    }

    fn apply_to_orbital(&self, target: &mut OrbitalSegments) -> Result<(), HybError> {
        match *self {
            SegmentUpdate::ToggleZeroState { .. } => target.toggle_zero_state(),
            SegmentUpdate::InsertSegment { segment, .. } => target.insert_segment(segment),
            SegmentUpdate::RemoveSegment { segment, .. } => target.remove_segment(segment),
            SegmentUpdate::InsertAntiSegment { segment, .. } => {
                target.insert_anti_segment(segment)
            }
            SegmentUpdate::RemoveAntiSegment { segment, .. } => {
                target.remove_anti_segment(segment)
            }
            SegmentUpdate::SwapOrbitals { .. } | SegmentUpdate::GlobalFlip => Ok(()),
        }
    }
}

fn check_orbital(orbital: usize, n_orbitals: usize) -> Result<usize, HybError> {
    if orbital < n_orbitals {
        Ok(orbital)
    } else {
        Err(HybError::Segment(
            ErrorInfo::new("orbital-out-of-range", "orbital index out of range")
                .with_context("orbital", orbital.to_string())
                .with_context("n_orbitals", n_orbitals.to_string()),
        ))
    }
}

fn check_distinct(first: usize, second: usize) -> Result<(), HybError> {
    if first == second {
        return Err(HybError::Segment(
            ErrorInfo::new("swap-same-orbital", "cannot swap an orbital with itself")
                .with_context("orbital", first.to_string()),
        ));
    }
    Ok(())
}
