use hyb_core::{
    circular_distance, wrap_time, HybError, OrbitalSegments, RngHandle, Segment,
    SegmentConfiguration, SegmentLayout, SegmentUpdate,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::schedule::{MoveSchedule, UpdateKind};

/// Local trace and hybridization configurations updated in lockstep.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationPair<L, H> {
    /// Local trace half.
    pub local: L,
    /// Hybridization determinant half.
    pub hyb: H,
}

impl<L, H> ConfigurationPair<L, H>
where
    L: SegmentConfiguration + SegmentLayout,
    H: SegmentConfiguration,
{
    /// Pairs two configurations describing the same segments.
    pub fn new(local: L, hyb: H) -> Self {
        Self { local, hyb }
    }

    /// Product of both weights, recomputed from scratch.
    pub fn full_weight(&self) -> f64 {
        self.local.full_weight() * self.hyb.full_weight()
    }

    /// Combined weight ratio of `update`.
    pub fn weight_ratio(&self, update: &SegmentUpdate) -> Result<f64, HybError> {
        Ok(self.local.weight_ratio(update)? * self.hyb.weight_ratio(update)?)
    }

    /// Commits `update` to the local half, then the hybridization half.
    ///
    /// When the second commit fails the local half is restored from a
    /// snapshot, so on error both halves are unchanged.
    pub fn commit(&mut self, update: &SegmentUpdate) -> Result<(), HybError>
    where
        L: Clone,
    {
        let snapshot = self.local.clone();
        self.local.apply(update)?;
        if let Err(err) = self.hyb.apply(update) {
            self.local = snapshot;
            return Err(err);
        }
        Ok(())
    }
}

/// Running sign and weight magnitude of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainState {
    /// Fermionic sign, `+1` or `-1`.
    pub sign: f64,
    /// Weight magnitude accumulated from accepted ratios.
    pub tracked_weight: f64,
}

impl ChainState {
    /// Starts from a configuration of weight `weight`.
    pub fn from_weight(weight: f64) -> Self {
        Self {
            sign: if weight < 0.0 { -1.0 } else { 1.0 },
            tracked_weight: weight.abs(),
        }
    }
}

/// Result of one kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Move type that was drawn.
    pub kind: UpdateKind,
    /// Whether the move was committed.
    pub accepted: bool,
    /// Metropolis ratio including the proposal density; zero when no proposal was possible.
    pub ratio: f64,
}

struct Proposal {
    update: SegmentUpdate,
    density: f64,
}

/// Metropolis-Hastings kernel over the seven move types.
#[derive(Debug, Clone)]
pub struct UpdateKernel {
    schedule: MoveSchedule,
    nacc: [u64; 7],
    nprop: [u64; 7],
}

impl UpdateKernel {
    /// Creates a kernel drawing moves from `schedule`.
    pub fn new(schedule: MoveSchedule) -> Self {
        Self {
            schedule,
            nacc: [0; 7],
            nprop: [0; 7],
        }
    }

    /// Accepted moves per [`UpdateKind::index`].
    pub fn accepted(&self) -> &[u64; 7] {
        &self.nacc
    }

    /// Proposed moves per [`UpdateKind::index`].
    pub fn proposed(&self) -> &[u64; 7] {
        &self.nprop
    }

    /// Draws a move type and runs it.
    pub fn step<L, H>(
        &mut self,
        pair: &mut ConfigurationPair<L, H>,
        chain: &mut ChainState,
        rng: &mut RngHandle,
    ) -> StepOutcome
    where
        L: SegmentConfiguration + SegmentLayout + Clone,
        H: SegmentConfiguration,
    {
        let kind = self.schedule.sample(rng);
        self.step_kind(kind, pair, chain, rng)
    }

    /// Runs one move of a given type. Rejections of every cause leave `pair` unchanged.
    pub fn step_kind<L, H>(
        &mut self,
        kind: UpdateKind,
        pair: &mut ConfigurationPair<L, H>,
        chain: &mut ChainState,
        rng: &mut RngHandle,
    ) -> StepOutcome
    where
        L: SegmentConfiguration + SegmentLayout + Clone,
        H: SegmentConfiguration,
    {
        self.nprop[kind.index()] += 1;
        let rejected = |ratio| StepOutcome {
            kind,
            accepted: false,
            ratio,
        };
        let Some(proposal) = propose(kind, pair.local.orbitals(), pair.local.beta(), rng) else {
            return rejected(0.0);
        };
        let weight_ratio = match pair.weight_ratio(&proposal.update) {
            Ok(ratio) => ratio,
            Err(err) => {
                trace!(move_kind = %kind, error = %err, "proposal rejected");
                return rejected(0.0);
            }
        };
        let ratio = weight_ratio * proposal.density;
        if !ratio.is_finite() {
            trace!(move_kind = %kind, ratio, "non-finite ratio rejected");
            return rejected(0.0);
        }
        let draw = rng.uniform();
        if draw >= ratio.abs().min(1.0) {
            return rejected(ratio);
        }
        if let Err(err) = pair.commit(&proposal.update) {
            trace!(move_kind = %kind, error = %err, "commit failed, move rejected");
            return rejected(ratio);
        }
        self.nacc[kind.index()] += 1;
        if ratio < 0.0 {
            chain.sign = -chain.sign;
        }
        chain.tracked_weight *= weight_ratio.abs();
        StepOutcome {
            kind,
            accepted: true,
            ratio,
        }
    }
}

fn propose(
    kind: UpdateKind,
    orbitals: &[OrbitalSegments],
    beta: f64,
    rng: &mut RngHandle,
) -> Option<Proposal> {
    let n_orbitals = orbitals.len();
    if n_orbitals == 0 {
        return None;
    }
    match kind {
        UpdateKind::ZeroState => propose_zero_state(orbitals, rng),
        UpdateKind::InsertSegment => propose_insert_segment(orbitals, beta, rng),
        UpdateKind::RemoveSegment => propose_remove_segment(orbitals, beta, rng),
        UpdateKind::InsertAntiSegment => propose_insert_anti_segment(orbitals, beta, rng),
        UpdateKind::RemoveAntiSegment => propose_remove_anti_segment(orbitals, beta, rng),
        UpdateKind::SwapSegment => {
            if n_orbitals < 2 {
                return None;
            }
            let first = rng.index(n_orbitals);
            let mut second = rng.index(n_orbitals - 1);
            if second >= first {
                second += 1;
            }
            Some(Proposal {
                update: SegmentUpdate::SwapOrbitals { first, second },
                density: 1.0,
            })
        }
        UpdateKind::GlobalFlip => (n_orbitals >= 2).then_some(Proposal {
            update: SegmentUpdate::GlobalFlip,
            density: 1.0,
        }),
    }
}

fn propose_zero_state(orbitals: &[OrbitalSegments], rng: &mut RngHandle) -> Option<Proposal> {
    let orbital = rng.index(orbitals.len());
    if !orbitals[orbital].is_empty() {
        return None;
    }
    Some(Proposal {
        update: SegmentUpdate::ToggleZeroState { orbital },
        density: 1.0,
    })
}

// Draws a length in (0, l_max); the closed end would touch the next operator.
fn draw_length(l_max: f64, rng: &mut RngHandle) -> Option<f64> {
    let length = rng.uniform_open_below(l_max);
    (length > 0.0 && length < l_max).then_some(length)
}

fn propose_insert_segment(
    orbitals: &[OrbitalSegments],
    beta: f64,
    rng: &mut RngHandle,
) -> Option<Proposal> {
    let orbital = rng.index(orbitals.len());
    let target = &orbitals[orbital];
    let t_start = rng.uniform_below(beta);
    if target.is_occupied(t_start) {
        return None;
    }
    let l_max = target.distance_to_next_start(t_start).unwrap_or(beta);
    let length = draw_length(l_max, rng)?;
    let segment = Segment::new(t_start, wrap_time(t_start + length, beta));
    Some(Proposal {
        update: SegmentUpdate::InsertSegment { orbital, segment },
        density: beta * l_max / (target.len() + 1) as f64,
    })
}

fn propose_remove_segment(
    orbitals: &[OrbitalSegments],
    beta: f64,
    rng: &mut RngHandle,
) -> Option<Proposal> {
    let orbital = rng.index(orbitals.len());
    let target = &orbitals[orbital];
    let k = target.len();
    if k == 0 {
        return None;
    }
    let index = rng.index(k);
    let segment = target.segments()[index];
    let l_max = if k == 1 {
        beta
    } else {
        let next = target.segments()[(index + 1) % k];
        circular_distance(segment.t_start, next.t_start, beta)
    };
    Some(Proposal {
        update: SegmentUpdate::RemoveSegment { orbital, segment },
        density: k as f64 / (beta * l_max),
    })
}

fn propose_insert_anti_segment(
    orbitals: &[OrbitalSegments],
    beta: f64,
    rng: &mut RngHandle,
) -> Option<Proposal> {
    let orbital = rng.index(orbitals.len());
    let target = &orbitals[orbital];
    let t_start = rng.uniform_below(beta);
    let (l_max, gaps) = if target.is_full_line() {
        (beta, 0)
    } else {
        let host = target.segments()[target.containing(t_start)?];
        (circular_distance(t_start, host.t_end, beta), target.len())
    };
    let length = draw_length(l_max, rng)?;
    let segment = Segment::new(t_start, wrap_time(t_start + length, beta));
    Some(Proposal {
        update: SegmentUpdate::InsertAntiSegment { orbital, segment },
        density: beta * l_max / (gaps + 1) as f64,
    })
}

fn propose_remove_anti_segment(
    orbitals: &[OrbitalSegments],
    beta: f64,
    rng: &mut RngHandle,
) -> Option<Proposal> {
    let orbital = rng.index(orbitals.len());
    let target = &orbitals[orbital];
    let k = target.len();
    if k == 0 {
        return None;
    }
    let index = rng.index(k);
    let segment = target.gap_after(index)?;
    let l_max = if k == 1 {
        beta
    } else {
        let merged_end = target.segments()[(index + 1) % k].t_end;
        circular_distance(segment.t_start, merged_end, beta)
    };
    Some(Proposal {
        update: SegmentUpdate::RemoveAntiSegment { orbital, segment },
        density: k as f64 / (beta * l_max),
    })
}
