use std::fmt;
use std::time::Duration;

use hyb_core::{
    canonical_hash, ErrorInfo, HybError, RngHandle, SegmentConfiguration, SegmentLayout,
};
use hyb_det::HybConfig;
use hyb_trace::LocalConfig;
use tracing::debug;

use crate::determinism;
use crate::kernel::{ChainState, ConfigurationPair, StepOutcome, UpdateKernel};
use crate::measure::{MeasurementBank, MeasurementChannels, SegmentObservables};
use crate::params::SimulationParams;
use crate::progress::{Phase, ProgressController};
use crate::report::{self, AcceptanceReport};
use crate::runtime::{RuntimeContext, WorkerPool};
use crate::schedule::MoveSchedule;

/// One CT-HYB Markov chain with its progress tracking and measurements.
///
/// The harness calls [`do_work`](SimulationEngine::do_work) until
/// [`fraction_completed`](SimulationEngine::fraction_completed) reaches one.
#[derive(Debug)]
pub struct SimulationEngine<L = LocalConfig, H = HybConfig, B = SegmentObservables> {
    n_meas: u64,
    pair: ConfigurationPair<L, H>,
    kernel: UpdateKernel,
    chain: ChainState,
    progress: ProgressController,
    channels: MeasurementChannels,
    bank: B,
    runtime: RuntimeContext,
    rng: RngHandle,
}

impl SimulationEngine {
    /// Validates `params` and builds the reference density-density models.
    pub fn from_params(params: &SimulationParams, runtime: RuntimeContext) -> Result<Self, HybError> {
        params.validate()?;
        let local = LocalConfig::new(params.beta, params.mu_values(), params.interaction()?)?;
        let hyb = HybConfig::new(params.n_orbitals, params.bath()?);
        let bank = SegmentObservables::new(params.channels(), params.beta, params.n_orbitals);
        Self::new(params, local, hyb, bank, runtime)
    }
}

impl<L, H, B> SimulationEngine<L, H, B>
where
    L: SegmentConfiguration + SegmentLayout + Clone,
    H: SegmentConfiguration + SegmentLayout,
    B: MeasurementBank,
{
    /// Validates `params` and wires the given models into an engine.
    ///
    /// Both models must cover `N_ORBITALS` orbitals on `[0, BETA)` and start
    /// from the same segments.
    pub fn new(
        params: &SimulationParams,
        local: L,
        hyb: H,
        bank: B,
        runtime: RuntimeContext,
    ) -> Result<Self, HybError> {
        params.validate()?;
        check_models(params, &local, &hyb)?;
        let schedule = MoveSchedule::new(&params.move_weights, params.spin_flip, params.global_flip)?;
        let channels = params.channels();
        let pool = runtime.pool();
        report::log_startup(
            pool,
            &channels,
            &params.input_announcements(),
            params.verbose,
            params.max_time,
        );

        let pair = ConfigurationPair::new(local, hyb);
        let chain = ChainState::from_weight(pair.full_weight());
        let progress = ProgressController::new(
            params.thermalization,
            params.sweeps,
            runtime.now(),
            Duration::from_secs(params.max_time),
            pool.size,
        );
        let seed = determinism::worker_seed(params.seed, pool.rank);
        debug!(seed, rank = pool.rank, "seeded worker chain");
        Ok(Self {
            n_meas: params.n_meas,
            pair,
            kernel: UpdateKernel::new(schedule),
            chain,
            progress,
            channels,
            bank,
            runtime,
            rng: RngHandle::from_seed(seed),
        })
    }

    /// One unit of work: `N_MEAS` kernel steps, then a measurement once thermalized.
    pub fn do_work(&mut self) {
        for _ in 0..self.n_meas {
            self.kernel.step(&mut self.pair, &mut self.chain, &mut self.rng);
        }
        if self.progress.is_thermalized() && self.channels.any_enabled() {
            self.bank.measure(self.pair.local.orbitals(), self.chain.sign);
        }
        self.progress.record_sweep();
    }

    /// A single kernel invocation outside the sweep structure.
    pub fn step(&mut self) -> StepOutcome {
        self.kernel.step(&mut self.pair, &mut self.chain, &mut self.rng)
    }

    /// Completion fraction for the harness; zero while thermalizing.
    pub fn fraction_completed(&self) -> f64 {
        self.progress.fraction_completed(self.runtime.now())
    }

    /// Returns true once the thermalization sweeps are done.
    pub fn is_thermalized(&self) -> bool {
        self.progress.is_thermalized()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.progress.phase(self.runtime.now())
    }

    /// Completed units of work.
    pub fn sweep_count(&self) -> u64 {
        self.progress.sweep_count()
    }

    /// Running fermionic sign.
    pub fn sign(&self) -> f64 {
        self.chain.sign
    }

    /// Product of both sub-configuration weights, recomputed from scratch.
    pub fn full_weight(&self) -> f64 {
        self.pair.full_weight()
    }

    /// Relative gap between `sign * full_weight()` and the tracked weight magnitude.
    pub fn weight_drift(&self) -> f64 {
        let tracked = self.chain.tracked_weight;
        (self.chain.sign * self.full_weight() - tracked).abs() / tracked.abs().max(f64::MIN_POSITIVE)
    }

    /// Per-move acceptance statistics.
    pub fn acceptance_report(&self) -> AcceptanceReport {
        AcceptanceReport::from_counters(self.kernel.accepted(), self.kernel.proposed())
    }

    /// The configuration pair.
    pub fn configuration(&self) -> &ConfigurationPair<L, H> {
        &self.pair
    }

    /// Structural hash of the current segment configuration.
    pub fn configuration_hash(&self) -> String {
        canonical_hash(self.pair.local.orbitals())
    }

    /// The measurement bank.
    pub fn measurements(&self) -> &B {
        &self.bank
    }

    /// Enabled measurement channels.
    pub fn channels(&self) -> &MeasurementChannels {
        &self.channels
    }

    /// This worker's pool descriptor.
    pub fn pool(&self) -> WorkerPool {
        self.runtime.pool()
    }
}

fn check_models<L, H>(params: &SimulationParams, local: &L, hyb: &H) -> Result<(), HybError>
where
    L: SegmentLayout,
    H: SegmentLayout,
{
    if local.n_orbitals() != params.n_orbitals || local.beta() != params.beta {
        return Err(HybError::Config(
            ErrorInfo::new(
                "model-shape-mismatch",
                "local configuration does not match N_ORBITALS and BETA",
            )
            .with_context("n_orbitals", local.n_orbitals().to_string())
            .with_context("beta", local.beta().to_string()),
        ));
    }
    if hyb.beta() != local.beta() || hyb.orbitals() != local.orbitals() {
        return Err(HybError::Config(
            ErrorInfo::new(
                "model-pair-mismatch",
                "local and hybridization configurations hold different segments",
            )
            .with_context("n_orbitals", hyb.n_orbitals().to_string())
            .with_context("beta", hyb.beta().to_string()),
        ));
    }
    Ok(())
}

const RULE: &str = "-----------------------------------------------------------------------------------";

impl<L: fmt::Display, H: fmt::Display, B> fmt::Display for SimulationEngine<L, H, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "{}", self.pair.local)?;
        writeln!(f, "{}", self.pair.hyb)?;
        write!(f, "{RULE}")
    }
}
