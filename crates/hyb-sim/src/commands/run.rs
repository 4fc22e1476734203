use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use hyb_mcmc::{
    AcceptanceReport, ObservableSummary, RuntimeContext, SimulationEngine, SimulationParams,
    WorkerPool,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML parameter file.
    #[arg(long)]
    pub params: PathBuf,
    /// Output directory for `summary.json`.
    #[arg(long)]
    pub out: PathBuf,
    /// Overrides the SEED parameter.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: String,
    pub params: SimulationParams,
    pub worker_pool: WorkerPool,
    pub sweeps: u64,
    pub fraction_completed: f64,
    pub sign: f64,
    pub weight_drift: f64,
    pub acceptance: AcceptanceReport,
    pub observables: ObservableSummary,
    pub configuration_hash: String,
    pub started_at: String,
    pub finished_at: String,
}

pub fn run(args: &RunArgs) -> Result<RunSummary, Box<dyn Error>> {
    let mut params = SimulationParams::load(&args.params)?;
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    let summary = simulate(&params, RuntimeContext::from_environment())?;
    fs::create_dir_all(&args.out)?;
    let path = args.out.join("summary.json");
    fs::write(&path, serde_json::to_vec_pretty(&summary)?)?;
    info!(path = %path.display(), "wrote run summary");
    Ok(summary)
}

/// Drives one engine until its completion fraction reaches one.
pub fn simulate(
    params: &SimulationParams,
    runtime: RuntimeContext,
) -> Result<RunSummary, Box<dyn Error>> {
    let started_at = Utc::now().to_rfc3339();
    let mut engine = SimulationEngine::from_params(params, runtime)?;
    let mut next_decile = 1u32;
    while engine.fraction_completed() < 1.0 {
        engine.do_work();
        let fraction = engine.fraction_completed();
        while next_decile <= 10 && fraction >= f64::from(next_decile) / 10.0 {
            info!(
                sweeps = engine.sweep_count(),
                sign = engine.sign(),
                "{}% completed",
                next_decile * 10
            );
            next_decile += 1;
        }
    }
    let acceptance = engine.acceptance_report();
    if params.verbose && engine.pool().rank == 0 {
        for line in acceptance.to_string().lines() {
            info!("{line}");
        }
    }
    Ok(RunSummary {
        version: env!("CARGO_PKG_VERSION").into(),
        params: params.clone(),
        worker_pool: engine.pool(),
        sweeps: engine.sweep_count(),
        fraction_completed: engine.fraction_completed(),
        sign: engine.sign(),
        weight_drift: engine.weight_drift(),
        acceptance,
        observables: engine.measurements().summary(),
        configuration_hash: engine.configuration_hash(),
        started_at,
        finished_at: Utc::now().to_rfc3339(),
    })
}
