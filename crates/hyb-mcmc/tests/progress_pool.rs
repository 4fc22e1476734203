use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hyb_mcmc::{
    ManualClock, Phase, ProgressController, RuntimeContext, SimulationEngine, SimulationParams,
    WorkerPool,
};

fn controller(thermalization: u64, sweeps: u64, pool: usize) -> ProgressController {
    ProgressController::new(
        thermalization,
        sweeps,
        Duration::from_secs(5),
        Duration::from_secs(100),
        pool,
    )
}

#[test]
fn completion_is_zero_while_thermalizing() {
    let mut progress = controller(3, 10, 1);
    for _ in 0..3 {
        assert!(!progress.is_thermalized());
        assert_eq!(progress.fraction_completed(Duration::from_secs(10_000)), 0.0);
        progress.record_sweep();
    }
    assert!(progress.is_thermalized());
    assert_eq!(progress.fraction_completed(Duration::from_secs(5)), 0.0);
}

#[test]
fn work_fraction_counts_sweeps_after_thermalization() {
    let mut progress = controller(2, 10, 1);
    for _ in 0..7 {
        progress.record_sweep();
    }
    assert!((progress.fraction_completed(Duration::from_secs(5)) - 0.5).abs() < 1e-12);
    for _ in 0..10 {
        progress.record_sweep();
    }
    assert!(progress.fraction_completed(Duration::from_secs(5)) > 1.0);
}

#[test]
fn time_fraction_is_divided_by_pool_size() {
    let mut single = controller(0, 1_000_000, 1);
    let mut pooled = controller(0, 1_000_000, 2);
    single.record_sweep();
    pooled.record_sweep();
    let now = Duration::from_secs(5 + 60);
    let alone = single.fraction_completed(now);
    let shared = pooled.fraction_completed(now);
    assert!((alone - 0.6).abs() < 1e-9);
    assert!((shared - alone / 2.0).abs() < 1e-9);
}

#[test]
fn larger_fraction_wins() {
    let mut progress = controller(0, 10, 1);
    for _ in 0..3 {
        progress.record_sweep();
    }
    let early = progress.fraction_completed(Duration::from_secs(15));
    assert!((early - 0.3).abs() < 1e-12);
    let late = progress.fraction_completed(Duration::from_secs(5 + 90));
    assert!((late - 0.9).abs() < 1e-9);
}

#[test]
fn empty_sweep_budget_falls_back_to_time() {
    let progress = controller(0, 0, 1);
    let fraction = progress.fraction_completed(Duration::from_secs(5 + 50));
    assert!((fraction - 0.5).abs() < 1e-9);
}

#[test]
fn phases_advance_in_order() {
    let mut progress = controller(2, 4, 1);
    let now = Duration::from_secs(5);
    assert_eq!(progress.phase(now), Phase::NotStarted);
    progress.record_sweep();
    assert_eq!(progress.phase(now), Phase::Thermalizing);
    progress.record_sweep();
    assert_eq!(progress.phase(now), Phase::Sampling);
    for _ in 0..4 {
        progress.record_sweep();
    }
    assert_eq!(progress.phase(now), Phase::Done);
}

#[test]
fn pool_is_discovered_from_launcher_variables() {
    let vars: HashMap<&str, &str> = [("OMPI_COMM_WORLD_SIZE", "8"), ("OMPI_COMM_WORLD_RANK", "3")]
        .into_iter()
        .collect();
    let pool = WorkerPool::discover_from(|name| vars.get(name).map(|v| v.to_string()));
    assert_eq!(pool, WorkerPool { rank: 3, size: 8 });

    let vars: HashMap<&str, &str> = [("PMI_SIZE", "junk"), ("SLURM_NTASKS", "4"), ("SLURM_PROCID", "2")]
        .into_iter()
        .collect();
    let pool = WorkerPool::discover_from(|name| vars.get(name).map(|v| v.to_string()));
    assert_eq!(pool, WorkerPool { rank: 2, size: 4 });
}

#[test]
fn pool_discovery_degrades_to_single_worker() {
    let pool = WorkerPool::discover_from(|_| None);
    assert_eq!(pool, WorkerPool::single());
    let pool = WorkerPool::discover_from(|name| (name == "PMIX_SIZE").then(|| "0".to_string()));
    assert_eq!(pool, WorkerPool { rank: 0, size: 1 });
}

#[test]
fn engine_reports_progress_through_the_injected_clock() {
    let clock = ManualClock::new();
    let runtime = RuntimeContext::new(Arc::new(clock.clone()), WorkerPool::new(0, 2));
    let params = SimulationParams {
        thermalization: 2,
        sweeps: 10,
        max_time: 100,
        n_meas: 1,
        verbose: false,
        ..SimulationParams::default()
    };
    let mut engine = SimulationEngine::from_params(&params, runtime).expect("engine");
    assert_eq!(engine.phase(), Phase::NotStarted);
    clock.advance(Duration::from_secs(500));
    assert_eq!(engine.fraction_completed(), 0.0);
    engine.do_work();
    engine.do_work();
    assert!(engine.is_thermalized());
    // 500 s of a 100 s budget shared by two workers.
    assert!((engine.fraction_completed() - 2.5).abs() < 1e-9);
    assert_eq!(engine.phase(), Phase::Done);
}
