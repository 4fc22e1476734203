use std::sync::Arc;

use hyb_core::{SegmentConfiguration, SegmentLayout};
use hyb_det::{DiscreteBath, HybConfig};
use hyb_mcmc::determinism::worker_seed;
use hyb_mcmc::{
    ManualClock, MeasurementBank, RuntimeContext, SegmentObservables, SimulationEngine,
    SimulationParams, UpdateKind, WorkerPool,
};
use hyb_trace::{InteractionMatrix, LocalConfig};

fn runtime(rank: usize, size: usize) -> RuntimeContext {
    RuntimeContext::new(Arc::new(ManualClock::new()), WorkerPool::new(rank, size))
}

fn interacting_params() -> SimulationParams {
    SimulationParams {
        beta: 5.0,
        thermalization: 10,
        sweeps: 100,
        n_orbitals: 4,
        n_meas: 20,
        spin_flip: true,
        global_flip: true,
        verbose: false,
        mu: 1.2,
        u: 2.0,
        u_prime: 1.5,
        j: 0.25,
        bath_levels: vec![-1.0, 0.5, 1.0],
        bath_hoppings: vec![0.5, 0.8, 0.5],
        seed: 2024,
        ..SimulationParams::default()
    }
}

#[test]
fn tracked_weight_matches_recomputed_weight() {
    let mut engine = SimulationEngine::from_params(&interacting_params(), runtime(0, 1)).unwrap();
    assert_eq!(engine.weight_drift(), 0.0);
    for _ in 0..100 {
        engine.do_work();
        assert!(engine.sign() == 1.0 || engine.sign() == -1.0);
        assert!(
            engine.weight_drift() < 1e-8,
            "drift {} after {} sweeps",
            engine.weight_drift(),
            engine.sweep_count()
        );
    }
    let report = engine.acceptance_report();
    assert!(report.row(UpdateKind::InsertSegment).accepted > 0);
    assert!(report.row(UpdateKind::RemoveSegment).accepted > 0);
}

#[test]
fn sub_configurations_stay_in_lockstep() {
    let mut engine = SimulationEngine::from_params(&interacting_params(), runtime(0, 1)).unwrap();
    for _ in 0..50 {
        engine.do_work();
        let pair = engine.configuration();
        assert_eq!(pair.local.orbitals(), pair.hyb.orbitals());
    }
    let pair = engine.configuration();
    let product = pair.local.full_weight() * pair.hyb.full_weight();
    assert!((engine.full_weight() - product).abs() <= 1e-12 * product.abs());
}

#[test]
fn rejected_steps_leave_configuration_untouched() {
    let mut engine = SimulationEngine::from_params(&interacting_params(), runtime(0, 1)).unwrap();
    let mut rejections = 0;
    for _ in 0..2000 {
        let before = engine.configuration().clone();
        let sign = engine.sign();
        let outcome = engine.step();
        if !outcome.accepted {
            rejections += 1;
            assert_eq!(engine.configuration(), &before);
            assert_eq!(engine.sign(), sign);
        }
    }
    assert!(rejections > 0);
}

#[test]
fn counters_account_for_every_invocation() {
    let params = interacting_params();
    let mut engine = SimulationEngine::from_params(&params, runtime(0, 1)).unwrap();
    let sweeps = 25;
    for _ in 0..sweeps {
        engine.do_work();
    }
    let report = engine.acceptance_report();
    assert_eq!(report.total_proposed(), sweeps * params.n_meas);
    for row in &report.rows {
        assert!(row.accepted <= row.proposed);
        assert!((0.0..=1.0).contains(&row.rate));
    }
    assert_eq!(engine.sweep_count(), sweeps);
}

#[test]
fn disabled_moves_are_never_proposed() {
    let params = SimulationParams {
        spin_flip: false,
        global_flip: false,
        ..interacting_params()
    };
    let mut engine = SimulationEngine::from_params(&params, runtime(0, 1)).unwrap();
    for _ in 0..50 {
        engine.do_work();
    }
    let report = engine.acceptance_report();
    assert_eq!(report.row(UpdateKind::SwapSegment).proposed, 0);
    assert_eq!(report.row(UpdateKind::GlobalFlip).proposed, 0);
    assert!(report.row(UpdateKind::ZeroState).proposed > 0);
}

#[test]
fn equal_seeds_reproduce_the_chain() {
    let params = interacting_params();
    let mut first = SimulationEngine::from_params(&params, runtime(1, 4)).unwrap();
    let mut second = SimulationEngine::from_params(&params, runtime(1, 4)).unwrap();
    for _ in 0..30 {
        first.do_work();
        second.do_work();
    }
    assert_eq!(first.acceptance_report(), second.acceptance_report());
    assert_eq!(first.configuration_hash(), second.configuration_hash());
    assert_eq!(first.sign(), second.sign());
    assert_ne!(worker_seed(params.seed, 0), worker_seed(params.seed, 1));
}

#[test]
fn measurements_start_after_thermalization() {
    let params = SimulationParams {
        thermalization: 5,
        measure_nn: true,
        measure_time: true,
        measure_sector_statistics: true,
        ..interacting_params()
    };
    let mut engine = SimulationEngine::from_params(&params, runtime(0, 1)).unwrap();
    for _ in 0..5 {
        engine.do_work();
        assert_eq!(engine.measurements().samples(), 0);
    }
    for _ in 0..20 {
        engine.do_work();
    }
    assert_eq!(engine.measurements().samples(), 20);

    let summary = engine.measurements().summary();
    assert_eq!(summary.samples, 20);
    assert!(summary.average_sign.abs() <= 1.0 + 1e-12);
    let densities = summary.densities.expect("densities measured");
    assert_eq!(densities.len(), 4);
    let nn = summary.nn.expect("nn measured");
    for (i, density) in densities.iter().enumerate() {
        assert!((nn[i * 4 + i] - density).abs() < 1e-9);
    }
    let sectors = summary.sectors.expect("sectors measured");
    let total: f64 = sectors.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    for row in &summary.order_histogram {
        let probability: f64 = row.iter().sum();
        assert!(probability <= 1.0 + 1e-12);
    }
}

#[test]
fn nothing_is_measured_without_channels() {
    let params = SimulationParams {
        thermalization: 0,
        ..interacting_params()
    };
    let mut engine = SimulationEngine::from_params(&params, runtime(0, 1)).unwrap();
    for _ in 0..10 {
        engine.do_work();
    }
    assert_eq!(engine.measurements().samples(), 0);
    assert!(!engine.channels().any_enabled());
}

#[test]
fn invalid_parameters_produce_no_engine() {
    let params = SimulationParams {
        measure_freq: true,
        ..interacting_params()
    };
    let err = SimulationEngine::from_params(&params, runtime(0, 1)).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn display_shows_both_configurations() {
    let mut engine = SimulationEngine::from_params(&interacting_params(), runtime(0, 1)).unwrap();
    engine.do_work();
    let rendered = engine.to_string();
    assert!(rendered.contains("local configuration"));
    assert!(rendered.contains("hybridization configuration"));
    let table = engine.acceptance_report().to_string();
    assert!(table.contains("change zero state"));
    assert!(table.contains("remove anti-segment"));
}

fn local_model(beta: f64, n_orbitals: usize) -> LocalConfig {
    LocalConfig::new(
        beta,
        vec![0.5; n_orbitals],
        InteractionMatrix::kanamori(n_orbitals, 2.0, 1.5, 0.25),
    )
    .unwrap()
}

fn hyb_model(beta: f64, n_orbitals: usize) -> HybConfig {
    HybConfig::new(
        n_orbitals,
        DiscreteBath::new(beta, vec![-1.0, 1.0], vec![0.5, 0.5]).unwrap(),
    )
}

fn bank(params: &SimulationParams) -> SegmentObservables {
    SegmentObservables::new(params.channels(), params.beta, params.n_orbitals)
}

#[test]
fn models_must_match_the_parameters() {
    let params = SimulationParams {
        measure_nn: true,
        ..interacting_params()
    };
    let err = SimulationEngine::new(
        &params,
        local_model(params.beta, 2),
        hyb_model(params.beta, 2),
        bank(&params),
        runtime(0, 1),
    )
    .unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "model-shape-mismatch");

    let err = SimulationEngine::new(
        &params,
        local_model(params.beta, 4),
        hyb_model(params.beta, 3),
        bank(&params),
        runtime(0, 1),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "model-pair-mismatch");

    let err = SimulationEngine::new(
        &params,
        local_model(params.beta, 4),
        hyb_model(2.0 * params.beta, 4),
        bank(&params),
        runtime(0, 1),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "model-pair-mismatch");

    let mut engine = SimulationEngine::new(
        &params,
        local_model(params.beta, 4),
        hyb_model(params.beta, 4),
        bank(&params),
        runtime(0, 1),
    )
    .unwrap();
    for _ in 0..20 {
        engine.do_work();
    }
    assert!(engine.measurements().summary().nn.is_some());
}
