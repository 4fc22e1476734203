use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use hyb_mcmc::{ManualClock, RuntimeContext, SimulationEngine, SimulationParams, WorkerPool};

fn sample_params() -> SimulationParams {
    SimulationParams {
        beta: 20.0,
        thermalization: 0,
        sweeps: 1_000_000,
        n_orbitals: 4,
        n_meas: 50,
        spin_flip: true,
        global_flip: true,
        measure_nn: true,
        verbose: false,
        mu: 1.5,
        u: 3.0,
        u_prime: 2.0,
        j: 0.5,
        bath_levels: vec![-1.0, 0.0, 1.0],
        bath_hoppings: vec![0.5, 0.7, 0.5],
        ..SimulationParams::default()
    }
}

fn bench_sweep(c: &mut Criterion) {
    let params = sample_params();
    let runtime = RuntimeContext::new(Arc::new(ManualClock::new()), WorkerPool::single());
    let mut engine = SimulationEngine::from_params(&params, runtime).unwrap();
    for _ in 0..200 {
        engine.do_work();
    }

    c.bench_function("ct_hyb_sweep", |b| {
        b.iter(|| {
            engine.do_work();
        })
    });
}

criterion_group!(benches, bench_sweep);
criterion_main!(benches);
