use std::fs;
use std::path::Path;

use hyb_sim::commands::{self, CheckArgs, RunArgs, RunSummary};
use tempfile::tempdir;

const PARAMS: &str = "\
BETA: 5.0
N_ORBITALS: 2
THERMALIZATION: 5
SWEEPS: 40
N_MEAS: 4
MAX_TIME: 600
MU: 1.0
U: 2.0
MEASURE_nn: true
VERBOSE: false
";

fn write_params(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("params.yaml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn run_writes_summary_json() {
    let dir = tempdir().unwrap();
    let params = write_params(dir.path(), PARAMS);
    let out = dir.path().join("out");
    let summary = commands::run::run(&RunArgs {
        params,
        out: out.clone(),
        seed: Some(7),
    })
    .unwrap();

    assert_eq!(summary.params.seed, 7);
    assert!(summary.fraction_completed >= 1.0);
    assert!(summary.sweeps >= 40);
    assert!(summary.weight_drift < 1e-8);
    assert_eq!(summary.sign.abs(), 1.0);
    assert!(summary.observables.nn.is_some());
    assert!(summary.acceptance.total_proposed() > 0);

    let text = fs::read_to_string(out.join("summary.json")).unwrap();
    let parsed: RunSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.configuration_hash, summary.configuration_hash);
    assert_eq!(parsed.sweeps, summary.sweeps);
}

#[test]
fn identical_seeds_give_identical_chains() {
    let dir = tempdir().unwrap();
    let params = write_params(dir.path(), PARAMS);
    let first = commands::run::run(&RunArgs {
        params: params.clone(),
        out: dir.path().join("a"),
        seed: Some(11),
    })
    .unwrap();
    let second = commands::run::run(&RunArgs {
        params,
        out: dir.path().join("b"),
        seed: Some(11),
    })
    .unwrap();
    assert_eq!(first.configuration_hash, second.configuration_hash);
    assert_eq!(first.acceptance, second.acceptance);
}

#[test]
fn check_accepts_valid_file() {
    let dir = tempdir().unwrap();
    let params = write_params(dir.path(), PARAMS);
    commands::check::run(&CheckArgs { params }).unwrap();
}

#[test]
fn check_rejects_missing_size_parameter() {
    let dir = tempdir().unwrap();
    let params = write_params(dir.path(), &format!("{PARAMS}MEASURE_freq: true\n"));
    let err = commands::check::run(&CheckArgs { params }).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.starts_with("configuration error:"), "{rendered}");
    assert!(rendered.contains("missing-n-matsubara"), "{rendered}");
    assert!(rendered.contains("N_MATSUBARA"), "{rendered}");
}

#[test]
fn check_rejects_incomplete_file() {
    let dir = tempdir().unwrap();
    let params = write_params(dir.path(), "BETA: 5.0\nMEASURE_freq: true\n");
    let err = commands::check::run(&CheckArgs { params }).unwrap_err();
    assert!(err.to_string().contains("params-parse"), "{err}");
}

#[test]
fn run_rejects_unreadable_params() {
    let dir = tempdir().unwrap();
    let result = commands::run::run(&RunArgs {
        params: dir.path().join("absent.yaml"),
        out: dir.path().join("out"),
        seed: None,
    });
    assert!(result.is_err());
    assert!(!dir.path().join("out").exists());
}
