use hyb_core::{RngHandle, Segment, SegmentConfiguration, SegmentLayout, SegmentUpdate};
use hyb_det::{DiscreteBath, HybConfig};
use proptest::prelude::*;

const BETA: f64 = 10.0;

fn bath() -> DiscreteBath {
    DiscreteBath::new(BETA, vec![-0.5, 0.0, 0.8], vec![0.6, 1.0, 0.4]).expect("valid bath")
}

fn assert_ratio_consistent(config: &mut HybConfig, update: SegmentUpdate) {
    let before = config.full_weight();
    let ratio = config.weight_ratio(&update).expect("ratio");
    config.apply(&update).expect("apply");
    let after = config.full_weight();
    let expected = after / before;
    assert!(
        (ratio - expected).abs() <= 1e-8 * expected.abs().max(1.0),
        "ratio {ratio} vs recomputed {expected}"
    );
    for (index, orbital) in config.orbitals().iter().enumerate() {
        let cached = config.orbital_weights()[index];
        let fresh = config.orbital_weight(orbital);
        assert!((cached - fresh).abs() <= 1e-12 * fresh.abs().max(1.0));
    }
}

#[test]
fn bath_shape_is_validated() {
    let err = DiscreteBath::new(BETA, vec![0.0, 1.0], vec![1.0]).unwrap_err();
    assert_eq!(err.info().code, "bath-shape");
    let err = DiscreteBath::new(BETA, Vec::new(), Vec::new()).unwrap_err();
    assert_eq!(err.info().code, "bath-shape");
    let err = DiscreteBath::new(0.0, vec![0.0], vec![1.0]).unwrap_err();
    assert_eq!(err.info().code, "bath-beta");
}

#[test]
fn hybridization_function_is_antiperiodic() {
    let bath = bath();
    for tau in [0.3, 2.5, 7.0, 9.9] {
        let forward = bath.evaluate(tau);
        assert!(forward > 0.0);
        assert!((bath.evaluate(tau - BETA) + forward).abs() < 1e-14);
    }
}

#[test]
fn half_filled_level_is_symmetric() {
    let bath = DiscreteBath::new(BETA, vec![0.0], vec![1.0]).unwrap();
    assert!((bath.evaluate(1.0) - 0.5).abs() < 1e-15);
    assert!((bath.evaluate(9.0) - 0.5).abs() < 1e-15);
}

#[test]
fn extreme_levels_stay_finite() {
    let bath = DiscreteBath::new(200.0, vec![-80.0, 80.0], vec![1.0, 1.0]).unwrap();
    for tau in [0.0, 1e-3, 100.0, 199.999] {
        let value = bath.evaluate(tau);
        assert!(value.is_finite());
        assert!(value >= 0.0);
    }
}

#[test]
fn single_segment_weight_is_positive_with_or_without_wrap() {
    let mut config = HybConfig::new(1, bath());
    let plain = SegmentUpdate::InsertSegment {
        orbital: 0,
        segment: Segment::new(2.0, 5.0),
    };
    config.apply(&plain).unwrap();
    let straight = config.full_weight();
    assert!((straight - config.bath().evaluate(3.0)).abs() < 1e-14);
    config.apply(&plain.inverse()).unwrap();

    config
        .apply(&SegmentUpdate::InsertSegment {
            orbital: 0,
            segment: Segment::new(8.0, 1.0),
        })
        .unwrap();
    let wrapped = config.full_weight();
    assert!((wrapped - config.bath().evaluate(3.0)).abs() < 1e-14);
}

#[test]
fn ratios_match_recomputed_determinants() {
    let mut config = HybConfig::new(4, bath());
    let updates = [
        SegmentUpdate::InsertSegment {
            orbital: 0,
            segment: Segment::new(8.0, 2.0),
        },
        SegmentUpdate::InsertSegment {
            orbital: 0,
            segment: Segment::new(3.0, 6.5),
        },
        SegmentUpdate::InsertSegment {
            orbital: 2,
            segment: Segment::new(1.0, 4.5),
        },
        SegmentUpdate::ToggleZeroState { orbital: 3 },
        SegmentUpdate::InsertAntiSegment {
            orbital: 3,
            segment: Segment::new(6.0, 7.0),
        },
        SegmentUpdate::InsertAntiSegment {
            orbital: 2,
            segment: Segment::new(2.0, 3.0),
        },
        SegmentUpdate::SwapOrbitals {
            first: 0,
            second: 1,
        },
        SegmentUpdate::GlobalFlip,
        SegmentUpdate::RemoveAntiSegment {
            orbital: 3,
            segment: Segment::new(2.0, 3.0),
        },
        SegmentUpdate::RemoveSegment {
            orbital: 0,
            segment: Segment::new(3.0, 6.5),
        },
    ];
    for update in updates {
        assert_ratio_consistent(&mut config, update);
    }
}

#[test]
fn zero_weight_state_reports_degenerate_ratio() {
    let silent = DiscreteBath::new(BETA, vec![0.0], vec![0.0]).unwrap();
    let mut config = HybConfig::new(1, silent);
    let segment = Segment::new(1.0, 2.0);
    let insert = SegmentUpdate::InsertSegment { orbital: 0, segment };
    assert_eq!(config.weight_ratio(&insert).unwrap(), 0.0);
    config.apply(&insert).unwrap();
    let err = config.weight_ratio(&insert.inverse()).unwrap_err();
    assert_eq!(err.info().code, "degenerate-weight");
    assert!(!err.is_config());
}

proptest! {
    #[test]
    fn random_updates_keep_ratios_consistent(seed in any::<u64>(), steps in 1usize..40) {
        let mut rng = RngHandle::from_seed(seed);
        let mut config = HybConfig::new(2, bath());
        for _ in 0..steps {
            let orbital = rng.index(2);
            let t = rng.uniform_below(BETA);
            let length = rng.uniform_open_below(BETA);
            let segment = Segment::new(t, hyb_core::wrap_time(t + length, BETA));
            let update = match rng.index(4) {
                0 => SegmentUpdate::InsertSegment { orbital, segment },
                1 => SegmentUpdate::InsertAntiSegment { orbital, segment },
                2 => match config.orbitals()[orbital].segments().first() {
                    Some(&segment) => SegmentUpdate::RemoveSegment { orbital, segment },
                    None => SegmentUpdate::ToggleZeroState { orbital },
                },
                _ => SegmentUpdate::SwapOrbitals { first: 0, second: 1 },
            };
            let before = config.full_weight();
            let Ok(ratio) = config.weight_ratio(&update) else {
                continue;
            };
            config.apply(&update).unwrap();
            let after = config.full_weight();
            if before.abs() > 1e-200 {
                let expected = after / before;
                prop_assert!((ratio - expected).abs() <= 1e-6 * expected.abs().max(1.0));
            }
        }
    }
}
