use hyb_core::{OrbitalSegments, RngHandle, Segment};
use proptest::prelude::*;

fn check_invariants(orbital: &OrbitalSegments) {
    let beta = orbital.beta();
    let segments = orbital.segments();
    for pair in segments.windows(2) {
        assert!(pair[0].t_start < pair[1].t_start, "segments out of order");
    }
    for (index, segment) in segments.iter().enumerate() {
        assert!((0.0..beta).contains(&segment.t_start));
        assert!((0.0..beta).contains(&segment.t_end));
        if segment.wraps() {
            assert_eq!(index, segments.len() - 1, "only the last segment may wrap");
        }
    }
    let mut covered = 0.0;
    for segment in segments {
        for other in segments {
            if segment != other {
                assert!(segment.overlap(other, beta) < 1e-12, "segments overlap");
            }
        }
        covered += segment.length(beta);
    }
    assert!(covered <= beta + 1e-9);
    if orbital.is_full_line() {
        assert!(segments.is_empty());
    }
}

proptest! {
    #[test]
    fn random_walks_preserve_geometry(seed in any::<u64>(), steps in 1usize..200) {
        let beta = 7.5;
        let mut rng = RngHandle::from_seed(seed);
        let mut orbital = OrbitalSegments::new(beta);
        for _ in 0..steps {
            let before = orbital.clone();
            let t = rng.uniform_below(beta);
            let length = rng.uniform_open_below(beta);
            let candidate = Segment::new(t, hyb_core::wrap_time(t + length, beta));
            let result = match rng.index(5) {
                0 => orbital.insert_segment(candidate),
                1 => orbital.insert_anti_segment(candidate),
                2 => match orbital.segments().first().copied() {
                    Some(segment) => orbital.remove_segment(segment),
                    None => orbital.toggle_zero_state(),
                },
                3 => match orbital.gap_after(0) {
                    Some(gap) => orbital.remove_anti_segment(gap),
                    None => orbital.toggle_zero_state(),
                },
                _ => orbital.toggle_zero_state(),
            };
            if result.is_err() {
                prop_assert_eq!(&orbital, &before);
            }
            check_invariants(&orbital);
        }
    }
}
