//! Property tests for the pivot detector.
//!
//! Uses proptest to verify:
//! 1. Boundary exclusion: no reported index lies within `order` of either end
//! 2. Strict window: every reported low is strictly below each neighbour in its window
//! 3. Completeness: every index passing the window test is reported, in ascending order

use core_types::PivotKind;
use proptest::prelude::*;
use strategies::find_pivots;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_series() -> impl Strategy<Value = Vec<f64>> {
    // Coarse values so ties show up regularly.
    prop::collection::vec((0u8..20).prop_map(|v| v as f64), 0..120)
}

fn arb_order() -> impl Strategy<Value = usize> {
    1usize..8
}

fn is_strict_extremum(values: &[f64], i: usize, order: usize, kind: PivotKind) -> bool {
    if i < order || i + order >= values.len() {
        return false;
    }
    (i - order..=i + order).filter(|&j| j != i).all(|j| match kind {
        PivotKind::Low => values[i] < values[j],
        PivotKind::High => values[i] > values[j],
    })
}

proptest! {
    #[test]
    fn pivots_respect_boundaries(values in arb_series(), order in arb_order()) {
        for kind in [PivotKind::Low, PivotKind::High] {
            for i in find_pivots(&values, order, kind) {
                prop_assert!(i >= order);
                prop_assert!(i + order < values.len());
            }
        }
    }

    #[test]
    fn reported_lows_are_strict_window_minima(values in arb_series(), order in arb_order()) {
        for i in find_pivots(&values, order, PivotKind::Low) {
            for j in (i - order)..=(i + order) {
                if j != i {
                    prop_assert!(values[i] < values[j]);
                }
            }
        }
    }

    #[test]
    fn detector_matches_brute_force(values in arb_series(), order in arb_order()) {
        for kind in [PivotKind::Low, PivotKind::High] {
            let expected: Vec<usize> = (0..values.len())
                .filter(|&i| is_strict_extremum(&values, i, order, kind))
                .collect();
            let found = find_pivots(&values, order, kind);
            prop_assert!(found.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(found, expected);
        }
    }
}
