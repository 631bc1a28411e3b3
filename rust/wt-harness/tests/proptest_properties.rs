//! Property tests for instance generation and hull canonicalization.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use wt_harness::family::{AlgorithmFamily, Instance};
use wt_harness::generator::{
    circular_list_from_permutation, disjoint_sorted_pair, generate, is_single_cycle, search_values,
    unique_values,
};
use wt_harness::geometry::{
    canonicalize, compare_canonical, convex_hull, reconcile_half_hulls, reflect_all, upper_hull, Point,
};
use wt_harness::oracle::{linear_search, traversal_order};

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

/// A permutation of `0..n` for some `n` in `1..=max_len`.
fn arb_permutation(max_len: usize) -> impl Strategy<Value = Vec<usize>> {
    (1..=max_len).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
}

fn arb_point() -> impl Strategy<Value = Point> {
    (-1000.0_f64..1000.0, -1000.0_f64..1000.0).prop_map(|(x, y)| Point::new(x, y))
}

fn arb_points(min: usize, max: usize) -> impl Strategy<Value = Vec<Point>> {
    proptest::collection::vec(arb_point(), min..=max)
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_permutation_gives_single_cycle(perm in arb_permutation(64)) {
        let next = circular_list_from_permutation(&perm);
        prop_assert!(is_single_cycle(&next));

        let order = traversal_order(&next);
        let mut seen = order.clone();
        seen.sort_unstable();
        let expected: Vec<i64> = (0..perm.len() as i64).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_unique_values_are_distinct(seed in any::<u64>(), n in 1usize..300) {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = unique_values(n, &mut rng);
        let mut sorted = values.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), n);
        prop_assert!(values.iter().all(|&v| v > 0));
    }

    #[test]
    fn prop_merge_inputs_sorted_and_disjoint(seed in any::<u64>(), n in 1usize..200) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (a, b) = disjoint_sorted_pair(n, &mut rng);
        prop_assert_eq!(a.len(), n);
        prop_assert_eq!(b.len(), n);
        prop_assert!(a.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(b.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(a.iter().all(|v| b.binary_search(v).is_err()));
    }

    #[test]
    fn prop_search_values_strictly_increasing(seed in any::<u64>(), n in 1usize..500) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (values, key) = search_values(n, &mut rng);
        prop_assert!(values.windows(2).all(|w| w[1] - w[0] >= 2 && w[1] - w[0] <= 3));
        prop_assert!(key >= 2 && key < 2 * n as i64 + 2);
        prop_assert_eq!(linear_search(&values, key), values.binary_search(&key).ok());
    }

    #[test]
    fn prop_generated_instance_has_requested_size(seed in any::<u64>(), n in 1usize..100) {
        let mut rng = StdRng::seed_from_u64(seed);
        for family in AlgorithmFamily::ALL {
            let instance = generate(family, n, 50, &mut rng);
            match (&instance, family) {
                (Instance::Search { values, fan_out, .. }, AlgorithmFamily::PArySearch) => {
                    prop_assert_eq!(values.len(), 50);
                    prop_assert_eq!(*fan_out as usize, n);
                }
                (Instance::Merge { a, b }, _) => prop_assert_eq!(a.len() + b.len(), 2 * n),
                (Instance::Points { points }, _) => prop_assert!(points.len() <= n),
                (other, _) => prop_assert_eq!(other.len(), n),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Hull canonicalization
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_canonicalize_is_idempotent(points in arb_points(0, 40)) {
        let once = canonicalize(&points);
        prop_assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn prop_canonicalize_ignores_order_and_duplicates(points in arb_points(3, 40)) {
        let mut shuffled: Vec<Point> = points.iter().rev().copied().collect();
        shuffled.extend_from_slice(&points[..2]);
        prop_assert_eq!(canonicalize(&shuffled), canonicalize(&points));
    }

    #[test]
    fn prop_canonical_hull_is_closed(points in arb_points(3, 40)) {
        let hull = canonicalize(&convex_hull(&points));
        if !hull.is_empty() {
            prop_assert!(hull.len() >= 4);
            prop_assert_eq!(hull.first(), hull.last());
        }
    }

    #[test]
    fn prop_half_hulls_reconcile_to_full_hull(points in arb_points(3, 60)) {
        let upper = upper_hull(&points);
        let lower = reflect_all(&upper_hull(&reflect_all(&points)));
        let reconciled = reconcile_half_hulls(&upper, &lower);
        let expected = canonicalize(&convex_hull(&points));
        prop_assert!(compare_canonical(&expected, &reconciled, 1e-9).is_match());
    }
}
