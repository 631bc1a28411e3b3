//! Reference answers computed with deliberately simple methods.

use crate::family::{GroundTruth, Instance};
use crate::geometry::{canonicalize, convex_hull};

/// Order in which nodes are visited starting from index 0.
pub fn traversal_order(next: &[usize]) -> Vec<i64> {
    let mut order = Vec::with_capacity(next.len());
    if next.is_empty() {
        return order;
    }
    let mut cur = 0usize;
    for _ in 0..next.len() {
        order.push(cur as i64);
        cur = next[cur];
    }
    order
}

/// First index holding `key`, by linear scan.
pub fn linear_search(values: &[i64], key: i64) -> Option<usize> {
    values.iter().position(|&v| v == key)
}

/// Compute the trusted answer for `instance`.
///
/// A circular-list instance yields either the traversal order or the
/// coloring constraint, depending on `coloring`.
pub fn ground_truth(instance: &Instance, coloring: bool) -> GroundTruth {
    match instance {
        Instance::CircularList { next } if coloring => GroundTruth::ProperColoring { next: next.clone() },
        Instance::CircularList { next } => GroundTruth::Sequence {
            values: traversal_order(next),
        },
        Instance::Values { values } => GroundTruth::Scalar {
            // Empty inputs never reach the oracle; generation requires n > 0.
            value: values.iter().copied().max().unwrap_or(i64::MIN),
        },
        Instance::Merge { a, b } => {
            let mut merged: Vec<i64> = a.iter().chain(b).copied().collect();
            merged.sort_unstable();
            GroundTruth::Sequence { values: merged }
        }
        Instance::Search { values, key, .. } => GroundTruth::Index {
            index: linear_search(values, *key),
        },
        Instance::Points { points } => GroundTruth::Hull {
            vertices: canonicalize(&convex_hull(points)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_traversal_order_from_zero() {
        let next = crate::generator::circular_list_from_permutation(&[2, 0, 3, 1, 4]);
        assert_eq!(traversal_order(&next), vec![0, 3, 1, 4, 2]);
        assert!(traversal_order(&[]).is_empty());
    }

    #[test]
    fn test_linear_search() {
        assert_eq!(linear_search(&[2, 4, 7, 9], 7), Some(2));
        assert_eq!(linear_search(&[2, 4, 7, 9], 5), None);
        assert_eq!(linear_search(&[], 5), None);
    }

    #[test]
    fn test_merge_truth_is_sorted_union() {
        let truth = ground_truth(
            &Instance::Merge {
                a: vec![1, 5, 9],
                b: vec![2, 3, 10],
            },
            false,
        );
        assert_eq!(
            truth,
            GroundTruth::Sequence {
                values: vec![1, 2, 3, 5, 9, 10]
            }
        );
    }

    #[test]
    fn test_maximum_truth() {
        let truth = ground_truth(&Instance::Values { values: vec![4, 19, 7] }, false);
        assert_eq!(truth, GroundTruth::Scalar { value: 19 });
    }

    #[test]
    fn test_hull_truth_degenerate_is_empty() {
        let truth = ground_truth(
            &Instance::Points {
                points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
            },
            false,
        );
        assert_eq!(truth, GroundTruth::Hull { vertices: vec![] });
    }

    #[test]
    fn test_coloring_truth_keeps_successors() {
        let truth = ground_truth(&Instance::CircularList { next: vec![1, 2, 0] }, true);
        assert_eq!(truth, GroundTruth::ProperColoring { next: vec![1, 2, 0] });
    }
}
