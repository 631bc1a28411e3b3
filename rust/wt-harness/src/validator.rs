//! Per-family comparison of solver answers against the oracle.
//!
//! Discrete families require exact agreement. Coloring accepts any proper
//! coloring of the successor cycle. The hull family compares canonical
//! polygons under a distance tolerance; a vertex-count difference always
//! fails.

use serde::{Deserialize, Serialize};

use crate::family::{Answer, GroundTruth};
use crate::geometry::{canonicalize, compare_canonical, HullComparison, Point, DEFAULT_HULL_TOLERANCE};

/// Knobs for the comparison rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Maximum position-wise distance between canonical hulls.
    pub hull_tolerance: f64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        ValidationPolicy {
            hull_tolerance: DEFAULT_HULL_TOLERANCE,
        }
    }
}

/// Why a solver answer was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub expected: String,
    pub actual: String,
    pub detail: String,
}

/// Pass/fail plus, on failure, what disagreed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub mismatch: Option<Mismatch>,
    /// Number of distinct colors, for coloring answers.
    pub colors_used: Option<usize>,
    /// Canonical hull distance, for hull answers that matched in size.
    pub hull_distance: Option<f64>,
}

impl ValidationOutcome {
    fn pass() -> Self {
        ValidationOutcome {
            passed: true,
            mismatch: None,
            colors_used: None,
            hull_distance: None,
        }
    }

    fn fail(expected: impl Into<String>, actual: impl Into<String>, detail: impl Into<String>) -> Self {
        ValidationOutcome {
            passed: false,
            mismatch: Some(Mismatch {
                expected: expected.into(),
                actual: actual.into(),
                detail: detail.into(),
            }),
            colors_used: None,
            hull_distance: None,
        }
    }
}

/// Render at most a handful of elements so diagnostics stay readable; the
/// full input is kept separately.
fn preview<T: std::fmt::Debug>(items: &[T]) -> String {
    const LIMIT: usize = 16;
    if items.len() <= LIMIT {
        format!("{:?}", items)
    } else {
        format!("{:?} ... ({} total)", &items[..LIMIT], items.len())
    }
}

fn describe_answer(answer: &Answer) -> String {
    match answer {
        Answer::Scalar { value } => value.to_string(),
        Answer::Sequence { values } => preview(values),
        Answer::Points { points } => format!("{} points", points.len()),
    }
}

fn truth_kind(truth: &GroundTruth) -> &'static str {
    match truth {
        GroundTruth::Scalar { .. } => "scalar",
        GroundTruth::Index { .. } => "index",
        GroundTruth::Sequence { .. } => "sequence",
        GroundTruth::ProperColoring { .. } => "coloring",
        GroundTruth::Hull { .. } => "hull",
    }
}

/// Conflicting edge in a coloring: node, its color, successor, its color.
pub type ColorConflict = (usize, i64, usize, i64);

/// Check `colors` against the successor cycle `next`.
pub fn check_coloring(next: &[usize], colors: &[i64]) -> Result<usize, String> {
    if colors.len() != next.len() {
        return Err(format!("expected {} colors, got {}", next.len(), colors.len()));
    }
    if let Some(i) = colors.iter().position(|&c| c < 0) {
        return Err(format!("node {} has negative color {}", i, colors[i]));
    }

    let conflicts: Vec<ColorConflict> = next
        .iter()
        .enumerate()
        .filter(|&(i, &s)| colors[i] == colors[s])
        .map(|(i, &s)| (i, colors[i], s, colors[s]))
        .collect();
    if !conflicts.is_empty() {
        return Err(format!(
            "{} adjacent pair(s) share a color (node, color, successor, color): {}",
            conflicts.len(),
            preview(&conflicts)
        ));
    }

    let mut distinct: Vec<i64> = colors.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    Ok(distinct.len())
}

fn validate_hull(expected: &[Point], actual: &[Point], tolerance: f64) -> ValidationOutcome {
    let actual = canonicalize(actual);
    match compare_canonical(expected, &actual, tolerance) {
        HullComparison::Match { distance } => ValidationOutcome {
            hull_distance: Some(distance),
            ..ValidationOutcome::pass()
        },
        HullComparison::CountMismatch { expected: e, actual: a } => ValidationOutcome::fail(
            format!("{} canonical vertices", e),
            format!("{} canonical vertices", a),
            "hull vertex count differs",
        ),
        HullComparison::Drift { distance, tolerance } => ValidationOutcome {
            hull_distance: Some(distance),
            ..ValidationOutcome::fail(
                preview(expected),
                preview(&actual),
                format!("hull distance {:.6} exceeds tolerance {}", distance, tolerance),
            )
        },
    }
}

/// Compare a decoded solver answer with the ground truth.
///
/// Hull answers may be an unordered union of both half-hulls; they are
/// canonicalized here before comparison.
pub fn validate(truth: &GroundTruth, answer: &Answer, policy: &ValidationPolicy) -> ValidationOutcome {
    match (truth, answer) {
        (GroundTruth::Scalar { value: expected }, Answer::Scalar { value }) => {
            if expected == value {
                ValidationOutcome::pass()
            } else {
                ValidationOutcome::fail(expected.to_string(), value.to_string(), "scalar differs")
            }
        }
        (GroundTruth::Index { index }, Answer::Scalar { value }) => {
            let expected = index.map(|i| i as i64).unwrap_or(-1);
            if expected == *value {
                ValidationOutcome::pass()
            } else {
                ValidationOutcome::fail(expected.to_string(), value.to_string(), "search index differs")
            }
        }
        (GroundTruth::Sequence { values: expected }, Answer::Sequence { values }) => {
            if expected == values {
                return ValidationOutcome::pass();
            }
            let detail = if expected.len() != values.len() {
                format!("length {} != {}", values.len(), expected.len())
            } else {
                let at = expected
                    .iter()
                    .zip(values)
                    .position(|(a, b)| a != b)
                    .unwrap_or(0);
                format!("first difference at position {}: expected {}, got {}", at, expected[at], values[at])
            };
            ValidationOutcome::fail(preview(expected), preview(values), detail)
        }
        (GroundTruth::ProperColoring { next }, Answer::Sequence { values }) => match check_coloring(next, values) {
            Ok(colors) => ValidationOutcome {
                colors_used: Some(colors),
                ..ValidationOutcome::pass()
            },
            Err(detail) => ValidationOutcome::fail("proper coloring", preview(values), detail),
        },
        (GroundTruth::Hull { vertices }, Answer::Points { points }) => {
            validate_hull(vertices, points, policy.hull_tolerance)
        }
        (truth, answer) => ValidationOutcome::fail(
            truth_kind(truth),
            describe_answer(answer),
            "answer shape does not match the family",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_equality() {
        let truth = GroundTruth::Scalar { value: 9 };
        let policy = ValidationPolicy::default();
        assert!(validate(&truth, &Answer::Scalar { value: 9 }, &policy).passed);
        let out = validate(&truth, &Answer::Scalar { value: 8 }, &policy);
        assert!(!out.passed);
        assert_eq!(out.mismatch.unwrap().expected, "9");
    }

    #[test]
    fn test_search_not_found_maps_to_minus_one() {
        let policy = ValidationPolicy::default();
        let truth = GroundTruth::Index { index: None };
        assert!(validate(&truth, &Answer::Scalar { value: -1 }, &policy).passed);
        assert!(!validate(&truth, &Answer::Scalar { value: 0 }, &policy).passed);
        let found = GroundTruth::Index { index: Some(3) };
        assert!(validate(&found, &Answer::Scalar { value: 3 }, &policy).passed);
    }

    #[test]
    fn test_sequence_reports_first_difference() {
        let truth = GroundTruth::Sequence {
            values: vec![1, 2, 3, 4],
        };
        let out = validate(
            &truth,
            &Answer::Sequence {
                values: vec![1, 2, 4, 3],
            },
            &ValidationPolicy::default(),
        );
        assert!(!out.passed);
        assert!(out.mismatch.unwrap().detail.contains("position 2"));
    }

    #[test]
    fn test_coloring_valid_and_invalid() {
        let next = vec![1, 2, 3, 0];
        assert_eq!(check_coloring(&next, &[0, 1, 0, 1]), Ok(2));
        assert!(check_coloring(&next, &[0, 0, 1, 2]).is_err());
        assert!(check_coloring(&next, &[0, 1, 0]).is_err());
        assert!(check_coloring(&next, &[0, -1, 0, 1]).is_err());
    }

    #[test]
    fn test_coloring_outcome_reports_colors() {
        let truth = GroundTruth::ProperColoring { next: vec![1, 2, 0] };
        let out = validate(
            &truth,
            &Answer::Sequence {
                values: vec![0, 1, 2],
            },
            &ValidationPolicy::default(),
        );
        assert!(out.passed);
        assert_eq!(out.colors_used, Some(3));
    }

    #[test]
    fn test_hull_with_small_drift_passes() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let truth = GroundTruth::Hull {
            vertices: canonicalize(&square),
        };
        let jittered: Vec<Point> = square.iter().map(|p| Point::new(p.x + 1e-6, p.y)).collect();
        let out = validate(&truth, &Answer::Points { points: jittered }, &ValidationPolicy::default());
        assert!(out.passed);
        assert!(out.hull_distance.unwrap() < 1e-3);
    }

    #[test]
    fn test_hull_missing_vertex_fails_even_with_huge_tolerance() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let truth = GroundTruth::Hull {
            vertices: canonicalize(&square),
        };
        let policy = ValidationPolicy {
            hull_tolerance: 1e9,
        };
        let out = validate(
            &truth,
            &Answer::Points {
                points: square[..3].to_vec(),
            },
            &policy,
        );
        assert!(!out.passed);
        assert_eq!(out.mismatch.unwrap().detail, "hull vertex count differs");
    }

    #[test]
    fn test_degenerate_hulls_agree() {
        let truth = GroundTruth::Hull { vertices: vec![] };
        let out = validate(
            &truth,
            &Answer::Points {
                points: vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            },
            &ValidationPolicy::default(),
        );
        assert!(out.passed);
    }

    #[test]
    fn test_collinear_answer_matches_empty_hull() {
        let truth = GroundTruth::Hull { vertices: vec![] };
        let points = (0..4).map(|i| Point::new(i as f64, 2.0 * i as f64 + 1.0)).collect();
        let out = validate(&truth, &Answer::Points { points }, &ValidationPolicy::default());
        assert!(out.passed);
    }

    #[test]
    fn test_shape_mismatch_fails() {
        let out = validate(
            &GroundTruth::Scalar { value: 1 },
            &Answer::Sequence { values: vec![1] },
            &ValidationPolicy::default(),
        );
        assert!(!out.passed);
    }
}
