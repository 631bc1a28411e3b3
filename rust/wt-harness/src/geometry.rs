//! Planar geometry for the upper-hull family.
//!
//! Two independently produced point lists (the reference hull and the
//! reconciled solver half-hulls) have no shared start vertex or winding, so
//! both are brought into a canonical form before comparison:
//! 1. Drop exactly-equal duplicates
//! 2. Sort by angle around the centroid
//! 3. Close the polygon by repeating the first vertex
//!
//! Canonical hulls are then compared position-wise under a distance tolerance.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Default tolerance for canonical hull comparison, in input coordinate units.
pub const DEFAULT_HULL_TOLERANCE: f64 = 0.1;

/// A point in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Mirror across the x-axis.
    pub fn reflect_y(self) -> Self {
        Point {
            x: self.x,
            y: -self.y,
        }
    }

    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Lexicographic (x, then y) total order on points.
fn lex_cmp(a: &Point, b: &Point) -> Ordering {
    a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y))
}

/// Cross product of (b - a) x (c - a). Positive for a counter-clockwise turn.
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Sort points lexicographically and drop exact duplicates.
pub fn dedup_points(points: &[Point]) -> Vec<Point> {
    let mut sorted = points.to_vec();
    sorted.sort_by(lex_cmp);
    sorted.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    sorted
}

/// Relative distance from the line below which a point counts as on it.
const COLLINEAR_EPS: f64 = 1e-9;

/// True when every point lies within [`COLLINEAR_EPS`] (relative to the
/// longest span from the first point) of one line.
fn all_collinear(points: &[Point]) -> bool {
    let Some(&a) = points.first() else {
        return true;
    };
    let b = points
        .iter()
        .copied()
        .max_by(|p, q| a.distance_sq(*p).total_cmp(&a.distance_sq(*q)))
        .unwrap_or(a);
    let span_sq = a.distance_sq(b);
    if span_sq == 0.0 {
        return true;
    }
    // |cross| is the distance from the line times |b - a|.
    points.iter().all(|&p| cross(a, b, p).abs() <= COLLINEAR_EPS * span_sq)
}

/// Reflect every point across the x-axis.
pub fn reflect_all(points: &[Point]) -> Vec<Point> {
    points.iter().map(|p| p.reflect_y()).collect()
}

/// Canonical closed polygon for an unordered vertex set.
///
/// Fewer than three distinct points, or points that all lie on one line,
/// cannot bound an area and canonicalize to the empty hull.
pub fn canonicalize(points: &[Point]) -> Vec<Point> {
    let mut unique = dedup_points(points);
    if unique.len() < 3 || all_collinear(&unique) {
        return Vec::new();
    }

    let n = unique.len() as f64;
    let cx = unique.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = unique.iter().map(|p| p.y).sum::<f64>() / n;

    unique.sort_by(|a, b| {
        let ta = (a.y - cy).atan2(a.x - cx);
        let tb = (b.y - cy).atan2(b.x - cx);
        ta.total_cmp(&tb).then_with(|| lex_cmp(a, b))
    });

    let first = unique[0];
    unique.push(first);
    unique
}

/// Merge an upper half-hull and a lower half-hull into one canonical polygon.
///
/// The lower half is expected in original (un-reflected) coordinates.
pub fn reconcile_half_hulls(upper: &[Point], lower: &[Point]) -> Vec<Point> {
    let mut all = Vec::with_capacity(upper.len() + lower.len());
    all.extend_from_slice(upper);
    all.extend_from_slice(lower);
    canonicalize(&all)
}

/// Exact convex hull (Andrew's monotone chain), counter-clockwise, without
/// collinear boundary points.
///
/// Returns an empty vector when the input has fewer than three distinct
/// points or all points are collinear.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let pts = dedup_points(points);
    if pts.len() < 3 {
        return Vec::new();
    }

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return Vec::new();
    }
    lower
}

/// Upper boundary chain of the convex hull, ordered by increasing x.
///
/// This is the half-hull a solver is asked for; the harness uses it to build
/// reference answers and in-process solvers.
pub fn upper_hull(points: &[Point]) -> Vec<Point> {
    let pts = dedup_points(points);
    if pts.len() < 2 {
        return pts;
    }
    let mut chain: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while chain.len() >= 2 && cross(chain[chain.len() - 2], chain[chain.len() - 1], p) >= 0.0 {
            chain.pop();
        }
        chain.push(p);
    }
    chain
}

/// Result of comparing two canonical hulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HullComparison {
    /// Same vertex count and position-wise distance within tolerance.
    Match { distance: f64 },
    /// Vertex counts differ. Always a hard failure.
    CountMismatch { expected: usize, actual: usize },
    /// Same vertex count but vertices drifted beyond the tolerance.
    Drift { distance: f64, tolerance: f64 },
}

impl HullComparison {
    pub fn is_match(&self) -> bool {
        matches!(self, HullComparison::Match { .. })
    }
}

/// Euclidean norm of the position-wise difference of two equal-length
/// point sequences.
pub fn positionwise_distance(a: &[Point], b: &[Point]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| p.distance_sq(*q))
        .sum::<f64>()
        .sqrt()
}

/// Compare two canonical hulls under `tolerance`.
pub fn compare_canonical(expected: &[Point], actual: &[Point], tolerance: f64) -> HullComparison {
    if expected.len() != actual.len() {
        return HullComparison::CountMismatch {
            expected: expected.len(),
            actual: actual.len(),
        };
    }
    let distance = positionwise_distance(expected, actual);
    if distance < tolerance {
        HullComparison::Match { distance }
    } else {
        HullComparison::Drift {
            distance,
            tolerance,
        }
    }
}
