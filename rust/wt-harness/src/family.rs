//! Algorithm families and the data that flows through one trial.
//!
//! Every family shares the same pipeline; only the instance shape, the
//! answer shape, and the comparison rule differ.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Problem size used by the p-ary search family, whose sweep varies the
/// fan-out instead of `n`.
pub const DEFAULT_SEARCH_SIZE: usize = 10_000;

/// The algorithm families the harness knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmFamily {
    /// Traverse a circular successor list starting at index 0.
    CircularList,
    /// Color the nodes of a circular list so adjacent nodes differ.
    Coloring,
    /// Maximum of a list of distinct values.
    Maximum,
    /// Merge two sorted disjoint lists.
    Merge,
    /// Search a sorted list with fan-out `p`.
    PArySearch,
    /// Upper half-hull of a planar point set.
    UpperHull,
}

impl AlgorithmFamily {
    pub const ALL: [AlgorithmFamily; 6] = [
        AlgorithmFamily::CircularList,
        AlgorithmFamily::Coloring,
        AlgorithmFamily::Maximum,
        AlgorithmFamily::Merge,
        AlgorithmFamily::PArySearch,
        AlgorithmFamily::UpperHull,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmFamily::CircularList => "circ-list",
            AlgorithmFamily::Coloring => "coloring",
            AlgorithmFamily::Maximum => "maximum",
            AlgorithmFamily::Merge => "merge",
            AlgorithmFamily::PArySearch => "p-ary-search",
            AlgorithmFamily::UpperHull => "upper-hull",
        }
    }

    /// What the sweep parameter means for this family.
    pub fn parameter_name(self) -> &'static str {
        match self {
            AlgorithmFamily::PArySearch => "p",
            _ => "n",
        }
    }

    /// Shape of the answer the solver is expected to print.
    pub fn answer_shape(self) -> AnswerShape {
        match self {
            AlgorithmFamily::Maximum | AlgorithmFamily::PArySearch => AnswerShape::Scalar,
            AlgorithmFamily::CircularList | AlgorithmFamily::Coloring | AlgorithmFamily::Merge => {
                AnswerShape::Sequence
            }
            AlgorithmFamily::UpperHull => AnswerShape::Points,
        }
    }
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        AlgorithmFamily::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = AlgorithmFamily::ALL.iter().map(|f| f.name()).collect();
                format!("unknown family '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Expected leading answer shape in a solver response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    /// A single integer token.
    Scalar,
    /// A bracketed list of integers.
    Sequence,
    /// A count followed by that many `{ x y }` records.
    Points,
}

/// One randomly generated problem instance. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Instance {
    /// Successor function of a single cycle through `0..n`.
    CircularList { next: Vec<usize> },
    /// Pairwise distinct values in permuted order.
    Values { values: Vec<i64> },
    /// Two sorted, mutually disjoint lists.
    Merge { a: Vec<i64>, b: Vec<i64> },
    /// Strictly increasing list, a query key, and the solver fan-out.
    Search { values: Vec<i64>, key: i64, fan_out: u32 },
    /// Distinct points in the plane.
    Points { points: Vec<Point> },
}

impl Instance {
    /// Number of elements (nodes, values, or points) in the instance.
    pub fn len(&self) -> usize {
        match self {
            Instance::CircularList { next } => next.len(),
            Instance::Values { values } => values.len(),
            Instance::Merge { a, b } => a.len() + b.len(),
            Instance::Search { values, .. } => values.len(),
            Instance::Points { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the invariants the oracle relies on for an instance that did
    /// not come from the generator (a diagnostic loaded from disk).
    ///
    /// A circular list must be one cycle through `0..n`, and the instance
    /// kind must belong to `family`.
    pub fn check_well_formed(&self, family: AlgorithmFamily) -> Result<(), String> {
        let kind_fits = matches!(
            (family, self),
            (AlgorithmFamily::CircularList | AlgorithmFamily::Coloring, Instance::CircularList { .. })
                | (AlgorithmFamily::Maximum, Instance::Values { .. })
                | (AlgorithmFamily::Merge, Instance::Merge { .. })
                | (AlgorithmFamily::PArySearch, Instance::Search { .. })
                | (AlgorithmFamily::UpperHull, Instance::Points { .. })
        );
        if !kind_fits {
            return Err(format!("instance kind does not belong to family {}", family));
        }

        if let Instance::CircularList { next } = self {
            let n = next.len();
            if let Some((i, &s)) = next.iter().enumerate().find(|&(_, &s)| s >= n) {
                return Err(format!("successor {} of node {} is out of range 0..{}", s, i, n));
            }
            let mut seen = vec![false; n];
            let mut cur = 0usize;
            for _ in 0..n {
                if seen[cur] {
                    return Err("successor list is not a single cycle".to_string());
                }
                seen[cur] = true;
                cur = next[cur];
            }
            if n > 0 && cur != 0 {
                return Err("successor list is not a single cycle".to_string());
            }
        }
        Ok(())
    }
}

/// The trusted answer computed by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GroundTruth {
    Scalar { value: i64 },
    /// Index of the key, or `None` when absent.
    Index { index: Option<usize> },
    Sequence { values: Vec<i64> },
    /// Any coloring where `color[i] != color[next[i]]` is correct.
    ProperColoring { next: Vec<usize> },
    /// Canonical closed polygon; empty for degenerate inputs.
    Hull { vertices: Vec<Point> },
}

/// The structured answer decoded from a solver response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Answer {
    Scalar { value: i64 },
    Sequence { values: Vec<i64> },
    Points { points: Vec<Point> },
}

/// Work/span counters reported by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Total elementary operations.
    pub work: f64,
    /// Critical-path length.
    pub span: f64,
}

impl Metrics {
    pub fn new(work: f64, span: f64) -> Self {
        Metrics { work, span }
    }

    /// A parallel execution can never have a longer critical path than its
    /// total work; a report saying otherwise needs a human look.
    pub fn is_anomalous(&self) -> bool {
        self.span > self.work
    }
}

impl std::ops::Add for Metrics {
    type Output = Metrics;

    fn add(self, rhs: Metrics) -> Metrics {
        Metrics {
            work: self.work + rhs.work,
            span: self.span + rhs.span,
        }
    }
}

/// Decoded solver output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResponse {
    pub answer: Answer,
    pub metrics: Metrics,
}
