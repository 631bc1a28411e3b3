//! Sweep plans and run configuration.
//!
//! A sweep is a list of segments, each written `START..END[:STEP][@TRIALS]`
//! with an exclusive end, e.g. `10..99:3@80`. A bare number `N` is a single
//! point. Default plans mirror the long-standing test scripts for each
//! family.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::family::{AlgorithmFamily, DEFAULT_SEARCH_SIZE};
use crate::validator::ValidationPolicy;

/// Trials per point for families swept at a single size.
pub const DEFAULT_TRIALS: usize = 1000;

/// Problem size for single-point families when none is given.
pub const DEFAULT_SIZE: usize = 100;

/// One contiguous range of parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSegment {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub step: usize,
    /// Trials per point; `None` falls back to the run-wide default.
    pub trials: Option<usize>,
}

impl SweepSegment {
    pub fn new(start: usize, end: usize, step: usize, trials: usize) -> Self {
        SweepSegment {
            start,
            end,
            step,
            trials: Some(trials),
        }
    }

    /// A single parameter value.
    pub fn single(value: usize, trials: usize) -> Self {
        SweepSegment::new(value, value + 1, 1, trials)
    }

    pub fn parameters(&self) -> impl Iterator<Item = usize> {
        (self.start..self.end).step_by(self.step.max(1))
    }
}

impl fmt::Display for SweepSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}:{}", self.start, self.end, self.step)?;
        if let Some(t) = self.trials {
            write!(f, "@{}", t)?;
        }
        Ok(())
    }
}

impl FromStr for SweepSegment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (range, trials) = match s.split_once('@') {
            Some((r, t)) => {
                let trials = t
                    .parse::<usize>()
                    .map_err(|_| format!("invalid trial count '{}' in '{}'", t, s))?;
                (r, Some(trials))
            }
            None => (s, None),
        };
        let (range, step) = match range.split_once(':') {
            Some((r, st)) => {
                let step = st
                    .parse::<usize>()
                    .map_err(|_| format!("invalid step '{}' in '{}'", st, s))?;
                (r, step)
            }
            None => (range, 1),
        };
        let (start, end) = match range.split_once("..") {
            Some((a, b)) => {
                let start = a
                    .parse::<usize>()
                    .map_err(|_| format!("invalid start '{}' in '{}'", a, s))?;
                let end = b
                    .parse::<usize>()
                    .map_err(|_| format!("invalid end '{}' in '{}'", b, s))?;
                (start, end)
            }
            None => {
                let v = range
                    .parse::<usize>()
                    .map_err(|_| format!("invalid sweep value '{}'", s))?;
                (v, v.saturating_add(1))
            }
        };

        if start == 0 {
            return Err(format!("sweep '{}' must start above zero", s));
        }
        if end <= start {
            return Err(format!("sweep '{}' is empty (end must exceed start)", s));
        }
        if step == 0 {
            return Err(format!("sweep '{}' has a zero step", s));
        }
        if trials == Some(0) {
            return Err(format!("sweep '{}' has zero trials", s));
        }

        Ok(SweepSegment {
            start,
            end,
            step,
            trials,
        })
    }
}

/// Ordered list of segments making up one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub segments: Vec<SweepSegment>,
}

impl SweepPlan {
    pub fn new(segments: Vec<SweepSegment>) -> Self {
        SweepPlan { segments }
    }

    /// Default plan for a family.
    ///
    /// Hull sweeps `n` densely over small sizes and sparsely up to 4500;
    /// p-ary search sweeps the fan-out `p` from 1 to 3000 at a fixed `n`;
    /// the rest test a single size many times.
    pub fn default_for(family: AlgorithmFamily, size: usize) -> Self {
        match family {
            AlgorithmFamily::UpperHull => SweepPlan::new(vec![
                SweepSegment::new(10, 99, 3, 80),
                SweepSegment::new(100, 4500, 250, 20),
            ]),
            AlgorithmFamily::PArySearch => SweepPlan::new(vec![
                SweepSegment::new(1, 300, 1, 200),
                SweepSegment::new(301, 1000, 10, 200),
                SweepSegment::new(1001, 3000, 80, 200),
            ]),
            _ => SweepPlan::new(vec![SweepSegment::single(size, DEFAULT_TRIALS)]),
        }
    }

    /// Every `(parameter, trials)` pair in sweep order.
    pub fn points(&self, default_trials: usize) -> Vec<(usize, usize)> {
        self.segments
            .iter()
            .flat_map(|seg| {
                let trials = seg.trials.unwrap_or(default_trials);
                seg.parameters().map(move |p| (p, trials))
            })
            .collect()
    }

    pub fn total_trials(&self, default_trials: usize) -> usize {
        self.points(default_trials).iter().map(|&(_, t)| t).sum()
    }
}

/// Everything a sweep needs besides the solver itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub family: AlgorithmFamily,
    pub plan: SweepPlan,
    /// Trials for segments that do not name their own count.
    pub default_trials: usize,
    /// Fixed `n` for the p-ary search family.
    pub search_size: usize,
    pub policy: ValidationPolicy,
    /// Per-invocation solver timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Where perf logs, reports, and failure diagnostics go. `None` keeps
    /// everything in memory.
    pub output_dir: Option<PathBuf>,
    /// RNG seed; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl HarnessConfig {
    pub fn new(family: AlgorithmFamily) -> Self {
        HarnessConfig {
            family,
            plan: SweepPlan::default_for(family, DEFAULT_SIZE),
            default_trials: DEFAULT_TRIALS,
            search_size: DEFAULT_SEARCH_SIZE,
            policy: ValidationPolicy::default(),
            timeout: None,
            output_dir: None,
            seed: None,
        }
    }

    /// Reject configurations that cannot produce a meaningful sweep.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.plan.segments.is_empty() {
            return Err(HarnessError::Config("sweep plan has no segments".to_string()));
        }
        if self.default_trials == 0 {
            return Err(HarnessError::Config("trial count must be positive".to_string()));
        }
        if self.search_size == 0 {
            return Err(HarnessError::Config("search size must be positive".to_string()));
        }
        if !(self.policy.hull_tolerance.is_finite() && self.policy.hull_tolerance > 0.0) {
            return Err(HarnessError::Config(format!(
                "hull tolerance must be a positive number, got {}",
                self.policy.hull_tolerance
            )));
        }
        if self.family == AlgorithmFamily::PArySearch {
            if let Some(seg) = self.plan.segments.iter().find(|s| s.end > u32::MAX as usize) {
                return Err(HarnessError::Config(format!("fan-out range {} is too large", seg)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_segment() {
        let seg: SweepSegment = "10..99:3@80".parse().unwrap();
        assert_eq!(seg, SweepSegment::new(10, 99, 3, 80));
        assert_eq!(seg.parameters().take(3).collect::<Vec<_>>(), vec![10, 13, 16]);
        assert_eq!(seg.parameters().last(), Some(97));
    }

    #[test]
    fn test_parse_defaults() {
        let seg: SweepSegment = "5..8".parse().unwrap();
        assert_eq!(seg.step, 1);
        assert_eq!(seg.trials, None);
        let single: SweepSegment = "42@7".parse().unwrap();
        assert_eq!(single, SweepSegment::single(42, 7));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "0..10", "10..5", "1..10:0", "1..10@0", "a..b", "1..10:x", "1..10@y"] {
            assert!(bad.parse::<SweepSegment>().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_display_round_trip() {
        let seg = SweepSegment::new(100, 4500, 250, 20);
        assert_eq!(seg.to_string().parse::<SweepSegment>().unwrap(), seg);
    }

    #[test]
    fn test_default_hull_plan() {
        let plan = SweepPlan::default_for(AlgorithmFamily::UpperHull, 0);
        let points = plan.points(1);
        assert_eq!(points.first(), Some(&(10, 80)));
        assert!(points.contains(&(97, 80)));
        assert!(points.contains(&(100, 20)));
        assert_eq!(points.last(), Some(&(4350, 20)));
    }

    #[test]
    fn test_default_search_plan_covers_fan_outs() {
        let plan = SweepPlan::default_for(AlgorithmFamily::PArySearch, 0);
        let points = plan.points(1);
        assert_eq!(points[0], (1, 200));
        assert_eq!(points[298], (299, 200));
        assert_eq!(points[299], (301, 200));
        assert!(points.iter().all(|&(p, _)| p < 3000));
    }

    #[test]
    fn test_single_point_plan_uses_size() {
        let plan = SweepPlan::default_for(AlgorithmFamily::Merge, 64);
        assert_eq!(plan.points(1), vec![(64, DEFAULT_TRIALS)]);
    }

    #[test]
    fn test_segment_without_trials_uses_default() {
        let plan = SweepPlan::new(vec!["3..5".parse().unwrap()]);
        assert_eq!(plan.points(9), vec![(3, 9), (4, 9)]);
        assert_eq!(plan.total_trials(9), 18);
    }

    #[test]
    fn test_config_validation() {
        let mut config = HarnessConfig::new(AlgorithmFamily::UpperHull);
        assert!(config.validate().is_ok());
        config.policy.hull_tolerance = 0.0;
        assert!(config.validate().is_err());
        config.policy.hull_tolerance = 0.1;
        config.plan = SweepPlan::new(vec![]);
        assert!(config.validate().is_err());
    }
}
