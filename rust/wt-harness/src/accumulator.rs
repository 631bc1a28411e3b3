//! Work/span accumulation per sweep parameter.
//!
//! A [`PointAccumulator`] holds running sums for one parameter value while
//! its trials run; [`PointAccumulator::finish`] normalizes them into a
//! [`SeriesPoint`]. Finished points are appended to a [`PerformanceSeries`],
//! which is what gets written out at the end of a sweep.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::family::{AlgorithmFamily, Metrics};

/// Failed trials broken down by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCounts {
    pub generation: usize,
    pub execution: usize,
    pub protocol: usize,
    pub mismatch: usize,
}

impl FailureCounts {
    pub fn record(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Generation => self.generation += 1,
            FailureKind::Execution => self.execution += 1,
            FailureKind::Protocol => self.protocol += 1,
            FailureKind::Mismatch => self.mismatch += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.generation + self.execution + self.protocol + self.mismatch
    }

    pub fn merge(&mut self, other: &FailureCounts) {
        self.generation += other.generation;
        self.execution += other.execution;
        self.protocol += other.protocol;
        self.mismatch += other.mismatch;
    }
}

/// Running totals for one parameter value.
#[derive(Debug, Clone)]
pub struct PointAccumulator {
    parameter: usize,
    trials: usize,
    samples: usize,
    work_sum: f64,
    span_sum: f64,
    work_min: f64,
    work_max: f64,
    anomalies: usize,
    failures: FailureCounts,
}

impl PointAccumulator {
    pub fn new(parameter: usize) -> Self {
        PointAccumulator {
            parameter,
            trials: 0,
            samples: 0,
            work_sum: 0.0,
            span_sum: 0.0,
            work_min: f64::INFINITY,
            work_max: f64::NEG_INFINITY,
            anomalies: 0,
            failures: FailureCounts::default(),
        }
    }

    pub fn parameter(&self) -> usize {
        self.parameter
    }

    /// Record a trial that passed validation.
    pub fn record_sample(&mut self, metrics: Metrics) {
        self.trials += 1;
        self.samples += 1;
        self.work_sum += metrics.work;
        self.span_sum += metrics.span;
        self.work_min = self.work_min.min(metrics.work);
        self.work_max = self.work_max.max(metrics.work);
        if metrics.is_anomalous() {
            self.anomalies += 1;
            log::warn!(
                "point {}: reported span {} exceeds work {}",
                self.parameter,
                metrics.span,
                metrics.work
            );
        }
    }

    /// Record a trial that produced no sample.
    pub fn record_failure(&mut self, kind: FailureKind) {
        self.trials += 1;
        self.failures.record(kind);
    }

    /// Normalize the running sums into means.
    pub fn finish(self) -> SeriesPoint {
        let (mean_work, mean_span, min_work, max_work) = if self.samples == 0 {
            (None, None, None, None)
        } else {
            let n = self.samples as f64;
            (
                Some(self.work_sum / n),
                Some(self.span_sum / n),
                Some(self.work_min),
                Some(self.work_max),
            )
        };
        SeriesPoint {
            parameter: self.parameter,
            trials: self.trials,
            samples: self.samples,
            mean_work,
            mean_span,
            min_work,
            max_work,
            anomalies: self.anomalies,
            failures: self.failures,
        }
    }
}

/// Aggregated statistics for one parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub parameter: usize,
    /// Trials attempted.
    pub trials: usize,
    /// Trials that passed and contributed metrics.
    pub samples: usize,
    /// Mean work over samples; `None` when no trial passed.
    pub mean_work: Option<f64>,
    pub mean_span: Option<f64>,
    pub min_work: Option<f64>,
    pub max_work: Option<f64>,
    /// Samples whose span exceeded their work.
    pub anomalies: usize,
    pub failures: FailureCounts,
}

impl SeriesPoint {
    /// Perf-log line `parameter mean-work mean-span`, or `None` if the point
    /// has no samples.
    pub fn perf_line(&self) -> Option<String> {
        match (self.mean_work, self.mean_span) {
            (Some(w), Some(s)) => Some(format!("{} {:.6} {:.6}", self.parameter, w, s)),
            _ => None,
        }
    }
}

/// Ordered `(parameter, mean work, mean span)` series for one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSeries {
    pub family: AlgorithmFamily,
    pub points: Vec<SeriesPoint>,
}

impl PerformanceSeries {
    pub fn new(family: AlgorithmFamily) -> Self {
        PerformanceSeries {
            family,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        self.points.push(point);
    }

    /// `(parameter, mean work)` for points with samples, e.g. for plotting.
    pub fn work_series(&self) -> Vec<(usize, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.mean_work.map(|w| (p.parameter, w)))
            .collect()
    }

    /// `(parameter, mean span)` for points with samples.
    pub fn span_series(&self) -> Vec<(usize, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.mean_span.map(|s| (p.parameter, s)))
            .collect()
    }

    pub fn failures(&self) -> FailureCounts {
        let mut total = FailureCounts::default();
        for p in &self.points {
            total.merge(&p.failures);
        }
        total
    }

    pub fn anomalies(&self) -> usize {
        self.points.iter().map(|p| p.anomalies).sum()
    }

    pub fn trials(&self) -> usize {
        self.points.iter().map(|p| p.trials).sum()
    }

    /// Perf log contents, one line per point that has samples.
    pub fn perf_log(&self) -> String {
        let mut out = String::new();
        for line in self.points.iter().filter_map(|p| p.perf_line()) {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}
