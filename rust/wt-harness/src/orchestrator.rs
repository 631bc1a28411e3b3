//! Sweep driver: generate, solve, validate, accumulate.
//!
//! Trials run strictly one after another. A failing trial is counted and, if
//! an output directory is configured, written out as a diagnostic file; the
//! sweep always moves on. Only a solver that cannot be launched at all stops
//! the run.

use std::path::PathBuf;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::accumulator::{PerformanceSeries, PointAccumulator, SeriesPoint};
use crate::config::HarnessConfig;
use crate::error::{FailureKind, HarnessError, TrialError};
use crate::family::{AlgorithmFamily, Answer, AnswerShape, Instance, SolverResponse};
use crate::generator;
use crate::geometry::{reconcile_half_hulls, reflect_all, Point};
use crate::oracle;
use crate::report::{CRATE_VERSION, SCHEMA_VERSION};
use crate::solver::Solver;
use crate::validator::{validate, ValidationOutcome, ValidationPolicy};
use crate::wire;

/// A validated solver answer.
#[derive(Debug, Clone)]
pub struct TrialPass {
    pub response: SolverResponse,
    pub validation: ValidationOutcome,
}

/// Everything observed during one trial.
#[derive(Debug)]
pub struct TrialRun {
    pub instance: Instance,
    /// Every input sent to the solver, one per invocation.
    pub encoded_inputs: Vec<String>,
    /// Every raw output received, one per successful invocation.
    pub raw_outputs: Vec<String>,
    pub result: Result<TrialPass, TrialError>,
}

impl TrialRun {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Durable record of a failed trial, sufficient to replay it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub family: AlgorithmFamily,
    pub parameter: usize,
    pub trial: usize,
    pub kind: FailureKind,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub instance: Instance,
    pub encoded_inputs: Vec<String>,
    pub raw_outputs: Vec<String>,
}

fn short(text: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Invoke the solver once and decode its response.
fn solve_once<S: Solver>(
    solver: &mut S,
    input: String,
    shape: AnswerShape,
    inputs: &mut Vec<String>,
    outputs: &mut Vec<String>,
) -> Result<SolverResponse, TrialError> {
    let result = solver.invoke(&input);
    inputs.push(input);
    let raw = match result {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!(
                "EXEC FAILED: {} (input: {}, output: {})",
                e,
                short(inputs.last().map(String::as_str).unwrap_or("")),
                short(&e.raw_output().unwrap_or_default())
            );
            if let Some(out) = e.raw_output() {
                outputs.push(out);
            }
            return Err(TrialError::Execution(e));
        }
    };
    let decoded = wire::decode_response(shape, &raw);
    outputs.push(raw);
    decoded.map_err(|e| {
        log::warn!(
            "malformed solver output: {} (output: {})",
            e,
            short(outputs.last().map(String::as_str).unwrap_or(""))
        );
        TrialError::Protocol(e)
    })
}

/// Solve the upper hull of the points and of their mirror image, and return
/// the reconciled polygon with the summed metrics.
fn solve_hull<S: Solver>(
    solver: &mut S,
    points: &[Point],
    inputs: &mut Vec<String>,
    outputs: &mut Vec<String>,
) -> Result<SolverResponse, TrialError> {
    let upper = solve_once(solver, wire::encode_points(points), AnswerShape::Points, inputs, outputs)?;
    let mirrored = reflect_all(points);
    let lower = solve_once(solver, wire::encode_points(&mirrored), AnswerShape::Points, inputs, outputs)?;

    let upper_chain = match upper.answer {
        Answer::Points { points } => points,
        _ => Vec::new(),
    };
    let lower_chain = match lower.answer {
        Answer::Points { points } => reflect_all(&points),
        _ => Vec::new(),
    };

    Ok(SolverResponse {
        answer: Answer::Points {
            points: reconcile_half_hulls(&upper_chain, &lower_chain),
        },
        metrics: upper.metrics + lower.metrics,
    })
}

/// Run one trial on a given instance. Does not touch any sweep state, so it
/// is also how stored failures are replayed.
pub fn run_trial<S: Solver>(
    family: AlgorithmFamily,
    instance: Instance,
    solver: &mut S,
    policy: &ValidationPolicy,
) -> TrialRun {
    let mut encoded_inputs = Vec::new();
    let mut raw_outputs = Vec::new();

    let response = match &instance {
        Instance::Points { points } => solve_hull(solver, points, &mut encoded_inputs, &mut raw_outputs),
        other => solve_once(
            solver,
            wire::encode_instance(other),
            family.answer_shape(),
            &mut encoded_inputs,
            &mut raw_outputs,
        ),
    };

    let result = response.and_then(|response| {
        let truth = oracle::ground_truth(&instance, family == AlgorithmFamily::Coloring);
        let validation = validate(&truth, &response.answer, policy);
        match &validation.mismatch {
            Some(mismatch) if !validation.passed => {
                log::warn!(
                    "WRONG ANSWER ({}): expected {}, got {} [{}] input: {}",
                    family,
                    mismatch.expected,
                    mismatch.actual,
                    mismatch.detail,
                    short(encoded_inputs.first().map(String::as_str).unwrap_or(""))
                );
                Err(TrialError::Mismatch(mismatch.clone()))
            }
            _ => Ok(TrialPass { response, validation }),
        }
    });

    TrialRun {
        instance,
        encoded_inputs,
        raw_outputs,
        result,
    }
}

/// Writes failure diagnostics and keeps the fault counter.
#[derive(Debug)]
pub struct FaultRecorder {
    dir: Option<PathBuf>,
    count: usize,
    files: Vec<PathBuf>,
    retained: Vec<Diagnostic>,
}

impl FaultRecorder {
    /// With a directory, diagnostics go to disk; without one they stay in
    /// memory.
    pub fn new(dir: Option<PathBuf>) -> Self {
        FaultRecorder {
            dir,
            count: 0,
            files: Vec::new(),
            retained: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        let index = self.count;
        self.count += 1;
        let Some(dir) = &self.dir else {
            self.retained.push(diagnostic);
            return;
        };
        let path = dir.join(format!("{}_fail_{}.json", diagnostic.family, index));
        match serde_json::to_string_pretty(&diagnostic) {
            Ok(json) => match std::fs::write(&path, json) {
                Ok(()) => self.files.push(path),
                Err(e) => log::error!("failed to write {}: {}", path.display(), e),
            },
            Err(e) => log::error!("failed to serialize diagnostic: {}", e),
        }
    }
}

/// Result of a complete sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub schema_version: String,
    pub crate_version: String,
    pub family: AlgorithmFamily,
    pub solver: String,
    pub seed: u64,
    pub hull_tolerance: f64,
    /// Per-invocation timeout the solver ran under, if any.
    pub timeout_secs: Option<f64>,
    pub series: PerformanceSeries,
    pub faults: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fault_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed_secs: f64,
}

/// Drives sweeps for one family against one solver.
pub struct Harness<S: Solver> {
    config: HarnessConfig,
    solver: S,
    rng: StdRng,
    seed: u64,
    faults: FaultRecorder,
}

impl<S: Solver> Harness<S> {
    pub fn new(config: HarnessConfig, solver: S) -> Result<Self, HarnessError> {
        config.validate()?;
        if let Some(dir) = &config.output_dir {
            std::fs::create_dir_all(dir)?;
        }
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let faults = FaultRecorder::new(config.output_dir.clone());
        Ok(Harness {
            rng: StdRng::seed_from_u64(seed),
            seed,
            faults,
            config,
            solver,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    /// Generate a fresh instance for `parameter` and run one trial on it.
    pub fn run_single(&mut self, parameter: usize) -> TrialRun {
        let family = self.config.family;
        if parameter == 0 {
            return TrialRun {
                instance: Instance::Values { values: Vec::new() },
                encoded_inputs: Vec::new(),
                raw_outputs: Vec::new(),
                result: Err(TrialError::Generation(format!(
                    "{} must be positive",
                    family.parameter_name()
                ))),
            };
        }
        let instance = generator::generate(family, parameter, self.config.search_size, &mut self.rng);
        run_trial(family, instance, &mut self.solver, &self.config.policy)
    }

    /// Run `trials` trials at one parameter value.
    pub fn run_point(&mut self, parameter: usize, trials: usize) -> Result<SeriesPoint, HarnessError> {
        let family = self.config.family;
        let mut acc = PointAccumulator::new(parameter);
        let tick = (trials / 10).max(1);

        eprint!("  {}={:<6} ", family.parameter_name(), parameter);
        for trial in 0..trials {
            let TrialRun {
                instance,
                encoded_inputs,
                raw_outputs,
                result,
            } = self.run_single(parameter);

            match result {
                Ok(pass) => acc.record_sample(pass.response.metrics),
                Err(TrialError::Execution(e)) if e.is_fatal() => {
                    eprintln!();
                    return Err(HarnessError::SolverUnavailable(e));
                }
                Err(err) => {
                    let kind = err.kind();
                    acc.record_failure(kind);
                    let (expected, actual) = match &err {
                        TrialError::Mismatch(m) => (Some(m.expected.clone()), Some(m.actual.clone())),
                        _ => (None, None),
                    };
                    self.faults.record(Diagnostic {
                        family,
                        parameter,
                        trial,
                        kind,
                        message: err.to_string(),
                        expected,
                        actual,
                        instance,
                        encoded_inputs,
                        raw_outputs,
                    });
                }
            }

            if trial % tick == 0 {
                eprint!(".");
            }
        }

        let point = acc.finish();
        eprintln!(
            " work={} span={} ({}/{} ok)",
            point.mean_work.map(|w| format!("{:.1}", w)).unwrap_or_else(|| "-".to_string()),
            point.mean_span.map(|s| format!("{:.1}", s)).unwrap_or_else(|| "-".to_string()),
            point.samples,
            point.trials
        );
        Ok(point)
    }

    /// Run every point of the configured plan and return the aggregated
    /// report.
    pub fn run_sweep(&mut self) -> Result<SweepReport, HarnessError> {
        let start = Instant::now();
        let family = self.config.family;
        let points = self.config.plan.points(self.config.default_trials);

        log::info!(
            "Sweeping {} over {} points ({} trials, seed {})",
            family,
            points.len(),
            self.config.plan.total_trials(self.config.default_trials),
            self.seed
        );

        let mut series = PerformanceSeries::new(family);
        for (parameter, trials) in points {
            let point = self.run_point(parameter, trials)?;
            series.push(point);
        }

        let faults = std::mem::replace(&mut self.faults, FaultRecorder::new(self.config.output_dir.clone()));
        Ok(SweepReport {
            schema_version: SCHEMA_VERSION.to_string(),
            crate_version: CRATE_VERSION.to_string(),
            family,
            solver: self.solver.describe(),
            seed: self.seed,
            hull_tolerance: self.config.policy.hull_tolerance,
            timeout_secs: self.config.timeout.map(|t| t.as_secs_f64()),
            series,
            faults: faults.count,
            fault_files: faults.files,
            diagnostics: faults.retained,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// Re-run a stored failure against `solver`.
pub fn replay<S: Solver>(diagnostic: &Diagnostic, solver: &mut S, policy: &ValidationPolicy) -> TrialRun {
    run_trial(diagnostic.family, diagnostic.instance.clone(), solver, policy)
}
