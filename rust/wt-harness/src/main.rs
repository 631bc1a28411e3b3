//! wt-harness CLI.
//!
//! Subcommands:
//!   sweep <family>                 Full sweep with the family's default plan
//!   run <family> <n-or-p>          One trial, answer and metrics printed
//!   replay <diagnostic.json>       Re-run a stored failure
//!
//! The solver is `--solver` (default `wtrun`) plus any `--arg` values; with
//! `--source prog.wt` the program is compiled first and the artifact is
//! appended to the arguments.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use wt_harness::config::{HarnessConfig, SweepPlan, SweepSegment, DEFAULT_SIZE};
use wt_harness::error::{HarnessError, TrialError};
use wt_harness::family::{AlgorithmFamily, Answer, DEFAULT_SEARCH_SIZE};
use wt_harness::geometry::DEFAULT_HULL_TOLERANCE;
use wt_harness::orchestrator::{self, Harness, TrialRun};
use wt_harness::report;
use wt_harness::solver::{compile_program, CompiledProgram, ProcessSolver, Solver};
use wt_harness::validator::ValidationPolicy;

#[derive(Parser, Debug)]
#[command(name = "wt-harness")]
#[command(version, about = "Differential tester and work/span profiler for parallel algorithm solvers")]
#[command(after_help = "Examples:
  wt-harness sweep upper-hull --source upper_hull.wt
  wt-harness sweep merge --size 500 --trials 200 --seed 7
  wt-harness sweep p-ary-search --segment 1..50:1@20 --arg p_ary_search.wtr
  wt-harness run maximum 64 --arg maximum.wtr
  wt-harness replay results/merge_fail_0.json --arg merge.wtr
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep a family over its parameter range and write the perf log.
    Sweep(SweepArgs),

    /// Run a single trial and print the outcome.
    Run(RunArgs),

    /// Re-run the instance stored in a failure diagnostic.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// circ-list, coloring, maximum, merge, p-ary-search, upper-hull
    family: AlgorithmFamily,

    #[command(flatten)]
    solver: SolverArgs,

    /// Sweep segment START..END[:STEP][@TRIALS], end exclusive (repeatable)
    #[arg(long = "segment", action = clap::ArgAction::Append)]
    segments: Vec<SweepSegment>,

    /// Trials per point; overrides the default plan's counts
    #[arg(long)]
    trials: Option<usize>,

    /// Problem size for single-point families
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    size: usize,

    /// Array length for p-ary search
    #[arg(long, default_value_t = DEFAULT_SEARCH_SIZE)]
    search_size: usize,

    /// Directory for perf log, report and failure diagnostics
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

    /// RNG seed (drawn from entropy if omitted)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RunArgs {
    family: AlgorithmFamily,

    /// n, or the fan-out p for p-ary search
    parameter: usize,

    #[command(flatten)]
    solver: SolverArgs,

    /// Array length for p-ary search
    #[arg(long, default_value_t = DEFAULT_SEARCH_SIZE)]
    search_size: usize,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    diagnostic: PathBuf,

    #[command(flatten)]
    solver: SolverArgs,
}

#[derive(Args, Debug)]
struct SolverArgs {
    /// Solver program, resolved on PATH
    #[arg(long, default_value = "wtrun")]
    solver: String,

    /// Extra argument passed to the solver (repeatable)
    #[arg(long = "arg", action = clap::ArgAction::Append, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Source file to compile before running; the artifact is appended to the solver arguments
    #[arg(long)]
    source: Option<PathBuf>,

    /// Compiler used with --source
    #[arg(long, default_value = "wtc")]
    compiler: String,

    /// Kill a solver invocation after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum canonical hull distance accepted as a match
    #[arg(long, default_value_t = DEFAULT_HULL_TOLERANCE)]
    tolerance: f64,
}

impl SolverArgs {
    fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            hull_tolerance: self.tolerance,
        }
    }

    /// Compile if asked, then resolve the solver program. The returned
    /// `CompiledProgram` must outlive the solver.
    fn build(&self) -> Result<(ProcessSolver, Option<CompiledProgram>), HarnessError> {
        let compiled = match &self.source {
            Some(source) => Some(compile_program(&self.compiler, source).map_err(HarnessError::SolverUnavailable)?),
            None => None,
        };
        let mut args = self.args.clone();
        if let Some(program) = &compiled {
            args.push(program.artifact.to_string_lossy().to_string());
        }
        let solver = ProcessSolver::locate(&self.solver, args)
            .map_err(HarnessError::SolverUnavailable)?
            .with_timeout(self.timeout());
        Ok((solver, compiled))
    }
}

fn print_trial(run: &TrialRun) {
    match &run.result {
        Ok(pass) => {
            let answer = match &pass.response.answer {
                Answer::Scalar { value } => value.to_string(),
                Answer::Sequence { values } => format!("{:?}", values),
                Answer::Points { points } => format!("{} hull points", points.len()),
            };
            println!("  Answer: {}", answer);
            println!("  Verdict: PASS");
            if let Some(colors) = pass.validation.colors_used {
                println!("  Colors used: {}", colors);
            }
            if let Some(d) = pass.validation.hull_distance {
                println!("  Hull distance: {:.6}", d);
            }
            println!("  Work: {}", pass.response.metrics.work);
            println!("  Span: {}", pass.response.metrics.span);
            if pass.response.metrics.is_anomalous() {
                println!("  Warning: span exceeds work");
            }
        }
        Err(e) => {
            println!("  Verdict: FAIL ({})", e.kind());
            println!("  {}", e);
            for (i, out) in run.raw_outputs.iter().enumerate() {
                println!("  Output #{}: {}", i, out.trim());
            }
        }
    }
}

/// Failures of a finished trial, or the fatal error that stopped it.
fn trial_failures(run: TrialRun) -> Result<usize, HarnessError> {
    match run.result {
        Err(TrialError::Execution(e)) if e.is_fatal() => Err(HarnessError::SolverUnavailable(e)),
        result => Ok(usize::from(result.is_err())),
    }
}

fn run_sweep(args: SweepArgs) -> Result<usize, HarnessError> {
    let family = args.family;
    let mut config = HarnessConfig::new(family);
    if args.segments.is_empty() {
        config.plan = SweepPlan::default_for(family, args.size);
        if let Some(t) = args.trials {
            for seg in config.plan.segments.iter_mut() {
                seg.trials = Some(t);
            }
        }
    } else {
        config.plan = SweepPlan::new(args.segments);
    }
    if let Some(t) = args.trials {
        config.default_trials = t;
    }
    config.search_size = args.search_size;
    config.policy = args.solver.policy();
    config.timeout = args.solver.timeout();
    config.output_dir = Some(args.out_dir.clone());
    config.seed = args.seed;
    config.validate()?;

    let (process, _compiled) = args.solver.build()?;
    println!("Solver: {}", process.describe());

    let mut harness = Harness::new(config, process)?;
    println!("Family: {}  seed: {}", family, harness.seed());

    let report = harness.run_sweep()?;
    let (perf, json) = report::write_outputs(&args.out_dir, &report)?;
    report::print_summary_table(&report);
    println!("Perf log: {}", perf.display());
    println!("Report: {}", json.display());
    Ok(report.faults)
}

fn run_single(args: RunArgs) -> Result<usize, HarnessError> {
    let family = args.family;
    let mut config = HarnessConfig::new(family);
    config.plan = SweepPlan::new(vec![SweepSegment::single(args.parameter.max(1), 1)]);
    config.search_size = args.search_size;
    config.policy = args.solver.policy();
    config.timeout = args.solver.timeout();
    config.seed = args.seed;

    let (process, _compiled) = args.solver.build()?;
    let mut harness = Harness::new(config, process)?;
    println!(
        "{} {}={} (seed {})",
        family,
        family.parameter_name(),
        args.parameter,
        harness.seed()
    );

    let run = harness.run_single(args.parameter);
    print_trial(&run);
    trial_failures(run)
}

fn run_replay(args: ReplayArgs) -> Result<usize, HarnessError> {
    let diagnostic = report::load_diagnostic(&args.diagnostic)?;
    println!(
        "Replaying {} {}={} trial {} (was {}: {})",
        diagnostic.family,
        diagnostic.family.parameter_name(),
        diagnostic.parameter,
        diagnostic.trial,
        diagnostic.kind,
        diagnostic.message
    );

    let policy = args.solver.policy();
    let (mut process, _compiled) = args.solver.build()?;
    let run = orchestrator::replay(&diagnostic, &mut process, &policy);
    print_trial(&run);
    trial_failures(run)
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Sweep(args) => run_sweep(args),
        Command::Run(args) => run_single(args),
        Command::Replay(args) => run_replay(args),
    };

    match result {
        Ok(failures) => {
            println!("{} failures", failures);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
