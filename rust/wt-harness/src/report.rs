//! Sweep outputs: perf log, JSON report, failure diagnostics, summary table.
//!
//! The report JSON carries `schema_version` and `crate_version` fields. Bump
//! [`SCHEMA_VERSION`] whenever a field changes meaning.

use std::path::{Path, PathBuf};

use crate::error::HarnessError;
use crate::family::AlgorithmFamily;
use crate::orchestrator::{Diagnostic, SweepReport};

/// Current report schema.
pub const SCHEMA_VERSION: &str = "wt-harness-v1";

/// Crate version from Cargo.toml, embedded at compile time.
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn perf_log_path(dir: &Path, family: AlgorithmFamily) -> PathBuf {
    dir.join(format!("{}.perf", family))
}

pub fn report_path(dir: &Path, family: AlgorithmFamily) -> PathBuf {
    dir.join(format!("{}_report.json", family))
}

/// Write `<family>.perf` and `<family>_report.json` into `dir`.
pub fn write_outputs(dir: &Path, report: &SweepReport) -> Result<(PathBuf, PathBuf), HarnessError> {
    std::fs::create_dir_all(dir)?;

    let perf = perf_log_path(dir, report.family);
    std::fs::write(&perf, report.series.perf_log())?;

    let json_path = report_path(dir, report.family);
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&json_path, json)?;

    log::info!(
        "Saved {} points for {} to {}",
        report.series.points.len(),
        report.family,
        json_path.display()
    );
    Ok((perf, json_path))
}

/// Load a failure diagnostic written during a sweep.
///
/// The file may have been edited by hand, so the instance is checked
/// before it can reach the oracle.
pub fn load_diagnostic(path: &Path) -> Result<Diagnostic, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let diagnostic: Diagnostic = serde_json::from_str(&text)?;
    diagnostic
        .instance
        .check_well_formed(diagnostic.family)
        .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))?;
    Ok(diagnostic)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

/// Print the per-point table and totals to stdout.
pub fn print_summary_table(report: &SweepReport) {
    let name = report.family.parameter_name();
    println!();
    println!("{} (seed {})", report.family, report.seed);
    println!("┌────────┬─────────┬──────────────┬──────────────┬──────┬──────┐");
    println!("│ {:>6} │  ok/all │    mean work │    mean span │ fail │ anom │", name);
    println!("├────────┼─────────┼──────────────┼──────────────┼──────┼──────┤");

    for p in &report.series.points {
        println!(
            "│ {:>6} │ {:>3}/{:<3} │ {:>12} │ {:>12} │ {:>4} │ {:>4} │",
            p.parameter,
            p.samples,
            p.trials,
            fmt_opt(p.mean_work),
            fmt_opt(p.mean_span),
            p.failures.total(),
            p.anomalies,
        );
    }

    println!("└────────┴─────────┴──────────────┴──────────────┴──────┴──────┘");

    let failures = report.series.failures();
    println!(
        "{} trials, {} failures (generation {}, execution {}, protocol {}, mismatch {}), {} anomalies, {:.1}s",
        report.series.trials(),
        report.faults,
        failures.generation,
        failures.execution,
        failures.protocol,
        failures.mismatch,
        report.series.anomalies(),
        report.elapsed_secs
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::{PerformanceSeries, PointAccumulator};
    use crate::error::FailureKind;
    use crate::family::{Instance, Metrics};

    fn sample_report() -> SweepReport {
        let mut series = PerformanceSeries::new(AlgorithmFamily::Maximum);
        let mut acc = PointAccumulator::new(16);
        acc.record_sample(Metrics::new(32.0, 5.0));
        acc.record_failure(FailureKind::Protocol);
        series.push(acc.finish());
        SweepReport {
            schema_version: SCHEMA_VERSION.to_string(),
            crate_version: CRATE_VERSION.to_string(),
            family: AlgorithmFamily::Maximum,
            solver: "test".to_string(),
            seed: 7,
            hull_tolerance: 0.1,
            timeout_secs: None,
            series,
            faults: 1,
            fault_files: Vec::new(),
            diagnostics: Vec::new(),
            elapsed_secs: 0.5,
        }
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let (perf, json) = write_outputs(dir.path(), &report).unwrap();

        assert_eq!(perf.file_name().unwrap(), "maximum.perf");
        assert_eq!(std::fs::read_to_string(&perf).unwrap(), "16 32.000000 5.000000\n");

        let parsed: SweepReport = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);
        assert_eq!(parsed.seed, 7);
        assert_eq!(parsed.series, report.series);
    }

    #[test]
    fn test_load_diagnostic_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let diag = Diagnostic {
            family: AlgorithmFamily::Merge,
            parameter: 2,
            trial: 0,
            kind: FailureKind::Mismatch,
            message: "answer mismatch: length 3 != 4".to_string(),
            expected: Some("[1, 2, 5, 9]".to_string()),
            actual: Some("[1, 2, 5]".to_string()),
            instance: Instance::Merge {
                a: vec![1, 5],
                b: vec![2, 9],
            },
            encoded_inputs: vec!["[ 1 5 ] [ 2 9 ]".to_string()],
            raw_outputs: vec!["[ 1 2 5 ]\n4 2\n".to_string()],
        };
        let path = dir.path().join("merge_fail_0.json");
        std::fs::write(&path, serde_json::to_string_pretty(&diag).unwrap()).unwrap();

        let loaded = load_diagnostic(&path).unwrap();
        assert_eq!(loaded.instance, diag.instance);
        assert_eq!(loaded.kind, FailureKind::Mismatch);
    }

    #[test]
    fn test_load_malformed_diagnostic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let diag = Diagnostic {
            family: AlgorithmFamily::CircularList,
            parameter: 2,
            trial: 0,
            kind: FailureKind::Mismatch,
            message: "answer mismatch".to_string(),
            expected: None,
            actual: None,
            instance: Instance::CircularList { next: vec![0, 5] },
            encoded_inputs: Vec::new(),
            raw_outputs: Vec::new(),
        };
        let path = dir.path().join("circ-list_fail_0.json");
        std::fs::write(&path, serde_json::to_string_pretty(&diag).unwrap()).unwrap();

        let err = load_diagnostic(&path).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_load_missing_diagnostic() {
        let err = load_diagnostic(Path::new("/nonexistent/merge_fail_0.json")).unwrap_err();
        assert!(matches!(err, HarnessError::Read { .. }));
    }
}
