//! Error types shared across the harness.
//!
//! [`TrialError`] covers everything that can go wrong inside one trial; none
//! of it stops a sweep. [`HarnessError`] is reserved for conditions that make
//! the whole run pointless (bad configuration, no solver to run).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::solver::SolverError;
use crate::validator::Mismatch;
use crate::wire::ProtocolError;

/// Category of a failed trial, used for counting and file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Generation,
    Execution,
    Protocol,
    Mismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Generation => "generation",
            FailureKind::Execution => "execution",
            FailureKind::Protocol => "protocol",
            FailureKind::Mismatch => "mismatch",
        })
    }
}

/// Why a single trial did not produce a validated sample.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    #[error("instance generation failed: {0}")]
    Generation(String),

    #[error("solver execution failed: {0}")]
    Execution(#[from] SolverError),

    #[error("malformed solver output: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("answer mismatch: {}", .0.detail)]
    Mismatch(Mismatch),
}

impl TrialError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TrialError::Generation(_) => FailureKind::Generation,
            TrialError::Execution(_) => FailureKind::Execution,
            TrialError::Protocol(_) => FailureKind::Protocol,
            TrialError::Mismatch(_) => FailureKind::Mismatch,
        }
    }
}

/// Conditions that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("solver unavailable: {0}")]
    SolverUnavailable(#[source] SolverError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_error_kinds() {
        let protocol: TrialError = ProtocolError::Truncated {
            expected: 3,
            found: 1,
        }
        .into();
        assert_eq!(protocol.kind(), FailureKind::Protocol);

        let exec: TrialError = SolverError::Timeout(std::time::Duration::from_secs(1)).into();
        assert_eq!(exec.kind(), FailureKind::Execution);

        let mismatch = TrialError::Mismatch(Mismatch {
            expected: "1".into(),
            actual: "2".into(),
            detail: "scalar differs".into(),
        });
        assert_eq!(mismatch.kind(), FailureKind::Mismatch);
        assert_eq!(mismatch.to_string(), "answer mismatch: scalar differs");
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Execution.to_string(), "execution");
    }
}
