//! Solver client: runs the algorithm under test.
//!
//! The harness only needs one capability from a solver: take an encoded
//! instance, return the raw text it printed. [`ProcessSolver`] provides it
//! by running an external program once per call, feeding the instance on
//! stdin and capturing stdout. Tests plug in-process solvers into the same
//! [`Solver`] trait.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Errors raised while invoking a solver.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("solver program '{0}' not found")]
    NotFound(PathBuf),

    #[error("failed to launch solver: {0}")]
    Launch(#[source] std::io::Error),

    #[error("solver exited with status {code:?}")]
    Exit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("solver timed out after {0:?}")]
    Timeout(Duration),

    #[error("compiling {source_file} failed with status {code:?}: {stderr}")]
    Compile {
        source_file: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SolverError {
    /// Whether this failure means no trial can ever succeed (the program is
    /// missing or cannot be executed), as opposed to a single bad invocation.
    pub fn is_fatal(&self) -> bool {
        match self {
            SolverError::NotFound(_) | SolverError::Compile { .. } => true,
            SolverError::Launch(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }

    /// Whatever the solver printed before failing, if anything.
    pub fn raw_output(&self) -> Option<String> {
        match self {
            SolverError::Exit { stdout, stderr, .. } => Some(format!("{}{}", stdout, stderr)),
            _ => None,
        }
    }
}

/// Anything that can answer an encoded instance with raw response text.
pub trait Solver {
    /// Run once on `input`, returning the solver's stdout.
    fn invoke(&mut self, input: &str) -> Result<String, SolverError>;

    /// Short human-readable description for logs and reports.
    fn describe(&self) -> String {
        "in-process solver".to_string()
    }
}

impl<S: Solver + ?Sized> Solver for &mut S {
    fn invoke(&mut self, input: &str) -> Result<String, SolverError> {
        (**self).invoke(input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn invoke(&mut self, input: &str) -> Result<String, SolverError> {
        (**self).invoke(input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Resolve `program` the way a shell would: paths are checked directly,
/// bare names are searched on `PATH`.
pub fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// An external solver program invoked once per instance.
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    /// Resolved program path.
    pub program: PathBuf,
    /// Fixed arguments (typically the compiled artifact to run).
    pub args: Vec<String>,
    /// Kill the solver if it runs longer than this. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl ProcessSolver {
    /// Resolve the program and build a solver, failing fast if it is missing.
    pub fn locate(program: impl AsRef<Path>, args: Vec<String>) -> Result<Self, SolverError> {
        let program = program.as_ref();
        let resolved = find_program(program).ok_or_else(|| SolverError::NotFound(program.to_path_buf()))?;
        Ok(ProcessSolver {
            program: resolved,
            args,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn spawn(&self) -> Result<Child, SolverError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group so a timeout can take down any helpers too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if self.timeout.is_some() {
                cmd.process_group(0);
            }
        }

        cmd.spawn().map_err(SolverError::Launch)
    }

    /// Feed stdin from a helper thread so the solver can fill its output
    /// pipes while we are still writing.
    fn spawn_stdin_writer(child: &mut Child, input: &str) -> JoinHandle<std::io::Result<()>> {
        let stdin = child.stdin.take();
        let payload = input.to_string();
        std::thread::spawn(move || match stdin {
            Some(mut stdin) => match stdin.write_all(payload.as_bytes()) {
                // The solver may exit without reading everything; its exit
                // status tells the real story.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    log::debug!("solver closed stdin early");
                    Ok(())
                }
                other => other,
            },
            None => Ok(()),
        })
    }

    fn wait_blocking(mut child: Child, input: &str) -> Result<(std::process::ExitStatus, String, String), SolverError> {
        let writer = Self::spawn_stdin_writer(&mut child, input);
        let output = child.wait_with_output()?;
        if let Ok(Err(e)) = writer.join() {
            return Err(SolverError::Io(e));
        }
        Ok((
            output.status,
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }

    fn wait_with_deadline(
        mut child: Child,
        input: &str,
        timeout: Duration,
    ) -> Result<(std::process::ExitStatus, String, String), SolverError> {
        let start = Instant::now();

        // Drain pipes on helper threads so a chatty solver cannot fill a pipe
        // buffer and stall while we poll.
        let stdout_reader = child.stdout.take().map(|mut out| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut err| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        // A solver that never reads must not block us past the deadline.
        let writer = Self::spawn_stdin_writer(&mut child, input);

        let poll_interval = Duration::from_millis(5);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > timeout {
                        log::warn!("solver timed out after {:?}, killing process group", timeout);
                        kill_process_group(&mut child);
                        let _ = child.wait();
                        return Err(SolverError::Timeout(timeout));
                    }
                    std::thread::sleep(poll_interval);
                }
                Err(e) => return Err(SolverError::Io(e)),
            }
        };

        // A background helper left in the group would keep stdout open and
        // stall the readers past the deadline.
        reap_process_group(&child);

        if let Ok(Err(e)) = writer.join() {
            return Err(SolverError::Io(e));
        }

        let collect = |handle: Option<std::thread::JoinHandle<Vec<u8>>>| {
            handle
                .and_then(|h| h.join().ok())
                .map(|buf| String::from_utf8_lossy(&buf).to_string())
                .unwrap_or_default()
        };
        Ok((status, collect(stdout_reader), collect(stderr_reader)))
    }
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    let pgid = child.id() as i32;
    unsafe {
        libc::kill(-pgid, libc::SIGTERM);
    }
    std::thread::sleep(Duration::from_millis(50));
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

/// SIGKILL whatever is left in the group of an already exited solver.
#[cfg(unix)]
fn reap_process_group(child: &Child) {
    let pgid = child.id() as i32;
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn reap_process_group(_child: &Child) {}

impl Solver for ProcessSolver {
    fn invoke(&mut self, input: &str) -> Result<String, SolverError> {
        let child = self.spawn()?;
        let (status, stdout, stderr) = match self.timeout {
            Some(timeout) => Self::wait_with_deadline(child, input, timeout)?,
            None => Self::wait_blocking(child, input)?,
        };

        if !stderr.trim().is_empty() {
            log::debug!("solver stderr: {}", stderr.trim());
        }

        if !status.success() {
            return Err(SolverError::Exit {
                code: status.code(),
                stdout,
                stderr,
            });
        }
        Ok(stdout)
    }

    fn describe(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// A solver program compiled into a temporary directory.
///
/// The artifact is deleted when this value is dropped.
#[derive(Debug)]
pub struct CompiledProgram {
    /// Path of the compiled artifact.
    pub artifact: PathBuf,
    _workdir: TempDir,
}

/// Compile `source` with `compiler source -o <tmp>/<stem>.wtr`.
pub fn compile_program(compiler: &str, source: &Path) -> Result<CompiledProgram, SolverError> {
    let compiler_path =
        find_program(Path::new(compiler)).ok_or_else(|| SolverError::NotFound(PathBuf::from(compiler)))?;
    if !source.is_file() {
        return Err(SolverError::NotFound(source.to_path_buf()));
    }

    let workdir = TempDir::new()?;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "solver".to_string());
    let artifact = workdir.path().join(format!("{}.wtr", stem));

    log::info!("Compiling {} -> {}", source.display(), artifact.display());
    let output = Command::new(&compiler_path)
        .arg(source)
        .arg("-o")
        .arg(&artifact)
        .output()
        .map_err(SolverError::Launch)?;

    if !output.status.success() || !artifact.exists() {
        return Err(SolverError::Compile {
            source_file: source.to_path_buf(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(CompiledProgram {
        artifact,
        _workdir: workdir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessSolver {
        ProcessSolver::locate("sh", vec!["-c".to_string(), script.to_string()]).unwrap()
    }

    #[test]
    fn test_locate_missing_program() {
        let err = ProcessSolver::locate("definitely-not-a-solver-xyz", vec![]).unwrap_err();
        assert!(matches!(err, SolverError::NotFound(_)));
        assert!(err.is_fatal());
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_echoes_stdin() {
        let mut solver = sh("cat");
        let out = solver.invoke("[ 1 2 3 ]").unwrap();
        assert_eq!(out, "[ 1 2 3 ]");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        let mut solver = sh("cat > /dev/null; echo partial; exit 1");
        match solver.invoke("[ 1 ]") {
            Err(SolverError::Exit { code, stdout, .. }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stdout.trim(), "partial");
            }
            other => panic!("expected exit failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_solver() {
        let mut solver = sh("sleep 5").with_timeout(Some(Duration::from_millis(100)));
        let start = Instant::now();
        let err = solver.invoke("").unwrap_err();
        assert!(matches!(err, SolverError::Timeout(_)));
        assert!(!err.is_fatal());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_path_returns_output() {
        let mut solver = sh("cat; echo ' 10 2'").with_timeout(Some(Duration::from_secs(10)));
        let out = solver.invoke("7").unwrap();
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), vec!["7", "10", "2"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_large_input_without_timeout() {
        // Larger than a pipe buffer in both directions.
        let input = format!("[ {}]", "123456 ".repeat(40_000));
        let mut solver = sh("cat");
        let out = solver.invoke(&input).unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[cfg(unix)]
    #[test]
    fn test_background_helper_is_reaped() {
        let mut solver = sh("cat > /dev/null; (sleep 5) & echo 3 1 2").with_timeout(Some(Duration::from_secs(10)));
        let start = Instant::now();
        let out = solver.invoke("[ 1 ]").unwrap();
        assert_eq!(out.trim(), "3 1 2");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_program_is_fatal() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "#!/bin/sh\necho 1 1 1\n").unwrap();
        let mut solver = ProcessSolver {
            program: file.path().to_path_buf(),
            args: vec![],
            timeout: None,
        };
        let err = solver.invoke("").unwrap_err();
        assert!(matches!(err, SolverError::Launch(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_compile_missing_compiler() {
        let err = compile_program("no-such-compiler-xyz", Path::new("prog.wt")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_describe() {
        let solver = ProcessSolver {
            program: PathBuf::from("/usr/bin/wtrun"),
            args: vec!["upper_hull.wtr".to_string()],
            timeout: None,
        };
        assert_eq!(solver.describe(), "/usr/bin/wtrun upper_hull.wtr");
    }
}
