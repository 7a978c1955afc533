//! Engine execution: run one [`Invocation`] and capture its report.
//!
//! Standard output and standard error are both piped and drained
//! concurrently, so a chatty engine can never stall on a full stderr pipe.
//! Standard input is closed.
//!
//! A non-zero exit status is not an error here: the engine exits non-zero
//! whenever it finds nothing, yet still prints a report worth parsing. The
//! caller decides what an empty report with a failure status means.

use crate::error::DecodeError;
use crate::pipeline::command::Invocation;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::debug;

/// Everything the engine produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    fn from_process(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs the decoding engine.
///
/// The default [`ProcessRunner`] spawns a child process. Embedders and tests
/// can inject their own implementation through
/// [`crate::config::ReaderConfigBuilder::runner`].
pub trait EngineRunner: Send + Sync {
    /// Run the engine to completion and return its captured output.
    fn run(&self, invocation: &Invocation) -> Result<EngineOutput, DecodeError>;
}

/// Spawns the engine as a child process and blocks until it exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl EngineRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<EngineOutput, DecodeError> {
        debug!("Spawning engine: {}", invocation);
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| launch_error(invocation, source))?;
        Ok(EngineOutput::from_process(output))
    }
}

/// Run the engine on the tokio process driver, killing it if `timeout` elapses.
///
/// The child is spawned with `kill_on_drop`, so when the timeout fires the
/// dropped future takes the process down with it.
pub async fn run_with_timeout(
    invocation: &Invocation,
    timeout: Option<Duration>,
) -> Result<EngineOutput, DecodeError> {
    debug!("Spawning engine (async): {}", invocation);
    let child = tokio::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| launch_error(invocation, source))?;

    let wait = child.wait_with_output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| DecodeError::EngineTimeout {
                secs: limit.as_secs(),
            })?,
        None => wait.await,
    }
    .map_err(|e| DecodeError::Internal(format!("waiting for engine: {e}")))?;

    Ok(EngineOutput::from_process(output))
}

fn launch_error(invocation: &Invocation, source: std::io::Error) -> DecodeError {
    DecodeError::EngineUnavailable {
        program: invocation.program.to_string_lossy().into_owned(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn invocation(program: &str, args: &[&str]) -> Invocation {
        Invocation {
            program: program.into(),
            args: args.iter().map(|a| OsString::from(*a)).collect(),
        }
    }

    #[test]
    fn missing_program_is_engine_unavailable() {
        let err = ProcessRunner
            .run(&invocation("zxing-bridge-no-such-binary", &[]))
            .unwrap_err();
        match err {
            DecodeError::EngineUnavailable { program, .. } => {
                assert_eq!(program, "zxing-bridge-no-such-binary")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_and_nonzero_status() {
        let out = ProcessRunner
            .run(&invocation(
                "sh",
                &["-c", "echo 'file: a.png: No barcode found'; echo oops >&2; exit 3"],
            ))
            .unwrap();
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout, "file: a.png: No barcode found\n");
        assert_eq!(out.stderr, "oops\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn async_run_captures_output() {
        let out = run_with_timeout(&invocation("sh", &["-c", "echo hi"]), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hi\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn async_run_times_out() {
        let err = run_with_timeout(&invocation("sh", &["-c", "sleep 5"]), Some(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::EngineTimeout { secs: 1 }));
    }

    #[tokio::test]
    async fn async_missing_program_is_engine_unavailable() {
        let err = run_with_timeout(&invocation("zxing-bridge-no-such-binary", &[]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::EngineUnavailable { .. }));
    }
}
