//! Decode entry points.
//!
//! [`BarcodeReader::decode`] is the core contract: one input, one engine
//! process, the calling thread blocked until the engine exits, and an ordered
//! list of results back. [`BarcodeReader::decode_async`] is the same pipeline
//! on the tokio process driver with an optional timeout, and
//! [`BarcodeReader::decode_batch`] fans many single-input calls out
//! concurrently.
//!
//! Every path runs the same four steps:
//!
//! 1. stage the input (temp file for in-memory data)
//! 2. build the argument vector
//! 3. run the engine
//! 4. release the staged file, then parse the report

use crate::config::{list_formats, DecodeOptions, FormatName, ReaderConfig};
use crate::error::DecodeError;
use crate::output::{BatchOutput, BatchStats, DecodeResult};
use crate::pipeline::engine::{self, EngineOutput, EngineRunner, ProcessRunner};
use crate::pipeline::input::{self, DecodeInput};
use crate::pipeline::{command, report};
use crate::stream::decode_stream;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A handle on one configured decoding engine.
///
/// Cheap to clone; holds no per-call state, so one reader can serve any
/// number of concurrent decode calls.
///
/// # Example
/// ```rust,no_run
/// use zxing_bridge::{BarcodeReader, DecodeOptions, DecodeResult};
///
/// let reader = BarcodeReader::with_location("/opt/zxing")?;
/// for result in reader.decode("ticket.png", &DecodeOptions::default())? {
///     match result {
///         DecodeResult::Decoded(code) => println!("{}: {}", code.format, code.parsed_text),
///         DecodeResult::NotFound => println!("no code"),
///     }
/// }
/// # Ok::<(), zxing_bridge::DecodeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BarcodeReader {
    config: ReaderConfig,
}

impl BarcodeReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Reader with every setting resolved from the environment and defaults.
    pub fn from_env() -> Result<Self, DecodeError> {
        ReaderConfig::from_env().map(Self::new)
    }

    /// Reader for an engine installed at `location`.
    pub fn with_location(location: impl Into<PathBuf>) -> Result<Self, DecodeError> {
        ReaderConfig::builder()
            .location(location)
            .build()
            .map(Self::new)
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Every symbology the engine can be restricted to.
    pub fn list_formats(&self) -> &'static [FormatName] {
        list_formats()
    }

    /// Decode a single input, blocking until the engine exits.
    ///
    /// # Errors
    /// - [`DecodeError::InvalidInputKind`] for [`DecodeInput::Paths`], before anything is spawned
    /// - [`DecodeError::EngineUnavailable`] when the engine cannot be launched
    /// - [`DecodeError::EngineFailed`] when the engine fails without printing a report
    /// - [`DecodeError::MalformedReport`] when a point coordinate is not a number
    pub fn decode(
        &self,
        input: impl Into<DecodeInput>,
        options: &DecodeOptions,
    ) -> Result<Vec<DecodeResult>, DecodeError> {
        let input = input.into();
        let start = Instant::now();

        let staged = input::stage_input(&input, &self.config.scratch_dir)?;
        let invocation = command::build_invocation(&self.config, options, staged.path())?;
        let output = self.runner().run(&invocation);
        staged.release();

        let results = interpret(output?)?;
        info!(
            "Decoded {}: {} block(s) in {}ms",
            input.describe(),
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    /// Decode a single input without blocking the async executor.
    ///
    /// The engine runs under [`ReaderConfig::timeout_secs`]; when it elapses
    /// the process is killed, the staged file removed, and
    /// [`DecodeError::EngineTimeout`] returned.
    pub async fn decode_async(
        &self,
        input: impl Into<DecodeInput>,
        options: &DecodeOptions,
    ) -> Result<Vec<DecodeResult>, DecodeError> {
        let input = input.into();
        let start = Instant::now();
        let timeout = self.config.timeout_secs.map(Duration::from_secs);

        let staged = input::stage_input(&input, &self.config.scratch_dir)?;
        let invocation = command::build_invocation(&self.config, options, staged.path())?;
        let output = match &self.config.runner {
            None => engine::run_with_timeout(&invocation, timeout).await,
            Some(runner) => run_injected(Arc::clone(runner), invocation, timeout).await,
        };
        staged.release();

        let results = interpret(output?)?;
        info!(
            "Decoded {}: {} block(s) in {}ms",
            input.describe(),
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    /// Decode many inputs, up to [`ReaderConfig::concurrency`] at a time.
    ///
    /// Each input is its own decode call with its own engine process. A
    /// failing input does not stop the others; its report carries the error.
    /// Reports come back in input order.
    pub async fn decode_batch<I>(&self, inputs: I, options: &DecodeOptions) -> BatchOutput
    where
        I: IntoIterator,
        I::Item: Into<DecodeInput>,
    {
        let start = Instant::now();
        let inputs: Vec<DecodeInput> = inputs.into_iter().map(Into::into).collect();
        let total = inputs.len();
        info!(
            "Starting batch of {} input(s), concurrency {}",
            total, self.config.concurrency
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        let mut reports: Vec<_> = decode_stream(self, inputs, options).collect().await;
        reports.sort_by_key(|r| r.index);

        let stats = BatchStats::from_reports(&reports, start.elapsed().as_millis() as u64);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(total, total - stats.failed_images);
        }
        info!(
            "Batch complete: {} decoded, {} not found, {} failed, {}ms",
            stats.decoded_images, stats.not_found_images, stats.failed_images, stats.total_duration_ms
        );

        BatchOutput { reports, stats }
    }

    fn runner(&self) -> &dyn EngineRunner {
        match &self.config.runner {
            Some(runner) => runner.as_ref(),
            None => &ProcessRunner,
        }
    }
}

/// Run an injected runner on the blocking pool, bounded by `timeout`.
async fn run_injected(
    runner: Arc<dyn EngineRunner>,
    invocation: command::Invocation,
    timeout: Option<Duration>,
) -> Result<EngineOutput, DecodeError> {
    let task = tokio::task::spawn_blocking(move || runner.run(&invocation));
    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| DecodeError::EngineTimeout {
                secs: limit.as_secs(),
            })?,
        None => task.await,
    };
    joined.map_err(|e| DecodeError::Internal(format!("Engine task panicked: {e}")))?
}

/// Turn raw engine output into results.
///
/// A failure status alone is not an error; only a failure with no report
/// text at all is.
fn interpret(output: EngineOutput) -> Result<Vec<DecodeResult>, DecodeError> {
    if !output.success() {
        if output.stdout.trim().is_empty() {
            return Err(DecodeError::EngineFailed {
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        warn!(
            "Engine exited with {:?}; parsing its report anyway",
            output.status
        );
    }
    if !output.stderr.trim().is_empty() {
        debug!("Engine stderr: {}", output.stderr.trim());
    }
    Ok(report::parse_report(&output.stdout)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(status: Option<i32>, stdout: &str, stderr: &str) -> EngineOutput {
        EngineOutput {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn nonzero_status_with_report_still_parses() {
        let results = interpret(output(Some(1), "file: a.png: No barcode found\n", "")).unwrap();
        assert_eq!(results, vec![DecodeResult::NotFound]);
    }

    #[test]
    fn nonzero_status_without_report_is_engine_failed() {
        let err = interpret(output(Some(1), "\n", "Error: could not find main class\n")).unwrap_err();
        match err {
            DecodeError::EngineFailed { status, stderr } => {
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "Error: could not find main class");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn success_with_empty_report_is_empty() {
        assert!(interpret(output(Some(0), "", "")).unwrap().is_empty());
    }

    #[test]
    fn malformed_point_surfaces_as_malformed_report() {
        let stdout = "file: a.png\nRaw result:\nx\nParsed result:\nx\nFound 1 result points.\n  Point 0: (..,1.0)\n";
        let err = interpret(output(Some(0), stdout, "")).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedReport(_)));
    }

    #[test]
    fn reader_lists_all_formats() {
        let reader = BarcodeReader::new(
            ReaderConfig::builder().build_with_env(None).unwrap(),
        );
        assert_eq!(reader.list_formats().len(), 16);
        assert_eq!(reader.list_formats()[10], FormatName::QrCode);
    }
}
