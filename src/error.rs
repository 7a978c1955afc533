//! Error types for the zxing-bridge library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`DecodeError`] — **Fatal** for one decode call: the input could not be
//!   staged, the engine could not be launched, or its report was malformed.
//!   Returned as `Err(DecodeError)` from [`crate::BarcodeReader::decode`].
//!
//! * [`ReportError`] — **Parser-local**: a report line matched the point
//!   pattern but its coordinates are not numbers. The parser aborts the whole
//!   report rather than silently dropping the point.
//!
//! * [`ImageError`] — **Non-fatal** inside a batch: one image failed but the
//!   others are fine. Stored in [`crate::output::ImageReport`] so callers can
//!   inspect partial success rather than losing the whole batch.

use std::num::ParseFloatError;
use thiserror::Error;

/// All fatal errors returned by a single decode call.
#[derive(Debug, Error)]
pub enum DecodeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A collection of inputs was passed where exactly one is accepted.
    #[error("Only a single input is accepted per decode call, got a list of {count}\nUse decode_batch for several images.")]
    InvalidInputKind { count: usize },

    /// The in-memory input could not be written to a scratch file.
    #[error("Failed to stage input to a temporary file: {source}")]
    StagingFailed {
        #[source]
        source: std::io::Error,
    },

    /// The in-memory image could not be encoded for the engine.
    #[error("Failed to encode in-memory image: {0}")]
    ImageEncoding(#[from] image::ImageError),

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The engine process could not be launched at all.
    #[error(
        "Decoding engine '{program}' could not be launched: {source}\n\
Check that a Java runtime is installed and that ZXING_LIBRARY points at the\n\
directory holding the ZXing javase jar."
    )]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully without writing any report text.
    #[error("Decoding engine exited with {} and produced no output\n{stderr}", status_label(.status))]
    EngineFailed { status: Option<i32>, stderr: String },

    /// The engine did not finish within the configured timeout.
    #[error("Decoding engine timed out after {secs}s")]
    EngineTimeout { secs: u64 },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The engine's report could not be parsed.
    #[error("Malformed engine report: {0}")]
    MalformedReport(#[from] ReportError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// A report line that matched a known shape but carried unusable values.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A `Point <i>: (<x>,<y>)` line whose coordinates are not valid floats.
    #[error("block {block}: bad point coordinate in {line:?}: {source}")]
    MalformedPoint {
        block: usize,
        line: String,
        #[source]
        source: ParseFloatError,
    },
}

/// A non-fatal error for a single image in a batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The decode call failed for this image.
    #[error("Image {index}: decode failed: {detail}")]
    DecodeFailed { index: usize, detail: String },

    /// The engine timed out on this image.
    #[error("Image {index}: engine timed out after {secs}s")]
    Timeout { index: usize, secs: u64 },
}

impl ImageError {
    /// Demote a fatal per-call error to a per-image batch error.
    pub fn from_decode(index: usize, err: &DecodeError) -> Self {
        match err {
            DecodeError::EngineTimeout { secs } => ImageError::Timeout {
                index,
                secs: *secs,
            },
            other => ImageError::DecodeFailed {
                index,
                detail: other.to_string(),
            },
        }
    }
}

/// A format name the engine does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown barcode format '{0}' (see --list-formats)")]
pub struct UnknownFormat(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_kind_display() {
        let e = DecodeError::InvalidInputKind { count: 3 };
        let msg = e.to_string();
        assert!(msg.contains("list of 3"), "got: {msg}");
    }

    #[test]
    fn engine_failed_display_with_status() {
        let e = DecodeError::EngineFailed {
            status: Some(1),
            stderr: "Exception in thread main".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("status 1"), "got: {msg}");
        assert!(msg.contains("Exception"), "got: {msg}");
    }

    #[test]
    fn engine_failed_display_without_status() {
        let e = DecodeError::EngineFailed {
            status: None,
            stderr: String::new(),
        };
        assert!(e.to_string().contains("a signal"));
    }

    #[test]
    fn malformed_point_converts() {
        let source = "1.2.3".parse::<f64>().unwrap_err();
        let e: DecodeError = ReportError::MalformedPoint {
            block: 0,
            line: "Point 0: (1.2.3,4.0)".into(),
            source,
        }
        .into();
        assert!(matches!(e, DecodeError::MalformedReport(_)));
        assert!(e.to_string().contains("block 0"));
    }

    #[test]
    fn timeout_demotes_to_image_timeout() {
        let e = DecodeError::EngineTimeout { secs: 30 };
        match ImageError::from_decode(4, &e) {
            ImageError::Timeout { index, secs } => {
                assert_eq!(index, 4);
                assert_eq!(secs, 30);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn other_errors_demote_to_decode_failed() {
        let e = DecodeError::InvalidConfig("no command".into());
        let demoted = ImageError::from_decode(1, &e);
        assert!(demoted.to_string().contains("no command"));
    }
}
