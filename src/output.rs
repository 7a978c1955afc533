//! Output types: per-image decode results and batch reports.

use crate::config::FormatName;
use crate::error::ImageError;
use serde::{Deserialize, Serialize};

/// A finder/alignment point the engine reported, in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultPoint {
    pub x: f64,
    pub y: f64,
}

impl From<(f64, f64)> for ResultPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// One decoded code.
///
/// `raw_text` and `parsed_text` keep every line the engine printed, each
/// followed by `\n`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    /// Symbology as the engine spelled it, e.g. `QR_CODE`. Empty if the
    /// report never named one.
    pub format: String,
    pub raw_text: String,
    pub parsed_text: String,
    pub points: Vec<ResultPoint>,
}

impl Barcode {
    /// The format as a known [`FormatName`], if the engine used one.
    pub fn format_name(&self) -> Option<FormatName> {
        self.format.parse().ok()
    }
}

/// The outcome for one image block of the engine's report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecodeResult {
    /// The engine found no code in this image.
    NotFound,
    /// The engine decoded a code.
    Decoded(Barcode),
}

impl DecodeResult {
    pub fn is_found(&self) -> bool {
        matches!(self, DecodeResult::Decoded(_))
    }

    pub fn barcode(&self) -> Option<&Barcode> {
        match self {
            DecodeResult::Decoded(b) => Some(b),
            DecodeResult::NotFound => None,
        }
    }
}

/// Result for a single input of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReport {
    /// Position of the input in the batch (0-indexed).
    pub index: usize,
    /// Human-readable description of the input (path, or size for in-memory data).
    pub source: String,
    /// One entry per image block; empty when `error` is set.
    pub results: Vec<DecodeResult>,
    /// Wall-clock time of the decode call.
    pub duration_ms: u64,
    /// Set when the decode call for this input failed.
    pub error: Option<ImageError>,
}

impl ImageReport {
    /// Number of codes decoded from this input.
    pub fn found_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_found()).count()
    }
}

/// Aggregate numbers for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_images: usize,
    /// Inputs where at least one code was decoded.
    pub decoded_images: usize,
    /// Inputs processed successfully with no code found.
    pub not_found_images: usize,
    pub failed_images: usize,
    /// Codes decoded across the whole batch.
    pub total_codes: usize,
    pub total_duration_ms: u64,
}

impl BatchStats {
    /// Tally the per-image reports.
    pub fn from_reports(reports: &[ImageReport], total_duration_ms: u64) -> Self {
        let mut stats = BatchStats {
            total_images: reports.len(),
            total_duration_ms,
            ..Default::default()
        };
        for report in reports {
            if report.error.is_some() {
                stats.failed_images += 1;
                continue;
            }
            let found = report.found_count();
            stats.total_codes += found;
            if found > 0 {
                stats.decoded_images += 1;
            } else {
                stats.not_found_images += 1;
            }
        }
        stats
    }
}

/// Everything a batch decode produced, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub reports: Vec<ImageReport>,
    pub stats: BatchStats,
}
