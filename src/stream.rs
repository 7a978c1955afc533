//! Streaming batch API: emit per-input reports as they complete.
//!
//! Unlike [`crate::BarcodeReader::decode_batch`], which returns only after
//! every input finished, [`decode_stream`] yields an [`ImageReport`] as soon
//! as each engine run ends. With `concurrency > 1` reports may arrive out of
//! order (sort by `index` if order matters).

use crate::config::DecodeOptions;
use crate::decode::BarcodeReader;
use crate::error::ImageError;
use crate::output::ImageReport;
use crate::pipeline::input::DecodeInput;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::warn;

/// A boxed stream of per-input reports.
pub type ReportStream = Pin<Box<dyn Stream<Item = ImageReport> + Send>>;

/// Decode `inputs` concurrently, streaming one report per input.
///
/// Runs up to `reader.config().concurrency` engine processes at once. The
/// configured progress callback receives the per-image events; batch-level
/// start/complete events are fired only by `decode_batch`.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use zxing_bridge::{decode_stream, BarcodeReader, DecodeInput, DecodeOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = BarcodeReader::from_env()?;
/// let inputs: Vec<DecodeInput> = vec!["a.png".into(), "b.png".into()];
/// let mut reports = decode_stream(&reader, inputs, &DecodeOptions::default());
/// while let Some(report) = reports.next().await {
///     println!("{}: {} code(s)", report.source, report.found_count());
/// }
/// # Ok(())
/// # }
/// ```
pub fn decode_stream(
    reader: &BarcodeReader,
    inputs: Vec<DecodeInput>,
    options: &DecodeOptions,
) -> ReportStream {
    let total = inputs.len();
    let concurrency = reader.config().concurrency;
    let reader = reader.clone();
    let options = options.clone();

    let s = stream::iter(inputs.into_iter().enumerate().map(move |(index, input)| {
        let reader = reader.clone();
        let options = options.clone();
        async move { decode_one(&reader, index, total, input, &options).await }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

/// Decode one batch input, folding failures into its report.
async fn decode_one(
    reader: &BarcodeReader,
    index: usize,
    total: usize,
    input: DecodeInput,
    options: &DecodeOptions,
) -> ImageReport {
    let start = Instant::now();
    let source = input.describe();
    let cb = reader.config().progress_callback.clone();

    if let Some(ref cb) = cb {
        cb.on_image_start(index, total);
    }

    let outcome = reader.decode_async(input, options).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(results) => {
            let report = ImageReport {
                index,
                source,
                results,
                duration_ms,
                error: None,
            };
            if let Some(ref cb) = cb {
                cb.on_image_complete(index, total, report.found_count());
            }
            report
        }
        Err(e) => {
            warn!("Input {} ({}) failed: {}", index, source, e);
            if let Some(ref cb) = cb {
                cb.on_image_error(index, total, &e.to_string());
            }
            ImageReport {
                index,
                source,
                results: Vec::new(),
                duration_ms,
                error: Some(ImageError::from_decode(index, &e)),
            }
        }
    }
}
