//! Progress-callback trait for per-image batch events.
//!
//! Inject an [`Arc<dyn DecodeProgressCallback>`] via
//! [`crate::config::ReaderConfigBuilder::progress_callback`] to receive
//! events as [`crate::BarcodeReader::decode_batch`] and
//! [`crate::stream::decode_stream`] work through their inputs. Single
//! [`crate::BarcodeReader::decode`] calls never fire callbacks.
//!
//! # Example
//!
//! ```rust
//! use zxing_bridge::{DecodeProgressCallback, ReaderConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     codes: AtomicUsize,
//! }
//!
//! impl DecodeProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, found: usize) {
//!         self.codes.fetch_add(found, Ordering::SeqCst);
//!         eprintln!("image {}/{}: {} code(s)", index + 1, total, found);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { codes: AtomicUsize::new(0) });
//!
//! let config = ReaderConfig::builder()
//!     .progress_callback(counter as Arc<dyn DecodeProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch layer as it processes each input.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the
/// per-image methods run concurrently from different tasks. All methods
/// default to no-ops so callers only override what they care about.
pub trait DecodeProgressCallback: Send + Sync {
    /// Called once before any engine is launched.
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before the engine is launched for an input (0-indexed).
    fn on_image_start(&self, index: usize, total_images: usize) {
        let _ = (index, total_images);
    }

    /// Called when an input was decoded; `found` is the number of codes
    /// (zero when the engine reported no barcode).
    fn on_image_complete(&self, index: usize, total_images: usize, found: usize) {
        let _ = (index, total_images, found);
    }

    /// Called when the decode call for an input failed.
    fn on_image_error(&self, index: usize, total_images: usize, error: &str) {
        let _ = (index, total_images, error);
    }

    /// Called once after every input has been attempted.
    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let _ = (total_images, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DecodeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReaderConfig`].
pub type ProgressCallback = Arc<dyn DecodeProgressCallback>;
