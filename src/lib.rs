//! # zxing-bridge
//!
//! Decode barcodes and 2D codes by driving the ZXing command-line engine.
//!
//! ## Why a subprocess?
//!
//! ZXing's `CommandLineRunner` is the reference decoder for sixteen
//! symbologies and runs anywhere a Java runtime does. Rather than binding to
//! it, this crate launches it once per decode call and parses its plain-text
//! report into typed results. The engine is located through
//! [`ReaderConfig`]: an explicit location, else the `ZXING_LIBRARY`
//! environment variable, else `..` (a ZXing source checkout).
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Stage    path as-is, or image/bytes → unique temp file (/dev/shm if present)
//!  ├─ 2. Command  java -cp <jars> -Djava.awt.headless=true CommandLineRunner [flags] <path>
//!  ├─ 3. Engine   one child process, stdout + stderr captured
//!  ├─ 4. Release  staged file removed on every exit path
//!  └─ 5. Report   split on `file:` blocks → NotFound | Decoded { format, raw, parsed, points }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zxing_bridge::{BarcodeReader, DecodeOptions, FormatName};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = BarcodeReader::from_env()?;
//!     let options = DecodeOptions::builder()
//!         .possible_formats([FormatName::QrCode, FormatName::Code128])
//!         .build();
//!     for result in reader.decode("label.png", &options)? {
//!         if let Some(code) = result.barcode() {
//!             println!("{} → {}", code.format, code.parsed_text.trim_end());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `zxdecode` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! zxing-bridge = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod decode;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{list_formats, DecodeOptions, DecodeOptionsBuilder, FormatName, ReaderConfig, ReaderConfigBuilder};
pub use decode::BarcodeReader;
pub use error::{DecodeError, ImageError, ReportError, UnknownFormat};
pub use output::{Barcode, BatchOutput, BatchStats, DecodeResult, ImageReport, ResultPoint};
pub use pipeline::command::Invocation;
pub use pipeline::engine::{EngineOutput, EngineRunner, ProcessRunner};
pub use pipeline::input::DecodeInput;
pub use pipeline::report::parse_report;
pub use progress::{DecodeProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{decode_stream, ReportStream};
