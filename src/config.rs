//! Configuration types for driving the decoding engine.
//!
//! Two structs, two lifetimes:
//!
//! * [`ReaderConfig`] — where the engine lives and how to launch it. Resolved
//!   once when [`ReaderConfigBuilder::build`] runs (explicit value, then the
//!   `ZXING_LIBRARY` environment variable, then a default relative path) and
//!   never looked up again at call time.
//! * [`DecodeOptions`] — per-call knobs that turn into engine flags.

use crate::error::{DecodeError, UnknownFormat};
use crate::pipeline::engine::EngineRunner;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Environment variable naming the directory that holds the engine's jars.
pub const LIBRARY_ENV: &str = "ZXING_LIBRARY";

/// Engine location used when neither an explicit value nor the environment
/// variable is set. Matches running from inside a ZXing source checkout.
pub const DEFAULT_LOCATION: &str = "..";

/// Interpreter used to launch the engine.
pub const DEFAULT_COMMAND: &str = "java";

/// Library archives, relative to the engine location.
pub const DEFAULT_LIBRARIES: &[&str] = &["javase/target/javase-3.4.0-jar-with-dependencies.jar"];

/// Placeholder in the argument template replaced by the joined classpath.
pub const LIBS_PLACEHOLDER: &str = "LIBS";

/// Fixed invocation prefix: classpath flag, classpath slot, headless flag, entry point.
pub const DEFAULT_ARG_TEMPLATE: &[&str] = &[
    "-cp",
    LIBS_PLACEHOLDER,
    "-Djava.awt.headless=true",
    "com.google.zxing.client.j2se.CommandLineRunner",
];

/// Memory-backed scratch location preferred for staged inputs.
pub const MEMORY_SCRATCH_DIR: &str = "/dev/shm";

/// Resolve the engine location from (explicit argument, environment lookup, default).
///
/// Empty values count as unset so `ZXING_LIBRARY=` behaves like an unset
/// variable rather than pointing at the current directory.
pub fn resolve_location(explicit: Option<PathBuf>, env: Option<OsString>) -> PathBuf {
    explicit
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCATION))
}

/// Pick the directory staged inputs are written to.
///
/// `/dev/shm` keeps the round trip through the engine off the disk; the
/// system temp directory is used when it is missing or not writable.
pub fn default_scratch_dir() -> PathBuf {
    scratch_dir_or_temp(Path::new(MEMORY_SCRATCH_DIR))
}

/// `preferred` if a file can be created in it, else the system temp dir.
fn scratch_dir_or_temp(preferred: &Path) -> PathBuf {
    let writable = preferred.is_dir()
        && tempfile::Builder::new()
            .prefix("zxing-probe-")
            .tempfile_in(preferred)
            .is_ok();
    if writable {
        preferred.to_path_buf()
    } else {
        debug!(
            "Scratch dir {} unusable, falling back to the temp dir",
            preferred.display()
        );
        std::env::temp_dir()
    }
}

/// Configuration for a [`crate::BarcodeReader`].
///
/// Built via [`ReaderConfig::builder()`].
///
/// # Example
/// ```rust
/// use zxing_bridge::ReaderConfig;
///
/// let config = ReaderConfig::builder()
///     .location("/opt/zxing")
///     .timeout_secs(20)
///     .build()
///     .unwrap();
/// assert!(config.classpath_entries()[0].starts_with("/opt/zxing"));
/// ```
#[derive(Clone)]
pub struct ReaderConfig {
    /// Directory the library archives are resolved against.
    pub location: PathBuf,

    /// Interpreter (or engine binary) to launch. Default: `java`.
    pub command: String,

    /// Library archives relative to `location`, joined into the classpath.
    pub libraries: Vec<PathBuf>,

    /// Fixed argument prefix. Exactly one element must equal [`LIBS_PLACEHOLDER`].
    pub arg_template: Vec<String>,

    /// Directory staged inputs are written to.
    pub scratch_dir: PathBuf,

    /// Upper bound on one engine run for the async APIs. `None` waits forever.
    ///
    /// The blocking [`crate::BarcodeReader::decode`] never times out.
    pub timeout_secs: Option<u64>,

    /// Number of engine processes the batch and stream APIs run at once. Default: 4.
    pub concurrency: usize,

    /// Pre-constructed engine runner. Replaces process spawning entirely.
    pub runner: Option<Arc<dyn EngineRunner>>,

    /// Optional callback for per-image batch progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("location", &self.location)
            .field("command", &self.command)
            .field("libraries", &self.libraries)
            .field("arg_template", &self.arg_template)
            .field("scratch_dir", &self.scratch_dir)
            .field("timeout_secs", &self.timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("runner", &self.runner.as_ref().map(|_| "<dyn EngineRunner>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DecodeProgressCallback>"),
            )
            .finish()
    }
}

impl ReaderConfig {
    /// Create a new builder for `ReaderConfig`.
    pub fn builder() -> ReaderConfigBuilder {
        ReaderConfigBuilder {
            location: None,
            command: DEFAULT_COMMAND.to_string(),
            libraries: DEFAULT_LIBRARIES.iter().map(PathBuf::from).collect(),
            arg_template: DEFAULT_ARG_TEMPLATE.iter().map(|s| s.to_string()).collect(),
            scratch_dir: None,
            timeout_secs: None,
            concurrency: 4,
            runner: None,
            progress_callback: None,
        }
    }

    /// Resolve everything from the environment and defaults.
    pub fn from_env() -> Result<Self, DecodeError> {
        Self::builder().build()
    }

    /// Full paths of the library archives, in classpath order.
    pub fn classpath_entries(&self) -> Vec<PathBuf> {
        self.libraries.iter().map(|l| self.location.join(l)).collect()
    }
}

/// Builder for [`ReaderConfig`].
pub struct ReaderConfigBuilder {
    location: Option<PathBuf>,
    command: String,
    libraries: Vec<PathBuf>,
    arg_template: Vec<String>,
    scratch_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
    concurrency: usize,
    runner: Option<Arc<dyn EngineRunner>>,
    progress_callback: Option<ProgressCallback>,
}

impl ReaderConfigBuilder {
    pub fn location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Replace the library archive list.
    pub fn libraries<I, P>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.libraries = libraries.into_iter().map(Into::into).collect();
        self
    }

    pub fn arg_template<I, S>(mut self, template: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arg_template = template.into_iter().map(Into::into).collect();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn EngineRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, resolving the engine location and validating
    /// the invocation template.
    pub fn build(self) -> Result<ReaderConfig, DecodeError> {
        let env = std::env::var_os(LIBRARY_ENV);
        self.build_with_env(env)
    }

    /// Like [`build`](Self::build) with the environment lookup supplied by the caller.
    pub fn build_with_env(self, env: Option<OsString>) -> Result<ReaderConfig, DecodeError> {
        if self.command.trim().is_empty() {
            return Err(DecodeError::InvalidConfig("engine command is empty".into()));
        }
        let slots = self
            .arg_template
            .iter()
            .filter(|a| a.as_str() == LIBS_PLACEHOLDER)
            .count();
        if slots != 1 {
            return Err(DecodeError::InvalidConfig(format!(
                "argument template must contain exactly one '{LIBS_PLACEHOLDER}' slot, found {slots}"
            )));
        }
        if self.libraries.is_empty() {
            return Err(DecodeError::InvalidConfig(
                "at least one library archive is required".into(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(DecodeError::InvalidConfig("timeout must be ≥ 1 second".into()));
        }

        Ok(ReaderConfig {
            location: resolve_location(self.location, env),
            command: self.command,
            libraries: self.libraries,
            arg_template: self.arg_template,
            scratch_dir: self.scratch_dir.unwrap_or_else(default_scratch_dir),
            timeout_secs: self.timeout_secs,
            concurrency: self.concurrency,
            runner: self.runner,
            progress_callback: self.progress_callback,
        })
    }
}

// ── Per-call options ─────────────────────────────────────────────────────

/// Engine flags for one decode call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Look for more than one code per image (`--multi`). Default: true.
    pub multi_scan: bool,

    /// Assume the image is a clean, unrotated code with no border (`--pure_barcode`).
    pub pure_barcode: bool,

    /// Restrict detection to these symbologies (`--possible_formats`).
    /// Insertion order is the wire order.
    pub possible_formats: Option<Vec<FormatName>>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            multi_scan: true,
            pure_barcode: false,
            possible_formats: None,
        }
    }
}

impl DecodeOptions {
    pub fn builder() -> DecodeOptionsBuilder {
        DecodeOptionsBuilder {
            options: Self::default(),
        }
    }

    /// The `--possible_formats` value, if any restriction is set. An empty
    /// list restricts nothing.
    pub fn formats_arg(&self) -> Option<String> {
        self.possible_formats
            .as_ref()
            .filter(|formats| !formats.is_empty())
            .map(|formats| {
                formats
                    .iter()
                    .map(FormatName::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            })
    }
}

/// Builder for [`DecodeOptions`].
#[derive(Debug)]
pub struct DecodeOptionsBuilder {
    options: DecodeOptions,
}

impl DecodeOptionsBuilder {
    pub fn multi_scan(mut self, v: bool) -> Self {
        self.options.multi_scan = v;
        self
    }

    pub fn pure_barcode(mut self, v: bool) -> Self {
        self.options.pure_barcode = v;
        self
    }

    /// Add one format to the restriction list. Duplicates are ignored.
    pub fn possible_format(mut self, format: FormatName) -> Self {
        let formats = self.options.possible_formats.get_or_insert_with(Vec::new);
        if !formats.contains(&format) {
            formats.push(format);
        }
        self
    }

    pub fn possible_formats(self, formats: impl IntoIterator<Item = FormatName>) -> Self {
        formats
            .into_iter()
            .fold(self, |builder, f| builder.possible_format(f))
    }

    pub fn build(self) -> DecodeOptions {
        self.options
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Symbologies the engine can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatName {
    #[serde(rename = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    UpcE,
    #[serde(rename = "EAN_13")]
    Ean13,
    #[serde(rename = "EAN_8")]
    Ean8,
    #[serde(rename = "RSS_14")]
    Rss14,
    #[serde(rename = "RSS_EXPANDED")]
    RssExpanded,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "CODE_93")]
    Code93,
    #[serde(rename = "CODE_128")]
    Code128,
    #[serde(rename = "ITF")]
    Itf,
    #[serde(rename = "QR_CODE")]
    QrCode,
    #[serde(rename = "DATA_MATRIX")]
    DataMatrix,
    #[serde(rename = "AZTEC")]
    Aztec,
    #[serde(rename = "PDF_417")]
    Pdf417,
    #[serde(rename = "CODABAR")]
    Codabar,
    #[serde(rename = "MAXICODE")]
    Maxicode,
}

impl FormatName {
    /// Every format, in the order the engine documents them.
    pub const ALL: [FormatName; 16] = [
        FormatName::UpcA,
        FormatName::UpcE,
        FormatName::Ean13,
        FormatName::Ean8,
        FormatName::Rss14,
        FormatName::RssExpanded,
        FormatName::Code39,
        FormatName::Code93,
        FormatName::Code128,
        FormatName::Itf,
        FormatName::QrCode,
        FormatName::DataMatrix,
        FormatName::Aztec,
        FormatName::Pdf417,
        FormatName::Codabar,
        FormatName::Maxicode,
    ];

    /// The engine's spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatName::UpcA => "UPC_A",
            FormatName::UpcE => "UPC_E",
            FormatName::Ean13 => "EAN_13",
            FormatName::Ean8 => "EAN_8",
            FormatName::Rss14 => "RSS_14",
            FormatName::RssExpanded => "RSS_EXPANDED",
            FormatName::Code39 => "CODE_39",
            FormatName::Code93 => "CODE_93",
            FormatName::Code128 => "CODE_128",
            FormatName::Itf => "ITF",
            FormatName::QrCode => "QR_CODE",
            FormatName::DataMatrix => "DATA_MATRIX",
            FormatName::Aztec => "AZTEC",
            FormatName::Pdf417 => "PDF_417",
            FormatName::Codabar => "CODABAR",
            FormatName::Maxicode => "MAXICODE",
        }
    }
}

impl fmt::Display for FormatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatName {
    type Err = UnknownFormat;

    /// Case-insensitive; `-` is accepted in place of `_` (`qr-code`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        FormatName::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// All symbologies the engine knows about.
pub fn list_formats() -> &'static [FormatName] {
    &FormatName::ALL
}
