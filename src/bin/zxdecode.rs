//! CLI binary for zxing-bridge.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReaderConfig` / `DecodeOptions` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use zxing_bridge::{
    list_formats, BarcodeReader, BatchOutput, DecodeInput, DecodeOptions,
    DecodeProgressCallback, DecodeResult, FormatName, ImageReport, ProgressCallback,
    ReaderConfig,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// image. Images may finish out of order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-image wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Decoding");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl DecodeProgressCallback for CliProgressCallback {
    fn on_image_start(&self, index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
    }

    fn on_image_complete(&self, index: usize, total: usize, found: usize) {
        let secs = self.elapsed_secs(index);
        let mark = if found > 0 { green("✓") } else { dim("·") };
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {:<10}  {}",
            mark,
            index + 1,
            total,
            dim(&format!("{found} code(s)")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per image; engine errors can be long.
        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} images processed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images processed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Decode one image (engine located via ZXING_LIBRARY)
  zxdecode ticket.png

  # Several images, four engine processes at a time
  zxdecode -c 4 scans/*.png

  # Only look for QR codes and Code 128, single code per image
  zxdecode --formats QR_CODE,CODE_128 --no-multi label.jpg

  # Clean, unrotated code with no border
  zxdecode --pure code.png

  # Read image bytes from stdin
  curl -s https://example.com/qr.png | zxdecode -

  # JSON output
  zxdecode --json *.png > results.json

ENVIRONMENT VARIABLES:
  ZXING_LIBRARY           Directory containing javase/target/javase-*-jar-with-dependencies.jar
  ZXING_JAVA              Java interpreter to launch (default: java)
  ZXDECODE_CONCURRENCY    Engine processes run at once
  ZXDECODE_TIMEOUT        Per-image engine timeout in seconds
  ZXDECODE_SCRATCH_DIR    Where in-memory inputs are staged (default: /dev/shm or the temp dir)
  RUST_LOG                Overrides the log filter (e.g. zxing_bridge=debug)
"#;

/// Decode barcodes and 2D codes in images with the ZXing engine.
#[derive(Parser, Debug)]
#[command(
    name = "zxdecode",
    version,
    about = "Decode barcodes and 2D codes in images with the ZXing engine",
    long_about = "Decode barcodes and 2D codes (QR, Data Matrix, Aztec, PDF417, EAN/UPC, \
Code 39/93/128 and more) by running the ZXing command-line engine once per image \
and parsing its report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file paths, or `-` to read one image from stdin.
    #[arg(required_unless_present = "list_formats")]
    inputs: Vec<String>,

    /// Directory holding the ZXing jars.
    #[arg(short = 'L', long, env = "ZXING_LIBRARY")]
    library: Option<PathBuf>,

    /// Java interpreter used to launch the engine.
    #[arg(long, env = "ZXING_JAVA", default_value = "java")]
    java: String,

    /// Stop after the first code in each image.
    #[arg(long)]
    no_multi: bool,

    /// Assume a clean, unrotated code with no border.
    #[arg(long)]
    pure: bool,

    /// Restrict detection to these formats (comma-separated).
    #[arg(long, value_delimiter = ',')]
    formats: Vec<FormatName>,

    /// Number of engine processes to run at once.
    #[arg(short, long, env = "ZXDECODE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-image engine timeout in seconds.
    #[arg(long, env = "ZXDECODE_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Directory for staging stdin input.
    #[arg(long, env = "ZXDECODE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Output structured JSON (BatchOutput) instead of text.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Print the formats the engine understands and exit.
    #[arg(long)]
    list_formats: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports per-image outcomes, so library INFO
    // logs are suppressed while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inputs.len() > 1;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_formats {
        for f in list_formats() {
            println!("{f}");
        }
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new(cli.inputs.len()) as Arc<dyn DecodeProgressCallback>)
    } else {
        None
    };

    let reader = BarcodeReader::new(build_config(&cli, progress_cb)?);
    let options = build_options(&cli);
    let inputs = read_inputs(&cli.inputs)?;

    let output = reader.decode_batch(inputs, &options).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_text(&output).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !show_progress && !cli.json && output.reports.len() > 1 {
        eprintln!(
            "Processed {} images in {}ms: {} with codes, {} without, {} failed",
            output.stats.total_images,
            output.stats.total_duration_ms,
            output.stats.decoded_images,
            output.stats.not_found_images,
            output.stats.failed_images,
        );
    }

    if output.stats.failed_images > 0 {
        anyhow::bail!(
            "{}/{} inputs could not be decoded",
            output.stats.failed_images,
            output.stats.total_images
        );
    }
    Ok(())
}

/// Map CLI args to `ReaderConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReaderConfig> {
    let mut builder = ReaderConfig::builder()
        .command(cli.java.clone())
        .concurrency(cli.concurrency);

    if let Some(ref library) = cli.library {
        builder = builder.location(library.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI flags to `DecodeOptions`.
fn build_options(cli: &Cli) -> DecodeOptions {
    let mut builder = DecodeOptions::builder()
        .multi_scan(!cli.no_multi)
        .pure_barcode(cli.pure);
    if !cli.formats.is_empty() {
        builder = builder.possible_formats(cli.formats.iter().copied());
    }
    builder.build()
}

/// Turn positional arguments into inputs; `-` reads stdin once.
fn read_inputs(args: &[String]) -> Result<Vec<DecodeInput>> {
    if args.iter().filter(|a| a.as_str() == "-").count() > 1 {
        anyhow::bail!("stdin ('-') can only be given once");
    }
    args.iter()
        .map(|arg| {
            if arg == "-" {
                let mut buf = Vec::new();
                io::stdin()
                    .lock()
                    .read_to_end(&mut buf)
                    .context("Failed to read image from stdin")?;
                Ok(DecodeInput::Bytes(buf))
            } else {
                Ok(DecodeInput::Path(PathBuf::from(arg)))
            }
        })
        .collect()
}

fn print_text(output: &BatchOutput) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let multi = output.reports.len() > 1;
    for report in &output.reports {
        if multi {
            writeln!(out, "{}", report.source)?;
        }
        write_report(&mut out, report, if multi { "  " } else { "" })?;
    }
    Ok(())
}

fn write_report(out: &mut impl Write, report: &ImageReport, indent: &str) -> io::Result<()> {
    if let Some(ref err) = report.error {
        return writeln!(out, "{indent}error: {err}");
    }
    if report.results.is_empty() {
        return writeln!(out, "{indent}no output from engine");
    }
    for (i, result) in report.results.iter().enumerate() {
        match result {
            DecodeResult::NotFound => writeln!(out, "{indent}[{}] no barcode found", i + 1)?,
            DecodeResult::Decoded(code) => {
                let format = if code.format.is_empty() { "?" } else { &code.format };
                writeln!(out, "{indent}[{}] {}", i + 1, format)?;
                for line in code.parsed_text.lines() {
                    writeln!(out, "{indent}    {line}")?;
                }
                if !code.points.is_empty() {
                    let points: Vec<String> = code
                        .points
                        .iter()
                        .map(|p| format!("({}, {})", p.x, p.y))
                        .collect();
                    writeln!(out, "{indent}    points: {}", points.join(" "))?;
                }
            }
        }
    }
    Ok(())
}
