//! CLI binary for c3d-convert.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BatchConfig`, runs one batch and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use c3d_convert::{
    artifact_file_name, save_artifact, Batch, BatchConfig, BatchProgressCallback, BatchReport,
    ConversionService, HttpConversionService, JobRecord, JobStatus, ProgressCallback,
    SubmittedFile, TargetFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

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

/// Terminal progress callback: one bar tick per file reaching a terminal
/// state, plus a ✓/✗ line for each. Works when files finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting conversion of {total_files} file(s)…"))
        ));
    }

    fn on_status_change(&self, record: &JobRecord) {
        match &record.status {
            JobStatus::Completed { .. } => {
                self.bar.println(format!("  {} {}", green("✓"), record.file_name));
                self.bar.inc(1);
            }
            JobStatus::Failed { reason } => {
                let msg = reason.to_string();
                // Keep long remote messages on one line.
                let msg = if msg.chars().count() > 80 {
                    format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
                } else {
                    msg
                };
                self.bar.println(format!(
                    "  {} {}  {}",
                    red("✗"),
                    record.file_name,
                    red(&msg)
                ));
                self.bar.inc(1);
            }
            JobStatus::Uploading { .. } => {
                self.bar
                    .set_message(format!("{} uploading {}%", record.file_name, record.progress));
            }
            JobStatus::Queued => {}
            other => self.bar.set_message(format!("{} {}", record.file_name, other)),
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        self.bar.finish_and_clear();
        if report.failed == 0 {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&report.completed.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} failed)",
                if report.completed == 0 { red("✘") } else { cyan("⚠") },
                bold(&report.completed.to_string()),
                report.files.len(),
                red(&report.failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a STEP file to STL and print the download url
  c3d bracket.step --to stl

  # Convert several files and download the results
  c3d gear.obj housing.step --to 3mf -o out/

  # Three files at a time, give up on a job after 5 minutes
  c3d *.stl --to step --concurrency 3 --max-poll-attempts 150

  # Machine-readable report
  c3d part.stl --to obj --json > report.json

SUPPORTED FORMATS:
  stl, step, stp, obj, 3mf

ENVIRONMENT VARIABLES:
  C3D_API_URL             Base url of the conversion API
  C3D_TO                  Default target format
  C3D_CONCURRENCY         Files converted at once
  RUST_LOG                Tracing filter (overrides -v / -q)
"#;

/// Convert 3D model files through a remote conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "c3d",
    version,
    about = "Convert 3D model files (STL, STEP, OBJ, 3MF) through a remote conversion service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files to convert.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Target format.
    #[arg(short, long, env = "C3D_TO", value_enum, default_value = "stl")]
    to: FormatArg,

    /// Base url of the conversion API.
    #[arg(long, env = "C3D_API_URL", default_value = "http://localhost:8000/api")]
    api_url: String,

    /// Number of files converted at once. 1 keeps remote calls strictly serial.
    #[arg(short, long, env = "C3D_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Milliseconds between status polls.
    #[arg(long, env = "C3D_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Give up on a job after this many polls (0 = never).
    #[arg(long, env = "C3D_MAX_POLL_ATTEMPTS", default_value_t = 900)]
    max_poll_attempts: u32,

    /// Timeout for API requests in seconds.
    #[arg(long, env = "C3D_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// Timeout for one file upload in seconds.
    #[arg(long, env = "C3D_UPLOAD_TIMEOUT", default_value_t = 600)]
    upload_timeout: u64,

    /// Timeout for one artifact download in seconds.
    #[arg(long, env = "C3D_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Download converted artifacts into this directory.
    #[arg(short, long, env = "C3D_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "C3D_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "C3D_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "C3D_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "C3D_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Stl,
    Step,
    Stp,
    Obj,
    #[value(name = "3mf")]
    ThreeMf,
}

impl From<FormatArg> for TargetFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Stl => TargetFormat::Stl,
            FormatArg::Step => TargetFormat::Step,
            FormatArg::Stp => TargetFormat::Stp,
            FormatArg::Obj => TargetFormat::Obj,
            FormatArg::ThreeMf => TargetFormat::ThreeMf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Read inputs ──────────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let file = SubmittedFile::from_path(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        files.push(file);
    }

    // ── Build config and service ─────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let service: Arc<dyn ConversionService> = Arc::new(
        HttpConversionService::from_config(&config).context("Failed to set up HTTP client")?,
    );

    // ── Run batch ────────────────────────────────────────────────────────
    let target: TargetFormat = cli.to.into();
    let batch = Batch::new(service, config, target);
    for file in files {
        batch.submit(file);
    }
    let report = batch.run().await.context("Conversion failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if cli.output_dir.is_none() {
        for (record, url) in report.downloads() {
            println!("{}\t{}", record.file_name, url);
        }
    }

    if let Some(ref dir) = cli.output_dir {
        let mut used = HashSet::new();
        for (record, url) in report.downloads() {
            let mut name = artifact_file_name(&record.file_name, target);
            if !used.insert(name.clone()) {
                name = format!("{}-{}", record.id.0, name);
                used.insert(name.clone());
            }
            let dest = dir.join(&name);
            let bytes = save_artifact(url, &dest, cli.download_timeout)
                .await
                .with_context(|| format!("Failed to save {}", record.file_name))?;
            if !cli.quiet && !cli.json {
                eprintln!(
                    "  {} {}  {}",
                    green("↓"),
                    bold(&dest.display().to_string()),
                    dim(&format!("{bytes} bytes"))
                );
            }
        }
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Converted {}/{} file(s) in {}ms",
            report.completed,
            report.files.len(),
            report.total_duration_ms
        );
    }

    if !report.all_succeeded() {
        anyhow::bail!("{} of {} file(s) failed", report.failed, report.files.len());
    }
    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .api_base_url(&cli.api_url)
        .concurrency(cli.concurrency)
        .poll_interval_ms(cli.poll_interval_ms)
        .max_poll_attempts(Some(cli.max_poll_attempts))
        .request_timeout_secs(cli.request_timeout)
        .upload_timeout_secs(cli.upload_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
