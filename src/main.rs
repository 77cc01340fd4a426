use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use shimmer_gsr::experiment::DEFAULT_SETTINGS_FILE;
use shimmer_gsr::logging::init_logging;
use shimmer_gsr::protocol::DEFAULT_SAMPLING_HZ;
use shimmer_gsr::{CsvSink, ExperimentSettings, SamplingRate, Session, SessionConfig};

#[derive(Parser, Debug)]
#[command(
    name = "shimmer-gsr",
    about = "Stream GSR and PPG from a wearable sensor into a CSV log"
)]
struct Args {
    /// Serial port of the device (e.g. /dev/rfcomm0 or COM12)
    port: String,
    /// Sampling frequency in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLING_HZ)]
    rate: u32,
    /// Experiment settings file used to name the log
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// Directory the per-subject log tree is created under
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Write the log here instead of deriving a path from the settings
    #[arg(long)]
    output: Option<PathBuf>,
    /// How long to wait for each command acknowledgment
    #[arg(long, default_value_t = 5000)]
    ack_timeout_ms: u64,
    /// Serial read timeout; Ctrl-C is noticed within this interval
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
    /// Log level (overrides SHIMMER_LOG / RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let config = SessionConfig {
        sampling_rate: SamplingRate::from_hz_checked(args.rate)?,
        ack_timeout: Duration::from_millis(args.ack_timeout_ms),
        poll_interval: Duration::from_millis(args.poll_ms),
    };

    let output = match args.output {
        Some(path) => path,
        None => ExperimentSettings::load(&args.settings)?
            .prepare_log_path(&args.root)
            .context("preparing log directory")?,
    };

    let session = Session::open(&args.port, config)
        .with_context(|| format!("opening {}", args.port))?;
    let mut sink = CsvSink::create(&output)
        .with_context(|| format!("creating {}", output.display()))?;
    info!("logging to {}", output.display());

    // Ctrl-C only flips the token; the session notices it between reads.
    let rt = Runtime::new().context("tokio runtime init failed")?;
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    rt.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, stopping");
                on_signal.cancel();
            }
            Err(e) => warn!("cannot listen for Ctrl-C: {}", e),
        }
    });

    let summary = session.run(&mut sink, &cancel)?;
    info!(
        "all done: {} samples, {} stray bytes skipped, {} bytes left unframed",
        summary.samples, summary.discarded_bytes, summary.leftover_bytes
    );
    Ok(())
}
