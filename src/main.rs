use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use flight_log_rs::report::load_log_bytes;
use flight_log_rs::{Pipeline, PipelineConfig, TrailingDataPolicy};

#[derive(Parser, Debug)]
#[command(name = "flight_log")]
#[command(about = "Decode an M510 flight log and extract the denoised flight segment", long_about = None)]
struct Args {
    /// Binary log (`.gz` is decompressed)
    #[arg(value_name = "LOG")]
    log: PathBuf,

    /// JSON configuration; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the full report as JSON (`.gz` to compress)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fail on unknown tags or truncated records instead of stopping early
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Filter inertial channels on worker threads
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Print only the summary, skip the per-stage details
    #[arg(long, default_value_t = false)]
    summary_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if args.strict {
        config.decoder.trailing_policy = TrailingDataPolicy::Strict;
    }
    if args.parallel {
        config.inertial.parallel_channels = true;
    }

    if !args.log.exists() {
        bail!("log file {} not found", args.log.display());
    }

    println!("[{}] Processing {}", ts_now(), args.log.display());
    let bytes = load_log_bytes(&args.log)
        .with_context(|| format!("reading {}", args.log.display()))?;
    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run(&bytes)?;

    if !args.summary_only {
        println!("  Stream end: {:?}", report.stream_end);
        println!(
            "  Altitude pass: {} samples at {:.2} Hz, SG window {}, {} spikes",
            report.altitude_pass.samples,
            report.altitude_pass.sampling_rate_hz,
            report.altitude_pass.savgol_window,
            report.altitude_pass.spike_times_s.len()
        );
        println!(
            "  Velocity pass: {} samples, {} spikes",
            report.velocity_pass.samples,
            report.velocity_pass.spike_times_s.len()
        );
    }
    println!("{}", report.summary());

    if let Some(path) = &args.output {
        report
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("[{}] Report written to {}", ts_now(), path.display());
    }

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
