use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use flight_log_rs::config::DecoderConfig;
use flight_log_rs::report::load_log_bytes;
use flight_log_rs::{LogDecoder, TrailingDataPolicy};

#[derive(Parser, Debug)]
struct Args {
    /// Binary log (`.gz` is decompressed)
    log: PathBuf,

    /// Fail on unknown tags or truncated records
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Print the first N decoded rows of each table
    #[arg(long, default_value = "0")]
    head: usize,

    /// Dump the decoded tables as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn span(times: &[f64]) -> (f64, f64) {
    match (times.first(), times.last()) {
        (Some(&a), Some(&b)) => (a, b),
        _ => (0.0, 0.0),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = DecoderConfig {
        trailing_policy: if args.strict {
            TrailingDataPolicy::Strict
        } else {
            TrailingDataPolicy::Lenient
        },
        ..DecoderConfig::default()
    };
    let decoder = LogDecoder::new(config);
    let bytes = load_log_bytes(&args.log)?;
    let raw = decoder.parse_records(&bytes)?;
    let raw_inertial_clock = raw
        .inertial
        .first()
        .zip(raw.inertial.last())
        .map(|(a, b)| (a.timestamp_us, b.timestamp_us));
    let raw_barometric_clock = raw
        .barometric
        .first()
        .zip(raw.barometric.last())
        .map(|(a, b)| (a.timestamp_us, b.timestamp_us));
    let decoded = decoder.convert(raw);

    if args.json {
        let dump = serde_json::json!({
            "stream_end": decoded.end,
            "inertial": decoded.inertial,
            "barometric": decoded.barometric,
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    println!("{}: {} bytes", args.log.display(), bytes.len());
    println!("  Stream end: {:?}", decoded.end);

    let (i0, i1) = span(&decoded.inertial.times());
    println!(
        "  Inertial:   {:>7} records, {:.3}s .. {:.3}s",
        decoded.inertial.len(),
        i0,
        i1
    );
    let (b0, b1) = span(&decoded.barometric.times());
    println!(
        "  Barometric: {:>7} records, {:.3}s .. {:.3}s",
        decoded.barometric.len(),
        b0,
        b1
    );

    if let Some((first, last)) = raw_inertial_clock {
        println!("  Raw inertial clock: {} .. {} us", first, last);
    }
    if let Some((first, last)) = raw_barometric_clock {
        println!("  Raw barometric clock: {} .. {} us", first, last);
    }

    for row in decoded.inertial.rows.iter().take(args.head) {
        println!(
            "  I t={:.4} a=({:.3}, {:.3}, {:.3}) g=({:.2}, {:.2}, {:.2}) T={:.1}",
            row.time_s,
            row.accel_x_g,
            row.accel_y_g,
            row.accel_z_g,
            row.gyro_x_dps,
            row.gyro_y_dps,
            row.gyro_z_dps,
            row.temperature_c
        );
    }
    for row in decoded.barometric.rows.iter().take(args.head) {
        println!("  B t={:.4} alt={:.2}", row.time_s, row.altitude_m);
    }

    Ok(())
}
