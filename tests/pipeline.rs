use flight_log_rs::decoder::{encode_barometric, encode_inertial};
use flight_log_rs::types::{InertialChannel, RawBarometricRecord, RawInertialRecord};
use flight_log_rs::{Pipeline, PipelineConfig, PipelineError, PipelineWarning, StreamEnd};
use std::io::Read;

const DEVICE_CLOCK_US: u32 = 5_000_000;
const GROUND_M: f32 = 120.0;

/// Altitude above ground on the corrected timeline: 3 s on the pad, climb to 100 m at
/// t=10 s, descend at 8 m/s, land at 22.5 s
fn profile(t: f64) -> f64 {
    if t < 3.0 {
        0.0
    } else if t < 10.0 {
        100.0 * ((t - 3.0) / 7.0).powi(2)
    } else {
        (100.0 - 8.0 * (t - 10.0)).max(0.0)
    }
}

struct Flight {
    clock_jump_us: u32,
    spike_at: Option<usize>,
    flat: bool,
}

impl Default for Flight {
    fn default() -> Self {
        Self {
            clock_jump_us: 3_000_000,
            spike_at: Some(800),
            flat: false,
        }
    }
}

fn encode(flight: &Flight) -> Vec<u8> {
    let mut out = b"M510".to_vec();

    // 100 Hz inertial, 3 g boost on x between 3 and 5 s
    for k in 0..3000u32 {
        let t = k as f64 * 0.01;
        let ax = if (3.0..5.0).contains(&t) { 6144 } else { 0 };
        encode_inertial(
            &RawInertialRecord {
                accel: [ax, 10, 2048],
                gyro: [131, 0, -131],
                mag: [0, 0, 0],
                temperature: 1634,
                timestamp_us: DEVICE_CLOCK_US + k * 10_000,
            },
            &mut out,
        );

        // 50 Hz barometric, the clock leaps forward at sample 750
        if k % 2 == 0 {
            let i = (k / 2) as usize;
            let t = i as f64 * 0.02;
            let mut altitude = if flight.flat { 0.0 } else { profile(t) as f32 };
            if flight.spike_at == Some(i) {
                altitude += 60.0;
            }
            let jump = if i >= 750 { flight.clock_jump_us } else { 0 };
            encode_barometric(
                &RawBarometricRecord {
                    altitude_m: GROUND_M + altitude,
                    timestamp_us: DEVICE_CLOCK_US + i as u32 * 20_000 + jump,
                },
                &mut out,
            );
        }
    }
    out
}

fn run(bytes: &[u8]) -> flight_log_rs::FlightReport {
    Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run(bytes)
        .unwrap()
}

#[test]
fn test_full_flight() {
    let report = run(&encode(&Flight::default()));

    assert_eq!(report.stream_end, StreamEnd::Eof);
    assert!(report.warnings.is_empty());
    assert_eq!(report.clock_corrections.jumps, 1);
    assert!((report.clock_corrections.total_correction_s - 3.0).abs() < 1e-6);

    assert_eq!(report.altitude_pass.samples, 1499);
    assert_eq!(report.velocity_pass.samples, 1498);
    assert!((report.altitude_pass.sampling_rate_hz - 50.0).abs() < 1e-3);
    assert_eq!(report.altitude_pass.savgol_window, 31);
    assert_eq!(report.altitude_pass.spike_times_s.len(), 1);
    assert!((report.altitude_pass.spike_times_s[0] - 16.0).abs() < 1e-6);

    let interval = report.interval;
    assert!(!interval.degenerate);
    assert!(
        interval.t_start > 0.3 && interval.t_start < 1.2,
        "t_start {}",
        interval.t_start
    );
    assert!(
        interval.t_end > 24.5 && interval.t_end < 26.5,
        "t_end {}",
        interval.t_end
    );

    // Re-based to the segment start
    let first = &report.barometric.rows[0];
    assert!(first.time_s >= 0.0 && first.time_s < 0.03);
    let last = report.barometric.rows.last().unwrap();
    assert!(last.time_s <= interval.duration() + 1e-9);

    let m = &report.metrics;
    assert!((m.apogee.value - 100.0).abs() < 6.0, "apogee {}", m.apogee.value);
    assert!(
        (m.apogee.time_s - (10.0 - interval.t_start)).abs() < 0.5,
        "apogee at {}",
        m.apogee.time_s
    );
    // The extreme sits in the low-pass overshoot right after the apex kink
    assert!(m.max_descent_velocity.value < -7.8);
    let steady: Vec<_> = report
        .barometric
        .rows
        .iter()
        .filter(|r| (12.0..=19.0).contains(&r.time_s))
        .collect();
    assert!(steady.len() > 300);
    for row in steady {
        assert!(
            (row.velocity_kalman + 8.0).abs() < 0.2,
            "v {} at t={}",
            row.velocity_kalman,
            row.time_s
        );
    }
    assert!(m.max_ascent_velocity.value > 20.0);
    // The raw spike outranks the smoothed apex
    assert!((m.raw_peak_time_s - (16.0 - interval.t_start)).abs() < 1e-6);

    let inertial = &report.inertial;
    assert!(!inertial.is_empty());
    assert!(inertial.rows.iter().all(|r| r.time_s >= 0.0));
    for values in inertial.filtered.values() {
        assert_eq!(values.len(), inertial.len());
    }
    let peak = inertial.filtered[&InertialChannel::AccelX]
        .iter()
        .cloned()
        .fold(f64::MIN, f64::max);
    assert!(peak > 2.5, "accel peak {}", peak);
    assert!((inertial.rows[0].temperature_c - 30.0).abs() < 0.01);
}

#[test]
fn test_trailing_garbage_is_a_warning() {
    let mut bytes = encode(&Flight::default());
    bytes.extend_from_slice(b"X\x01\x02");
    let report = run(&bytes);
    assert!(matches!(report.stream_end, StreamEnd::UnknownTag { tag: b'X', .. }));
    assert!(matches!(
        report.warnings.as_slice(),
        [PipelineWarning::TruncatedStream { tag: b'X', .. }]
    ));
}

#[test]
fn test_strict_policy_rejects_trailing_garbage() {
    let mut bytes = encode(&Flight::default());
    let offset = bytes.len();
    bytes.extend_from_slice(b"B\x00\x00");

    let mut config = PipelineConfig::default();
    config.decoder.trailing_policy = flight_log_rs::TrailingDataPolicy::Strict;
    let err = Pipeline::new(config).unwrap().run(&bytes).unwrap_err();
    match err {
        PipelineError::CorruptRecord { offset: at, tag, .. } => {
            assert_eq!(at, offset);
            assert_eq!(tag, b'B');
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_flat_log_is_degenerate() {
    let report = run(&encode(&Flight {
        flat: true,
        spike_at: None,
        ..Flight::default()
    }));
    assert!(report.interval.degenerate);
    assert!(matches!(
        report.warnings.as_slice(),
        [PipelineWarning::DegenerateInterval { .. }]
    ));
    assert_eq!(report.barometric.len(), 1498);
    assert_eq!(report.inertial.len(), 3000);
}

#[test]
fn test_parallel_inertial_matches_sequential() {
    let bytes = encode(&Flight::default());
    let sequential = run(&bytes);
    let mut config = PipelineConfig::default();
    config.inertial.parallel_channels = true;
    let parallel = Pipeline::new(config).unwrap().run(&bytes).unwrap();
    assert_eq!(sequential.inertial.filtered, parallel.inertial.filtered);
}

#[test]
fn test_report_json_columns() {
    let report = run(&encode(&Flight::default()));
    let path = std::env::temp_dir().join(format!("flight_report_{}.json.gz", std::process::id()));
    report.write_json(&path).unwrap();

    let mut json = String::new();
    flate2::read::GzDecoder::new(std::fs::File::open(&path).unwrap())
        .read_to_string(&mut json)
        .unwrap();
    std::fs::remove_file(&path).ok();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let row = &value["barometric"]["rows"][0];
    for column in [
        "timestamp_sec",
        "altitude_raw",
        "altitude",
        "altitude_kalman",
        "velocity_kalman",
    ] {
        assert!(row.get(column).is_some(), "missing {}", column);
    }
    assert!(value["inertial"]["filtered"]["accel_x_g_filtered"].is_array());
    assert!(value["inertial"]["rows"][0]["accel_z_g"].is_number());
    assert_eq!(value["stream_end"]["kind"], "eof");
}
