use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ===== Raw wire records =====

/// One `'I'` record exactly as logged by the flight computer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawInertialRecord {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
    /// Logged but not used downstream
    pub mag: [i16; 3],
    pub temperature: i16,
    /// Device clock [µs]
    pub timestamp_us: u32,
}

/// One `'B'` record exactly as logged by the flight computer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawBarometricRecord {
    /// Relative altitude computed on-device [m]
    pub altitude_m: f32,
    /// Device clock [µs]
    pub timestamp_us: u32,
}

// ===== Decoded tables =====

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InertialRow {
    #[serde(rename = "timestamp_sec")]
    pub time_s: f64,
    pub accel_x_g: f64,
    pub accel_y_g: f64,
    pub accel_z_g: f64,
    pub gyro_x_dps: f64,
    pub gyro_y_dps: f64,
    pub gyro_z_dps: f64,
    pub temperature_c: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InertialTable {
    pub rows: Vec<InertialRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarometricRow {
    #[serde(rename = "timestamp_sec")]
    pub time_s: f64,
    #[serde(rename = "altitude")]
    pub altitude_m: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BarometricTable {
    pub rows: Vec<BarometricRow>,
}

impl InertialTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.time_s).collect()
    }

    pub fn column(&self, channel: InertialChannel) -> Vec<f64> {
        self.rows.iter().map(|r| channel.get(r)).collect()
    }
}

impl BarometricTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.time_s).collect()
    }

    pub fn altitudes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.altitude_m).collect()
    }
}

/// The six calibrated inertial columns
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InertialChannel {
    #[serde(rename = "accel_x_g")]
    AccelX,
    #[serde(rename = "accel_y_g")]
    AccelY,
    #[serde(rename = "accel_z_g")]
    AccelZ,
    #[serde(rename = "gyro_x_dps")]
    GyroX,
    #[serde(rename = "gyro_y_dps")]
    GyroY,
    #[serde(rename = "gyro_z_dps")]
    GyroZ,
}

impl InertialChannel {
    pub const ALL: [InertialChannel; 6] = [
        InertialChannel::AccelX,
        InertialChannel::AccelY,
        InertialChannel::AccelZ,
        InertialChannel::GyroX,
        InertialChannel::GyroY,
        InertialChannel::GyroZ,
    ];

    pub const ACCEL: [InertialChannel; 3] = [
        InertialChannel::AccelX,
        InertialChannel::AccelY,
        InertialChannel::AccelZ,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            InertialChannel::AccelX => "accel_x_g",
            InertialChannel::AccelY => "accel_y_g",
            InertialChannel::AccelZ => "accel_z_g",
            InertialChannel::GyroX => "gyro_x_dps",
            InertialChannel::GyroY => "gyro_y_dps",
            InertialChannel::GyroZ => "gyro_z_dps",
        }
    }

    pub fn get(self, row: &InertialRow) -> f64 {
        match self {
            InertialChannel::AccelX => row.accel_x_g,
            InertialChannel::AccelY => row.accel_y_g,
            InertialChannel::AccelZ => row.accel_z_g,
            InertialChannel::GyroX => row.gyro_x_dps,
            InertialChannel::GyroY => row.gyro_y_dps,
            InertialChannel::GyroZ => row.gyro_z_dps,
        }
    }

    pub fn get_mut(self, row: &mut InertialRow) -> &mut f64 {
        match self {
            InertialChannel::AccelX => &mut row.accel_x_g,
            InertialChannel::AccelY => &mut row.accel_y_g,
            InertialChannel::AccelZ => &mut row.accel_z_g,
            InertialChannel::GyroX => &mut row.gyro_x_dps,
            InertialChannel::GyroY => &mut row.gyro_y_dps,
            InertialChannel::GyroZ => &mut row.gyro_z_dps,
        }
    }
}

impl std::fmt::Display for InertialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

// ===== Filter stage outputs =====

/// Calibrated inertial table plus the `_filtered` columns
#[derive(Clone, Debug, Default, Serialize)]
pub struct FilteredInertial {
    pub rows: Vec<InertialRow>,
    /// Keyed by source column; serialized as `<column>_filtered`
    #[serde(serialize_with = "serialize_filtered")]
    pub filtered: BTreeMap<InertialChannel, Vec<f64>>,
    /// Biases removed during calibration (gravity excluded)
    pub offsets: BTreeMap<InertialChannel, f64>,
}

fn serialize_filtered<S>(
    filtered: &BTreeMap<InertialChannel, Vec<f64>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(filtered.len()))?;
    for (channel, values) in filtered {
        map.serialize_entry(&format!("{}_filtered", channel.column_name()), values)?;
    }
    map.end()
}

impl FilteredInertial {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One scalar channel after the despike/offset/low-pass/SG/Kalman chain
#[derive(Clone, Debug, Default, Serialize)]
pub struct DenoisedChannel {
    pub name: String,
    pub time_s: Vec<f64>,
    /// Input values at the retained samples (`<name>_raw`)
    pub raw: Vec<f64>,
    /// Despiked and offset-corrected (`<name>`)
    pub corrected: Vec<f64>,
    /// Final Kalman output (`<name>_kalman`)
    pub denoised: Vec<f64>,
    /// Position of each retained sample in the stage input
    pub source_index: Vec<usize>,
    /// Indices (into the retained samples) replaced by the despiker
    pub spike_indices: Vec<usize>,
    pub sampling_rate_hz: f64,
    pub savgol_window: usize,
}

impl DenoisedChannel {
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }
}

/// Joined altitude/velocity row on the velocity pass timebase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    #[serde(rename = "timestamp_sec")]
    pub time_s: f64,
    pub altitude_raw: f64,
    pub altitude: f64,
    pub altitude_kalman: f64,
    pub velocity_raw: f64,
    pub velocity: f64,
    pub velocity_kalman: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BarometricTrack {
    pub rows: Vec<TrackRow>,
}

impl BarometricTrack {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.time_s).collect()
    }

    pub fn altitude_kalman(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.altitude_kalman).collect()
    }
}

/// Flight window in the pre-trim relative timebase
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightInterval {
    pub t_start: f64,
    pub t_end: f64,
    /// True when no sample crossed the launch threshold
    pub degenerate: bool,
}

impl FlightInterval {
    pub fn duration(&self) -> f64 {
        self.t_end - self.t_start
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.t_start && t <= self.t_end
    }
}
