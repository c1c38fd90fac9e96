//! Binary log decoder.
//!
//! Wire format: 4-byte magic, then repeated `[tag][payload]` records, little-endian:
//! - `'I'` + 24 bytes: 10 × i16 (accel xyz, gyro xyz, mag xyz, temperature) + u32 µs timestamp
//! - `'B'` + 8 bytes: f32 altitude [m] + u32 µs timestamp

use crate::config::DecoderConfig;
use crate::error::{PipelineError, PipelineWarning, Result};
use crate::types::{
    BarometricRow, BarometricTable, InertialRow, InertialTable, RawBarometricRecord,
    RawInertialRecord,
};
use serde::{Deserialize, Serialize};

pub const TAG_INERTIAL: u8 = b'I';
pub const TAG_BAROMETRIC: u8 = b'B';
pub const INERTIAL_PAYLOAD_LEN: usize = 24;
pub const BAROMETRIC_PAYLOAD_LEN: usize = 8;
const HEADER_LEN: usize = 4;

/// What to do with an unknown tag or a short trailing payload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingDataPolicy {
    /// Stop decoding and keep the records read so far
    #[default]
    Lenient,
    /// Fail with `CorruptRecord`
    Strict,
}

/// How the record stream ended
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEnd {
    Eof,
    UnknownTag { offset: usize, tag: u8 },
    Truncated {
        offset: usize,
        tag: u8,
        needed: usize,
        available: usize,
    },
}

impl StreamEnd {
    pub fn as_warning(&self) -> Option<PipelineWarning> {
        match *self {
            StreamEnd::Eof => None,
            StreamEnd::UnknownTag { offset, tag } => Some(PipelineWarning::TruncatedStream {
                offset,
                tag,
                reason: "unknown tag".to_string(),
            }),
            StreamEnd::Truncated {
                offset,
                tag,
                needed,
                available,
            } => Some(PipelineWarning::TruncatedStream {
                offset,
                tag,
                reason: format!("payload needs {} bytes, {} left", needed, available),
            }),
        }
    }
}

/// Raw records in stream order
#[derive(Clone, Debug, Default)]
pub struct RawLog {
    pub inertial: Vec<RawInertialRecord>,
    pub barometric: Vec<RawBarometricRecord>,
    pub end: Option<StreamEnd>,
}

/// Physical-unit tables, each rebased to its own first sample
#[derive(Clone, Debug)]
pub struct DecodedLog {
    pub inertial: InertialTable,
    pub barometric: BarometricTable,
    pub end: StreamEnd,
}

pub struct LogDecoder {
    config: DecoderConfig,
}

impl LogDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Decode a complete log buffer into physical-unit tables
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedLog> {
        let raw = self.parse_records(bytes)?;
        Ok(self.convert(raw))
    }

    /// Scale, sort and rebase already parsed records
    pub fn convert(&self, raw: RawLog) -> DecodedLog {
        let end = raw.end.clone().unwrap_or(StreamEnd::Eof);
        if let Some(warning) = end.as_warning() {
            log::warn!("{}", warning);
        }

        let inertial = self.convert_inertial(raw.inertial);
        let barometric = convert_barometric(raw.barometric);
        log::info!(
            "Decoded {} inertial and {} barometric samples",
            inertial.len(),
            barometric.len()
        );

        DecodedLog {
            inertial,
            barometric,
            end,
        }
    }

    /// Split the byte stream into raw records without unit conversion
    pub fn parse_records(&self, bytes: &[u8]) -> Result<RawLog> {
        let header = &bytes[..bytes.len().min(HEADER_LEN)];
        if header != &self.config.magic[..] {
            return Err(PipelineError::Format {
                expected: self.config.magic.to_vec(),
                found: header.to_vec(),
            });
        }

        let mut log = RawLog::default();
        let mut offset = HEADER_LEN;

        while offset < bytes.len() {
            let tag = bytes[offset];
            let payload_len = match tag {
                TAG_INERTIAL => INERTIAL_PAYLOAD_LEN,
                TAG_BAROMETRIC => BAROMETRIC_PAYLOAD_LEN,
                _ => {
                    let end = StreamEnd::UnknownTag { offset, tag };
                    return self.finish_early(log, end);
                }
            };

            let start = offset + 1;
            let available = bytes.len() - start;
            if available < payload_len {
                let end = StreamEnd::Truncated {
                    offset,
                    tag,
                    needed: payload_len,
                    available,
                };
                return self.finish_early(log, end);
            }

            let payload = &bytes[start..start + payload_len];
            match tag {
                TAG_INERTIAL => log.inertial.push(parse_inertial(payload)),
                _ => log.barometric.push(parse_barometric(payload)),
            }
            offset = start + payload_len;
        }

        log.end = Some(StreamEnd::Eof);
        Ok(log)
    }

    fn finish_early(&self, mut log: RawLog, end: StreamEnd) -> Result<RawLog> {
        match self.config.trailing_policy {
            TrailingDataPolicy::Lenient => {
                log.end = Some(end);
                Ok(log)
            }
            TrailingDataPolicy::Strict => {
                let (offset, tag, reason) = match end {
                    StreamEnd::UnknownTag { offset, tag } => {
                        (offset, tag, "unknown tag".to_string())
                    }
                    StreamEnd::Truncated {
                        offset,
                        tag,
                        needed,
                        available,
                    } => (
                        offset,
                        tag,
                        format!("payload needs {} bytes, {} left", needed, available),
                    ),
                    StreamEnd::Eof => (0, 0, "unexpected end".to_string()),
                };
                Err(PipelineError::CorruptRecord {
                    offset,
                    tag,
                    reason,
                })
            }
        }
    }

    fn convert_inertial(&self, mut records: Vec<RawInertialRecord>) -> InertialTable {
        records.sort_by_key(|r| r.timestamp_us);
        let origin = match records.first() {
            Some(first) => first.timestamp_us as f64 / 1e6,
            None => return InertialTable::default(),
        };

        let accel = self.config.accel_scale;
        let gyro = self.config.gyro_scale;
        let rows = records
            .iter()
            .map(|r| InertialRow {
                time_s: r.timestamp_us as f64 / 1e6 - origin,
                accel_x_g: r.accel[0] as f64 * accel,
                accel_y_g: r.accel[1] as f64 * accel,
                accel_z_g: r.accel[2] as f64 * accel,
                gyro_x_dps: r.gyro[0] as f64 * gyro,
                gyro_y_dps: r.gyro[1] as f64 * gyro,
                gyro_z_dps: r.gyro[2] as f64 * gyro,
                temperature_c: r.temperature as f64 * self.config.temperature_scale
                    + self.config.temperature_offset_c,
            })
            .collect();

        InertialTable { rows }
    }
}

fn convert_barometric(mut records: Vec<RawBarometricRecord>) -> BarometricTable {
    records.sort_by_key(|r| r.timestamp_us);
    let origin = match records.first() {
        Some(first) => first.timestamp_us as f64 / 1e6,
        None => return BarometricTable::default(),
    };

    let rows = records
        .iter()
        .map(|r| BarometricRow {
            time_s: r.timestamp_us as f64 / 1e6 - origin,
            altitude_m: r.altitude_m as f64,
        })
        .collect();

    BarometricTable { rows }
}

fn read_i16(payload: &[u8], index: usize) -> i16 {
    i16::from_le_bytes([payload[2 * index], payload[2 * index + 1]])
}

fn read_u32(payload: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
}

fn parse_inertial(payload: &[u8]) -> RawInertialRecord {
    let field = |i| read_i16(payload, i);
    RawInertialRecord {
        accel: [field(0), field(1), field(2)],
        gyro: [field(3), field(4), field(5)],
        mag: [field(6), field(7), field(8)],
        temperature: field(9),
        timestamp_us: read_u32(payload, 20),
    }
}

fn parse_barometric(payload: &[u8]) -> RawBarometricRecord {
    RawBarometricRecord {
        altitude_m: f32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        timestamp_us: read_u32(payload, 4),
    }
}

/// Serialize one inertial record in wire format (tag included)
pub fn encode_inertial(record: &RawInertialRecord, out: &mut Vec<u8>) {
    out.push(TAG_INERTIAL);
    for v in record
        .accel
        .iter()
        .chain(record.gyro.iter())
        .chain(record.mag.iter())
        .chain(std::iter::once(&record.temperature))
    {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&record.timestamp_us.to_le_bytes());
}

/// Serialize one barometric record in wire format (tag included)
pub fn encode_barometric(record: &RawBarometricRecord, out: &mut Vec<u8>) {
    out.push(TAG_BAROMETRIC);
    out.extend_from_slice(&record.altitude_m.to_le_bytes());
    out.extend_from_slice(&record.timestamp_us.to_le_bytes());
}
