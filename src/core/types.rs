//! Core data types for sensor acquisition

use crate::sensor::Sensor;
use serde::{Deserialize, Serialize};

/// Raw sensor message with the time it was captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawData {
    pub time: i64,
    pub data: Vec<u8>,
}

impl RawData {
    pub fn new(time: i64, data: Vec<u8>) -> Self {
        Self { time, data }
    }

    /// Message bytes as lowercase hex, without separators
    pub fn hex(&self) -> String {
        hex::encode(&self.data)
    }

    /// One line of a hexdump: offset, space separated bytes and printable text.
    ///
    /// The offset is `line * len(data)` when a line number is given and the
    /// capture time otherwise.
    pub fn hexdump(&self, line: Option<usize>) -> String {
        let offset = match line {
            Some(line) => (line * self.data.len()) as i64,
            None => self.time,
        };
        let bytes = self
            .data
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let text: String = self
            .data
            .iter()
            .map(|&b| if (0x20..0x7e).contains(&b) { b as char } else { '.' })
            .collect();
        format!("{:08x}: {}  {}", offset, bytes, text)
    }
}

/// Particle counts per 0.1 L of air, reported by the PMSx003 family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleCounts {
    pub n0_3: u16,
    pub n0_5: u16,
    pub n1_0: u16,
    pub n2_5: u16,
    pub n5_0: u16,
    pub n10_0: u16,
}

impl ParticleCounts {
    fn is_zero(&self) -> bool {
        [self.n0_3, self.n0_5, self.n1_0, self.n2_5, self.n5_0, self.n10_0]
            .iter()
            .all(|&n| n == 0)
    }
}

/// Decoded observation
///
/// Mass concentrations are in ug/m3. `raw*` fields are the factory (CF=1)
/// values, `pm*` the atmospheric ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsData {
    pub time: i64,
    pub sensor: Sensor,
    pub raw01: u16,
    pub raw25: u16,
    pub raw10: u16,
    pub pm01: u16,
    pub pm25: u16,
    pub pm10: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<ParticleCounts>,
}

impl ObsData {
    /// True when every value is zero, which is how the sensor reports warm-up
    pub fn is_blank(&self) -> bool {
        let pm_zero = [self.raw01, self.raw25, self.raw10, self.pm01, self.pm25, self.pm10]
            .iter()
            .all(|&v| v == 0);
        pm_zero && self.counts.map_or(true, |c| c.is_zero())
    }

    /// Mass concentrations must not decrease with particle size
    pub fn is_consistent(&self) -> bool {
        self.pm01 <= self.pm25 && self.pm25 <= self.pm10
    }

    /// Named numeric fields, in a stable order, for downstream publishers
    pub fn measurements(&self) -> Vec<(&'static str, f64)> {
        let mut fields = vec![
            ("raw01", self.raw01 as f64),
            ("raw25", self.raw25 as f64),
            ("raw10", self.raw10 as f64),
            ("pm01", self.pm01 as f64),
            ("pm25", self.pm25 as f64),
            ("pm10", self.pm10 as f64),
        ];
        if let Some(c) = self.counts {
            fields.extend([
                ("n0_3", c.n0_3 as f64),
                ("n0_5", c.n0_5 as f64),
                ("n1_0", c.n1_0 as f64),
                ("n2_5", c.n2_5 as f64),
                ("n5_0", c.n5_0 as f64),
                ("n10_0", c.n10_0 as f64),
            ]);
        }
        fields
    }
}

/// One successful acquisition: the frame as received and its decoded form
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub buffer: Vec<u8>,
    pub obs_data: ObsData,
}

impl Reading {
    pub fn new(buffer: Vec<u8>, obs_data: ObsData) -> Self {
        Self { buffer, obs_data }
    }

    pub fn time(&self) -> i64 {
        self.obs_data.time
    }

    pub fn raw_data(&self) -> RawData {
        RawData::new(self.time(), self.buffer.clone())
    }
}

/// Item produced by a reader, decoded or raw depending on how it was asked
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Obs(ObsData),
    Raw(RawData),
}

impl Sample {
    pub fn time(&self) -> i64 {
        match self {
            Sample::Obs(obs) => obs.time,
            Sample::Raw(raw) => raw.time,
        }
    }

    pub fn into_obs(self) -> Option<ObsData> {
        match self {
            Sample::Obs(obs) => Some(obs),
            Sample::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<RawData> {
        match self {
            Sample::Raw(raw) => Some(raw),
            Sample::Obs(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(pm01: u16, pm25: u16, pm10: u16) -> ObsData {
        ObsData {
            time: 1_600_000_000,
            sensor: Sensor::PMSx003,
            raw01: pm01,
            raw25: pm25,
            raw10: pm10,
            pm01,
            pm25,
            pm10,
            counts: None,
        }
    }

    #[test]
    fn test_hexdump_with_line_number() {
        let raw = RawData::new(0, b"BM\x00\x04..\x00\xef".to_vec());
        assert_eq!(
            raw.hexdump(Some(2)),
            "00000010: 42 4d 00 04 2e 2e 00 ef  BM......"
        );
    }

    #[test]
    fn test_hexdump_defaults_to_time_offset() {
        let raw = RawData::new(0x5f5e1000, vec![0x41, 0x7e, 0x7f, 0x20]);
        assert_eq!(raw.hexdump(None), "5f5e1000: 41 7e 7f 20  A.. ");
    }

    #[test]
    fn test_raw_hex() {
        let raw = RawData::new(0, vec![0x42, 0x4d, 0x00, 0x1c]);
        assert_eq!(raw.hex(), "424d001c");
    }

    #[test]
    fn test_reading_time_comes_from_observation() {
        let reading = Reading::new(vec![1, 2, 3], obs(1, 2, 3));
        assert_eq!(reading.time(), 1_600_000_000);
        assert_eq!(reading.raw_data(), RawData::new(1_600_000_000, vec![1, 2, 3]));
    }

    #[test]
    fn test_blank_and_consistency() {
        assert!(obs(0, 0, 0).is_blank());
        assert!(!obs(0, 0, 1).is_blank());
        assert!(obs(1, 2, 3).is_consistent());
        assert!(!obs(3, 2, 1).is_consistent());
    }

    #[test]
    fn test_measurements_include_counts_when_present() {
        let mut data = obs(1, 2, 3);
        assert_eq!(data.measurements().len(), 6);

        data.counts = Some(ParticleCounts {
            n0_3: 10,
            n0_5: 9,
            n1_0: 8,
            n2_5: 7,
            n5_0: 6,
            n10_0: 5,
        });
        let fields = data.measurements();
        assert_eq!(fields.len(), 12);
        assert_eq!(fields[5], ("pm10", 3.0));
        assert_eq!(fields[11], ("n10_0", 5.0));
    }
}
