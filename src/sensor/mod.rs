//! Supported sensor models
//!
//! Each model is described by its serial settings, its pre-heat time and a
//! command table. The rest of the crate only uses [`Sensor::command`],
//! [`Sensor::check`] and [`Sensor::decode`], so adding a model does not touch
//! the acquisition logic.

pub mod error;
pub mod message;

pub use error::{FrameError, Recovery, SensorError, SensorResult};
pub use message::Frame;

use crate::core::{ObsData, ParticleCounts};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensor commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmd {
    Wake,
    PassiveMode,
    PassiveRead,
    Sleep,
}

impl Cmd {
    pub fn name(&self) -> &'static str {
        match self {
            Cmd::Wake => "wake",
            Cmd::PassiveMode => "passive_mode",
            Cmd::PassiveRead => "passive_read",
            Cmd::Sleep => "sleep",
        }
    }

    /// Read commands request a fresh frame
    pub fn is_read(&self) -> bool {
        matches!(self, Cmd::PassiveRead)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bytes to send for a command, and the shape of the expected answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Empty for sensors that do not accept commands
    pub command: &'static [u8],
    pub answer_header: &'static [u8],
    pub answer_length: usize,
}

/// Supported sensor models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    /// PMS5003, PMS7003, PMSA003 and other PMSx003 variants
    PMSx003,
    /// Plantower PMS3003, which only streams and accepts no commands
    PMS3003,
}

const PMSX003_DATA: &[u8] = b"\x42\x4d\x00\x1c";
const PMSX003_ACK: &[u8] = b"\x42\x4d\x00\x04";
const PMS3003_DATA: &[u8] = b"\x42\x4d\x00\x14";

impl Sensor {
    pub const ALL: [Sensor; 2] = [Sensor::PMSx003, Sensor::PMS3003];

    pub fn name(&self) -> &'static str {
        match self {
            Sensor::PMSx003 => "PMSx003",
            Sensor::PMS3003 => "PMS3003",
        }
    }

    pub fn baud(&self) -> u32 {
        9600
    }

    /// Seconds to wait after wake before readings are meaningful
    pub fn pre_heat(&self) -> u64 {
        0
    }

    pub fn command(&self, cmd: Cmd) -> Command {
        match (self, cmd) {
            (Sensor::PMSx003, Cmd::Wake) => Command {
                command: b"\x42\x4d\xe4\x00\x01\x01\x74",
                answer_header: PMSX003_DATA,
                answer_length: 32,
            },
            (Sensor::PMSx003, Cmd::PassiveMode) => Command {
                command: b"\x42\x4d\xe1\x00\x00\x01\x70",
                answer_header: PMSX003_ACK,
                answer_length: 8,
            },
            (Sensor::PMSx003, Cmd::PassiveRead) => Command {
                command: b"\x42\x4d\xe2\x00\x00\x01\x71",
                answer_header: PMSX003_DATA,
                answer_length: 32,
            },
            (Sensor::PMSx003, Cmd::Sleep) => Command {
                command: b"\x42\x4d\xe4\x00\x00\x01\x73",
                answer_header: PMSX003_ACK,
                answer_length: 8,
            },
            (Sensor::PMS3003, Cmd::Wake | Cmd::Sleep) => Command {
                command: b"",
                answer_header: PMS3003_DATA,
                answer_length: 0,
            },
            (Sensor::PMS3003, Cmd::PassiveMode | Cmd::PassiveRead) => Command {
                command: b"",
                answer_header: PMS3003_DATA,
                answer_length: 24,
            },
        }
    }

    /// Does `buffer` hold a valid answer to `cmd` from this model?
    pub fn check(&self, buffer: &[u8], cmd: Cmd) -> bool {
        let answer = self.command(cmd);
        Frame::extract(buffer, answer.answer_header, answer.answer_length).is_ok()
    }

    /// Decode a passive-read answer captured at `time` (epoch seconds)
    pub fn decode(&self, buffer: &[u8], time: i64) -> SensorResult<ObsData> {
        let answer = self.command(Cmd::PassiveRead);
        let frame = Frame::extract(buffer, answer.answer_header, answer.answer_length)
            .map_err(|error| SensorError::Frame {
                sensor: *self,
                error,
            })?;
        let w = frame.words();

        let counts = match self {
            Sensor::PMSx003 => Some(ParticleCounts {
                n0_3: w[6],
                n0_5: w[7],
                n1_0: w[8],
                n2_5: w[9],
                n5_0: w[10],
                n10_0: w[11],
            }),
            Sensor::PMS3003 => None,
        };
        let obs = ObsData {
            time,
            sensor: *self,
            raw01: w[0],
            raw25: w[1],
            raw10: w[2],
            pm01: w[3],
            pm25: w[4],
            pm10: w[5],
            counts,
        };

        if obs.is_blank() {
            return Err(SensorError::WarmingUp { sensor: *self });
        }
        if !obs.is_consistent() {
            return Err(SensorError::InconsistentObservation {
                sensor: *self,
                details: format!("pm01={} pm25={} pm10={}", obs.pm01, obs.pm25, obs.pm10),
            });
        }
        Ok(obs)
    }
}

impl Default for Sensor {
    fn default() -> Self {
        Sensor::PMSx003
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sensor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sensor::ALL
            .iter()
            .copied()
            .find(|sensor| sensor.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported sensor model: {}", s))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_decode_pmsx003() {
        let obs = Sensor::PMSx003.decode(&pmsx003_dots(), 1_600_000_000).unwrap();
        assert_eq!(obs.time, 1_600_000_000);
        assert_eq!(obs.pm10, 11822);
        assert_eq!(obs.counts.unwrap().n10_0, 11822);
    }

    #[test]
    fn test_decode_pms3003() {
        let words = [1, 2, 3, 4, 5, 6, 0, 0, 0];
        let bytes = frame(PMS3003_DATA, &words);
        assert_eq!(bytes.len(), 24);

        let obs = Sensor::PMS3003.decode(&bytes, 42).unwrap();
        assert_eq!((obs.pm01, obs.pm25, obs.pm10), (4, 5, 6));
        assert_eq!((obs.raw01, obs.raw25, obs.raw10), (1, 2, 3));
        assert!(obs.counts.is_none());
    }

    #[test]
    fn test_zero_payload_is_warming_up() {
        let err = Sensor::PMSx003.decode(&pmsx003_zeros(), 0).unwrap_err();
        assert_eq!(err, SensorError::WarmingUp { sensor: Sensor::PMSx003 });
        assert_eq!(err.recovery(), Recovery::RetryWithDelay);
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_bad_checksum_is_retryable() {
        let err = Sensor::PMSx003.decode(&pmsx003_corrupted(), 0).unwrap_err();
        assert!(matches!(
            err,
            SensorError::Frame {
                error: FrameError::Checksum { .. },
                ..
            }
        ));
        assert_eq!(err.recovery(), Recovery::Retry);
    }

    #[test]
    fn test_inconsistent_observation() {
        let mut words = [0u16; 13];
        words[3] = 30; // pm01 above pm25
        words[4] = 20;
        words[5] = 25;
        let err = Sensor::PMSx003.decode(&frame(PMSX003_DATA, &words), 0).unwrap_err();
        assert!(matches!(err, SensorError::InconsistentObservation { .. }));
        assert_eq!(err.recovery(), Recovery::Retry);
    }

    #[test]
    fn test_check_passive_mode_answer() {
        let mut buffer = pmsx003_dots();
        buffer.extend(pmsx003_ack());
        assert!(Sensor::PMSx003.check(&buffer, Cmd::PassiveMode));
        assert!(!Sensor::PMSx003.check(b"123", Cmd::PassiveMode));
        assert!(!Sensor::PMS3003.check(&buffer, Cmd::PassiveMode));
    }

    #[test]
    fn test_pms3003_has_no_commands() {
        for cmd in [Cmd::Wake, Cmd::PassiveMode, Cmd::PassiveRead, Cmd::Sleep] {
            assert!(Sensor::PMS3003.command(cmd).command.is_empty());
        }
    }

    #[test]
    fn test_sensor_from_str() {
        assert_eq!("PMSx003".parse::<Sensor>().unwrap(), Sensor::PMSx003);
        assert_eq!("pms3003".parse::<Sensor>().unwrap(), Sensor::PMS3003);
        assert!("SDS011".parse::<Sensor>().is_err());
    }

    #[test]
    fn test_sensor_serde_uses_model_name() {
        let json = serde_json::to_string(&Sensor::PMS3003).unwrap();
        assert_eq!(json, "\"PMS3003\"");
        let sensor: Sensor = serde_json::from_str("\"PMSx003\"").unwrap();
        assert_eq!(sensor, Sensor::PMSx003);
    }
}
