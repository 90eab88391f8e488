//! Sensor message errors and their recovery classes

use crate::sensor::Sensor;

/// Structural problems with a single frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("header {header} not found in {length} bytes")]
    MissingHeader { header: String, length: usize },

    #[error("frame truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },

    #[error("checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    Checksum { expected: u16, received: u16 },
}

/// Errors raised while decoding a sensor answer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    /// Valid frame, but the sensor has not finished warming up
    #[error("{sensor} sensor is warming up")]
    WarmingUp { sensor: Sensor },

    /// Malformed or corrupted frame
    #[error("{sensor} rejected message: {error}")]
    Frame {
        sensor: Sensor,
        #[source]
        error: FrameError,
    },

    /// Valid frame carrying values that cannot all be true
    #[error("{sensor} inconsistent observation: {details}")]
    InconsistentObservation { sensor: Sensor, details: String },
}

/// How a reader should react to a [`SensorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Retry the read immediately
    Retry,
    /// Wait for the sensor to settle, then retry
    RetryWithDelay,
}

impl SensorError {
    /// Get the recovery class for this error
    pub fn recovery(&self) -> Recovery {
        match self {
            SensorError::WarmingUp { .. } => Recovery::RetryWithDelay,
            SensorError::Frame { .. } => Recovery::Retry,
            SensorError::InconsistentObservation { .. } => Recovery::Retry,
        }
    }

    pub fn sensor(&self) -> Sensor {
        match self {
            SensorError::WarmingUp { sensor }
            | SensorError::Frame { sensor, .. }
            | SensorError::InconsistentObservation { sensor, .. } => *sensor,
        }
    }

    /// Not-ready errors clear up with time; everything else is a bad frame
    pub fn is_not_ready(&self) -> bool {
        self.recovery() == Recovery::RetryWithDelay
    }
}

pub type SensorResult<T> = Result<T, SensorError>;
