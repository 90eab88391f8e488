//! Reader error types

use crate::hardware::TransportError;
use crate::sensor::{Cmd, Sensor, SensorError};
use crate::utils::clock::Cancelled;
use std::fmt;
use std::path::PathBuf;

/// Why a sensor could not be brought into passive mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailure {
    /// Nothing came back from the port
    DidNotRespond,
    /// Something came back, but not from the expected model
    FailedValidation,
}

impl fmt::Display for OpenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenFailure::DidNotRespond => write!(f, "did not respond"),
            OpenFailure::FailedValidation => write!(f, "failed validation"),
        }
    }
}

/// Errors surfaced by streams and readers
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("{sensor} {operation} {reason}")]
    UnableToRead {
        sensor: Sensor,
        operation: Cmd,
        reason: OpenFailure,
    },

    #[error("{sensor} still warming up after {retries} retries")]
    WarmingUp {
        sensor: Sensor,
        retries: usize,
        #[source]
        source: SensorError,
    },

    #[error("{sensor} gave up after {retries} retries: {source}")]
    PersistentWarning {
        sensor: Sensor,
        retries: usize,
        #[source]
        source: SensorError,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{}:{}: {}", .path.display(), .line, .details)]
    Replay {
        path: PathBuf,
        line: usize,
        details: String,
    },

    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<Cancelled> for ReaderError {
    fn from(_: Cancelled) -> Self {
        ReaderError::Cancelled
    }
}

impl ReaderError {
    /// The device or log cannot be used at all; a caller should usually stop
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReaderError::UnableToRead { .. }
                | ReaderError::Transport(_)
                | ReaderError::Io { .. }
                | ReaderError::Replay { .. }
        )
    }

    /// Ends iteration without anything to report
    pub fn is_silent(&self) -> bool {
        matches!(self, ReaderError::Cancelled)
    }

    pub fn sensor(&self) -> Option<Sensor> {
        match self {
            ReaderError::UnableToRead { sensor, .. }
            | ReaderError::WarmingUp { sensor, .. }
            | ReaderError::PersistentWarning { sensor, .. } => Some(*sensor),
            _ => None,
        }
    }

    /// Sensor operation that failed
    pub fn operation(&self) -> Option<Cmd> {
        match self {
            ReaderError::UnableToRead { operation, .. } => Some(*operation),
            ReaderError::WarmingUp { .. } | ReaderError::PersistentWarning { .. } => {
                Some(Cmd::PassiveRead)
            }
            _ => None,
        }
    }
}

pub type ReaderResult<T> = Result<T, ReaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unable_to_read_message() {
        let err = ReaderError::UnableToRead {
            sensor: Sensor::PMSx003,
            operation: Cmd::PassiveMode,
            reason: OpenFailure::DidNotRespond,
        };
        assert_eq!(err.to_string(), "PMSx003 passive_mode did not respond");
        assert!(err.is_fatal());
        assert_eq!(err.sensor(), Some(Sensor::PMSx003));
        assert_eq!(err.operation(), Some(Cmd::PassiveMode));
    }

    #[test]
    fn test_escalated_errors_keep_source() {
        use std::error::Error;

        let err = ReaderError::WarmingUp {
            sensor: Sensor::PMS3003,
            retries: 3,
            source: SensorError::WarmingUp {
                sensor: Sensor::PMS3003,
            },
        };
        assert!(!err.is_fatal());
        assert!(err.source().is_some());
        assert_eq!(err.operation(), Some(Cmd::PassiveRead));
    }

    #[test]
    fn test_cancelled_is_silent() {
        let err = ReaderError::from(Cancelled);
        assert!(err.is_silent());
        assert!(!err.is_fatal());
        assert_eq!(err.sensor(), None);
    }
}
