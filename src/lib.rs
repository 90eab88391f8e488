//! Particulate matter sensor reader
//!
//! Reads PMSx003 and PMS3003 sensors over a serial port, or replays captured
//! frames from a log, and exposes the decoded observations as a paced,
//! retry-aware lazy sequence.

pub mod core;
pub mod hardware;
pub mod sensor;
pub mod stream;
pub mod reader;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use crate::core::{ObsData, RawData, Reading, Sample};
pub use hardware::{MockTransport, SerialTransport, Transport, TransportError};
pub use sensor::{Cmd, Sensor, SensorError};
pub use stream::{Context, MessageStream, ReadOutcome, SensorStream, Stream};
pub use reader::{
    exit_on_fail, open_or_fatal, FatalExit, OpenFailure, Reader, ReaderError, ReaderGuard,
    ReaderResult, ReaderState,
};
pub use utils::{CancelToken, Clock, ReaderConfig, SystemClock};
pub use api::{OutputFormat, Point};
