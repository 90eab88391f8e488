//! Clock, configuration and signal utilities

pub mod clock;
pub mod config;
pub mod signal;

pub use clock::{CancelToken, Cancelled, Clock, MockClock, SystemClock};
pub use config::{ConfigError, ReaderConfig};
pub use signal::cancel_on_ctrl_c;
