//! Hardware abstraction layer for sensor communication
//!
//! Sensor streams talk to the device through the [`Transport`] trait, so the
//! same acquisition logic drives a real serial port or a scripted mock.

pub mod transport;
pub mod serial;
pub mod mock;
pub mod error;

pub use transport::Transport;
pub use serial::SerialTransport;
pub use mock::MockTransport;
pub use error::{TransportError, TransportResult};
