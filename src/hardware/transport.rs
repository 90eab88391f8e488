//! Byte transport trait

use crate::hardware::TransportResult;

/// Blocking byte transport to a sensor module
///
/// Every `read` is bounded by the transport's timeout, so a silent device
/// returns fewer bytes than requested instead of hanging.
pub trait Transport: Send {
    /// Address of the device, for logging
    fn port(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Open the device and discard anything already buffered
    fn open(&mut self) -> TransportResult<()>;

    /// Release the device. Safe to call on a closed transport.
    fn close(&mut self);

    fn write(&mut self, data: &[u8]) -> TransportResult<()>;

    /// Block until written data has been sent
    fn flush(&mut self) -> TransportResult<()>;

    /// Number of received bytes waiting to be read
    fn bytes_to_read(&mut self) -> TransportResult<usize>;

    /// Read up to `len` bytes, returning early when the timeout expires
    fn read(&mut self, len: usize) -> TransportResult<Vec<u8>>;

    /// Discard received bytes that have not been read
    fn clear_input(&mut self) -> TransportResult<()>;
}
