//! Transport error types

/// Errors raised by a byte transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Serial port could not be configured or opened
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error while talking to the device
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation attempted on a closed port
    #[error("Port {port} is not open")]
    NotOpen { port: String },
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
