//! Serial/UART transport for sensor modules

use crate::hardware::{Transport, TransportError, TransportResult};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// Serial transport (8N1, no flow control)
///
/// The port is configured at construction and only opened by [`Transport::open`],
/// so a stream can hold the address and reopen it later.
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Configure a serial transport
    ///
    /// # Arguments
    /// * `port_name` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Baud rate (e.g., 9600)
    /// * `timeout` - Upper bound for every read
    pub fn new(port_name: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            timeout,
            port: None,
        }
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn port_mut(&mut self) -> TransportResult<&mut Box<dyn SerialPort>> {
        match self.port.as_mut() {
            Some(port) => Ok(port),
            None => Err(TransportError::NotOpen {
                port: self.port_name.clone(),
            }),
        }
    }
}

impl Transport for SerialTransport {
    fn port(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open(&mut self) -> TransportResult<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;
        port.clear(ClearBuffer::Input)?;

        log::debug!("opened {} at {} baud", self.port_name, self.baud_rate);
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::debug!("closed {}", self.port_name);
        }
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        self.port_mut()?.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        self.port_mut()?.flush()?;
        Ok(())
    }

    fn bytes_to_read(&mut self) -> TransportResult<usize> {
        Ok(self.port_mut()?.bytes_to_read()? as usize)
    }

    /// Read up to `len` bytes; the whole read is bounded by the timeout
    fn read(&mut self, len: usize) -> TransportResult<Vec<u8>> {
        let timeout = self.timeout;
        let port = self.port_mut()?;
        let mut buffer = vec![0u8; len];
        let mut filled = 0;
        let deadline = Instant::now() + timeout;

        while filled < len {
            let Some(left) = remaining(deadline, Instant::now()) else {
                break;
            };
            port.set_timeout(left)?;
            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        port.set_timeout(timeout)?;
        buffer.truncate(filled);
        Ok(buffer)
    }

    fn clear_input(&mut self) -> TransportResult<()> {
        self.port_mut()?.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// Time left before `deadline`, or `None` once it has passed
fn remaining(deadline: Instant, now: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(now)
        .filter(|left| !left.is_zero())
}
