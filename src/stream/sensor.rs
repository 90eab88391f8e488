//! Live sensor stream over a serial transport
//!
//! The sensor is woken up after opening the port and put to sleep before
//! closing it. While open it is read in passive mode: one frame per
//! `passive_read` command.
//!
//! PMS3003 sensors do not accept commands; valid frames are extracted from
//! whatever they stream.

use crate::core::PRE_HEAT_TICK;
use crate::hardware::{SerialTransport, Transport, TransportResult};
use crate::reader::{OpenFailure, ReaderError, ReaderResult};
use crate::sensor::{Cmd, Sensor};
use crate::stream::{Context, ReadOutcome, Stream};
use crate::utils::clock::Cancelled;
use std::time::Duration;

/// Progress of the pre-heat wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreHeatTick {
    pub elapsed: u64,
    pub total: u64,
}

/// Pre-heat wait as a sequence of elapsed seconds
///
/// Every step sleeps one tick on the context clock. A cancelled sleep yields
/// `Err(Cancelled)` and ends the sequence.
pub struct PreHeat<'a> {
    ctx: &'a Context,
    total: u64,
    elapsed: u64,
    stopped: bool,
}

impl<'a> PreHeat<'a> {
    pub fn new(ctx: &'a Context, total: u64) -> Self {
        Self {
            ctx,
            total,
            elapsed: 0,
            stopped: false,
        }
    }
}

impl Iterator for PreHeat<'_> {
    type Item = Result<u64, Cancelled>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.elapsed >= self.total {
            return None;
        }
        match self.ctx.sleep(PRE_HEAT_TICK) {
            Ok(()) => {
                self.elapsed += 1;
                Some(Ok(self.elapsed))
            }
            Err(e) => {
                self.stopped = true;
                Some(Err(e))
            }
        }
    }
}

type PreHeatObserver = Box<dyn FnMut(PreHeatTick) + Send>;

/// Stream reading a live sensor in passive mode
pub struct SensorStream {
    sensor: Sensor,
    transport: Box<dyn Transport>,
    pre_heat_secs: u64,
    on_pre_heat: Option<PreHeatObserver>,
}

impl SensorStream {
    pub fn new(sensor: Sensor, transport: impl Transport + 'static) -> Self {
        Self {
            sensor,
            transport: Box::new(transport),
            pre_heat_secs: sensor.pre_heat(),
            on_pre_heat: None,
        }
    }

    /// Stream from a serial port at the model's baud rate
    pub fn serial(sensor: Sensor, port: &str, timeout: Duration) -> Self {
        Self::new(sensor, SerialTransport::new(port, sensor.baud(), timeout))
    }

    /// Override the model's pre-heat time
    pub fn with_pre_heat(mut self, secs: u64) -> Self {
        self.pre_heat_secs = secs;
        self
    }

    /// Observe pre-heat progress, e.g. to render a progress bar
    pub fn on_pre_heat<F>(mut self, observer: F) -> Self
    where
        F: FnMut(PreHeatTick) + Send + 'static,
    {
        self.on_pre_heat = Some(Box::new(observer));
        self
    }

    /// Pre-heat still to be waited on the next open
    pub fn pre_heat_remaining(&self) -> u64 {
        self.pre_heat_secs
    }

    pub fn port(&self) -> &str {
        self.transport.port()
    }

    /// Send a command and return the whole answer
    fn cmd(&mut self, cmd: Cmd) -> TransportResult<Vec<u8>> {
        let command = self.sensor.command(cmd);
        if !command.command.is_empty() {
            self.transport.write(command.command)?;
            self.transport.flush()?;
        } else if cmd.is_read() {
            self.transport.clear_input()?;
        }

        let waiting = self.transport.bytes_to_read()?;
        self.transport.read(command.answer_length.max(waiting))
    }

    fn pre_heat(&mut self, ctx: &Context) -> Result<(), Cancelled> {
        let total = self.pre_heat_secs;
        if total == 0 {
            return Ok(());
        }

        log::info!("pre-heating {} sensor {} sec", self.sensor, total);
        for tick in PreHeat::new(ctx, total) {
            let elapsed = tick?;
            if let Some(observer) = self.on_pre_heat.as_mut() {
                observer(PreHeatTick { elapsed, total });
            }
        }

        // only pre-heat the first time
        self.pre_heat_secs = 0;
        Ok(())
    }

    fn handshake(&mut self, ctx: &Context) -> ReaderResult<()> {
        log::debug!("wake {}", self.sensor);
        let mut buffer = self.cmd(Cmd::Wake)?;
        self.pre_heat(ctx)?;
        buffer.extend(self.cmd(Cmd::PassiveMode)?);
        log::debug!("buffer length: {}", buffer.len());

        if buffer.is_empty() {
            log::error!("{} sensor did not respond, check UART pin connections", self.sensor);
            return Err(self.unable_to_read(OpenFailure::DidNotRespond));
        }

        if !self.sensor.check(&buffer, Cmd::PassiveMode) {
            log::error!("sensor is not {}", self.sensor);
            return Err(self.unable_to_read(OpenFailure::FailedValidation));
        }

        Ok(())
    }

    fn unable_to_read(&self, reason: OpenFailure) -> ReaderError {
        ReaderError::UnableToRead {
            sensor: self.sensor,
            operation: Cmd::PassiveMode,
            reason,
        }
    }

    fn put_to_sleep(&mut self) {
        log::debug!("sleep {}", self.sensor);
        if let Err(e) = self.cmd(Cmd::Sleep) {
            log::warn!("could not put {} to sleep: {}", self.sensor, e);
        }
    }
}

impl Stream for SensorStream {
    fn sensor(&self) -> Sensor {
        self.sensor
    }

    fn open(&mut self, ctx: &Context) -> ReaderResult<()> {
        if !self.transport.is_open() {
            log::debug!("open {}", self.transport.port());
            self.transport.open()?;
        }

        match self.handshake(ctx) {
            Ok(()) => Ok(()),
            Err(e) => {
                // the sensor was woken up, so it goes back to sleep
                if matches!(e, ReaderError::Cancelled) {
                    self.put_to_sleep();
                }
                log::debug!("close {}", self.transport.port());
                self.transport.close();
                Err(e)
            }
        }
    }

    fn read(&mut self, ctx: &Context) -> ReaderResult<ReadOutcome> {
        if !self.transport.is_open() {
            return Ok(ReadOutcome::Exhausted);
        }

        let buffer = self.cmd(Cmd::PassiveRead)?;
        let outcome = ReadOutcome::from_decode(buffer.clone(), self.sensor.decode(&buffer, ctx.timestamp()));
        if let ReadOutcome::Warning(ref e) = outcome {
            log::debug!("{}", e);
            self.transport.clear_input()?;
        }
        Ok(outcome)
    }

    fn close(&mut self, _ctx: &Context) {
        if !self.transport.is_open() {
            return;
        }
        self.put_to_sleep();
        log::debug!("close {}", self.transport.port());
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockTransport;
    use crate::sensor::fixtures;
    use crate::utils::clock::{CancelToken, MockClock};
    use std::sync::{Arc, Mutex};

    fn mock_sensor() -> MockTransport {
        let mock = MockTransport::new("/dev/ttyMOCK");
        mock.stub("wake", b"BM\xe4\x00\x01\x01t", &fixtures::pmsx003_dots());
        mock.stub("passive_mode", b"BM\xe1\x00\x00\x01p", &fixtures::pmsx003_ack());
        mock.stub("passive_read", b"BM\xe2\x00\x00\x01q", &fixtures::pmsx003_dots());
        mock.stub("sleep", b"BM\xe4\x00\x00\x01s", &fixtures::pmsx003_ack());
        mock
    }

    fn context() -> (Context, MockClock) {
        let clock = MockClock::new(Duration::from_secs(1_600_000_000));
        (Context::new(Arc::new(clock.clone()), CancelToken::new()), clock)
    }

    #[test]
    fn test_open_wakes_and_sets_passive_mode() {
        let mock = mock_sensor();
        let (ctx, _) = context();
        let mut stream = SensorStream::new(Sensor::PMSx003, mock.clone());

        stream.open(&ctx).unwrap();
        assert!(mock.is_open());
        assert!(mock.called("wake"));
        assert!(mock.called("passive_mode"));
        assert!(!mock.called("sleep"));

        stream.close(&ctx);
        assert!(mock.called("sleep"));
        assert!(!mock.is_open());
    }

    #[test]
    fn test_read_decodes_with_clock_time() {
        let mock = mock_sensor();
        let (ctx, _) = context();
        let mut stream = SensorStream::new(Sensor::PMSx003, mock.clone());
        stream.open(&ctx).unwrap();

        match stream.read(&ctx).unwrap() {
            ReadOutcome::Reading(reading) => {
                assert_eq!(reading.time(), 1_600_000_000);
                assert_eq!(reading.obs_data.pm10, 11822);
                assert_eq!(reading.buffer, fixtures::pmsx003_dots());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_read_on_closed_stream_is_exhausted() {
        let (ctx, _) = context();
        let mut stream = SensorStream::new(Sensor::PMSx003, mock_sensor());
        assert_eq!(stream.read(&ctx).unwrap(), ReadOutcome::Exhausted);
    }

    #[test]
    fn test_warning_discards_pending_input() {
        let mock = mock_sensor();
        let (ctx, _) = context();
        let mut stream = SensorStream::new(Sensor::PMSx003, mock.clone());
        stream.open(&ctx).unwrap();

        assert!(matches!(stream.read(&ctx).unwrap(), ReadOutcome::Reading(_)));
        assert_eq!(mock.clear_count(), 0);

        mock.stub("passive_read", b"BM\xe2\x00\x00\x01q", &fixtures::pmsx003_corrupted());
        assert!(matches!(stream.read(&ctx).unwrap(), ReadOutcome::Warning(_)));
        assert_eq!(mock.clear_count(), 1);
    }

    #[test]
    fn test_pre_heat_waits_once() {
        let mock = mock_sensor();
        let (ctx, clock) = context();
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let seen = ticks.clone();
        let mut stream = SensorStream::new(Sensor::PMSx003, mock)
            .with_pre_heat(5)
            .on_pre_heat(move |tick| seen.lock().unwrap().push(tick.elapsed));

        stream.open(&ctx).unwrap();
        assert_eq!(clock.slept(), Duration::from_secs(5));
        assert_eq!(*ticks.lock().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(stream.pre_heat_remaining(), 0);

        stream.close(&ctx);
        stream.open(&ctx).unwrap();
        assert_eq!(clock.slept(), Duration::from_secs(5));
    }

    #[test]
    fn test_cancelled_pre_heat_puts_sensor_back_to_sleep() {
        let mock = mock_sensor();
        let (ctx, clock) = context();
        clock.cancel_on_sleep(3);
        let mut stream = SensorStream::new(Sensor::PMSx003, mock.clone()).with_pre_heat(10);

        let err = stream.open(&ctx).unwrap_err();
        assert!(matches!(err, ReaderError::Cancelled));
        assert!(mock.called("sleep"));
        assert!(!mock.is_open());
        assert_eq!(stream.pre_heat_remaining(), 10);
    }

    #[test]
    fn test_sensor_mismatch_fails_validation() {
        let mock = mock_sensor();
        mock.stub("passive_mode", b"BM\xe1\x00\x00\x01p", b"123");
        let (ctx, _) = context();
        let mut stream = SensorStream::new(Sensor::PMSx003, mock.clone());

        let err = stream.open(&ctx).unwrap_err();
        assert!(err.to_string().contains("failed validation"));
        assert!(!mock.called("sleep"));
        assert!(!mock.is_open());
    }

    #[test]
    fn test_silent_sensor_did_not_respond() {
        let mock = mock_sensor();
        let (ctx, _) = context();
        let mut stream = SensorStream::new(Sensor::PMS3003, mock.clone());

        let err = stream.open(&ctx).unwrap_err();
        assert!(err.to_string().contains("did not respond"));
        assert!(matches!(
            err,
            ReaderError::UnableToRead {
                reason: OpenFailure::DidNotRespond,
                ..
            }
        ));
        assert!(mock.written().is_empty());
        assert!(!mock.is_open());
    }

    #[test]
    fn test_pms3003_validates_streamed_frame() {
        let mock = MockTransport::default();
        let (ctx, _) = context();
        let mut stream = SensorStream::new(Sensor::PMS3003, mock.clone());

        // the port is already open and the sensor has been streaming
        let frame = fixtures::frame(b"BM\x00\x14", &[10, 20, 30, 10, 20, 30, 0, 0, 0]);
        let mut port = mock.clone();
        port.open().unwrap();
        mock.inject(&frame);

        stream.open(&ctx).unwrap();
        assert!(mock.written().is_empty());

        // input is discarded before a read, and nothing new has arrived
        mock.inject(&frame);
        assert!(matches!(stream.read(&ctx).unwrap(), ReadOutcome::Warning(_)));
    }
}
