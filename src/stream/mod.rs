//! Sensor streams
//!
//! A [`Stream`] hides where frames come from (a live serial sensor or a
//! capture log) behind `open`/`read`/`close`. Each `read` is a single
//! attempt and reports its outcome as a [`ReadOutcome`], leaving retries and
//! pacing to the reader.

pub mod sensor;
pub mod message;

pub use message::MessageStream;
pub use sensor::{PreHeat, PreHeatTick, SensorStream};

use crate::core::{ObsData, Reading, SETTLE_DELAY};
use crate::reader::ReaderResult;
use crate::sensor::{Sensor, SensorError};
use crate::utils::clock::{CancelToken, Cancelled, Clock, SystemClock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Clock and cancellation token shared by a reader and its stream
#[derive(Clone)]
pub struct Context {
    pub clock: Arc<dyn Clock>,
    pub cancel: CancelToken,
}

impl Context {
    pub fn new(clock: Arc<dyn Clock>, cancel: CancelToken) -> Self {
        Self { clock, cancel }
    }

    /// Cancellable sleep on the context clock
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.clock.sleep(duration, &self.cancel)
    }

    pub fn timestamp(&self) -> i64 {
        self.clock.timestamp()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), CancelToken::new())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("now", &self.clock.now())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Result of one read attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// A valid, decoded frame
    Reading(Reading),
    /// The sensor is still warming up; retry after a settle delay
    NotReady(SensorError),
    /// One frame was rejected; retry immediately
    Warning(SensorError),
    /// No more data will come
    Exhausted,
}

impl ReadOutcome {
    /// Classify a decode result for `buffer`
    pub fn from_decode(buffer: Vec<u8>, decoded: Result<ObsData, SensorError>) -> Self {
        match decoded {
            Ok(obs) => ReadOutcome::Reading(Reading::new(buffer, obs)),
            Err(e) if e.is_not_ready() => ReadOutcome::NotReady(e),
            Err(e) => ReadOutcome::Warning(e),
        }
    }
}

/// Source of sensor frames
pub trait Stream {
    /// Model the frames are decoded as
    fn sensor(&self) -> Sensor;

    /// Bring the source to a known-good state. Failures are fatal and leave
    /// nothing to release.
    fn open(&mut self, ctx: &Context) -> ReaderResult<()>;

    /// One acquisition attempt
    fn read(&mut self, ctx: &Context) -> ReaderResult<ReadOutcome>;

    /// Release the source. Must be safe on a stream that is not open.
    fn close(&mut self, ctx: &Context);

    /// Wait before retrying after [`ReadOutcome::NotReady`]
    fn settle_delay(&self) -> Duration {
        SETTLE_DELAY
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn sensor(&self) -> Sensor {
        (**self).sensor()
    }

    fn open(&mut self, ctx: &Context) -> ReaderResult<()> {
        (**self).open(ctx)
    }

    fn read(&mut self, ctx: &Context) -> ReaderResult<ReadOutcome> {
        (**self).read(ctx)
    }

    fn close(&mut self, ctx: &Context) {
        (**self).close(ctx)
    }

    fn settle_delay(&self) -> Duration {
        (**self).settle_delay()
    }
}
