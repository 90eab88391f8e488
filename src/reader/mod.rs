//! Sensor readers
//!
//! A [`Reader`] drives one [`Stream`] through its lifecycle. Opening it
//! returns a [`ReaderGuard`] that closes the stream when dropped, so the
//! sensor is put to sleep on every exit path once it has been opened.
//!
//! ```no_run
//! use pms_reader::reader::Reader;
//! use pms_reader::sensor::Sensor;
//! use pms_reader::stream::SensorStream;
//! use std::time::Duration;
//!
//! let stream = SensorStream::serial(Sensor::PMSx003, "/dev/ttyUSB0", Duration::from_secs(5));
//! let mut reader = Reader::new(stream)
//!     .with_interval(Some(Duration::from_secs(60)))
//!     .with_samples(Some(10));
//!
//! let mut guard = reader.open()?;
//! for obs in guard.observations() {
//!     println!("{:?}", obs?);
//! }
//! # Ok::<(), pms_reader::reader::ReaderError>(())
//! ```

pub mod error;
pub mod fatal;
pub mod samples;

pub use error::{OpenFailure, ReaderError, ReaderResult};
pub use fatal::{exit_on_fail, open_or_fatal, FatalExit};
pub use samples::Samples;

use crate::core::{ObsData, RawData};
use crate::stream::{Context, Stream};
use crate::utils::clock::{CancelToken, Clock};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

/// Reader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Closed,
    Open,
    /// Open; the last sample loop has finished
    Exhausted,
}

/// Paced, bounded reader over a stream
pub struct Reader<S: Stream> {
    stream: S,
    ctx: Context,
    interval: Option<Duration>,
    samples: Option<usize>,
    max_retries: Option<usize>,
    state: ReaderState,
}

impl<S: Stream> Reader<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            ctx: Context::default(),
            interval: None,
            samples: None,
            max_retries: None,
            state: ReaderState::Closed,
        }
    }

    /// Minimum time between readings, measured from the previous reading
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    /// Number of samples per loop; values below 1 read a single sample
    pub fn with_samples(mut self, samples: Option<usize>) -> Self {
        self.samples = samples.map(|n| n.max(1));
        self
    }

    /// Consecutive failed reads tolerated before giving up
    pub fn with_max_retries(mut self, max_retries: Option<usize>) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ctx.clock = clock;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.ctx.cancel = cancel;
        self
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn samples_per_loop(&self) -> Option<usize> {
        self.samples
    }

    pub fn max_retries(&self) -> Option<usize> {
        self.max_retries
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Open the stream. The returned guard closes it again when dropped.
    ///
    /// Open failures are fatal and leave the reader closed.
    pub fn open(&mut self) -> ReaderResult<ReaderGuard<'_, S>> {
        if self.state != ReaderState::Closed {
            self.close();
        }
        if let Err(e) = self.stream.open(&self.ctx) {
            if !e.is_silent() {
                log::error!("unable to open {} reader: {}", self.stream.sensor(), e);
            }
            return Err(e);
        }
        self.state = ReaderState::Open;
        Ok(ReaderGuard { reader: self })
    }

    /// Close the stream if it was opened
    pub fn close(&mut self) {
        if self.state == ReaderState::Closed {
            return;
        }
        self.stream.close(&self.ctx);
        self.state = ReaderState::Closed;
    }

    /// Sample the stream, yielding raw frames when `raw` is set
    ///
    /// A reader that is not open yields nothing.
    pub fn samples(&mut self, raw: bool) -> Samples<'_, S> {
        Samples::new(self, raw)
    }

    pub fn observations(&mut self) -> impl Iterator<Item = ReaderResult<ObsData>> + '_ {
        self.samples(false).filter_map(|sample| match sample {
            Ok(sample) => sample.into_obs().map(Ok),
            Err(e) => Some(Err(e)),
        })
    }

    pub fn raw_data(&mut self) -> impl Iterator<Item = ReaderResult<RawData>> + '_ {
        self.samples(true).filter_map(|sample| match sample {
            Ok(sample) => sample.into_raw().map(Ok),
            Err(e) => Some(Err(e)),
        })
    }
}

/// Open reader; closes the stream on drop
pub struct ReaderGuard<'a, S: Stream> {
    reader: &'a mut Reader<S>,
}

impl<S: Stream> Deref for ReaderGuard<'_, S> {
    type Target = Reader<S>;

    fn deref(&self) -> &Self::Target {
        self.reader
    }
}

impl<S: Stream> DerefMut for ReaderGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reader
    }
}

impl<S: Stream> Drop for ReaderGuard<'_, S> {
    fn drop(&mut self) {
        self.reader.close();
    }
}
