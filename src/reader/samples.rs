//! Paced, retry-aware sample iterator

use crate::core::Sample;
use crate::reader::{Reader, ReaderError, ReaderResult, ReaderState};
use crate::sensor::SensorError;
use crate::stream::{ReadOutcome, Stream};
use crate::utils::clock::Cancelled;
use std::time::Duration;

/// Lazy sequence of samples from an open reader
///
/// Each `next` retries the stream until it produces a reading, the retry
/// budget runs out, the stream is exhausted or the context is cancelled.
/// Errors are yielded once and end the sequence; cancellation and
/// exhaustion end it silently.
pub struct Samples<'a, S: Stream> {
    reader: &'a mut Reader<S>,
    raw: bool,
    remaining: Option<usize>,
    retries_left: Option<usize>,
    last_time: Option<i64>,
    done: bool,
}

impl<'a, S: Stream> Samples<'a, S> {
    pub(crate) fn new(reader: &'a mut Reader<S>, raw: bool) -> Self {
        // a finished loop leaves the reader open for the next one
        if reader.state == ReaderState::Exhausted {
            reader.state = ReaderState::Open;
        }
        let done = reader.state == ReaderState::Closed;
        Self {
            remaining: reader.samples,
            retries_left: reader.max_retries,
            raw,
            last_time: None,
            done,
            reader,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.reader.state = ReaderState::Exhausted;
    }

    /// Consume one retry, false once the budget is spent
    fn spend_retry(&mut self) -> bool {
        match self.retries_left.as_mut() {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }

    fn retries_used(&self) -> usize {
        match (self.reader.max_retries, self.retries_left) {
            (Some(max), Some(left)) => max - left,
            _ => 0,
        }
    }

    /// Wait out what is left of the interval since the previous reading
    fn pace(&mut self) -> Result<(), Cancelled> {
        let (Some(interval), Some(last)) = (self.reader.interval, self.last_time) else {
            return Ok(());
        };
        let elapsed = self.reader.ctx.now().as_secs_f64() - last as f64;
        let delay = interval.as_secs_f64() - elapsed;
        if delay > 0.0 {
            log::debug!("next reading in {:.2} sec", delay);
            self.reader.ctx.sleep(Duration::from_secs_f64(delay))?;
        }
        Ok(())
    }

    fn escalate(&mut self, error: SensorError) -> ReaderError {
        let sensor = error.sensor();
        let retries = self.retries_used();
        let escalated = if error.is_not_ready() {
            ReaderError::WarmingUp {
                sensor,
                retries,
                source: error,
            }
        } else {
            ReaderError::PersistentWarning {
                sensor,
                retries,
                source: error,
            }
        };
        log::warn!("{}", escalated);
        escalated
    }
}

impl<S: Stream> Iterator for Samples<'_, S> {
    type Item = ReaderResult<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.pace().is_err() {
            self.finish();
            return None;
        }

        loop {
            if self.reader.ctx.cancel.is_cancelled() {
                self.finish();
                return None;
            }

            let outcome = {
                let reader = &mut *self.reader;
                reader.stream.read(&reader.ctx)
            };
            match outcome {
                Ok(ReadOutcome::Reading(reading)) => {
                    self.retries_left = self.reader.max_retries;
                    self.last_time = Some(reading.time());
                    if let Some(n) = self.remaining.as_mut() {
                        *n -= 1;
                        if *n == 0 {
                            self.finish();
                        }
                    }
                    let sample = if self.raw {
                        Sample::Raw(reading.raw_data())
                    } else {
                        Sample::Obs(reading.obs_data)
                    };
                    return Some(Ok(sample));
                }
                Ok(ReadOutcome::NotReady(error)) => {
                    if !self.spend_retry() {
                        self.finish();
                        return Some(Err(self.escalate(error)));
                    }
                    let delay = self.reader.stream.settle_delay();
                    log::debug!("{}, retry in {} sec", error, delay.as_secs());
                    if self.reader.ctx.sleep(delay).is_err() {
                        self.finish();
                        return None;
                    }
                }
                Ok(ReadOutcome::Warning(error)) => {
                    if !self.spend_retry() {
                        self.finish();
                        return Some(Err(self.escalate(error)));
                    }
                    log::debug!("{}, retry", error);
                }
                Ok(ReadOutcome::Exhausted) | Err(ReaderError::Cancelled) => {
                    self.finish();
                    return None;
                }
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            }
        }
    }
}
