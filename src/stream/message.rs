//! Replay of captured frames
//!
//! Capture logs are comma separated with a header row naming at least the
//! `sensor`, `time` and `hex` columns. Rows for other sensor models are
//! skipped; the rest are decoded in file order with their stored timestamp.

use crate::core::RawData;
use crate::reader::{ReaderError, ReaderResult};
use crate::sensor::Sensor;
use crate::stream::{Context, ReadOutcome, Stream};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Header written by the capture output format
pub const CAPTURE_HEADER: &str = "sensor,time,hex";

/// One capture log row for a raw frame
pub fn capture_row(sensor: Sensor, raw: &RawData) -> String {
    format!("{},{},{}", sensor.name(), raw.time, raw.hex())
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    sensor: usize,
    time: usize,
    hex: usize,
    count: usize,
}

impl Columns {
    fn parse(header: &str) -> Option<Self> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &str| names.iter().position(|n| *n == name);
        Some(Self {
            sensor: find("sensor")?,
            time: find("time")?,
            hex: find("hex")?,
            count: names.len(),
        })
    }
}

struct Rows {
    lines: Lines<BufReader<File>>,
    columns: Columns,
    line: usize,
}

/// Stream replaying a capture log
pub struct MessageStream {
    path: PathBuf,
    sensor: Sensor,
    rows: Option<Rows>,
}

impl MessageStream {
    pub fn new(path: impl AsRef<Path>, sensor: Sensor) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sensor,
            rows: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay_error(&self, line: usize, details: impl Into<String>) -> ReaderError {
        ReaderError::Replay {
            path: self.path.clone(),
            line,
            details: details.into(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> ReaderError {
        ReaderError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Next row tagged with our sensor model, as `(line, time, hex)`
    fn next_row(&mut self) -> ReaderResult<Option<(usize, String, String)>> {
        let name = self.sensor.name();
        loop {
            let Some(rows) = self.rows.as_mut() else {
                return Ok(None);
            };
            let Some(text) = rows.lines.next() else {
                return Ok(None);
            };
            rows.line += 1;
            let line = rows.line;
            let columns = rows.columns;

            let text = text.map_err(|e| self.io_error(e))?;
            if text.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = text.split(',').map(str::trim).collect();
            if fields.len() < columns.count {
                return Err(self.replay_error(
                    line,
                    format!("expected {} fields, found {}", columns.count, fields.len()),
                ));
            }
            if fields[columns.sensor] != name {
                continue;
            }
            return Ok(Some((
                line,
                fields[columns.time].to_string(),
                fields[columns.hex].to_string(),
            )));
        }
    }
}

impl Stream for MessageStream {
    fn sensor(&self) -> Sensor {
        self.sensor
    }

    fn open(&mut self, _ctx: &Context) -> ReaderResult<()> {
        log::debug!("open {}", self.path.display());
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(header) => header.map_err(|e| self.io_error(e))?,
            None => return Err(self.replay_error(1, "empty capture log")),
        };
        let columns = Columns::parse(&header)
            .ok_or_else(|| self.replay_error(1, format!("missing sensor/time/hex columns: {}", header)))?;

        self.rows = Some(Rows {
            lines,
            columns,
            line: 1,
        });
        Ok(())
    }

    fn read(&mut self, _ctx: &Context) -> ReaderResult<ReadOutcome> {
        let Some((line, time, hex)) = self.next_row()? else {
            return Ok(ReadOutcome::Exhausted);
        };

        let time: i64 = time
            .parse()
            .map_err(|_| self.replay_error(line, format!("invalid time: {}", time)))?;
        let message = hex::decode(&hex).map_err(|e| self.replay_error(line, format!("invalid hex: {}", e)))?;

        let decoded = self.sensor.decode(&message, time);
        Ok(ReadOutcome::from_decode(message, decoded))
    }

    fn close(&mut self, _ctx: &Context) {
        if self.rows.take().is_some() {
            log::debug!("close {}", self.path.display());
        }
    }

    fn settle_delay(&self) -> Duration {
        Duration::ZERO
    }
}
