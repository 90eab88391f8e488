//! Sample output formatting
//!
//! Each formatter turns reader samples into lines of text. Formatters for
//! the raw formats (`hexdump`, `capture`) expect raw samples; the others
//! expect decoded observations.

use crate::api::publish::{Point, Tags};
use crate::core::{ObsData, RawData, Sample};
use crate::sensor::Sensor;
use crate::stream::message::{capture_row, CAPTURE_HEADER};
use std::fmt;

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Comma separated observations with a header row
    Csv,
    /// Hexdump of the raw messages
    Hexdump,
    /// One JSON object per observation
    Json,
    /// Capture log, readable back by `replay`
    Capture,
    /// InfluxDB line protocol, one point per field
    Influx,
}

impl OutputFormat {
    /// Does this format consume raw samples?
    pub fn is_raw(&self) -> bool {
        matches!(self, OutputFormat::Hexdump | OutputFormat::Capture)
    }

    pub fn formatter(&self, sensor: Sensor, tags: Tags) -> Box<dyn SampleFormatter> {
        match self {
            OutputFormat::Csv => Box::new(CsvFormatter::new()),
            OutputFormat::Hexdump => Box::new(HexdumpFormatter::new()),
            OutputFormat::Json => Box::new(JsonFormatter::new()),
            OutputFormat::Capture => Box::new(CaptureFormatter::new(sensor)),
            OutputFormat::Influx => Box::new(InfluxFormatter::new(tags)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Hexdump => "hexdump",
            OutputFormat::Json => "json",
            OutputFormat::Capture => "capture",
            OutputFormat::Influx => "influx",
        };
        f.write_str(name)
    }
}

/// Formatting errors
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{format} output needs {expected} samples")]
    UnexpectedSample {
        format: OutputFormat,
        expected: &'static str,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns samples into output text, possibly several lines per sample
pub trait SampleFormatter {
    fn format(&mut self, sample: &Sample) -> Result<String, FormatError>;
}

fn expect_obs(sample: &Sample, format: OutputFormat) -> Result<&ObsData, FormatError> {
    match sample {
        Sample::Obs(obs) => Ok(obs),
        Sample::Raw(_) => Err(FormatError::UnexpectedSample {
            format,
            expected: "decoded",
        }),
    }
}

fn expect_raw(sample: &Sample, format: OutputFormat) -> Result<&RawData, FormatError> {
    match sample {
        Sample::Raw(raw) => Ok(raw),
        Sample::Obs(_) => Err(FormatError::UnexpectedSample {
            format,
            expected: "raw",
        }),
    }
}

/// CSV formatter for data logging
pub struct CsvFormatter {
    /// Include header row
    pub include_header: bool,
    header_written: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self {
            include_header: true,
            header_written: false,
        }
    }
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSV header for an observation's fields
    pub fn header(obs: &ObsData) -> String {
        let mut header = String::from("time,sensor");
        for (name, _) in obs.measurements() {
            header.push(',');
            header.push_str(name);
        }
        header
    }

    /// Format an observation as a CSV row
    pub fn format_csv(obs: &ObsData) -> String {
        let mut row = format!("{},{}", obs.time, obs.sensor);
        for (_, value) in obs.measurements() {
            row.push(',');
            row.push_str(&value.to_string());
        }
        row
    }
}

impl SampleFormatter for CsvFormatter {
    fn format(&mut self, sample: &Sample) -> Result<String, FormatError> {
        let obs = expect_obs(sample, OutputFormat::Csv)?;
        let row = Self::format_csv(obs);
        if self.include_header && !self.header_written {
            self.header_written = true;
            return Ok(format!("{}\n{}", Self::header(obs), row));
        }
        Ok(row)
    }
}

/// Hexdump of raw messages, numbered by line
#[derive(Default)]
pub struct HexdumpFormatter {
    line: usize,
}

impl HexdumpFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleFormatter for HexdumpFormatter {
    fn format(&mut self, sample: &Sample) -> Result<String, FormatError> {
        let raw = expect_raw(sample, OutputFormat::Hexdump)?;
        let dump = raw.hexdump(Some(self.line));
        self.line += 1;
        Ok(dump)
    }
}

/// JSON formatter for structured output
#[derive(Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl SampleFormatter for JsonFormatter {
    fn format(&mut self, sample: &Sample) -> Result<String, FormatError> {
        let obs = expect_obs(sample, OutputFormat::Json)?;
        Ok(serde_json::to_string(obs)?)
    }
}

/// Capture log rows, header first
pub struct CaptureFormatter {
    sensor: Sensor,
    header_written: bool,
}

impl CaptureFormatter {
    pub fn new(sensor: Sensor) -> Self {
        Self {
            sensor,
            header_written: false,
        }
    }
}

impl SampleFormatter for CaptureFormatter {
    fn format(&mut self, sample: &Sample) -> Result<String, FormatError> {
        let raw = expect_raw(sample, OutputFormat::Capture)?;
        let row = capture_row(self.sensor, raw);
        if !self.header_written {
            self.header_written = true;
            return Ok(format!("{}\n{}", CAPTURE_HEADER, row));
        }
        Ok(row)
    }
}

/// InfluxDB line protocol
pub struct InfluxFormatter {
    tags: Tags,
}

impl InfluxFormatter {
    pub fn new(tags: Tags) -> Self {
        Self { tags }
    }
}

impl SampleFormatter for InfluxFormatter {
    fn format(&mut self, sample: &Sample) -> Result<String, FormatError> {
        let obs = expect_obs(sample, OutputFormat::Influx)?;
        let lines: Vec<String> = Point::from_obs(obs, &self.tags)
            .iter()
            .map(Point::to_line_protocol)
            .collect();
        Ok(lines.join("\n"))
    }
}
