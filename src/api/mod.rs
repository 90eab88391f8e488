//! Output surfaces for reader samples
//!
//! Text formats for the command line and the time-series publish boundary.

pub mod formatting;
pub mod publish;

pub use formatting::{
    CaptureFormatter, CsvFormatter, FormatError, HexdumpFormatter, InfluxFormatter,
    JsonFormatter, OutputFormat, SampleFormatter,
};
pub use publish::{parse_tags, Point, Tags};
