//! `pms`: read a PM sensor, or replay a capture log, and print the samples

use clap::{Args, Parser, Subcommand};
use pms_reader::api::{parse_tags, OutputFormat};
use pms_reader::reader::exit_on_fail;
use pms_reader::sensor::Sensor;
use pms_reader::stream::{MessageStream, SensorStream, Stream};
use pms_reader::utils::{cancel_on_ctrl_c, ConfigError, ReaderConfig};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "pms", author, version, about, long_about = None)]
struct Cli {
    /// Sensor model [env: PMS_SENSOR_MODEL]
    #[arg(short = 'm', long)]
    sensor_model: Option<Sensor>,

    /// Serial port [env: PMS_SERIAL]
    #[arg(short = 's', long)]
    serial_port: Option<String>,

    /// Seconds to wait between updates [env: PMS_INTERVAL]
    #[arg(short = 'i', long)]
    interval: Option<f64>,

    /// Number of samples [env: PMS_SAMPLES]
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Consecutive failed reads tolerated [env: PMS_MAX_RETRIES]
    #[arg(long)]
    max_retries: Option<usize>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print debug messages
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a live sensor
    Serial(OutputArgs),
    /// Replay frames from a capture log
    Replay {
        /// Capture log with sensor,time,hex columns
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Measurement tags for influx output, as a JSON object
    #[arg(short, long, default_value = r#"{"location":"test"}"#)]
    tags: String,
}

fn load_config(cli: &Cli) -> Result<ReaderConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => ReaderConfig::from_file(path)?,
        None => ReaderConfig::default(),
    };
    config.apply_env()?;

    if let Some(sensor) = cli.sensor_model {
        config.sensor = sensor;
    }
    if let Some(port) = &cli.serial_port {
        config.port = port.clone();
    }
    if cli.interval.is_some() {
        config.interval = cli.interval;
    }
    if cli.samples.is_some() {
        config.samples = cli.samples;
    }
    if cli.max_retries.is_some() {
        config.max_retries = cli.max_retries;
    }
    config.validate()?;
    Ok(config)
}

fn sensor_stream(config: &ReaderConfig) -> SensorStream {
    let stream = SensorStream::serial(config.sensor, &config.port, config.timeout())
        .on_pre_heat(|tick| log::info!("pre-heating {}/{} sec", tick.elapsed, tick.total));
    match config.pre_heat_secs {
        Some(secs) => stream.with_pre_heat(secs),
        None => stream,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let (stream, output): (Box<dyn Stream>, &OutputArgs) = match &cli.command {
        Command::Serial(output) => (Box::new(sensor_stream(&config)) as Box<dyn Stream>, output),
        Command::Replay { path, output } => {
            (Box::new(MessageStream::new(path, config.sensor)) as Box<dyn Stream>, output)
        }
    };

    let tags = match parse_tags(&output.tags) {
        Ok(tags) => tags,
        Err(e) => {
            log::error!("invalid tags {}: {}", output.tags, e);
            return ExitCode::from(2);
        }
    };

    let cancel = match cancel_on_ctrl_c() {
        Ok(cancel) => cancel,
        Err(e) => {
            log::error!("Error setting Ctrl-C handler: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut formatter = output.format.formatter(config.sensor, tags);
    let mut reader = config.reader(stream).with_cancel(cancel);
    let mut guard = exit_on_fail(&mut reader);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut status = ExitCode::SUCCESS;
    for sample in guard.samples(output.format.is_raw()) {
        let text = match sample {
            Ok(sample) => formatter.format(&sample).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match text {
            Ok(text) => {
                if writeln!(out, "{}", text).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::error!("{}", e);
                status = ExitCode::FAILURE;
                break;
            }
        }
    }

    drop(guard);
    status
}
