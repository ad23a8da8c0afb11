use std::path::PathBuf;

use aac::process::ContainerMode;
use aac::process::session::ParserConfig;
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        "\naac ", env!("AAC_VERSION"),
        "\nbuilt ", env!("BUILD_TIMESTAMP"),
    ),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Tools for inspecting AAC elementary streams (ADTS, LATM, ADIF)",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Session configuration for the global flags and a parse speed.
    pub fn parser_config(&self, parse_speed: f32) -> ParserConfig {
        ParserConfig {
            strict: self.strict,
            ..ParserConfig::with_parse_speed(parse_speed)
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print stream information
    Info(InfoArgs),

    /// Dump per-frame records as YAML.
    Frames(FramesArgs),
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input AAC bitstream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Trade accuracy for speed (0.0-1.0); lower values scan fewer payloads.
    #[arg(long, value_name = "SPEED", default_value_t = 0.5)]
    pub parse_speed: f32,

    /// Read the whole stream instead of stopping once the payload parse
    /// budget is used up.
    #[arg(long)]
    pub full: bool,

    /// Transport of the input.
    #[arg(long, value_enum, default_value_t = Transport::Auto)]
    pub transport: Transport,
}

#[derive(Debug, Args)]
pub struct FramesArgs {
    /// Input AAC bitstream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path for the YAML dump, stdout when omitted.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<u64>,

    /// Trade accuracy for speed (0.0-1.0); lower values scan fewer payloads.
    #[arg(long, value_name = "SPEED", default_value_t = 1.0)]
    pub parse_speed: f32,

    /// Transport of the input.
    #[arg(long, value_enum, default_value_t = Transport::Auto)]
    pub transport: Transport,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Transport {
    /// Detect from the stream (default).
    Auto,
    /// Audio Data Transport Stream.
    Adts,
    /// LOAS/LATM AudioSyncStream.
    Latm,
    /// Audio Data Interchange Format.
    Adif,
}

impl From<Transport> for ContainerMode {
    fn from(transport: Transport) -> Self {
        match transport {
            Transport::Auto => ContainerMode::Unknown,
            Transport::Adts => ContainerMode::Adts,
            Transport::Latm => ContainerMode::Latm,
            Transport::Adif => ContainerMode::Adif,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}
