use anyhow::Result;
use clap::Parser as ClapParser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

use cli::command::{Cli, Commands, LogFormat};
use cli::frames::cmd_frames;
use cli::info::cmd_info;

mod cli;
mod input;
pub(crate) mod timestamp;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let multi = MultiProgress::new();
    let progress = init_logging(&cli, &multi)?;

    match &cli.command {
        Commands::Info(args) => cmd_info(args, &cli, progress),
        Commands::Frames(args) => cmd_frames(args, &cli, progress),
    }
}

/// Installs the logger. Log lines are routed through the progress bars when
/// `--progress` is set, so the returned handle is only present then.
fn init_logging<'a>(cli: &Cli, multi: &'a MultiProgress) -> Result<Option<&'a MultiProgress>> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(cli.loglevel.to_level_filter());

    match cli.log_format {
        LogFormat::Plain => {
            builder.format_timestamp_secs();
        }
        LogFormat::Json => {
            builder.format(|buf, record| {
                use std::io::Write;
                // Debug formatting of the message yields an escaped JSON string.
                writeln!(
                    buf,
                    "{{\"ts\":\"{}\",\"lvl\":\"{}\",\"target\":\"{}\",\"msg\":{:?}}}",
                    buf.timestamp(),
                    record.level(),
                    record.target(),
                    record.args().to_string()
                )
            });
        }
    }

    if !cli.progress {
        builder.try_init()?;
        return Ok(None);
    }

    LogWrapper::new(multi.clone(), builder.build()).try_init()?;
    Ok(Some(multi))
}
