use aac::process::ContainerMode;
use aac::process::session::{Event, ParserSession};
use aac::process::summary::StreamSummary;
use aac::structs::adif::AdifHeader;
use aac::structs::audio_config::AudioConfig;
use aac::utils::errors::SessionError;
use anyhow::Result;
use indicatif::MultiProgress;

use super::analyze::{Analysis, analyze_stream};
use super::command::{Cli, InfoArgs};
use crate::timestamp::{ns_str, time_str};

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing AAC stream: {}", args.input.display());

    let session = ParserSession::with_mode(cli.parser_config(args.parse_speed), args.transport.into());
    let full = args.full;

    let result = analyze_stream(&args.input, session, multi, |event, session| {
        if let Event::Identified { mode, offset } = event {
            log::info!("{mode} stream found at offset {offset}");
        }

        Ok(full || !session.budget_exhausted())
    });

    let scanned = match result {
        Ok(analysis) if analysis.summary.mode != ContainerMode::Unknown => {
            display_analysis(&analysis);
            return Ok(());
        }
        Ok(analysis) => analysis.bytes_read,
        Err(e) => unidentified(&e).ok_or(e)?,
    };

    display_unidentified(scanned);
    Ok(())
}

fn display_analysis(analysis: &Analysis) {
    println!();
    println!("AAC Stream Information");
    println!("======================");
    println!();

    if let Some(config) = &analysis.summary.config {
        display_audio_config(analysis.summary.mode, config);
    }

    if let Some(header) = &analysis.summary.adif_header {
        display_adif_header(header);
    }

    display_summary(analysis);
}

/// Bytes scanned without finding a transport, when that is why the analysis
/// failed.
fn unidentified(e: &anyhow::Error) -> Option<u64> {
    match e.downcast_ref::<SessionError>() {
        Some(SessionError::UnsupportedMode { scanned }) => Some(*scanned),
        _ => None,
    }
}

fn display_unidentified(scanned: u64) {
    println!("No AAC transport found in the first {scanned} bytes.");
    println!("This doesn't appear to be a valid AAC stream.");
}

fn display_audio_config(mode: ContainerMode, config: &AudioConfig) {
    println!("Stream Information");
    println!("  Transport                 {mode}");
    println!("  Profile                   {}", config.profile_name());
    println!("  Audio object type         {}", config.object_type);

    if config.sampling_frequency != 0 {
        println!("  Sampling rate             {} Hz", config.sampling_frequency);
    }

    let output_frequency = config.output_sampling_frequency();
    if output_frequency != config.sampling_frequency {
        println!("  Output sampling rate      {output_frequency} Hz");
    }

    match config.channels() {
        Some(channels) => println!(
            "  Channels                  {channels} (configuration {})",
            config.channel_configuration
        ),
        None => println!(
            "  Channel configuration     {}",
            config.channel_configuration
        ),
    }

    println!("  Frame length              {} samples", config.frame_length);

    if let Some(sbr) = config.sbr_present {
        println!("  SBR                       {sbr}");
    }
    if let Some(ps) = config.ps_present {
        println!("  PS                        {ps}");
    }

    if let Some(resilience) = &config.resilience {
        println!("  Error resilience          {resilience:?}");
    }

    if let Some(pce) = &config.program_config {
        if let Some(comment) = pce.comment_str() {
            println!("  Program comment           {comment}");
        }
    }

    println!();
}

fn display_adif_header(header: &AdifHeader) {
    println!("ADIF Header");
    if let Some(copyright_id) = header.copyright_id_str() {
        println!("  Copyright ID              {copyright_id}");
    }
    println!("  Original                  {}", header.original_copy);
    println!("  Home                      {}", header.home);
    println!("  Programs                  {}", header.program_configs.len());
    println!();
}

fn display_summary(analysis: &Analysis) {
    let summary = &analysis.summary;

    println!("Analysis Summary");
    println!("  Frames processed          {}", summary.frame_count);

    let size = analysis.input_len.unwrap_or(analysis.bytes_read);
    let size_mb = size as f64 / 1_000_000.0;
    println!("  Size                      {size_mb:.2} MB ({size} bytes)");

    if let Some(duration) = duration_str(analysis) {
        println!("  Duration                  {duration}");
    }

    if let Some(mode) = summary.bitrate_mode {
        println!("  Bitrate mode              {mode}");
    }

    display_bitrate("Minimum bitrate", summary.min_bitrate);
    display_bitrate("Maximum bitrate", summary.max_bitrate);
    display_bitrate("Average bitrate", summary.average_bitrate);

    if let (Some(min), Some(max)) = (summary.frame_sizes.min(), summary.frame_sizes.max()) {
        println!("  Frame size                {min} - {max} bytes");
    }

    if summary.skipped_bytes > 0 {
        println!("  Skipped bytes             {}", summary.skipped_bytes);
    }
    if summary.desync_count > 0 {
        println!("  Resynchronizations        {}", summary.desync_count);
    }

    println!();

    if !summary.diagnostics.is_empty() {
        println!("Diagnostics");
        for diagnostic in &summary.diagnostics {
            match diagnostic.count {
                1 => println!("  {}", diagnostic.message),
                count => println!("  {} ({count} times)", diagnostic.message),
            }
        }
        if summary.diagnostics.dropped() > 0 {
            println!("  ... and {} more", summary.diagnostics.dropped());
        }
        println!();
    }
}

fn display_bitrate(label: &str, bitrate: Option<u64>) {
    if let Some(bitrate) = bitrate {
        println!("  {label:26}{:.1} kbps", bitrate as f64 / 1000.0);
    }
}

/// Stream duration, extrapolated from the average bitrate when the parse
/// stopped early.
fn duration_str(analysis: &Analysis) -> Option<String> {
    let summary: &StreamSummary = &analysis.summary;

    if analysis.complete || summary.duration_ns == 0 {
        return (summary.duration_ns > 0).then(|| ns_str(summary.duration_ns));
    }

    let len = analysis.input_len?;
    let bitrate = summary.average_bitrate.filter(|&bitrate| bitrate > 0)?;
    let seconds = len as f64 * 8.0 / bitrate as f64;

    Some(format!("{} (estimated)", time_str(seconds)))
}
