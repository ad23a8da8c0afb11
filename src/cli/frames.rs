use std::fs::File;
use std::io::{self, BufWriter, Write};

use aac::process::session::{Event, FrameEvent, ParserSession};
use aac::process::summary::StreamSummary;
use aac::structs::audio_config::AudioConfig;
use anyhow::Result;
use indicatif::MultiProgress;
use serde::Serialize;

use super::analyze::analyze_stream;
use super::command::{Cli, FramesArgs};
use crate::timestamp::ns_str;

#[derive(Debug, Serialize)]
struct FrameDump {
    transport: String,
    frames: Vec<FrameRecord>,
    summary: SummaryRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameRecord {
    index: u64,
    offset: u64,
    size: usize,
    header_size: usize,
    payload_size: usize,
    pts: String,
    pts_ns: u64,
    duration_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<ConfigRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    elements: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigRecord {
    profile: String,
    object_type: u8,
    sampling_frequency: u32,
    output_sampling_frequency: u32,
    channel_configuration: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<usize>,
    frame_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sbr: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ps: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRecord {
    frame_count: u64,
    duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bitrate_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_bitrate: Option<u64>,
    skipped_bytes: u64,
    resynchronizations: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<DiagnosticRecord>,
}

#[derive(Debug, Serialize)]
struct DiagnosticRecord {
    message: String,
    count: u64,
}

impl From<&AudioConfig> for ConfigRecord {
    fn from(config: &AudioConfig) -> Self {
        Self {
            profile: config.profile_name().to_string(),
            object_type: config.object_type,
            sampling_frequency: config.sampling_frequency,
            output_sampling_frequency: config.output_sampling_frequency(),
            channel_configuration: config.channel_configuration,
            channels: config.channels(),
            frame_length: config.frame_length,
            sbr: config.sbr_present,
            ps: config.ps_present,
        }
    }
}

impl From<&FrameEvent> for FrameRecord {
    fn from(frame: &FrameEvent) -> Self {
        Self {
            index: frame.index,
            offset: frame.offset,
            size: frame.size,
            header_size: frame.header_size,
            payload_size: frame.payload_size,
            pts: ns_str(frame.pts_ns),
            pts_ns: frame.pts_ns,
            duration_ns: frame.duration_ns,
            config: frame.config.as_ref().map(ConfigRecord::from),
            crc: frame.adts_header.as_ref().and_then(|header| header.crc_check),
            elements: frame
                .raw_data_block
                .as_ref()
                .map(|info| info.elements.iter().map(|id| format!("{id:?}")).collect())
                .unwrap_or_default(),
        }
    }
}

impl From<&StreamSummary> for SummaryRecord {
    fn from(summary: &StreamSummary) -> Self {
        Self {
            frame_count: summary.frame_count,
            duration: ns_str(summary.duration_ns),
            bitrate_mode: summary.bitrate_mode.map(|mode| mode.to_string()),
            min_bitrate: summary.min_bitrate,
            max_bitrate: summary.max_bitrate,
            average_bitrate: summary.average_bitrate,
            skipped_bytes: summary.skipped_bytes,
            resynchronizations: summary.desync_count,
            diagnostics: summary
                .diagnostics
                .iter()
                .map(|d| DiagnosticRecord {
                    message: d.message.clone(),
                    count: d.count,
                })
                .collect(),
        }
    }
}

pub fn cmd_frames(args: &FramesArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Dumping frames of {}", args.input.display());

    let session = ParserSession::with_mode(cli.parser_config(args.parse_speed), args.transport.into());
    let limit = args.limit.unwrap_or(u64::MAX);
    let mut frames = Vec::new();

    let analysis = analyze_stream(&args.input, session, multi, |event, _| {
        match event {
            Event::Frame(frame) => frames.push(FrameRecord::from(frame)),
            Event::Identified { mode, offset } => {
                log::info!("{mode} stream found at offset {offset}")
            }
            _ => {}
        }

        Ok((frames.len() as u64) < limit)
    })?;

    let dump = FrameDump {
        transport: analysis.summary.mode.to_string(),
        frames,
        summary: SummaryRecord::from(&analysis.summary),
    };
    let yaml = serde_yaml_ng::to_string(&dump)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    writer.write_all(yaml.as_bytes())?;
    writer.flush()?;

    if let Some(path) = &args.output {
        log::info!("Wrote {} frames to {}", dump.frames.len(), path.display());
    }

    Ok(())
}
