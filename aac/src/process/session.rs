//! The container mode state machine.
//!
//! ```text
//! Unknown ──ADIF magic──▶ ADIF ──header──▶ end of stream
//!    │
//!    └──sync──▶ ADTS | LATM ──▶ per frame loop, resynchronizing on loss
//!
//! RawAudioSpecificConfig ──one config──▶ RawDataBlock ──▶ per access unit loop
//! ```
//!
//! A [`ParserSession`] is driven by repeated calls to
//! [`next_event`](ParserSession::next_event). When the buffered window cannot
//! make progress the call returns [`SessionError::NeedMoreData`]; the caller
//! appends input to the same source and calls again. No state is lost across
//! such a suspension.

use anyhow::anyhow;
use log::{debug, trace, warn};

use crate::process::ContainerMode;
use crate::process::parse::{ParsedFrame, Parser};
use crate::process::source::ByteSource;
use crate::process::summary::{FrameSizeStats, StreamSummary};
use crate::process::sync::{self, Framing, SYNC_BYTES, Window};
use crate::structs::adif::{self, AdifHeader};
use crate::structs::adts::{ADTS_HEADER_LEN, AdtsHeader};
use crate::structs::audio_config::{AudioConfig, is_truncation};
use crate::structs::latm::LATM_HEADER_LEN;
use crate::structs::raw_data_block::RawDataBlockInfo;
use crate::utils::errors::{AdifError, ConfigError, SessionError, SyncError};
use crate::utils::timing::FrameClock;

/// Size of an ID3v2 tag header.
const ID3V2_HEADER_LEN: usize = 10;

/// Bytes needed to recognise the ADIF magic.
const ADIF_MAGIC_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserConfig {
    /// Warnings abort the session instead of being recorded.
    pub strict: bool,

    /// Frames whose payload is scanned for syntactic elements. Later frames
    /// only have their headers read.
    pub frames_to_parse: usize,

    /// Bytes scanned in `Unknown` mode before giving up.
    pub sync_budget: u64,

    /// The input is fed by a container demuxer, whole frames at a time.
    pub embedded: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strict: false,
            frames_to_parse: 128,
            sync_budget: 64 * 1024,
            embedded: false,
        }
    }
}

impl ParserConfig {
    /// Maps a parse speed in `0.0..=1.0` to a payload parse budget.
    pub fn with_parse_speed(speed: f32) -> Self {
        let frames_to_parse = if speed >= 0.5 {
            128
        } else if speed >= 0.3 {
            32
        } else {
            2
        };

        Self {
            frames_to_parse,
            ..Default::default()
        }
    }

    pub fn fail_level(&self) -> log::Level {
        if self.strict {
            log::Level::Warn
        } else {
            log::Level::Error
        }
    }
}

/// Where the synchronizer stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    pub mode: ContainerMode,

    /// A frame boundary is known at `offset`.
    pub synchronized: bool,

    /// Stream offset of the next byte to examine.
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The container mode was determined.
    Identified { mode: ContainerMode, offset: u64 },

    /// An out-of-band AudioSpecificConfig was decoded.
    Config(AudioConfig),

    AdifHeader(Box<AdifHeader>),

    Frame(FrameEvent),

    /// The input ended, or nothing more can be read from it.
    EndOfStream(Box<StreamSummary>),
}

/// One frame, or one access unit in raw data block mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameEvent {
    pub index: u64,

    /// Stream offset of the first byte.
    pub offset: u64,
    pub size: usize,
    pub header_size: usize,
    pub payload_size: usize,

    pub pts_ns: u64,
    pub duration_ns: u64,

    /// The configuration, present only when this frame changed it.
    pub config: Option<AudioConfig>,

    pub adts_header: Option<AdtsHeader>,
    pub raw_data_block: Option<RawDataBlockInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running,
    Finished,
    Aborted,
}

/// A resumable parse of one AAC stream.
#[derive(Debug)]
pub struct ParserSession {
    config: ParserConfig,
    sync: SyncState,
    parser: Parser,
    clock: FrameClock,
    frame_sizes: FrameSizeStats,
    status: Status,

    frame_count: u64,
    skipped_bytes: u64,
    unknown_scanned: u64,
    desync_count: u64,

    pending_skip: u64,
    header_checked: bool,
    adif_header: Option<AdifHeader>,
    adif_payload_bytes: u64,
}

impl Default for ParserSession {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl ParserSession {
    pub fn new(config: ParserConfig) -> Self {
        Self::with_mode(config, ContainerMode::Unknown)
    }

    /// Starts in a mode chosen by the caller.
    ///
    /// With [`ContainerMode::RawAudioSpecificConfig`] the first window handed
    /// to [`next_event`](Self::next_event) is the config; afterwards, as in
    /// [`ContainerMode::RawDataBlock`], every window is one access unit.
    pub fn with_mode(config: ParserConfig, mode: ContainerMode) -> Self {
        let mut parser = Parser::default();
        parser.set_fail_level(config.fail_level());

        Self {
            config,
            sync: SyncState {
                mode,
                ..Default::default()
            },
            parser,
            clock: FrameClock::default(),
            frame_sizes: FrameSizeStats::default(),
            status: Status::Running,
            frame_count: 0,
            skipped_bytes: 0,
            unknown_scanned: 0,
            desync_count: 0,
            pending_skip: 0,
            header_checked: false,
            adif_header: None,
            adif_payload_bytes: 0,
        }
    }

    /// Advances the state machine until it can report an event.
    ///
    /// Errors other than [`SessionError::NeedMoreData`] end the session, and
    /// later calls return [`SessionError::Aborted`]. After
    /// [`Event::EndOfStream`] every call returns it again.
    pub fn next_event<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Event, SessionError> {
        match self.status {
            Status::Aborted => return Err(SessionError::Aborted),
            Status::Finished => return Ok(self.end_of_stream()),
            Status::Running => {}
        }

        let result = self.step(source);
        self.sync.offset = source.position();

        match &result {
            Ok(_) | Err(SessionError::NeedMoreData) => {}
            Err(e) => {
                warn!("Session aborted: {e}");
                self.status = Status::Aborted;
            }
        }

        result
    }

    fn step<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<Event, SessionError> {
        loop {
            if self.pending_skip > 0 {
                let n = self.pending_skip.min(source.bytes_available() as u64);
                self.skip(source, n as usize);
                self.pending_skip -= n;

                if self.pending_skip > 0 {
                    if source.is_end_of_stream() {
                        return Ok(self.finish());
                    }
                    return Err(SessionError::NeedMoreData);
                }
            }

            if !self.header_checked
                && matches!(
                    self.sync.mode,
                    ContainerMode::Unknown | ContainerMode::Adif | ContainerMode::Adts
                )
            {
                if let Some(event) = self.check_file_header(source)? {
                    return Ok(event);
                }
                if !self.header_checked {
                    continue;
                }
            }

            let event = match self.sync.mode {
                ContainerMode::RawAudioSpecificConfig => self.read_audio_specific_config(source)?,
                ContainerMode::RawDataBlock => self.read_raw_data_block(source)?,
                ContainerMode::Adif => self.read_adif(source)?,
                ContainerMode::Unknown | ContainerMode::Adts | ContainerMode::Latm => {
                    self.read_frame(source)?
                }
            };

            if let Some(event) = event {
                return Ok(event);
            }
        }
    }

    /// Skips ID3v2 tags and recognises the ADIF magic.
    fn check_file_header<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Event>, SessionError> {
        let window = source.window();
        let end_of_stream = source.is_end_of_stream();

        let may_be_id3 = b"ID3".starts_with(&window[..window.len().min(3)]);
        if window.len() < ID3V2_HEADER_LEN && may_be_id3 && !end_of_stream {
            return Err(SessionError::NeedMoreData);
        }

        if let Some(tag_len) = id3v2_len(window) {
            debug!("Skipping {tag_len} byte ID3v2 tag at offset {}", source.position());
            self.pending_skip = tag_len;
            return Ok(None);
        }

        if window.len() < ADIF_MAGIC_LEN && !end_of_stream {
            return Err(SessionError::NeedMoreData);
        }

        self.header_checked = true;

        if adif::is_adif(window) {
            self.sync.mode = ContainerMode::Adif;
            self.sync.synchronized = true;
            debug!("Identified ADIF at offset {}", source.position());

            return Ok(Some(Event::Identified {
                mode: ContainerMode::Adif,
                offset: source.position(),
            }));
        }

        if self.sync.mode == ContainerMode::Adif {
            let id = window
                .get(..ADIF_MAGIC_LEN)
                .map_or(0, |b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]));
            return Err(SessionError::MalformedFrame {
                offset: source.position(),
                source: anyhow!(AdifError::InvalidAdifId(id)),
            });
        }

        Ok(None)
    }

    fn read_audio_specific_config<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Event>, SessionError> {
        let window = source.window();
        if window.is_empty() {
            return self.wait_or_finish(source);
        }

        let offset = source.position();
        let len = window.len();
        let result = self.parser.parse_audio_specific_config(window);
        source.advance(len);

        self.sync.mode = ContainerMode::RawDataBlock;
        self.sync.synchronized = true;
        debug!("AudioSpecificConfig of {len} bytes, switching to raw_data_block");

        match result {
            Ok(config) => Ok(Some(Event::Config(config))),
            Err(e) => {
                let e = if is_truncation(&e) {
                    anyhow!(ConfigError::Truncated(len as u64 * 8))
                } else {
                    e
                };
                self.report(offset, e)?;
                Ok(None)
            }
        }
    }

    fn read_raw_data_block<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Event>, SessionError> {
        let window = source.window();
        if window.is_empty() {
            return self.wait_or_finish(source);
        }

        let offset = source.position();
        let mut parsed = ParsedFrame {
            payload_size: window.len(),
            blocks: 1,
            ..Default::default()
        };

        if self.within_parse_budget() {
            match self.parser.parse_raw_data_block(window) {
                Ok((info, changed)) => {
                    parsed.raw_data_block = Some(info);
                    parsed.config = changed;
                }
                Err(e) => self.report(offset, e)?,
            }
        }

        let size = window.len();
        source.advance(size);

        Ok(Some(Event::Frame(self.frame_event(offset, size, parsed))))
    }

    fn read_adif<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Event>, SessionError> {
        // Raw data blocks carry no length, so the rest of the stream is only
        // counted.
        if self.adif_header.is_some() {
            let n = source.bytes_available();
            if n == 0 {
                return self.wait_or_finish(source);
            }
            source.advance(n);
            self.adif_payload_bytes += n as u64;
            return Ok(None);
        }

        let offset = source.position();
        match self.parser.parse_adif(source.window()) {
            Ok(header) => {
                source.advance(header.header_len);
                self.adif_header = Some(header.clone());

                Ok(Some(Event::AdifHeader(Box::new(header))))
            }
            Err(e) if is_truncation(&e) && !source.is_end_of_stream() => {
                Err(SessionError::NeedMoreData)
            }
            Err(e) => Err(session_error(offset, e)),
        }
    }

    fn read_frame<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Event>, SessionError> {
        if !self.sync.synchronized {
            return self.synchronize(source);
        }

        let Some(framing) = Framing::for_mode(self.sync.mode) else {
            return Err(SessionError::UnsupportedMode {
                scanned: self.unknown_scanned,
            });
        };

        let window = source.window();
        let offset = source.position();
        let end_of_stream = source.is_end_of_stream();

        if window.len() < SYNC_BYTES {
            if end_of_stream {
                let trailing = window.len();
                self.skip(source, trailing);
                return Ok(Some(self.finish()));
            }
            return Err(SessionError::NeedMoreData);
        }

        if !framing.is_sync(window) {
            self.lose_sync(source, "sync word mismatch");
            return Ok(None);
        }

        let length = match framing.frame_length(window) {
            Some(length) if framing.is_valid_length(length) => length,
            Some(length) => {
                self.lose_sync(source, &format!("invalid frame length {length}"));
                return Ok(None);
            }
            None if end_of_stream => {
                self.lose_sync(source, "truncated header");
                return Ok(None);
            }
            None => return Err(SessionError::NeedMoreData),
        };

        if window.len() < length {
            if end_of_stream {
                warn!(
                    "Truncated frame at offset {offset}: {length} bytes declared, {} available",
                    window.len()
                );
                let trailing = window.len();
                self.skip(source, trailing);
                return Ok(Some(self.finish()));
            }
            return Err(SessionError::NeedMoreData);
        }

        let frame = &window[..length];
        let scan_payload = self.within_parse_budget();
        let result = match framing {
            Framing::Adts => self.parser.parse_adts(frame, scan_payload),
            Framing::Latm => self.parser.parse_latm(frame, scan_payload),
        };

        let parsed = match result {
            Ok(parsed) => parsed,
            Err(e) => {
                self.report(offset, e.context(format!("{} frame at offset {offset}", framing.mode())))?;

                let header_size = match framing {
                    Framing::Adts => ADTS_HEADER_LEN,
                    Framing::Latm => LATM_HEADER_LEN,
                };
                ParsedFrame {
                    header_size,
                    payload_size: length - header_size,
                    blocks: 1,
                    ..Default::default()
                }
            }
        };

        source.advance(length);

        Ok(Some(Event::Frame(self.frame_event(offset, length, parsed))))
    }

    fn synchronize<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Event>, SessionError> {
        let window = Window {
            data: source.window(),
            position: source.position(),
            total_len: source.total_len(),
            embedded: self.config.embedded,
        };
        let scan = sync::synchronize(&window, Framing::candidates(self.sync.mode));

        self.skip(source, scan.skip);
        if self.sync.mode == ContainerMode::Unknown {
            self.unknown_scanned += scan.skip as u64;
            if self.unknown_scanned > self.config.sync_budget {
                return Err(SessionError::UnsupportedMode {
                    scanned: self.unknown_scanned,
                });
            }
        }

        match scan.result {
            Ok(framing) => {
                self.sync.synchronized = true;

                if self.sync.mode == ContainerMode::Unknown {
                    self.sync.mode = framing.mode();
                    debug!("Identified {} at offset {}", self.sync.mode, source.position());

                    return Ok(Some(Event::Identified {
                        mode: self.sync.mode,
                        offset: source.position(),
                    }));
                }

                debug!("Resynchronized at offset {}", source.position());
                Ok(None)
            }
            Err(SyncError::NeedMoreData) => Err(SessionError::NeedMoreData),
            Err(SyncError::NotSynchronized) => {
                if self.sync.mode == ContainerMode::Unknown {
                    return Err(SessionError::UnsupportedMode {
                        scanned: self.unknown_scanned,
                    });
                }
                Ok(Some(self.finish()))
            }
        }
    }

    fn frame_event(&mut self, offset: u64, size: usize, parsed: ParsedFrame) -> FrameEvent {
        let (frame_length, sampling_frequency) = self
            .parser
            .config()
            .map_or((0, 0), |c| (c.frame_length, c.sampling_frequency));

        let pts_ns = self.clock.pts_ns();
        self.clock
            .advance(frame_length, parsed.blocks, sampling_frequency);

        self.frame_sizes.update(size);
        let index = self.frame_count;
        self.frame_count += 1;

        trace!(
            "Frame {index} at offset {offset}: {size} bytes ({} + {}), pts {pts_ns} ns",
            parsed.header_size, parsed.payload_size
        );

        FrameEvent {
            index,
            offset,
            size,
            header_size: parsed.header_size,
            payload_size: parsed.payload_size,
            pts_ns,
            duration_ns: self.clock.pts_ns() - pts_ns,
            config: parsed.config,
            adts_header: parsed.adts_header,
            raw_data_block: parsed.raw_data_block,
        }
    }

    fn lose_sync<S: ByteSource + ?Sized>(&mut self, source: &mut S, reason: &str) {
        warn!(
            "Lost synchronization at offset {}: {reason}",
            source.position()
        );
        self.desync_count += 1;
        self.sync.synchronized = false;
        self.skip(source, 1);
    }

    /// Records a recoverable condition, or ends the session in strict mode.
    fn report(&mut self, offset: u64, e: anyhow::Error) -> Result<(), SessionError> {
        self.parser.report(e).map_err(|e| session_error(offset, e))
    }

    fn skip<S: ByteSource + ?Sized>(&mut self, source: &mut S, n: usize) {
        if n > 0 {
            trace!("Skipping {n} bytes at offset {}", source.position());
            source.advance(n);
            self.skipped_bytes += n as u64;
        }
    }

    fn wait_or_finish<S: ByteSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<Option<Event>, SessionError> {
        if source.is_end_of_stream() {
            return Ok(Some(self.finish()));
        }
        Err(SessionError::NeedMoreData)
    }

    fn within_parse_budget(&self) -> bool {
        self.frame_count < self.config.frames_to_parse as u64
    }

    fn finish(&mut self) -> Event {
        debug!(
            "End of stream after {} frames, {} bytes skipped",
            self.frame_count, self.skipped_bytes
        );
        self.status = Status::Finished;
        self.end_of_stream()
    }

    fn end_of_stream(&self) -> Event {
        Event::EndOfStream(Box::new(self.summary()))
    }

    /// What is known about the stream so far.
    pub fn summary(&self) -> StreamSummary {
        let mut summary = StreamSummary {
            mode: self.sync.mode,
            config: self.parser.config().cloned(),
            adif_header: self.adif_header.clone(),
            frame_count: self.frame_count,
            duration_ns: self.duration_ns(),
            frame_sizes: self.frame_sizes,
            skipped_bytes: self.skipped_bytes,
            desync_count: self.desync_count,
            diagnostics: self.parser.diagnostics().clone(),
            ..Default::default()
        };
        summary.compute_bitrates();

        summary
    }

    fn duration_ns(&self) -> u64 {
        match &self.adif_header {
            Some(header) if header.bitrate != 0 => {
                (self.adif_payload_bytes as u128 * 8 * 1_000_000_000 / header.bitrate as u128)
                    as u64
            }
            Some(_) => 0,
            None => self.clock.pts_ns(),
        }
    }

    pub fn mode(&self) -> ContainerMode {
        self.sync.mode
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    pub fn audio_config(&self) -> Option<&AudioConfig> {
        self.parser.config()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn frames_parsed(&self) -> u64 {
        self.frame_count
    }

    /// Whether the payload parse budget is used up.
    pub fn budget_exhausted(&self) -> bool {
        !self.within_parse_budget()
    }

    pub fn is_finished(&self) -> bool {
        self.status != Status::Running
    }
}

/// Total length of the ID3v2 tag at the start of `bytes`, header and footer
/// included.
fn id3v2_len(bytes: &[u8]) -> Option<u64> {
    let header = bytes.get(..ID3V2_HEADER_LEN)?;
    if &header[..3] != b"ID3" || header[6..].iter().any(|b| b & 0x80 != 0) {
        return None;
    }

    let size = header[6..]
        .iter()
        .fold(0u64, |size, &b| (size << 7) | b as u64);
    let footer = if header[5] & 0x10 != 0 { 10 } else { 0 };

    Some(ID3V2_HEADER_LEN as u64 + size + footer)
}

fn session_error(offset: u64, e: anyhow::Error) -> SessionError {
    if let Some(config_error) = e.downcast_ref::<ConfigError>() {
        return SessionError::MalformedConfig(config_error.clone());
    }
    SessionError::MalformedFrame { offset, source: e }
}
