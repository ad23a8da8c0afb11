/// Logs a recoverable condition, or returns it as an error when its level is
/// at or above the configured fail level.
///
/// The state must expose `fail_level: log::Level` and
/// `diagnostics: Diagnostics`; logged conditions are also recorded there.
#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        let err = $err;
        if $level <= $state.fail_level {
            return Err(err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", err),
                ::log::Level::Warn => ::log::warn!("{}", err),
                ::log::Level::Info => ::log::info!("{}", err),
                ::log::Level::Debug => ::log::debug!("{}", err),
                ::log::Level::Trace => ::log::trace!("{}", err),
            }
            $state.diagnostics.record(err.to_string());
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum BitReaderError {
    #[error("Insufficient bits: requested {requested}, {available} available")]
    InsufficientBits { requested: u32, available: u64 },

    #[error("Read width must be between 1 and 32 bits, got {0}")]
    InvalidWidth(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    #[error("Insufficient buffered data to validate the frame candidate")]
    NeedMoreData,

    #[error("Candidate does not start a valid frame chain")]
    NotSynchronized,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Reserved audioObjectType {0}")]
    ReservedObjectType(u8),

    #[error("Unsupported audioObjectType {0}, specific config is not parsed")]
    UnsupportedObjectType(u8),

    #[error("Reserved samplingFrequencyIndex {0:#X}")]
    ReservedSamplingFrequencyIndex(u8),

    #[error("Reserved channelConfiguration {0}")]
    ReservedChannelConfiguration(u8),

    #[error("frameLengthFlag must be 0 for AAC SSR")]
    InvalidSsrFrameLength,

    #[error("Unsupported epConfig {0}, error protection config is not parsed")]
    UnsupportedEpConfig(u8),

    #[error("Explicit sampling frequency must not be zero")]
    ZeroSamplingFrequency,

    #[error("AudioSpecificConfig truncated after {0} bits")]
    Truncated(u64),
}

#[derive(thiserror::Error, Debug)]
pub enum AdtsError {
    #[error("Invalid ADTS syncword, read {0:#05X}")]
    InvalidSyncword(u16),

    #[error("ADTS layer must be 0, read {0}")]
    InvalidLayer(u8),

    #[error("aac_frame_length {length} is shorter than the header ({header} bytes)")]
    FrameTooShort { length: usize, header: usize },

    #[error("ADTS header configuration changed: {0}")]
    ConfigChanged(String),
}

#[derive(thiserror::Error, Debug)]
pub enum LatmError {
    #[error("Invalid LATM syncword, read {0:#05X}")]
    InvalidSyncword(u16),

    #[error("audioMuxVersionA = 1 is reserved")]
    ReservedMuxVersionA,

    #[error("AudioMuxElement references a StreamMuxConfig that was never received")]
    MissingStreamMuxConfig,

    #[error("frameLengthType {0} has no payload length information")]
    UnsupportedFrameLengthType(u8),

    #[error("Chunked payload framing (allStreamsSameTimeFraming = 0) is not supported")]
    UnsupportedChunkedFraming,

    #[error("Embedded AudioSpecificConfig overruns its ascLen of {0} bits")]
    ConfigOverrun(u32),

    #[error("PayloadMux of {payload} bytes exceeds the {available} bytes left in the frame")]
    PayloadOverrun { payload: usize, available: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum AdifError {
    #[error("Invalid adif_id, read {0:#010X}")]
    InvalidAdifId(u32),
}

#[derive(thiserror::Error, Debug)]
pub enum ElementError {
    #[error("Program config element declares {0} channels, only 64 are addressable")]
    TooManyChannels(usize),

    #[error("Fill element of {count} bytes exceeds the remaining {remaining} bits")]
    FillOverrun { count: usize, remaining: u64 },
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Insufficient buffered data, more input is required")]
    NeedMoreData,

    #[error("Malformed audio configuration: {0}")]
    MalformedConfig(ConfigError),

    #[error("Malformed frame at offset {offset}: {source}")]
    MalformedFrame {
        offset: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not identify stream after scanning {scanned} bytes")]
    UnsupportedMode { scanned: u64 },

    #[error("Session was aborted by an earlier error")]
    Aborted,
}

impl SessionError {
    /// Whether the caller may keep driving the session after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::NeedMoreData)
    }
}

/// A recovered condition and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub count: u64,
}

/// Recovered conditions, deduplicated by message.
///
/// At most [`Diagnostics::MAX_ENTRIES`] distinct messages are kept. Later
/// new messages are only counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    dropped: u64,
}

impl Diagnostics {
    pub const MAX_ENTRIES: usize = 64;

    pub fn record(&mut self, message: String) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.message == message) {
            entry.count += 1;
        } else if self.entries.len() < Self::MAX_ENTRIES {
            self.entries.push(Diagnostic { message, count: 1 });
        } else {
            self.dropped += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct messages kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Occurrences of messages past the distinct message limit.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Occurrences of all conditions, kept or not.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum::<u64>() + self.dropped
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
