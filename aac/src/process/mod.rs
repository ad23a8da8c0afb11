use std::fmt::Display;

/// Frame boundary detection in raw byte streams.
///
/// Provides [`synchronize`](sync::synchronize) and the forward-consistency
/// check used to accept ADTS and LATM frame candidates.
pub mod sync;

/// Frame parsing into structured headers and configurations.
///
/// Provides the [`Parser`](parse::Parser) and the [`ParserState`](parse::ParserState)
/// shared by the structure readers.
pub mod parse;

/// The container mode state machine.
///
/// Provides the [`ParserSession`](session::ParserSession), which drives
/// synchronization and parsing over a [`ByteSource`](source::ByteSource) and
/// emits [`Event`](session::Event)s.
pub mod session;

/// Byte sources feeding a session.
pub mod source;

/// Frame size statistics and the stream summary.
pub mod summary;

/// Three ADTS frames (AAC LC, 44.1 kHz, stereo) of 16, 18 and 16 bytes.
pub const EXAMPLE_DATA: &[u8] = &[
    0xFF, 0xF1, 0x50, 0x80, 0x02, 0x1F, 0xFC, 0x21, 0x10, 0x04, 0x60, 0x8C, 0x1C, 0x00, 0x00,
    0x00, 0xFF, 0xF1, 0x50, 0x80, 0x02, 0x5F, 0xFC, 0x21, 0x10, 0x05, 0x00, 0xA0, 0x19, 0x33,
    0x87, 0xC0, 0x00, 0x70, 0xFF, 0xF1, 0x50, 0x80, 0x02, 0x1F, 0xFC, 0x21, 0x10, 0x04, 0x60,
    0x8C, 0x1C, 0x00, 0x00, 0x00,
];

/// The framing a session is reading.
///
/// `Unknown` resolves once, to ADIF, ADTS or LATM. `RawAudioSpecificConfig`
/// is selected by the caller and turns into `RawDataBlock` after the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ContainerMode {
    #[default]
    Unknown,
    RawAudioSpecificConfig,
    RawDataBlock,
    Adif,
    Adts,
    Latm,
}

impl ContainerMode {
    /// Whether frames are delimited by a sync word the session must find.
    pub fn is_self_synchronizing(&self) -> bool {
        matches!(self, Self::Unknown | Self::Adts | Self::Latm)
    }
}

impl Display for ContainerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::RawAudioSpecificConfig => "AudioSpecificConfig",
            Self::RawDataBlock => "raw_data_block",
            Self::Adif => "ADIF",
            Self::Adts => "ADTS",
            Self::Latm => "LATM",
        };
        write!(f, "{name}")
    }
}
