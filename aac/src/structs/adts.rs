//! ADTS frame header (ISO/IEC 13818-7, 6.2.2 / ISO/IEC 14496-3, 1.A.2.2).
//!
//! ```text
//! adts_fixed_header:    syncword(12) id(1) layer(2) protection_absent(1)
//!                       profile(2) sampling_frequency_index(4) private_bit(1)
//!                       channel_configuration(3) original_copy(1) home(1)
//! adts_variable_header: copyright_identification_bit(1)
//!                       copyright_identification_start(1)
//!                       aac_frame_length(13) adts_buffer_fullness(11)
//!                       number_of_raw_data_blocks_in_frame(2)
//! ```

use anyhow::{Result, anyhow, bail};
use log::Level::Warn;

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::structs::audio_config::AudioConfig;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{AdtsError, ConfigError};
use crate::utils::tables;

pub const ADTS_SYNCWORD: u16 = 0xFFF;
pub const ADTS_SYNC_MASK: u16 = 0xFFF6;
pub const ADTS_SYNC_PATTERN: u16 = 0xFFF0;

/// Length of the fixed and variable header without CRC.
pub const ADTS_HEADER_LEN: usize = 7;

/// Bytes needed to read `aac_frame_length`.
pub const ADTS_LENGTH_FIELD_END: usize = 6;

/// `adts_buffer_fullness` value signalling a variable rate stream.
pub const ADTS_VBR_FULLNESS: u16 = 0x7FF;

/// Whether the first two bytes carry the ADTS sync word with layer 0.
pub fn is_sync(bytes: &[u8]) -> bool {
    match bytes {
        [b0, b1, ..] => u16::from_be_bytes([*b0, *b1]) & ADTS_SYNC_MASK == ADTS_SYNC_PATTERN,
        _ => false,
    }
}

/// `aac_frame_length` of the header starting at `bytes`, when enough bytes
/// are present to read it.
pub fn frame_length(bytes: &[u8]) -> Option<usize> {
    let field = bytes.get(3..ADTS_LENGTH_FIELD_END)?;
    let value = u32::from_be_bytes([0, field[0], field[1], field[2]]);
    Some(((value >> 5) & 0x1FFF) as usize)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdtsHeader {
    /// 0 for MPEG-4, 1 for MPEG-2.
    pub id: u8,
    pub layer: u8,
    pub protection_absent: bool,
    pub profile: u8,
    pub sampling_frequency_index: u8,
    pub private_bit: bool,
    pub channel_configuration: u8,
    pub original_copy: bool,
    pub home: bool,

    pub copyright_identification_bit: bool,
    pub copyright_identification_start: bool,
    pub frame_length: usize,
    pub buffer_fullness: u16,
    pub number_of_raw_data_blocks: u8,

    pub raw_data_block_positions: Vec<u16>,
    pub crc_check: Option<u16>,
}

impl AdtsHeader {
    /// Reads the fixed and variable header plus the header error check.
    pub fn read(state: &mut ParserState, reader: &mut BsIoSliceReader) -> Result<Self> {
        let syncword: u16 = reader.get_n(12)?;
        if syncword != ADTS_SYNCWORD {
            bail!(AdtsError::InvalidSyncword(syncword));
        }

        let mut header = Self {
            id: reader.get_n(1)?,
            layer: reader.get_n(2)?,
            protection_absent: reader.get()?,
            profile: reader.get_n(2)?,
            sampling_frequency_index: reader.get_n(4)?,
            private_bit: reader.get()?,
            channel_configuration: reader.get_n(3)?,
            original_copy: reader.get()?,
            home: reader.get()?,
            copyright_identification_bit: reader.get()?,
            copyright_identification_start: reader.get()?,
            frame_length: reader.get_n::<u16>(13)? as usize,
            buffer_fullness: reader.get_n(11)?,
            number_of_raw_data_blocks: reader.get_n(2)?,
            ..Default::default()
        };

        if header.layer != 0 {
            log_or_err!(state, Warn, anyhow!(AdtsError::InvalidLayer(header.layer)));
        }

        if tables::sampling_frequency(header.sampling_frequency_index).is_none() {
            log_or_err!(
                state,
                Warn,
                anyhow!(ConfigError::ReservedSamplingFrequencyIndex(
                    header.sampling_frequency_index
                ))
            );
        }

        if header.frame_length <= header.header_len() {
            bail!(AdtsError::FrameTooShort {
                length: header.frame_length,
                header: header.header_len(),
            });
        }

        if !header.protection_absent {
            for _ in 0..header.number_of_raw_data_blocks {
                header.raw_data_block_positions.push(reader.get_n(16)?);
            }
            header.crc_check = Some(reader.get_n(16)?);
        }

        Ok(header)
    }

    /// Header length in bytes, including the header error check.
    pub fn header_len(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_LEN
        } else {
            ADTS_HEADER_LEN + 2 * self.number_of_raw_data_blocks as usize + 2
        }
    }

    pub fn payload_len(&self) -> usize {
        self.frame_length.saturating_sub(self.header_len())
    }

    pub fn raw_data_blocks(&self) -> u32 {
        self.number_of_raw_data_blocks as u32 + 1
    }

    pub fn is_vbr(&self) -> bool {
        self.buffer_fullness == ADTS_VBR_FULLNESS
    }

    /// The configuration implied by the fixed header.
    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig::from_profile(
            self.profile,
            self.sampling_frequency_index,
            self.channel_configuration,
        )
    }

    /// Whether two headers describe the same stream configuration.
    pub fn same_config(&self, other: &Self) -> bool {
        self.id == other.id
            && self.profile == other.profile
            && self.sampling_frequency_index == other.sampling_frequency_index
            && self.channel_configuration == other.channel_configuration
    }

    pub fn mpeg_version(&self) -> u8 {
        if self.id == 1 { 2 } else { 4 }
    }

    pub fn profile_name(&self) -> &'static str {
        if self.id == 1 {
            tables::MPEG2_PROFILE_NAMES[self.profile as usize & 3]
        } else {
            tables::object_type_name(self.profile + 1)
        }
    }
}
