//! AudioSpecificConfig decoding (ISO/IEC 14496-3, 1.6.2.1).
//!
//! ## Layout
//!
//! - **Base**: `audioObjectType` (5 bits, escape 31 adds a 6-bit value + 32),
//!   `samplingFrequencyIndex` (4 bits, escape 0xF adds an explicit 24-bit
//!   rate) and `channelConfiguration` (4 bits).
//! - **Explicit extension**: object types 5 (SBR) and 29 (PS) carry an
//!   extension sampling rate and the underlying object type.
//! - **Specific config**: GASpecificConfig for the AAC family, or
//!   ELDSpecificConfig for ER AAC ELD. Other families are not parsed.
//! - **Error protection**: `epConfig` for error resilient object types.
//! - **Sync extension**: backward compatible SBR/PS signalling behind the
//!   0x2B7 and 0x548 sync words, only when the config length is known.
//!
//! The decoded [`AudioConfig`] always replaces the previous one wholesale.

use std::fmt::{Display, Formatter};

use anyhow::{Result, anyhow};
use log::Level::Warn;
use log::{debug, trace};

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::structs::program_config::ProgramConfigElement;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{BitReaderError, ConfigError};
use crate::utils::tables;

pub const AOT_NULL: u8 = 0;
pub const AOT_AAC_MAIN: u8 = 1;
pub const AOT_AAC_LC: u8 = 2;
pub const AOT_AAC_SSR: u8 = 3;
pub const AOT_AAC_LTP: u8 = 4;
pub const AOT_SBR: u8 = 5;
pub const AOT_AAC_SCALABLE: u8 = 6;
pub const AOT_ER_AAC_LC: u8 = 17;
pub const AOT_ER_AAC_SCALABLE: u8 = 20;
pub const AOT_ER_BSAC: u8 = 22;
pub const AOT_ER_AAC_LD: u8 = 23;
pub const AOT_PS: u8 = 29;
pub const AOT_ER_AAC_ELD: u8 = 39;

/// Sync word announcing a backward compatible SBR extension.
pub const SYNC_EXTENSION_SBR: u16 = 0x2B7;

/// Sync word announcing a backward compatible PS extension.
pub const SYNC_EXTENSION_PS: u16 = 0x548;

const ELDEXT_TERM: u8 = 0;

/// Error resilience tools signalled by GASpecificConfig or ELDSpecificConfig.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResilienceFlags {
    pub section_data: bool,
    pub scalefactor_data: bool,
    pub spectral_data: bool,
}

/// A decoded AudioSpecificConfig.
///
/// Optional fields are `None` when the corresponding syntax element was not
/// present in the bitstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioConfig {
    /// Core object type after resolving explicit SBR/PS signalling.
    pub object_type: u8,

    /// `samplingFrequencyIndex`, 0xF when the rate was coded explicitly.
    pub sampling_frequency_index: u8,

    /// Core sampling frequency in Hz, 0 when reserved.
    pub sampling_frequency: u32,

    pub channel_configuration: u8,

    /// Layout for `channelConfiguration` 0.
    pub program_config: Option<ProgramConfigElement>,

    /// Samples per frame of the core coder.
    pub frame_length: u32,

    pub depends_on_core_coder: bool,

    /// `coreCoderDelay`, only present when `dependsOnCoreCoder` is set.
    pub core_coder_delay: Option<u16>,

    pub extension_flag: bool,
    pub layer_nr: Option<u8>,

    /// `extensionAudioObjectType` (5 for SBR).
    pub extension_object_type: Option<u8>,
    pub extension_sampling_frequency_index: Option<u8>,
    pub extension_sampling_frequency: Option<u32>,
    pub extension_channel_configuration: Option<u8>,

    /// `Some(true)` when SBR is explicitly signalled, `Some(false)` when
    /// explicitly absent, `None` when the stream is silent about it.
    pub sbr_present: Option<bool>,
    pub ps_present: Option<bool>,

    pub resilience: Option<ResilienceFlags>,
    pub ep_config: Option<u8>,
    pub direct_mapping: Option<bool>,

    /// Number of bits the config occupied in the bitstream.
    pub bits_read: u64,
}

impl AudioConfig {
    /// Decodes an AudioSpecificConfig from the reader's current position.
    ///
    /// `length_bits` is the known length of the config, if any. The backward
    /// compatible sync extension is only looked for when it is known, because
    /// otherwise the bits following the config belong to other structures.
    ///
    /// Conditions at [`log::Level::Warn`] abort in strict mode. In lenient
    /// mode decoding stops at the first unsupported construct and the fields
    /// parsed so far are returned.
    pub fn read(
        state: &mut ParserState,
        reader: &mut BsIoSliceReader,
        length_bits: Option<u64>,
    ) -> Result<Self> {
        let start_pos = reader.position()?;

        let mut cfg = Self {
            frame_length: 1024,
            ..Default::default()
        };

        let mut object_type = read_object_type(reader)?;
        (cfg.sampling_frequency_index, cfg.sampling_frequency) =
            read_sampling_frequency(state, reader)?;
        cfg.channel_configuration = reader.get_n(4)?;

        if tables::channel_count(cfg.channel_configuration).is_none()
            && cfg.channel_configuration != 0
        {
            log_or_err!(
                state,
                Warn,
                anyhow!(ConfigError::ReservedChannelConfiguration(
                    cfg.channel_configuration
                ))
            );
        }

        if object_type == AOT_SBR || object_type == AOT_PS {
            cfg.extension_object_type = Some(AOT_SBR);
            cfg.sbr_present = Some(true);
            if object_type == AOT_PS {
                cfg.ps_present = Some(true);
            }

            let (index, frequency) = read_sampling_frequency(state, reader)?;
            cfg.extension_sampling_frequency_index = Some(index);
            cfg.extension_sampling_frequency = Some(frequency);

            object_type = read_object_type(reader)?;
            if object_type == AOT_ER_BSAC {
                cfg.extension_channel_configuration = Some(reader.get_n(4)?);
            }
        }

        cfg.object_type = object_type;

        'config: {
            match object_type {
                1..=4 | 6 | 7 | 17 | 19..=23 => {
                    if let Err(e) = cfg.read_ga_specific_config(state, reader, start_pos) {
                        if is_truncation(&e) {
                            return Err(e);
                        }
                        log_or_err!(state, Warn, e);
                        break 'config;
                    }
                }
                AOT_ER_AAC_ELD => {
                    cfg.read_eld_specific_config(reader)?;
                }
                AOT_NULL | 10 | 11 | 18 | 31 | 46.. => {
                    log_or_err!(
                        state,
                        Warn,
                        anyhow!(ConfigError::ReservedObjectType(object_type))
                    );
                    break 'config;
                }
                _ => {
                    log_or_err!(
                        state,
                        Warn,
                        anyhow!(ConfigError::UnsupportedObjectType(object_type))
                    );
                    break 'config;
                }
            }

            if matches!(object_type, 17 | 19..=27 | AOT_ER_AAC_ELD) {
                let ep_config: u8 = reader.get_n(2)?;
                cfg.ep_config = Some(ep_config);

                if ep_config == 2 || ep_config == 3 {
                    log_or_err!(
                        state,
                        Warn,
                        anyhow!(ConfigError::UnsupportedEpConfig(ep_config))
                    );
                    break 'config;
                }
            }

            if cfg.extension_object_type != Some(AOT_SBR) {
                if let Some(length_bits) = length_bits {
                    cfg.read_sync_extension(state, reader, start_pos + length_bits)?;
                }
            }
        }

        cfg.bits_read = reader.position()? - start_pos;

        debug!("AudioSpecificConfig: {cfg}");

        Ok(cfg)
    }

    /// Builds the config implied by an ADTS or ADIF header, which carry a
    /// 2-bit profile instead of a full AudioSpecificConfig.
    pub fn from_profile(profile: u8, sampling_frequency_index: u8, channel_configuration: u8) -> Self {
        Self {
            object_type: profile + 1,
            sampling_frequency_index,
            sampling_frequency: tables::sampling_frequency(sampling_frequency_index).unwrap_or(0),
            channel_configuration,
            frame_length: if profile + 1 == AOT_AAC_SSR { 256 } else { 1024 },
            ..Default::default()
        }
    }

    fn read_ga_specific_config(
        &mut self,
        state: &mut ParserState,
        reader: &mut BsIoSliceReader,
        start_pos: u64,
    ) -> Result<()> {
        let frame_length_flag = reader.get()?;
        self.frame_length = match (self.object_type, frame_length_flag) {
            (AOT_AAC_SSR, false) => 256,
            (AOT_AAC_SSR, true) => {
                log_or_err!(state, Warn, anyhow!(ConfigError::InvalidSsrFrameLength));
                256
            }
            (AOT_ER_AAC_LD, false) => 512,
            (AOT_ER_AAC_LD, true) => 480,
            (_, false) => 1024,
            (_, true) => 960,
        };

        self.depends_on_core_coder = reader.get()?;
        if self.depends_on_core_coder {
            self.core_coder_delay = Some(reader.get_n(14)?);
        }

        self.extension_flag = reader.get()?;

        if self.channel_configuration == 0 {
            self.program_config = Some(ProgramConfigElement::read(reader, start_pos)?);
        }

        if self.object_type == AOT_AAC_SCALABLE || self.object_type == AOT_ER_AAC_SCALABLE {
            self.layer_nr = Some(reader.get_n(3)?);
        }

        if self.extension_flag {
            if self.object_type == AOT_ER_BSAC {
                let _num_of_sub_frame: u8 = reader.get_n(5)?;
                let _layer_length: u16 = reader.get_n(11)?;
            }

            if matches!(self.object_type, 17 | 19 | 20 | 23) {
                self.resilience = Some(ResilienceFlags {
                    section_data: reader.get()?,
                    scalefactor_data: reader.get()?,
                    spectral_data: reader.get()?,
                });
            }

            let _extension_flag3 = reader.get()?;
        }

        Ok(())
    }

    fn read_eld_specific_config(&mut self, reader: &mut BsIoSliceReader) -> Result<()> {
        self.frame_length = if reader.get()? { 480 } else { 512 };

        self.resilience = Some(ResilienceFlags {
            section_data: reader.get()?,
            scalefactor_data: reader.get()?,
            spectral_data: reader.get()?,
        });

        let ld_sbr_present = reader.get()?;
        self.sbr_present = Some(ld_sbr_present);

        if ld_sbr_present {
            let _ld_sbr_sampling_rate = reader.get()?;
            let _ld_sbr_crc_flag = reader.get()?;

            let num_sbr_header = match self.channel_configuration {
                1 | 2 => 1,
                3 => 2,
                4..=6 => 3,
                7 => 4,
                _ => 0,
            };

            for _ in 0..num_sbr_header {
                skip_sbr_header(reader)?;
            }
        }

        loop {
            let eld_ext_type: u8 = reader.get_n(4)?;
            if eld_ext_type == ELDEXT_TERM {
                break;
            }

            let mut eld_ext_len: usize = reader.get_n::<u8>(4)? as usize;
            if eld_ext_len == 15 {
                let add: usize = reader.get_n::<u8>(8)? as usize;
                eld_ext_len += add;
                if add == 255 {
                    eld_ext_len += reader.get_n::<u16>(16)? as usize;
                }
            }

            trace!("ELD extension type {eld_ext_type}, {eld_ext_len} bytes");

            for _ in 0..eld_ext_len {
                reader.skip_n(8)?;
            }
        }

        Ok(())
    }

    fn read_sync_extension(
        &mut self,
        state: &mut ParserState,
        reader: &mut BsIoSliceReader,
        end_pos: u64,
    ) -> Result<()> {
        let remaining = |reader: &mut BsIoSliceReader| -> Result<u64> {
            Ok(end_pos.saturating_sub(reader.position()?))
        };

        if remaining(reader)? < 16 || reader.peek_n(11)? as u16 != SYNC_EXTENSION_SBR {
            return Ok(());
        }
        reader.skip_n(11)?;

        let extension_object_type = read_object_type(reader)?;
        self.extension_object_type = Some(extension_object_type);

        match extension_object_type {
            AOT_SBR => {
                let sbr_present = reader.get()?;
                self.sbr_present = Some(sbr_present);

                if sbr_present {
                    let (index, frequency) = read_sampling_frequency(state, reader)?;
                    self.extension_sampling_frequency_index = Some(index);
                    self.extension_sampling_frequency = Some(frequency);

                    if remaining(reader)? >= 12 && reader.peek_n(11)? as u16 == SYNC_EXTENSION_PS
                    {
                        reader.skip_n(11)?;
                        self.ps_present = Some(reader.get()?);
                    }
                }
            }
            AOT_ER_BSAC => {
                let sbr_present = reader.get()?;
                self.sbr_present = Some(sbr_present);

                if sbr_present {
                    let (index, frequency) = read_sampling_frequency(state, reader)?;
                    self.extension_sampling_frequency_index = Some(index);
                    self.extension_sampling_frequency = Some(frequency);
                }
                self.extension_channel_configuration = Some(reader.get_n(4)?);
            }
            _ => {}
        }

        Ok(())
    }

    /// Number of channels, from the channel configuration or the PCE.
    pub fn channels(&self) -> Option<usize> {
        if let Some(count) = tables::channel_count(self.channel_configuration) {
            return Some(count as usize);
        }

        self.program_config.as_ref().map(ProgramConfigElement::channels)
    }

    /// Output sampling frequency, doubled by SBR when signalled.
    pub fn output_sampling_frequency(&self) -> u32 {
        match (self.sbr_present, self.extension_sampling_frequency) {
            (Some(true), Some(frequency)) if frequency != 0 => frequency,
            _ => self.sampling_frequency,
        }
    }

    /// Commercial profile name: HE-AACv2 with PS, HE-AAC with SBR, otherwise
    /// the object type name.
    pub fn profile_name(&self) -> &'static str {
        if self.ps_present == Some(true) {
            "HE-AACv2"
        } else if self.sbr_present == Some(true) {
            "HE-AAC"
        } else {
            tables::object_type_name(self.object_type)
        }
    }

    pub fn is_error_resilient(&self) -> bool {
        matches!(self.object_type, 17 | 19..=27 | AOT_ER_AAC_ELD)
    }
}

impl Display for AudioConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (object type {}), {} Hz, ",
            self.profile_name(),
            self.object_type,
            self.sampling_frequency
        )?;

        match self.channels() {
            Some(channels) => write!(f, "{channels} channels")?,
            None => write!(f, "unknown channels")?,
        }

        write!(f, ", {} samples/frame", self.frame_length)
    }
}

/// Reads `audioObjectType`, resolving the escape value to `32 + 6 bits`.
pub fn read_object_type(reader: &mut BsIoSliceReader) -> Result<u8> {
    let object_type: u8 = reader.get_n(5)?;
    if object_type == tables::OBJECT_TYPE_ESCAPE {
        let extended: u8 = reader.get_n(6)?;
        return Ok(32 + extended);
    }

    Ok(object_type)
}

/// Reads `samplingFrequencyIndex` and, for the escape value, the explicit
/// 24-bit rate. Reserved indices yield a rate of 0.
pub fn read_sampling_frequency(
    state: &mut ParserState,
    reader: &mut BsIoSliceReader,
) -> Result<(u8, u32)> {
    let index: u8 = reader.get_n(4)?;

    if index == tables::SAMPLING_FREQUENCY_ESCAPE {
        let frequency: u32 = reader.get_n(24)?;
        if frequency == 0 {
            log_or_err!(state, Warn, anyhow!(ConfigError::ZeroSamplingFrequency));
        }
        return Ok((index, frequency));
    }

    match tables::sampling_frequency(index) {
        Some(frequency) => Ok((index, frequency)),
        None => {
            log_or_err!(
                state,
                Warn,
                anyhow!(ConfigError::ReservedSamplingFrequencyIndex(index))
            );
            Ok((index, 0))
        }
    }
}

fn skip_sbr_header(reader: &mut BsIoSliceReader) -> Result<()> {
    // bs_amp_res, bs_start_freq, bs_stop_freq, bs_xover_band, bs_reserved
    reader.skip_n(1 + 4 + 4 + 3 + 2)?;
    let header_extra_1 = reader.get()?;
    let header_extra_2 = reader.get()?;

    if header_extra_1 {
        // bs_freq_scale, bs_alter_scale, bs_noise_bands
        reader.skip_n(2 + 1 + 2)?;
    }
    if header_extra_2 {
        // bs_limiter_bands, bs_limiter_gains, bs_interpol_freq, bs_smoothing_mode
        reader.skip_n(2 + 2 + 1 + 1)?;
    }

    Ok(())
}

/// Whether an error means the config ran past the end of the window.
pub fn is_truncation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<BitReaderError>(),
        Some(BitReaderError::InsufficientBits { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream_io::{BigEndian, BitWrite, BitWriter};

    fn decode(data: &[u8]) -> Result<AudioConfig> {
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(data);
        AudioConfig::read(&mut state, &mut reader, Some(data.len() as u64 * 8))
    }

    #[test]
    fn aac_lc_44100_stereo() -> Result<()> {
        let cfg = decode(&[0x12, 0x10])?;
        assert_eq!(cfg.object_type, AOT_AAC_LC);
        assert_eq!(cfg.sampling_frequency, 44_100);
        assert_eq!(cfg.channel_configuration, 2);
        assert_eq!(cfg.channels(), Some(2));
        assert_eq!(cfg.frame_length, 1024);
        assert_eq!(cfg.sbr_present, None);
        assert_eq!(cfg.bits_read, 16);
        assert_eq!(cfg.profile_name(), "AAC LC");
        Ok(())
    }

    #[test]
    fn frame_length_flag_selects_960() -> Result<()> {
        // 00010 0011 0001 1 0 0 -> LC, 48 kHz, mono, 960 samples
        let cfg = decode(&[0x11, 0x8C])?;
        assert_eq!(cfg.sampling_frequency, 48_000);
        assert_eq!(cfg.channels(), Some(1));
        assert_eq!(cfg.frame_length, 960);
        Ok(())
    }

    #[test]
    fn escaped_object_type_adds_32() -> Result<()> {
        for (extension, expected) in [(4u8, 36u8), (5, 37)] {
            let mut data = Vec::new();
            {
                let mut w = BitWriter::endian(&mut data, BigEndian);
                w.write_var::<u8>(5, 31)?;
                w.write_var::<u8>(6, extension)?;
                w.byte_align()?;
            }
            let mut reader = BsIoSliceReader::from_slice(&data);
            assert_eq!(read_object_type(&mut reader)?, expected);
            assert_eq!(reader.position()?, 11);
        }
        Ok(())
    }

    #[test]
    fn explicit_sampling_frequency() -> Result<()> {
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            w.write_var::<u8>(5, AOT_AAC_LC)?;
            w.write_var::<u8>(4, 0xF)?;
            w.write_var::<u32>(24, 44_056)?;
            w.write_var::<u8>(4, 1)?;
            w.write_var::<u8>(3, 0)?;
            w.byte_align()?;
        }
        let cfg = decode(&data)?;
        assert_eq!(cfg.sampling_frequency_index, 0xF);
        assert_eq!(cfg.sampling_frequency, 44_056);
        Ok(())
    }

    #[test]
    fn explicit_he_aac_v2() -> Result<()> {
        // PS, 24 kHz core, stereo, extension 48 kHz, core LC
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            w.write_var::<u8>(5, AOT_PS)?;
            w.write_var::<u8>(4, 6)?;
            w.write_var::<u8>(4, 1)?;
            w.write_var::<u8>(4, 3)?;
            w.write_var::<u8>(5, AOT_AAC_LC)?;
            w.write_var::<u8>(3, 0)?;
            w.byte_align()?;
        }
        let cfg = decode(&data)?;
        assert_eq!(cfg.object_type, AOT_AAC_LC);
        assert_eq!(cfg.extension_object_type, Some(AOT_SBR));
        assert_eq!(cfg.sbr_present, Some(true));
        assert_eq!(cfg.ps_present, Some(true));
        assert_eq!(cfg.sampling_frequency, 24_000);
        assert_eq!(cfg.output_sampling_frequency(), 48_000);
        assert_eq!(cfg.profile_name(), "HE-AACv2");
        Ok(())
    }

    #[test]
    fn backward_compatible_sync_extension() -> Result<()> {
        // LC 22050 stereo + 0x2B7, SBR at 44100, 0x548 PS
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            w.write_var::<u8>(5, AOT_AAC_LC)?;
            w.write_var::<u8>(4, 7)?;
            w.write_var::<u8>(4, 2)?;
            w.write_var::<u8>(3, 0)?;
            w.write_var::<u16>(11, SYNC_EXTENSION_SBR)?;
            w.write_var::<u8>(5, AOT_SBR)?;
            w.write_bit(true)?;
            w.write_var::<u8>(4, 4)?;
            w.write_var::<u16>(11, SYNC_EXTENSION_PS)?;
            w.write_bit(true)?;
            w.byte_align()?;
        }
        let cfg = decode(&data)?;
        assert_eq!(cfg.sampling_frequency, 22_050);
        assert_eq!(cfg.sbr_present, Some(true));
        assert_eq!(cfg.ps_present, Some(true));
        assert_eq!(cfg.extension_sampling_frequency, Some(44_100));

        // Without a known length the extension is left unread.
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let cfg = AudioConfig::read(&mut state, &mut reader, None)?;
        assert_eq!(cfg.sbr_present, None);
        assert_eq!(cfg.bits_read, 16);
        Ok(())
    }

    #[test]
    fn error_resilient_flags_and_core_coder_delay() -> Result<()> {
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            w.write_var::<u8>(5, AOT_ER_AAC_LC)?;
            w.write_var::<u8>(4, 3)?;
            w.write_var::<u8>(4, 2)?;
            w.write_bit(false)?; // frameLengthFlag
            w.write_bit(true)?; // dependsOnCoreCoder
            w.write_var::<u16>(14, 1234)?;
            w.write_bit(true)?; // extensionFlag
            w.write_bit(true)?; // section
            w.write_bit(false)?; // scalefactor
            w.write_bit(true)?; // spectral
            w.write_bit(false)?; // extensionFlag3
            w.write_var::<u8>(2, 1)?; // epConfig
            w.byte_align()?;
        }
        let cfg = decode(&data)?;
        assert_eq!(cfg.core_coder_delay, Some(1234));
        assert_eq!(
            cfg.resilience,
            Some(ResilienceFlags {
                section_data: true,
                scalefactor_data: false,
                spectral_data: true,
            })
        );
        assert_eq!(cfg.ep_config, Some(1));
        assert_eq!(cfg.bits_read, 5 + 4 + 4 + 3 + 14 + 4 + 2);
        Ok(())
    }

    #[test]
    fn eld_with_ld_sbr() -> Result<()> {
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            w.write_var::<u8>(5, 31)?;
            w.write_var::<u8>(6, AOT_ER_AAC_ELD - 32)?;
            w.write_var::<u8>(4, 3)?;
            w.write_var::<u8>(4, 1)?;
            w.write_bit(true)?; // 480
            w.write_var::<u8>(3, 0)?;
            w.write_bit(true)?; // ldSbrPresentFlag
            w.write_bit(false)?;
            w.write_bit(false)?;
            w.write_var::<u16>(14, 0)?; // sbr_header base fields
            w.write_bit(false)?;
            w.write_bit(false)?;
            w.write_var::<u8>(4, 2)?; // eldExtType
            w.write_var::<u8>(4, 1)?;
            w.write_var::<u8>(8, 0xAA)?;
            w.write_var::<u8>(4, 0)?; // ELDEXT_TERM
            w.write_var::<u8>(2, 0)?; // epConfig
            w.byte_align()?;
        }
        let cfg = decode(&data)?;
        assert_eq!(cfg.object_type, AOT_ER_AAC_ELD);
        assert_eq!(cfg.frame_length, 480);
        assert_eq!(cfg.sbr_present, Some(true));
        assert_eq!(cfg.ep_config, Some(0));
        Ok(())
    }

    #[test]
    fn channel_configuration_zero_reads_pce() -> Result<()> {
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            w.write_var::<u8>(5, AOT_AAC_LC)?;
            w.write_var::<u8>(4, 3)?;
            w.write_var::<u8>(4, 0)?;
            w.write_var::<u8>(3, 0)?;
            crate::structs::program_config::tests::write_pce_5_1(&mut w)?;
            w.byte_align()?;
        }
        let cfg = decode(&data)?;
        assert_eq!(cfg.channels(), Some(6));
        assert!(cfg.program_config.is_some());
        Ok(())
    }

    #[test]
    fn reserved_values_are_lenient_by_default_and_fatal_when_strict() -> Result<()> {
        // LC, samplingFrequencyIndex 0xD (reserved), stereo
        let data = [0x16, 0x90];

        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let cfg = AudioConfig::read(&mut state, &mut reader, Some(16))?;
        assert_eq!(cfg.sampling_frequency, 0);
        assert_eq!(cfg.channel_configuration, 2);
        assert_eq!(state.diagnostics.len(), 1);

        let mut state = ParserState::default();
        state.fail_level = log::Level::Warn;
        let mut reader = BsIoSliceReader::from_slice(&data);
        let err = AudioConfig::read(&mut state, &mut reader, Some(16)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::ReservedSamplingFrequencyIndex(0xD))
        );
        Ok(())
    }

    #[test]
    fn unsupported_object_type_keeps_base_fields() -> Result<()> {
        // CELP (8), 16 kHz, mono
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            w.write_var::<u8>(5, 8)?;
            w.write_var::<u8>(4, 8)?;
            w.write_var::<u8>(4, 1)?;
            w.byte_align()?;
        }
        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&data);
        let cfg = AudioConfig::read(&mut state, &mut reader, Some(16))?;
        assert_eq!(cfg.object_type, 8);
        assert_eq!(cfg.sampling_frequency, 16_000);
        assert_eq!(cfg.channels(), Some(1));
        assert_eq!(cfg.bits_read, 13);
        assert_eq!(state.diagnostics.len(), 1);
        Ok(())
    }
}
