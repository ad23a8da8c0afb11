use anyhow::{Result, bail};
use log::Level::Warn;
use log::{debug, warn};

use crate::structs::adif::AdifHeader;
use crate::structs::adts::AdtsHeader;
use crate::structs::audio_config::{AOT_AAC_LC, AOT_SBR, AudioConfig};
use crate::structs::latm::{AudioMuxElement, LATM_SYNCWORD, StreamMuxConfig};
use crate::structs::raw_data_block::RawDataBlockInfo;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{Diagnostics, LatmError};

/// Parses transport frames and configurations into structured data.
///
/// Keeps the active [`AudioConfig`] and reports it again only when a frame
/// changes it.
#[derive(Debug, Default)]
pub struct Parser {
    state: ParserState,
}

/// State shared with the structure readers.
#[derive(Debug, Clone)]
pub struct ParserState {
    /// Conditions at or above this level are returned as errors.
    pub fail_level: log::Level,

    /// Conditions logged instead of returned.
    pub diagnostics: Diagnostics,

    /// The active configuration, replaced wholesale on change.
    pub config: Option<AudioConfig>,

    pub adts_header: Option<AdtsHeader>,
    pub stream_mux_config: Option<StreamMuxConfig>,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
            diagnostics: Diagnostics::default(),
            config: None,
            adts_header: None,
            stream_mux_config: None,
        }
    }
}

/// One parsed transport frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFrame {
    pub header_size: usize,
    pub payload_size: usize,

    /// Raw data blocks (ADTS) or sub frames (LATM) in the frame, each
    /// holding one frame length of samples.
    pub blocks: u32,

    /// The configuration, present only when this frame changed it.
    pub config: Option<AudioConfig>,

    pub adts_header: Option<AdtsHeader>,
    pub raw_data_block: Option<RawDataBlockInfo>,
}

impl Parser {
    /// Parses one complete ADTS frame.
    ///
    /// The first raw data block is scanned when `scan_payload` is set and the
    /// frame carries a single block.
    pub fn parse_adts(&mut self, frame: &[u8], scan_payload: bool) -> Result<ParsedFrame> {
        let reader = &mut BsIoSliceReader::from_slice(frame);
        let header = AdtsHeader::read(&mut self.state, reader)?;

        let mut parsed = ParsedFrame {
            header_size: header.header_len(),
            payload_size: frame.len().saturating_sub(header.header_len()),
            blocks: header.raw_data_blocks(),
            ..Default::default()
        };

        let changed = self
            .state
            .adts_header
            .as_ref()
            .is_none_or(|previous| !previous.same_config(&header));
        if changed {
            parsed.config = self.replace_config(header.audio_config());
        }

        if scan_payload && header.number_of_raw_data_blocks == 0 {
            parsed.raw_data_block = self.scan_raw_data_block(reader, &mut parsed.config)?;
        }

        self.state.adts_header = Some(header.clone());
        parsed.adts_header = Some(header);

        Ok(parsed)
    }

    /// Parses one complete LATM/LOAS frame.
    pub fn parse_latm(&mut self, frame: &[u8], scan_payload: bool) -> Result<ParsedFrame> {
        let reader = &mut BsIoSliceReader::from_slice(frame);

        let syncword: u16 = reader.get_n(11)?;
        if syncword != LATM_SYNCWORD {
            bail!(LatmError::InvalidSyncword(syncword));
        }
        let _audio_mux_length_bytes: u16 = reader.get_n(13)?;

        let element = AudioMuxElement::read(&mut self.state, reader, scan_payload)?;

        let mut parsed = ParsedFrame {
            header_size: 3,
            payload_size: frame.len().saturating_sub(3),
            blocks: element.sub_frames,
            ..Default::default()
        };

        if element.stream_mux_config_present {
            let primary = self
                .state
                .stream_mux_config
                .as_ref()
                .and_then(StreamMuxConfig::primary_config)
                .cloned();
            if let Some(config) = primary {
                parsed.config = self.replace_config(config);
            }
        }

        if let Some(info) = element.raw_data_block {
            self.apply_raw_data_block(&info, &mut parsed.config);
            parsed.raw_data_block = Some(info);
        }

        Ok(parsed)
    }

    /// Decodes an out-of-band AudioSpecificConfig spanning all of `data`.
    pub fn parse_audio_specific_config(&mut self, data: &[u8]) -> Result<AudioConfig> {
        let reader = &mut BsIoSliceReader::from_slice(data);
        let config = AudioConfig::read(&mut self.state, reader, Some(data.len() as u64 * 8))?;

        self.state.config = Some(config.clone());

        Ok(config)
    }

    /// Scans one access unit of raw data block framing.
    ///
    /// Returns the element scan and the configuration if the scan changed it.
    pub fn parse_raw_data_block(
        &mut self,
        data: &[u8],
    ) -> Result<(RawDataBlockInfo, Option<AudioConfig>)> {
        let reader = &mut BsIoSliceReader::from_slice(data);
        let mut changed = None;
        let info = self
            .scan_raw_data_block(reader, &mut changed)?
            .unwrap_or_default();

        Ok((info, changed))
    }

    /// Reads the ADIF header and scans the raw data block following it, if it
    /// is already buffered.
    pub fn parse_adif(&mut self, data: &[u8]) -> Result<AdifHeader> {
        let reader = &mut BsIoSliceReader::from_slice(data);
        let mut header = AdifHeader::read(reader)?;

        if let Some(config) = header.audio_config() {
            self.replace_config(config);
        }

        // The first block may only be partly buffered.
        if reader.available()? > 0 && self.is_general_audio() {
            match RawDataBlockInfo::scan(reader) {
                Ok(info) => {
                    self.apply_raw_data_block(&info, &mut None);
                    header.raw_data_block = Some(info);
                }
                Err(e) => debug!("First raw_data_block not scanned: {e}"),
            }
        }

        Ok(header)
    }

    fn scan_raw_data_block(
        &mut self,
        reader: &mut BsIoSliceReader,
        changed: &mut Option<AudioConfig>,
    ) -> Result<Option<RawDataBlockInfo>> {
        if !self.is_general_audio() {
            return Ok(None);
        }

        match RawDataBlockInfo::scan(reader) {
            Ok(info) => {
                self.apply_raw_data_block(&info, changed);
                Ok(Some(info))
            }
            Err(e) => {
                self.report(e.context("raw_data_block"))?;
                Ok(None)
            }
        }
    }

    /// Whether the active object type uses the general audio raw data block
    /// syntax.
    fn is_general_audio(&self) -> bool {
        self.state
            .config
            .as_ref()
            .is_some_and(|config| matches!(config.object_type, 1..=4 | 6 | 7))
    }

    /// Folds what a raw data block reveals into the active configuration: a
    /// program config element for layout 0, and implicit SBR signalling.
    fn apply_raw_data_block(&mut self, info: &RawDataBlockInfo, changed: &mut Option<AudioConfig>) {
        let Some(mut config) = self.state.config.clone() else {
            return;
        };

        if let Some(pce) = &info.program_config {
            if config.channel_configuration == 0 && config.program_config.as_ref() != Some(pce) {
                config.program_config = Some(pce.clone());
            }
        }

        if info.sbr_extension && config.sbr_present.is_none() && config.object_type == AOT_AAC_LC {
            debug!("Implicit SBR signalled by a fill element");
            config.sbr_present = Some(true);
            config.extension_object_type = Some(AOT_SBR);
            config.extension_sampling_frequency = Some(config.sampling_frequency * 2);
        }

        if let Some(config) = self.replace_config(config) {
            *changed = Some(config);
        }
    }

    /// Installs `config` and returns it if it differs from the active one.
    fn replace_config(&mut self, config: AudioConfig) -> Option<AudioConfig> {
        if self.state.config.as_ref() == Some(&config) {
            return None;
        }

        debug!("Audio configuration: {config}");
        self.state.config = Some(config.clone());

        Some(config)
    }

    pub fn config(&self) -> Option<&AudioConfig> {
        self.state.config.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.state.diagnostics
    }

    /// Sets the failure level for validation errors.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }

    pub fn fail_level(&self) -> log::Level {
        self.state.fail_level
    }

    /// Records a condition the session recovered from, or returns it
    /// unchanged in strict mode.
    pub fn report(&mut self, e: anyhow::Error) -> Result<()> {
        if Warn <= self.state.fail_level {
            return Err(e);
        }

        warn!("{e:#}");
        self.state.diagnostics.record(format!("{e:#}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EXAMPLE_DATA;
    use crate::structs::{adts, latm};

    #[test]
    fn adts_config_is_reported_once() -> Result<()> {
        let mut parser = Parser::default();

        let first = parser.parse_adts(&EXAMPLE_DATA[..16], true)?;
        assert_eq!(first.header_size, 7);
        assert_eq!(first.payload_size, 9);
        assert_eq!(first.blocks, 1);
        let config = first.config.expect("first frame carries the config");
        assert_eq!(config.sampling_frequency, 44_100);
        assert_eq!(config.channels(), Some(2));
        assert!(first.raw_data_block.is_some());

        let second = parser.parse_adts(&EXAMPLE_DATA[16..34], false)?;
        assert_eq!(second.config, None);
        assert_eq!(second.raw_data_block, None);

        let mono = adts::tests::build_frame(1, 4, 1, 10);
        let third = parser.parse_adts(&mono, false)?;
        assert_eq!(third.config.and_then(|c| c.channels()), Some(1));
        Ok(())
    }

    #[test]
    fn implicit_sbr_from_fill_element() -> Result<()> {
        // FIL, count 2, EXT_SBR_DATA, then END
        let mut frame = adts::tests::build_frame(1, 6, 2, 4);
        frame[7..].copy_from_slice(&[0xC5, 0xA0, 0x01, 0xE0]);

        let mut parser = Parser::default();
        let parsed = parser.parse_adts(&frame, true)?;
        let info = parsed.raw_data_block.expect("scanned");
        assert!(info.sbr_extension);

        let config = parsed.config.expect("config");
        assert_eq!(config.sbr_present, Some(true));
        assert_eq!(config.output_sampling_frequency(), 48_000);
        Ok(())
    }

    #[test]
    fn latm_config_follows_stream_mux_config() -> Result<()> {
        let mut parser = Parser::default();

        let first = latm::tests::build_frame(true, &[0; 20]);
        let parsed = parser.parse_latm(&first, true)?;
        assert_eq!(parsed.header_size, 3);
        assert_eq!(parsed.blocks, 1);
        assert_eq!(
            parsed.config.map(|c| c.sampling_frequency),
            Some(44_100)
        );

        let next = latm::tests::build_frame(false, &[0; 20]);
        let parsed = parser.parse_latm(&next, true)?;
        assert_eq!(parsed.config, None);
        assert_eq!(parsed.payload_size, next.len() - 3);

        // The same config again is not a change.
        let parsed = parser.parse_latm(&first, true)?;
        assert_eq!(parsed.config, None);
        Ok(())
    }

    #[test]
    fn audio_specific_config_and_raw_blocks() -> Result<()> {
        let mut parser = Parser::default();
        let config = parser.parse_audio_specific_config(&[0x12, 0x10])?;
        assert_eq!(config.object_type, 2);

        // END element only
        let (info, changed) = parser.parse_raw_data_block(&[0xE0])?;
        assert!(info.complete);
        assert_eq!(changed, None);
        Ok(())
    }
}
