//! LATM/LOAS transport (ISO/IEC 14496-3, 1.7.3).
//!
//! An `AudioSyncStream` frame is an 11-bit sync word (0x2B7), a 13-bit
//! `audioMuxLengthBytes` and one `AudioMuxElement(muxConfigPresent = 1)`.
//! The element optionally carries a new `StreamMuxConfig`, which is the only
//! way a LATM stream announces or changes its audio configuration.

use anyhow::{Result, bail};
use log::{debug, trace};

use crate::process::parse::ParserState;
use crate::structs::audio_config::AudioConfig;
use crate::structs::raw_data_block::RawDataBlockInfo;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::LatmError;

pub const LATM_SYNCWORD: u16 = 0x2B7;
pub const LATM_SYNC_MASK: u16 = 0xFFE0;
pub const LATM_SYNC_PATTERN: u16 = 0x56E0;
pub const LATM_HEADER_LEN: usize = 3;

pub fn is_sync(bytes: &[u8]) -> bool {
    match bytes {
        [b0, b1, ..] => u16::from_be_bytes([*b0, *b1]) & LATM_SYNC_MASK == LATM_SYNC_PATTERN,
        _ => false,
    }
}

/// Total frame size, `3 + audioMuxLengthBytes`, when enough bytes are present
/// to read it.
pub fn frame_length(bytes: &[u8]) -> Option<usize> {
    let field = bytes.get(1..LATM_HEADER_LEN)?;
    let value = u16::from_be_bytes([field[0], field[1]]) & 0x1FFF;
    Some(LATM_HEADER_LEN + value as usize)
}

/// `LatmGetValue()`: a 2-bit byte count followed by up to four bytes.
pub fn latm_get_value(reader: &mut BsIoSliceReader) -> Result<u32> {
    let bytes_for_value: u8 = reader.get_n(2)?;

    let mut value = 0u32;
    for _ in 0..=bytes_for_value {
        value = (value << 8) | reader.get_n::<u32>(8)?;
    }

    Ok(value)
}

/// One program/layer of a `StreamMuxConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatmLayer {
    pub program: u8,
    pub layer: u8,
    pub config: AudioConfig,

    pub frame_length_type: u8,
    pub latm_buffer_fullness: Option<u8>,
    pub core_frame_offset: Option<u8>,

    /// `frameLength` for `frameLengthType` 1. The payload is this plus 20 bytes.
    pub frame_length: Option<u16>,

    /// CELP or HVXC frame length table index.
    pub table_index: Option<u8>,
}

impl LatmLayer {
    /// Payload length in bytes for fixed length framing.
    pub fn fixed_payload_len(&self) -> Option<usize> {
        self.frame_length.map(|len| len as usize + 20)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMuxConfig {
    pub audio_mux_version: u8,
    pub tara_buffer_fullness: Option<u32>,
    pub all_streams_same_time_framing: bool,

    /// `numSubFrames` as coded, one less than the number of sub frames.
    pub num_sub_frames: u8,

    pub layers: Vec<LatmLayer>,

    pub other_data_len_bits: Option<u32>,
    pub crc_checksum: Option<u8>,
}

impl StreamMuxConfig {
    pub fn read(state: &mut ParserState, reader: &mut BsIoSliceReader) -> Result<Self> {
        let audio_mux_version: u8 = reader.get_n(1)?;
        let audio_mux_version_a = if audio_mux_version == 1 {
            reader.get()?
        } else {
            false
        };

        if audio_mux_version_a {
            bail!(LatmError::ReservedMuxVersionA);
        }

        let mut smc = Self {
            audio_mux_version,
            ..Default::default()
        };

        if audio_mux_version == 1 {
            smc.tara_buffer_fullness = Some(latm_get_value(reader)?);
        }

        smc.all_streams_same_time_framing = reader.get()?;
        smc.num_sub_frames = reader.get_n(6)?;

        let num_program: u8 = reader.get_n(4)?;
        for program in 0..=num_program {
            let num_layer: u8 = reader.get_n(3)?;
            for layer in 0..=num_layer {
                let use_same_config = if program == 0 && layer == 0 {
                    false
                } else {
                    reader.get()?
                };

                let config = if use_same_config {
                    match smc.layers.last() {
                        Some(previous) => previous.config.clone(),
                        None => bail!(LatmError::MissingStreamMuxConfig),
                    }
                } else if audio_mux_version == 0 {
                    AudioConfig::read(state, reader, None)?
                } else {
                    let asc_len = latm_get_value(reader)?;
                    let start = reader.position()?;
                    let config = AudioConfig::read(state, reader, Some(asc_len as u64))?;

                    let used = reader.position()? - start;
                    if used > asc_len as u64 {
                        bail!(LatmError::ConfigOverrun(asc_len));
                    }
                    reader.skip_bits(asc_len as u64 - used)?;

                    config
                };

                let mut entry = LatmLayer {
                    program,
                    layer,
                    frame_length_type: reader.get_n(3)?,
                    ..Default::default()
                };

                match entry.frame_length_type {
                    0 => {
                        entry.latm_buffer_fullness = Some(reader.get_n(8)?);
                        if !smc.all_streams_same_time_framing {
                            let previous_core = smc
                                .layers
                                .last()
                                .is_some_and(|l| matches!(l.config.object_type, 8 | 24));
                            if matches!(config.object_type, 6 | 20) && previous_core {
                                entry.core_frame_offset = Some(reader.get_n(6)?);
                            }
                        }
                    }
                    1 => entry.frame_length = Some(reader.get_n(9)?),
                    3..=5 => entry.table_index = Some(reader.get_n(6)?),
                    6 | 7 => entry.table_index = Some(reader.get_n(1)?),
                    _ => {}
                }

                entry.config = config;
                smc.layers.push(entry);
            }
        }

        if reader.get()? {
            let other_data_len_bits = if audio_mux_version == 1 {
                latm_get_value(reader)?
            } else {
                let mut len = 0u32;
                loop {
                    len <<= 8;
                    let other_data_len_esc = reader.get()?;
                    len += reader.get_n::<u32>(8)?;
                    if !other_data_len_esc {
                        break;
                    }
                }
                len
            };
            smc.other_data_len_bits = Some(other_data_len_bits);
        }

        if reader.get()? {
            smc.crc_checksum = Some(reader.get_n(8)?);
        }

        debug!(
            "StreamMuxConfig: version {}, {} sub frames, {} layers",
            smc.audio_mux_version,
            smc.sub_frames(),
            smc.layers.len()
        );

        Ok(smc)
    }

    pub fn sub_frames(&self) -> u32 {
        self.num_sub_frames as u32 + 1
    }

    /// Configuration of the first program's first layer.
    pub fn primary_config(&self) -> Option<&AudioConfig> {
        self.layers.first().map(|l| &l.config)
    }
}

/// A parsed `AudioMuxElement(1)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioMuxElement {
    /// A new `StreamMuxConfig` was carried by this element.
    pub stream_mux_config_present: bool,

    pub sub_frames: u32,

    /// `PayloadMux` lengths in bytes, sub frame major, layer minor.
    pub payload_lengths: Vec<usize>,

    /// Element scan of the first sub frame's first layer.
    pub raw_data_block: Option<RawDataBlockInfo>,
}

impl AudioMuxElement {
    /// Reads one element. A carried `StreamMuxConfig` replaces the one kept in
    /// `state`; otherwise the kept one describes the payload.
    ///
    /// The first payload is scanned for syntactic elements when
    /// `scan_payload` is set and the primary layer uses the GA syntax.
    pub fn read(
        state: &mut ParserState,
        reader: &mut BsIoSliceReader,
        scan_payload: bool,
    ) -> Result<Self> {
        let mut element = Self::default();

        let use_same_stream_mux = reader.get()?;
        if !use_same_stream_mux {
            let smc = StreamMuxConfig::read(state, reader)?;
            state.stream_mux_config = Some(smc);
            element.stream_mux_config_present = true;
        }

        let Some(smc) = state.stream_mux_config.clone() else {
            bail!(LatmError::MissingStreamMuxConfig);
        };

        if !smc.all_streams_same_time_framing {
            bail!(LatmError::UnsupportedChunkedFraming);
        }

        element.sub_frames = smc.sub_frames();

        for sub_frame in 0..element.sub_frames {
            let lengths = Self::read_payload_length_info(reader, &smc)?;

            for (index, &payload) in lengths.iter().enumerate() {
                let start = reader.position()?;
                let available = (reader.available()? / 8) as usize;
                if payload > available {
                    bail!(LatmError::PayloadOverrun { payload, available });
                }

                let is_ga = matches!(smc.layers[index].config.object_type, 1..=4 | 6 | 7);
                if scan_payload && sub_frame == 0 && index == 0 && is_ga && payload > 0 {
                    match RawDataBlockInfo::scan(reader) {
                        Ok(info) => element.raw_data_block = Some(info),
                        Err(e) => trace!("LATM payload scan stopped: {e}"),
                    }
                }

                reader.seek_to(start + payload as u64 * 8)?;
                element.payload_lengths.push(payload);
            }
        }

        if let Some(other_data_len_bits) = smc.other_data_len_bits {
            reader.skip_bits(other_data_len_bits as u64)?;
        }

        reader.byte_align()?;

        Ok(element)
    }

    fn read_payload_length_info(
        reader: &mut BsIoSliceReader,
        smc: &StreamMuxConfig,
    ) -> Result<Vec<usize>> {
        let mut lengths = Vec::with_capacity(smc.layers.len());

        for layer in &smc.layers {
            let length = match layer.frame_length_type {
                0 => {
                    let mut mux_slot_length_bytes = 0usize;
                    loop {
                        let tmp: u8 = reader.get_n(8)?;
                        mux_slot_length_bytes += tmp as usize;
                        if tmp != 255 {
                            break;
                        }
                    }
                    mux_slot_length_bytes
                }
                1 => match layer.fixed_payload_len() {
                    Some(len) => len,
                    None => bail!(LatmError::UnsupportedFrameLengthType(1)),
                },
                other => bail!(LatmError::UnsupportedFrameLengthType(other)),
            };
            lengths.push(length);
        }

        Ok(lengths)
    }

    pub fn payload_bytes(&self) -> usize {
        self.payload_lengths.iter().sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bitstream_io::{BigEndian, BitWrite, BitWriter};

    /// Builds a LOAS frame with one layer of AAC LC, 44.1 kHz stereo, carrying
    /// a `StreamMuxConfig` when `with_config` is set.
    pub(crate) fn build_frame(with_config: bool, payload: &[u8]) -> Vec<u8> {
        fn write_element<W: BitWrite>(
            w: &mut W,
            with_config: bool,
            payload: &[u8],
        ) -> std::io::Result<()> {
            w.write_bit(!with_config)?; // useSameStreamMux
            if with_config {
                w.write_var::<u8>(1, 0)?; // audioMuxVersion
                w.write_bit(true)?; // allStreamsSameTimeFraming
                w.write_var::<u8>(6, 0)?; // numSubFrames
                w.write_var::<u8>(4, 0)?; // numProgram
                w.write_var::<u8>(3, 0)?; // numLayer
                w.write_var::<u16>(16, 0x1210)?; // AudioSpecificConfig
                w.write_var::<u8>(3, 0)?; // frameLengthType
                w.write_var::<u8>(8, 0xFF)?; // latmBufferFullness
                w.write_bit(false)?; // otherDataPresent
                w.write_bit(false)?; // crcCheckPresent
            }

            let mut remaining = payload.len();
            while remaining >= 255 {
                w.write_var::<u8>(8, 255)?;
                remaining -= 255;
            }
            w.write_var::<u8>(8, remaining as u8)?;

            for &byte in payload {
                w.write_var::<u8>(8, byte)?;
            }
            w.byte_align()
        }

        let mut element = Vec::new();
        {
            let mut w = BitWriter::endian(&mut element, BigEndian);
            write_element(&mut w, with_config, payload).expect("write to Vec");
        }

        let length = element.len() as u16;
        let mut frame = vec![0x56, 0xE0 | (length >> 8) as u8, length as u8];
        frame.extend_from_slice(&element);
        frame
    }

    #[test]
    fn sync_and_length_fields() {
        let frame = build_frame(true, &[0; 10]);
        assert!(is_sync(&frame));
        assert_eq!(frame_length(&frame), Some(frame.len()));
        assert_eq!(frame_length(&frame[..2]), None);
        assert!(!is_sync(&[0x56, 0xC0]));
    }

    #[test]
    fn latm_get_value_reads_byte_count_plus_one_bytes() -> Result<()> {
        // bytesForValue = 1, value 0x0102
        let data = [0b0100_0000, 0b0100_0000, 0b1000_0000];
        let mut reader = BsIoSliceReader::from_slice(&data);
        assert_eq!(latm_get_value(&mut reader)?, 0x0102);
        assert_eq!(reader.position()?, 18);
        Ok(())
    }

    #[test]
    fn reads_mux_element_with_config() -> Result<()> {
        let payload = [0u8; 300];
        let frame = build_frame(true, &payload);

        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&frame[LATM_HEADER_LEN..]);
        let element = AudioMuxElement::read(&mut state, &mut reader, true)?;

        assert!(element.stream_mux_config_present);
        assert_eq!(element.sub_frames, 1);
        assert_eq!(element.payload_bytes(), 300);
        assert_eq!(reader.available()?, 0);
        assert!(state.diagnostics.is_empty());

        let smc = state.stream_mux_config.as_ref().expect("stored config");
        let config = smc.primary_config().expect("one layer");
        assert_eq!(config.sampling_frequency, 44_100);
        assert_eq!(config.channels(), Some(2));

        let info = element.raw_data_block.expect("scanned payload");
        assert_eq!(info.elements.len(), 1);
        Ok(())
    }

    #[test]
    fn same_stream_mux_requires_a_previous_config() -> Result<()> {
        let frame = build_frame(false, &[0; 4]);

        let mut state = ParserState::default();
        let mut reader = BsIoSliceReader::from_slice(&frame[LATM_HEADER_LEN..]);
        let err = AudioMuxElement::read(&mut state, &mut reader, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LatmError>(),
            Some(LatmError::MissingStreamMuxConfig)
        ));

        let first = build_frame(true, &[0; 4]);
        let mut reader = BsIoSliceReader::from_slice(&first[LATM_HEADER_LEN..]);
        AudioMuxElement::read(&mut state, &mut reader, false)?;

        let mut reader = BsIoSliceReader::from_slice(&frame[LATM_HEADER_LEN..]);
        let element = AudioMuxElement::read(&mut state, &mut reader, false)?;
        assert!(!element.stream_mux_config_present);
        assert_eq!(element.payload_bytes(), 4);
        Ok(())
    }
}
