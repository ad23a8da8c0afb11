//! Syntactic element scan of a `raw_data_block()` (ISO/IEC 14496-3, 4.4.2.1).
//!
//! Only the elements that carry stream structure are walked: program config,
//! data stream and fill elements. Channel elements hold spectral data, and
//! their length is only known after decoding it, so the scan stops at the
//! first one.

use anyhow::{Result, bail};
use log::trace;

use crate::structs::program_config::ProgramConfigElement;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::ElementError;

pub const EXT_FILL: u8 = 0x0;
pub const EXT_FILL_DATA: u8 = 0x1;
pub const EXT_DATA_ELEMENT: u8 = 0x2;
pub const EXT_DYNAMIC_RANGE: u8 = 0xB;
pub const EXT_SAC_DATA: u8 = 0xC;
pub const EXT_SBR_DATA: u8 = 0xD;
pub const EXT_SBR_DATA_CRC: u8 = 0xE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementId {
    SingleChannel,
    ChannelPair,
    CouplingChannel,
    LowFrequency,
    DataStream,
    ProgramConfig,
    Fill,
    End,
}

impl From<u8> for ElementId {
    fn from(id: u8) -> Self {
        match id & 7 {
            0 => ElementId::SingleChannel,
            1 => ElementId::ChannelPair,
            2 => ElementId::CouplingChannel,
            3 => ElementId::LowFrequency,
            4 => ElementId::DataStream,
            5 => ElementId::ProgramConfig,
            6 => ElementId::Fill,
            _ => ElementId::End,
        }
    }
}

impl ElementId {
    pub fn is_channel_element(&self) -> bool {
        matches!(
            self,
            ElementId::SingleChannel
                | ElementId::ChannelPair
                | ElementId::CouplingChannel
                | ElementId::LowFrequency
        )
    }
}

/// What a scan of one raw data block found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDataBlockInfo {
    pub elements: Vec<ElementId>,
    pub program_config: Option<ProgramConfigElement>,
    pub data_stream_bytes: usize,
    pub fill_extensions: Vec<u8>,

    /// An SBR fill extension was seen, signalling SBR implicitly.
    pub sbr_extension: bool,

    /// The scan reached `ID_END`.
    pub complete: bool,
}

impl RawDataBlockInfo {
    /// Scans elements until `ID_END`, the first channel element or the end of
    /// the block. Byte alignment inside elements is relative to the bit
    /// position the block starts at.
    pub fn scan(reader: &mut BsIoSliceReader) -> Result<Self> {
        let start = reader.position()?;
        let mut info = Self::default();

        while reader.available()? >= 3 {
            let id = ElementId::from(reader.get_n::<u8>(3)?);
            info.elements.push(id);

            match id {
                ElementId::End => {
                    info.complete = true;
                    break;
                }
                ElementId::ProgramConfig => {
                    info.program_config = Some(ProgramConfigElement::read(reader, start)?);
                }
                ElementId::DataStream => {
                    info.data_stream_bytes += Self::skip_data_stream_element(reader, start)?;
                }
                ElementId::Fill => {
                    info.read_fill_element(reader)?;
                }
                _ => break,
            }
        }

        trace!(
            "raw_data_block: {:?}, {} data stream bytes, fill extensions {:?}",
            info.elements, info.data_stream_bytes, info.fill_extensions
        );

        Ok(info)
    }

    fn skip_data_stream_element(reader: &mut BsIoSliceReader, origin: u64) -> Result<usize> {
        let _element_instance_tag: u8 = reader.get_n(4)?;
        let data_byte_align_flag = reader.get()?;

        let mut count: usize = reader.get_n::<u8>(8)? as usize;
        if count == 255 {
            count += reader.get_n::<u8>(8)? as usize;
        }

        if data_byte_align_flag {
            reader.byte_align_from(origin)?;
        }

        reader.skip_bytes(count)?;

        Ok(count)
    }

    fn read_fill_element(&mut self, reader: &mut BsIoSliceReader) -> Result<()> {
        let mut count: usize = reader.get_n::<u8>(4)? as usize;
        if count == 15 {
            let esc_count: usize = reader.get_n::<u8>(8)? as usize;
            count = count + esc_count - 1;
        }

        if count == 0 {
            return Ok(());
        }

        let remaining = reader.available()?;
        if (count as u64) * 8 > remaining {
            bail!(ElementError::FillOverrun { count, remaining });
        }

        let extension_type: u8 = reader.get_n(4)?;
        self.fill_extensions.push(extension_type);
        if extension_type == EXT_SBR_DATA || extension_type == EXT_SBR_DATA_CRC {
            self.sbr_extension = true;
        }

        // The extension payload, whatever its type, spans the whole count.
        reader.skip_bits(count as u64 * 8 - 4)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream_io::{BigEndian, BitWrite, BitWriter};

    #[test]
    fn walks_fill_and_data_stream_elements() -> Result<()> {
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            // DSE, tag 0, aligned, 2 bytes
            w.write_var::<u8>(3, 4)?;
            w.write_var::<u8>(4, 0)?;
            w.write_bit(true)?;
            w.write_var::<u8>(8, 2)?;
            w.byte_align()?;
            w.write_var::<u16>(16, 0xBEEF)?;
            // FIL with an SBR extension of 3 bytes
            w.write_var::<u8>(3, 6)?;
            w.write_var::<u8>(4, 3)?;
            w.write_var::<u8>(4, EXT_SBR_DATA)?;
            w.write_var::<u32>(20, 0)?;
            // END
            w.write_var::<u8>(3, 7)?;
            w.byte_align()?;
        }

        let mut reader = BsIoSliceReader::from_slice(&data);
        let info = RawDataBlockInfo::scan(&mut reader)?;
        assert_eq!(
            info.elements,
            vec![ElementId::DataStream, ElementId::Fill, ElementId::End]
        );
        assert_eq!(info.data_stream_bytes, 2);
        assert_eq!(info.fill_extensions, vec![EXT_SBR_DATA]);
        assert!(info.sbr_extension);
        assert!(info.complete);
        Ok(())
    }

    #[test]
    fn stops_at_channel_element() -> Result<()> {
        // CPE followed by garbage
        let data = [0x20, 0xFF, 0xFF];
        let mut reader = BsIoSliceReader::from_slice(&data);
        let info = RawDataBlockInfo::scan(&mut reader)?;
        assert_eq!(info.elements, vec![ElementId::ChannelPair]);
        assert!(!info.complete);
        assert!(info.elements[0].is_channel_element());
        Ok(())
    }

    #[test]
    fn fill_element_longer_than_block_is_rejected() {
        // FIL, count 15 + esc 200
        let data = [0xDF, 0x90, 0x00];
        let mut reader = BsIoSliceReader::from_slice(&data);
        let err = RawDataBlockInfo::scan(&mut reader).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ElementError>(),
            Some(ElementError::FillOverrun { .. })
        ));
    }
}
