//! ADIF file header (ISO/IEC 13818-7, 8.1.1 / ISO/IEC 14496-3, 1.A.2.1).
//!
//! ADIF has a single header at the start of the file followed by unframed raw
//! data blocks, so only the header and the first raw data block are read.

use anyhow::{Result, bail};
use log::debug;

use crate::structs::audio_config::AudioConfig;
use crate::structs::program_config::ProgramConfigElement;
use crate::structs::raw_data_block::RawDataBlockInfo;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::AdifError;

/// "ADIF"
pub const ADIF_ID: u32 = 0x4144_4946;

pub fn is_adif(bytes: &[u8]) -> bool {
    bytes.starts_with(b"ADIF")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdifHeader {
    pub copyright_id: Option<[u8; 9]>,
    pub original_copy: bool,
    pub home: bool,

    /// 0 for constant rate, 1 for variable rate.
    pub bitstream_type: u8,

    /// Bitrate in bits per second; an upper bound for variable rate streams.
    pub bitrate: u32,

    /// `adif_buffer_fullness` per program, constant rate streams only.
    pub buffer_fullness: Vec<u32>,

    pub program_configs: Vec<ProgramConfigElement>,

    /// Size of the header in bytes.
    pub header_len: usize,

    /// Element scan of the first raw data block, when it was available.
    pub raw_data_block: Option<RawDataBlockInfo>,
}

impl AdifHeader {
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let adif_id: u32 = reader.get_n(32)?;
        if adif_id != ADIF_ID {
            bail!(AdifError::InvalidAdifId(adif_id));
        }

        let mut header = Self::default();

        if reader.get()? {
            let mut copyright_id = [0u8; 9];
            for byte in copyright_id.iter_mut() {
                *byte = reader.get_n(8)?;
            }
            header.copyright_id = Some(copyright_id);
        }

        header.original_copy = reader.get()?;
        header.home = reader.get()?;
        header.bitstream_type = reader.get_n(1)?;
        header.bitrate = reader.get_n(23)?;

        let num_program_config_elements: u8 = reader.get_n(4)?;
        for _ in 0..=num_program_config_elements {
            if header.bitstream_type == 0 {
                header.buffer_fullness.push(reader.get_n(20)?);
            }
            header
                .program_configs
                .push(ProgramConfigElement::read(reader, 0)?);
        }

        reader.byte_align()?;
        header.header_len = (reader.position()? / 8) as usize;

        debug!(
            "ADIF header: {} bytes, {} program(s), {} bit/s {}",
            header.header_len,
            header.program_configs.len(),
            header.bitrate,
            if header.is_vbr() { "VBR" } else { "CBR" },
        );

        Ok(header)
    }

    pub fn is_vbr(&self) -> bool {
        self.bitstream_type == 1
    }

    /// The configuration described by the first program.
    pub fn audio_config(&self) -> Option<AudioConfig> {
        let pce = self.program_configs.first()?;

        let mut config =
            AudioConfig::from_profile(pce.object_type, pce.sampling_frequency_index, 0);
        config.program_config = Some(pce.clone());

        Some(config)
    }

    pub fn copyright_id_str(&self) -> Option<String> {
        self.copyright_id
            .map(|id| String::from_utf8_lossy(&id).trim_end_matches('\0').to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::structs::program_config::tests::write_pce_5_1;
    use bitstream_io::{BigEndian, BitWrite, BitWriter};

    /// An ADIF header for a constant rate 5.1 stream at 320 kbit/s.
    pub(crate) fn build_header() -> Vec<u8> {
        fn write<W: BitWrite>(w: &mut W) -> std::io::Result<()> {
            w.write_var::<u32>(32, ADIF_ID)?;
            w.write_bit(false)?; // copyright_id_present
            w.write_bit(false)?;
            w.write_bit(false)?;
            w.write_var::<u8>(1, 0)?; // bitstream_type
            w.write_var::<u32>(23, 320_000)?;
            w.write_var::<u8>(4, 0)?;
            w.write_var::<u32>(20, 0)?; // adif_buffer_fullness
            write_pce_5_1(w)?;
            w.byte_align()
        }

        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            write(&mut w).expect("write to Vec");
        }
        data
    }

    #[test]
    fn reads_header() -> Result<()> {
        let data = build_header();
        assert!(is_adif(&data));

        let mut reader = BsIoSliceReader::from_slice(&data);
        let header = AdifHeader::read(&mut reader)?;
        assert_eq!(header.bitrate, 320_000);
        assert!(!header.is_vbr());
        assert_eq!(header.program_configs.len(), 1);
        assert_eq!(header.buffer_fullness, vec![0]);
        assert_eq!(header.header_len, data.len());

        let config = header.audio_config().expect("one program");
        assert_eq!(config.object_type, 2);
        assert_eq!(config.sampling_frequency, 48_000);
        assert_eq!(config.channels(), Some(6));
        Ok(())
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut reader = BsIoSliceReader::from_slice(b"ADTS\0\0\0\0");
        let err = AdifHeader::read(&mut reader).unwrap_err();
        assert!(err.downcast_ref::<AdifError>().is_some());
    }
}
