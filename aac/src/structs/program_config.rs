//! Program config element (ISO/IEC 14496-3, 4.4.1.1).
//!
//! Describes the channel layout when `channelConfiguration` is 0, and is the
//! only layout description carried by ADIF headers.

use anyhow::{Result, bail};
use log::trace;

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::ElementError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelElementRef {
    pub is_cpe: bool,
    pub tag_select: u8,
}

impl ChannelElementRef {
    pub fn channels(&self) -> usize {
        if self.is_cpe { 2 } else { 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramConfigElement {
    pub element_instance_tag: u8,
    pub object_type: u8,
    pub sampling_frequency_index: u8,

    pub front: Vec<ChannelElementRef>,
    pub side: Vec<ChannelElementRef>,
    pub back: Vec<ChannelElementRef>,
    pub lfe: Vec<u8>,
    pub assoc_data: Vec<u8>,
    pub valid_cc: Vec<ChannelElementRef>,

    pub mono_mixdown_element_number: Option<u8>,
    pub stereo_mixdown_element_number: Option<u8>,
    pub matrix_mixdown_idx: Option<u8>,
    pub pseudo_surround_enable: bool,

    pub comment: Vec<u8>,
}

impl ProgramConfigElement {
    /// Reads a program config element. The trailing `byte_alignment()` is
    /// relative to `align_origin`, the bit position its enclosing structure
    /// started at.
    pub fn read(reader: &mut BsIoSliceReader, align_origin: u64) -> Result<Self> {
        let mut pce = Self {
            element_instance_tag: reader.get_n(4)?,
            object_type: reader.get_n(2)?,
            sampling_frequency_index: reader.get_n(4)?,
            ..Default::default()
        };

        let num_front: usize = reader.get_n::<u8>(4)? as usize;
        let num_side: usize = reader.get_n::<u8>(4)? as usize;
        let num_back: usize = reader.get_n::<u8>(4)? as usize;
        let num_lfe: usize = reader.get_n::<u8>(2)? as usize;
        let num_assoc_data: usize = reader.get_n::<u8>(3)? as usize;
        let num_valid_cc: usize = reader.get_n::<u8>(4)? as usize;

        if reader.get()? {
            pce.mono_mixdown_element_number = Some(reader.get_n(4)?);
        }
        if reader.get()? {
            pce.stereo_mixdown_element_number = Some(reader.get_n(4)?);
        }
        if reader.get()? {
            pce.matrix_mixdown_idx = Some(reader.get_n(2)?);
            pce.pseudo_surround_enable = reader.get()?;
        }

        pce.front = Self::read_channel_elements(reader, num_front)?;
        pce.side = Self::read_channel_elements(reader, num_side)?;
        pce.back = Self::read_channel_elements(reader, num_back)?;

        for _ in 0..num_lfe {
            pce.lfe.push(reader.get_n(4)?);
        }
        for _ in 0..num_assoc_data {
            pce.assoc_data.push(reader.get_n(4)?);
        }
        pce.valid_cc = Self::read_channel_elements(reader, num_valid_cc)?;

        reader.byte_align_from(align_origin)?;

        let comment_field_bytes: usize = reader.get_n::<u8>(8)? as usize;
        for _ in 0..comment_field_bytes {
            pce.comment.push(reader.get_n(8)?);
        }

        let channels = pce.channels();
        if channels > 64 {
            bail!(ElementError::TooManyChannels(channels));
        }

        trace!(
            "program_config_element: tag {}, {} front, {} side, {} back, {} lfe = {channels} channels",
            pce.element_instance_tag,
            pce.front.len(),
            pce.side.len(),
            pce.back.len(),
            pce.lfe.len(),
        );

        Ok(pce)
    }

    fn read_channel_elements(
        reader: &mut BsIoSliceReader,
        count: usize,
    ) -> Result<Vec<ChannelElementRef>> {
        (0..count)
            .map(|_| {
                Ok(ChannelElementRef {
                    is_cpe: reader.get()?,
                    tag_select: reader.get_n(4)?,
                })
            })
            .collect()
    }

    /// Number of output channels, counting a CPE as two.
    pub fn channels(&self) -> usize {
        let count = |elements: &[ChannelElementRef]| -> usize {
            elements.iter().map(ChannelElementRef::channels).sum()
        };

        count(&self.front) + count(&self.side) + count(&self.back) + self.lfe.len()
    }

    pub fn comment_str(&self) -> Option<String> {
        if self.comment.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.comment).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bitstream_io::{BigEndian, BitWrite, BitWriter};

    /// Writes a 5.1 PCE (front C + L/R, back Ls/Rs, one LFE) with a comment.
    pub(crate) fn write_pce_5_1<W: BitWrite>(w: &mut W) -> std::io::Result<()> {
        w.write_var::<u8>(4, 0)?; // element_instance_tag
        w.write_var::<u8>(2, 1)?; // object_type (LC)
        w.write_var::<u8>(4, 3)?; // 48 kHz
        w.write_var::<u8>(4, 2)?; // front
        w.write_var::<u8>(4, 0)?; // side
        w.write_var::<u8>(4, 1)?; // back
        w.write_var::<u8>(2, 1)?; // lfe
        w.write_var::<u8>(3, 0)?; // assoc data
        w.write_var::<u8>(4, 0)?; // cc
        w.write_bit(false)?;
        w.write_bit(false)?;
        w.write_bit(false)?;
        w.write_bit(false)?; // front 0: SCE
        w.write_var::<u8>(4, 0)?;
        w.write_bit(true)?; // front 1: CPE
        w.write_var::<u8>(4, 0)?;
        w.write_bit(true)?; // back 0: CPE
        w.write_var::<u8>(4, 1)?;
        w.write_var::<u8>(4, 0)?; // lfe tag
        w.byte_align()?;
        w.write_var::<u8>(8, 2)?;
        w.write_var::<u8>(8, b'h')?;
        w.write_var::<u8>(8, b'i')?;
        Ok(())
    }

    #[test]
    fn reads_five_one_layout() -> Result<()> {
        let mut data = Vec::new();
        {
            let mut w = BitWriter::endian(&mut data, BigEndian);
            write_pce_5_1(&mut w)?;
            w.byte_align()?;
        }

        let mut reader = BsIoSliceReader::from_slice(&data);
        let pce = ProgramConfigElement::read(&mut reader, 0)?;
        assert_eq!(pce.channels(), 6);
        assert_eq!(pce.sampling_frequency_index, 3);
        assert_eq!(pce.front.len(), 2);
        assert!(pce.back[0].is_cpe);
        assert_eq!(pce.comment_str().as_deref(), Some("hi"));
        assert_eq!(reader.available()?, 0);
        Ok(())
    }
}
