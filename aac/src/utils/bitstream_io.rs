//! Bitstream I/O utilities for AAC parsing.
//!
//! Provides a most-significant-bit-first cursor over a byte window with
//! peeking, skipping and byte alignment. Every read is bounds checked against
//! the window length first so that running out of data always surfaces as
//! [`BitReaderError::InsufficientBits`] rather than a generic I/O error.

use std::io;
use std::io::SeekFrom;

use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};

use crate::utils::errors::BitReaderError;

pub type BitResult<T> = Result<T, BitReaderError>;

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    fn ensure(&mut self, n: u32) -> BitResult<()> {
        let available = self.available()?;
        if n as u64 > available {
            return Err(BitReaderError::InsufficientBits {
                requested: n,
                available,
            });
        }

        Ok(())
    }

    #[inline(always)]
    pub fn get(&mut self) -> BitResult<bool> {
        self.ensure(1)?;
        Ok(self.bs.read_bit()?)
    }

    /// Reads `n` bits (1 to 32) and advances the cursor.
    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> BitResult<I> {
        if n == 0 || n > 32 {
            return Err(BitReaderError::InvalidWidth(n));
        }

        self.ensure(n)?;
        Ok(self.bs.read_unsigned_var(n)?)
    }

    /// Returns the next `n` bits (at most 32) without advancing the cursor.
    #[inline(always)]
    pub fn peek_n(&mut self, n: u32) -> BitResult<u32> {
        let position = self.position()?;
        let value = self.get_n::<u32>(n)?;
        self.bs.seek_bits(SeekFrom::Start(position))?;

        Ok(value)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> BitResult<()> {
        self.ensure(n)?;
        Ok(self.bs.skip(n)?)
    }

    /// Skips `n` whole bytes, which may exceed the 32-bit limit of a single read.
    pub fn skip_bytes(&mut self, n: usize) -> BitResult<()> {
        self.skip_bits((n as u64) << 3)
    }

    pub fn skip_bits(&mut self, bits: u64) -> BitResult<()> {
        let available = self.available()?;
        if bits > available {
            return Err(BitReaderError::InsufficientBits {
                requested: u32::try_from(bits).unwrap_or(u32::MAX),
                available,
            });
        }

        self.bs.seek_bits(SeekFrom::Current(bits as i64))?;

        Ok(())
    }

    /// Moves the cursor to an absolute bit position inside the window.
    pub fn seek_to(&mut self, position: u64) -> BitResult<()> {
        if position > self.len {
            return Err(BitReaderError::InsufficientBits {
                requested: u32::try_from(position).unwrap_or(u32::MAX),
                available: self.len,
            });
        }

        self.bs.seek_bits(SeekFrom::Start(position))?;

        Ok(())
    }

    #[inline(always)]
    pub fn is_byte_aligned(&self) -> bool {
        self.bs.byte_aligned()
    }

    #[inline(always)]
    pub fn byte_align(&mut self) -> BitResult<()> {
        let position = self.position()?;
        let padding = ((8 - (position & 7)) & 7) as u32;
        self.skip_n(padding)
    }

    /// Aligns to a byte boundary counted from `origin` rather than from the
    /// start of the window.
    pub fn byte_align_from(&mut self, origin: u64) -> BitResult<()> {
        let position = self.position()?;
        let padding = ((8 - (position.wrapping_sub(origin) & 7)) & 7) as u32;
        self.skip_n(padding)
    }

    #[inline(always)]
    pub fn available(&mut self) -> BitResult<u64> {
        let position = self.bs.position_in_bits()?;
        Ok(self.len.saturating_sub(position))
    }

    #[inline(always)]
    pub fn position(&mut self) -> BitResult<u64> {
        Ok(self.bs.position_in_bits()?)
    }

    pub fn len_bits(&self) -> u64 {
        self.len
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_msb_first() -> anyhow::Result<()> {
        let mut reader = BsIoSliceReader::from_slice(&[0b1010_0000, 0xFF]);
        assert!(reader.get()?);
        assert!(!reader.get()?);
        assert_eq!(reader.get_n::<u8>(2)?, 0b10);
        assert_eq!(reader.get_n::<u16>(8)?, 0x0F);
        assert_eq!(reader.available()?, 4);
        Ok(())
    }

    #[test]
    fn peek_does_not_advance() -> anyhow::Result<()> {
        let mut reader = BsIoSliceReader::from_slice(&[0x12, 0x10]);
        assert_eq!(reader.peek_n(5)?, 2);
        assert_eq!(reader.peek_n(5)?, 2);
        assert_eq!(reader.position()?, 0);
        assert_eq!(reader.get_n::<u8>(5)?, 2);
        assert_eq!(reader.position()?, 5);
        Ok(())
    }

    #[test]
    fn exhausted_window_reports_insufficient_bits() {
        let mut reader = BsIoSliceReader::from_slice(&[0xAB]);
        assert!(matches!(
            reader.get_n::<u16>(9),
            Err(BitReaderError::InsufficientBits {
                requested: 9,
                available: 8
            })
        ));
        // A failed read leaves the cursor untouched.
        assert_eq!(reader.get_n::<u8>(8).unwrap(), 0xAB);
        assert!(matches!(
            reader.peek_n(1),
            Err(BitReaderError::InsufficientBits { .. })
        ));
    }

    #[test]
    fn byte_align_skips_to_boundary() -> anyhow::Result<()> {
        let mut reader = BsIoSliceReader::from_slice(&[0xFF, 0x5A, 0x00]);
        reader.skip_n(3)?;
        assert!(!reader.is_byte_aligned());
        reader.byte_align()?;
        assert!(reader.is_byte_aligned());
        assert_eq!(reader.get_n::<u8>(8)?, 0x5A);
        reader.byte_align()?;
        assert_eq!(reader.position()?, 16);
        reader.skip_bytes(1)?;
        assert!(reader.skip_bytes(1).is_err());
        Ok(())
    }
}
