//! Frame synchronization for ADTS and LATM streams.
//!
//! A sync word alone is a weak signal inside compressed data, so a candidate
//! is only accepted when the frame lengths chain forward from it onto further
//! sync words, up to [`MAX_LOOKAHEAD_HOPS`] frames deep, or onto the end of
//! the stream.

use log::trace;

use crate::process::ContainerMode;
use crate::structs::{adts, latm};
use crate::utils::errors::SyncError;

/// Frames a candidate's length chain is followed before it is accepted.
pub const MAX_LOOKAHEAD_HOPS: usize = 3;

/// Bytes needed to test a sync word.
pub const SYNC_BYTES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Adts,
    Latm,
}

impl Framing {
    pub fn is_sync(self, bytes: &[u8]) -> bool {
        match self {
            Framing::Adts => adts::is_sync(bytes),
            Framing::Latm => latm::is_sync(bytes),
        }
    }

    /// Total frame length declared by the header at `bytes`.
    pub fn frame_length(self, bytes: &[u8]) -> Option<usize> {
        match self {
            Framing::Adts => adts::frame_length(bytes),
            Framing::Latm => latm::frame_length(bytes),
        }
    }

    /// Bytes needed to read the frame length.
    pub fn length_field_end(self) -> usize {
        match self {
            Framing::Adts => adts::ADTS_LENGTH_FIELD_END,
            Framing::Latm => latm::LATM_HEADER_LEN,
        }
    }

    /// Whether a declared frame length is long enough to hold a header.
    pub fn is_valid_length(self, length: usize) -> bool {
        match self {
            Framing::Adts => length > adts::ADTS_HEADER_LEN,
            Framing::Latm => length > latm::LATM_HEADER_LEN,
        }
    }

    /// Whether `byte` can be the first byte of a sync word.
    pub fn could_start(self, byte: u8) -> bool {
        match self {
            Framing::Adts => byte == 0xFF,
            Framing::Latm => byte == 0x56,
        }
    }

    pub fn mode(self) -> ContainerMode {
        match self {
            Framing::Adts => ContainerMode::Adts,
            Framing::Latm => ContainerMode::Latm,
        }
    }

    /// The locked framing of a self-synchronizing mode.
    pub fn for_mode(mode: ContainerMode) -> Option<Framing> {
        match mode {
            ContainerMode::Adts => Some(Framing::Adts),
            ContainerMode::Latm => Some(Framing::Latm),
            _ => None,
        }
    }

    /// The framings to try in `mode`. Unknown tries LATM before ADTS.
    pub fn candidates(mode: ContainerMode) -> &'static [Framing] {
        match mode {
            ContainerMode::Adts => &[Framing::Adts],
            ContainerMode::Latm => &[Framing::Latm],
            ContainerMode::Unknown => &[Framing::Latm, Framing::Adts],
            _ => &[],
        }
    }
}

/// The buffered bytes and what is known about the stream around them.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub data: &'a [u8],

    /// Stream offset of `data[0]`.
    pub position: u64,

    pub total_len: Option<u64>,

    /// The window holds whole frames handed over by a container demuxer, so
    /// a frame ending at the end of the window is complete.
    pub embedded: bool,
}

impl Window<'_> {
    pub fn is_end_of_stream(&self) -> bool {
        self.total_len
            .is_some_and(|total| self.position + self.data.len() as u64 >= total)
    }

    fn ends_stream(&self, offset: usize) -> bool {
        self.total_len == Some(self.position + offset as u64)
    }
}

/// Checks whether a frame of `framing` starting at `offset` is the head of a
/// consistent chain.
///
/// Returns [`SyncError::NeedMoreData`] when the chain leaves the window
/// before it could be confirmed or refuted.
pub fn check_candidate(window: &Window, offset: usize, framing: Framing) -> Result<(), SyncError> {
    let data = window.data;
    let mut frame_start = offset;

    for _ in 0..MAX_LOOKAHEAD_HOPS {
        let header = data.get(frame_start..).unwrap_or_default();
        let Some(length) = framing.frame_length(header) else {
            return Err(SyncError::NeedMoreData);
        };

        if !framing.is_valid_length(length) {
            return Err(SyncError::NotSynchronized);
        }

        let next = frame_start + length;
        if window.ends_stream(next) || (window.embedded && next == data.len()) {
            return Ok(());
        }

        if next + SYNC_BYTES > data.len() {
            return Err(SyncError::NeedMoreData);
        }

        if !framing.is_sync(&data[next..]) {
            return Err(SyncError::NotSynchronized);
        }

        frame_start = next;
    }

    Ok(())
}

/// The outcome of a synchronization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncScan {
    /// Bytes before the accepted or pending candidate that can be dropped.
    pub skip: usize,
    pub result: Result<Framing, SyncError>,
}

/// Scans the window byte by byte for an accepted frame start.
///
/// On success `skip` is the candidate's offset. With
/// [`SyncError::NeedMoreData`] `skip` is the offset to resume from: either a
/// pending candidate, or the trailing byte that may still begin a sync word.
/// At the end of the stream incomplete candidates count as invalid and the
/// result is [`SyncError::NotSynchronized`] with the whole window skipped.
pub fn synchronize(window: &Window, candidates: &[Framing]) -> SyncScan {
    let data = window.data;
    let end_of_stream = window.is_end_of_stream();

    let mut offset = 0;
    while offset + SYNC_BYTES <= data.len() {
        for &framing in candidates {
            if !framing.is_sync(&data[offset..]) {
                continue;
            }

            match check_candidate(window, offset, framing) {
                Ok(()) => {
                    trace!(
                        "{:?} candidate at {} accepted",
                        framing,
                        window.position + offset as u64
                    );
                    return SyncScan {
                        skip: offset,
                        result: Ok(framing),
                    };
                }
                Err(SyncError::NeedMoreData) if !end_of_stream => {
                    return SyncScan {
                        skip: offset,
                        result: Err(SyncError::NeedMoreData),
                    };
                }
                Err(_) => {}
            }
        }

        offset += 1;
    }

    if end_of_stream {
        return SyncScan {
            skip: data.len(),
            result: Err(SyncError::NotSynchronized),
        };
    }

    // A trailing byte may still begin a sync word once more data arrives.
    let keep_last = data
        .get(offset)
        .is_some_and(|&byte| candidates.iter().any(|f| f.could_start(byte)));

    SyncScan {
        skip: if keep_last { offset } else { data.len() },
        result: Err(SyncError::NeedMoreData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EXAMPLE_DATA;

    fn window(data: &[u8], total_len: Option<u64>) -> Window<'_> {
        Window {
            data,
            position: 0,
            total_len,
            embedded: false,
        }
    }

    #[test]
    fn accepts_chain_ending_at_end_of_stream() {
        let w = window(EXAMPLE_DATA, Some(EXAMPLE_DATA.len() as u64));
        assert_eq!(check_candidate(&w, 0, Framing::Adts), Ok(()));
        assert_eq!(check_candidate(&w, 16, Framing::Adts), Ok(()));
        assert_eq!(check_candidate(&w, 34, Framing::Adts), Ok(()));
    }

    #[test]
    fn needs_more_data_until_chain_resolves() {
        let w = window(&EXAMPLE_DATA[..30], None);
        assert_eq!(
            check_candidate(&w, 0, Framing::Adts),
            Err(SyncError::NeedMoreData)
        );

        let scan = synchronize(&w, Framing::candidates(ContainerMode::Unknown));
        assert_eq!(scan.skip, 0);
        assert_eq!(scan.result, Err(SyncError::NeedMoreData));

        // The last frame of an unterminated stream cannot be confirmed.
        let w = window(EXAMPLE_DATA, None);
        assert_eq!(
            check_candidate(&w, 34, Framing::Adts),
            Err(SyncError::NeedMoreData)
        );

        // Three confirmed hops are enough without knowing the stream end.
        let mut longer = EXAMPLE_DATA.to_vec();
        longer.extend_from_slice(&EXAMPLE_DATA[..2]);
        let w = window(&longer, None);
        assert_eq!(check_candidate(&w, 0, Framing::Adts), Ok(()));
    }

    #[test]
    fn embedded_window_accepts_frame_ending_at_window_end() {
        let mut w = window(&EXAMPLE_DATA[..16], None);
        assert_eq!(
            check_candidate(&w, 0, Framing::Adts),
            Err(SyncError::NeedMoreData)
        );
        w.embedded = true;
        assert_eq!(check_candidate(&w, 0, Framing::Adts), Ok(()));
    }

    #[test]
    fn rejects_sync_word_without_chain() {
        let mut data = vec![0x12, 0xFF, 0xF1, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(EXAMPLE_DATA);
        let w = window(&data, Some(data.len() as u64));

        // Length 0 at offset 1
        assert_eq!(
            check_candidate(&w, 1, Framing::Adts),
            Err(SyncError::NotSynchronized)
        );

        let scan = synchronize(&w, Framing::candidates(ContainerMode::Unknown));
        assert_eq!(scan.skip, 7);
        assert_eq!(scan.result, Ok(Framing::Adts));
    }

    #[test]
    fn lookahead_is_bounded() {
        // Four frames whose fourth successor is garbage: the bound stops the
        // walk after three hops.
        let mut data = EXAMPLE_DATA.to_vec();
        data.extend_from_slice(&EXAMPLE_DATA[..16]);
        data.extend_from_slice(&[0x00; 8]);
        let w = window(&data, None);
        assert_eq!(check_candidate(&w, 0, Framing::Adts), Ok(()));
        assert_eq!(
            check_candidate(&w, 16, Framing::Adts),
            Err(SyncError::NotSynchronized)
        );
    }

    #[test]
    fn trailing_bytes_are_dropped_unless_they_may_start_a_frame() {
        let w = window(&[0x00, 0x01, 0x02, 0xFF], None);
        let scan = synchronize(&w, &[Framing::Adts]);
        assert_eq!(scan.skip, 3);
        assert_eq!(scan.result, Err(SyncError::NeedMoreData));

        let w = window(&[0x00, 0x01, 0x02, 0x56], None);
        let scan = synchronize(&w, &[Framing::Adts]);
        assert_eq!(scan.skip, 4);

        let w = window(&[0x00, 0x01, 0x02, 0xFF], Some(4));
        let scan = synchronize(&w, &[Framing::Adts]);
        assert_eq!(scan.skip, 4);
        assert_eq!(scan.result, Err(SyncError::NotSynchronized));
    }

    #[test]
    fn latm_is_tried_before_adts() {
        let frame = crate::structs::latm::tests::build_frame(true, &[0; 8]);
        let w = window(&frame, Some(frame.len() as u64));
        let scan = synchronize(&w, Framing::candidates(ContainerMode::Unknown));
        assert_eq!(scan.result, Ok(Framing::Latm));
        assert_eq!(scan.skip, 0);
    }
}
