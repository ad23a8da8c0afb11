//! Frame size statistics and the stream level summary.

use std::fmt::{Display, Formatter};

use crate::process::ContainerMode;
use crate::structs::adif::AdifHeader;
use crate::structs::audio_config::AudioConfig;
use crate::utils::errors::Diagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateMode {
    Constant,
    Variable,
}

impl BitrateMode {
    /// Variable when the largest frame exceeds the smallest by more than 2%.
    pub fn classify(min: usize, max: usize) -> Self {
        if max as u64 * 100 > min as u64 * 102 {
            BitrateMode::Variable
        } else {
            BitrateMode::Constant
        }
    }
}

impl Display for BitrateMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BitrateMode::Constant => write!(f, "CBR"),
            BitrateMode::Variable => write!(f, "VBR"),
        }
    }
}

/// Running frame size statistics. Sizes include the transport header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSizeStats {
    min: Option<usize>,
    max: usize,
    count: u64,
    total_bytes: u64,
}

impl FrameSizeStats {
    pub fn update(&mut self, size: usize) {
        self.min = Some(self.min.map_or(size, |min| min.min(size)));
        self.max = self.max.max(size);
        self.count += 1;
        self.total_bytes += size as u64;
    }

    pub fn min(&self) -> Option<usize> {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.min.map(|_| self.max)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn bitrate_mode(&self) -> Option<BitrateMode> {
        Some(BitrateMode::classify(self.min?, self.max))
    }
}

/// Bitrate of a frame of `size` bytes holding `frame_length` samples.
pub fn frame_bitrate(size: usize, sampling_frequency: u32, frame_length: u32) -> Option<u64> {
    if frame_length == 0 {
        return None;
    }

    Some(size as u64 * 8 * sampling_frequency as u64 / frame_length as u64)
}

/// What is known about a stream once enough frames were read or the input
/// ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub mode: ContainerMode,
    pub config: Option<AudioConfig>,
    pub adif_header: Option<AdifHeader>,

    pub frame_count: u64,
    pub duration_ns: u64,
    pub frame_sizes: FrameSizeStats,

    pub bitrate_mode: Option<BitrateMode>,
    pub min_bitrate: Option<u64>,
    pub max_bitrate: Option<u64>,
    pub average_bitrate: Option<u64>,

    /// Bytes skipped while (re)synchronizing, including tags.
    pub skipped_bytes: u64,

    /// Times lock was lost after the stream was identified.
    pub desync_count: u64,

    pub diagnostics: Diagnostics,
}

impl StreamSummary {
    /// Fills the derived bitrate fields from the frame statistics, or from the
    /// ADIF header for ADIF streams.
    pub fn compute_bitrates(&mut self) {
        if let Some(adif) = &self.adif_header {
            self.bitrate_mode = Some(if adif.is_vbr() {
                BitrateMode::Variable
            } else {
                BitrateMode::Constant
            });
            if adif.bitrate != 0 && adif.is_vbr() {
                self.max_bitrate = Some(adif.bitrate as u64);
            } else if adif.bitrate != 0 {
                self.average_bitrate = Some(adif.bitrate as u64);
            }
            return;
        }

        self.bitrate_mode = self.frame_sizes.bitrate_mode();

        let Some(config) = &self.config else {
            return;
        };

        let sampling_frequency = config.sampling_frequency;
        if let Some(min) = self.frame_sizes.min() {
            self.min_bitrate = frame_bitrate(min, sampling_frequency, config.frame_length);
        }
        if let Some(max) = self.frame_sizes.max() {
            self.max_bitrate = frame_bitrate(max, sampling_frequency, config.frame_length);
        }

        if self.duration_ns > 0 {
            self.average_bitrate = Some(
                (self.frame_sizes.total_bytes() as u128 * 8 * 1_000_000_000
                    / self.duration_ns as u128) as u64,
            );
        }
    }

    pub fn channels(&self) -> Option<usize> {
        self.config.as_ref().and_then(AudioConfig::channels)
    }

    pub fn sampling_frequency(&self) -> Option<u32> {
        self.config
            .as_ref()
            .map(AudioConfig::output_sampling_frequency)
            .filter(|&frequency| frequency != 0)
    }
}
