//! Data structures representing AAC bitstream components.
//!
//! Contains structured representations of the audio configuration, the
//! per-frame transport headers (ADTS, LATM), the ADIF file header and the
//! syntactic elements of a raw data block.

pub mod adif;
pub mod adts;
pub mod audio_config;
pub mod latm;
pub mod program_config;
pub mod raw_data_block;
