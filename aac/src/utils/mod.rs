//! Utility functions and supporting infrastructure.
//!
//! Provides bitstream reading, error handling, immutable lookup tables and
//! presentation timing used by the structure readers and the parse session.

pub mod bitstream_io;
pub mod errors;
pub mod tables;
pub mod timing;
