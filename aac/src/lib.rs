#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! ### Transport Identification
//!
//! A stream in [`process::ContainerMode::Unknown`] is probed for an ID3v2 tag
//! (skipped), the ADIF magic, and finally LATM and ADTS sync words. A sync
//! word is only trusted once the declared frame lengths chain onto further
//! sync words or onto the end of the stream.
//!
//! ### Configuration
//!
//! The AudioSpecificConfig is read from an ADTS header, a LATM
//! StreamMuxConfig, the program config element of an ADIF header, or handed in
//! out of band. Explicit and implicit SBR/PS signalling is resolved, and a
//! changed configuration is reported with the frame that changed it.
//!
//! ### Timing
//!
//! Every frame advances the presentation timestamp by its duration in
//! nanoseconds, `1e9 * frame_length / sampling_frequency` rounded to the
//! nearest integer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aac::process::{
//!     EXAMPLE_DATA,
//!     session::{Event, ParserConfig, ParserSession},
//!     source::StreamBuffer,
//! };
//! use aac::utils::errors::SessionError;
//!
//! let mut source = StreamBuffer::default();
//! let mut session = ParserSession::new(ParserConfig::default());
//!
//! source.push_bytes(EXAMPLE_DATA);
//! source.mark_end_of_stream();
//!
//! loop {
//!     match session.next_event(&mut source) {
//!         Ok(Event::Frame(frame)) => println!("{} bytes at {} ns", frame.size, frame.pts_ns),
//!         Ok(Event::EndOfStream(summary)) => {
//!             println!("{} frames", summary.frame_count);
//!             break;
//!         }
//!         Ok(_) => {}
//!         // Push more input and call again
//!         Err(SessionError::NeedMoreData) => break,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Stream processing.
///
/// 1. **Byte Sources** ([`process::source`]): The buffered input window.
///
/// 2. **Synchronization** ([`process::sync`]): Sync word search with forward
///    length checks.
///
/// 3. **Parsing** ([`process::parse`]): Transport frames and configurations
///    into structured data.
///
/// 4. **Sessions** ([`process::session`]): The resumable container mode state
///    machine.
///
/// 5. **Summaries** ([`process::summary`]): Frame size statistics and bitrates.
pub mod process;

/// Bitstream syntax.
///
/// - **ADTS** ([`structs::adts`]): Fixed and variable frame headers
/// - **LATM** ([`structs::latm`]): AudioMuxElement and StreamMuxConfig
/// - **ADIF** ([`structs::adif`]): File header
/// - **Audio Configuration** ([`structs::audio_config`]): AudioSpecificConfig
/// - **Program Configuration** ([`structs::program_config`]): Channel layouts
/// - **Raw Data Blocks** ([`structs::raw_data_block`]): Syntactic element scan
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **Error Handling** ([`utils::errors`]): Error types
/// - **Tables** ([`utils::tables`]): Sampling frequencies and channel layouts
/// - **Timing** ([`utils::timing`]): Presentation timestamps
pub mod utils;
