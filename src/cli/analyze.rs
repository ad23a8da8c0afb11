use std::path::Path;

use aac::process::session::{Event, ParserSession};
use aac::process::source::StreamBuffer;
use aac::process::summary::StreamSummary;
use aac::utils::errors::SessionError;
use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::input::InputReader;

const CHUNK_SIZE: usize = 64 * 1024;

/// Result of feeding an input through a session.
pub struct Analysis {
    pub summary: StreamSummary,

    /// Input size, unknown for pipes.
    pub input_len: Option<u64>,
    pub bytes_read: u64,

    /// The session reached the end of the stream.
    pub complete: bool,
}

/// Feeds `input` through `session`, handing every event to `handler` until
/// the stream ends or the handler returns false.
pub fn analyze_stream<F>(
    input: &Path,
    mut session: ParserSession,
    multi: Option<&MultiProgress>,
    mut handler: F,
) -> Result<Analysis>
where
    F: FnMut(&Event, &ParserSession) -> Result<bool>,
{
    let mut input_reader = InputReader::new(input)?;
    let input_len = input_reader.len();

    let mut source = StreamBuffer::with_capacity(2 * CHUNK_SIZE);
    if let Some(len) = input_len {
        source.set_total_len(len);
    }

    let pb = match multi {
        Some(multi) => Some(progress_bar(multi, input_len)?),
        None => None,
    };

    let mut bytes_read = 0u64;

    let consumed = input_reader.process_chunks(CHUNK_SIZE, |chunk| {
        bytes_read += chunk.len() as u64;
        source.push_bytes(chunk);

        if let Some(ref pb) = pb {
            pb.set_position(bytes_read);
        }

        drain(&mut session, &mut source, &mut handler)
    })?;

    if consumed {
        source.mark_end_of_stream();
        drain(&mut session, &mut source, &mut handler)?;
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    Ok(Analysis {
        summary: session.summary(),
        input_len,
        bytes_read,
        complete: session.is_finished(),
    })
}

/// Runs the session until it needs more input. Returns false once it ended
/// or the handler asked to stop.
fn drain<F>(session: &mut ParserSession, source: &mut StreamBuffer, handler: &mut F) -> Result<bool>
where
    F: FnMut(&Event, &ParserSession) -> Result<bool>,
{
    loop {
        match session.next_event(source) {
            Ok(event) => {
                let end = matches!(event, Event::EndOfStream(_));
                if !handler(&event, session)? || end {
                    return Ok(false);
                }
            }
            Err(SessionError::NeedMoreData) => return Ok(true),
            Err(e) => return Err(e.into()),
        }
    }
}

fn progress_bar(multi: &MultiProgress, len: Option<u64>) -> Result<ProgressBar> {
    let pb = match len {
        Some(len) => {
            let pb = multi.add(ProgressBar::new(len));
            pb.set_style(ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?);
            pb
        }
        None => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg} {bytes}")?);
            pb.set_message("Analyzing frames...");
            pb
        }
    };
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    Ok(pb)
}
