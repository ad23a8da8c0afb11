use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Byte input for the analyzers. `-` reads standard input.
pub struct InputReader {
    reader: Box<dyn Read>,
    len: Option<u64>,
}

impl InputReader {
    pub fn new(path: &Path) -> Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self {
                reader: Box::new(io::stdin().lock()),
                len: None,
            });
        }

        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let len = file.metadata().ok().map(|metadata| metadata.len());

        Ok(Self {
            reader: Box::new(BufReader::new(file)),
            len,
        })
    }

    /// Total input size, unknown for pipes
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    /// Feeds the input to `callback` in chunks of at most `chunk_size` bytes
    /// until end of input or until the callback returns `false`.
    ///
    /// Returns `true` when the whole input was consumed.
    pub fn process_chunks<F>(&mut self, chunk_size: usize, mut callback: F) -> Result<bool>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let mut buffer = vec![0u8; chunk_size];

        loop {
            let n = match self.reader.read(&mut buffer) {
                Ok(0) => return Ok(true),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if !callback(&buffer[..n])? {
                return Ok(false);
            }
        }
    }
}
