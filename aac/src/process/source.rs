//! The byte window a [`ParserSession`](super::session::ParserSession) reads from.

/// A buffered, forward-only view of the input stream.
///
/// The session only ever looks at [`window`](ByteSource::window) and releases
/// bytes with [`advance`](ByteSource::advance). Knowing the total length lets
/// the synchronizer accept a frame that ends exactly at the end of the stream.
pub trait ByteSource {
    /// The buffered bytes that have not been consumed yet.
    fn window(&self) -> &[u8];

    /// Releases the first `n` bytes of the window.
    fn advance(&mut self, n: usize);

    /// Stream offset of the first byte of the window.
    fn position(&self) -> u64;

    /// Total stream length, when known.
    fn total_len(&self) -> Option<u64>;

    fn bytes_available(&self) -> usize {
        self.window().len()
    }

    /// Whether the window reaches the end of the stream.
    fn is_end_of_stream(&self) -> bool {
        self.total_len()
            .is_some_and(|total| self.position() + self.bytes_available() as u64 >= total)
    }
}

/// A growable [`ByteSource`] fed with [`push_bytes`](StreamBuffer::push_bytes).
#[derive(Debug, Default)]
pub struct StreamBuffer {
    buffer: Vec<u8>,
    consumed: usize,
    position: u64,
    total_len: Option<u64>,
}

impl StreamBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Appends input. Consumed bytes are dropped first.
    pub fn push_bytes(&mut self, data: &[u8]) {
        if self.consumed > 0 {
            self.buffer.drain(..self.consumed);
            self.consumed = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Declares the total stream length, e.g. the file size.
    pub fn set_total_len(&mut self, total_len: u64) {
        self.total_len = Some(total_len);
    }

    /// Declares that no more bytes will be pushed.
    pub fn mark_end_of_stream(&mut self) {
        self.total_len = Some(self.position + self.bytes_available() as u64);
    }

    pub fn clear(&mut self) {
        self.position += self.bytes_available() as u64;
        self.buffer.clear();
        self.consumed = 0;
    }
}

impl ByteSource for StreamBuffer {
    fn window(&self) -> &[u8] {
        &self.buffer[self.consumed..]
    }

    fn advance(&mut self, n: usize) {
        let n = n.min(self.bytes_available());
        self.consumed += n;
        self.position += n as u64;
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn total_len(&self) -> Option<u64> {
        self.total_len
    }
}

#[test]
fn stream_buffer_tracks_position() {
    let mut buffer = StreamBuffer::default();
    buffer.push_bytes(&[1, 2, 3, 4]);
    buffer.advance(3);
    assert_eq!(buffer.window(), &[4]);
    assert_eq!(buffer.position(), 3);
    assert!(!buffer.is_end_of_stream());

    buffer.push_bytes(&[5, 6]);
    assert_eq!(buffer.window(), &[4, 5, 6]);
    assert_eq!(buffer.position(), 3);

    buffer.mark_end_of_stream();
    assert_eq!(buffer.total_len(), Some(6));
    assert!(buffer.is_end_of_stream());

    buffer.advance(10);
    assert_eq!(buffer.bytes_available(), 0);
    assert_eq!(buffer.position(), 6);
}
