//! Frame buffer for reassembling frames from arbitrary transport chunks.
//!
//! Uses `bytes::BytesMut` as the rolling buffer. Each `push` appends the
//! chunk and then repeatedly:
//! - drops everything before the first `START` (noise)
//! - waits if no `END` follows yet
//! - cuts out `START ..= END`, unescapes, verifies the checksum
//!
//! Bad candidates are discarded and scanning resumes at the next `START`.
//! Nothing here ever fails; callers only see valid bodies.
//!
//! # Example
//!
//! ```
//! use sphero_link::protocol::{encode_command, FrameBuffer};
//!
//! let frame = encode_command(0x02, 0x20, 0, &[10, 20, 30], None, None);
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(&frame[..4]).is_empty());
//! let bodies = buffer.push(&frame[4..]);
//! assert_eq!(&bodies[0][..], &[0x0A, 0x02, 0x20, 0x00, 0x0A, 0x14, 0x1E]);
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{unescape, verify, END, START};

/// Default initial capacity; a few BLE notifications' worth.
pub const DEFAULT_CAPACITY: usize = 256;

/// Counters for discarded input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Valid bodies emitted.
    pub frames: u64,
    /// Bytes dropped while searching for a start marker.
    pub noise_bytes: u64,
    /// Candidates shorter than one byte plus checksum.
    pub malformed: u64,
    /// Candidates whose checksum did not match.
    pub bad_checksum: u64,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Bytes not yet resolved into a frame.
    buffer: BytesMut,
    /// Discard counters.
    stats: AssemblerStats,
}

impl FrameBuffer {
    /// Create a new frame buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new frame buffer with custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            stats: AssemblerStats::default(),
        }
    }

    /// Push data into the buffer and extract all complete, valid frame bodies.
    ///
    /// Returned bodies run from the flags byte through the last payload
    /// byte; the checksum is already verified and stripped. Partial frames
    /// stay buffered for the next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut bodies = Vec::new();
        while let Some(candidate) = self.next_candidate() {
            if let Some(body) = self.validate(&candidate) {
                bodies.push(body);
            }
        }
        bodies
    }

    /// Cut the next `START .. END` region out of the buffer.
    ///
    /// Returns the still-escaped bytes strictly between the markers, or
    /// `None` when no complete candidate is buffered.
    fn next_candidate(&mut self) -> Option<Bytes> {
        let Some(start) = self.buffer.iter().position(|&b| b == START) else {
            if !self.buffer.is_empty() {
                tracing::trace!("Dropping {} bytes of noise", self.buffer.len());
                self.stats.noise_bytes += self.buffer.len() as u64;
                self.buffer.clear();
            }
            return None;
        };

        if start > 0 {
            tracing::trace!("Skipping {} bytes before start marker", start);
            self.stats.noise_bytes += start as u64;
            let _ = self.buffer.split_to(start);
        }

        // Wait for more data; the start marker stays buffered
        let end = self.buffer[1..].iter().position(|&b| b == END)? + 1;

        let mut region = self.buffer.split_to(end + 1);
        let inner = region.split_off(1);
        Some(inner.freeze().slice(..end - 1))
    }

    /// Unescape and checksum-check one candidate.
    fn validate(&mut self, escaped: &[u8]) -> Option<Bytes> {
        let mut unescaped = unescape(escaped);

        if unescaped.len() < 2 {
            tracing::debug!("Discarding malformed frame ({} bytes)", unescaped.len());
            self.stats.malformed += 1;
            return None;
        }

        if !verify(&unescaped) {
            tracing::debug!("Discarding frame with bad checksum");
            self.stats.bad_checksum += 1;
            return None;
        }

        unescaped.pop();
        self.stats.frames += 1;
        Some(Bytes::from(unescaped))
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard buffered bytes. Counters are kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Discard counters since creation.
    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
