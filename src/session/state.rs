//! Transport-free protocol state.
//!
//! [`ProtocolState`] owns the sequence counter, the pending table and the
//! frame buffer. It is plain synchronous code so it can be driven directly
//! in tests; [`Session`](super::Session) wraps it with a transport.

use bytes::Bytes;

use super::pending::{PendingRequest, PendingTable, SequenceCounter};
use crate::protocol::{Command, FrameBuffer, HexBytes, Response};

/// A frame ready for the transport, with the sequence it was assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Sequence number used in the frame.
    pub sequence: u8,
    /// Complete wire frame.
    pub frame: Bytes,
}

/// A decoded inbound packet, with the request it resolved (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEvent {
    /// Decoded packet.
    pub response: Response,
    /// The pending request this packet resolved; `None` for unsolicited
    /// notifications, stale or already-resolved sequence numbers.
    pub request: Option<PendingRequest>,
}

impl ResponseEvent {
    /// Check if no pending request matched.
    #[inline]
    pub fn is_unsolicited(&self) -> bool {
        self.request.is_none()
    }

    /// Sequence number carried by the packet.
    #[inline]
    pub fn sequence(&self) -> u8 {
        self.response.sequence
    }
}

/// Sequence assignment, request tracking and stream reassembly.
#[derive(Debug, Default)]
pub struct ProtocolState {
    counter: SequenceCounter,
    pending: PendingTable,
    buffer: FrameBuffer,
}

impl ProtocolState {
    /// Create fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state with a custom frame buffer capacity.
    pub fn with_buffer_capacity(capacity: usize) -> Self {
        Self {
            counter: SequenceCounter::new(),
            pending: PendingTable::new(),
            buffer: FrameBuffer::with_capacity(capacity),
        }
    }

    /// Assign a sequence number, encode the command and record it as pending.
    pub fn prepare(&mut self, command: &Command) -> Outbound {
        let sequence = self.counter.next();
        let frame = command.encode(sequence);

        let request = PendingRequest::new(command.device_id, command.command_id);
        if let Some(old) = self.pending.insert(sequence, request) {
            tracing::warn!(
                "Sequence {} reused before response to {:#04x}/{:#04x}; entry replaced",
                sequence,
                old.device_id,
                old.command_id
            );
        }

        Outbound { sequence, frame }
    }

    /// Feed a raw transport chunk and resolve every complete packet in it.
    ///
    /// Events come out in the order their frames were extracted.
    pub fn on_receive(&mut self, chunk: &[u8]) -> Vec<ResponseEvent> {
        let mut events = Vec::new();

        for body in self.buffer.push(chunk) {
            let Some(response) = Response::decode(&body) else {
                tracing::debug!("Dropping undecodable body: {}", HexBytes(&body));
                continue;
            };

            let request = self.pending.resolve(response.sequence);
            match request {
                Some(req) => tracing::debug!(
                    "Response: SEQ={} code={:?} for {:#04x}/{:#04x}",
                    response.sequence,
                    response.status,
                    req.device_id,
                    req.command_id
                ),
                None => tracing::debug!(
                    "Unsolicited packet: SEQ={} {:#04x}/{:#04x}",
                    response.sequence,
                    response.device_id,
                    response.command_id
                ),
            }

            events.push(ResponseEvent { response, request });
        }

        events
    }

    /// Clear buffered bytes and outstanding requests; restart sequencing.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending.clear();
        self.counter.reset();
    }

    /// Outstanding requests.
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Frame buffer (for stats and diagnostics).
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Sequence number the next command will get.
    pub fn next_sequence(&self) -> u8 {
        self.counter.peek()
    }
}
