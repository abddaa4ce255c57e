//! Per-packet context passed to response handlers.

use crate::protocol::Response;
use crate::session::{PendingRequest, ResponseEvent};

/// Correlation and addressing details of the packet a handler is called for.
///
/// The payload itself is decoded into the handler's argument; everything
/// else about the packet is available here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    sequence: u8,
    flags: u8,
    status: Option<u8>,
    target_id: Option<u8>,
    source_id: Option<u8>,
    request: Option<PendingRequest>,
}

impl ResponseContext {
    /// Build a context from a dispatched event.
    pub fn from_event(event: &ResponseEvent) -> Self {
        let rsp: &Response = &event.response;
        Self {
            sequence: rsp.sequence,
            flags: rsp.flags,
            status: rsp.status,
            target_id: rsp.target_id,
            source_id: rsp.source_id,
            request: event.request,
        }
    }

    /// Sequence number carried by the packet.
    #[inline]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Raw flags byte.
    #[inline]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Status byte, if the packet is a response.
    #[inline]
    pub fn status(&self) -> Option<u8> {
        self.status
    }

    /// Processor the packet is addressed to.
    #[inline]
    pub fn target_id(&self) -> Option<u8> {
        self.target_id
    }

    /// Processor the packet came from.
    #[inline]
    pub fn source_id(&self) -> Option<u8> {
        self.source_id
    }

    /// The request this packet resolved, if any.
    #[inline]
    pub fn request(&self) -> Option<PendingRequest> {
        self.request
    }

    /// Check if no pending request matched.
    #[inline]
    pub fn is_unsolicited(&self) -> bool {
        self.request.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_from_event() {
        let event = ResponseEvent {
            response: Response {
                flags: 0x39,
                target_id: Some(0x01),
                source_id: Some(0x12),
                device_id: 0x1A,
                command_id: 0x2F,
                sequence: 9,
                status: Some(0),
                data: Bytes::new(),
            },
            request: Some(PendingRequest::new(0x1A, 0x2F)),
        };

        let ctx = ResponseContext::from_event(&event);

        assert_eq!(ctx.sequence(), 9);
        assert_eq!(ctx.flags(), 0x39);
        assert_eq!(ctx.status(), Some(0));
        assert_eq!(ctx.target_id(), Some(0x01));
        assert_eq!(ctx.source_id(), Some(0x12));
        assert!(!ctx.is_unsolicited());
    }
}
