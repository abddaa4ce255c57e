//! Decoding of validated frame bodies into responses.
//!
//! Input is what [`FrameBuffer`](super::FrameBuffer) emits: unescaped,
//! checksum already verified and stripped.

use bytes::Bytes;

use super::wire_format::flags;

/// Status code the robot uses for success.
pub const STATUS_SUCCESS: u8 = 0x00;

/// A decoded inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Raw flags byte.
    pub flags: u8,
    /// Processor the packet is addressed to, if flagged.
    pub target_id: Option<u8>,
    /// Processor the packet came from, if flagged.
    pub source_id: Option<u8>,
    /// Subsystem.
    pub device_id: u8,
    /// Operation within the subsystem.
    pub command_id: u8,
    /// Correlation token echoed from the command.
    pub sequence: u8,
    /// Status byte, present only on responses.
    pub status: Option<u8>,
    /// Remaining payload bytes.
    pub data: Bytes,
}

impl Response {
    /// Decode a body (flags through payload).
    ///
    /// Returns `None` if the body is too short for the fields its own flags
    /// announce.
    ///
    /// # Example
    ///
    /// ```
    /// use sphero_link::protocol::Response;
    ///
    /// let rsp = Response::decode(&[0x09, 0x02, 0x20, 0x05, 0x00]).unwrap();
    /// assert_eq!(rsp.sequence, 5);
    /// assert!(rsp.is_success());
    /// assert!(Response::decode(&[0x09, 0x02]).is_none());
    /// ```
    pub fn decode(body: &[u8]) -> Option<Self> {
        let (&f, mut rest) = body.split_first()?;

        let target_id = if flags::has_flag(f, flags::HAS_TARGET_ID) {
            let (&tid, tail) = rest.split_first()?;
            rest = tail;
            Some(tid)
        } else {
            None
        };

        let source_id = if flags::has_flag(f, flags::HAS_SOURCE_ID) {
            let (&sid, tail) = rest.split_first()?;
            rest = tail;
            Some(sid)
        } else {
            None
        };

        if rest.len() < 3 {
            return None;
        }
        let (device_id, command_id, sequence) = (rest[0], rest[1], rest[2]);
        rest = &rest[3..];

        let status = if flags::has_flag(f, flags::IS_RESPONSE) {
            let (&code, tail) = rest.split_first()?;
            rest = tail;
            Some(code)
        } else {
            None
        };

        Some(Self {
            flags: f,
            target_id,
            source_id,
            device_id,
            command_id,
            sequence,
            status,
            data: Bytes::copy_from_slice(rest),
        })
    }

    /// `(device_id, command_id)` pair.
    #[inline]
    pub fn key(&self) -> (u8, u8) {
        (self.device_id, self.command_id)
    }

    /// Check if this packet is a response (as opposed to an async notification).
    #[inline]
    pub fn is_response(&self) -> bool {
        flags::has_flag(self.flags, flags::IS_RESPONSE)
    }

    /// Check if the robot reported success.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == Some(STATUS_SUCCESS)
    }

    /// Check if the robot reported an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self.status, Some(code) if code != STATUS_SUCCESS)
    }

    /// Check if the sender asked for a reply.
    #[inline]
    pub fn requests_response(&self) -> bool {
        flags::has_flag(self.flags, flags::REQUESTS_RESPONSE)
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
