//! Outbound command encoding.
//!
//! A [`Command`] is the unencoded request; [`Command::encode`] turns it into
//! a complete wire frame once the session has picked a sequence number.
//!
//! # Example
//!
//! ```
//! use sphero_link::protocol::Command;
//!
//! let frame = Command::new(0x02, 0x20).payload(&[10, 20, 30]).encode(0);
//! assert_eq!(
//!     &frame[..],
//!     &[0x8D, 0x0A, 0x02, 0x20, 0x00, 0x0A, 0x14, 0x1E, 0x97, 0xD8]
//! );
//! ```

use bytes::Bytes;

use super::wire_format::{checksum, escape_into, flags, END, START};

/// Unencoded command addressed to one device subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Addressed subsystem.
    pub device_id: u8,
    /// Operation within the subsystem.
    pub command_id: u8,
    /// Processor to route to on multi-processor robots.
    pub target_id: Option<u8>,
    /// Logical sender.
    pub source_id: Option<u8>,
    /// Command arguments.
    pub payload: Bytes,
}

impl Command {
    /// Create a command with no payload and no addressing.
    pub fn new(device_id: u8, command_id: u8) -> Self {
        Self {
            device_id,
            command_id,
            target_id: None,
            source_id: None,
            payload: Bytes::new(),
        }
    }

    /// Set the payload (copies data).
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = Bytes::copy_from_slice(payload);
        self
    }

    /// Set the payload without copying.
    pub fn payload_bytes(mut self, payload: Bytes) -> Self {
        self.payload = payload;
        self
    }

    /// Route to a specific processor.
    pub fn target(mut self, target_id: u8) -> Self {
        self.target_id = Some(target_id);
        self
    }

    /// Send on behalf of a specific logical sender.
    pub fn source(mut self, source_id: u8) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// `(device_id, command_id)` pair.
    #[inline]
    pub fn key(&self) -> (u8, u8) {
        (self.device_id, self.command_id)
    }

    /// Flags byte this command will be sent with.
    pub fn flags(&self) -> u8 {
        command_flags(self.target_id, self.source_id)
    }

    /// Encode into a complete frame using the given sequence number.
    pub fn encode(&self, sequence: u8) -> Bytes {
        encode_command(
            self.device_id,
            self.command_id,
            sequence,
            &self.payload,
            self.target_id,
            self.source_id,
        )
    }
}

/// Flags for an outbound command with the given addressing.
#[inline]
pub fn command_flags(target_id: Option<u8>, source_id: Option<u8>) -> u8 {
    let mut f = flags::COMMAND;
    if target_id.is_some() {
        f |= flags::HAS_TARGET_ID;
    }
    if source_id.is_some() {
        f |= flags::HAS_SOURCE_ID;
    }
    f
}

/// Build the unescaped body (without checksum) for a command.
pub fn build_body(
    device_id: u8,
    command_id: u8,
    sequence: u8,
    payload: &[u8],
    target_id: Option<u8>,
    source_id: Option<u8>,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(7 + payload.len());
    body.push(command_flags(target_id, source_id));
    body.extend(target_id);
    body.extend(source_id);
    body.extend_from_slice(&[device_id, command_id, sequence]);
    body.extend_from_slice(payload);
    body
}

/// Wrap an unescaped body: append checksum, escape, add markers.
pub fn seal(body: &[u8]) -> Bytes {
    let chk = checksum(body);

    let mut out = Vec::with_capacity(body.len() + body.len() / 8 + 4);
    out.push(START);
    escape_into(body, &mut out);
    escape_into(&[chk], &mut out);
    out.push(END);
    Bytes::from(out)
}

/// Encode a command into a complete wire frame.
///
/// Pure and infallible; every byte value is valid for every field.
pub fn encode_command(
    device_id: u8,
    command_id: u8,
    sequence: u8,
    payload: &[u8],
    target_id: Option<u8>,
    source_id: Option<u8>,
) -> Bytes {
    seal(&build_body(
        device_id, command_id, sequence, payload, target_id, source_id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::{unescape, verify, ESCAPE};

    #[test]
    fn test_encode_main_led_exact_bytes() {
        let frame = encode_command(0x02, 0x20, 0, &[10, 20, 30], None, None);
        assert_eq!(
            &frame[..],
            &[0x8D, 0x0A, 0x02, 0x20, 0x00, 0x0A, 0x14, 0x1E, 0x97, 0xD8]
        );
    }

    #[test]
    fn test_flags_with_addressing() {
        assert_eq!(Command::new(1, 1).flags(), 0x0A);
        assert_eq!(Command::new(1, 1).target(0x11).flags(), 0x1A);
        assert_eq!(Command::new(1, 1).source(0x01).flags(), 0x2A);
        assert_eq!(Command::new(1, 1).target(0x11).source(0x01).flags(), 0x3A);
    }

    #[test]
    fn test_body_field_order() {
        let body = build_body(0x1A, 0x2F, 7, &[0, 255, 0], Some(0x12), Some(0x01));
        assert_eq!(body, vec![0x3A, 0x12, 0x01, 0x1A, 0x2F, 7, 0, 255, 0]);
    }

    #[test]
    fn test_source_only_follows_flags() {
        let body = build_body(0x1A, 0x1C, 3, &[], None, Some(0x01));
        assert_eq!(body, vec![0x2A, 0x01, 0x1A, 0x1C, 3]);
    }

    #[test]
    fn test_reserved_payload_bytes_escaped() {
        let frame = Command::new(0x1A, 0x1C).payload(&[0x8D, 0xD8, 0xAB]).encode(1);

        // Only the outer markers may be raw markers
        let inner = &frame[1..frame.len() - 1];
        assert!(!inner.contains(&START));
        assert!(!inner.contains(&END));
        assert!(inner.contains(&ESCAPE));

        let body = unescape(inner);
        assert!(verify(&body));
        assert_eq!(&body[4..7], &[0x8D, 0xD8, 0xAB]);
    }

    #[test]
    fn test_checksum_that_needs_escaping() {
        // Pick a sequence so that the checksum byte itself is a marker
        let body = build_body(0x02, 0x20, 0, &[], None, None);
        let base = checksum(&body);
        let seq = base.wrapping_sub(END);
        let frame = encode_command(0x02, 0x20, seq, &[], None, None);

        let inner = &frame[1..frame.len() - 1];
        assert!(!inner.contains(&END));
        let unescaped = unescape(inner);
        assert_eq!(*unescaped.last().unwrap(), END);
        assert!(verify(&unescaped));
    }

    #[test]
    fn test_command_encode_matches_free_function() {
        let cmd = Command::new(0x1A, 0x1C)
            .target(0x11)
            .source(0x01)
            .payload(&[0x3F, 255, 0, 0, 255, 0, 0]);
        assert_eq!(
            cmd.encode(9),
            encode_command(0x1A, 0x1C, 9, &cmd.payload, Some(0x11), Some(0x01))
        );
        assert_eq!(cmd.key(), (0x1A, 0x1C));
    }
}
