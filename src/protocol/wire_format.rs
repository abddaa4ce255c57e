//! Wire format constants, byte escaping and checksum.
//!
//! A frame on the wire looks like:
//! ```text
//! ┌───────┬──────────────────────────────────────────────────┬─────┐
//! │ START │ escape(flags [tid] [sid] did cid seq data.. chk) │ END │
//! │ 0x8D  │ variable                                         │0xD8 │
//! └───────┴──────────────────────────────────────────────────┴─────┘
//! ```
//!
//! Any body byte equal to `START`, `END` or `ESCAPE` is replaced by
//! `ESCAPE, byte & !ESCAPE_MASK`. The values below must match the robot
//! firmware exactly; treat them as a versioned table, not configuration.

/// Start-of-packet marker.
pub const START: u8 = 0x8D;

/// End-of-packet marker.
pub const END: u8 = 0xD8;

/// Escape marker.
pub const ESCAPE: u8 = 0xAB;

/// Bits cleared when escaping and restored when unescaping.
pub const ESCAPE_MASK: u8 = 0x88;

/// Flag bits carried in the first body byte.
pub mod flags {
    /// Packet is a response to an earlier command.
    pub const IS_RESPONSE: u8 = 0b0000_0001;
    /// Sender wants a response.
    pub const REQUESTS_RESPONSE: u8 = 0b0000_0010;
    /// Sender wants a response only on error.
    pub const REQUESTS_ERROR_RESPONSE: u8 = 0b0000_0100;
    /// Command resets the robot's inactivity timer.
    pub const IS_ACTIVITY: u8 = 0b0000_1000;
    /// A target id byte follows the flags.
    pub const HAS_TARGET_ID: u8 = 0b0001_0000;
    /// A source id byte follows the flags (after the target id, if any).
    pub const HAS_SOURCE_ID: u8 = 0b0010_0000;

    /// Flags always set on outbound commands: 0x0A
    pub const COMMAND: u8 = REQUESTS_RESPONSE | IS_ACTIVITY;

    /// Flags used by the simulated robot for replies: 0x09
    pub const ACTIVITY_RESPONSE: u8 = IS_RESPONSE | IS_ACTIVITY;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

/// Returns true for the three byte values that must never appear raw in a body.
#[inline]
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, START | END | ESCAPE)
}

/// Escape reserved bytes so the output contains no `START`/`END` bytes.
///
/// # Example
///
/// ```
/// use sphero_link::protocol::escape;
///
/// assert_eq!(escape(&[0x01, 0x8D, 0xD8, 0xAB]), vec![0x01, 0xAB, 0x05, 0xAB, 0x50, 0xAB, 0x23]);
/// ```
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8);
    escape_into(data, &mut out);
    out
}

/// Escape into an existing buffer.
pub fn escape_into(data: &[u8], out: &mut Vec<u8>) {
    for &byte in data {
        if is_reserved(byte) {
            out.push(ESCAPE);
            out.push(byte & !ESCAPE_MASK);
        } else {
            out.push(byte);
        }
    }
}

/// Reverse [`escape`].
///
/// A lone `ESCAPE` as the very last byte is copied through unchanged; the
/// checksum check downstream rejects such a frame.
pub fn unescape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == ESCAPE && i + 1 < data.len() {
            out.push(data[i + 1] | ESCAPE_MASK);
            i += 2;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

/// Checksum over an unescaped body: `0xFF - (sum mod 256)`.
///
/// Detects any single-byte change but not reorderings or compensating
/// errors; it is an integrity check, not authentication.
#[inline]
pub fn checksum(body: &[u8]) -> u8 {
    let sum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    0xFF - sum
}

/// Verify a body whose last byte is its checksum.
pub fn verify(body_with_checksum: &[u8]) -> bool {
    match body_with_checksum.split_last() {
        Some((&chk, body)) => checksum(body) == chk,
        None => false,
    }
}

/// Displays bytes as upper-case hex pairs: `8D 0A 02`.
pub struct HexBytes<'a>(pub &'a [u8]);

impl std::fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}
