//! Protocol module - wire format, framing, and packet types.
//!
//! This module implements the byte-level protocol:
//! - Escaping, checksum and marker constants
//! - Command encoding into complete frames
//! - Frame buffer for reassembling fragmented notifications
//! - Response decoding with typed accessors

mod frame;
mod frame_buffer;
mod response;
mod wire_format;

pub use frame::{build_body, command_flags, encode_command, seal, Command};
pub use frame_buffer::{AssemblerStats, FrameBuffer, DEFAULT_CAPACITY};
pub use response::{Response, STATUS_SUCCESS};
pub use wire_format::{
    checksum, escape, escape_into, flags, is_reserved, unescape, verify, HexBytes, END, ESCAPE,
    ESCAPE_MASK, START,
};
