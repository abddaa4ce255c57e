//! Session module - sequence numbers, request correlation and the runtime.
//!
//! Provides:
//! - [`ProtocolState`] - synchronous core: counter, pending table, frame buffer
//! - [`Session`] / [`SessionBuilder`] - async wrapper around a [`Transport`](crate::transport::Transport)
//! - [`ResponseEvent`] - a decoded packet plus the request it resolved
//!
//! Sequence numbers run 0..=254 and wrap. An unanswered request whose
//! number comes around again is replaced; the first reply carrying that
//! number resolves the newer command.

mod client;
mod pending;
mod state;

pub use client::{Session, SessionBuilder};
pub use pending::{PendingRequest, PendingTable, SequenceCounter, SEQUENCE_SPACE};
pub use state::{Outbound, ProtocolState, ResponseEvent};
