//! Transport module - the byte pipe underneath the protocol.
//!
//! The session only needs four things from a transport: connect,
//! disconnect, write a frame, and deliver raw inbound chunks. Inbound chunks
//! go through an mpsc channel registered with [`Transport::set_receiver`];
//! chunk boundaries are arbitrary and not frame-aligned.
//!
//! Provides:
//! - [`Transport`] / [`Discovery`] traits
//! - [`StreamTransport`] over any tokio byte stream (serial bridge, socket, duplex)
//! - [`SimulatedTransport`] / [`SimulatedDiscovery`] for tests and demos

mod simulated;
mod stream;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

pub use simulated::{
    chunk_bytes, SimulatedDiscovery, SimulatedProbe, SimulatedTransport, DEFAULT_MTU,
};
pub use stream::StreamTransport;

/// Byte-stream connection to one robot.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection and start delivering notifications.
    async fn connect(&mut self) -> Result<()>;

    /// Close the connection.
    async fn disconnect(&mut self) -> Result<()>;

    /// Write one complete frame. May split it according to the link MTU.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Register the channel raw inbound chunks are sent to.
    ///
    /// Replaces any previously registered channel.
    fn set_receiver(&mut self, tx: mpsc::Sender<Bytes>);

    /// Check if the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Locates a robot by advertised name.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Return the address of the first device whose name contains
    /// `name_filter`, or [`LinkError::DeviceNotFound`](crate::LinkError::DeviceNotFound)
    /// after `timeout`.
    async fn discover(&self, name_filter: &str, timeout: Duration) -> Result<String>;
}
