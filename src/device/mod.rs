//! Device module - typed commands for specific robots.
//!
//! Provides:
//! - [`BoltPlus`] - LED commands for the Bolt+, showing processor addressing
//! - [`SimulatedDevice`] - in-memory robot that answers every command
//!
//! # Example
//!
//! ```ignore
//! use sphero_link::device::BoltPlus;
//! use sphero_link::session::SessionBuilder;
//! use sphero_link::transport::SimulatedTransport;
//!
//! let session = SessionBuilder::new().start(SimulatedTransport::new(8)).await?;
//! let bolt = BoltPlus::new(session);
//! bolt.set_main_led(10, 20, 30).await?;
//! ```

mod simulated;

use bytes::{BufMut, BytesMut};

use crate::error::Result;
use crate::protocol::Command;
use crate::session::Session;
use crate::transport::Transport;

pub use simulated::{LedState, SimulatedDevice};

/// Processor that drives the front and back LEDs.
pub const PRIMARY_PROCESSOR: u8 = 0x11;

/// Processor that drives the LED matrix.
pub const SECONDARY_PROCESSOR: u8 = 0x12;

/// Source id used when addressing a specific processor.
pub const HOST_SOURCE: u8 = 0x01;

/// `(device_id, command_id)` pairs understood by [`BoltPlus`].
pub mod commands {
    /// Main LED colour: `[r, g, b]`.
    pub const SET_MAIN_LED: (u8, u8) = (0x02, 0x20);
    /// Masked LED colours: `[mask, values..]`.
    pub const SET_LED_MASK: (u8, u8) = (0x1A, 0x1C);
    /// Whole-matrix colour: `[r, g, b]`.
    pub const SET_MATRIX_COLOR: (u8, u8) = (0x1A, 0x2F);
}

/// A Sphero Bolt+ on top of a running [`Session`].
pub struct BoltPlus<T: Transport + 'static> {
    session: Session<T>,
}

impl<T: Transport + 'static> BoltPlus<T> {
    /// Wrap a started session.
    pub fn new(session: Session<T>) -> Self {
        Self { session }
    }

    /// Set the main LED colour. Returns the sequence number used.
    pub async fn set_main_led(&self, r: u8, g: u8, b: u8) -> Result<u8> {
        let (did, cid) = commands::SET_MAIN_LED;
        self.session
            .send(&Command::new(did, cid).payload(&[r, g, b]))
            .await
    }

    /// Set the LEDs selected by `mask` on processor `target`.
    ///
    /// `values` holds one byte per set mask bit, lowest bit first.
    pub async fn set_led_mask(&self, target: u8, mask: u8, values: &[u8]) -> Result<u8> {
        let (did, cid) = commands::SET_LED_MASK;
        let mut payload = BytesMut::with_capacity(1 + values.len());
        payload.put_u8(mask);
        payload.put_slice(values);

        let command = Command::new(did, cid)
            .target(target)
            .source(HOST_SOURCE)
            .payload_bytes(payload.freeze());
        self.session.send(&command).await
    }

    /// Fill the LED matrix with one colour.
    pub async fn set_matrix_color(&self, r: u8, g: u8, b: u8) -> Result<u8> {
        let (did, cid) = commands::SET_MATRIX_COLOR;
        let command = Command::new(did, cid)
            .target(SECONDARY_PROCESSOR)
            .source(HOST_SOURCE)
            .payload(&[r, g, b]);
        self.session.send(&command).await
    }

    /// Underlying session.
    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Unwrap into the underlying session.
    pub fn into_session(self) -> Session<T> {
        self.session
    }
}
