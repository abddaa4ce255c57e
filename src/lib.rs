//! # sphero-link
//!
//! Framing and command/response protocol for Sphero V2 robots.
//!
//! The robot speaks a small packet protocol over a BLE characteristic whose
//! writes and notifications arrive in arbitrary fragments. This crate
//! handles both directions:
//!
//! - **Outbound**: commands are assigned a sequence number, encoded into
//!   `START | escape(body + checksum) | END` frames and written in order.
//! - **Inbound**: raw chunks are reassembled, checksum-verified, decoded and
//!   matched back to the command they answer.
//!
//! ## Example
//!
//! ```ignore
//! use sphero_link::device::BoltPlus;
//! use sphero_link::session::SessionBuilder;
//! use sphero_link::transport::SimulatedTransport;
//!
//! #[tokio::main]
//! async fn main() -> sphero_link::Result<()> {
//!     let session = SessionBuilder::new()
//!         .start(SimulatedTransport::new(8))
//!         .await?;
//!
//!     let bolt = BoltPlus::new(session);
//!     bolt.set_main_led(10, 20, 30).await?;
//!
//!     let event = bolt.session().next_event().await;
//!     println!("{:?}", event);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::{LinkConfig, SessionConfig};
pub use error::{LinkError, Result};
pub use protocol::{Command, Response};
pub use session::{ResponseEvent, Session, SessionBuilder};
pub use transport::{Discovery, Transport};
