//! Handler module - per-command callbacks for inbound packets.
//!
//! Provides:
//! - [`ResponseRegistry`] - maps `(device_id, command_id)` to handlers
//! - [`ResponseContext`] - sequence, status and addressing of the packet
//!
//! # Example
//!
//! ```ignore
//! use sphero_link::session::SessionBuilder;
//!
//! let session = SessionBuilder::new()
//!     .handle((0x02, 0x20), |_: (), ctx| async move {
//!         tracing::info!("main LED acknowledged, status {:?}", ctx.status());
//!         Ok(())
//!     })
//!     .start(transport)
//!     .await?;
//! ```

mod context;
mod registry;

pub use context::ResponseContext;
pub use registry::{
    BoxFuture, FromResponse, Handler, HandlerResult, ResponseRegistry, TypedHandler,
};
