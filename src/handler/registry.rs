//! Handler registry for dispatching inbound packets by `(device_id, command_id)`.
//!
//! Every decoded packet goes to at most one handler: the one registered for
//! its key, or else the fallback. Handlers run inline in the session's read
//! loop, one at a time, in extraction order.
//!
//! # Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use sphero_link::handler::{ResponseContext, ResponseRegistry};
//!
//! let mut registry = ResponseRegistry::new();
//!
//! registry.register((0x13, 0x0D), |data: Bytes, ctx: ResponseContext| async move {
//!     tracing::info!("battery packet SEQ={} {:?}", ctx.sequence(), data);
//!     Ok(())
//! });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use bytes::Bytes;

use super::ResponseContext;
use crate::error::Result;
use crate::protocol::Response;
use crate::session::ResponseEvent;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Conversion from a decoded packet into a handler argument.
///
/// Returning `None` skips the handler for that packet.
pub trait FromResponse: Sized + Send + 'static {
    /// Extract the argument.
    fn from_response(response: &Response) -> Option<Self>;
}

impl FromResponse for Response {
    fn from_response(response: &Response) -> Option<Self> {
        Some(response.clone())
    }
}

impl FromResponse for Bytes {
    fn from_response(response: &Response) -> Option<Self> {
        Some(response.data.clone())
    }
}

impl FromResponse for Vec<u8> {
    fn from_response(response: &Response) -> Option<Self> {
        Some(response.data.to_vec())
    }
}

impl FromResponse for () {
    fn from_response(_response: &Response) -> Option<Self> {
        Some(())
    }
}

/// Fixed-size payload, e.g. `[u8; 3]` for a colour. Extra bytes are ignored.
impl<const N: usize> FromResponse for [u8; N] {
    fn from_response(response: &Response) -> Option<Self> {
        response.data.get(..N)?.try_into().ok()
    }
}

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Handle one dispatched packet.
    fn call(&self, event: &ResponseEvent) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that extracts the argument before calling the handler.
pub struct TypedHandler<F, T, Fut>
where
    F: Fn(T, ResponseContext) -> Fut + Send + Sync + 'static,
    T: FromResponse,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<F, T, Fut> TypedHandler<F, T, Fut>
where
    F: Fn(T, ResponseContext) -> Fut + Send + Sync + 'static,
    T: FromResponse,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, Fut> Handler for TypedHandler<F, T, Fut>
where
    F: Fn(T, ResponseContext) -> Fut + Send + Sync + 'static,
    T: FromResponse,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, event: &ResponseEvent) -> BoxFuture<'static, HandlerResult> {
        let Some(arg) = T::from_response(&event.response) else {
            tracing::warn!(
                "Payload for {:#04x}/{:#04x} does not fit handler argument: {} bytes",
                event.response.device_id,
                event.response.command_id,
                event.response.data.len()
            );
            return Box::pin(async { Ok(()) });
        };

        let ctx = ResponseContext::from_event(event);
        Box::pin((self.handler)(arg, ctx))
    }
}

/// Registry mapping `(device_id, command_id)` to handlers.
#[derive(Default)]
pub struct ResponseRegistry {
    handlers: HashMap<(u8, u8), Box<dyn Handler>>,
    fallback: Option<Box<dyn Handler>>,
}

impl ResponseRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one `(device_id, command_id)` pair.
    ///
    /// Replaces any handler already registered for the same pair.
    pub fn register<F, T, Fut>(&mut self, key: (u8, u8), handler: F)
    where
        F: Fn(T, ResponseContext) -> Fut + Send + Sync + 'static,
        T: FromResponse,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if self
            .handlers
            .insert(key, Box::new(TypedHandler::new(handler)))
            .is_some()
        {
            tracing::debug!("Replaced handler for {:#04x}/{:#04x}", key.0, key.1);
        }
    }

    /// Register the handler for packets no keyed handler claims.
    pub fn register_fallback<F, T, Fut>(&mut self, handler: F)
    where
        F: Fn(T, ResponseContext) -> Fut + Send + Sync + 'static,
        T: FromResponse,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.fallback = Some(Box::new(TypedHandler::new(handler)));
    }

    /// Get the handler for a key.
    pub fn get_handler(&self, key: (u8, u8)) -> Option<&dyn Handler> {
        self.handlers.get(&key).map(|h| h.as_ref())
    }

    /// Check if a keyed handler exists.
    pub fn contains(&self, key: (u8, u8)) -> bool {
        self.handlers.contains_key(&key)
    }

    /// Number of keyed handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handlers (keyed or fallback) are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.fallback.is_none()
    }

    /// Run the handler for an event.
    ///
    /// Returns `Ok(false)` if neither a keyed nor a fallback handler exists.
    pub async fn dispatch(&self, event: &ResponseEvent) -> Result<bool> {
        let handler = match self.get_handler(event.response.key()) {
            Some(h) => h,
            None => match &self.fallback {
                Some(h) => h.as_ref(),
                None => return Ok(false),
            },
        };

        handler.call(event).await?;
        Ok(true)
    }
}
