//! Session builder and runtime loop.
//!
//! The [`SessionBuilder`] provides a fluent API for configuring capacities
//! and handlers. The [`Session`] manages the lifecycle:
//! 1. Register the inbound channel with the transport
//! 2. Connect the transport
//! 3. Spawn the read loop (reassemble, resolve, dispatch, forward)
//! 4. Serialize sends so sequence order equals wire order
//!
//! # Example
//!
//! ```ignore
//! use sphero_link::protocol::Command;
//! use sphero_link::session::SessionBuilder;
//! use sphero_link::transport::SimulatedTransport;
//!
//! #[tokio::main]
//! async fn main() -> sphero_link::Result<()> {
//!     let session = SessionBuilder::new()
//!         .event_capacity(16)
//!         .start(SimulatedTransport::new(8))
//!         .await?;
//!
//!     let seq = session.send(&Command::new(0x02, 0x20).payload(&[10, 20, 30])).await?;
//!     let event = session.next_event().await;
//!     assert_eq!(event.map(|e| e.sequence()), Some(seq));
//!
//!     session.close().await
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use super::state::{ProtocolState, ResponseEvent};
use crate::config::SessionConfig;
use crate::error::{LinkError, Result};
use crate::handler::{FromResponse, HandlerResult, ResponseContext, ResponseRegistry};
use crate::protocol::{AssemblerStats, Command, HexBytes};
use crate::transport::Transport;

/// Builder for configuring and starting a [`Session`].
pub struct SessionBuilder {
    config: SessionConfig,
    registry: ResponseRegistry,
}

impl SessionBuilder {
    /// Create a new session builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            registry: ResponseRegistry::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the transport -> session chunk channel capacity.
    ///
    /// Default: 64
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.config.inbound_capacity = capacity;
        self
    }

    /// Set the session -> caller event channel capacity.
    ///
    /// When full, new events are dropped and counted; handlers and request
    /// correlation keep running. Default: 64
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Set the initial reassembly buffer capacity.
    ///
    /// Default: 256
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Register a handler for one `(device_id, command_id)` pair.
    ///
    /// The handler runs in the read loop before the event is forwarded.
    pub fn handle<F, T, Fut>(mut self, key: (u8, u8), handler: F) -> Self
    where
        F: Fn(T, ResponseContext) -> Fut + Send + Sync + 'static,
        T: FromResponse,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(key, handler);
        self
    }

    /// Register the handler for packets no keyed handler claims.
    pub fn fallback<F, T, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(T, ResponseContext) -> Fut + Send + Sync + 'static,
        T: FromResponse,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register_fallback(handler);
        self
    }

    /// Connect the transport and start the session.
    pub async fn start<T: Transport + 'static>(self, transport: T) -> Result<Session<T>> {
        Session::start(transport, self.config, self.registry).await
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running protocol session over one transport.
pub struct Session<T: Transport + 'static> {
    /// Sequence counter, pending table and frame buffer.
    state: Arc<Mutex<ProtocolState>>,
    /// Transport; holding this lock is what orders sends.
    transport: AsyncMutex<T>,
    /// Decoded events for the caller.
    events: AsyncMutex<mpsc::Receiver<ResponseEvent>>,
    /// Events dropped because the event channel was full.
    dropped_events: Arc<AtomicU64>,
    /// Set by `close`.
    closed: AtomicBool,
    /// Read loop task handle.
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport + 'static> Session<T> {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    async fn start(
        mut transport: T,
        config: SessionConfig,
        registry: ResponseRegistry,
    ) -> Result<Self> {
        config.validate()?;

        // 1. Inbound channel
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);
        transport.set_receiver(inbound_tx);

        // 2. Connect
        transport.connect().await?;

        // 3. Spawn read loop
        let state = Arc::new(Mutex::new(ProtocolState::with_buffer_capacity(
            config.buffer_capacity,
        )));
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity);
        let dropped_events = Arc::new(AtomicU64::new(0));
        let read_task = tokio::spawn(Self::read_loop(
            inbound_rx,
            state.clone(),
            Arc::new(registry),
            events_tx,
            dropped_events.clone(),
        ));

        tracing::info!(
            "Session started (inbound={}, events={})",
            config.inbound_capacity,
            config.event_capacity
        );

        Ok(Self {
            state,
            transport: AsyncMutex::new(transport),
            events: AsyncMutex::new(events_rx),
            dropped_events,
            closed: AtomicBool::new(false),
            read_task: Mutex::new(Some(read_task)),
        })
    }

    /// Main read loop - reassembles chunks, dispatches and forwards events.
    async fn read_loop(
        mut inbound: mpsc::Receiver<Bytes>,
        state: Arc<Mutex<ProtocolState>>,
        registry: Arc<ResponseRegistry>,
        events: mpsc::Sender<ResponseEvent>,
        dropped_events: Arc<AtomicU64>,
    ) {
        while let Some(chunk) = inbound.recv().await {
            tracing::trace!("RX chunk: {}", HexBytes(&chunk));

            let decoded = lock(&state).on_receive(&chunk);

            for event in decoded {
                if let Err(e) = registry.dispatch(&event).await {
                    tracing::error!(
                        "Handler error for {:#04x}/{:#04x}: {}",
                        event.response.device_id,
                        event.response.command_id,
                        e
                    );
                }

                // Never wait on the caller; handlers already saw the event
                match events.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        let dropped = dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::warn!(
                            "Event channel full, dropping SEQ={} {:#04x}/{:#04x} ({} dropped)",
                            event.sequence(),
                            event.response.device_id,
                            event.response.command_id,
                            dropped
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::trace!("Event receiver dropped");
                    }
                }
            }
        }

        tracing::debug!("Inbound channel closed, read loop exiting");
    }

    /// Send a command. Returns the sequence number it was assigned.
    ///
    /// If the write fails the request stays in the pending table; a late
    /// reply or a later reuse of the sequence number resolves it.
    ///
    /// Fails with [`LinkError::ConnectionClosed`] after [`close`](Self::close),
    /// without touching the sequence counter or the pending table.
    pub async fn send(&self, command: &Command) -> Result<u8> {
        let mut transport = self.transport.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(LinkError::ConnectionClosed);
        }

        let outbound = lock(&self.state).prepare(command);
        tracing::debug!(
            "TX SEQ={} {:#04x}/{:#04x}: {}",
            outbound.sequence,
            command.device_id,
            command.command_id,
            HexBytes(&outbound.frame)
        );

        transport.write(&outbound.frame).await?;
        Ok(outbound.sequence)
    }

    /// Send a command from its parts.
    pub async fn send_raw(
        &self,
        device_id: u8,
        command_id: u8,
        payload: &[u8],
        target_id: Option<u8>,
        source_id: Option<u8>,
    ) -> Result<u8> {
        let mut command = Command::new(device_id, command_id).payload(payload);
        command.target_id = target_id;
        command.source_id = source_id;
        self.send(&command).await
    }

    /// Wait for the next decoded event.
    ///
    /// Returns `None` once the session is closed and all buffered events
    /// have been consumed.
    pub async fn next_event(&self) -> Option<ResponseEvent> {
        self.events.lock().await.recv().await
    }

    /// Take an event if one is ready.
    pub fn try_next_event(&self) -> Option<ResponseEvent> {
        self.events.try_lock().ok()?.try_recv().ok()
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending().len()
    }

    /// Sequence number the next command will get.
    pub fn next_sequence(&self) -> u8 {
        lock(&self.state).next_sequence()
    }

    /// Events dropped because nobody was draining the event channel.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Reassembly counters.
    pub fn stats(&self) -> AssemblerStats {
        lock(&self.state).frame_buffer().stats()
    }

    /// Check if the transport reports a live connection.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Disconnect the transport, stop the read loop and reset protocol state.
    ///
    /// The read loop is stopped even if the disconnect fails.
    pub async fn close(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        let result = transport.disconnect().await;
        drop(transport);

        if let Some(task) = lock(&self.read_task).take() {
            task.abort();
        }
        lock(&self.state).reset();

        tracing::info!("Session closed");
        result
    }
}

impl<T: Transport + 'static> Drop for Session<T> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.read_task).take() {
            task.abort();
        }
    }
}

/// Lock a std mutex, recovering the data if a panicking holder poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::transport::SimulatedTransport;

    async fn next(session: &Session<SimulatedTransport>) -> ResponseEvent {
        tokio::time::timeout(Duration::from_secs(1), session.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[test]
    fn test_builder_default() {
        let builder = SessionBuilder::default();
        assert_eq!(builder.config, SessionConfig::default());
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = Session::<SimulatedTransport>::builder()
            .inbound_capacity(8)
            .event_capacity(4)
            .buffer_capacity(32)
            .handle((0x02, 0x20), |_: (), _ctx| async { Ok(()) });

        assert_eq!(builder.config.inbound_capacity, 8);
        assert_eq!(builder.config.event_capacity, 4);
        assert_eq!(builder.config.buffer_capacity, 32);
        assert!(builder.registry.contains((0x02, 0x20)));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let result = SessionBuilder::new()
            .event_capacity(0)
            .start(SimulatedTransport::new(8))
            .await;
        assert!(matches!(result, Err(LinkError::Config(_))));
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let session = SessionBuilder::new()
            .start(SimulatedTransport::new(8))
            .await
            .unwrap();
        assert!(session.is_connected().await);

        let seq = session
            .send(&Command::new(0x02, 0x20).payload(&[10, 20, 30]))
            .await
            .unwrap();
        assert_eq!(seq, 0);

        let event = next(&session).await;
        assert_eq!(event.sequence(), 0);
        assert!(event.response.is_success());
        assert!(!event.is_unsolicited());
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.stats().frames, 1);
    }

    #[tokio::test]
    async fn test_send_raw_with_addressing() {
        let transport = SimulatedTransport::new(20);
        let probe = transport.probe();
        let session = SessionBuilder::new().start(transport).await.unwrap();

        session
            .send_raw(0x1A, 0x2F, &[0, 255, 0], Some(0x12), Some(0x01))
            .await
            .unwrap();
        next(&session).await;

        let received = probe.device().received().to_vec();
        assert_eq!(received[0].target_id, Some(0x12));
        assert_eq!(received[0].source_id, Some(0x01));
    }

    #[tokio::test]
    async fn test_close_stops_session() {
        let session = SessionBuilder::new()
            .start(SimulatedTransport::new(8))
            .await
            .unwrap();
        session.send(&Command::new(0x02, 0x20)).await.unwrap();
        next(&session).await;

        session.close().await.unwrap();

        assert!(!session.is_connected().await);
        assert_eq!(session.next_sequence(), 0);
        assert!(session.next_event().await.is_none());
        assert!(matches!(
            session.send(&Command::new(0x02, 0x20)).await,
            Err(LinkError::ConnectionClosed)
        ));
        assert_eq!(session.next_sequence(), 0);
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_full_event_channel_drops_events_not_responses() {
        let session = SessionBuilder::new()
            .event_capacity(2)
            .start(SimulatedTransport::new(8))
            .await
            .unwrap();

        for _ in 0..5 {
            session.send(&Command::new(0x02, 0x20)).await.unwrap();
        }
        tokio::time::timeout(Duration::from_secs(1), async {
            while session.pending_count() > 0 || session.dropped_events() < 3 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("responses not resolved");

        assert_eq!(session.dropped_events(), 3);
        assert_eq!(next(&session).await.sequence(), 0);
        assert_eq!(next(&session).await.sequence(), 1);
        assert!(session.try_next_event().is_none());
    }
}
