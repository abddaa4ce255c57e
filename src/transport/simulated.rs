//! Simulated transport and discovery.
//!
//! [`SimulatedTransport`] fragments every write into MTU-sized chunks, feeds
//! them to a [`SimulatedDevice`] and fragments the replies the same way on
//! the way back, which exercises reassembly on both sides.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{Discovery, Transport};
use crate::device::SimulatedDevice;
use crate::error::{LinkError, Result};
use crate::protocol::HexBytes;

/// Default BLE write size.
pub const DEFAULT_MTU: usize = 20;

/// Split `data` into chunks of at most `mtu` bytes.
///
/// An `mtu` of 0 is treated as 1.
pub fn chunk_bytes(data: &[u8], mtu: usize) -> std::slice::Chunks<'_, u8> {
    data.chunks(mtu.max(1))
}

/// State shared between a transport and its probes.
#[derive(Debug, Default)]
struct Shared {
    device: Mutex<SimulatedDevice>,
    written: Mutex<Vec<Bytes>>,
    fail_writes: AtomicBool,
}

/// [`Transport`] backed by an in-memory [`SimulatedDevice`].
#[derive(Debug)]
pub struct SimulatedTransport {
    mtu: usize,
    shared: Arc<Shared>,
    rx_tx: Option<mpsc::Sender<Bytes>>,
    connected: bool,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(DEFAULT_MTU)
    }
}

impl SimulatedTransport {
    /// Create a transport with the given MTU.
    pub fn new(mtu: usize) -> Self {
        Self {
            mtu,
            shared: Arc::new(Shared::default()),
            rx_tx: None,
            connected: false,
        }
    }

    /// Handle for inspecting the transport after it has been moved into a session.
    pub fn probe(&self) -> SimulatedProbe {
        SimulatedProbe {
            shared: self.shared.clone(),
        }
    }

    /// Configured MTU.
    pub fn mtu(&self) -> usize {
        self.mtu
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(LinkError::Transport("simulated write failure".to_string()));
        }

        tracing::debug!("[SIM TRANSPORT] Write: {} ({} bytes)", HexBytes(data), data.len());
        lock(&self.shared.written).push(Bytes::copy_from_slice(data));

        for chunk in chunk_bytes(data, self.mtu) {
            let replies = lock(&self.shared.device).receive(chunk);

            for reply in replies {
                let Some(tx) = &self.rx_tx else {
                    continue;
                };
                for reply_chunk in chunk_bytes(&reply, self.mtu) {
                    tx.send(Bytes::copy_from_slice(reply_chunk))
                        .await
                        .map_err(|_| LinkError::ConnectionClosed)?;
                }
            }
        }

        Ok(())
    }

    fn set_receiver(&mut self, tx: mpsc::Sender<Bytes>) {
        self.rx_tx = Some(tx);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Cloneable view into a [`SimulatedTransport`].
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    shared: Arc<Shared>,
}

impl SimulatedProbe {
    /// Complete frames written so far, in write order.
    pub fn written(&self) -> Vec<Bytes> {
        lock(&self.shared.written).clone()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lock the simulated device.
    ///
    /// Do not hold the guard across an `.await`.
    pub fn device(&self) -> MutexGuard<'_, SimulatedDevice> {
        lock(&self.shared.device)
    }
}

/// Lock ignoring poisoning; the simulated state stays usable after a test panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`Discovery`] over a fixed list of `(name, address)` pairs.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDiscovery {
    devices: Vec<(String, String)>,
}

impl SimulatedDiscovery {
    /// Create an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an advertised device.
    pub fn with_device(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.devices.push((name.into(), address.into()));
        self
    }
}

#[async_trait]
impl Discovery for SimulatedDiscovery {
    async fn discover(&self, name_filter: &str, timeout: Duration) -> Result<String> {
        if let Some((name, address)) = self
            .devices
            .iter()
            .find(|(name, _)| name.contains(name_filter))
        {
            tracing::debug!("[SIM DISCOVERY] Found {} at {}", name, address);
            return Ok(address.clone());
        }

        // Nothing advertised will show up later; the scan just runs out
        tokio::time::sleep(timeout).await;
        Err(LinkError::DeviceNotFound {
            filter: name_filter.to_string(),
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Command, FrameBuffer, Response};

    #[test]
    fn test_chunk_bytes() {
        let data = [1, 2, 3, 4, 5];
        let chunks: Vec<&[u8]> = chunk_bytes(&data, 2).collect();
        assert_eq!(chunks, vec![&[1, 2][..], &[3, 4][..], &[5][..]]);

        assert_eq!(chunk_bytes(&data, 0).count(), 5);
        assert_eq!(chunk_bytes(&[], 8).count(), 0);
        assert_eq!(chunk_bytes(&data, 20).count(), 1);
    }

    #[tokio::test]
    async fn test_write_requires_connect() {
        let mut transport = SimulatedTransport::new(8);
        let result = transport.write(&[0x8D, 0xD8]).await;
        assert!(matches!(result, Err(LinkError::NotConnected)));
    }

    #[tokio::test]
    async fn test_reply_is_fragmented_by_mtu() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut transport = SimulatedTransport::new(4);
        let probe = transport.probe();
        transport.set_receiver(tx);
        transport.connect().await.unwrap();

        let frame = Command::new(0x02, 0x20).payload(&[10, 20, 30]).encode(0);
        transport.write(&frame).await.unwrap();
        drop(transport);

        let mut buffer = FrameBuffer::new();
        let mut bodies = Vec::new();
        while let Some(chunk) = rx.recv().await {
            assert!(chunk.len() <= 4);
            bodies.extend(buffer.push(&chunk));
        }

        assert_eq!(bodies.len(), 1);
        let rsp = Response::decode(&bodies[0]).unwrap();
        assert_eq!(rsp.key(), (0x02, 0x20));
        assert!(rsp.is_success());

        assert_eq!(probe.written(), vec![frame]);
        assert_eq!(probe.device().leds().main, Some([10, 20, 30]));
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let mut transport = SimulatedTransport::new(8);
        let probe = transport.probe();
        transport.connect().await.unwrap();

        probe.set_fail_writes(true);
        assert!(matches!(
            transport.write(&[0x00]).await,
            Err(LinkError::Transport(_))
        ));
        assert!(probe.written().is_empty());

        probe.set_fail_writes(false);
        transport.write(&[0x00]).await.unwrap();
        assert_eq!(probe.written().len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_match() {
        let discovery = SimulatedDiscovery::new()
            .with_device("SM-1234", "AA:AA:AA:AA:AA:AA")
            .with_device("BP-5E21", "C1:02:03:04:05:06");

        let address = discovery
            .discover("BP-", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(address, "C1:02:03:04:05:06");
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_timeout() {
        let discovery = SimulatedDiscovery::new().with_device("SM-1234", "AA:AA:AA:AA:AA:AA");

        let err = discovery
            .discover("BP-", Duration::from_secs(10))
            .await
            .unwrap_err();

        match err {
            LinkError::DeviceNotFound { filter, timeout } => {
                assert_eq!(filter, "BP-");
                assert_eq!(timeout, Duration::from_secs(10));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
