//! Transport over any tokio byte stream.
//!
//! Useful for serial/BLE bridges that expose the robot's characteristic as
//! a plain stream, and for tests via `tokio::io::duplex`.
//!
//! # Example
//!
//! ```ignore
//! use sphero_link::transport::StreamTransport;
//!
//! let (local, _remote) = tokio::io::duplex(1024);
//! let transport = StreamTransport::new(local);
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::Transport;
use crate::error::{LinkError, Result};

/// Read buffer size; larger than any BLE notification.
const READ_BUFFER_SIZE: usize = 512;

/// [`Transport`] over a stream that is split on connect.
pub struct StreamTransport<S> {
    /// Stream waiting for `connect`.
    idle: Option<S>,
    /// Write half once connected.
    writer: Option<WriteHalf<S>>,
    /// Inbound chunk channel.
    rx_tx: Option<mpsc::Sender<Bytes>>,
    /// Task forwarding reads to `rx_tx`.
    reader_task: Option<JoinHandle<()>>,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Wrap a stream. Nothing is read until `connect`.
    pub fn new(stream: S) -> Self {
        Self {
            idle: Some(stream),
            writer: None,
            rx_tx: None,
            reader_task: None,
        }
    }

    /// Forward everything read from the stream as raw chunks.
    async fn read_loop(mut reader: ReadHalf<S>, tx: mpsc::Sender<Bytes>) {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => {
                    tracing::debug!("Stream closed by peer");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("Stream read error: {}", e);
                    return;
                }
            };

            if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                // Session is gone
                return;
            }
        }
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    async fn connect(&mut self) -> Result<()> {
        let tx = self
            .rx_tx
            .clone()
            .ok_or_else(|| LinkError::Transport("no receiver registered".to_string()))?;

        let stream = self.idle.take().ok_or(LinkError::ConnectionClosed)?;
        let (reader, writer) = tokio::io::split(stream);
        self.reader_task = Some(tokio::spawn(Self::read_loop(reader, tx)));
        self.writer = Some(writer);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(LinkError::NotConnected)?;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    fn set_receiver(&mut self, tx: mpsc::Sender<Bytes>) {
        self.rx_tx = Some(tx);
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}

impl<S> Drop for StreamTransport<S> {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}
