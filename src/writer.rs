//! Per-connection writer task.
//!
//! Each socket has exactly one task writing to it. Everyone else (the
//! connection's own reader, handlers serving other connections, the
//! heartbeat) holds a cloned [`WriterHandle`] and queues whole frames, so
//! frames never interleave on the wire.
//!
//! ```text
//! reader A --+
//! reader B --+--> WriterHandle --mpsc--> writer task --> write half
//! heartbeat -+
//! ```
//!
//! Every queued frame holds a semaphore permit until it has been written.
//! When `max_pending_frames` permits are out, senders wait up to
//! `backpressure_timeout` and then fail with `BackpressureTimeout`.

use std::collections::VecDeque;
use std::io::IoSlice;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes};
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{ChatwireError, Result};
use crate::protocol::{Header, HEADER_SIZE};

/// Frames a connection may have queued before senders wait.
pub const DEFAULT_MAX_PENDING_FRAMES: usize = 1024;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_BACKPRESSURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on frames flushed by one vectored write.
const MAX_BATCH: usize = 64;

/// An encoded frame waiting for the socket.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// Header already in wire layout.
    pub header: [u8; HEADER_SIZE],
    /// Serialized message body, shared rather than copied.
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Pair an encoded `header` with its payload.
    #[inline]
    pub fn new(header: &Header, payload: Bytes) -> Self {
        Self {
            header: header.encode(),
            payload,
        }
    }

    /// Bytes this frame occupies on the wire.
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Tuning for one connection's writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Frames queued but not yet written before senders start waiting.
    pub max_pending_frames: usize,
    /// Capacity of the mpsc channel feeding the writer task.
    pub channel_capacity: usize,
    /// How long a sender waits for room before giving up.
    pub backpressure_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            backpressure_timeout: DEFAULT_BACKPRESSURE_TIMEOUT,
        }
    }
}

struct Queued {
    frame: OutboundFrame,
    _permit: OwnedSemaphorePermit,
}

/// Cloneable sending side of one connection's writer task.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Queued>,
    /// One permit per frame that may sit in the queue.
    permits: Arc<Semaphore>,
    max_pending: usize,
    backpressure_timeout: Duration,
    /// Shared by every clone; read by the client heartbeat.
    last_send: Arc<Mutex<Instant>>,
}

impl WriterHandle {
    /// Queue `frame` for writing.
    ///
    /// Returns once the frame is queued, not once it is on the wire.
    ///
    /// # Errors
    ///
    /// `BackpressureTimeout` if the queue stays full for the configured
    /// timeout, `ConnectionClosed` once the writer task has stopped.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(ChatwireError::ConnectionClosed),
            Err(TryAcquireError::NoPermits) => {
                let acquire = Arc::clone(&self.permits).acquire_owned();
                match tokio::time::timeout(self.backpressure_timeout, acquire).await {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) => return Err(ChatwireError::ConnectionClosed),
                    Err(_) => return Err(ChatwireError::BackpressureTimeout),
                }
            }
        };

        self.tx
            .send(Queued {
                frame,
                _permit: permit,
            })
            .await
            .map_err(|_| ChatwireError::ConnectionClosed)?;

        *self.last_send.lock() = Instant::now();
        Ok(())
    }

    /// Frames queued and not yet written.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.max_pending
            .saturating_sub(self.permits.available_permits())
    }

    /// Whether the next `send` would have to wait for room.
    #[inline]
    pub fn is_backpressure_active(&self) -> bool {
        self.permits.available_permits() == 0
    }

    /// Time since a frame was last queued on this connection.
    pub fn idle_for(&self) -> Duration {
        self.last_send.lock().elapsed()
    }

    /// Whether the writer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task for `writer`.
///
/// The task ends cleanly when every handle is dropped, or with the I/O
/// error of the first failed write.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let permits = Arc::new(Semaphore::new(config.max_pending_frames));

    let handle = WriterHandle {
        tx,
        permits: Arc::clone(&permits),
        max_pending: config.max_pending_frames,
        backpressure_timeout: config.backpressure_timeout,
        last_send: Arc::new(Mutex::new(Instant::now())),
    };
    let task = tokio::spawn(writer_loop(rx, writer, permits));

    (handle, task)
}

/// [`spawn_writer_task`] with [`WriterConfig::default`].
pub fn spawn_writer_task_default<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task(writer, WriterConfig::default())
}

async fn writer_loop<W>(
    mut rx: mpsc::Receiver<Queued>,
    mut writer: W,
    permits: Arc<Semaphore>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch = Vec::with_capacity(MAX_BATCH);

    while rx.recv_many(&mut batch, MAX_BATCH).await > 0 {
        let result = write_batch(&mut writer, batch.iter().map(|q| &q.frame)).await;
        // Releases the permits
        batch.clear();

        if let Err(e) = result {
            tracing::debug!("writer stopped: {}", e);
            rx.close();
            permits.close();
            return Err(e);
        }
    }

    let _ = writer.shutdown().await;
    Ok(())
}

/// Write frames with as few vectored writes as the sink allows, then flush.
async fn write_batch<'a, W>(
    writer: &mut W,
    frames: impl Iterator<Item = &'a OutboundFrame>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut parts: VecDeque<Bytes> = VecDeque::new();
    for frame in frames {
        parts.push_back(Bytes::copy_from_slice(&frame.header));
        if !frame.payload.is_empty() {
            parts.push_back(frame.payload.clone());
        }
    }

    while !parts.is_empty() {
        let written = {
            let slices: Vec<IoSlice<'_>> = parts.iter().map(|p| IoSlice::new(p)).collect();
            writer.write_vectored(&slices).await?
        };
        if written == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
        }
        consume(&mut parts, written);
    }

    writer.flush().await?;
    Ok(())
}

/// Drop `n` written bytes from the front of `parts`.
fn consume(parts: &mut VecDeque<Bytes>, mut n: usize) {
    while n > 0 {
        let Some(front) = parts.front_mut() else { return };
        if n < front.len() {
            front.advance(n);
            return;
        }
        n -= front.len();
        parts.pop_front();
    }
}
