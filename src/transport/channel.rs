//! In-process channel endpoint backed by tokio mpsc queues.
//!
//! ```text
//! Session ─► ChannelEndpoint ─► mpsc::Sender<Bytes> ─► peer
//! peer ─► mpsc::Sender<Bytes> ─► delivery task ─► Session::on_frame_received
//! ```
//!
//! Used for loopback setups and tests, and as the glue for channels that
//! already expose a queue of frames.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Endpoint, SendError};
use crate::error::errno;
use crate::session::Session;

/// Endpoint that queues outbound frames on an mpsc channel.
///
/// Cheaply cloneable. `send` never waits: a full queue is reported as
/// `-EAGAIN` and a closed one as `-EPIPE`.
#[derive(Clone, Debug)]
pub struct ChannelEndpoint {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelEndpoint {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }
}

impl Endpoint for ChannelEndpoint {
    fn send(&self, frame: &[u8]) -> Result<(), SendError> {
        self.tx
            .try_send(Bytes::copy_from_slice(frame))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendError::new(-errno::EAGAIN),
                mpsc::error::TrySendError::Closed(_) => SendError::new(-errno::EPIPE),
            })
    }
}

/// Create a channel endpoint and the receiver the peer reads frames from.
pub fn channel(capacity: usize) -> (ChannelEndpoint, mpsc::Receiver<Bytes>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelEndpoint::new(tx), rx)
}

/// Spawn the delivery context for inbound frames.
///
/// Every frame received on `rx` is handed to
/// [`Session::on_frame_received`]. The task ends when all senders are
/// dropped.
pub fn spawn_delivery_task(session: Arc<Session>, mut rx: mpsc::Receiver<Bytes>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            session.on_frame_received(&frame);
        }
        tracing::debug!("Inbound frame channel closed");
    })
}
