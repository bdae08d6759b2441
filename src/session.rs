//! Transport session - one outstanding request over the channel.
//!
//! The session owns the single [`PendingRequest`] slot shared between the
//! caller of [`Session::exchange`] and the delivery context calling
//! [`Session::on_frame_received`]. Responses carry no transaction id: the
//! expected bus id and address of the one pending request are the whole
//! correlation key, which is only sound because at most one request is ever
//! outstanding.
//!
//! # Lifecycle
//!
//! ```text
//! exchange():  install slot ─► send ─► wait (bounded) ─► clear slot
//!                                          ▲
//! on_frame_received():  decode ─► match ───┘ resolve once
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::TransportError;
use crate::protocol::WireMessage;
use crate::transport::Endpoint;

/// Default time to wait for a response to one exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// The single in-flight exchange awaiting its response.
struct PendingRequest {
    bus_id: u8,
    address: u16,
    /// Identifies the exchange that installed this slot.
    epoch: u64,
    completion: oneshot::Sender<WireMessage>,
}

/// Clears the pending slot when an exchange ends, however it ends.
///
/// Only the slot installed by the same exchange (same epoch) is cleared.
struct PendingGuard<'a> {
    session: &'a Session,
    epoch: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut slot = lock(&self.session.pending);
        if slot.as_ref().is_some_and(|p| p.epoch == self.epoch) {
            slot.take();
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    frames_sent: AtomicU64,
    responses_matched: AtomicU64,
    frames_dropped: AtomicU64,
    timeouts: AtomicU64,
}

/// Snapshot of session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Request frames accepted by the endpoint.
    pub frames_sent: u64,
    /// Responses that resolved a pending request.
    pub responses_matched: u64,
    /// Inbound frames discarded (undecodable, unexpected, stray or late).
    pub frames_dropped: u64,
    /// Exchanges that gave up waiting.
    pub timeouts: u64,
}

/// Owner of the channel to the remote peer.
///
/// Share it as `Arc<Session>` between the adapters issuing transfers and the
/// delivery context feeding inbound frames.
pub struct Session {
    endpoint: RwLock<Option<Arc<dyn Endpoint>>>,
    pending: Mutex<Option<PendingRequest>>,
    next_epoch: AtomicU64,
    /// Held for the whole of a transfer; see [`Session::lock_transfer`].
    transfer_lock: tokio::sync::Mutex<()>,
    counters: Counters,
}

impl Session {
    /// Create a session with no endpoint bound.
    pub fn new() -> Self {
        Self {
            endpoint: RwLock::new(None),
            pending: Mutex::new(None),
            next_epoch: AtomicU64::new(0),
            transfer_lock: tokio::sync::Mutex::new(()),
            counters: Counters::default(),
        }
    }

    /// Create a session already bound to `endpoint`.
    pub fn with_endpoint<E: Endpoint>(endpoint: E) -> Self {
        let session = Self::new();
        session.bind(endpoint);
        session
    }

    /// Bind the channel endpoint, replacing any previous one.
    pub fn bind<E: Endpoint>(&self, endpoint: E) {
        *self.endpoint.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(endpoint));
        tracing::info!("New rpmsg channel bound");
    }

    /// Remove the endpoint.
    ///
    /// An exchange waiting for its response fails with
    /// [`TransportError::NotBound`] right away.
    pub fn unbind(&self) {
        self.endpoint
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        lock(&self.pending).take();
        tracing::info!("rpmsg channel removed");
    }

    pub fn is_bound(&self) -> bool {
        self.current_endpoint().is_some()
    }

    /// Whether a request is currently awaiting its response.
    pub fn has_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_sent: self.counters.frames_sent.load(Ordering::Relaxed),
            responses_matched: self.counters.responses_matched.load(Ordering::Relaxed),
            frames_dropped: self.counters.frames_dropped.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
        }
    }

    /// Acquire the lock that serialises whole transfers.
    ///
    /// Every transfer on every adapter sharing this session holds it from
    /// the first exchange to the last, so exchanges of different transfers
    /// never interleave.
    pub(crate) async fn lock_transfer(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.transfer_lock.lock().await
    }

    /// Send `request` and wait up to `timeout` for the response whose bus id
    /// and address match the expected ones.
    ///
    /// No retry is attempted on any failure.
    pub async fn exchange(
        &self,
        request: &WireMessage,
        expected_bus_id: u8,
        expected_address: u16,
        timeout: Duration,
    ) -> Result<WireMessage, TransportError> {
        let endpoint = self.current_endpoint().ok_or(TransportError::NotBound)?;
        let (_guard, completion) = self.install(expected_bus_id, expected_address)?;

        if let Err(e) = endpoint.send(&request.encode()) {
            tracing::error!("rpmsg send failed: {}", e.code);
            return Err(TransportError::SendFailed(e.code));
        }
        self.counters.frames_sent.fetch_add(1, Ordering::Relaxed);

        match tokio::time::timeout(timeout, completion).await {
            Ok(Ok(response)) => Ok(response),
            // Completion dropped without a response: the endpoint was unbound.
            Ok(Err(_)) => Err(TransportError::NotBound),
            Err(_) => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "Exchange with bus_id:{}, addr:{:#04x} failed: timeout",
                    expected_bus_id,
                    expected_address
                );
                Err(TransportError::Timeout)
            }
        }
    }

    /// Receive callback for one inbound frame.
    ///
    /// Frames that cannot complete the pending request are logged and
    /// dropped; the waiting exchange is left untouched.
    pub fn on_frame_received(&self, bytes: &[u8]) {
        // Decode also rejects a length field above MAX_PAYLOAD.
        let response = match WireMessage::decode(bytes) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Dropping undecodable frame: {}", e);
                self.count_drop();
                return;
            }
        };

        if !response.is_response() {
            tracing::warn!("Dropping frame that is not a response");
            self.count_drop();
            return;
        }

        let pending = {
            let mut slot = lock(&self.pending);
            let matched = match slot.as_ref() {
                None => {
                    tracing::warn!(
                        "No pending request for bus_id:{}, addr:{:#04x}",
                        response.bus_id,
                        response.address
                    );
                    false
                }
                Some(p) if p.bus_id != response.bus_id || p.address != response.address => {
                    tracing::error!(
                        "expected bus_id:{}, addr:{:#04x}, received bus_id:{}, addr:{:#04x}",
                        p.bus_id,
                        p.address,
                        response.bus_id,
                        response.address
                    );
                    false
                }
                Some(_) => true,
            };
            if matched {
                slot.take()
            } else {
                None
            }
        };

        let Some(pending) = pending else {
            self.count_drop();
            return;
        };

        if pending.completion.send(response).is_err() {
            tracing::debug!("Exchange ended before its response was delivered");
            self.count_drop();
            return;
        }
        self.counters.responses_matched.fetch_add(1, Ordering::Relaxed);
    }

    fn install(
        &self,
        bus_id: u8,
        address: u16,
    ) -> Result<(PendingGuard<'_>, oneshot::Receiver<WireMessage>), TransportError> {
        let mut slot = lock(&self.pending);
        if slot.is_some() {
            tracing::warn!("Exchange refused: another request is pending");
            return Err(TransportError::Busy);
        }

        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        *slot = Some(PendingRequest {
            bus_id,
            address,
            epoch,
            completion: tx,
        });

        Ok((
            PendingGuard {
                session: self,
                epoch,
            },
            rx,
        ))
    }

    fn current_endpoint(&self) -> Option<Arc<dyn Endpoint>> {
        self.endpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn count_drop(&self) {
        self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
