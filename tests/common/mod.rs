//! Scripted remote peer for integration tests.
//!
//! The peer reads request frames from the session's channel endpoint,
//! records them, and answers through the delivery task exactly like a
//! remote core would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use rpmsg_i2c::protocol::{Command, WireMessage};
use rpmsg_i2c::transport::{channel, spawn_delivery_task};
use rpmsg_i2c::{AdapterBuilder, RpmsgI2cAdapter, Session};
use tokio::sync::mpsc;

/// What the peer does with one request.
pub enum Reply {
    Now(WireMessage),
    After(Duration, WireMessage),
    Never,
}

/// Everything the peer observed.
#[derive(Clone, Default)]
pub struct PeerLog {
    requests: Arc<Mutex<Vec<WireMessage>>>,
    overlaps: Arc<AtomicUsize>,
}

impl PeerLog {
    pub fn requests(&self) -> Vec<WireMessage> {
        self.requests.lock().unwrap().clone()
    }

    /// Times a second request arrived while one was still unanswered.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

/// Bytes the default peer returns for a read from `address`.
pub fn read_pattern(address: u16, len: usize) -> Vec<u8> {
    (0..len).map(|i| (address as u8).wrapping_add(i as u8)).collect()
}

/// Answer writes with success and reads with [`read_pattern`].
pub fn healthy(request: &WireMessage) -> Reply {
    let payload = match request.command {
        Command::Read => read_pattern(request.address, request.len()),
        Command::Write => Vec::new(),
    };
    Reply::Now(WireMessage::response_to(request, 0, &payload).unwrap())
}

/// Answer with `code` and no data.
pub fn failing(request: &WireMessage, code: u8) -> Reply {
    Reply::Now(WireMessage::response_to(request, code, &[]).unwrap())
}

/// Bind a fresh session to a scripted peer.
pub fn spawn_peer<F>(responder: F) -> (Arc<Session>, PeerLog)
where
    F: FnMut(&WireMessage) -> Reply + Send + 'static,
{
    let (endpoint, outbound) = channel(16);
    let session = Arc::new(Session::with_endpoint(endpoint));

    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    spawn_delivery_task(session.clone(), inbound_rx);

    let log = PeerLog::default();
    tokio::spawn(peer_loop(outbound, inbound_tx, responder, log.clone()));

    (session, log)
}

/// Session, peer and an adapter on bus 1 with the given timeout.
pub fn adapter_with_peer<F>(timeout: Duration, responder: F) -> (RpmsgI2cAdapter, PeerLog)
where
    F: FnMut(&WireMessage) -> Reply + Send + 'static,
{
    let (session, log) = spawn_peer(responder);
    let adapter = AdapterBuilder::new()
        .bus_number(1)
        .timeout(timeout)
        .build(session)
        .unwrap();
    (adapter, log)
}

async fn peer_loop<F>(
    mut outbound: mpsc::Receiver<Bytes>,
    inbound: mpsc::Sender<Bytes>,
    mut responder: F,
    log: PeerLog,
) where
    F: FnMut(&WireMessage) -> Reply + Send + 'static,
{
    while let Some(frame) = outbound.recv().await {
        let request = WireMessage::decode(&frame).expect("peer received a malformed frame");
        log.requests.lock().unwrap().push(request.clone());

        // Give a racing caller the chance to slip a second request in.
        tokio::time::sleep(Duration::from_millis(1)).await;
        if let Ok(extra) = outbound.try_recv() {
            log.overlaps.fetch_add(1, Ordering::SeqCst);
            if let Ok(extra) = WireMessage::decode(&extra) {
                log.requests.lock().unwrap().push(extra);
            }
        }

        match responder(&request) {
            Reply::Now(response) => {
                let _ = inbound.send(Bytes::copy_from_slice(&response.encode())).await;
            }
            Reply::After(delay, response) => {
                let inbound = inbound.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = inbound.send(Bytes::copy_from_slice(&response.encode())).await;
                });
            }
            Reply::Never => {}
        }
    }
}
