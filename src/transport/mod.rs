//! Transport module - the send primitive of the interprocessor channel.
//!
//! The channel itself (endpoint discovery, open/close) lives outside this
//! crate. It is reached through two seams:
//! - [`Endpoint`] - "send bytes to remote endpoint"
//! - [`Session::on_frame_received`](crate::Session::on_frame_received) -
//!   inbound frames, fed by whatever delivery context the channel provides
//!   (for example [`spawn_delivery_task`])

mod channel;

pub use channel::{channel, spawn_delivery_task, ChannelEndpoint};

use thiserror::Error;

/// Rejection reported by an endpoint, as a negative errno-style code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("endpoint rejected frame: {code}")]
pub struct SendError {
    pub code: i32,
}

impl SendError {
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Send side of the interprocessor channel.
///
/// `send` hands one complete frame to the channel. It should not wait for
/// the peer: delivery is asynchronous and the only feedback is accept or
/// reject.
///
/// # Example
///
/// ```
/// use rpmsg_i2c::transport::{Endpoint, SendError};
///
/// struct Discard;
///
/// impl Endpoint for Discard {
///     fn send(&self, _frame: &[u8]) -> Result<(), SendError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Endpoint: Send + Sync + 'static {
    fn send(&self, frame: &[u8]) -> Result<(), SendError>;
}

impl<F> Endpoint for F
where
    F: Fn(&[u8]) -> Result<(), SendError> + Send + Sync + 'static,
{
    fn send(&self, frame: &[u8]) -> Result<(), SendError> {
        self(frame)
    }
}
