//! Transfer sequencer - turns a list of I2C messages into exchanges.
//!
//! Messages are issued strictly in order, one exchange each. Only the last
//! message carries the STOP flag, telling the peer it may release the bus.
//! The first failure ends the transfer: later messages are never sent.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{FrameError, I2cError, Result};
use crate::message::I2cMessage;
use crate::protocol::{flags, Command, RemoteError, WireMessage, MAX_PAYLOAD};
use crate::session::Session;

/// Issues transfers for one bus over a shared session.
pub struct Sequencer {
    session: Arc<Session>,
    timeout: Duration,
}

impl Sequencer {
    /// Create a sequencer whose exchanges each wait at most `timeout`.
    pub fn new(session: Arc<Session>, timeout: Duration) -> Self {
        Self { session, timeout }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one transfer on `bus_id`.
    ///
    /// Holds the session's transfer lock for the whole call. Returns the
    /// number of messages processed; read buffers hold the received data.
    pub async fn run_transfer(&self, messages: &mut [I2cMessage], bus_id: u8) -> Result<usize> {
        let _transfer = self.session.lock_transfer().await;

        let count = messages.len();
        for (index, msg) in messages.iter_mut().enumerate() {
            let is_last = index + 1 == count;
            if msg.is_read() {
                self.read(msg, bus_id, is_last).await?;
            } else {
                self.write(msg, bus_id, is_last).await?;
            }
        }

        Ok(count)
    }

    async fn read(&self, msg: &mut I2cMessage, bus_id: u8, is_last: bool) -> Result<()> {
        let len = msg.len();
        if len > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                len,
                max: MAX_PAYLOAD,
            }
            .into());
        }

        let request = WireMessage::request(
            Command::Read,
            bus_id,
            msg.address,
            wire_flags(msg.flags, is_last),
            &[0u8; MAX_PAYLOAD][..len],
        )?;
        let response = self.exchange(&request).await?;

        if response.len() != len {
            tracing::error!(
                "Read from addr:{:#04x} failed: requested {} bytes, received {}",
                msg.address,
                len,
                response.len()
            );
            return Err(I2cError::ProtocolMismatch {
                expected: len,
                actual: response.len(),
            });
        }

        msg.buf.copy_from_slice(response.payload());
        Ok(())
    }

    async fn write(&self, msg: &I2cMessage, bus_id: u8, is_last: bool) -> Result<()> {
        let request = WireMessage::request(
            Command::Write,
            bus_id,
            msg.address,
            wire_flags(msg.flags, is_last),
            &msg.buf,
        )?;
        self.exchange(&request).await?;
        Ok(())
    }

    async fn exchange(&self, request: &WireMessage) -> Result<WireMessage> {
        let response = self
            .session
            .exchange(request, request.bus_id, request.address, self.timeout)
            .await?;

        if let Some(e) = RemoteError::from_code(response.return_code) {
            tracing::debug!(
                "{:?} on bus_id:{}, addr:{:#04x} failed: {}",
                request.command,
                request.bus_id,
                request.address,
                response.return_code
            );
            return Err(I2cError::Remote(e));
        }

        Ok(response)
    }
}

/// Message flags as sent on the wire, with STOP on the last message.
#[inline]
fn wire_flags(message_flags: u16, is_last: bool) -> u16 {
    if is_last {
        message_flags | flags::STOP
    } else {
        message_flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::{channel, SendError};

    #[test]
    fn test_wire_flags() {
        assert_eq!(wire_flags(0x0001, false), 0x0001);
        assert_eq!(wire_flags(0x0001, true), 0x0201);
        assert_eq!(wire_flags(0, true), flags::STOP);
    }

    #[tokio::test]
    async fn test_empty_transfer() {
        let sequencer = Sequencer::new(Arc::new(Session::new()), Duration::from_millis(10));
        assert_eq!(sequencer.run_transfer(&mut [], 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oversized_read_never_sent() {
        let (endpoint, mut rx) = channel(4);
        let sequencer = Sequencer::new(
            Arc::new(Session::with_endpoint(endpoint)),
            Duration::from_millis(10),
        );

        let mut msgs = [I2cMessage::read(0x50, MAX_PAYLOAD + 1)];
        let err = sequencer.run_transfer(&mut msgs, 1).await.unwrap_err();

        assert!(matches!(
            err,
            I2cError::Frame(FrameError::PayloadTooLarge { len: 17, max: 16 })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_oversized_write_never_sent() {
        let (endpoint, mut rx) = channel(4);
        let sequencer = Sequencer::new(
            Arc::new(Session::with_endpoint(endpoint)),
            Duration::from_millis(10),
        );

        let mut msgs = [I2cMessage::write(0x50, vec![0u8; 20])];
        let err = sequencer.run_transfer(&mut msgs, 1).await.unwrap_err();

        assert!(matches!(
            err,
            I2cError::Frame(FrameError::PayloadTooLarge { len: 20, .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_failure_aborts_transfer() {
        let session = Session::with_endpoint(|_: &[u8]| -> std::result::Result<(), SendError> {
            Err(SendError::new(-32))
        });
        let sequencer = Sequencer::new(Arc::new(session), Duration::from_millis(10));

        let mut msgs = [I2cMessage::write(0x50, [1]), I2cMessage::write(0x50, [2])];
        let err = sequencer.run_transfer(&mut msgs, 1).await.unwrap_err();

        assert!(matches!(
            err,
            I2cError::Transport(TransportError::SendFailed(-32))
        ));
        assert_eq!(sequencer.session().stats().frames_sent, 0);
    }
}
