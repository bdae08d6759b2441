//! Error types for rpmsg-i2c.
//!
//! Three layers, one per component:
//! - [`FrameError`] - local validation of a wire frame (never sent)
//! - [`TransportError`] - a single exchange with the remote peer
//! - [`I2cError`] - the outcome of a whole transfer, as seen by the bus

use thiserror::Error;

use crate::protocol::RemoteError;

/// Linux errno values reported through [`I2cError::errno`].
pub mod errno {
    pub const EAGAIN: i32 = 11;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const EPIPE: i32 = 32;
    pub const EPROTO: i32 = 71;
    pub const ETIMEDOUT: i32 = 110;
}

/// Frame encode/decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Payload (or decoded length field) exceeds the fixed data capacity.
    #[error("data length greater than {max}, len={len}")]
    PayloadTooLarge { len: usize, max: usize },

    /// Received buffer is not exactly one frame long.
    #[error("malformed frame: {len} bytes")]
    Malformed { len: usize },

    /// Message type byte is neither request nor response.
    #[error("unknown message type: {0:#04x}")]
    UnknownMessageType(u8),

    /// Command byte is neither read nor write.
    #[error("unknown command: {0:#04x}")]
    UnknownCommand(u8),
}

/// Failure of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No channel endpoint is bound to the session.
    #[error("no channel endpoint bound")]
    NotBound,

    /// Another exchange already owns the pending slot.
    #[error("an exchange is already in flight")]
    Busy,

    /// The endpoint refused the frame.
    #[error("send failed: {0}")]
    SendFailed(i32),

    /// No matching response arrived in time.
    #[error("timeout waiting for response")]
    Timeout,

    /// The request frame could not be built.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Main error type for a transfer.
#[derive(Debug, Error)]
pub enum I2cError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-zero return code reported by the remote peer.
    #[error("remote operation failed: {0}")]
    Remote(RemoteError),

    /// Response length differs from the requested read length.
    #[error("protocol mismatch: expected {expected} bytes, received {actual}")]
    ProtocolMismatch { expected: usize, actual: usize },

    /// A message exceeds the adapter's read/write limit.
    #[error("message {index} of {len} bytes exceeds adapter limit of {max}")]
    QuirkViolation { index: usize, len: usize, max: usize },

    /// JSON configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<RemoteError> for I2cError {
    fn from(e: RemoteError) -> Self {
        I2cError::Remote(e)
    }
}

impl I2cError {
    /// Negative errno for the bus subsystem.
    ///
    /// Remote failures map to `-code` so the specific kind survives.
    pub fn errno(&self) -> i32 {
        match self {
            I2cError::Frame(_) | I2cError::QuirkViolation { .. } => -errno::EINVAL,
            I2cError::Transport(e) => match e {
                TransportError::NotBound | TransportError::Frame(_) => -errno::EINVAL,
                TransportError::Busy => -errno::EBUSY,
                TransportError::SendFailed(code) if *code < 0 => *code,
                TransportError::SendFailed(code) => -code,
                TransportError::Timeout => -errno::ETIMEDOUT,
            },
            I2cError::Remote(e) => -i32::from(e.code()),
            I2cError::ProtocolMismatch { .. } => -errno::EPROTO,
            I2cError::Config(_) | I2cError::InvalidConfig(_) => -errno::EINVAL,
        }
    }

    /// The remote failure kind, if the peer reported one.
    pub fn remote_error(&self) -> Option<RemoteError> {
        match self {
            I2cError::Remote(e) => Some(*e),
            _ => None,
        }
    }
}

/// Result type alias using I2cError.
pub type Result<T> = std::result::Result<T, I2cError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(I2cError::from(TransportError::Timeout).errno(), -110);
        assert_eq!(I2cError::from(TransportError::NotBound).errno(), -22);
        assert_eq!(I2cError::from(TransportError::SendFailed(-32)).errno(), -32);
        assert_eq!(
            I2cError::ProtocolMismatch {
                expected: 2,
                actual: 1
            }
            .errno(),
            -71
        );
        assert_eq!(I2cError::Remote(RemoteError::PeerNotReady).errno(), -10);
    }

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::PayloadTooLarge { len: 17, max: 16 };
        assert_eq!(err.to_string(), "data length greater than 16, len=17");
    }

    #[test]
    fn test_remote_error_accessor() {
        let err = I2cError::from(RemoteError::InvalidParameter);
        assert_eq!(err.remote_error(), Some(RemoteError::InvalidParameter));
        assert_eq!(I2cError::from(TransportError::Busy).remote_error(), None);
    }
}
