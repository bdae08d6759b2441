//! Return-value codes carried in byte 11 of a response frame.
//!
//! ```text
//! 0x00  success
//! 0x01  failed
//! 0x02  invalid parameter
//! 0x03  invalid message
//! 0x04  operate in invalid state
//! 0x05  memory allocation failed
//! 0x06  timeout when waiting for an event
//! 0x07  cannot add to list as node already in another list
//! 0x08  cannot remove from list as node not in list
//! 0x09  transfer timeout
//! 0x0A  transfer failed due to peer core not ready
//! 0x0B  transfer failed due to communication failure
//! 0x0C  cannot find service for a request/notification
//! 0x0D  service version cannot support the request/notification
//! ```

use thiserror::Error;

/// Return code for a successful operation.
pub const SUCCESS: u8 = 0x00;

/// Failure kind reported by the remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("failed")]
    Failed,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("invalid message")]
    InvalidMessage,
    #[error("operate in invalid state")]
    InvalidState,
    #[error("memory allocation failed")]
    AllocationFailed,
    #[error("timeout when waiting for an event")]
    EventTimeout,
    #[error("node already in another list")]
    ListInsertConflict,
    #[error("node not in list")]
    ListRemoveConflict,
    #[error("transfer timeout")]
    TransferTimeout,
    #[error("peer core not ready")]
    PeerNotReady,
    #[error("communication failure")]
    CommunicationFailure,
    #[error("no service for request")]
    NoService,
    #[error("service version not supported")]
    ServiceVersionMismatch,
    /// A code outside the documented table.
    #[error("unknown return code {0:#04x}")]
    Unknown(u8),
}

impl RemoteError {
    /// Map a raw return code. `None` means success.
    pub fn from_code(code: u8) -> Option<Self> {
        let kind = match code {
            SUCCESS => return None,
            0x01 => RemoteError::Failed,
            0x02 => RemoteError::InvalidParameter,
            0x03 => RemoteError::InvalidMessage,
            0x04 => RemoteError::InvalidState,
            0x05 => RemoteError::AllocationFailed,
            0x06 => RemoteError::EventTimeout,
            0x07 => RemoteError::ListInsertConflict,
            0x08 => RemoteError::ListRemoveConflict,
            0x09 => RemoteError::TransferTimeout,
            0x0A => RemoteError::PeerNotReady,
            0x0B => RemoteError::CommunicationFailure,
            0x0C => RemoteError::NoService,
            0x0D => RemoteError::ServiceVersionMismatch,
            other => RemoteError::Unknown(other),
        };
        Some(kind)
    }

    /// The raw code as it appeared on the wire.
    pub fn code(&self) -> u8 {
        match self {
            RemoteError::Failed => 0x01,
            RemoteError::InvalidParameter => 0x02,
            RemoteError::InvalidMessage => 0x03,
            RemoteError::InvalidState => 0x04,
            RemoteError::AllocationFailed => 0x05,
            RemoteError::EventTimeout => 0x06,
            RemoteError::ListInsertConflict => 0x07,
            RemoteError::ListRemoveConflict => 0x08,
            RemoteError::TransferTimeout => 0x09,
            RemoteError::PeerNotReady => 0x0A,
            RemoteError::CommunicationFailure => 0x0B,
            RemoteError::NoService => 0x0C,
            RemoteError::ServiceVersionMismatch => 0x0D,
            RemoteError::Unknown(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_not_an_error() {
        assert_eq!(RemoteError::from_code(SUCCESS), None);
    }

    #[test]
    fn test_documented_codes_preserved() {
        for code in 1u8..=13 {
            let kind = RemoteError::from_code(code).unwrap();
            assert!(!matches!(kind, RemoteError::Unknown(_)));
            assert_eq!(kind.code(), code);
        }
        assert_eq!(RemoteError::from_code(10), Some(RemoteError::PeerNotReady));
    }

    #[test]
    fn test_unknown_code_keeps_value() {
        let kind = RemoteError::from_code(0x42).unwrap();
        assert_eq!(kind, RemoteError::Unknown(0x42));
        assert_eq!(kind.code(), 0x42);
        assert_eq!(kind.to_string(), "unknown return code 0x42");
    }
}
