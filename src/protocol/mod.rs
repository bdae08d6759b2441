//! Protocol module - wire format and return codes.
//!
//! This module implements the fixed-layout frame exchanged with the remote
//! processor:
//! - 34-byte frame encoding/decoding
//! - Return-value table for responses

mod return_code;
mod wire_format;

pub use return_code::{RemoteError, SUCCESS};
pub use wire_format::{
    flags, Command, MessageType, WireMessage, CATEGORY, FRAME_SIZE, MAX_PAYLOAD, PRIORITY,
    PROTOCOL_VERSION,
};
