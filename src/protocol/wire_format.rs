//! Wire format encoding and decoding.
//!
//! Every exchange uses one fixed 34-byte frame in each direction:
//! ```text
//! ┌──────────┬─────────┬──────┬─────────┬──────────┬──────────┐
//! │ Category │ Version │ Type │ Command │ Priority │ Reserved │
//! │ 1 byte   │ 2 bytes │ 1    │ 1       │ 1        │ 4 bytes  │
//! ├──────────┼─────────┼──────┴──┬──────┴──┬───────┴──────────┤
//! │ Bus ID   │ Ret Val │ Address │ Flags   │ Len   │ Data      │
//! │ 1 byte   │ 1 byte  │ 2 bytes │ 2 bytes │ 2     │ 16 bytes  │
//! └──────────┴─────────┴─────────┴─────────┴───────┴───────────┘
//! ```
//!
//! All multi-byte integers are Little Endian. Only the first `len` bytes
//! of the data area are meaningful; the rest are zero on encode and ignored
//! on decode.

use crate::error::FrameError;

/// Frame size in bytes (fixed, exactly 34).
pub const FRAME_SIZE: usize = 34;

/// Data area capacity: the largest read or write a single frame carries.
pub const MAX_PAYLOAD: usize = 16;

/// Protocol category assigned to I2C.
pub const CATEGORY: u8 = 0x09;

/// Protocol version: major byte (0x01) at offset 1, minor byte (0x00) at offset 2.
pub const PROTOCOL_VERSION: u16 = 0x0001;

/// Priority byte sent with every request.
pub const PRIORITY: u8 = 0x01;

const DATA_OFFSET: usize = 18;

/// Flag bits for the 16-bit `flags` field.
///
/// The field carries the I2C message flags ([`crate::message::flags`])
/// unchanged, plus [`STOP`] on the last message of a transfer.
pub mod flags {
    /// Peer may release the bus after this operation.
    pub const STOP: u16 = 0x0200;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u16, flag: u16) -> bool {
        flags & flag != 0
    }
}

/// Frame direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Request = 0x00,
    Response = 0x01,
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageType::Request),
            0x01 => Ok(MessageType::Response),
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }
}

/// Remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Read = 0x00,
    Write = 0x01,
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Command::Read),
            0x01 => Ok(Command::Write),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }
}

/// One decoded frame.
///
/// The length and data area are private: a `WireMessage` can only be built
/// through [`WireMessage::request`], [`WireMessage::response_to`] or
/// [`WireMessage::decode`], all of which reject lengths above
/// [`MAX_PAYLOAD`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub category: u8,
    pub version: u16,
    pub message_type: MessageType,
    pub command: Command,
    pub priority: u8,
    /// Logical bus the operation targets; echoed by the peer.
    pub bus_id: u8,
    /// Zero on success; only meaningful in responses.
    pub return_code: u8,
    pub address: u16,
    pub flags: u16,
    len: u16,
    data: [u8; MAX_PAYLOAD],
}

impl WireMessage {
    /// Build a request frame.
    ///
    /// For a write `payload` is the data to send. For a read the peer only
    /// looks at the length, so pass a zeroed slice of the requested size.
    ///
    /// # Example
    ///
    /// ```
    /// use rpmsg_i2c::protocol::{Command, WireMessage};
    ///
    /// let msg = WireMessage::request(Command::Write, 1, 0x50, 0, &[0xAA]).unwrap();
    /// assert_eq!(msg.payload(), &[0xAA]);
    /// assert_eq!(msg.encode().len(), 34);
    /// ```
    pub fn request(
        command: Command,
        bus_id: u8,
        address: u16,
        flags: u16,
        payload: &[u8],
    ) -> Result<Self, FrameError> {
        let (len, data) = fill_data(payload)?;
        Ok(Self {
            category: CATEGORY,
            version: PROTOCOL_VERSION,
            message_type: MessageType::Request,
            command,
            priority: PRIORITY,
            bus_id,
            return_code: 0,
            address,
            flags,
            len,
            data,
        })
    }

    /// Build the response a peer sends back for `request`.
    pub fn response_to(
        request: &WireMessage,
        return_code: u8,
        payload: &[u8],
    ) -> Result<Self, FrameError> {
        let (len, data) = fill_data(payload)?;
        Ok(Self {
            message_type: MessageType::Response,
            return_code,
            len,
            data,
            ..request.clone()
        })
    }

    /// Valid bytes of the data area.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Value of the length field.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.message_type == MessageType::Response
    }

    #[inline]
    pub fn is_stop(&self) -> bool {
        flags::has_flag(self.flags, flags::STOP)
    }

    /// Encode to bytes (Little Endian).
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        buf[0] = self.category;
        buf[1..3].copy_from_slice(&self.version.to_le_bytes());
        buf[3] = self.message_type as u8;
        buf[4] = self.command as u8;
        buf[5] = self.priority;
        // 6..10 reserved
        buf[10] = self.bus_id;
        buf[11] = self.return_code;
        buf[12..14].copy_from_slice(&self.address.to_le_bytes());
        buf[14..16].copy_from_slice(&self.flags.to_le_bytes());
        buf[16..18].copy_from_slice(&self.len.to_le_bytes());
        buf[DATA_OFFSET..].copy_from_slice(&self.data);
        buf
    }

    /// Decode from bytes (Little Endian).
    ///
    /// The buffer must be exactly one frame and the length field must not
    /// exceed [`MAX_PAYLOAD`].
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() != FRAME_SIZE {
            return Err(FrameError::Malformed { len: buf.len() });
        }

        let len = u16::from_le_bytes([buf[16], buf[17]]);
        if len as usize > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                len: len as usize,
                max: MAX_PAYLOAD,
            });
        }

        let mut data = [0u8; MAX_PAYLOAD];
        data[..len as usize].copy_from_slice(&buf[DATA_OFFSET..DATA_OFFSET + len as usize]);

        Ok(Self {
            category: buf[0],
            version: u16::from_le_bytes([buf[1], buf[2]]),
            message_type: MessageType::try_from(buf[3])?,
            command: Command::try_from(buf[4])?,
            priority: buf[5],
            bus_id: buf[10],
            return_code: buf[11],
            address: u16::from_le_bytes([buf[12], buf[13]]),
            flags: u16::from_le_bytes([buf[14], buf[15]]),
            len,
            data,
        })
    }
}

fn fill_data(payload: &[u8]) -> Result<(u16, [u8; MAX_PAYLOAD]), FrameError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let mut data = [0u8; MAX_PAYLOAD];
    data[..payload.len()].copy_from_slice(payload);
    Ok((payload.len() as u16, data))
}
