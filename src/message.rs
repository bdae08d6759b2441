//! I2C message descriptor handed in by the bus subsystem.

/// Flag bits of an I2C message, as used by the Linux `i2c_msg`.
///
/// Bits other than [`RD`] are not interpreted here; they travel to the
/// remote peer unchanged in the wire `flags` field.
pub mod flags {
    /// Read from the device (write when clear).
    pub const RD: u16 = 0x0001;
    /// Ten-bit device address.
    pub const TEN: u16 = 0x0010;
}

/// One segment of a combined I2C transfer.
///
/// The length of `buf` is the message's declared length: the number of
/// bytes to write, or the number of bytes requested by a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cMessage {
    /// 7-bit or 10-bit device address.
    pub address: u16,
    pub flags: u16,
    pub buf: Vec<u8>,
}

impl I2cMessage {
    /// A read of `len` bytes.
    pub fn read(address: u16, len: usize) -> Self {
        Self {
            address,
            flags: flags::RD,
            buf: vec![0; len],
        }
    }

    /// A write of `data`.
    pub fn write(address: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            flags: 0,
            buf: data.into(),
        }
    }

    /// Add extra flag bits (e.g. [`flags::TEN`]).
    pub fn with_flags(mut self, extra: u16) -> Self {
        self.flags |= extra;
        self
    }

    #[inline]
    pub fn is_read(&self) -> bool {
        self.flags & flags::RD != 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
