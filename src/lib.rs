//! # rpmsg-i2c
//!
//! I2C bus adapter for buses owned by a remote processor.
//!
//! Each I2C message of a transfer is tunnelled to the remote core as one
//! fixed-size request frame over an asynchronous interprocessor channel
//! (rpmsg-style), and the core answers with one response frame.
//!
//! ## Architecture
//!
//! - **Adapter** ([`RpmsgI2cAdapter`]): entry point for the bus subsystem
//! - **Sequencer** ([`Sequencer`]): one exchange per message, STOP on the last
//! - **Session** ([`Session`]): single outstanding request, response matching,
//!   timeouts
//! - **Protocol** ([`protocol`]): the 34-byte wire frame
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rpmsg_i2c::{AdapterBuilder, I2cMessage, Session};
//!
//! #[tokio::main]
//! async fn main() -> rpmsg_i2c::Result<()> {
//!     let session = Arc::new(Session::with_endpoint(my_channel_endpoint()));
//!     // The channel's receive path calls session.on_frame_received(bytes).
//!
//!     let adapter = AdapterBuilder::new().bus_number(1).build(session)?;
//!     let mut msgs = [I2cMessage::write(0x50, [0x00]), I2cMessage::read(0x50, 2)];
//!     adapter.transfer(&mut msgs).await?;
//!     println!("{:02x?}", msgs[1].buf);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod message;
pub mod protocol;
pub mod transport;

mod adapter;
mod sequencer;
mod session;

pub use adapter::{
    AdapterBuilder, AdapterConfig, AdapterQuirks, Functionality, RpmsgI2cAdapter,
    DEFAULT_ADAPTER_NAME,
};
pub use error::{FrameError, I2cError, Result, TransportError};
pub use message::I2cMessage;
pub use sequencer::Sequencer;
pub use session::{Session, SessionStats, DEFAULT_TIMEOUT};
