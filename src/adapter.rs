//! Bus adapter and its builder.
//!
//! The [`AdapterBuilder`] provides a fluent API for configuring an adapter
//! on top of a shared [`Session`]. The [`RpmsgI2cAdapter`] is what the bus
//! subsystem calls into:
//! 1. Check every message against the adapter quirks
//! 2. Run the transfer through the sequencer
//! 3. Report the message count, or an error with an errno
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rpmsg_i2c::{AdapterBuilder, I2cMessage, Session};
//! use rpmsg_i2c::transport::{channel, spawn_delivery_task};
//!
//! let (endpoint, outbound) = channel(16);
//! let session = Arc::new(Session::with_endpoint(endpoint));
//! let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(16);
//! spawn_delivery_task(session.clone(), inbound_rx);
//!
//! let adapter = AdapterBuilder::new().bus_number(1).build(session)?;
//! let mut msgs = [I2cMessage::write(0x50, [0x00]), I2cMessage::read(0x50, 2)];
//! adapter.transfer(&mut msgs).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{I2cError, Result};
use crate::message::I2cMessage;
use crate::protocol::MAX_PAYLOAD;
use crate::sequencer::Sequencer;
use crate::session::{Session, DEFAULT_TIMEOUT};

/// Default adapter name.
pub const DEFAULT_ADAPTER_NAME: &str = "i2c-rpmsg-adapter";

bitflags! {
    /// Capabilities advertised to the bus subsystem (Linux `I2C_FUNC_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Functionality: u32 {
        const I2C = 0x0000_0001;
        const SMBUS_PEC = 0x0000_0008;
        const SMBUS_QUICK = 0x0001_0000;
        const SMBUS_READ_BYTE = 0x0002_0000;
        const SMBUS_WRITE_BYTE = 0x0004_0000;
        const SMBUS_READ_BYTE_DATA = 0x0008_0000;
        const SMBUS_WRITE_BYTE_DATA = 0x0010_0000;
        const SMBUS_READ_WORD_DATA = 0x0020_0000;
        const SMBUS_WRITE_WORD_DATA = 0x0040_0000;
        const SMBUS_PROC_CALL = 0x0080_0000;
        const SMBUS_READ_BLOCK_DATA = 0x0100_0000;
        const SMBUS_WRITE_BLOCK_DATA = 0x0200_0000;
        const SMBUS_READ_I2C_BLOCK = 0x0400_0000;
        const SMBUS_WRITE_I2C_BLOCK = 0x0800_0000;

        /// SMBus transactions the bus core can emulate on plain I2C.
        const SMBUS_EMUL = Self::SMBUS_QUICK.bits()
            | Self::SMBUS_READ_BYTE.bits()
            | Self::SMBUS_WRITE_BYTE.bits()
            | Self::SMBUS_READ_BYTE_DATA.bits()
            | Self::SMBUS_WRITE_BYTE_DATA.bits()
            | Self::SMBUS_READ_WORD_DATA.bits()
            | Self::SMBUS_WRITE_WORD_DATA.bits()
            | Self::SMBUS_PROC_CALL.bits()
            | Self::SMBUS_WRITE_BLOCK_DATA.bits()
            | Self::SMBUS_READ_I2C_BLOCK.bits()
            | Self::SMBUS_WRITE_I2C_BLOCK.bits()
            | Self::SMBUS_PEC.bits();
    }
}

/// Per-message limits the bus core enforces before calling the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterQuirks {
    pub max_read_len: usize,
    pub max_write_len: usize,
}

impl AdapterQuirks {
    /// Check every message, so a transfer is rejected before any frame is sent.
    pub fn check(&self, messages: &[I2cMessage]) -> Result<()> {
        for (index, msg) in messages.iter().enumerate() {
            let max = if msg.is_read() {
                self.max_read_len
            } else {
                self.max_write_len
            };
            if msg.len() > max {
                return Err(I2cError::QuirkViolation {
                    index,
                    len: msg.len(),
                    max,
                });
            }
        }
        Ok(())
    }
}

impl Default for AdapterQuirks {
    fn default() -> Self {
        Self {
            max_read_len: MAX_PAYLOAD,
            max_write_len: MAX_PAYLOAD,
        }
    }
}

/// Adapter configuration.
///
/// Deserializable so it can come from a board description:
///
/// ```
/// use rpmsg_i2c::AdapterConfig;
///
/// let config = AdapterConfig::from_json(r#"{ "bus_number": 3 }"#).unwrap();
/// assert_eq!(config.bus_number, 3);
/// assert_eq!(config.timeout_ms, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub name: String,
    /// Bus id sent to the peer; must match the bus number it registered.
    pub bus_number: u8,
    /// Per-exchange response timeout in milliseconds.
    pub timeout_ms: u64,
}

impl AdapterConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(I2cError::InvalidConfig(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.name.is_empty() {
            return Err(I2cError::InvalidConfig(
                "adapter name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ADAPTER_NAME.to_string(),
            bus_number: 0,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Builder for configuring and creating an adapter.
pub struct AdapterBuilder {
    config: AdapterConfig,
}

impl AdapterBuilder {
    pub fn new() -> Self {
        Self {
            config: AdapterConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the bus number.
    ///
    /// Default: 0
    pub fn bus_number(mut self, bus_number: u8) -> Self {
        self.config.bus_number = bus_number;
        self
    }

    /// Set the per-exchange response timeout.
    ///
    /// Rounded up to a whole millisecond. Default: 500 ms
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.config.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// Validate the configuration and create the adapter on `session`.
    pub fn build(self, session: Arc<Session>) -> Result<RpmsgI2cAdapter> {
        self.config.validate()?;
        tracing::info!(
            "Add I2C adapter {} (bus {}) successfully",
            self.config.name,
            self.config.bus_number
        );
        Ok(RpmsgI2cAdapter {
            sequencer: Sequencer::new(session, self.config.timeout()),
            quirks: AdapterQuirks::default(),
            config: self.config,
        })
    }
}

impl Default for AdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// I2C adapter whose bus lives on the remote processor.
///
/// Several adapters may share one session; their transfers are serialised
/// by the session's transfer lock.
pub struct RpmsgI2cAdapter {
    config: AdapterConfig,
    quirks: AdapterQuirks,
    sequencer: Sequencer,
}

impl RpmsgI2cAdapter {
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }

    /// Master transfer entry point.
    ///
    /// Returns the number of messages completed. On error nothing after the
    /// failing message was sent; [`I2cError::errno`] gives the value to
    /// report to the bus subsystem.
    pub async fn transfer(&self, messages: &mut [I2cMessage]) -> Result<usize> {
        self.quirks.check(messages)?;
        self.sequencer
            .run_transfer(messages, self.config.bus_number)
            .await
    }

    pub fn functionality(&self) -> Functionality {
        Functionality::I2C | Functionality::SMBUS_EMUL | Functionality::SMBUS_READ_BLOCK_DATA
    }

    pub fn quirks(&self) -> AdapterQuirks {
        self.quirks
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn bus_number(&self) -> u8 {
        self.config.bus_number
    }

    pub fn timeout(&self) -> Duration {
        self.sequencer.timeout()
    }

    pub fn session(&self) -> &Arc<Session> {
        self.sequencer.session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let adapter = AdapterBuilder::new()
            .build(Arc::new(Session::new()))
            .unwrap();

        assert_eq!(adapter.name(), "i2c-rpmsg-adapter");
        assert_eq!(adapter.bus_number(), 0);
        assert_eq!(adapter.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_builder_configuration() {
        let adapter = RpmsgI2cAdapter::builder()
            .name("sensors")
            .bus_number(4)
            .timeout(Duration::from_millis(250))
            .build(Arc::new(Session::new()))
            .unwrap();

        assert_eq!(adapter.name(), "sensors");
        assert_eq!(adapter.bus_number(), 4);
        assert_eq!(adapter.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = AdapterBuilder::new()
            .timeout(Duration::ZERO)
            .build(Arc::new(Session::new()));
        assert!(matches!(result, Err(I2cError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_rounds_timeout_up() {
        let adapter = AdapterBuilder::new()
            .timeout(Duration::from_micros(1900))
            .build(Arc::new(Session::new()))
            .unwrap();
        assert_eq!(adapter.timeout(), Duration::from_millis(2));

        let adapter = AdapterBuilder::new()
            .timeout(Duration::from_micros(900))
            .build(Arc::new(Session::new()))
            .unwrap();
        assert_eq!(adapter.timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_functionality_bits() {
        let adapter = AdapterBuilder::new()
            .build(Arc::new(Session::new()))
            .unwrap();

        assert_eq!(Functionality::SMBUS_EMUL.bits(), 0x0eff_0008);
        assert_eq!(adapter.functionality().bits(), 0x0fff_0009);
    }

    #[test]
    fn test_quirks_check() {
        let quirks = AdapterQuirks::default();
        assert_eq!(quirks.max_read_len, 16);
        assert_eq!(quirks.max_write_len, 16);

        let ok = [I2cMessage::write(0x50, [0u8; 16]), I2cMessage::read(0x50, 16)];
        assert!(quirks.check(&ok).is_ok());

        let bad = [I2cMessage::write(0x50, [0u8; 1]), I2cMessage::read(0x50, 17)];
        assert!(matches!(
            quirks.check(&bad),
            Err(I2cError::QuirkViolation {
                index: 1,
                len: 17,
                max: 16
            })
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config =
            AdapterConfig::from_json(r#"{ "name": "pmic", "bus_number": 2, "timeout_ms": 100 }"#)
                .unwrap();
        assert_eq!(config.name, "pmic");
        assert_eq!(config.bus_number, 2);
        assert_eq!(config.timeout(), Duration::from_millis(100));

        assert_eq!(AdapterConfig::from_json("{}").unwrap(), AdapterConfig::default());
    }

    #[test]
    fn test_config_from_json_errors() {
        assert!(matches!(
            AdapterConfig::from_json(r#"{ "bus_number": 300 }"#),
            Err(I2cError::Config(_))
        ));
        assert!(matches!(
            AdapterConfig::from_json(r#"{ "timeout_ms": 0 }"#),
            Err(I2cError::InvalidConfig(_))
        ));
    }
}
