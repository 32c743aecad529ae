//! # Client configuration
//!
//! Everything needed to open a [`ModbusTcpClient`](crate::ModbusTcpClient):
//! server address, unit id and the per-operation timeout.
//!
//! Addresses must be IP literals. Host names are not resolved here, so a
//! bad address is reported as a [`ModbusError::Configuration`] before any
//! socket is opened.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{ModbusError, ModbusResult};
use crate::protocol::SlaveId;

/// Standard Modbus TCP port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Default timeout for connect, send and receive (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default unit id
pub const DEFAULT_SLAVE_ID: SlaveId = 1;

/// Connection settings for a Modbus TCP client.
///
/// # Example
///
/// ```rust
/// use plc_modbus::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::from_address("192.168.1.10:502")
///     .unwrap()
///     .with_slave_id(3)
///     .with_timeout(Duration::from_millis(1500));
///
/// assert_eq!(config.slave_id, 3);
/// assert_eq!(config.address.port(), 502);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server socket address
    pub address: SocketAddr,
    /// Default unit id for callers; every request still names its unit id
    pub slave_id: SlaveId,
    /// Deadline applied to connect, send and receive separately
    pub timeout: Duration,
    /// Hex-dump every frame at info level
    pub packet_logging: bool,
}

impl ClientConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            slave_id: DEFAULT_SLAVE_ID,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            packet_logging: false,
        }
    }

    /// Parse `"ip:port"`
    pub fn from_address(address: &str) -> ModbusResult<Self> {
        let address: SocketAddr = address.parse().map_err(|e| {
            ModbusError::configuration(format!("Invalid address '{}': {}", address, e))
        })?;
        Ok(Self::new(address))
    }

    /// Build from an IP literal and a port
    pub fn from_host_port(host: &str, port: u16) -> ModbusResult<Self> {
        let ip: IpAddr = host.parse().map_err(|e| {
            ModbusError::configuration(format!("Invalid host '{}': {}", host, e))
        })?;
        Ok(Self::new(SocketAddr::new(ip, port)))
    }

    pub fn with_slave_id(mut self, slave_id: SlaveId) -> Self {
        self.slave_id = slave_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    /// Reject settings no connection could work with
    pub fn validate(&self) -> ModbusResult<()> {
        if self.timeout.is_zero() {
            return Err(ModbusError::configuration("Timeout must be greater than zero"));
        }
        if self.address.port() == 0 {
            return Err(ModbusError::configuration("Port must not be 0"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            DEFAULT_TCP_PORT,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address.to_string(), "127.0.0.1:502");
        assert_eq!(config.slave_id, 1);
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert!(!config.packet_logging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_host_port() {
        let config = ClientConfig::from_host_port("10.0.0.7", 1502).unwrap();
        assert_eq!(config.address.to_string(), "10.0.0.7:1502");
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(matches!(
            ClientConfig::from_address("not-an-address"),
            Err(ModbusError::Configuration { .. })
        ));
        assert!(matches!(
            ClientConfig::from_address("127.0.0.1"),
            Err(ModbusError::Configuration { .. })
        ));
        assert!(matches!(
            ClientConfig::from_host_port("plc.local", 502),
            Err(ModbusError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ClientConfig::default().with_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ModbusError::Configuration { .. })
        ));
    }
}
