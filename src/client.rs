//! High-level Modbus client implementations
//!
//! The client layer turns register operations into [`ModbusRequest`]s, hands
//! them to a [`ModbusTransport`] and unpacks the typed results. All protocol
//! checking happens below this layer; the client only chooses the request
//! and interprets the payload.
//!
//! # API Naming Convention
//!
//! | Function Code | Primary Name | Semantic Alias |
//! |---------------|--------------|----------------|
//! | 0x03 | `read_03()` | `read_holding_registers()` |
//! | 0x03 | `read_03_f32()` | `read_holding_registers_f32()` |
//! | 0x06 | `write_06()` | `write_single_register()` |
//! | 0x10 | `write_10()` | `write_multiple_registers()` |
//! | 0x10 | `write_10_f32()` | `write_multiple_registers_f32()` |
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use plc_modbus::{ClientConfig, ModbusClient, ModbusResult, ModbusTcpClient};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let config = ClientConfig::from_address("127.0.0.1:502")?;
//!     let mut client = ModbusTcpClient::connect(&config).await?;
//!
//!     let registers = client.read_03(1, 0, 5).await?;
//!     println!("Registers: {:?}", registers);
//!
//!     client.write_06(1, 15, 456).await?;
//!     client.write_10_f32(1, 20, &[1.23, 4.56]).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::debug;

use crate::codec::ModbusCodec;
use crate::config::ClientConfig;
use crate::constants::{MAX_READ_F32, MAX_WRITE_F32};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{ModbusRequest, ModbusResponse, SlaveId};
use crate::transport::{ModbusTransport, TcpTransport, TransportStats};

/// Register-level Modbus operations.
///
/// # Protocol Limits
///
/// | Operation | Limit |
/// |-----------|-------|
/// | Read Holding Registers (0x03) | 125 registers |
/// | Write Multiple Registers (0x10) | 123 registers |
/// | Read floats | 62 values |
/// | Write floats | 61 values |
pub trait ModbusClient: Send {
    /// Read holding registers (function code 0x03).
    ///
    /// # Arguments
    ///
    /// * `slave_id` - The Modbus unit ID
    /// * `address` - Starting register address (0-65535)
    /// * `quantity` - Number of registers to read (1-125)
    fn read_03(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<u16>>> + Send;

    /// Write single register (function code 0x06).
    fn write_06(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: u16,
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    /// Write multiple registers (function code 0x10).
    ///
    /// `values` must hold 1-123 registers.
    fn write_10(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[u16],
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    /// Read `count` floats starting at `address`, two registers each.
    ///
    /// See [`crate::float`] for the register layout.
    fn read_03_f32(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        count: u16,
    ) -> impl Future<Output = ModbusResult<Vec<f32>>> + Send
    where
        Self: Sized,
    {
        async move {
            if count == 0 || count as usize > MAX_READ_F32 {
                return Err(ModbusError::invalid_data(format!(
                    "Float count {} out of range 1..={}",
                    count, MAX_READ_F32
                )));
            }
            let registers = self.read_03(slave_id, address, count * 2).await?;
            ModbusCodec::decode_holding_registers_f32(&registers, count as usize)
        }
    }

    /// Write floats starting at `address`, two registers each (1-61 values).
    fn write_10_f32(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[f32],
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    /// Check if client is connected
    fn is_connected(&self) -> bool;

    /// Close the connection
    fn close(&mut self) -> impl Future<Output = ModbusResult<()>> + Send;

    /// Get transport statistics
    fn get_stats(&self) -> TransportStats;

    // Semantic aliases

    /// Alias for [`read_03`](Self::read_03)
    fn read_holding_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<u16>>> + Send {
        self.read_03(slave_id, address, quantity)
    }

    /// Alias for [`read_03_f32`](Self::read_03_f32)
    fn read_holding_registers_f32(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        count: u16,
    ) -> impl Future<Output = ModbusResult<Vec<f32>>> + Send
    where
        Self: Sized,
    {
        self.read_03_f32(slave_id, address, count)
    }

    /// Alias for [`write_06`](Self::write_06)
    fn write_single_register(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: u16,
    ) -> impl Future<Output = ModbusResult<()>> + Send {
        self.write_06(slave_id, address, value)
    }

    /// Alias for [`write_10`](Self::write_10)
    fn write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[u16],
    ) -> impl Future<Output = ModbusResult<()>> + Send {
        self.write_10(slave_id, address, values)
    }

    /// Alias for [`write_10_f32`](Self::write_10_f32)
    fn write_multiple_registers_f32(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[f32],
    ) -> impl Future<Output = ModbusResult<()>> + Send {
        self.write_10_f32(slave_id, address, values)
    }
}

/// Client over any [`ModbusTransport`]
pub struct GenericModbusClient<T: ModbusTransport> {
    transport: T,
}

impl<T: ModbusTransport> GenericModbusClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Execute a raw request
    pub async fn execute_request(
        &mut self,
        request: ModbusRequest,
    ) -> ModbusResult<ModbusResponse> {
        debug!(
            "Request: unit={} {} address={} quantity={}",
            request.slave_id, request.function, request.address, request.quantity
        );

        let response = self.transport.request(&request).await?;

        debug!(
            "Response: unit={} tid={} {:?}",
            response.slave_id(),
            response.transaction_id(),
            response.payload
        );
        Ok(response)
    }
}

impl<T: ModbusTransport> ModbusClient for GenericModbusClient<T> {
    async fn read_03(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        let request = ModbusRequest::new_read(slave_id, address, quantity);
        let response = self.execute_request(request).await?;
        response.into_registers()
    }

    async fn write_06(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        let request = ModbusRequest::new_write_single(slave_id, address, value);
        self.execute_request(request).await?;
        Ok(())
    }

    async fn write_10(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        let request = ModbusRequest::new_write_multiple(slave_id, address, values.to_vec());
        self.execute_request(request).await?;
        Ok(())
    }

    async fn write_10_f32(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[f32],
    ) -> ModbusResult<()> {
        if values.is_empty() || values.len() > MAX_WRITE_F32 {
            return Err(ModbusError::invalid_data(format!(
                "Float count {} out of range 1..={}",
                values.len(),
                MAX_WRITE_F32
            )));
        }
        let request = ModbusRequest::new_write_multiple_f32(slave_id, address, values);
        self.execute_request(request).await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        self.transport.close().await
    }

    fn get_stats(&self) -> TransportStats {
        self.transport.get_stats()
    }
}

/// Modbus TCP client bound to one server.
///
/// The configured unit id is kept for callers through [`Self::slave_id`];
/// the [`ModbusClient`] methods always take the unit id explicitly.
pub struct ModbusTcpClient {
    inner: GenericModbusClient<TcpTransport>,
    address: SocketAddr,
    slave_id: SlaveId,
}

impl ModbusTcpClient {
    /// Connect using a validated configuration
    pub async fn connect(config: &ClientConfig) -> ModbusResult<Self> {
        config.validate()?;
        let transport = TcpTransport::new(config.address, config.timeout)
            .await?
            .with_packet_logging(config.packet_logging);
        Ok(Self {
            inner: GenericModbusClient::new(transport),
            address: config.address,
            slave_id: config.slave_id,
        })
    }

    /// Connect with default unit id and no packet logging
    pub async fn new(addr: SocketAddr, timeout: Duration) -> ModbusResult<Self> {
        Self::connect(&ClientConfig::new(addr).with_timeout(timeout)).await
    }

    /// Connect to an `"ip:port"` address
    pub async fn from_address(addr: &str, timeout: Duration) -> ModbusResult<Self> {
        let config = ClientConfig::from_address(addr)?.with_timeout(timeout);
        Self::connect(&config).await
    }

    /// Get the server address
    pub fn server_address(&self) -> SocketAddr {
        self.address
    }

    /// Default unit id from the configuration, for callers to pass on
    pub fn slave_id(&self) -> SlaveId {
        self.slave_id
    }

    /// Enable or disable packet logging on existing client
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.inner.transport_mut().set_packet_logging(enabled);
    }

    /// Execute a raw request
    pub async fn execute_request(
        &mut self,
        request: ModbusRequest,
    ) -> ModbusResult<ModbusResponse> {
        self.inner.execute_request(request).await
    }
}

impl ModbusClient for ModbusTcpClient {
    async fn read_03(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.inner.read_03(slave_id, address, quantity).await
    }

    async fn write_06(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        self.inner.write_06(slave_id, address, value).await
    }

    async fn write_10(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        self.inner.write_10(slave_id, address, values).await
    }

    async fn write_10_f32(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[f32],
    ) -> ModbusResult<()> {
        self.inner.write_10_f32(slave_id, address, values).await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        self.inner.close().await
    }

    fn get_stats(&self) -> TransportStats {
        self.inner.get_stats()
    }
}
