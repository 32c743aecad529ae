//! # PLC Modbus - Modbus TCP client for holding registers
//!
//! An async Modbus TCP client for talking to PLCs: MBAP framing, transaction
//! tracking and a typed error model, with helpers for `f32` values stored in
//! register pairs.
//!
//! ## Features
//!
//! - **Async**: Tokio streams, one deadline per connect/send/receive
//! - **Strict framing**: responses are accumulated by MBAP length and fully
//!   validated before any value is returned
//! - **Stack-allocated PDU**: request PDUs are built without heap allocation
//! - **No hidden retries**: failures close the connection and are reported
//!   as-is; reconnect policy belongs to the caller
//! - **Statistics**: per-connection request, error and byte counters
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Client |
//! |------|----------|--------|
//! | 0x03 | Read Holding Registers | ✅ |
//! | 0x06 | Write Single Register | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plc_modbus::{ModbusTcpClient, ModbusClient, ModbusResult};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     // Connect to Modbus TCP server
//!     let mut client = ModbusTcpClient::from_address("127.0.0.1:502", Duration::from_secs(5)).await?;
//!
//!     // Read holding registers
//!     let values = client.read_03(1, 0, 5).await?;
//!     println!("Read registers: {:?}", values);
//!
//!     // Floats occupy two registers each
//!     let floats = client.read_03_f32(1, 5, 3).await?;
//!     println!("Read floats: {:?}", floats);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Stack-allocated PDU with fixed array
pub mod pdu;

/// Modbus protocol definitions and message handling
pub mod protocol;

/// Float32 register pair convention
pub mod float;

/// MBAP frame encoding, decoding and assembly
pub mod codec;

/// Exchange engine over an async byte stream
pub mod transport;

/// Modbus client implementations
pub mod client;

/// Client connection settings
pub mod config;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use plc_modbus::tokio) ===
pub use tokio;

// === Core client API ===
pub use client::{GenericModbusClient, ModbusClient, ModbusTcpClient};
pub use config::ClientConfig;

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use protocol::{
    MbapHeader, ModbusException, ModbusFunction, ModbusRequest, ModbusResponse, ResponsePayload,
    SlaveId, TransactionId,
};

// === Codec ===
pub use codec::{FrameAssembler, ModbusCodec};
pub use float::{f32_to_registers, f32s_to_registers, registers_to_f32, registers_to_f32s};

// === Transport and monitoring ===
pub use transport::{ExchangeState, ModbusTransport, TcpTransport, TransportStats};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    MAX_PDU_SIZE, MAX_READ_F32, MAX_READ_REGISTERS, MAX_WRITE_F32, MAX_WRITE_REGISTERS,
};

// === PDU (advanced usage) ===
pub use pdu::{ModbusPdu, PduBuilder};

/// Default timeout for operations (5 seconds)
pub use config::DEFAULT_TIMEOUT_MS;

/// Modbus TCP default port
pub use config::DEFAULT_TCP_PORT;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("PLC Modbus v{} - Modbus TCP holding register client", VERSION)
}
