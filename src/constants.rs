//! Modbus TCP protocol constants
//!
//! Limits follow the Modbus Application Protocol specification:
//! - Maximum PDU size: 253 bytes (inherited from the RS485 ADU limit of 256 bytes)
//! - Register limits are derived so that request and response PDUs fit in 253 bytes

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Bytes preceding the part counted by the MBAP length field.
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) = 6 bytes
pub const MBAP_LENGTH_PREFIX: usize = 6;

/// Full MBAP header length including the Unit ID.
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) + Unit ID(1) = 7 bytes
pub const MBAP_HEADER_LEN: usize = MBAP_LENGTH_PREFIX + 1;

/// Protocol identifier, always 0 for Modbus
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum MBAP length field value (Unit ID + PDU)
/// = 1 (Unit ID) + 253 (Max PDU) = 254 bytes
pub const MAX_MBAP_LENGTH: usize = 1 + MAX_PDU_SIZE;

/// Minimum MBAP length field value (Unit ID + Function Code)
pub const MIN_MBAP_LENGTH: usize = 2;

/// Largest complete Modbus TCP frame: 6 + 254 = 260 bytes
pub const MAX_ADU_SIZE: usize = MBAP_LENGTH_PREFIX + MAX_MBAP_LENGTH;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers for FC03 (Read Holding Registers)
///
/// Response PDU: Function Code(1) + Byte Count(1) + N × 2 ≤ 253
/// Therefore: N ≤ (253 - 2) / 2 = 125.5 → 125 registers
pub const MAX_READ_REGISTERS: usize = 125;

/// Maximum number of registers for FC16 (Write Multiple Registers)
///
/// Request PDU: Function Code(1) + Address(2) + Quantity(2) + Byte Count(1) + N × 2 ≤ 253
/// Therefore: N ≤ (253 - 6) / 2 = 123.5 → 123 registers
pub const MAX_WRITE_REGISTERS: usize = 123;

/// Registers occupied by one `f32` value
pub const REGISTERS_PER_F32: usize = 2;

/// Maximum number of `f32` values in one FC03 read (2 × 62 = 124 ≤ 125)
pub const MAX_READ_F32: usize = MAX_READ_REGISTERS / REGISTERS_PER_F32;

/// Maximum number of `f32` values in one FC16 write (2 × 61 = 122 ≤ 123)
pub const MAX_WRITE_F32: usize = MAX_WRITE_REGISTERS / REGISTERS_PER_F32;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// High bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Server Device Failure
pub const EXCEPTION_SERVER_DEVICE_FAILURE: u8 = 0x04;

/// Acknowledge
pub const EXCEPTION_ACKNOWLEDGE: u8 = 0x05;

/// Server Device Busy
pub const EXCEPTION_SERVER_DEVICE_BUSY: u8 = 0x06;

/// Memory Parity Error
pub const EXCEPTION_MEMORY_PARITY_ERROR: u8 = 0x08;

/// Gateway Path Unavailable
pub const EXCEPTION_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;

/// Gateway Target Device Failed to Respond
pub const EXCEPTION_GATEWAY_TARGET_FAILED: u8 = 0x0B;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MBAP_LENGTH_PREFIX, 6);
        assert_eq!(MBAP_HEADER_LEN, 7);
        assert_eq!(MAX_PDU_SIZE, 253);
        assert_eq!(MAX_MBAP_LENGTH, 254);
        assert_eq!(MAX_ADU_SIZE, 260);
    }

    #[test]
    fn test_register_limits() {
        let read_pdu_size = 1 + 1 + (MAX_READ_REGISTERS * 2);
        assert!(read_pdu_size <= MAX_PDU_SIZE);
        assert_eq!(MAX_READ_REGISTERS, 125);

        let write_pdu_size = 1 + 2 + 2 + 1 + (MAX_WRITE_REGISTERS * 2);
        assert!(write_pdu_size <= MAX_PDU_SIZE);
        assert_eq!(MAX_WRITE_REGISTERS, 123);
    }

    #[test]
    fn test_float_limits() {
        assert_eq!(MAX_READ_F32, 62);
        assert_eq!(MAX_WRITE_F32, 61);

        // The widest float write still has a length field well inside u16
        let mbap_length = 7 + MAX_WRITE_F32 * 4;
        assert!(mbap_length <= MAX_MBAP_LENGTH);
    }
}
