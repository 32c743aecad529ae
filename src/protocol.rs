//! Modbus TCP message definitions
//!
//! Typed requests and responses exchanged over an MBAP connection, together
//! with the function and exception codes this client understands.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::constants::{
    EXCEPTION_ACKNOWLEDGE, EXCEPTION_GATEWAY_PATH_UNAVAILABLE, EXCEPTION_GATEWAY_TARGET_FAILED,
    EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE, EXCEPTION_ILLEGAL_FUNCTION,
    EXCEPTION_MEMORY_PARITY_ERROR, EXCEPTION_SERVER_DEVICE_BUSY, EXCEPTION_SERVER_DEVICE_FAILURE,
    FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER,
    MAX_MBAP_LENGTH, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS, MBAP_HEADER_LEN,
    MBAP_LENGTH_PREFIX, MIN_MBAP_LENGTH, MODBUS_PROTOCOL_ID,
};
use crate::error::{ModbusError, ModbusResult};
use crate::float::f32s_to_registers;

/// Modbus unit identifier (slave address behind a TCP endpoint)
pub type SlaveId = u8;

/// MBAP transaction identifier
pub type TransactionId = u16;

/// Function codes supported by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusFunction {
    /// 0x03
    ReadHoldingRegisters,
    /// 0x06
    WriteSingleRegister,
    /// 0x10
    WriteMultipleRegisters,
}

impl ModbusFunction {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            Self::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            Self::WriteMultipleRegisters => FC_WRITE_MULTIPLE_REGISTERS,
        }
    }

    pub fn from_u8(code: u8) -> ModbusResult<Self> {
        match code {
            FC_READ_HOLDING_REGISTERS => Ok(Self::ReadHoldingRegisters),
            FC_WRITE_SINGLE_REGISTER => Ok(Self::WriteSingleRegister),
            FC_WRITE_MULTIPLE_REGISTERS => Ok(Self::WriteMultipleRegisters),
            _ => Err(ModbusError::invalid_function(code)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::WriteSingleRegister => "Write Single Register",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }

    /// Smallest valid response PDU, function code included
    pub fn min_response_pdu_len(self) -> usize {
        match self {
            // FC + byte count
            Self::ReadHoldingRegisters => 2,
            // FC + address + value / quantity
            Self::WriteSingleRegister | Self::WriteMultipleRegisters => 5,
        }
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.to_u8())
    }
}

/// Exception codes returned by a device in an exception response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusException {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailed,
    /// Code outside the standard set, kept as received
    Unknown(u8),
}

impl ModbusException {
    pub fn from_u8(code: u8) -> Self {
        match code {
            EXCEPTION_ILLEGAL_FUNCTION => Self::IllegalFunction,
            EXCEPTION_ILLEGAL_DATA_ADDRESS => Self::IllegalDataAddress,
            EXCEPTION_ILLEGAL_DATA_VALUE => Self::IllegalDataValue,
            EXCEPTION_SERVER_DEVICE_FAILURE => Self::ServerDeviceFailure,
            EXCEPTION_ACKNOWLEDGE => Self::Acknowledge,
            EXCEPTION_SERVER_DEVICE_BUSY => Self::ServerDeviceBusy,
            EXCEPTION_MEMORY_PARITY_ERROR => Self::MemoryParityError,
            EXCEPTION_GATEWAY_PATH_UNAVAILABLE => Self::GatewayPathUnavailable,
            EXCEPTION_GATEWAY_TARGET_FAILED => Self::GatewayTargetFailed,
            other => Self::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => EXCEPTION_ILLEGAL_FUNCTION,
            Self::IllegalDataAddress => EXCEPTION_ILLEGAL_DATA_ADDRESS,
            Self::IllegalDataValue => EXCEPTION_ILLEGAL_DATA_VALUE,
            Self::ServerDeviceFailure => EXCEPTION_SERVER_DEVICE_FAILURE,
            Self::Acknowledge => EXCEPTION_ACKNOWLEDGE,
            Self::ServerDeviceBusy => EXCEPTION_SERVER_DEVICE_BUSY,
            Self::MemoryParityError => EXCEPTION_MEMORY_PARITY_ERROR,
            Self::GatewayPathUnavailable => EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
            Self::GatewayTargetFailed => EXCEPTION_GATEWAY_TARGET_FAILED,
            Self::Unknown(code) => code,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "Illegal function",
            Self::IllegalDataAddress => "Illegal data address",
            Self::IllegalDataValue => "Illegal data value",
            Self::ServerDeviceFailure => "Server device failure",
            Self::Acknowledge => "Acknowledge",
            Self::ServerDeviceBusy => "Server device busy",
            Self::MemoryParityError => "Memory parity error",
            Self::GatewayPathUnavailable => "Gateway path unavailable",
            Self::GatewayTargetFailed => "Gateway target device failed to respond",
            Self::Unknown(_) => "Unknown exception",
        }
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.to_u8())
    }
}

// ============================================================================
// MBAP Header
// ============================================================================

/// Modbus Application Protocol header
///
/// `length` counts the bytes that follow the length field: the unit id plus
/// the whole PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: TransactionId,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: SlaveId,
}

impl MbapHeader {
    /// Header for a PDU of `pdu_len` bytes
    pub fn new(transaction_id: TransactionId, unit_id: SlaveId, pdu_len: usize) -> Self {
        Self {
            transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            length: (1 + pdu_len) as u16,
            unit_id,
        }
    }

    /// Append the 7 header bytes in network order
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.transaction_id);
        buf.put_u16(self.protocol_id);
        buf.put_u16(self.length);
        buf.put_u8(self.unit_id);
    }

    /// Parse the header at the start of `frame`.
    ///
    /// Rejects short input and a nonzero protocol id. The length field is
    /// range-checked but not compared with `frame.len()`; see
    /// [`ModbusCodec::decode_response`](crate::codec::ModbusCodec::decode_response).
    pub fn parse(frame: &[u8]) -> ModbusResult<Self> {
        if frame.len() < MBAP_HEADER_LEN {
            return Err(ModbusError::frame(format!(
                "Frame too short for MBAP header: {} bytes (need {})",
                frame.len(),
                MBAP_HEADER_LEN
            )));
        }
        let length = Self::declared_length(&frame[..MBAP_LENGTH_PREFIX])?;
        Ok(Self {
            transaction_id: u16::from_be_bytes([frame[0], frame[1]]),
            protocol_id: MODBUS_PROTOCOL_ID,
            length: length as u16,
            unit_id: frame[6],
        })
    }

    /// Validate the first six bytes of a frame and return its length field.
    pub fn declared_length(prefix: &[u8]) -> ModbusResult<usize> {
        if prefix.len() < MBAP_LENGTH_PREFIX {
            return Err(ModbusError::frame(format!(
                "MBAP prefix too short: {} bytes",
                prefix.len()
            )));
        }

        let protocol_id = u16::from_be_bytes([prefix[2], prefix[3]]);
        if protocol_id != MODBUS_PROTOCOL_ID {
            return Err(ModbusError::protocol(format!(
                "Invalid protocol ID: {} (expected 0)",
                protocol_id
            )));
        }

        let length = u16::from_be_bytes([prefix[4], prefix[5]]) as usize;
        if !(MIN_MBAP_LENGTH..=MAX_MBAP_LENGTH).contains(&length) {
            return Err(ModbusError::frame(format!(
                "MBAP length {} out of range {}..={}",
                length, MIN_MBAP_LENGTH, MAX_MBAP_LENGTH
            )));
        }

        Ok(length)
    }

    /// Total frame size announced by this header
    pub fn frame_len(&self) -> usize {
        MBAP_LENGTH_PREFIX + self.length as usize
    }

    /// PDU size announced by this header
    pub fn pdu_len(&self) -> usize {
        (self.length as usize).saturating_sub(1)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// A register operation addressed to one unit.
///
/// For FC06 `values` holds the single register; for FC03 it is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusRequest {
    pub slave_id: SlaveId,
    pub function: ModbusFunction,
    pub address: u16,
    pub quantity: u16,
    pub values: Vec<u16>,
}

impl ModbusRequest {
    /// FC03 read of `quantity` registers starting at `address`
    pub fn new_read(slave_id: SlaveId, address: u16, quantity: u16) -> Self {
        Self {
            slave_id,
            function: ModbusFunction::ReadHoldingRegisters,
            address,
            quantity,
            values: Vec::new(),
        }
    }

    /// FC06 write of one register
    pub fn new_write_single(slave_id: SlaveId, address: u16, value: u16) -> Self {
        Self {
            slave_id,
            function: ModbusFunction::WriteSingleRegister,
            address,
            quantity: 1,
            values: vec![value],
        }
    }

    /// FC16 write of consecutive registers
    pub fn new_write_multiple(slave_id: SlaveId, address: u16, values: Vec<u16>) -> Self {
        Self {
            slave_id,
            function: ModbusFunction::WriteMultipleRegisters,
            address,
            quantity: u16::try_from(values.len()).unwrap_or(u16::MAX),
            values,
        }
    }

    /// FC16 write of `f32` values, two registers each
    pub fn new_write_multiple_f32(slave_id: SlaveId, address: u16, values: &[f32]) -> Self {
        Self::new_write_multiple(slave_id, address, f32s_to_registers(values))
    }

    /// Check quantity and address limits before anything is encoded.
    pub fn validate(&self) -> ModbusResult<()> {
        match self.function {
            ModbusFunction::ReadHoldingRegisters => {
                check_register_range(self.address, self.quantity as usize, MAX_READ_REGISTERS)
            }
            ModbusFunction::WriteSingleRegister => {
                if self.values.len() != 1 || self.quantity != 1 {
                    return Err(ModbusError::invalid_data(format!(
                        "Write single register needs exactly one value, got {}",
                        self.values.len()
                    )));
                }
                Ok(())
            }
            ModbusFunction::WriteMultipleRegisters => {
                check_register_range(self.address, self.values.len(), MAX_WRITE_REGISTERS)?;
                if self.quantity as usize != self.values.len() {
                    return Err(ModbusError::invalid_data(format!(
                        "Quantity {} does not match {} values",
                        self.quantity,
                        self.values.len()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Reject counts outside `1..=max` and ranges running past register 65535.
pub(crate) fn check_register_range(address: u16, count: usize, max: usize) -> ModbusResult<()> {
    if count == 0 || count > max {
        return Err(ModbusError::invalid_data(format!(
            "Register quantity {} out of range 1..={}",
            count, max
        )));
    }
    if address as usize + count > u16::MAX as usize + 1 {
        return Err(ModbusError::invalid_data(format!(
            "Register range {}+{} exceeds address space",
            address, count
        )));
    }
    Ok(())
}

// ============================================================================
// Responses
// ============================================================================

/// Function-specific content of a successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    /// FC03: register values in address order
    Registers(Vec<u16>),
    /// FC06 echo
    SingleRegister { address: u16, value: u16 },
    /// FC16 echo
    MultipleRegisters { address: u16, quantity: u16 },
}

/// A decoded, non-exception response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusResponse {
    pub header: MbapHeader,
    pub function: ModbusFunction,
    pub payload: ResponsePayload,
}

impl ModbusResponse {
    pub fn transaction_id(&self) -> TransactionId {
        self.header.transaction_id
    }

    pub fn slave_id(&self) -> SlaveId {
        self.header.unit_id
    }

    /// Register values of an FC03 response
    pub fn registers(&self) -> ModbusResult<&[u16]> {
        match &self.payload {
            ResponsePayload::Registers(registers) => Ok(registers),
            _ => Err(ModbusError::protocol(format!(
                "{} response carries no register data",
                self.function.name()
            ))),
        }
    }

    pub fn into_registers(self) -> ModbusResult<Vec<u16>> {
        match self.payload {
            ResponsePayload::Registers(registers) => Ok(registers),
            _ => Err(ModbusError::protocol(format!(
                "{} response carries no register data",
                self.function.name()
            ))),
        }
    }

    /// Check that this response answers `request`: same function, the
    /// requested register count for reads, an exact echo for writes.
    pub fn validate_against(&self, request: &ModbusRequest) -> ModbusResult<()> {
        if self.function != request.function {
            return Err(ModbusError::protocol(format!(
                "Function code mismatch: expected {:02X}, got {:02X}",
                request.function.to_u8(),
                self.function.to_u8()
            )));
        }

        match &self.payload {
            ResponsePayload::Registers(registers) => {
                if registers.len() != request.quantity as usize {
                    return Err(ModbusError::protocol(format!(
                        "Register count mismatch: requested {}, got {}",
                        request.quantity,
                        registers.len()
                    )));
                }
            }
            ResponsePayload::SingleRegister { address, value } => {
                let expected = request.values.first().copied().unwrap_or_default();
                if *address != request.address || *value != expected {
                    return Err(ModbusError::protocol(format!(
                        "Write echo mismatch: sent {}={}, device echoed {}={}",
                        request.address, expected, address, value
                    )));
                }
            }
            ResponsePayload::MultipleRegisters { address, quantity } => {
                if *address != request.address || *quantity != request.quantity {
                    return Err(ModbusError::protocol(format!(
                        "Write echo mismatch: sent {}x{}, device echoed {}x{}",
                        request.address, request.quantity, address, quantity
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_codes() {
        for function in [
            ModbusFunction::ReadHoldingRegisters,
            ModbusFunction::WriteSingleRegister,
            ModbusFunction::WriteMultipleRegisters,
        ] {
            assert_eq!(ModbusFunction::from_u8(function.to_u8()).unwrap(), function);
        }
        assert_eq!(
            ModbusFunction::from_u8(0x01),
            Err(ModbusError::InvalidFunction { code: 0x01 })
        );
    }

    #[test]
    fn test_exception_codes() {
        assert_eq!(
            ModbusException::from_u8(0x02),
            ModbusException::IllegalDataAddress
        );
        assert_eq!(ModbusException::from_u8(0x0B).to_u8(), 0x0B);
        assert_eq!(ModbusException::from_u8(0x42), ModbusException::Unknown(0x42));
        assert_eq!(
            ModbusException::IllegalFunction.to_string(),
            "Illegal function (0x01)"
        );
    }

    #[test]
    fn test_header_write_and_parse() {
        let header = MbapHeader::new(0x1234, 1, 5);
        assert_eq!(header.length, 6);

        let mut buf = BytesMut::new();
        header.write_to(&mut buf);
        assert_eq!(&buf[..], &[0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01]);

        let parsed = MbapHeader::parse(&buf).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.frame_len(), 12);
        assert_eq!(parsed.pdu_len(), 5);
    }

    #[test]
    fn test_header_rejects_protocol_id() {
        let frame = [0x00, 0x01, 0x00, 0x01, 0x00, 0x06, 0x01];
        assert!(matches!(
            MbapHeader::parse(&frame),
            Err(ModbusError::Protocol { .. })
        ));
    }

    #[test]
    fn test_header_rejects_length_range() {
        let too_small = [0x00, 0x01, 0x00, 0x00, 0x00, 0x01];
        assert!(matches!(
            MbapHeader::declared_length(&too_small),
            Err(ModbusError::Frame { .. })
        ));

        let too_large = [0x00, 0x01, 0x00, 0x00, 0x00, 0xFF];
        assert!(matches!(
            MbapHeader::declared_length(&too_large),
            Err(ModbusError::Frame { .. })
        ));
    }

    #[test]
    fn test_request_validation() {
        assert!(ModbusRequest::new_read(1, 0, 0).validate().is_err());
        assert!(ModbusRequest::new_read(1, 0, 125).validate().is_ok());
        assert!(ModbusRequest::new_read(1, 0, 126).validate().is_err());

        // Range past the last register
        assert!(ModbusRequest::new_read(1, 0xFFFF, 1).validate().is_ok());
        assert!(ModbusRequest::new_read(1, 0xFFFF, 2).validate().is_err());

        assert!(ModbusRequest::new_write_multiple(1, 0, vec![])
            .validate()
            .is_err());
        assert!(ModbusRequest::new_write_multiple(1, 0, vec![0; 123])
            .validate()
            .is_ok());
        assert!(ModbusRequest::new_write_multiple(1, 0, vec![0; 124])
            .validate()
            .is_err());
    }

    #[test]
    fn test_float_request_layout() {
        let request = ModbusRequest::new_write_multiple_f32(1, 20, &[1.25, -2.0]);
        assert_eq!(request.quantity, 4);
        assert_eq!(request.values, vec![0x3FA0, 0x0000, 0xC000, 0x0000]);
    }

    #[test]
    fn test_validate_against_echo() {
        let request = ModbusRequest::new_write_single(1, 15, 456);
        let response = ModbusResponse {
            header: MbapHeader::new(1, 1, 5),
            function: ModbusFunction::WriteSingleRegister,
            payload: ResponsePayload::SingleRegister {
                address: 15,
                value: 456,
            },
        };
        assert!(response.validate_against(&request).is_ok());

        let wrong = ModbusResponse {
            payload: ResponsePayload::SingleRegister {
                address: 15,
                value: 457,
            },
            ..response
        };
        assert!(matches!(
            wrong.validate_against(&request),
            Err(ModbusError::Protocol { .. })
        ));
    }

    #[test]
    fn test_validate_against_register_count() {
        let request = ModbusRequest::new_read(1, 0, 3);
        let response = ModbusResponse {
            header: MbapHeader::new(1, 1, 6),
            function: ModbusFunction::ReadHoldingRegisters,
            payload: ResponsePayload::Registers(vec![1, 2]),
        };
        assert!(response.validate_against(&request).is_err());
    }
}
