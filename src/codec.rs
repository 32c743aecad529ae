//! # Modbus TCP frame codec
//!
//! Pure translation between typed register operations and MBAP frames.
//! Nothing here touches I/O; the transport feeds received bytes through a
//! [`FrameAssembler`] and hands the complete frame to
//! [`ModbusCodec::decode_response`].
//!
//! ## Request layout
//!
//! | Function | PDU after the function code |
//! |----------|-----------------------------|
//! | 0x03 | address, quantity |
//! | 0x06 | address, value |
//! | 0x10 | address, quantity, byte count, values |
//!
//! ## Example
//!
//! ```rust
//! use plc_modbus::codec::ModbusCodec;
//!
//! let frame = ModbusCodec::encode_read_holding_registers(1, 1, 0, 5).unwrap();
//! assert_eq!(
//!     &frame[..],
//!     &[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x05]
//! );
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::constants::{
    EXCEPTION_FLAG, MAX_ADU_SIZE, MAX_WRITE_F32, MBAP_HEADER_LEN, MBAP_LENGTH_PREFIX,
};
use crate::error::{ModbusError, ModbusResult};
use crate::float::{f32s_to_registers, registers_to_f32s};
use crate::pdu::{ModbusPdu, PduBuilder};
use crate::protocol::{
    MbapHeader, ModbusFunction, ModbusRequest, ModbusResponse, ResponsePayload, SlaveId,
    TransactionId,
};

/// Modbus TCP frame encoder/decoder
pub struct ModbusCodec;

// ============================================================================
// Encoding
// ============================================================================

impl ModbusCodec {
    /// Prefix `pdu` with an MBAP header
    fn frame(transaction_id: TransactionId, unit_id: SlaveId, pdu: &ModbusPdu) -> Bytes {
        let header = MbapHeader::new(transaction_id, unit_id, pdu.len());
        let mut buf = BytesMut::with_capacity(MBAP_HEADER_LEN + pdu.len());
        header.write_to(&mut buf);
        buf.put_slice(pdu.as_slice());
        buf.freeze()
    }

    /// FC03 request frame. `quantity` must be 1..=125.
    pub fn encode_read_holding_registers(
        transaction_id: TransactionId,
        unit_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Bytes> {
        let pdu = PduBuilder::build_read_holding_registers(address, quantity)?;
        Ok(Self::frame(transaction_id, unit_id, &pdu))
    }

    /// FC06 request frame
    pub fn encode_write_single_register(
        transaction_id: TransactionId,
        unit_id: SlaveId,
        address: u16,
        value: u16,
    ) -> ModbusResult<Bytes> {
        let pdu = PduBuilder::build_write_single_register(address, value)?;
        Ok(Self::frame(transaction_id, unit_id, &pdu))
    }

    /// FC16 request frame for 1..=123 registers.
    ///
    /// The MBAP length field is `7 + 2 * values.len()`.
    pub fn encode_write_multiple_registers(
        transaction_id: TransactionId,
        unit_id: SlaveId,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<Bytes> {
        let pdu = PduBuilder::build_write_multiple_registers(address, values)?;
        Ok(Self::frame(transaction_id, unit_id, &pdu))
    }

    /// FC16 request frame carrying 1..=61 floats, two registers each.
    pub fn encode_write_multiple_registers_f32(
        transaction_id: TransactionId,
        unit_id: SlaveId,
        address: u16,
        values: &[f32],
    ) -> ModbusResult<Bytes> {
        if values.is_empty() || values.len() > MAX_WRITE_F32 {
            return Err(ModbusError::invalid_data(format!(
                "Float count {} out of range 1..={}",
                values.len(),
                MAX_WRITE_F32
            )));
        }
        let registers = f32s_to_registers(values);
        Self::encode_write_multiple_registers(transaction_id, unit_id, address, &registers)
    }

    /// Encode any supported request
    pub fn encode_request(
        transaction_id: TransactionId,
        request: &ModbusRequest,
    ) -> ModbusResult<Bytes> {
        request.validate()?;
        let unit_id = request.slave_id;
        match request.function {
            ModbusFunction::ReadHoldingRegisters => Self::encode_read_holding_registers(
                transaction_id,
                unit_id,
                request.address,
                request.quantity,
            ),
            ModbusFunction::WriteSingleRegister => {
                let value = request.values.first().copied().ok_or_else(|| {
                    ModbusError::invalid_data("Write single register without a value")
                })?;
                Self::encode_write_single_register(transaction_id, unit_id, request.address, value)
            }
            ModbusFunction::WriteMultipleRegisters => Self::encode_write_multiple_registers(
                transaction_id,
                unit_id,
                request.address,
                &request.values,
            ),
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

impl ModbusCodec {
    /// Decode one complete response frame.
    ///
    /// `frame` must hold exactly one ADU. The transaction id is returned in
    /// the header and is checked by the caller, which knows what it issued.
    /// An exception response decodes to [`ModbusError::Exception`].
    pub fn decode_response(
        frame: &[u8],
        expected: ModbusFunction,
    ) -> ModbusResult<ModbusResponse> {
        if frame.len() < MBAP_HEADER_LEN + 1 {
            return Err(ModbusError::frame(format!(
                "Response too short: {} bytes (need at least {})",
                frame.len(),
                MBAP_HEADER_LEN + 1
            )));
        }

        let header = MbapHeader::parse(frame)?;
        if header.frame_len() != frame.len() {
            return Err(ModbusError::frame(format!(
                "MBAP length {} announces {} bytes, frame has {}",
                header.length,
                header.frame_len(),
                frame.len()
            )));
        }

        let pdu = ModbusPdu::from_slice(&frame[MBAP_HEADER_LEN..])?;
        let fc = pdu
            .function_code()
            .ok_or_else(|| ModbusError::frame("Empty response PDU"))?;

        if fc & EXCEPTION_FLAG != 0 {
            if pdu.len() != 2 {
                return Err(ModbusError::frame(format!(
                    "Exception PDU must be 2 bytes, got {}",
                    pdu.len()
                )));
            }
            if fc & !EXCEPTION_FLAG != expected.to_u8() {
                return Err(ModbusError::protocol(format!(
                    "Exception for function {:02X}, expected {:02X}",
                    fc & !EXCEPTION_FLAG,
                    expected.to_u8()
                )));
            }
            let code = pdu.exception_code().unwrap_or_default();
            debug!(
                "Exception response: function={:02X} code={:02X}",
                fc & !EXCEPTION_FLAG,
                code
            );
            return Err(ModbusError::exception(fc, code));
        }

        if fc != expected.to_u8() {
            let actual = ModbusFunction::from_u8(fc)?;
            return Err(ModbusError::protocol(format!(
                "Function code mismatch: expected {}, got {}",
                expected, actual
            )));
        }

        if pdu.len() < expected.min_response_pdu_len() {
            return Err(ModbusError::frame(format!(
                "{} response PDU too short: {} bytes",
                expected.name(),
                pdu.len()
            )));
        }

        let payload = match expected {
            ModbusFunction::ReadHoldingRegisters => {
                let data = &pdu.as_slice()[2..];
                let byte_count = pdu.as_slice()[1] as usize;
                if byte_count != data.len() || byte_count % 2 != 0 {
                    return Err(ModbusError::frame(format!(
                        "Byte count {} does not match {} data bytes",
                        byte_count,
                        data.len()
                    )));
                }
                let registers = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                ResponsePayload::Registers(registers)
            }
            ModbusFunction::WriteSingleRegister | ModbusFunction::WriteMultipleRegisters => {
                if pdu.len() != 5 {
                    return Err(ModbusError::frame(format!(
                        "{} response PDU must be 5 bytes, got {}",
                        expected.name(),
                        pdu.len()
                    )));
                }
                let address = pdu.u16_at(1).unwrap_or_default();
                let second = pdu.u16_at(3).unwrap_or_default();
                if expected == ModbusFunction::WriteSingleRegister {
                    ResponsePayload::SingleRegister {
                        address,
                        value: second,
                    }
                } else {
                    ResponsePayload::MultipleRegisters {
                        address,
                        quantity: second,
                    }
                }
            }
        };

        Ok(ModbusResponse {
            header,
            function: expected,
            payload,
        })
    }

    /// Pair registers into `quantity` floats.
    ///
    /// Fails unless exactly `2 * quantity` registers are present.
    pub fn decode_holding_registers_f32(
        registers: &[u16],
        quantity: usize,
    ) -> ModbusResult<Vec<f32>> {
        if registers.len() != quantity * 2 {
            return Err(ModbusError::invalid_data(format!(
                "Expected {} registers for {} floats, got {}",
                quantity * 2,
                quantity,
                registers.len()
            )));
        }
        registers_to_f32s(registers)
    }
}

// ============================================================================
// Frame assembly
// ============================================================================

/// Accumulates one response frame from arbitrarily fragmented reads.
///
/// The first six bytes carry the length field; after that the assembler
/// knows the exact frame size and never asks for bytes beyond it, so a
/// following frame on the same stream is left unread.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    data: [u8; MAX_ADU_SIZE],
    filled: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            data: [0; MAX_ADU_SIZE],
            filled: 0,
        }
    }

    /// Bytes still needed before the next decision point.
    ///
    /// Returns `6 - filled` until the MBAP prefix is in, then the rest of
    /// the frame. Fails as soon as the prefix shows a bad protocol id or
    /// length.
    pub fn remaining(&self) -> ModbusResult<usize> {
        if self.filled < MBAP_LENGTH_PREFIX {
            return Ok(MBAP_LENGTH_PREFIX - self.filled);
        }
        let length = MbapHeader::declared_length(&self.data[..MBAP_LENGTH_PREFIX])?;
        Ok(MBAP_LENGTH_PREFIX + length - self.filled)
    }

    /// Writable window of at most `n` bytes
    pub fn unfilled_mut(&mut self, n: usize) -> &mut [u8] {
        let end = (self.filled + n).min(MAX_ADU_SIZE);
        &mut self.data[self.filled..end]
    }

    /// Record `n` bytes written into the window from [`Self::unfilled_mut`]
    pub fn advance(&mut self, n: usize) {
        self.filled = (self.filled + n).min(MAX_ADU_SIZE);
    }

    /// Copy in as much of `input` as the current frame accepts.
    ///
    /// Returns the number of bytes consumed.
    pub fn extend_from_slice(&mut self, input: &[u8]) -> ModbusResult<usize> {
        let mut consumed = 0;
        while consumed < input.len() {
            let need = self.remaining()?;
            if need == 0 {
                break;
            }
            let take = need.min(input.len() - consumed);
            self.unfilled_mut(take)
                .copy_from_slice(&input[consumed..consumed + take]);
            self.advance(take);
            consumed += take;
        }
        Ok(consumed)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.remaining(), Ok(0)) && self.filled >= MBAP_LENGTH_PREFIX
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    pub fn reset(&mut self) {
        self.filled = 0;
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
