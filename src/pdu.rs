//! Modbus PDU on a fixed-size stack buffer
//!
//! A PDU never exceeds 253 bytes, so building one needs no heap allocation.

use tracing::debug;

use crate::constants::{
    EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS,
    FC_WRITE_SINGLE_REGISTER, MAX_PDU_SIZE, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS,
};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::check_register_range;

/// PDU bytes: function code followed by its payload
#[derive(Debug, Clone)]
pub struct ModbusPdu {
    data: [u8; MAX_PDU_SIZE],
    len: usize,
}

impl ModbusPdu {
    /// Create an empty PDU
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    /// Copy a received PDU out of a frame
    pub fn from_slice(data: &[u8]) -> ModbusResult<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::frame(format!(
                "PDU too large: {} bytes (max {})",
                data.len(),
                MAX_PDU_SIZE
            )));
        }

        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();

        match pdu.function_code() {
            Some(fc) if pdu.is_exception() => debug!(
                "PDU parsed: FC={:02X} (Exception: {}), exception_code={:02X}",
                fc,
                Self::function_code_description(fc),
                pdu.exception_code().unwrap_or(0)
            ),
            Some(fc) => debug!(
                "PDU parsed: FC={:02X} ({}), data_len={}",
                fc,
                Self::function_code_description(fc),
                pdu.len - 1
            ),
            None => debug!("PDU parsed: empty PDU"),
        }

        Ok(pdu)
    }

    /// Push a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> ModbusResult<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(ModbusError::invalid_data("PDU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push u16 in big-endian
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> ModbusResult<()> {
        if self.len + 2 > MAX_PDU_SIZE {
            return Err(ModbusError::invalid_data("PDU buffer full"));
        }
        self.data[self.len..self.len + 2].copy_from_slice(&value.to_be_bytes());
        self.len += 2;
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First byte, if any
    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code()
            .map(|fc| fc & EXCEPTION_FLAG != 0)
            .unwrap_or(false)
    }

    /// Exception code byte of an exception PDU
    #[inline]
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() && self.len > 1 {
            Some(self.data[1])
        } else {
            None
        }
    }

    /// Big-endian u16 at `offset`, bounds-checked
    #[inline]
    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        self.as_slice()
            .get(offset..offset + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// Human-readable function code description
    pub fn function_code_description(fc: u8) -> &'static str {
        match fc & !EXCEPTION_FLAG {
            FC_READ_HOLDING_REGISTERS => "Read Holding Registers",
            FC_WRITE_SINGLE_REGISTER => "Write Single Register",
            FC_WRITE_MULTIPLE_REGISTERS => "Write Multiple Registers",
            _ => "Unknown Function",
        }
    }
}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent PDU builder
pub struct PduBuilder {
    pdu: ModbusPdu,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            pdu: ModbusPdu::new(),
        }
    }

    #[inline]
    pub fn function_code(mut self, fc: u8) -> ModbusResult<Self> {
        self.pdu.push(fc)?;
        Ok(self)
    }

    #[inline]
    pub fn address(mut self, addr: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(addr)?;
        Ok(self)
    }

    #[inline]
    pub fn quantity(mut self, qty: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(qty)?;
        Ok(self)
    }

    #[inline]
    pub fn byte(mut self, b: u8) -> ModbusResult<Self> {
        self.pdu.push(b)?;
        Ok(self)
    }

    /// Append register values in big-endian
    #[inline]
    pub fn registers(mut self, values: &[u16]) -> ModbusResult<Self> {
        for &value in values {
            self.pdu.push_u16(value)?;
        }
        Ok(self)
    }

    pub fn build(self) -> ModbusPdu {
        if let Some(fc) = self.pdu.function_code() {
            debug!(
                "PDU built: FC={:02X} ({}), total_len={}",
                fc,
                ModbusPdu::function_code_description(fc),
                self.pdu.len()
            );
        }
        self.pdu
    }

    /// Build a read holding registers PDU (FC03)
    ///
    /// `quantity` must be 1..=125 and the range must stay inside the
    /// 16-bit address space.
    pub fn build_read_holding_registers(address: u16, quantity: u16) -> ModbusResult<ModbusPdu> {
        check_register_range(address, quantity as usize, MAX_READ_REGISTERS)?;
        Ok(PduBuilder::new()
            .function_code(FC_READ_HOLDING_REGISTERS)?
            .address(address)?
            .quantity(quantity)?
            .build())
    }

    /// Build a write single register PDU (FC06)
    pub fn build_write_single_register(address: u16, value: u16) -> ModbusResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(FC_WRITE_SINGLE_REGISTER)?
            .address(address)?
            .quantity(value)?
            .build())
    }

    /// Build a write multiple registers PDU (FC16)
    ///
    /// Byte count is `2 * values.len()`; 1..=123 values.
    pub fn build_write_multiple_registers(address: u16, values: &[u16]) -> ModbusResult<ModbusPdu> {
        check_register_range(address, values.len(), MAX_WRITE_REGISTERS)?;
        let quantity = values.len() as u16;
        let byte_count = (values.len() * 2) as u8;

        Ok(PduBuilder::new()
            .function_code(FC_WRITE_MULTIPLE_REGISTERS)?
            .address(address)?
            .quantity(quantity)?
            .byte(byte_count)?
            .registers(values)?
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdu_basic_operations() {
        let mut pdu = ModbusPdu::new();
        assert!(pdu.is_empty());

        pdu.push(0x03).unwrap();
        assert_eq!(pdu.function_code(), Some(0x03));
        assert!(!pdu.is_exception());

        pdu.push_u16(0x0100).unwrap();
        pdu.push_u16(0x000A).unwrap();

        assert_eq!(pdu.len(), 5);
        assert_eq!(pdu.as_slice(), &[0x03, 0x01, 0x00, 0x00, 0x0A]);
        assert_eq!(pdu.u16_at(1), Some(0x0100));
        assert_eq!(pdu.u16_at(4), None);
    }

    #[test]
    fn test_pdu_overflow() {
        let mut pdu = ModbusPdu::new();
        for _ in 0..MAX_PDU_SIZE {
            pdu.push(0).unwrap();
        }
        assert!(pdu.push(0).is_err());
        assert!(ModbusPdu::from_slice(&[0u8; MAX_PDU_SIZE + 1]).is_err());
    }

    #[test]
    fn test_exception_pdu() {
        let pdu = ModbusPdu::from_slice(&[0x83, 0x02]).unwrap();
        assert!(pdu.is_exception());
        assert_eq!(pdu.exception_code(), Some(0x02));
        assert_eq!(
            ModbusPdu::function_code_description(0x83),
            "Read Holding Registers"
        );
    }

    #[test]
    fn test_build_read_holding_registers() {
        let pdu = PduBuilder::build_read_holding_registers(0x006B, 3).unwrap();
        assert_eq!(pdu.as_slice(), &[0x03, 0x00, 0x6B, 0x00, 0x03]);
    }

    #[test]
    fn test_build_read_quantity_bounds() {
        assert!(PduBuilder::build_read_holding_registers(0, 0).is_err());
        assert!(PduBuilder::build_read_holding_registers(0, 125).is_ok());
        assert!(PduBuilder::build_read_holding_registers(0, 126).is_err());
    }

    #[test]
    fn test_build_write_single_register() {
        let pdu = PduBuilder::build_write_single_register(0x0001, 0x0003).unwrap();
        assert_eq!(pdu.as_slice(), &[0x06, 0x00, 0x01, 0x00, 0x03]);
    }

    #[test]
    fn test_build_write_multiple_registers() {
        let pdu = PduBuilder::build_write_multiple_registers(0x0001, &[0x000A, 0x0102]).unwrap();
        assert_eq!(
            pdu.as_slice(),
            &[0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn test_build_write_multiple_bounds() {
        assert!(PduBuilder::build_write_multiple_registers(0, &[]).is_err());
        let pdu = PduBuilder::build_write_multiple_registers(0, &[0; 123]).unwrap();
        assert_eq!(pdu.len(), 6 + 246);
        assert!(PduBuilder::build_write_multiple_registers(0, &[0; 124]).is_err());
    }
}
