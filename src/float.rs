//! # Float32 register convention
//!
//! Modbus itself only knows 16-bit registers. This client stores one IEEE-754
//! `f32` in two consecutive registers:
//!
//! - the high-order 16 bits go to the lower-addressed register,
//! - the low-order 16 bits go to the next register,
//! - bytes inside each register are big-endian, like every Modbus register.
//!
//! This is the "ABCD" layout. It is a choice made by this client and not part
//! of the Modbus standard; devices using word-swapped ("CDAB") floats will
//! read back garbage through these helpers.
//!
//! Conversions go through [`f32::to_bits`] / [`f32::from_bits`] and never do
//! arithmetic on the value, so every bit pattern survives a round trip,
//! including `-0.0` and NaN payloads.
//!
//! ```rust
//! use plc_modbus::float::{f32_to_registers, registers_to_f32};
//!
//! assert_eq!(f32_to_registers(1.25), [0x3FA0, 0x0000]);
//! assert_eq!(registers_to_f32([0x3FA0, 0x0000]), 1.25);
//! ```

use crate::constants::REGISTERS_PER_F32;
use crate::error::{ModbusError, ModbusResult};

/// Split one float into `[high word, low word]`
#[inline]
pub fn f32_to_registers(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, bits as u16]
}

/// Join `[high word, low word]` back into a float
#[inline]
pub fn registers_to_f32(registers: [u16; 2]) -> f32 {
    f32::from_bits((u32::from(registers[0]) << 16) | u32::from(registers[1]))
}

/// Expand floats into a flat register sequence, two registers per value
pub fn f32s_to_registers(values: &[f32]) -> Vec<u16> {
    values.iter().flat_map(|&v| f32_to_registers(v)).collect()
}

/// Pair registers `(2i, 2i + 1)` into floats.
///
/// Fails on an odd register count instead of dropping the trailing word.
pub fn registers_to_f32s(registers: &[u16]) -> ModbusResult<Vec<f32>> {
    if registers.len() % REGISTERS_PER_F32 != 0 {
        return Err(ModbusError::invalid_data(format!(
            "Odd register count {} cannot hold f32 values",
            registers.len()
        )));
    }

    Ok(registers
        .chunks_exact(REGISTERS_PER_F32)
        .map(|pair| registers_to_f32([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(f32_to_registers(1.25), [0x3FA0, 0x0000]);
        assert_eq!(f32_to_registers(25.0), [0x41C8, 0x0000]);
        assert_eq!(f32_to_registers(-2.0), [0xC000, 0x0000]);
        assert_eq!(registers_to_f32([0x4248, 0x0000]), 50.0);
    }

    #[test]
    fn test_negative_zero_keeps_sign() {
        let regs = f32_to_registers(-0.0);
        assert_eq!(regs, [0x8000, 0x0000]);
        assert!(registers_to_f32(regs).is_sign_negative());
    }

    #[test]
    fn test_nan_payload_preserved() {
        let nan = f32::from_bits(0x7FC0_1234);
        let back = registers_to_f32(f32_to_registers(nan));
        assert_eq!(back.to_bits(), 0x7FC0_1234);
    }

    #[test]
    fn test_slices() {
        let regs = f32s_to_registers(&[1.25, 50.0]);
        assert_eq!(regs, vec![0x3FA0, 0x0000, 0x4248, 0x0000]);
        assert_eq!(registers_to_f32s(&regs).unwrap(), vec![1.25, 50.0]);
    }

    #[test]
    fn test_odd_register_count() {
        assert!(matches!(
            registers_to_f32s(&[0x3FA0, 0x0000, 0x4248]),
            Err(ModbusError::InvalidData { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_bit_identical_roundtrip(bits in any::<u32>()) {
            let value = f32::from_bits(bits);
            let back = registers_to_f32(f32_to_registers(value));
            prop_assert_eq!(back.to_bits(), bits);
        }
    }
}
