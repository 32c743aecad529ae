#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use plc_modbus::{ModbusCodec, ModbusFunction};

#[derive(Debug, Arbitrary)]
struct Input {
    function: u8,
    frame: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let expected = match input.function % 3 {
        0 => ModbusFunction::ReadHoldingRegisters,
        1 => ModbusFunction::WriteSingleRegister,
        _ => ModbusFunction::WriteMultipleRegisters,
    };

    if let Ok(response) = ModbusCodec::decode_response(&input.frame, expected) {
        // A decoded frame is always exactly as long as its header claims
        assert_eq!(response.header.frame_len(), input.frame.len());
        assert_eq!(response.function, expected);
    }
});
