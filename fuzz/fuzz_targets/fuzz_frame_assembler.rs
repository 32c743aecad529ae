#![no_main]

use libfuzzer_sys::fuzz_target;
use plc_modbus::FrameAssembler;

fuzz_target!(|chunks: Vec<Vec<u8>>| {
    let mut assembler = FrameAssembler::new();
    for chunk in &chunks {
        match assembler.extend_from_slice(chunk) {
            Ok(consumed) => assert!(consumed <= chunk.len()),
            Err(_) => return,
        }
        if assembler.is_complete() {
            let frame = assembler.as_slice();
            let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;
            assert_eq!(frame.len(), 6 + length);
            return;
        }
    }
});
