//! Codec throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use plc_modbus::{FrameAssembler, ModbusCodec, ModbusFunction};

fn read_response(quantity: usize) -> Vec<u8> {
    let mut frame = vec![0x00, 0x01, 0x00, 0x00];
    frame.extend_from_slice(&((3 + quantity * 2) as u16).to_be_bytes());
    frame.extend_from_slice(&[0x01, 0x03, (quantity * 2) as u8]);
    for i in 0..quantity {
        frame.extend_from_slice(&(i as u16).to_be_bytes());
    }
    frame
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    group.bench_function("read_holding_registers", |b| {
        b.iter(|| {
            ModbusCodec::encode_read_holding_registers(black_box(1), 1, black_box(0), 125)
        })
    });

    for size in [1usize, 10, 61].iter() {
        let values: Vec<f32> = (0..*size).map(|i| i as f32 * 1.5).collect();
        group.bench_with_input(
            BenchmarkId::new("write_multiple_registers_f32", size),
            &values,
            |b, values| {
                b.iter(|| {
                    ModbusCodec::encode_write_multiple_registers_f32(1, 1, 0, black_box(values))
                })
            },
        );
    }

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for quantity in [1usize, 10, 125].iter() {
        let frame = read_response(*quantity);
        group.bench_with_input(
            BenchmarkId::new("read_response", quantity),
            &frame,
            |b, frame| {
                b.iter(|| {
                    ModbusCodec::decode_response(
                        black_box(frame),
                        ModbusFunction::ReadHoldingRegisters,
                    )
                })
            },
        );
    }

    let frame = read_response(125);
    group.bench_function("assemble_in_7_byte_chunks", |b| {
        b.iter(|| {
            let mut assembler = FrameAssembler::new();
            for chunk in frame.chunks(7) {
                let _ = assembler.extend_from_slice(black_box(chunk));
            }
            assembler.is_complete()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
