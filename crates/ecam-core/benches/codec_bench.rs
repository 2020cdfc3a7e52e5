//! Criterion benchmarks for the ECAM frame codec.
//!
//! Measures request building, checksum validation, reassembly and decoding
//! for both protocol generations.
//!
//! Run with:
//! ```bash
//! cargo bench --package ecam-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ecam_core::domain::monitor::MonitorBlock;
use ecam_core::domain::names::{NameKind, NameRecord};
use ecam_core::protocol::checksum::{crc16, xor8};
use ecam_core::protocol::{
    build_request, decode, validate_checksum, Command, FrameReassembler, ProtocolStrategy,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn strategies() -> [(&'static str, ProtocolStrategy); 2] {
    [
        ("v1", ProtocolStrategy::v1()),
        ("v2", ProtocolStrategy::v2_ble()),
    ]
}

fn commands() -> Vec<(&'static str, Command)> {
    vec![
        ("Monitor", Command::Monitor(MonitorBlock::Data2)),
        (
            "ReadParameters",
            Command::ReadParameters {
                address: 100,
                count: 10,
            },
        ),
        (
            "WriteNames(6)",
            Command::WriteNames {
                kind: NameKind::Profile,
                first: 1,
                records: (0..6).map(|i| NameRecord::new(format!("User {i}"), i)).collect(),
            },
        ),
    ]
}

/// A sealed answer frame with `records` parameter records.
fn parameter_answer(strategy: &ProtocolStrategy, records: usize) -> Vec<u8> {
    let width = strategy.checksum().width();
    let mut frame = vec![0xD0, 0x00, 0x95, 0x0F, 0x00, 0x64];
    frame.extend(std::iter::repeat(0x01).take(records * 4));
    frame.resize(frame.len() + width, 0);
    frame[1] = (frame.len() - 1) as u8;
    strategy.seal(&mut frame);
    frame
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

/// Benchmarks the raw checksum functions over a full-size frame body.
fn bench_checksums(c: &mut Criterion) {
    let body = vec![0xA5u8; 255];
    let mut group = c.benchmark_group("checksum");
    group.bench_function("xor8", |b| b.iter(|| xor8(black_box(&body))));
    group.bench_function("crc16", |b| b.iter(|| crc16(black_box(&body))));
    group.finish();
}

/// Benchmarks `build_request` for representative commands on both variants.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_request");
    for (variant, strategy) in strategies() {
        for (name, command) in commands() {
            let id = format!("{variant}/{name}");
            group.bench_with_input(BenchmarkId::new("cmd", id), &command, |b, command| {
                b.iter(|| build_request(black_box(&strategy), black_box(command)).expect("build"))
            });
        }
    }
    group.finish();
}

/// Benchmarks reassembly from 20-byte fragments followed by checksum
/// validation and decoding; the path every notification takes.
fn bench_receive_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("receive_path");
    for (variant, strategy) in strategies() {
        let frame = parameter_answer(&strategy, 10);
        group.bench_with_input(BenchmarkId::new("params10", variant), &frame, |b, frame| {
            b.iter(|| {
                let mut reassembler = FrameReassembler::new();
                let mut complete = None;
                for fragment in frame.chunks(20) {
                    complete = reassembler.feed(black_box(fragment));
                }
                let complete = complete.expect("frame completes");
                assert!(validate_checksum(&strategy, &complete));
                decode(&strategy, &complete).expect("decode")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_checksums, bench_build, bench_receive_path);
criterion_main!(benches);
