//! Criterion benchmarks for the individual kernel codecs.
//!
//! Run with:
//!   cargo bench --bench kernels

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use density::format::CompressionMode;
use density::kernel::{Kernel, KernelDecode, KernelDecoder, KernelEncode, KernelStatus};
use density::memory::{OutCursor, Teleport};

fn synthetic_corpus(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 2654435761u64 as usize) % 251) as u8).collect()
}

fn compress_all(mode: CompressionMode, data: &[u8]) -> Vec<u8> {
    let mut kernel = Kernel::new_encode(mode, 6);
    let mut dst = vec![0u8; data.len() * 2 + 4096];
    let written = {
        let mut tp = Teleport::new(data);
        let mut out = OutCursor::new(&mut dst);
        // `finish` can legitimately suspend on efficiency-check/new-block
        // advisories at a dictionary-reset boundary; a real caller (the
        // block layer) reacts to those, this benchmark just keeps driving.
        loop {
            match kernel.finish(&mut tp, &mut out, None) {
                KernelStatus::Ready => break,
                KernelStatus::InfoEfficiencyCheck | KernelStatus::InfoNewBlock => continue,
                other => panic!("unexpected kernel status: {other:?}"),
            }
        }
        out.used()
    };
    dst.truncate(written);
    dst
}

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_compress_decompress");

    for &size in &[65_536usize, 262_144] {
        let data = synthetic_corpus(size);

        for mode in [CompressionMode::Copy, CompressionMode::Chameleon, CompressionMode::Cheetah] {
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}_encode"), size),
                &data,
                |b, data| {
                    b.iter(|| compress_all(mode, data));
                },
            );

            let compressed = compress_all(mode, &data);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}_decode"), size),
                &compressed,
                |b, compressed| {
                    b.iter(|| {
                        let mut kernel = KernelDecoder::new_decode(mode, 6);
                        let mut restored = vec![0u8; size + 4096];
                        let mut tp = Teleport::new(compressed);
                        let mut out = OutCursor::new(&mut restored);
                        loop {
                            match kernel.finish(&mut tp, &mut out, None, 0) {
                                KernelStatus::Ready => break,
                                KernelStatus::InfoEfficiencyCheck | KernelStatus::InfoNewBlock => {
                                    continue
                                }
                                other => panic!("unexpected kernel status: {other:?}"),
                            }
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_kernels);
criterion_main!(benches);
