//! Criterion benchmarks for the end-to-end stream driver (main header/footer
//! + block framing + kernel codec).
//!
//! Run with:
//!   cargo bench --bench stream

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use density::format::{BlockType, CompressionMode};
use density::{compress, decompress};

fn synthetic_corpus(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 2654435761u64 as usize) % 251) as u8).collect()
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_compress_decompress");

    for &size in &[65_536usize, 1_048_576] {
        let data = synthetic_corpus(size);

        for mode in [CompressionMode::Copy, CompressionMode::Chameleon, CompressionMode::Cheetah] {
            let mut compressed = vec![0u8; size * 2 + 4096];

            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}_compress"), size),
                &data,
                |b, data| {
                    b.iter(|| {
                        compress(data, &mut compressed, mode, BlockType::WithHashsumIntegrityCheck)
                            .unwrap()
                    });
                },
            );

            let report = compress(
                &data,
                &mut compressed,
                mode,
                BlockType::WithHashsumIntegrityCheck,
            )
            .unwrap();
            compressed.truncate(report.bytes_written as usize);

            let mut restored = vec![0u8; size + 4096];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}_decompress"), size),
                &compressed,
                |b, compressed| {
                    b.iter(|| decompress(compressed, &mut restored).unwrap());
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_stream);
criterion_main!(benches);
