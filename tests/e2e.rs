//! End-to-end tests exercising the public one-shot `compress`/`decompress`
//! API across the three kernel modes, plus integrity and suspension
//! behavior that only shows up once the stream, block, and kernel layers
//! are wired together.

use density::format::{BlockType, CompressionMode};
use density::stream::{DecodeStatus, Decoder, EncodeStatus, Encoder};
use density::{compress, decompress};
use density::memory::{OutCursor, Teleport};

fn roundtrip(mode: CompressionMode, block_type: BlockType, data: &[u8]) -> Vec<u8> {
    let mut compressed = vec![0u8; data.len() * 2 + 4096];
    let report = compress(data, &mut compressed, mode, block_type).expect("compress should succeed");
    compressed.truncate(report.bytes_written as usize);

    let mut restored = vec![0u8; data.len() + 4096];
    let report = decompress(&compressed, &mut restored).expect("decompress should succeed");
    restored.truncate(report.bytes_written as usize);
    restored
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: COPY identity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn copy_mode_is_an_identity() {
    let data = b"the quick brown fox jumps over the lazy dog, repeatedly. ".repeat(200);
    let restored = roundtrip(CompressionMode::Copy, BlockType::Default, &data);
    assert_eq!(restored, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: chameleon on highly repetitive data (near-total dictionary hits)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chameleon_repetitive_data_roundtrips() {
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 5) as u8).collect();
    let restored = roundtrip(
        CompressionMode::Chameleon,
        BlockType::WithHashsumIntegrityCheck,
        &data,
    );
    assert_eq!(restored, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: chameleon on a mix of repeats and novel chunks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chameleon_mixed_data_roundtrips() {
    let mut data = Vec::new();
    for i in 0..50_000u32 {
        if i % 7 == 0 {
            data.extend_from_slice(&i.to_le_bytes());
        } else {
            data.extend_from_slice(&(i % 11).to_le_bytes());
        }
    }
    let restored = roundtrip(
        CompressionMode::Chameleon,
        BlockType::WithHashsumIntegrityCheck,
        &data,
    );
    assert_eq!(restored, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: cheetah on a predictable, LRU-friendly sequence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn cheetah_predicted_sequence_roundtrips() {
    let data: Vec<u8> = (0..100_000u32)
        .map(|i| ((i / 4) % 3) as u8)
        .collect();
    let restored = roundtrip(
        CompressionMode::Cheetah,
        BlockType::WithHashsumIntegrityCheck,
        &data,
    );
    assert_eq!(restored, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: a flipped body byte under an integrity-checked block is caught
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn integrity_mismatch_is_detected() {
    let data: Vec<u8> = (0..20_000u32).map(|i| (i % 43) as u8).collect();
    let mut compressed = vec![0u8; data.len() * 2 + 4096];
    let report = compress(
        &data,
        &mut compressed,
        CompressionMode::Cheetah,
        BlockType::WithHashsumIntegrityCheck,
    )
    .unwrap();
    compressed.truncate(report.bytes_written as usize);

    // Flip a byte well past the main+block headers, inside the block body.
    compressed[30] ^= 0xFF;

    let mut restored = vec![0u8; data.len() + 4096];
    let err = decompress(&compressed, &mut restored).unwrap_err();
    assert_eq!(err, density::BufferError::IntegrityCheckFail);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 6: stall/resume equivalence — feeding input in tiny chunks through the
// resumable streaming API produces byte-identical output to a single call.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn stall_resume_produces_identical_output() {
    let data: Vec<u8> = (0..60_000u32).map(|i| (i % 173) as u8).collect();

    let mut whole = vec![0u8; data.len() * 2 + 4096];
    let whole_report = compress(
        &data,
        &mut whole,
        CompressionMode::Chameleon,
        BlockType::WithHashsumIntegrityCheck,
    )
    .unwrap();
    whole.truncate(whole_report.bytes_written as usize);

    let mut enc = Encoder::init(
        CompressionMode::Chameleon,
        BlockType::WithHashsumIntegrityCheck,
        6,
    )
    .unwrap();
    let mut dst = vec![0u8; data.len() * 2 + 4096];
    let mut out = OutCursor::new(&mut dst);
    let mut chunks = data.chunks(17);
    let mut tp = Teleport::new(chunks.next().unwrap_or(&[]));
    for chunk in chunks {
        match enc.continue_(&mut tp, &mut out) {
            EncodeStatus::StallOnInput | EncodeStatus::Ready => {}
            other => panic!("unexpected encode status: {other:?}"),
        }
        tp.change_input_buffer(chunk);
    }
    assert_eq!(enc.finish(&mut tp, &mut out), EncodeStatus::Ready);
    let written = out.used();
    dst.truncate(written);

    assert_eq!(dst, whole);

    // Now decode the chunked output in small output-buffer slices and confirm
    // it restores the original data, exercising stall-on-output too. Must
    // clear the stream's minimum-output-buffer conformity gate (1024 bytes)
    // on the very first call, and stay large enough to guarantee forward
    // progress on a single chameleon unit (up to 64 chunks * 4 bytes each if
    // every chunk misses the dictionary) on every call after that.
    let mut dec = Decoder::init();
    let mut restored = Vec::new();
    let mut scratch = vec![0u8; 1024];
    let mut tp = Teleport::new(&dst);
    // The whole compressed stream is already buffered in `tp`, so `finish`
    // (not `continue_`) is the right call here: only the output buffer is
    // undersized, and `finish` knows to keep draining until it is Ready.
    loop {
        let (status, used) = {
            let mut out = OutCursor::new(&mut scratch);
            let status = dec.finish(&mut tp, &mut out);
            (status, out.used())
        };
        restored.extend_from_slice(&scratch[..used]);
        match status {
            DecodeStatus::StallOnOutput => {}
            DecodeStatus::Ready => break,
            other => panic!("unexpected decode status: {other:?}"),
        }
    }
    assert_eq!(restored, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 7: totals are monotone across a sequence of small continue_ calls
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn totals_are_monotone_across_suspensions() {
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 29) as u8).collect();
    let mut enc = Encoder::init(CompressionMode::Cheetah, BlockType::Default, 6).unwrap();
    let mut dst = vec![0u8; data.len() * 2 + 4096];
    let mut out = OutCursor::new(&mut dst);

    let mut chunks = data.chunks(13);
    let mut tp = Teleport::new(chunks.next().unwrap_or(&[]));
    let mut last_read = enc.total_read();
    let mut last_written = enc.total_written();
    for chunk in chunks {
        enc.continue_(&mut tp, &mut out);
        assert!(enc.total_read() >= last_read);
        assert!(enc.total_written() >= last_written);
        last_read = enc.total_read();
        last_written = enc.total_written();
        tp.change_input_buffer(chunk);
    }
    enc.finish(&mut tp, &mut out);
    assert!(enc.total_read() >= last_read);
    assert!(enc.total_written() >= last_written);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 8: empty input round-trips to empty output
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_input_roundtrips() {
    let restored = roundtrip(CompressionMode::Chameleon, BlockType::WithHashsumIntegrityCheck, &[]);
    assert!(restored.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 9: a stream spanning multiple on-wire blocks (encoded incrementally via
// repeated `continue_()` calls) still decodes correctly through a single
// one-shot `finish()`/`decompress()` call. Chameleon's block boundary falls
// every 2^11 signatures * 256 bytes/unit = 524,288 input bytes; driving the
// encoder well past that guarantees the compressed stream has more than one
// block, exercising the case where a block boundary falls mid-`finish()`
// rather than mid-`continue_()`.
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chameleon_multi_block_stream_decodes_in_one_shot() {
    let data: Vec<u8> = (0..700_000u32).map(|i| (i % 199) as u8).collect();

    let mut enc = Encoder::init(
        CompressionMode::Chameleon,
        BlockType::WithHashsumIntegrityCheck,
        6,
    )
    .unwrap();
    let mut dst = vec![0u8; data.len() * 2 + 4096];
    let mut out = OutCursor::new(&mut dst);
    let mut chunks = data.chunks(4096);
    let mut tp = Teleport::new(chunks.next().unwrap_or(&[]));
    for chunk in chunks {
        match enc.continue_(&mut tp, &mut out) {
            EncodeStatus::StallOnInput | EncodeStatus::Ready => {}
            other => panic!("unexpected encode status: {other:?}"),
        }
        tp.change_input_buffer(chunk);
    }
    assert_eq!(enc.finish(&mut tp, &mut out), EncodeStatus::Ready);
    let written = out.used();
    dst.truncate(written);

    let mut restored = vec![0u8; data.len() + 4096];
    let report = decompress(&dst, &mut restored).expect("one-shot decompress should succeed");
    restored.truncate(report.bytes_written as usize);
    assert_eq!(restored, data);
}
