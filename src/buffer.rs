//! One-shot buffer API: wraps the streaming `Encoder`/`Decoder` in an
//! ordinary `Result`-based call for callers who don't need incremental
//! control, the way the donor layers `compress_default`/`decompress_safe`
//! over its own streaming context.

use core::fmt;

use crate::format::{BlockType, CompressionMode};
use crate::memory::{OutCursor, Teleport};
use crate::stream::{DecodeStatus, Decoder, EncodeStatus, Encoder};

/// Outcome of a successful one-shot call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferReport {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Output region smaller than `minimum_output_buffer_size`, or too small
    /// to hold the compressed/decompressed result.
    OutputBufferTooSmall,
    /// The stream's process enumeration observed an unreachable state, or
    /// framing was violated (e.g. a truncated/corrupt compressed stream).
    DuringProcessing,
    /// Decode-side footer hash mismatch.
    IntegrityCheckFail,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BufferError::OutputBufferTooSmall => "output buffer too small",
            BufferError::DuringProcessing => "error during processing",
            BufferError::IntegrityCheckFail => "integrity check failed",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for BufferError {}

/// Compress `input` in one call. `output` must be large enough to hold the
/// entire compressed result (and at least `minimum_output_buffer_size`
/// bytes); there is no provision for partial output in the one-shot API.
pub fn compress(
    input: &[u8],
    output: &mut [u8],
    mode: CompressionMode,
    block_type: BlockType,
) -> Result<BufferReport, BufferError> {
    let mut encoder =
        Encoder::init(mode, block_type, crate::config::DEFAULT_DICTIONARY_RESET_CYCLE_SHIFT)
            .map_err(|_| BufferError::OutputBufferTooSmall)?;
    let mut tp = Teleport::new(input);
    let mut out = OutCursor::new(output);
    match encoder.finish(&mut tp, &mut out) {
        EncodeStatus::Ready => Ok(BufferReport {
            bytes_read: encoder.total_read(),
            bytes_written: encoder.total_written(),
        }),
        EncodeStatus::ErrorOutputBufferTooSmall => Err(BufferError::OutputBufferTooSmall),
        EncodeStatus::StallOnOutput => Err(BufferError::OutputBufferTooSmall),
        EncodeStatus::StallOnInput => Err(BufferError::DuringProcessing),
    }
}

/// Decompress `input` in one call. `output` must be large enough to hold
/// the entire decompressed result.
pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<BufferReport, BufferError> {
    let mut decoder = Decoder::init();
    let mut tp = Teleport::new(input);
    let mut out = OutCursor::new(output);
    match decoder.finish(&mut tp, &mut out) {
        DecodeStatus::Ready => Ok(BufferReport {
            bytes_read: decoder.total_read(),
            bytes_written: decoder.total_written(),
        }),
        DecodeStatus::ErrorIntegrityCheckFail => Err(BufferError::IntegrityCheckFail),
        DecodeStatus::ErrorInvalidInternalState => Err(BufferError::DuringProcessing),
        DecodeStatus::StallOnOutput => Err(BufferError::OutputBufferTooSmall),
        DecodeStatus::StallOnInput => Err(BufferError::DuringProcessing),
        DecodeStatus::ErrorOutputBufferTooSmall => Err(BufferError::OutputBufferTooSmall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_one_shot_api() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 89) as u8).collect();
        let mut compressed = vec![0u8; data.len() * 2 + 4096];
        let report = compress(
            &data,
            &mut compressed,
            CompressionMode::Chameleon,
            BlockType::WithHashsumIntegrityCheck,
        )
        .unwrap();
        compressed.truncate(report.bytes_written as usize);

        let mut restored = vec![0u8; data.len() + 4096];
        let report = decompress(&compressed, &mut restored).unwrap();
        restored.truncate(report.bytes_written as usize);
        assert_eq!(restored, data);
    }

    #[test]
    fn undersized_output_reports_error() {
        let data = vec![0u8; 100];
        let mut out = vec![0u8; 8];
        let err = compress(&data, &mut out, CompressionMode::Copy, BlockType::Default).unwrap_err();
        assert_eq!(err, BufferError::OutputBufferTooSmall);
    }

    #[test]
    fn corrupted_stream_fails_integrity_check() {
        let data: Vec<u8> = (0..5_000u32).map(|i| (i % 61) as u8).collect();
        let mut compressed = vec![0u8; data.len() * 2 + 4096];
        let report = compress(
            &data,
            &mut compressed,
            CompressionMode::Cheetah,
            BlockType::WithHashsumIntegrityCheck,
        )
        .unwrap();
        compressed.truncate(report.bytes_written as usize);
        // Flip a byte inside the block body, past the main+block headers
        // (which aren't hashed and wouldn't trip the integrity check).
        compressed[20] ^= 0xFF;

        let mut restored = vec![0u8; data.len() + 4096];
        let err = decompress(&compressed, &mut restored).unwrap_err();
        assert_eq!(err, BufferError::IntegrityCheckFail);
    }
}
