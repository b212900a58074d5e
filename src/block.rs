//! The block layer: owns exactly one kernel codec, frames its output with
//! headers/footers/mode markers, and optionally hashes the underlying
//! uncompressed bytes for integrity checking.
//!
//! Ported from `densityxx/backups1/block.def.hpp`'s `block_encode_base_t`/
//! `block_decode_base_t` process enums (`write_block_header ->
//! write_block_mode_marker -> write_data -> write_block_footer -> …`).
//!
//! This crate's streaming contract has no out-of-band total-size bookkeeping
//! (see `kernel/mod.rs`'s header comment for the analogous per-unit problem),
//! so a decoder looping over blocks has no way to know whether the bytes
//! after one block's footer are another block header or the main footer.
//! This crate resolves it the same way: a one-byte continuation marker
//! (`1` = another block follows, `0` = this was the last block) is written
//! after every block's optional footer. This is a deliberate, crate-original
//! addition to the wire format, recorded in `DESIGN.md`.

use crate::format::{BlockType, CompressionMode};
use crate::hash::IntegrityHasher;
use crate::header::{
    BlockFooter, BlockHeader, BlockModeMarker, BLOCK_FOOTER_SIZE, BLOCK_HEADER_SIZE,
    BLOCK_MODE_MARKER_SIZE, MAIN_FOOTER_SIZE,
};
use crate::kernel::{Kernel, KernelDecode, KernelDecoder, KernelEncode, KernelStatus};
use crate::memory::{read_exact, OutCursor, Teleport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEncodeStatus {
    Ready,
    StallOnInput,
    StallOnOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDecodeStatus {
    Ready,
    StallOnInput,
    StallOnOutput,
    IntegrityCheckFail,
}

/// A small scratch buffer for output bytes that must be flushed atomically
/// from the block layer's point of view, but may need several calls (and
/// several `stall_on_output`s) to actually land in `out`. Mirrors the
/// accumulate-then-flush pattern the kernels use for their signature+body
/// units (see `kernel/chameleon.rs::try_flush`).
struct PendingBytes {
    buf: [u8; PENDING_BYTES_CAPACITY],
    len: usize,
    written: usize,
}

/// Largest atomic flush the block layer ever needs: the footer (16B) plus
/// the one-byte continuation marker.
const PENDING_BYTES_CAPACITY: usize = BLOCK_FOOTER_SIZE + 1;

impl PendingBytes {
    fn empty() -> Self {
        PendingBytes {
            buf: [0u8; PENDING_BYTES_CAPACITY],
            len: 0,
            written: 0,
        }
    }

    fn from_slice(data: &[u8]) -> Self {
        let mut buf = [0u8; PENDING_BYTES_CAPACITY];
        buf[..data.len()].copy_from_slice(data);
        PendingBytes {
            buf,
            len: data.len(),
            written: 0,
        }
    }

    fn flush(&mut self, out: &mut OutCursor<'_>) -> bool {
        while self.written < self.len {
            if out.available_bytes() == 0 {
                return false;
            }
            let n = (self.len - self.written).min(out.available_bytes());
            out.write(&self.buf[self.written..self.written + n]);
            self.written += n;
        }
        true
    }
}

enum EncodePhase {
    Header,
    Data,
    Footer,
    Done,
}

pub struct BlockEncoder {
    kernel: Kernel,
    mode: CompressionMode,
    block_type: BlockType,
    hasher: Option<IntegrityHasher>,
    phase: EncodePhase,
    pending: PendingBytes,
    first_block: bool,
    done_after_footer: bool,
    /// Bytes this block layer has itself emitted so far, used to compute
    /// `relative_position` back-pointers. Offsets are relative to the start
    /// of the block layer's own byte stream (i.e. right after the main
    /// header), not the absolute stream offset.
    bytes_emitted: u64,
    block_start: u64,
    prev_block_start: u64,
    block_count: u32,
}

impl BlockEncoder {
    pub fn new(mode: CompressionMode, block_type: BlockType, dict_reset_cycle_shift: u8) -> Self {
        let mut encoder = BlockEncoder {
            kernel: Kernel::new_encode(mode, dict_reset_cycle_shift),
            mode,
            block_type,
            hasher: None,
            phase: EncodePhase::Header,
            pending: PendingBytes::empty(),
            first_block: true,
            done_after_footer: false,
            bytes_emitted: 0,
            block_start: 0,
            prev_block_start: 0,
            block_count: 1,
        };
        encoder.prepare_header();
        encoder
    }

    fn prepare_header(&mut self) {
        self.block_start = self.bytes_emitted;
        let relative_position = (self.block_start - self.prev_block_start) as u32;
        let mut bytes = [0u8; BLOCK_HEADER_SIZE + BLOCK_MODE_MARKER_SIZE];
        BlockHeader { relative_position }.write(&mut bytes[..BLOCK_HEADER_SIZE]);
        let mut len = BLOCK_HEADER_SIZE;
        if self.first_block {
            BlockModeMarker {
                mode: self.mode as u8,
            }
            .write(&mut bytes[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + BLOCK_MODE_MARKER_SIZE]);
            len += BLOCK_MODE_MARKER_SIZE;
        }
        self.pending = PendingBytes::from_slice(&bytes[..len]);
    }

    fn prepare_footer(&mut self) {
        let mut bytes = [0u8; BLOCK_FOOTER_SIZE + 1];
        let mut len = 0;
        if self.block_type == BlockType::WithHashsumIntegrityCheck {
            let (hashsum1, hashsum2) = self.hasher.take().expect("hasher set on block start").finish();
            BlockFooter { hashsum1, hashsum2 }.write(&mut bytes[..BLOCK_FOOTER_SIZE]);
            len = BLOCK_FOOTER_SIZE;
        }
        bytes[len] = if self.done_after_footer { 0 } else { 1 };
        len += 1;
        self.pending = PendingBytes::from_slice(&bytes[..len]);
    }

    fn begin_new_block(&mut self) {
        self.prev_block_start = self.block_start;
        self.first_block = false;
        self.block_count += 1;
        self.prepare_header();
    }

    /// Number of blocks written so far (at least 1 once construction leaves
    /// the header pending).
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn continue_(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> BlockEncodeStatus {
        self.drive(input, out, false)
    }

    pub fn finish(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> BlockEncodeStatus {
        self.drive(input, out, true)
    }

    /// Bytes this block layer has emitted so far, and the offset of its
    /// last (or current) block's start — both relative to the start of the
    /// block layer's own byte stream. Used by the stream driver to compute
    /// the main footer's `relative_position` back-pointer.
    pub fn bytes_emitted_and_last_block_start(&self) -> (u64, u64) {
        (self.bytes_emitted, self.block_start)
    }

    fn drive(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        finishing: bool,
    ) -> BlockEncodeStatus {
        let out_before = out.available_bytes();
        let status = loop {
            match self.phase {
                EncodePhase::Header => {
                    if !self.pending.flush(out) {
                        break BlockEncodeStatus::StallOnOutput;
                    }
                    if self.block_type == BlockType::WithHashsumIntegrityCheck {
                        self.hasher = Some(IntegrityHasher::new());
                    }
                    self.phase = EncodePhase::Data;
                }
                EncodePhase::Data => {
                    let status = if finishing {
                        self.kernel.finish(input, out, self.hasher.as_mut())
                    } else {
                        self.kernel.continue_(input, out, self.hasher.as_mut())
                    };
                    match status {
                        KernelStatus::StallOnInput => break BlockEncodeStatus::StallOnInput,
                        KernelStatus::StallOnOutput => break BlockEncodeStatus::StallOnOutput,
                        KernelStatus::InfoEfficiencyCheck => continue,
                        KernelStatus::InfoNewBlock => {
                            self.phase = EncodePhase::Footer;
                            self.prepare_footer();
                        }
                        KernelStatus::Ready => {
                            self.done_after_footer = true;
                            self.phase = EncodePhase::Footer;
                            self.prepare_footer();
                        }
                    }
                }
                EncodePhase::Footer => {
                    if !self.pending.flush(out) {
                        break BlockEncodeStatus::StallOnOutput;
                    }
                    if self.done_after_footer {
                        self.phase = EncodePhase::Done;
                        break BlockEncodeStatus::Ready;
                    }
                    self.begin_new_block();
                    self.phase = EncodePhase::Header;
                }
                EncodePhase::Done => break BlockEncodeStatus::Ready,
            }
        };
        self.bytes_emitted += (out_before - out.available_bytes()) as u64;
        status
    }
}

enum DecodePhase {
    Header,
    Data,
    Footer,
    Done,
}

pub struct BlockDecoder {
    kernel: KernelDecoder,
    block_type: BlockType,
    hasher: Option<IntegrityHasher>,
    phase: DecodePhase,
    first_block: bool,
    done_after_footer: bool,
}

impl BlockDecoder {
    pub fn new(mode: CompressionMode, block_type: BlockType, dict_reset_cycle_shift: u8) -> Self {
        BlockDecoder {
            kernel: KernelDecoder::new_decode(mode, dict_reset_cycle_shift),
            block_type,
            hasher: None,
            phase: DecodePhase::Header,
            first_block: true,
            done_after_footer: false,
        }
    }

    /// Trailing bytes, fixed for the whole stream, that belong to framing
    /// following this kernel's own byte stream: this block's optional
    /// footer, the continuation byte, and the main footer — never to be
    /// consumed as kernel data.
    fn end_data_overhead(&self) -> usize {
        let footer = if self.block_type == BlockType::WithHashsumIntegrityCheck {
            BLOCK_FOOTER_SIZE
        } else {
            0
        };
        footer + 1 + MAIN_FOOTER_SIZE
    }

    pub fn continue_(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> BlockDecodeStatus {
        self.drive(input, out, false)
    }

    pub fn finish(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> BlockDecodeStatus {
        self.drive(input, out, true)
    }

    fn drive(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        finishing: bool,
    ) -> BlockDecodeStatus {
        loop {
            match self.phase {
                DecodePhase::Header => {
                    let mut header_buf = [0u8; BLOCK_HEADER_SIZE];
                    if !read_exact(input, BLOCK_HEADER_SIZE, &mut header_buf, None) {
                        return BlockDecodeStatus::StallOnInput;
                    }
                    let _header = BlockHeader::parse(&header_buf);
                    if self.first_block {
                        let mut marker_buf = [0u8; BLOCK_MODE_MARKER_SIZE];
                        if !read_exact(input, BLOCK_MODE_MARKER_SIZE, &mut marker_buf, None) {
                            return BlockDecodeStatus::StallOnInput;
                        }
                        let _marker = BlockModeMarker::parse(&marker_buf);
                        self.first_block = false;
                    }
                    if self.block_type == BlockType::WithHashsumIntegrityCheck {
                        self.hasher = Some(IntegrityHasher::new());
                    }
                    self.phase = DecodePhase::Data;
                }
                DecodePhase::Data => {
                    let status = if finishing {
                        let overhead = self.end_data_overhead();
                        self.kernel.finish(input, out, self.hasher.as_mut(), overhead)
                    } else {
                        self.kernel.continue_(input, out, self.hasher.as_mut())
                    };
                    match status {
                        KernelStatus::StallOnInput => return BlockDecodeStatus::StallOnInput,
                        KernelStatus::StallOnOutput => return BlockDecodeStatus::StallOnOutput,
                        KernelStatus::InfoEfficiencyCheck => continue,
                        KernelStatus::InfoNewBlock => self.phase = DecodePhase::Footer,
                        KernelStatus::Ready => {
                            self.done_after_footer = true;
                            self.phase = DecodePhase::Footer;
                        }
                    }
                }
                DecodePhase::Footer => {
                    if self.block_type == BlockType::WithHashsumIntegrityCheck {
                        let mut footer_buf = [0u8; BLOCK_FOOTER_SIZE];
                        if !read_exact(input, BLOCK_FOOTER_SIZE, &mut footer_buf, None) {
                            return BlockDecodeStatus::StallOnInput;
                        }
                        let footer = BlockFooter::parse(&footer_buf);
                        let (hashsum1, hashsum2) =
                            self.hasher.take().expect("hasher set on block start").finish();
                        if !footer.check(hashsum1, hashsum2) {
                            return BlockDecodeStatus::IntegrityCheckFail;
                        }
                    }
                    let mut continuation = [0u8; 1];
                    if !read_exact(input, 1, &mut continuation, None) {
                        return BlockDecodeStatus::StallOnInput;
                    }
                    if self.done_after_footer || continuation[0] == 0 {
                        self.phase = DecodePhase::Done;
                        return BlockDecodeStatus::Ready;
                    }
                    self.phase = DecodePhase::Header;
                }
                DecodePhase::Done => return BlockDecodeStatus::Ready,
            }
        }
    }
}
