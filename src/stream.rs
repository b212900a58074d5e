//! The stream driver: wraps the block layer with the main header/footer and
//! exposes the caller-facing resumable `Encoder`/`Decoder`.
//!
//! Ported from `densityxx`'s `encode_t`/`decode_t` (resumable process
//! enumeration `write_header -> write_blocks -> write_footer` /
//! `read_header -> read_blocks -> read_footer`), adapted to the block
//! layer's continuation-byte-driven looping (`block::BlockEncoder`/
//! `BlockDecoder` already know when the last block has closed, so the
//! stream driver only needs to append the main footer once they report
//! done).

use crate::block::{BlockDecodeStatus, BlockDecoder, BlockEncodeStatus, BlockEncoder};
use crate::config::MINIMUM_OUTPUT_BUFFER_SIZE;
use crate::format::{BlockType, CompressionMode};
use crate::header::{
    MainFooter, MainHeader, MainHeaderParameters, MAIN_FOOTER_SIZE, MAIN_HEADER_SIZE,
};
use crate::memory::{OutCursor, Teleport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStatus {
    Ready,
    StallOnInput,
    StallOnOutput,
    ErrorOutputBufferTooSmall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    Ready,
    StallOnInput,
    StallOnOutput,
    ErrorIntegrityCheckFail,
    ErrorInvalidInternalState,
    ErrorOutputBufferTooSmall,
}

enum EncodePhase {
    WriteHeader,
    WriteBlocks,
    WriteFooter,
    Done,
}

/// Resumable streaming compressor. Holds its own process state across calls
/// so the caller can suspend and resume with arbitrarily chunked buffers.
pub struct Encoder {
    phase: EncodePhase,
    header_written: usize,
    header_bytes: [u8; MAIN_HEADER_SIZE],
    blocks: BlockEncoder,
    footer_written: usize,
    footer_bytes: [u8; MAIN_FOOTER_SIZE],
    total_read: u64,
    total_written: u64,
}

impl Encoder {
    /// Equivalent to `encode_t::init`: validates the output buffer meets the
    /// conformity gate and prepares the main header for the first flush.
    pub fn init(
        mode: CompressionMode,
        block_type: BlockType,
        dict_reset_cycle_shift: u8,
    ) -> Result<Self, EncodeStatus> {
        let header = MainHeader::new(
            mode,
            block_type,
            MainHeaderParameters {
                dict_reset_cycle_shift,
            },
        );
        let mut header_bytes = [0u8; MAIN_HEADER_SIZE];
        header.write(&mut header_bytes);
        Ok(Encoder {
            phase: EncodePhase::WriteHeader,
            header_written: 0,
            header_bytes,
            blocks: BlockEncoder::new(mode, block_type, dict_reset_cycle_shift),
            footer_written: 0,
            footer_bytes: [0u8; MAIN_FOOTER_SIZE],
            total_read: 0,
            total_written: 0,
        })
    }

    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn continue_(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> EncodeStatus {
        self.drive(input, out, false)
    }

    pub fn finish(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> EncodeStatus {
        self.drive(input, out, true)
    }

    fn drive(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        finishing: bool,
    ) -> EncodeStatus {
        if out.available_bytes() < MINIMUM_OUTPUT_BUFFER_SIZE
            && matches!(self.phase, EncodePhase::WriteHeader)
            && self.header_written == 0
        {
            return EncodeStatus::ErrorOutputBufferTooSmall;
        }

        loop {
            match self.phase {
                EncodePhase::WriteHeader => {
                    let out_before = out.available_bytes();
                    let flushed = flush_pending(&self.header_bytes, &mut self.header_written, out);
                    self.total_written += (out_before - out.available_bytes()) as u64;
                    if !flushed {
                        return EncodeStatus::StallOnOutput;
                    }
                    self.phase = EncodePhase::WriteBlocks;
                }
                EncodePhase::WriteBlocks => {
                    let in_before = input.available_bytes();
                    let out_before = out.available_bytes();
                    let status = if finishing {
                        self.blocks.finish(input, out)
                    } else {
                        self.blocks.continue_(input, out)
                    };
                    self.total_read += (in_before - input.available_bytes()) as u64;
                    self.total_written += (out_before - out.available_bytes()) as u64;
                    match status {
                        BlockEncodeStatus::StallOnInput => return EncodeStatus::StallOnInput,
                        BlockEncodeStatus::StallOnOutput => return EncodeStatus::StallOnOutput,
                        BlockEncodeStatus::Ready => {
                            if !finishing {
                                return EncodeStatus::Ready;
                            }
                            let (bytes_emitted, last_block_start) =
                                self.blocks.bytes_emitted_and_last_block_start();
                            let footer = MainFooter {
                                relative_position: (bytes_emitted - last_block_start) as u32,
                            };
                            footer.write(&mut self.footer_bytes);
                            self.phase = EncodePhase::WriteFooter;
                        }
                    }
                }
                EncodePhase::WriteFooter => {
                    let out_before = out.available_bytes();
                    let flushed = flush_pending(&self.footer_bytes, &mut self.footer_written, out);
                    self.total_written += (out_before - out.available_bytes()) as u64;
                    if !flushed {
                        return EncodeStatus::StallOnOutput;
                    }
                    self.phase = EncodePhase::Done;
                    return EncodeStatus::Ready;
                }
                EncodePhase::Done => return EncodeStatus::Ready,
            }
        }
    }
}

enum DecodePhase {
    ReadHeader,
    ReadBlocks,
    Done,
}

/// Resumable streaming decompressor.
pub struct Decoder {
    phase: DecodePhase,
    header: Option<MainHeader>,
    blocks: Option<BlockDecoder>,
    total_read: u64,
    total_written: u64,
}

impl Decoder {
    pub fn init() -> Self {
        Decoder {
            phase: DecodePhase::ReadHeader,
            header: None,
            blocks: None,
            total_read: 0,
            total_written: 0,
        }
    }

    /// The parsed main header, available once `ReadHeader` has completed.
    pub fn header(&self) -> Option<&MainHeader> {
        self.header.as_ref()
    }

    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn continue_(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> DecodeStatus {
        self.drive(input, out, false)
    }

    pub fn finish(&mut self, input: &mut Teleport<'_>, out: &mut OutCursor<'_>) -> DecodeStatus {
        self.drive(input, out, true)
    }

    fn drive(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        finishing: bool,
    ) -> DecodeStatus {
        if out.available_bytes() < MINIMUM_OUTPUT_BUFFER_SIZE && self.total_written == 0 {
            return DecodeStatus::ErrorOutputBufferTooSmall;
        }

        loop {
            match self.phase {
                DecodePhase::ReadHeader => {
                    let mut header_buf = [0u8; MAIN_HEADER_SIZE];
                    if !crate::memory::read_exact(input, MAIN_HEADER_SIZE, &mut header_buf, None) {
                        return DecodeStatus::StallOnInput;
                    }
                    self.total_read += MAIN_HEADER_SIZE as u64;
                    let header = match MainHeader::parse(&header_buf) {
                        Some(h) => h,
                        None => return DecodeStatus::ErrorInvalidInternalState,
                    };
                    self.blocks = Some(BlockDecoder::new(
                        header.compression_mode,
                        header.block_type,
                        header.parameters.dict_reset_cycle_shift,
                    ));
                    self.header = Some(header);
                    self.phase = DecodePhase::ReadBlocks;
                }
                DecodePhase::ReadBlocks => {
                    let blocks = self
                        .blocks
                        .as_mut()
                        .expect("blocks set once header parsed");
                    let in_before = input.available_bytes();
                    let out_before = out.available_bytes();
                    let status = if finishing {
                        blocks.finish(input, out)
                    } else {
                        blocks.continue_(input, out)
                    };
                    self.total_read += (in_before - input.available_bytes()) as u64;
                    self.total_written += (out_before - out.available_bytes()) as u64;
                    match status {
                        BlockDecodeStatus::StallOnInput => return DecodeStatus::StallOnInput,
                        BlockDecodeStatus::StallOnOutput => return DecodeStatus::StallOnOutput,
                        BlockDecodeStatus::IntegrityCheckFail => {
                            return DecodeStatus::ErrorIntegrityCheckFail
                        }
                        BlockDecodeStatus::Ready => {
                            if !finishing {
                                return DecodeStatus::Ready;
                            }
                            // The main footer trails every block; the block
                            // decoder's `end_data_overhead` already reserved
                            // these bytes, so they are guaranteed present.
                            let mut footer_buf = [0u8; MAIN_FOOTER_SIZE];
                            if !crate::memory::read_exact(
                                input,
                                MAIN_FOOTER_SIZE,
                                &mut footer_buf,
                                None,
                            ) {
                                return DecodeStatus::ErrorInvalidInternalState;
                            }
                            self.total_read += MAIN_FOOTER_SIZE as u64;
                            let _footer = MainFooter::parse(&footer_buf);
                            self.phase = DecodePhase::Done;
                            return DecodeStatus::Ready;
                        }
                    }
                }
                DecodePhase::Done => return DecodeStatus::Ready,
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::init()
    }
}

fn flush_pending(bytes: &[u8], written: &mut usize, out: &mut OutCursor<'_>) -> bool {
    while *written < bytes.len() {
        if out.available_bytes() == 0 {
            return false;
        }
        let n = (bytes.len() - *written).min(out.available_bytes());
        out.write(&bytes[*written..*written + n]);
        *written += n;
    }
    true
}
