//! The `cheetah` kernel: a two-slot LRU dictionary plus a prediction table
//! keyed by the previous chunk's hash, with a 32-chunk processing unit and
//! a 2-bit-per-chunk signature.
//!
//! Ported from `densityxx/cheetah.hpp`: per-chunk encode `kernel`
//! (predicted / map_a / map_b / miss), LRU promotion/demotion, the
//! finish-time sentinel, and the decode mirror (`process_predicted`,
//! `process_compressed_a`, `process_compressed_b`, `process_uncompressed`).
//! See `kernel/mod.rs` for the chunk-count-prefixed unit framing shared with
//! `chameleon`.

use super::{hash16, KernelDecode, KernelEncode, KernelStatus};
use crate::config::cheetah::{
    BLOCK_SIGNATURES_SHIFT, CHUNKS_PER_UNIT, DICTIONARY_ENTRIES, EFFICIENCY_CHECK_SIGNATURES_SHIFT,
};
use crate::hash::IntegrityHasher;
use crate::memory::{read_exact, OutCursor, Teleport};

const CODE_PREDICTED: u8 = 0b00;
const CODE_MAP_A: u8 = 0b01;
const CODE_MAP_B: u8 = 0b10;
const CODE_CHUNK: u8 = 0b11;

/// Worst case body size for one full unit: every chunk misses (4 raw bytes
/// each).
const MAX_BODY_BYTES: usize = CHUNKS_PER_UNIT * 4;

#[derive(Clone, Copy, Default)]
struct DictSlot {
    chunk_a: u32,
    chunk_b: u32,
}

struct ResetCycle {
    shift: u8,
    remaining: u32,
}

impl ResetCycle {
    fn new(shift: u8) -> Self {
        let remaining = if shift == 0 { 0 } else { (1u32 << shift) - 1 };
        ResetCycle { shift, remaining }
    }

    fn tick(&mut self) -> bool {
        if self.shift == 0 {
            return false;
        }
        if self.remaining == 0 {
            self.remaining = (1u32 << self.shift) - 1;
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

struct BlockCounter {
    signatures_count: u32,
    efficiency_checked: bool,
}

impl BlockCounter {
    fn new() -> Self {
        BlockCounter {
            signatures_count: 0,
            efficiency_checked: false,
        }
    }

    fn after_unit(&mut self, reset_cycle: &mut ResetCycle) -> Option<(KernelStatus, bool)> {
        self.signatures_count += 1;
        if !self.efficiency_checked
            && self.signatures_count == (1u32 << EFFICIENCY_CHECK_SIGNATURES_SHIFT)
        {
            self.efficiency_checked = true;
            return Some((KernelStatus::InfoEfficiencyCheck, false));
        }
        if self.signatures_count == (1u32 << BLOCK_SIGNATURES_SHIFT) {
            self.signatures_count = 0;
            self.efficiency_checked = false;
            let reset = reset_cycle.tick();
            return Some((KernelStatus::InfoNewBlock, reset));
        }
        None
    }
}

pub struct CheetahEncode {
    dictionary: Box<[DictSlot; DICTIONARY_ENTRIES]>,
    prediction_table: Box<[u32; DICTIONARY_ENTRIES]>,
    last_hash: u16,
    reset_cycle: ResetCycle,
    counter: BlockCounter,
    signature: u64,
    chunk_count: u32,
    body: [u8; MAX_BODY_BYTES],
    body_len: usize,
    pending_flush: bool,
}

impl CheetahEncode {
    pub fn new(dict_reset_cycle_shift: u8) -> Self {
        CheetahEncode {
            dictionary: Box::new([DictSlot::default(); DICTIONARY_ENTRIES]),
            prediction_table: Box::new([0u32; DICTIONARY_ENTRIES]),
            last_hash: 0,
            reset_cycle: ResetCycle::new(dict_reset_cycle_shift),
            counter: BlockCounter::new(),
            signature: 0,
            chunk_count: 0,
            body: [0u8; MAX_BODY_BYTES],
            body_len: 0,
            pending_flush: false,
        }
    }

    fn process_chunk(&mut self, chunk: u32) {
        let hash = hash16(chunk);
        let code;
        if self.prediction_table[self.last_hash as usize] == chunk {
            code = CODE_PREDICTED;
        } else {
            let slot = &mut self.dictionary[hash as usize];
            if slot.chunk_a == chunk {
                code = CODE_MAP_A;
                self.body[self.body_len..self.body_len + 2].copy_from_slice(&hash.to_le_bytes());
                self.body_len += 2;
            } else if slot.chunk_b == chunk {
                code = CODE_MAP_B;
                self.body[self.body_len..self.body_len + 2].copy_from_slice(&hash.to_le_bytes());
                self.body_len += 2;
                std::mem::swap(&mut slot.chunk_a, &mut slot.chunk_b);
            } else {
                code = CODE_CHUNK;
                self.body[self.body_len..self.body_len + 4].copy_from_slice(&chunk.to_le_bytes());
                self.body_len += 4;
                slot.chunk_b = slot.chunk_a;
                slot.chunk_a = chunk;
            }
            self.prediction_table[self.last_hash as usize] = chunk;
        }
        self.signature |= (code as u64) << (self.chunk_count * 2);
        self.last_hash = hash;
        self.chunk_count += 1;
    }

    fn try_flush(&mut self, out: &mut OutCursor<'_>) -> bool {
        let needed = 1 + 8 + self.body_len;
        if out.available_bytes() < needed {
            return false;
        }
        out.write(&[(self.chunk_count - 1) as u8]);
        out.write(&self.signature.to_le_bytes());
        out.write(&self.body[..self.body_len]);
        self.signature = 0;
        self.chunk_count = 0;
        self.body_len = 0;
        self.pending_flush = false;
        true
    }

    fn after_flush(&mut self) -> Option<KernelStatus> {
        let (status, reset) = self.counter.after_unit(&mut self.reset_cycle)?;
        if reset {
            *self.dictionary = [DictSlot::default(); DICTIONARY_ENTRIES];
            *self.prediction_table = [0u32; DICTIONARY_ENTRIES];
        }
        Some(status)
    }
}

impl KernelEncode for CheetahEncode {
    fn continue_(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        mut hash: Option<&mut IntegrityHasher>,
    ) -> KernelStatus {
        loop {
            if self.pending_flush {
                if !self.try_flush(out) {
                    return KernelStatus::StallOnOutput;
                }
                if let Some(status) = self.after_flush() {
                    return status;
                }
            }
            while (self.chunk_count as usize) < CHUNKS_PER_UNIT {
                let mut chunk_bytes = [0u8; 4];
                if !read_exact(input, 4, &mut chunk_bytes, hash.as_deref_mut()) {
                    return KernelStatus::StallOnInput;
                }
                self.process_chunk(u32::from_le_bytes(chunk_bytes));
            }
            self.pending_flush = true;
        }
    }

    fn finish(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        mut hash: Option<&mut IntegrityHasher>,
    ) -> KernelStatus {
        loop {
            if self.pending_flush {
                if !self.try_flush(out) {
                    return KernelStatus::StallOnOutput;
                }
                if let Some(status) = self.after_flush() {
                    return status;
                }
            }
            while (self.chunk_count as usize) < CHUNKS_PER_UNIT {
                if input.available_bytes() < 4 {
                    break;
                }
                let mut chunk_bytes = [0u8; 4];
                if !read_exact(input, 4, &mut chunk_bytes, hash.as_deref_mut()) {
                    return KernelStatus::StallOnInput;
                }
                self.process_chunk(u32::from_le_bytes(chunk_bytes));
            }
            if (self.chunk_count as usize) == CHUNKS_PER_UNIT {
                self.pending_flush = true;
                continue;
            }
            break;
        }
        if self.chunk_count > 0 {
            self.pending_flush = true;
            if !self.try_flush(out) {
                return KernelStatus::StallOnOutput;
            }
        }
        let tail = input.available_bytes();
        if tail > 0 {
            if out.available_bytes() < tail {
                return KernelStatus::StallOnOutput;
            }
            let start = out.used();
            input.copy_remaining(out);
            if let Some(h) = hash {
                h.update(out.written_range(start));
            }
        }
        KernelStatus::Ready
    }
}

struct PendingUnit {
    chunk_count: u32,
    signature: u64,
    chunks_done: u32,
}

pub struct CheetahDecode {
    dictionary: Box<[DictSlot; DICTIONARY_ENTRIES]>,
    prediction_table: Box<[u32; DICTIONARY_ENTRIES]>,
    last_hash: u16,
    reset_cycle: ResetCycle,
    counter: BlockCounter,
    pending_unit: Option<PendingUnit>,
}

impl CheetahDecode {
    pub fn new(dict_reset_cycle_shift: u8) -> Self {
        CheetahDecode {
            dictionary: Box::new([DictSlot::default(); DICTIONARY_ENTRIES]),
            prediction_table: Box::new([0u32; DICTIONARY_ENTRIES]),
            last_hash: 0,
            reset_cycle: ResetCycle::new(dict_reset_cycle_shift),
            counter: BlockCounter::new(),
            pending_unit: None,
        }
    }

    fn after_unit(&mut self) -> Option<KernelStatus> {
        let (status, reset) = self.counter.after_unit(&mut self.reset_cycle)?;
        if reset {
            *self.dictionary = [DictSlot::default(); DICTIONARY_ENTRIES];
            *self.prediction_table = [0u32; DICTIONARY_ENTRIES];
        }
        Some(status)
    }

    fn decode_chunk_code(&mut self, code: u8, input: &mut Teleport<'_>) -> Option<u32> {
        match code {
            CODE_PREDICTED => {
                let chunk = self.prediction_table[self.last_hash as usize];
                self.last_hash = hash16(chunk);
                Some(chunk)
            }
            CODE_MAP_A => {
                let mut hash_bytes = [0u8; 2];
                if !read_exact(input, 2, &mut hash_bytes, None) {
                    return None;
                }
                let hash = u16::from_le_bytes(hash_bytes);
                let chunk = self.dictionary[hash as usize].chunk_a;
                self.prediction_table[self.last_hash as usize] = chunk;
                self.last_hash = hash;
                Some(chunk)
            }
            CODE_MAP_B => {
                let mut hash_bytes = [0u8; 2];
                if !read_exact(input, 2, &mut hash_bytes, None) {
                    return None;
                }
                let hash = u16::from_le_bytes(hash_bytes);
                let slot = &mut self.dictionary[hash as usize];
                let chunk = slot.chunk_b;
                std::mem::swap(&mut slot.chunk_a, &mut slot.chunk_b);
                self.prediction_table[self.last_hash as usize] = chunk;
                self.last_hash = hash;
                Some(chunk)
            }
            CODE_CHUNK => {
                let mut chunk_bytes = [0u8; 4];
                if !read_exact(input, 4, &mut chunk_bytes, None) {
                    return None;
                }
                let chunk = u32::from_le_bytes(chunk_bytes);
                let hash = hash16(chunk);
                let slot = &mut self.dictionary[hash as usize];
                slot.chunk_b = slot.chunk_a;
                slot.chunk_a = chunk;
                self.prediction_table[self.last_hash as usize] = chunk;
                self.last_hash = hash;
                Some(chunk)
            }
            _ => unreachable!(),
        }
    }

    fn decode_unit(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        hash: &mut Option<&mut IntegrityHasher>,
    ) -> Option<KernelStatus> {
        if self.pending_unit.is_none() {
            let mut prefix = [0u8; 1];
            if !read_exact(input, 1, &mut prefix, None) {
                return Some(KernelStatus::StallOnInput);
            }
            let mut sig_bytes = [0u8; 8];
            if !read_exact(input, 8, &mut sig_bytes, None) {
                return Some(KernelStatus::StallOnInput);
            }
            self.pending_unit = Some(PendingUnit {
                // A corrupted prefix byte can claim a count above the unit
                // max; clamp it so a garbled stream can't shift a u64 by
                // more than its width or blow past the buffers below (the
                // footer's integrity hash is what ultimately flags this as
                // the corruption it is).
                chunk_count: (prefix[0] as u32 + 1).min(CHUNKS_PER_UNIT as u32),
                signature: u64::from_le_bytes(sig_bytes),
                chunks_done: 0,
            });
        }

        let (chunk_count, signature) = {
            let p = self.pending_unit.as_ref().unwrap();
            (p.chunk_count, p.signature)
        };
        let remaining = chunk_count - self.pending_unit.as_ref().unwrap().chunks_done;
        if out.available_bytes() < remaining as usize * 4 {
            return Some(KernelStatus::StallOnOutput);
        }

        while self.pending_unit.as_ref().unwrap().chunks_done < chunk_count {
            let i = self.pending_unit.as_ref().unwrap().chunks_done;
            let code = ((signature >> (i * 2)) & 0b11) as u8;
            match self.decode_chunk_code(code, input) {
                Some(chunk) => {
                    let bytes = chunk.to_le_bytes();
                    out.write(&bytes);
                    if let Some(h) = hash.as_deref_mut() {
                        h.update(&bytes);
                    }
                }
                None => return Some(KernelStatus::StallOnInput),
            }
            self.pending_unit.as_mut().unwrap().chunks_done += 1;
        }
        self.pending_unit = None;
        None
    }
}

impl KernelDecode for CheetahDecode {
    fn continue_(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        mut hash: Option<&mut IntegrityHasher>,
    ) -> KernelStatus {
        loop {
            if self.pending_unit.is_none() && input.available_bytes() < 9 {
                return KernelStatus::StallOnInput;
            }
            if let Some(status) = self.decode_unit(input, out, &mut hash) {
                return status;
            }
            if let Some(status) = self.after_unit() {
                return status;
            }
        }
    }

    fn finish(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        mut hash: Option<&mut IntegrityHasher>,
        end_data_overhead: usize,
    ) -> KernelStatus {
        loop {
            let reserved_avail = input.available_bytes_reserved(end_data_overhead);
            if self.pending_unit.is_none() && reserved_avail < 9 {
                break;
            }
            if let Some(status) = self.decode_unit(input, out, &mut hash) {
                return status;
            }
            if let Some(status) = self.after_unit() {
                return status;
            }
        }
        let tail = input.available_bytes_reserved(end_data_overhead);
        if tail > 0 {
            if out.available_bytes() < tail {
                return KernelStatus::StallOnOutput;
            }
            let start = out.used();
            input.copy(out, tail);
            if let Some(h) = hash {
                h.update(out.written_range(start));
            }
        }
        KernelStatus::Ready
    }
}
