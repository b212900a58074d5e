//! The `chameleon` kernel: a single-hash, 2^16-entry dictionary with a
//! 64-chunk processing unit and a 1-bit-per-chunk signature.
//!
//! Ported from `densityxx/chameleon.hpp`: `prepare_new_signature`,
//! `prepare_new_block`, `check_state`, per-chunk `kernel`, `process_unit`,
//! the reset-cycle logic, and the decode mirror. See `kernel/mod.rs` for why
//! units carry an explicit chunk-count prefix in this crate's wire format.

use super::{hash16, KernelDecode, KernelEncode, KernelStatus};
use crate::config::chameleon::{
    BLOCK_SIGNATURES_SHIFT, CHUNKS_PER_UNIT, DICTIONARY_ENTRIES, EFFICIENCY_CHECK_SIGNATURES_SHIFT,
};
use crate::hash::IntegrityHasher;
use crate::memory::{read_exact, OutCursor, Teleport};

/// Worst case body size for one full unit: every chunk misses (4 raw bytes
/// each).
const MAX_BODY_BYTES: usize = CHUNKS_PER_UNIT * 4;

struct ResetCycle {
    shift: u8,
    remaining: u32,
}

impl ResetCycle {
    fn new(shift: u8) -> Self {
        let remaining = if shift == 0 { 0 } else { (1u32 << shift) - 1 };
        ResetCycle { shift, remaining }
    }

    /// Returns `true` if the dictionary should be reset now.
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

/// Running per-block bookkeeping shared by encode and decode: how many
/// signatures have been emitted/consumed since the last block boundary, and
/// whether the efficiency-check threshold has already fired this block.
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

    /// Call once per completed unit. Returns the status the kernel should
    /// report for this unit, if any.
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

pub struct ChameleonEncode {
    dictionary: Box<[u32; DICTIONARY_ENTRIES]>,
    reset_cycle: ResetCycle,
    counter: BlockCounter,
    signature: u64,
    chunk_count: u32,
    body: [u8; MAX_BODY_BYTES],
    body_len: usize,
    pending_flush: bool,
}

impl ChameleonEncode {
    pub fn new(dict_reset_cycle_shift: u8) -> Self {
        ChameleonEncode {
            dictionary: Box::new([0u32; DICTIONARY_ENTRIES]),
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
        let entry = &mut self.dictionary[hash as usize];
        if *entry == chunk {
            self.body[self.body_len..self.body_len + 2].copy_from_slice(&hash.to_le_bytes());
            self.body_len += 2;
            self.signature |= 1u64 << self.chunk_count;
        } else {
            *entry = chunk;
            self.body[self.body_len..self.body_len + 4].copy_from_slice(&chunk.to_le_bytes());
            self.body_len += 4;
        }
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
            *self.dictionary = [0u32; DICTIONARY_ENTRIES];
        }
        Some(status)
    }
}

impl KernelEncode for ChameleonEncode {
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

pub struct ChameleonDecode {
    dictionary: Box<[u32; DICTIONARY_ENTRIES]>,
    reset_cycle: ResetCycle,
    counter: BlockCounter,
    pending_unit: Option<PendingUnit>,
}

impl ChameleonDecode {
    pub fn new(dict_reset_cycle_shift: u8) -> Self {
        ChameleonDecode {
            dictionary: Box::new([0u32; DICTIONARY_ENTRIES]),
            reset_cycle: ResetCycle::new(dict_reset_cycle_shift),
            counter: BlockCounter::new(),
            pending_unit: None,
        }
    }

    fn after_unit(&mut self) -> Option<KernelStatus> {
        let (status, reset) = self.counter.after_unit(&mut self.reset_cycle)?;
        if reset {
            *self.dictionary = [0u32; DICTIONARY_ENTRIES];
        }
        Some(status)
    }

    /// Decode exactly one unit (prefix + signature + body) if enough input
    /// is buffered. Returns `None` on completion of the unit, `Some(status)`
    /// on stall. Progress within a partially-decoded unit (prefix/signature
    /// already consumed, or some chunks already emitted) survives across
    /// stalls in `self.pending_unit`, since the underlying teleport bytes
    /// for anything already consumed are gone for good.
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
                // See the matching clamp in cheetah.rs: a corrupted prefix
                // byte can claim a count above the unit max.
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
            let chunk_bytes = if (signature >> i) & 1 == 1 {
                let mut hash_bytes = [0u8; 2];
                if !read_exact(input, 2, &mut hash_bytes, None) {
                    return Some(KernelStatus::StallOnInput);
                }
                let dict_hash = u16::from_le_bytes(hash_bytes);
                self.dictionary[dict_hash as usize].to_le_bytes()
            } else {
                let mut chunk_bytes = [0u8; 4];
                if !read_exact(input, 4, &mut chunk_bytes, None) {
                    return Some(KernelStatus::StallOnInput);
                }
                let chunk = u32::from_le_bytes(chunk_bytes);
                self.dictionary[hash16(chunk) as usize] = chunk;
                chunk_bytes
            };
            out.write(&chunk_bytes);
            if let Some(h) = hash.as_deref_mut() {
                h.update(&chunk_bytes);
            }
            self.pending_unit.as_mut().unwrap().chunks_done += 1;
        }
        self.pending_unit = None;
        None
    }
}

impl KernelDecode for ChameleonDecode {
    fn continue_(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        mut hash: Option<&mut IntegrityHasher>,
    ) -> KernelStatus {
        loop {
            // A fresh unit is at least 1 (prefix) + 8 (signature) bytes;
            // treat less than that as "not enough buffered yet" rather than
            // end of stream (only `finish` makes that call). A unit already
            // in progress (from a prior stall) always proceeds regardless.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Teleport;

    fn round_trip(data: &[u8]) -> Vec<u8> {
        let mut enc = ChameleonEncode::new(6);
        let mut compressed = vec![0u8; data.len() * 2 + 4096];
        let written = {
            let mut tp = Teleport::new(data);
            let mut out = OutCursor::new(&mut compressed);
            let status = enc.finish(&mut tp, &mut out, None);
            assert_eq!(status, KernelStatus::Ready);
            out.used()
        };
        compressed.truncate(written);

        let mut dec = ChameleonDecode::new(6);
        let mut restored = vec![0u8; data.len() + 4096];
        let written = {
            let mut tp = Teleport::new(&compressed);
            let mut out = OutCursor::new(&mut restored);
            let status = dec.finish(&mut tp, &mut out, None, 0);
            assert_eq!(status, KernelStatus::Ready);
            out.used()
        };
        restored.truncate(written);
        restored
    }

    #[test]
    fn round_trips_repetitive_data() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn round_trips_small_tail() {
        let data = b"abcxyz".to_vec();
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn round_trips_empty() {
        let data: Vec<u8> = vec![];
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn round_trips_exact_unit_multiple() {
        let data: Vec<u8> = (0..(CHUNKS_PER_UNIT * 4 * 3))
            .map(|i| (i % 251) as u8)
            .collect();
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn encode_decode_hash_agree() {
        let data: Vec<u8> = (0..8192u32).map(|i| (i % 13) as u8).collect();
        let mut enc = ChameleonEncode::new(6);
        let mut compressed = vec![0u8; data.len() * 2 + 4096];
        let mut enc_hash = IntegrityHasher::new();
        let written = {
            let mut tp = Teleport::new(&data);
            let mut out = OutCursor::new(&mut compressed);
            enc.finish(&mut tp, &mut out, Some(&mut enc_hash));
            out.used()
        };
        compressed.truncate(written);

        let mut dec = ChameleonDecode::new(6);
        let mut restored = vec![0u8; data.len() + 4096];
        let mut dec_hash = IntegrityHasher::new();
        {
            let mut tp = Teleport::new(&compressed);
            let mut out = OutCursor::new(&mut restored);
            dec.finish(&mut tp, &mut out, Some(&mut dec_hash), 0);
        }
        assert_eq!(enc_hash.finish(), dec_hash.finish());
    }
}
