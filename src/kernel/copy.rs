//! The `copy` kernel: a straight pass-through, no dictionary, no signatures.

use super::{KernelDecode, KernelEncode, KernelStatus};
use crate::hash::IntegrityHasher;
use crate::memory::{OutCursor, Teleport};

fn copy_hashed(
    input: &mut Teleport<'_>,
    out: &mut OutCursor<'_>,
    hash: Option<&mut IntegrityHasher>,
) {
    let n = input.available_bytes().min(out.available_bytes());
    if n == 0 {
        return;
    }
    let start = out.used();
    input.copy(out, n);
    if let Some(h) = hash {
        h.update(out.written_range(start));
    }
}

#[derive(Debug, Default)]
pub struct CopyEncode;

impl KernelEncode for CopyEncode {
    fn continue_(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        hash: Option<&mut IntegrityHasher>,
    ) -> KernelStatus {
        copy_hashed(input, out, hash);
        if input.available_bytes() == 0 {
            KernelStatus::StallOnInput
        } else {
            KernelStatus::StallOnOutput
        }
    }

    fn finish(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        hash: Option<&mut IntegrityHasher>,
    ) -> KernelStatus {
        copy_hashed(input, out, hash);
        if input.available_bytes() == 0 {
            KernelStatus::Ready
        } else {
            KernelStatus::StallOnOutput
        }
    }
}

#[derive(Debug, Default)]
pub struct CopyDecode;

impl KernelDecode for CopyDecode {
    fn continue_(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        hash: Option<&mut IntegrityHasher>,
    ) -> KernelStatus {
        copy_hashed(input, out, hash);
        if input.available_bytes() == 0 {
            KernelStatus::StallOnInput
        } else {
            KernelStatus::StallOnOutput
        }
    }

    fn finish(
        &mut self,
        input: &mut Teleport<'_>,
        out: &mut OutCursor<'_>,
        hash: Option<&mut IntegrityHasher>,
        end_data_overhead: usize,
    ) -> KernelStatus {
        let n = input
            .available_bytes_reserved(end_data_overhead)
            .min(out.available_bytes());
        if n > 0 {
            let start = out.used();
            input.copy(out, n);
            if let Some(h) = hash {
                h.update(out.written_range(start));
            }
        }
        if input.available_bytes_reserved(end_data_overhead) == 0 {
            KernelStatus::Ready
        } else {
            KernelStatus::StallOnOutput
        }
    }
}
