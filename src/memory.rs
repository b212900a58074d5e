//! Cursors over byte regions, and the teleport read-buffering abstraction.
//!
//! Ported from `densityxx/memory.hpp` (`location_t`, `teleport_t`). Per the
//! redesign recorded in `SPEC_FULL.md` section 9, the original's single
//! pointer-based `location_t` is split into two concrete, bounds-checked,
//! slice-backed cursor types so the crate never needs raw pointers or
//! `unsafe`: [`InCursor`] for teleport's two read sources, and [`OutCursor`]
//! for the single caller-owned output region.

use crate::config::STAGING_CAPACITY;

/// A read cursor over a borrowed byte slice. Bytes are consumed from the
/// front; `used()` reports how many have been consumed so far.
#[derive(Debug)]
pub struct InCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> InCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        InCursor { bytes, pos: 0 }
    }

    pub fn available_bytes(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn used(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.pos..]
    }

    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available_bytes());
        self.pos += n;
    }

    /// Copy `n` bytes out and consume them.
    pub fn read(&mut self, dst: &mut [u8], n: usize) {
        dst[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.consume(n);
    }
}

/// A write cursor over a borrowed mutable byte slice.
#[derive(Debug)]
pub struct OutCursor<'a> {
    bytes: &'a mut [u8],
    pos: usize,
}

impl<'a> OutCursor<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        OutCursor { bytes, pos: 0 }
    }

    pub fn available_bytes(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn used(&self) -> usize {
        self.pos
    }

    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available_bytes());
        self.pos += n;
    }

    pub fn write(&mut self, src: &[u8]) {
        let n = src.len();
        self.bytes[self.pos..self.pos + n].copy_from_slice(src);
        self.consume(n);
    }

    /// The bytes written since absolute position `start` (as previously
    /// reported by `used()`). Lets a kernel hash back over output it just
    /// produced without keeping its own copy.
    pub fn written_range(&self, start: usize) -> &[u8] {
        &self.bytes[start..self.pos]
    }
}

/// The owned staging buffer a teleport uses to splice across caller input
/// refills. Equivalent to `teleport_t`'s `staging` member plus
/// `original_pointer`/`write_pointer` bookkeeping.
pub struct Staging {
    buf: Box<[u8; STAGING_CAPACITY]>,
    /// Offset of the first unconsumed byte.
    read_pos: usize,
    /// Offset one past the last written byte.
    write_pos: usize,
}

impl Staging {
    fn new() -> Self {
        Staging {
            buf: Box::new([0u8; STAGING_CAPACITY]),
            read_pos: 0,
            write_pos: 0,
        }
    }

    pub fn available_bytes(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Equivalent to `teleport_t::reset_staging_buffer`.
    fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available_bytes());
        self.read_pos += n;
    }

    pub fn remaining(&self) -> &[u8] {
        &self.buf[self.read_pos..self.write_pos]
    }

    /// Copy `n` bytes out and consume them.
    pub fn read(&mut self, dst: &mut [u8], n: usize) {
        dst[..n].copy_from_slice(&self.remaining()[..n]);
        self.consume(n);
    }

    /// Append `bytes` to staging. Panics if capacity would be exceeded,
    /// which cannot happen given the teleport call discipline below.
    fn push(&mut self, bytes: &[u8]) {
        let n = bytes.len();
        self.buf[self.write_pos..self.write_pos + n].copy_from_slice(bytes);
        self.write_pos += n;
    }
}

/// A region the teleport's next `read` is satisfied from: either the owned
/// staging buffer or the caller's borrowed direct buffer. Returned by
/// [`Teleport::read`] in place of the original's ambiguous `location_t*`.
pub enum ReadRegion<'t, 'a> {
    Staging(&'t mut Staging),
    Direct(&'t mut InCursor<'a>),
}

impl<'t, 'a> ReadRegion<'t, 'a> {
    pub fn available_bytes(&self) -> usize {
        match self {
            ReadRegion::Staging(s) => s.available_bytes(),
            ReadRegion::Direct(d) => d.available_bytes(),
        }
    }

    pub fn remaining(&self) -> &[u8] {
        match self {
            ReadRegion::Staging(s) => s.remaining(),
            ReadRegion::Direct(d) => d.remaining(),
        }
    }

    pub fn consume(&mut self, n: usize) {
        match self {
            ReadRegion::Staging(s) => s.consume(n),
            ReadRegion::Direct(d) => d.consume(n),
        }
    }

    pub fn read(&mut self, dst: &mut [u8], n: usize) {
        dst[..n].copy_from_slice(&self.remaining()[..n]);
        self.consume(n);
    }
}

/// Splices a caller-owned "direct" input buffer with an owned "staging"
/// buffer to present atomic contiguous multi-byte reads. Ported from
/// `densityxx/memory.hpp::teleport_t`.
pub struct Teleport<'a> {
    staging: Staging,
    direct: InCursor<'a>,
}

impl<'a> Teleport<'a> {
    pub fn new(initial_input: &'a [u8]) -> Self {
        Teleport {
            staging: Staging::new(),
            direct: InCursor::new(initial_input),
        }
    }

    /// Equivalent to `teleport_t::change_input_buffer`.
    pub fn change_input_buffer(&mut self, input: &'a [u8]) {
        self.direct = InCursor::new(input);
    }

    pub fn available_bytes(&self) -> usize {
        self.staging.available_bytes() + self.direct.available_bytes()
    }

    pub fn available_bytes_reserved(&self, reserved: usize) -> usize {
        self.available_bytes().saturating_sub(reserved)
    }

    /// Equivalent to `teleport_t::copy_from_direct_buffer_to_staging_buffer`.
    fn copy_direct_into_staging(&mut self, n: usize) {
        let n = n.min(self.direct.available_bytes());
        if self.staging.available_bytes() == 0 {
            self.staging.reset();
        }
        self.staging.push(&self.direct.remaining()[..n]);
        self.direct.consume(n);
    }

    /// Request a contiguous readable region of at least `n` bytes. Returns
    /// `None` when the input currently buffered (staging + direct) is
    /// insufficient — the caller must refill `direct` via
    /// `change_input_buffer` and retry.
    ///
    /// This crate always takes the "copy into staging" path rather than the
    /// original's "revert to direct" optimization (see `SPEC_FULL.md`
    /// section 9, Open Question 4): safe slice cursors cannot express the
    /// pointer-identity relationship that optimization depends on across
    /// separate calls.
    pub fn read(&mut self, n: usize) -> Option<ReadRegion<'_, 'a>> {
        if self.staging.available_bytes() > 0 {
            if self.staging.available_bytes() >= n {
                return Some(ReadRegion::Staging(&mut self.staging));
            }
            let addon = n - self.staging.available_bytes();
            if addon <= self.direct.available_bytes() {
                self.copy_direct_into_staging(addon);
                return Some(ReadRegion::Staging(&mut self.staging));
            }
            self.copy_direct_into_staging(self.direct.available_bytes());
            return None;
        }

        if self.direct.available_bytes() >= n {
            return Some(ReadRegion::Direct(&mut self.direct));
        }
        self.staging.reset();
        self.copy_direct_into_staging(self.direct.available_bytes());
        None
    }

    pub fn read_reserved(&mut self, n: usize, reserved: usize) -> Option<ReadRegion<'_, 'a>> {
        self.read(n + reserved)
    }

    /// Drain up to `n` bytes (staging first, then direct) into `out`.
    /// Returns the number of bytes actually copied.
    pub fn copy(&mut self, out: &mut OutCursor<'_>, n: usize) -> usize {
        let mut remaining = n;
        if self.staging.available_bytes() > 0 && remaining > 0 {
            let take = remaining.min(self.staging.available_bytes());
            out.write(&self.staging.remaining()[..take]);
            self.staging.consume(take);
            remaining -= take;
        }
        if remaining > 0 && self.direct.available_bytes() > 0 {
            let take = remaining.min(self.direct.available_bytes());
            out.write(&self.direct.remaining()[..take]);
            self.direct.consume(take);
            remaining -= take;
        }
        n - remaining
    }

    pub fn copy_remaining(&mut self, out: &mut OutCursor<'_>) -> usize {
        let n = self.available_bytes();
        self.copy(out, n)
    }
}

/// Read exactly `n` bytes into `dst`, optionally feeding them to an
/// integrity hash as they're consumed. Used by the dictionary kernels,
/// which always want an atomic "give me this many bytes or tell me to
/// stall" read. Returns `false` on stall (nothing is partially consumed).
pub fn read_exact(
    tp: &mut Teleport<'_>,
    n: usize,
    dst: &mut [u8],
    hash: Option<&mut crate::hash::IntegrityHasher>,
) -> bool {
    let ok = match tp.read(n) {
        Some(mut region) => {
            region.read(dst, n);
            true
        }
        None => false,
    };
    if ok {
        if let Some(h) = hash {
            h.update(&dst[..n]);
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_only_read_returns_direct() {
        let data = b"hello world";
        let mut tp = Teleport::new(data);
        match tp.read(5) {
            Some(ReadRegion::Direct(cur)) => {
                let mut buf = [0u8; 5];
                cur.read(&mut buf, 5);
                assert_eq!(&buf, b"hello");
            }
            _ => panic!("expected direct region"),
        }
    }

    #[test]
    fn insufficient_input_stalls() {
        let data = b"ab";
        let mut tp = Teleport::new(data);
        assert!(tp.read(10).is_none());
        assert_eq!(tp.available_bytes(), 2);
    }

    #[test]
    fn staging_accumulates_across_refills() {
        let mut tp = Teleport::new(b"ab");
        assert!(tp.read(4).is_none());
        tp.change_input_buffer(b"cd");
        match tp.read(4) {
            Some(ReadRegion::Staging(view)) => {
                let mut buf = [0u8; 4];
                view.read(&mut buf, 4);
                assert_eq!(&buf, b"abcd");
            }
            _ => panic!("expected staging region"),
        }
    }

    #[test]
    fn copy_remaining_drains_everything() {
        let mut tp = Teleport::new(b"ab");
        assert!(tp.read(4).is_none());
        tp.change_input_buffer(b"cdef");
        let mut out = [0u8; 16];
        let mut cursor = OutCursor::new(&mut out);
        let n = tp.copy_remaining(&mut cursor);
        assert_eq!(n, 6);
        assert_eq!(&out[..6], b"abcdef");
    }
}
