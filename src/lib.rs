//! A streaming, block-structured compression codec family: a byte-oriented
//! pass-through mode (`copy`), a single-hash dictionary mode (`chameleon`),
//! and a two-slot predictive mode (`cheetah`), framed with optional
//! per-block integrity hashing and back-pointers for parallelizable
//! decompression.
//!
//! Ported from the `densityxx` design (see `DESIGN.md` for the grounding
//! ledger); module layout and idiom follow `jafreck-lz4r`.

pub mod block;
pub mod buffer;
pub mod config;
pub mod format;
pub mod hash;
pub mod header;
pub mod kernel;
pub mod memory;
pub mod stream;

pub use buffer::{compress, decompress, BufferError, BufferReport};
pub use format::{BlockType, CompressionMode};
pub use stream::{DecodeStatus, Decoder, EncodeStatus, Encoder};
