//! Fixed-layout frame records: main header/footer, block header/mode-marker/
//! footer. Ported from `densityxx/format.hpp`'s `main_header_t`,
//! `main_footer_t`, `block_header_t`, `block_mode_marker_t`, `block_footer_t`.
//!
//! Every record serializes/parses field-by-field via the little-endian
//! helpers in [`crate::format`] rather than a struct-to-bytes cast.

use crate::format::{read_le32, read_le64, write_le32, write_le64};
use crate::format::{BlockType, CompressionMode};

/// Crate version stamped into every main header, mirroring
/// `DENSITYXX_MAJOR`/`MINOR`/`REVISION` in `densityxx/globals.hpp`.
pub const VERSION_MAJOR: u8 = 0;
pub const VERSION_MINOR: u8 = 12;
pub const VERSION_REVISION: u8 = 5;

pub const MAIN_HEADER_SIZE: usize = 8;
pub const MAIN_FOOTER_SIZE: usize = 4;
pub const BLOCK_HEADER_SIZE: usize = 4;
pub const BLOCK_MODE_MARKER_SIZE: usize = 2;
pub const BLOCK_FOOTER_SIZE: usize = 16;

/// `main_header_t::parameters`: currently only byte 0 is defined (the
/// dictionary reset cycle shift); the remaining 7 bytes are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MainHeaderParameters {
    pub dict_reset_cycle_shift: u8,
}

impl MainHeaderParameters {
    pub fn to_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = self.dict_reset_cycle_shift;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        MainHeaderParameters {
            dict_reset_cycle_shift: bytes[0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub version_revision: u8,
    pub compression_mode: CompressionMode,
    pub block_type: BlockType,
    pub parameters: MainHeaderParameters,
}

impl MainHeader {
    /// Equivalent to `main_header_t::write`'s convenience overload, which
    /// fills in the current library version automatically.
    pub fn new(
        compression_mode: CompressionMode,
        block_type: BlockType,
        parameters: MainHeaderParameters,
    ) -> Self {
        MainHeader {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            version_revision: VERSION_REVISION,
            compression_mode,
            block_type,
            parameters,
        }
    }

    // The 8-byte on-wire main header packs: version[3] + mode(1) +
    // block_type(1) + reserved(1) + dict_reset_cycle_shift(1) + spare(1).
    // `densityxx` carries a full 8-byte `parameters` union alongside a
    // separate 3-byte reserved field; this crate's wire format is defined to
    // be exactly 8 bytes and keeps only the one parameter byte that is
    // actually assigned meaning, folding the rest into reserved bytes.
    pub fn write(&self, dst: &mut [u8]) {
        dst[0] = self.version_major;
        dst[1] = self.version_minor;
        dst[2] = self.version_revision;
        dst[3] = self.compression_mode as u8;
        dst[4] = self.block_type as u8;
        dst[5] = 0;
        dst[6] = self.parameters.dict_reset_cycle_shift;
        dst[7] = 0;
    }

    pub fn parse(src: &[u8]) -> Option<MainHeader> {
        let compression_mode = CompressionMode::from_u8(src[3])?;
        let block_type = BlockType::from_u8(src[4])?;
        Some(MainHeader {
            version_major: src[0],
            version_minor: src[1],
            version_revision: src[2],
            compression_mode,
            block_type,
            parameters: MainHeaderParameters {
                dict_reset_cycle_shift: src[6],
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MainFooter {
    pub relative_position: u32,
}

impl MainFooter {
    pub fn write(&self, dst: &mut [u8]) {
        write_le32(dst, 0, self.relative_position);
    }

    pub fn parse(src: &[u8]) -> MainFooter {
        MainFooter {
            relative_position: read_le32(src, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub relative_position: u32,
}

impl BlockHeader {
    pub fn write(&self, dst: &mut [u8]) {
        write_le32(dst, 0, self.relative_position);
    }

    pub fn parse(src: &[u8]) -> BlockHeader {
        BlockHeader {
            relative_position: read_le32(src, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockModeMarker {
    pub mode: u8,
}

impl BlockModeMarker {
    pub fn write(&self, dst: &mut [u8]) {
        dst[0] = self.mode;
        dst[1] = 0;
    }

    pub fn parse(src: &[u8]) -> BlockModeMarker {
        BlockModeMarker { mode: src[0] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFooter {
    pub hashsum1: u64,
    pub hashsum2: u64,
}

impl BlockFooter {
    pub fn write(&self, dst: &mut [u8]) {
        write_le64(dst, 0, self.hashsum1);
        write_le64(dst, 8, self.hashsum2);
    }

    pub fn parse(src: &[u8]) -> BlockFooter {
        BlockFooter {
            hashsum1: read_le64(src, 0),
            hashsum2: read_le64(src, 8),
        }
    }

    /// Equivalent to `block_footer_t::check`.
    pub fn check(&self, hashsum1: u64, hashsum2: u64) -> bool {
        self.hashsum1 == hashsum1 && self.hashsum2 == hashsum2
    }
}
