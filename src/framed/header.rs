//! The FLG/BD descriptor bytes of a frame header.

use bitflags::bitflags;
use fehler::{throw, throws};
use thiserror::Error;

/// The four canonical maximum block sizes, indexed by BD id 4 through 7.
const BLOCK_MAXSIZES: [usize; 4] = [64 * 1024, 256 * 1024, 1024 * 1024, 4 * 1024 * 1024];

bitflags! {
    pub struct Flags: u8 {
        const IndependentBlocks = 0b00100000;
        const BlockChecksums    = 0b00010000;
        const ContentSize       = 0b00001000;
        const ContentChecksum   = 0b00000100;
        const DictionaryId      = 0b00000001;
    }
}

/// Problems in the FLG or BD byte.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("block size id {0} is reserved")]
    UnimplementedBlocksize(u8),
    #[error("frame version {0} not supported")]
    UnsupportedVersion(u8),
    #[error("reserved bits in flags set")]
    ReservedFlagBitsSet,
    #[error("reserved bits in bd set")]
    ReservedBdBitsSet,
}

impl Flags {
    #[throws(ParseError)]
    pub fn parse(i: u8) -> Self {
        let version = i >> 6;
        if version != 1 {
            throw!(ParseError::UnsupportedVersion(version));
        }
        if (i & 0b10) != 0 {
            throw!(ParseError::ReservedFlagBitsSet);
        }

        Flags::from_bits_truncate(i)
    }

    pub fn independent_blocks(&self) -> bool { self.contains(Flags::IndependentBlocks) }
    pub fn block_checksums(&self)    -> bool { self.contains(Flags::BlockChecksums) }
    pub fn content_size(&self)       -> bool { self.contains(Flags::ContentSize) }
    pub fn content_checksum(&self)   -> bool { self.contains(Flags::ContentChecksum) }
    pub fn dictionary_id(&self)      -> bool { self.contains(Flags::DictionaryId) }
}

/// The BD byte: bits 4 to 6 select one of the four block-size classes.
pub struct BlockDescriptor(pub u8);

impl BlockDescriptor {
    /// Picks the smallest canonical class that fits blocks of `block_maxsize`
    /// bytes. `None` for zero or anything above the largest class (4 MiB).
    pub fn new(block_maxsize: usize) -> Option<Self> {
        if block_maxsize == 0 {
            return None;
        }
        let class = BLOCK_MAXSIZES.iter().position(|&max| block_maxsize <= max)?;
        Some(BlockDescriptor(((class as u8) + 4) << 4))
    }

    #[throws(ParseError)]
    pub fn parse(i: u8) -> Self {
        if (i & 0b1000_1111) != 0 {
            throw!(ParseError::ReservedBdBitsSet);
        }
        BlockDescriptor(i)
    }

    #[throws(ParseError)]
    pub fn block_maxsize(&self) -> usize {
        let id = (self.0 >> 4) & 0b111;
        if (4..8).contains(&id) {
            BLOCK_MAXSIZES[usize::from(id - 4)]
        } else {
            throw!(ParseError::UnimplementedBlocksize(id))
        }
    }
}
