//! Hash-indexed position tables backing the match finder.
//!
//! A table maps the hash of the next few input bytes to the most recent
//! position that produced the same hash. It stores indices, never bytes, and
//! hash collisions are expected: the compressor verifies every candidate by
//! direct comparison before trusting it.

use std::convert::{TryFrom, TryInto};
use std::mem;

use byteorder::{ByteOrder, NativeEndian};
use cfg_if::cfg_if;

/// Number of slots in every table.
///
/// Fewer slots mean more collisions and a worse ratio but less cache traffic.
const TABLE_SIZE: usize = 1 << HASH_BITS;
const HASH_BITS: usize = 12;

pub trait EncoderTable: Default + Clone {
    /// The largest input length this table can address.
    fn payload_size_limit() -> usize;

    /// Records `pos` under the hash of the bytes at `input[pos..]` and
    /// returns the position previously stored in that slot (0 when empty).
    fn replace(&mut self, input: &[u8], pos: usize) -> usize;

    /// Slides the addressable base forward by `amount` bytes, after the
    /// caller dropped that many bytes from the front of its window.
    fn rebase(&mut self, amount: usize);
}

cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        // On 64-bit targets we read 64 bits and fingerprint 5 bytes instead of 4.
        fn slot_for_u32(input: &[u8]) -> usize {
            let v = input.get(..8).map(NativeEndian::read_u64).unwrap_or(0);
            // the read only falls short within the last 7 bytes of the input,
            // where the compressor never starts a match anyway

            cfg_if! {
                if #[cfg(target_endian = "little")] {
                    fn fold(v: u64) -> u64 { (v << 24).wrapping_mul(889_523_592_379) }
                } else {
                    fn fold(v: u64) -> u64 { (v >> 24).wrapping_mul(11_400_714_785_074_694_791) }
                }
            }
            (fold(v) >> (64 - HASH_BITS)) as usize
        }
    } else {
        fn slot_for_u32(input: &[u8]) -> usize {
            slot_for_u16(input) >> 1 // half as many slots as the u16 table
        }
    }
}

fn slot_for_u16(input: &[u8]) -> usize {
    let v = NativeEndian::read_u32(input);
    // one bit less than HASH_BITS would suggest: the u16 table has twice the slots
    (v.wrapping_mul(2_654_435_761) >> (32 - HASH_BITS - 1)) as usize
}

#[derive(Clone)]
pub struct U32Table {
    slots: [u32; TABLE_SIZE],
    base: usize,
}

impl Default for U32Table {
    fn default() -> Self {
        U32Table { slots: [0; TABLE_SIZE], base: 0 }
    }
}

impl EncoderTable for U32Table {
    fn replace(&mut self, input: &[u8], pos: usize) -> usize {
        let absolute = pos + self.base;

        let mut slot = absolute.try_into().expect("EncoderTable contract violated");
        mem::swap(&mut self.slots[slot_for_u32(&input[pos..])], &mut slot);
        usize::try_from(slot)
            .expect("a u32 index always fits a usize on supported targets")
            .saturating_sub(self.base)
    }

    fn rebase(&mut self, amount: usize) {
        self.base += amount;
    }

    fn payload_size_limit() -> usize {
        u32::MAX as usize
    }
}

/// Half-width variant: u16 slots fit twice as many entries into the same
/// memory, for inputs short enough to address with 16 bits.
#[derive(Clone)]
pub struct U16Table {
    slots: [u16; TABLE_SIZE * 2],
    base: usize,
}

impl Default for U16Table {
    fn default() -> Self {
        U16Table { slots: [0; TABLE_SIZE * 2], base: 0 }
    }
}

impl EncoderTable for U16Table {
    fn replace(&mut self, input: &[u8], pos: usize) -> usize {
        let absolute = pos + self.base;

        let mut slot = absolute.try_into().expect("EncoderTable contract violated");
        mem::swap(&mut self.slots[slot_for_u16(&input[pos..])], &mut slot);
        usize::from(slot).saturating_sub(self.base)
    }

    fn rebase(&mut self, amount: usize) {
        self.base += amount;
    }

    fn payload_size_limit() -> usize {
        u16::MAX as usize
    }
}
