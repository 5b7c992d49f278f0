//! The greedy LZ4 block compressor.
//!
//! A hash-indexed position table proposes earlier occurrences of the bytes at
//! the cursor; every candidate is verified by direct comparison before use, so
//! a collision costs ratio but never correctness. The encoder walks the input
//! exactly once, extends matches forward only, and records one table entry per
//! byte it advances through, including bytes consumed by a match.

use std::cmp;
use std::io::{self, Write};
use std::mem;

use byteorder::{NativeEndian, WriteBytesExt, LE};
use cfg_if::cfg_if;
use fehler::{throw, throws};
use thiserror::Error;

use super::table::{EncoderTable, U16Table, U32Table};
use super::MINMATCH;

type Error = io::Error;

/// Back-references cannot reach further than this behind the cursor.
const MAX_DISTANCE: usize = 0xFFFF;

/// Once fewer bytes than this remain, the rest of the block is literal-only.
/// The block format requires the final five bytes to be literals and the last
/// match to start no later than twelve bytes before the end.
const MFLIMIT: usize = 12;

/// Matches may not extend into the final five bytes.
const LAST_LITERALS: usize = 5;

/// Worst-case size of a raw block compressed from `input_len` bytes.
///
/// Incompressible data grows by one extension byte per 255 literals, plus a
/// constant for the token and tail headroom.
pub fn compress_bound(input_len: usize) -> usize {
    input_len + input_len / 255 + 16
}

/// The destination buffer cannot take the compressed block.
///
/// Sizing the destination with [`compress_bound`] rules this error out.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
#[error("output buffer too small for the compressed block")]
pub struct CapacityError;

/// A verified back-reference produced by the match finder.
#[derive(Copy, Clone, Debug)]
struct Match {
    /// Distance back from the cursor to the duplicate, in `[1, 65535]`.
    offset: u16,

    /// Match length beyond the implied `MINMATCH` bytes.
    extra: usize,
}

/// Length of the common prefix of `a` and `b`, compared a register at a time.
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    const REGSIZE: usize = mem::size_of::<usize>();
    fn read_register(bytes: &[u8]) -> usize {
        let mut buf = [0u8; REGSIZE];
        buf.copy_from_slice(&bytes[..REGSIZE]);
        usize::from_ne_bytes(buf)
    }
    cfg_if! {
        if #[cfg(target_endian = "little")] {
            fn mismatch_zeros(xor: usize) -> u32 { xor.trailing_zeros() }
        } else {
            fn mismatch_zeros(xor: usize) -> u32 { xor.leading_zeros() }
        }
    }

    let mut len = 0;
    for (a, b) in a.chunks_exact(REGSIZE).zip(b.chunks_exact(REGSIZE)) {
        let xor = read_register(a) ^ read_register(b);
        if xor != 0 {
            return len + (mismatch_zeros(xor) / 8) as usize;
        }
        len += REGSIZE;
    }

    // every full register matched; up to REGSIZE-1 tail bytes remain
    len + a.iter().zip(b).skip(len).take_while(|&(x, y)| x == y).count()
}

fn length_nibble(value: usize) -> u8 {
    cmp::min(value, 0xF) as u8
}

/// Writes the extension bytes for a length whose nibble saturated at 15:
/// each byte adds up to 255, the final byte is < 255.
#[throws]
fn write_length_extension<W: Write>(writer: &mut W, mut value: usize) {
    if value < 0xF {
        return;
    }

    value -= 0xF;

    while value >= 4 * 0xFF {
        // four saturated extension bytes at once
        writer.write_u32::<NativeEndian>(u32::MAX)?;
        value -= 4 * 0xFF;
    }
    while value >= 0xFF {
        writer.write_u8(0xFF)?;
        value -= 0xFF;
    }
    writer.write_u8(value as u8)?;
}

/// Serializes one sequence: token, literal length extension, the literals
/// themselves and, unless this is the terminal sequence, the match offset and
/// match length extension.
#[throws]
fn write_sequence<W: Write>(writer: &mut W, literals: &[u8], found: Option<Match>) {
    let mut token = length_nibble(literals.len()) << 4;
    if let Some(found) = found {
        token |= length_nibble(found.extra);
    }

    writer.write_u8(token)?;
    write_length_extension(writer, literals.len())?;
    writer.write_all(literals)?;

    if let Some(found) = found {
        writer.write_u16::<LE>(found.offset)?;
        write_length_extension(writer, found.extra)?;
    }
}

/// Compresses `input[start..]` as one raw block, with `input[..start]` acting
/// as the back-reference window (pass 0 for an independent block).
///
/// The table carries match-finder state across dependent blocks; it must be
/// fresh (or rebased) to positions of `input` or the output is garbage.
#[throws]
pub fn compress_with<T: EncoderTable, W: Write>(
    input: &[u8],
    start: usize,
    table: &mut T,
    mut writer: W,
) {
    assert!(input.len() <= T::payload_size_limit());

    let mut cursor = start;
    while cursor < input.len() {
        let literal_start = cursor;

        // scan forward until a candidate survives verification
        let found = loop {
            if input.len() - cursor < MFLIMIT {
                // block epilogue: everything left is literals
                write_sequence(&mut writer, &input[literal_start..], None)?;
                return;
            }

            let candidate = table.replace(input, cursor);
            if candidate < cursor && cursor - candidate <= MAX_DISTANCE {
                // the hash is only a hint; let the bytes decide
                let matched = common_prefix_len(
                    &input[cursor..input.len() - LAST_LITERALS],
                    &input[candidate..],
                );
                if let Some(extra) = matched.checked_sub(MINMATCH) {
                    let offset = (cursor - candidate) as u16;
                    let match_end = cursor + matched;

                    // one entry per byte the match consumes, so future lookups
                    // stay fresh; positions past the match-finder limit are
                    // never looked up and not worth recording
                    let insert_end = cmp::min(match_end, input.len() - MFLIMIT + 1);
                    for pos in cursor + 1..insert_end {
                        table.replace(input, pos);
                    }

                    cursor = match_end;
                    break Match { offset, extra };
                }
            }

            // no match here (or just a collision), try the next byte
            cursor += 1;
        };

        let literal_end = cursor - found.extra - MINMATCH;
        write_sequence(&mut writer, &input[literal_start..literal_end], Some(found))?;
    }
}

/// Compresses `input` as a single raw block into `output`, returning the
/// compressed length.
///
/// Fails the moment a write would overrun `output`, without touching anything
/// past its end. A destination sized with [`compress_bound`] never fails.
#[throws(CapacityError)]
pub fn compress_into(input: &[u8], output: &mut [u8]) -> usize {
    let capacity = output.len();

    let mut sink = NoPartialWrites(output);
    let result = if input.len() <= U16Table::payload_size_limit() {
        compress_with(input, 0, &mut U16Table::default(), &mut sink)
    } else {
        compress_with(input, 0, &mut U32Table::default(), &mut sink)
    };

    match result {
        Ok(()) => capacity - sink.0.len(),
        Err(e) => {
            debug_assert_eq!(e.kind(), io::ErrorKind::WriteZero);
            throw!(CapacityError);
        }
    }
}

/// Compresses `input` into a freshly allocated raw block.
pub fn compress_block(input: &[u8]) -> Vec<u8> {
    let mut output = vec![0u8; compress_bound(input.len())];
    let compressed_len =
        compress_into(input, &mut output).expect("a bound-sized buffer cannot overflow");
    output.truncate(compressed_len);
    output
}

/// Write adapter over a byte slice that refuses any write it cannot take in
/// full.
///
/// The `Write` impl on `&mut [u8]` commits partial data before reporting
/// failure, which forces multi-byte writes through per-byte range checks.
/// Callers here throw the whole buffer away on failure, so failing without
/// writing is both simpler and faster.
pub(crate) struct NoPartialWrites<'a>(pub &'a mut [u8]);

impl<'a> Write for NoPartialWrites<'a> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.0.len() < data.len() {
            return Err(io::ErrorKind::WriteZero.into());
        }

        let amt = data.len();
        let (head, tail) = mem::replace(&mut self.0, &mut []).split_at_mut(amt);
        head.copy_from_slice(data);
        self.0 = tail;
        Ok(amt)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
