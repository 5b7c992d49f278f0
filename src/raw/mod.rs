//! The raw LZ4 block format.
//!
//! A raw block is the token stream alone: no header, no length fields, no
//! checksums. Using it directly saves the framing overhead (~11 bytes) but
//! loses the stored-uncompressed escape for incompressible data, so a block's
//! compressed form can end up larger than its input. [`compress_bound`]
//! gives the worst case a destination buffer must accommodate.

mod compress;
mod decompress;
mod table;

pub use compress::{compress_block, compress_bound, compress_into, compress_with, CapacityError};
pub use decompress::{decompress_block, decompress_raw, DecodeError};
pub use table::{EncoderTable, U16Table, U32Table};

pub(crate) use compress::NoPartialWrites;

/// Matches shorter than this are not encodable; match lengths are stored
/// biased by it on the wire.
pub(crate) const MINMATCH: usize = 4;
