//! The LZ4 frame format: the self-describing container around raw blocks.
//!
//! A frame adds a descriptor header (with its own checksum), a length prefix
//! per block with a stored-uncompressed escape for data that refuses to
//! shrink, optional block and content checksums, and a terminating end-mark.

mod compress;
mod decompress;
mod header;

/// The four magic bytes at the start of every LZ4 frame.
const MAGIC: u32 = 0x184D2204;
/// High bit of a block's length prefix: the payload is stored uncompressed.
const UNCOMPRESSED_BIT: u32 = 1 << 31;
/// Raw-format back-references never reach more than 64 KiB behind the cursor.
const WINDOW_SIZE: usize = 64 * 1024;

pub use compress::*;
pub use decompress::*;
pub use header::{BlockDescriptor, Flags, ParseError};
