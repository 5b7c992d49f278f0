#![forbid(unsafe_code)]
#![allow(non_upper_case_globals)]

//! Pure Rust implementation of the LZ4 block and frame formats.
//!
//! The [`raw`] module implements the block format: the greedy compressor, the
//! token decoder and the hash-indexed position tables behind them. The
//! [`framed`] module wraps raw blocks in the self-describing frame container
//! (an LZ4 file usually consists of a single frame).
//!
//! ```
//! use lz4_codec::framed::{CompressionSettings, decompress_frame};
//!
//! let frame = CompressionSettings::default().compress_to_vec(b"lz4 frames, all the way down")?;
//! assert_eq!(decompress_frame(frame.as_slice())?, b"lz4 frames, all the way down");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod framed;
pub mod raw;

pub use crate::framed::{
    decompress_frame, decompress_frame_into, CompressionError, CompressionSettings,
    DecompressionError, LZ4FrameIoReader, LZ4FrameReader,
};
pub use crate::raw::{
    compress_block, compress_bound, compress_into, decompress_block, CapacityError, DecodeError,
};
