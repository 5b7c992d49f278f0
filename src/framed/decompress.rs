//! Reading LZ4 frames.

use std::cmp;
use std::convert::TryInto;
use std::hash::Hasher;
use std::io::{self, BufRead, Read};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use fehler::{throw, throws};
use thiserror::Error;
use twox_hash::XxHash32;

use super::header::{self, BlockDescriptor, Flags};
use super::{MAGIC, UNCOMPRESSED_BIT, WINDOW_SIZE};
use crate::raw;

/// Errors when decompressing an LZ4 frame.
#[derive(Error, Debug)]
pub enum DecompressionError {
    #[error("error reading the compressed frame")]
    InputError(#[from] io::Error),
    #[error("corrupt block payload (data corruption?)")]
    CodecError(#[from] raw::DecodeError),
    #[error("invalid frame header")]
    HeaderParseError(#[from] header::ParseError),
    #[error("wrong magic number in frame header: {0:08x}")]
    WrongMagic(u32),
    #[error("the header checksum does not match the descriptor")]
    HeaderChecksumFail,
    #[error("a block checksum was invalid")]
    BlockChecksumFail,
    #[error("the content checksum does not match the decoded data")]
    FrameChecksumFail,
    #[error("header declares {expected} content bytes but the frame decoded to {actual}")]
    ContentSizeMismatch { expected: u64, actual: u64 },
    #[error("a block length prefix does not fit in memory")]
    BlockLengthOverflow,
    #[error("a block is larger than the frame's declared maximum block size")]
    BlockSizeOverflow,
}
type Error = DecompressionError; // do it this way for better docs

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, e)
    }
}

/// A lying content-size field must not translate into a giant allocation
/// before a single block has decoded successfully.
const PREALLOC_LIMIT: usize = 32 * 1024 * 1024;

/// Reads an LZ4 frame block by block.
pub struct LZ4FrameReader<R: Read> {
    reader: R,
    flags: Flags,
    block_maxsize: usize,
    read_buf: Vec<u8>,
    content_size: Option<u64>,
    dictionary_id: Option<u32>,
    content_hasher: Option<XxHash32>,
    total_decoded: u64,
    carryover_window: Option<Vec<u8>>,
    finished: bool,
}

impl<R: Read> LZ4FrameReader<R> {
    /// Parses and validates the frame header, failing before any block data
    /// is touched if the magic, version, reserved bits or header checksum are
    /// off.
    #[throws]
    pub fn new(mut reader: R) -> Self {
        let magic = reader.read_u32::<LE>()?;
        if magic != MAGIC {
            throw!(Error::WrongMagic(magic));
        }

        let flags_byte = reader.read_u8()?;
        let flags = Flags::parse(flags_byte)?;
        let bd = BlockDescriptor::parse(reader.read_u8()?)?;

        // collect the descriptor bytes as written, so the checksum covers
        // exactly the wire representation
        let mut descriptor = vec![flags_byte, bd.0];

        let content_size = if flags.content_size() {
            let size = reader.read_u64::<LE>()?;
            descriptor.write_u64::<LE>(size)?;
            Some(size)
        } else {
            None
        };

        let dictionary_id = if flags.dictionary_id() {
            let id = reader.read_u32::<LE>()?;
            descriptor.write_u32::<LE>(id)?;
            Some(id)
        } else {
            None
        };

        let stored_checksum = reader.read_u8()?;
        let mut hasher = XxHash32::with_seed(0);
        hasher.write(&descriptor);
        if stored_checksum != (hasher.finish() >> 8) as u8 {
            throw!(Error::HeaderChecksumFail);
        }

        let content_hasher = if flags.content_checksum() {
            Some(XxHash32::with_seed(0))
        } else {
            None
        };

        let carryover_window = if flags.independent_blocks() {
            None
        } else {
            Some(Vec::with_capacity(WINDOW_SIZE))
        };

        LZ4FrameReader {
            reader,
            flags,
            block_maxsize: bd.block_maxsize()?,
            read_buf: Vec::new(),
            content_size,
            dictionary_id,
            content_hasher,
            total_decoded: 0,
            carryover_window,
            finished: false,
        }
    }

    /// The frame's maximum uncompressed block size.
    pub fn block_size(&self) -> usize { self.block_maxsize }
    /// The content size declared in the header, if any.
    pub fn frame_size(&self) -> Option<u64> { self.content_size }
    /// The dictionary id declared in the header, if any.
    pub fn dictionary_id(&self) -> Option<u32> { self.dictionary_id }
    /// True once the end-mark (and content checksum, if any) was consumed.
    pub fn finished(&self) -> bool { self.finished }

    pub fn into_read(self) -> LZ4FrameIoReader<R> {
        LZ4FrameIoReader {
            buffer: Vec::with_capacity(self.block_size()),
            bytes_taken: 0,
            frame_reader: self,
        }
    }

    /// Decodes the next block into `output`, which must be empty.
    ///
    /// `output` stays empty when the end-mark is reached; since a frame may
    /// in principle also contain a zero-length block, use
    /// [`finished`](Self::finished) to tell the two apart.
    #[throws]
    pub fn decode_block(&mut self, output: &mut Vec<u8>) {
        assert!(output.is_empty(), "decode_block needs an empty output buffer");

        if self.finished {
            return;
        }

        let reader = &mut self.reader;

        let block_length = reader.read_u32::<LE>()?;
        if block_length == 0 {
            if let Some(hasher) = self.content_hasher.take() {
                let stored = reader.read_u32::<LE>()?;
                if hasher.finish() != u64::from(stored) {
                    throw!(Error::FrameChecksumFail);
                }
            }
            if let Some(expected) = self.content_size {
                if self.total_decoded != expected {
                    throw!(Error::ContentSizeMismatch {
                        expected,
                        actual: self.total_decoded,
                    });
                }
            }
            self.finished = true;
            return;
        }

        let is_compressed = block_length & UNCOMPRESSED_BIT == 0;
        let block_length: usize = (block_length & !UNCOMPRESSED_BIT)
            .try_into()
            .or(Err(Error::BlockLengthOverflow))?;

        if block_length > self.block_maxsize {
            throw!(Error::BlockSizeOverflow);
        }

        let buf = &mut self.read_buf;
        buf.resize(block_length, 0);
        reader.read_exact(buf.as_mut_slice())?;

        if self.flags.block_checksums() {
            let stored = reader.read_u32::<LE>()?;
            let mut hasher = XxHash32::with_seed(0);
            hasher.write(buf);
            if hasher.finish() != u64::from(stored) {
                throw!(Error::BlockChecksumFail);
            }
        }

        if is_compressed {
            let window: &[u8] = self.carryover_window.as_deref().unwrap_or(&[]);
            raw::decompress_raw(buf, window, output, self.block_maxsize)?;
        } else {
            output.extend_from_slice(buf);
        }

        if let Some(window) = self.carryover_window.as_mut() {
            // stored blocks enter the window too: later blocks may reference
            // their bytes just like any other decoded content
            let outlen = output.len();
            if outlen < WINDOW_SIZE {
                let available = window.len() + outlen;
                if let Some(surplus) = available.checked_sub(WINDOW_SIZE) {
                    window.drain(..surplus);
                }
                window.extend_from_slice(output);
            } else {
                window.clear();
                window.extend_from_slice(&output[outlen - WINDOW_SIZE..]);
            }

            debug_assert!(window.len() <= WINDOW_SIZE);
        }

        self.total_decoded += output.len() as u64;
        if let Some(expected) = self.content_size {
            if self.total_decoded > expected {
                throw!(Error::ContentSizeMismatch {
                    expected,
                    actual: self.total_decoded,
                });
            }
        }

        if let Some(hasher) = self.content_hasher.as_mut() {
            hasher.write(output);
        }
    }
}

/// Wrapper around [`LZ4FrameReader`] that implements `Read` and `BufRead`.
pub struct LZ4FrameIoReader<R: Read> {
    frame_reader: LZ4FrameReader<R>,
    bytes_taken: usize,
    buffer: Vec<u8>,
}

impl<R: Read> Read for LZ4FrameIoReader<R> {
    #[throws(io::Error)]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mybuf = self.fill_buf()?;
        let bytes_to_take = cmp::min(mybuf.len(), buf.len());
        buf[..bytes_to_take].copy_from_slice(&mybuf[..bytes_to_take]);
        self.consume(bytes_to_take);
        bytes_to_take
    }
}

impl<R: Read> BufRead for LZ4FrameIoReader<R> {
    #[throws(io::Error)]
    fn fill_buf(&mut self) -> &[u8] {
        // skip over empty blocks so an empty return always means end-of-frame
        while self.bytes_taken == self.buffer.len() && !self.frame_reader.finished() {
            self.buffer.clear();
            self.frame_reader.decode_block(&mut self.buffer)?;
            self.bytes_taken = 0;
        }
        &self.buffer[self.bytes_taken..]
    }

    fn consume(&mut self, amt: usize) {
        self.bytes_taken += amt;
        assert!(
            self.bytes_taken <= self.buffer.len(),
            "consumed more bytes than the buffer held"
        );
    }
}

/// Decompresses an entire frame, appending the content to `output`.
///
/// The buffer is the caller's to reuse across calls; when the frame declares
/// a content size, capacity is reserved up front.
#[throws]
pub fn decompress_frame_into<R: Read>(reader: R, output: &mut Vec<u8>) {
    let mut frame = LZ4FrameReader::new(reader)?;

    if let Some(content_size) = frame.frame_size() {
        let hint: usize = content_size.try_into().unwrap_or(usize::MAX);
        output.reserve(cmp::min(hint, PREALLOC_LIMIT));
    }

    let mut block = Vec::with_capacity(frame.block_size());
    while !frame.finished() {
        frame.decode_block(&mut block)?;
        output.extend_from_slice(&block);
        block.clear();
    }
}

/// Decompresses a whole frame into a fresh buffer.
#[throws]
pub fn decompress_frame<R: Read>(reader: R) -> Vec<u8> {
    let mut plaintext = Vec::new();
    decompress_frame_into(reader, &mut plaintext)?;
    plaintext
}
