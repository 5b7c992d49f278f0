//! Writing LZ4 frames.

use std::hash::Hasher;
use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{WriteBytesExt, LE};
use fehler::throws;
use thiserror::Error;
use twox_hash::XxHash32;

use super::header::{BlockDescriptor, Flags};
use super::{MAGIC, UNCOMPRESSED_BIT, WINDOW_SIZE};
use crate::raw::{compress_bound, compress_with, EncoderTable, NoPartialWrites, U32Table};

/// Errors when compressing an LZ4 frame.
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("error reading the data to be compressed")]
    ReadError(io::Error),
    #[error("error writing the compressed frame")]
    WriteError(#[from] io::Error),
    #[error("no canonical block-size class fits the requested block size")]
    InvalidBlockSize,
}
type Error = CompressionError; // do it this way for better docs

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, e)
    }
}

/// A builder-style struct that configures compression settings.
/// This is how you compress LZ4 frames.
/// (An LZ4 file usually consists of a single frame.)
///
/// Create it using `Default::default()`.
pub struct CompressionSettings {
    independent_blocks: bool,
    block_checksums: bool,
    content_checksum: bool,
    block_size: usize,
    dictionary_id: Option<u32>,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            independent_blocks: true,
            block_checksums: false,
            content_checksum: true,
            block_size: 4 * 1024 * 1024,
            dictionary_id: None,
        }
    }
}

impl CompressionSettings {
    /// In independent mode, blocks may not reference data from previous
    /// blocks, so every block decodes on its own. Dependent blocks compress
    /// slightly better but force the frame to be decoded from the beginning.
    ///
    /// Blocks are independent by default.
    pub fn independent_blocks(&mut self, v: bool) -> &mut Self {
        self.independent_blocks = v;
        self
    }

    /// Block checksums can help localize data corruption in storage and
    /// transit. They do not offer error correction.
    ///
    /// Most callers want the cheaper content checksum instead; a lower layer
    /// usually deals with corruption more comprehensively.
    ///
    /// Block checksums are disabled by default.
    pub fn block_checksums(&mut self, v: bool) -> &mut Self {
        self.block_checksums = v;
        self
    }

    /// The content checksum (also called frame checksum) covers the whole
    /// decoded content. Its overhead is constant, but it can only be verified
    /// after the entire frame has been read.
    ///
    /// Content checksums are enabled by default.
    pub fn content_checksum(&mut self, v: bool) -> &mut Self {
        self.content_checksum = v;
        self
    }

    /// Maximum number of uncompressed bytes per block.
    ///
    /// The frame header only has room for four canonical classes
    /// (64 KiB, 256 KiB, 1 MiB, 4 MiB); the header advertises the smallest
    /// class that fits this value, while blocks are split at the value itself.
    /// Values above 4 MiB fit no class and fail with
    /// [`CompressionError::InvalidBlockSize`].
    ///
    /// The default block size is 4 MiB.
    pub fn block_size(&mut self, v: usize) -> &mut Self {
        self.block_size = v;
        self
    }

    /// An application-specific identifier for the dictionary both sides
    /// agreed on out of band, recorded in the frame header.
    ///
    /// This library only carries the id; dictionary contents never
    /// participate in compression here.
    ///
    /// No id is written by default.
    pub fn dictionary_id(&mut self, id: Option<u32>) -> &mut Self {
        self.dictionary_id = id;
        self
    }

    #[throws]
    pub fn compress<R: Read, W: Write>(&self, reader: R, writer: W) {
        self.compress_internal(reader, writer, None)?;
    }

    /// Like [`compress`](Self::compress), but also records `content_size` in
    /// the header without checking it against the data actually read.
    #[throws]
    pub fn compress_with_size_unchecked<R: Read, W: Write>(
        &self,
        reader: R,
        writer: W,
        content_size: u64,
    ) {
        self.compress_internal(reader, writer, Some(content_size))?;
    }

    /// Measures the reader by seeking and records the remaining length as the
    /// frame's content size.
    #[throws]
    pub fn compress_with_size<R: Read + Seek, W: Write>(&self, mut reader: R, writer: W) {
        let start = reader.seek(SeekFrom::Current(0)).map_err(Error::ReadError)?;
        let end = reader.seek(SeekFrom::End(0)).map_err(Error::ReadError)?;
        reader.seek(SeekFrom::Start(start)).map_err(Error::ReadError)?;

        self.compress_internal(reader, writer, Some(end - start))?;
    }

    /// Compresses a byte slice into a freshly allocated frame.
    #[throws]
    pub fn compress_to_vec(&self, input: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(compress_bound(input.len()) + 32);
        self.compress(input, &mut output)?;
        output
    }

    #[throws]
    fn compress_internal<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        content_size: Option<u64>,
    ) {
        let bd = BlockDescriptor::new(self.block_size).ok_or(Error::InvalidBlockSize)?;

        let mut content_hasher = None;
        let mut flags = Flags::empty();
        if self.independent_blocks {
            flags |= Flags::IndependentBlocks;
        }
        if self.block_checksums {
            flags |= Flags::BlockChecksums;
        }
        if self.content_checksum {
            flags |= Flags::ContentChecksum;
            content_hasher = Some(XxHash32::with_seed(0));
        }
        if self.dictionary_id.is_some() {
            flags |= Flags::DictionaryId;
        }
        if content_size.is_some() {
            flags |= Flags::ContentSize;
        }

        let version = 1 << 6;
        let flag_byte = version | flags.bits();

        let mut header = Vec::with_capacity(19);
        header.write_u32::<LE>(MAGIC)?;
        header.write_u8(flag_byte)?;
        header.write_u8(bd.0)?;

        if let Some(content_size) = content_size {
            header.write_u64::<LE>(content_size)?;
        }
        if let Some(id) = self.dictionary_id {
            header.write_u32::<LE>(id)?;
        }

        // the header checksum covers the descriptor only, not the magic;
        // its second byte is what goes on the wire
        let mut header_hasher = XxHash32::with_seed(0);
        header_hasher.write(&header[4..]);
        header.write_u8((header_hasher.finish() >> 8) as u8)?;
        writer.write_all(&header)?;

        let mut in_buffer = Vec::with_capacity(self.block_size);
        let mut out_buffer = vec![0u8; self.block_size];
        let mut table = U32Table::default();
        loop {
            let window_offset = in_buffer.len();

            // We basically want read_exact semantics, except at the end.
            // Sadly read_exact specifies the buffer contents to be undefined
            // on error, so we have to use this construction instead.
            reader
                .by_ref()
                .take(self.block_size as u64)
                .read_to_end(&mut in_buffer)
                .map_err(Error::ReadError)?;
            let read_bytes = in_buffer.len() - window_offset;
            if read_bytes == 0 {
                break;
            }

            if let Some(hasher) = content_hasher.as_mut() {
                hasher.write(&in_buffer[window_offset..]);
            }

            // Capping the compressed size at the input size means the ratio
            // can never go negative: overflowing the cap stores the block raw.
            let mut sink = NoPartialWrites(&mut out_buffer[..read_bytes]);
            let payload: &[u8] = match compress_with(&in_buffer, window_offset, &mut table, &mut sink)
            {
                Ok(()) => {
                    let compressed_len = read_bytes - sink.0.len();
                    writer.write_u32::<LE>(compressed_len as u32)?;
                    &out_buffer[..compressed_len]
                }
                Err(e) => {
                    debug_assert_eq!(e.kind(), io::ErrorKind::WriteZero);
                    writer.write_u32::<LE>(read_bytes as u32 | UNCOMPRESSED_BIT)?;
                    &in_buffer[window_offset..]
                }
            };

            writer.write_all(payload)?;
            if flags.contains(Flags::BlockChecksums) {
                let mut block_hasher = XxHash32::with_seed(0);
                block_hasher.write(payload);
                writer.write_u32::<LE>(block_hasher.finish() as u32)?;
            }

            if flags.contains(Flags::IndependentBlocks) {
                in_buffer.clear();
                table = U32Table::default();
            } else if in_buffer.len() > WINDOW_SIZE {
                // keep only the window the next block may reference
                let surplus = in_buffer.len() - WINDOW_SIZE;
                table.rebase(surplus);
                in_buffer.drain(..surplus);
            }
        }
        writer.write_u32::<LE>(0)?;

        if let Some(hasher) = content_hasher {
            writer.write_u32::<LE>(hasher.finish() as u32)?;
        }
    }
}
