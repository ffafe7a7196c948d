//! Batched, resumable chain import.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use flate2::read::GzDecoder;
use log::{debug, info};
use rlp::PayloadInfo;

use chainscope_store::ChainStore;
use chainscope_types::block::Block;

use crate::{export::is_gzip, TransferError};

/// Blocks decoded per insertion batch.
pub const IMPORT_BATCH: usize = 2500;

const READ_CHUNK: usize = 64 * 1024;

/// Incremental decoder for back-to-back block RLP.
///
/// The stream has no framing beyond the encodings themselves: the next
/// item's length is probed from its RLP header, bytes are buffered until the
/// item is whole, and a clean end of input between items terminates the
/// stream. Input ending inside an item is corruption, not completion.
pub struct BlockStream<R: Read> {
    reader: R,
    buffer: Vec<u8>,
    /// Ordinal of the next block, carried into decode errors.
    index: usize,
}

impl<R: Read> BlockStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            index: 0,
        }
    }

    /// Decodes the next block, or `None` at a clean end of stream.
    pub fn next_block(&mut self) -> Result<Option<Block>, TransferError> {
        loop {
            if let Some(total) = self.framed_len()? {
                if self.buffer.len() >= total {
                    let block = rlp::decode::<Block>(&self.buffer[..total]).map_err(|source| {
                        TransferError::Decode {
                            index: self.index,
                            source,
                        }
                    })?;
                    self.buffer.drain(..total);
                    self.index += 1;
                    return Ok(Some(block));
                }
            }
            if !self.fill()? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(TransferError::Truncated { index: self.index });
            }
        }
    }

    /// Total length of the next RLP item, once enough of its header has
    /// been buffered.
    fn framed_len(&self) -> Result<Option<usize>, TransferError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        match PayloadInfo::from(&self.buffer) {
            Ok(info) => Ok(Some(info.total())),
            Err(rlp::DecoderError::RlpIsTooShort) => Ok(None),
            Err(source) => Err(TransferError::Decode {
                index: self.index,
                source,
            }),
        }
    }

    fn fill(&mut self) -> Result<bool, TransferError> {
        let mut chunk = vec![0u8; READ_CHUNK];
        let read = self.reader.read(&mut chunk)?;
        self.buffer.extend_from_slice(&chunk[..read]);
        Ok(read > 0)
    }
}

/// Imports a stream of serialized blocks in batches of [`IMPORT_BATCH`].
///
/// A batch whose blocks are all present already is discarded, which makes
/// the operation idempotent and resumable against a partially imported
/// store. Returns the number of blocks actually inserted.
pub fn import_blocks(store: &dyn ChainStore, reader: impl Read) -> Result<u64, TransferError> {
    let mut stream = BlockStream::new(reader);
    let mut imported = 0u64;
    let mut batch_index = 0usize;
    loop {
        let mut batch = Vec::with_capacity(IMPORT_BATCH);
        while batch.len() < IMPORT_BATCH {
            match stream.next_block()? {
                Some(block) => batch.push(block),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        if has_all_blocks(store, &batch) {
            debug!(
                "batch {batch_index}: all {} blocks already known, skipping",
                batch.len()
            );
            batch_index += 1;
            continue;
        }
        imported += store
            .insert_chain(batch)
            .map_err(|source| TransferError::Insert {
                batch: batch_index,
                source,
            })? as u64;
        batch_index += 1;
    }
    info!("imported {imported} new blocks from {batch_index} batches");
    Ok(imported)
}

fn has_all_blocks(store: &dyn ChainStore, blocks: &[Block]) -> bool {
    blocks
        .iter()
        .all(|block| store.has_block(&block.hash(), block.number()))
}

/// Imports from a file; a `.gz` suffix selects gzip decompression. Failure
/// to open the file is reported before anything is read.
pub fn import_from_path(
    store: &dyn ChainStore,
    path: impl AsRef<Path>,
) -> Result<u64, TransferError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if is_gzip(path) {
        import_blocks(store, GzDecoder::new(BufReader::new(file)))
    } else {
        import_blocks(store, BufReader::new(file))
    }
}
