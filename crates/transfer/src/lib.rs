//! Bulk chain transfer.
//!
//! Export writes every block from genesis to the head as back-to-back
//! canonical RLP; import decodes such a stream in bounded batches, skipping
//! batches the store already holds, so importing a prefix of existing
//! history is a no-op beyond membership checks. A `.gz` suffix on either
//! side selects a gzip filter; there is no other framing.

pub mod badblocks;
pub mod export;
pub mod import;

use thiserror::Error;

pub use export::{export_blocks, export_to_path};
pub use import::{import_blocks, import_from_path, BlockStream, IMPORT_BATCH};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("io error {0}")]
    Io(#[from] std::io::Error),
    #[error("block {index}: failed to parse: {source}")]
    Decode {
        index: usize,
        source: rlp::DecoderError,
    },
    #[error("block {index}: stream ended mid-block")]
    Truncated { index: usize },
    #[error("batch {batch}: failed to insert: {source}")]
    Insert {
        batch: usize,
        source: chainscope_store::StoreError,
    },
    #[error("chain store is empty, nothing to export")]
    EmptyChain,
    #[error("block #{0} missing below the chain head")]
    MissingBlock(u64),
}
