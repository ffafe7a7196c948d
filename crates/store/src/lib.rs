//! Chain storage consumed by the admin surface.
//!
//! The [`ChainStore`] trait is the boundary to the node's block database;
//! [`MemoryChainStore`] is the in-memory implementation. Insertion is
//! duplicate tolerant: blocks already present are ignored rather than
//! rejected, which is what makes batched import idempotent and safe against
//! concurrent writers racing to insert the same blocks.

pub mod memory;

use ethers::types::H256;
use thiserror::Error;

use chainscope_types::block::Block;

pub use memory::{MemoryChainStore, BAD_BLOCK_LIMIT};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("block {hash} (#{number}) has unknown parent {parent}")]
    UnknownParent {
        hash: H256,
        number: u64,
        parent: H256,
    },
}

/// Block database interface.
pub trait ChainStore: Send + Sync {
    /// Whether the block with this hash sits at this height.
    fn has_block(&self, hash: &H256, number: u64) -> bool;

    fn block_by_number(&self, number: u64) -> Option<Block>;

    fn block_by_hash(&self, hash: &H256) -> Option<Block>;

    /// Current head block; absent only for an empty store.
    fn current_block(&self) -> Option<Block>;

    /// Inserts blocks in order, ignoring the ones already present. Returns
    /// the number actually inserted.
    fn insert_chain(&self, blocks: Vec<Block>) -> Result<usize, StoreError>;

    /// Recently rejected blocks, newest first.
    fn bad_blocks(&self) -> Vec<Block>;
}
