//! In-memory chain store.

use std::collections::{HashMap, VecDeque};

use ethers::types::H256;
use log::debug;
use parking_lot::RwLock;

use chainscope_types::block::Block;

use crate::{ChainStore, StoreError};

/// How many rejected blocks are retained for diagnostics.
pub const BAD_BLOCK_LIMIT: usize = 10;

/// In-memory block database with hash and number indexes.
#[derive(Default)]
pub struct MemoryChainStore {
    chain: RwLock<ChainIndex>,
    bad: RwLock<VecDeque<Block>>,
}

#[derive(Default)]
struct ChainIndex {
    by_hash: HashMap<H256, Block>,
    hash_by_number: HashMap<u64, H256>,
    head: Option<H256>,
}

impl ChainIndex {
    fn head_number(&self) -> Option<u64> {
        self.head
            .as_ref()
            .and_then(|hash| self.by_hash.get(hash))
            .map(Block::number)
    }
}

impl MemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejected block for later reporting. The ring keeps the
    /// newest [`BAD_BLOCK_LIMIT`] entries.
    pub fn record_bad_block(&self, block: Block) {
        let mut bad = self.bad.write();
        if bad.len() == BAD_BLOCK_LIMIT {
            bad.pop_back();
        }
        bad.push_front(block);
    }

    pub fn block_count(&self) -> usize {
        self.chain.read().by_hash.len()
    }
}

impl ChainStore for MemoryChainStore {
    fn has_block(&self, hash: &H256, number: u64) -> bool {
        self.chain
            .read()
            .by_hash
            .get(hash)
            .map_or(false, |block| block.number() == number)
    }

    fn block_by_number(&self, number: u64) -> Option<Block> {
        let chain = self.chain.read();
        let hash = chain.hash_by_number.get(&number)?;
        chain.by_hash.get(hash).cloned()
    }

    fn block_by_hash(&self, hash: &H256) -> Option<Block> {
        self.chain.read().by_hash.get(hash).cloned()
    }

    fn current_block(&self) -> Option<Block> {
        let chain = self.chain.read();
        chain.by_hash.get(chain.head.as_ref()?).cloned()
    }

    fn insert_chain(&self, blocks: Vec<Block>) -> Result<usize, StoreError> {
        let mut chain = self.chain.write();
        let mut inserted = 0usize;
        for block in blocks {
            let hash = block.hash();
            if chain.by_hash.contains_key(&hash) {
                continue;
            }
            let parent = block.parent_hash();
            if block.number() > 0 && !chain.by_hash.contains_key(&parent) {
                return Err(StoreError::UnknownParent {
                    hash,
                    number: block.number(),
                    parent,
                });
            }
            chain.hash_by_number.insert(block.number(), hash);
            if chain.head_number().map_or(true, |head| block.number() >= head) {
                chain.head = Some(hash);
            }
            chain.by_hash.insert(hash, block);
            inserted += 1;
        }
        if inserted > 0 {
            debug!("inserted {inserted} blocks, head now #{:?}", chain.head_number());
        }
        Ok(inserted)
    }

    fn bad_blocks(&self) -> Vec<Block> {
        self.bad.read().iter().cloned().collect()
    }
}
