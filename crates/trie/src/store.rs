//! Hash-addressed node storage backing trie snapshots.

use std::collections::HashMap;

use ethers::{types::H256, utils::keccak256};
use parking_lot::RwLock;

/// Read access to trie nodes and recorded key preimages.
///
/// Snapshots are immutable once published, so implementations only ever
/// grow; concurrent readers need no coordination beyond this trait.
pub trait NodeStore: Send + Sync {
    /// RLP encoding of the node with the given hash.
    fn node(&self, hash: &H256) -> Option<Vec<u8>>;

    /// Original key whose keccak256 digest is `hash`, when one was recorded.
    /// Absence is a reportable condition, not an empty result.
    fn preimage(&self, hash: &H256) -> Option<Vec<u8>>;
}

/// In-memory node and preimage store.
#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<HashMap<H256, Vec<u8>>>,
    preimages: RwLock<HashMap<H256, Vec<u8>>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one RLP-encoded node and returns its hash.
    pub fn insert_node(&self, rlp: Vec<u8>) -> H256 {
        let hash = H256(keccak256(&rlp));
        self.nodes.write().insert(hash, rlp);
        hash
    }

    /// Records the preimage of `keccak256(key)` and returns the digest.
    pub fn insert_preimage(&self, key: &[u8]) -> H256 {
        let hash = H256(keccak256(key));
        self.preimages.write().insert(hash, key.to_vec());
        hash
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }
}

impl NodeStore for MemoryNodeStore {
    fn node(&self, hash: &H256) -> Option<Vec<u8>> {
        self.nodes.read().get(hash).cloned()
    }

    fn preimage(&self, hash: &H256) -> Option<Vec<u8>> {
        self.preimages.read().get(hash).cloned()
    }
}
