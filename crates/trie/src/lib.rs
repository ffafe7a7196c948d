//! The versioned trie layer.
//!
//! Snapshots are immutable mappings from 32-byte internal keys to byte-string
//! values, identified by a root hash. Nodes are RLP lists stored by the
//! keccak256 digest of their encoding, so snapshots that share unchanged
//! subtrees share the underlying nodes; new roots are produced only by the
//! path-copying writer in [`trie::TrieMut`].
//!
//! On top of the store sit the traversal primitives: [`cursor::NodeCursor`]
//! and [`cursor::EntryCursor`] walk one snapshot in internal-key order from
//! an arbitrary start key, and [`diff::DifferenceCursor`] walks two snapshots
//! in parallel, skipping identical subtrees by hash so the cost is
//! proportional to the changed region.

pub mod cursor;
pub mod diff;
pub mod nibble;
pub mod node;
pub mod store;
pub mod trie;

use ethers::types::H256;
use thiserror::Error;

pub use cursor::{EntryCursor, NodeCursor, NodeEvent};
pub use diff::DifferenceCursor;
pub use store::{MemoryNodeStore, NodeStore};
pub use trie::{Trie, TrieMut};

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("node {0} missing from store")]
    MissingNode(H256),
    #[error("node error {0}")]
    Node(#[from] node::NodeError),
    #[error("nibble error {0}")]
    Nibble(#[from] nibble::NibbleError),
    #[error("traversal ran past the end of a fixed-width key")]
    KeyExhausted,
    #[error("value event path does not form a whole 32-byte key")]
    InvalidValuePath,
}
