//! Read and write handles over trie snapshots.

use std::sync::Arc;

use ethers::types::H256;
use chainscope_types::constants::EMPTY_TRIE_ROOT;

use crate::{
    cursor::{EntryCursor, NodeCursor},
    nibble,
    node::Node,
    store::{MemoryNodeStore, NodeStore},
    TrieError,
};

/// Read-only handle over one trie snapshot.
///
/// Cheap to clone; all clones share the underlying node store. The snapshot
/// is identified solely by its root hash and is never mutated.
#[derive(Clone)]
pub struct Trie {
    pub(crate) root: H256,
    pub(crate) db: Arc<dyn NodeStore>,
}

impl Trie {
    pub fn open(db: Arc<dyn NodeStore>, root: H256) -> Self {
        Self { root, db }
    }

    pub fn root(&self) -> H256 {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root == EMPTY_TRIE_ROOT
    }

    pub(crate) fn load(&self, hash: &H256) -> Result<Node, TrieError> {
        let bytes = self.db.node(hash).ok_or(TrieError::MissingNode(*hash))?;
        Ok(Node::decode(&bytes)?)
    }

    /// Point lookup by internal key.
    pub fn get(&self, key: &H256) -> Result<Option<Vec<u8>>, TrieError> {
        if self.is_empty() {
            return Ok(None);
        }
        let path = nibble::unpack(key.as_bytes());
        let mut offset = 0usize;
        let mut hash = self.root;
        loop {
            match self.load(&hash)? {
                Node::Branch { children } => {
                    let nib = *path.get(offset).ok_or(TrieError::KeyExhausted)?;
                    match children[nib as usize] {
                        Some(child) => {
                            offset += 1;
                            hash = child;
                        }
                        None => return Ok(None),
                    }
                }
                Node::Extension { path: ext, child } => {
                    if path[offset..].starts_with(&ext) {
                        offset += ext.len();
                        hash = child;
                    } else {
                        return Ok(None);
                    }
                }
                Node::Leaf { path: tail, value } => {
                    return Ok((path[offset..] == tail[..]).then_some(value));
                }
            }
        }
    }

    /// Resolves an internal key back to its original, pre-hash key.
    pub fn resolve_preimage(&self, key: &H256) -> Option<Vec<u8>> {
        self.db.preimage(key)
    }

    /// Pre-order node cursor from the root.
    pub fn node_cursor(&self) -> NodeCursor {
        NodeCursor::new(self)
    }

    /// Entry cursor positioned at the first key >= `start`.
    pub fn entries_from(&self, start: &H256) -> Result<EntryCursor, TrieError> {
        EntryCursor::starting_at(self, start)
    }

    /// Entry cursor over the whole snapshot.
    pub fn entries(&self) -> Result<EntryCursor, TrieError> {
        self.entries_from(&H256::zero())
    }
}

/// Write handle that produces new snapshots by path-copying.
///
/// Every insert stores the rewritten spine and returns a new root; nodes of
/// earlier snapshots are left untouched, so unchanged subtrees stay shared
/// between roots.
pub struct TrieMut {
    root: H256,
    db: Arc<MemoryNodeStore>,
}

impl TrieMut {
    /// Starts from the empty snapshot.
    pub fn new(db: Arc<MemoryNodeStore>) -> Self {
        Self {
            root: EMPTY_TRIE_ROOT,
            db,
        }
    }

    /// Continues from an existing snapshot.
    pub fn at_root(db: Arc<MemoryNodeStore>, root: H256) -> Self {
        Self { root, db }
    }

    pub fn root(&self) -> H256 {
        self.root
    }

    /// Read-only view of the current root.
    pub fn snapshot(&self) -> Trie {
        Trie::open(self.db.clone(), self.root)
    }

    /// Inserts or replaces the value for an internal key and returns the new
    /// root hash.
    pub fn insert(&mut self, key: &H256, value: Vec<u8>) -> Result<H256, TrieError> {
        let path = nibble::unpack(key.as_bytes());
        let current = (self.root != EMPTY_TRIE_ROOT).then_some(self.root);
        self.root = self.insert_at(current, &path, value)?;
        Ok(self.root)
    }

    /// Hashes the original key, records its preimage, and inserts under the
    /// digest.
    pub fn insert_keyed(&mut self, key: &[u8], value: Vec<u8>) -> Result<H256, TrieError> {
        let hashed = self.db.insert_preimage(key);
        self.insert(&hashed, value)
    }

    fn load(&self, hash: &H256) -> Result<Node, TrieError> {
        let bytes = self.db.node(hash).ok_or(TrieError::MissingNode(*hash))?;
        Ok(Node::decode(&bytes)?)
    }

    fn store(&self, node: &Node) -> H256 {
        self.db.insert_node(node.encode())
    }

    fn insert_at(
        &self,
        node: Option<H256>,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<H256, TrieError> {
        let Some(hash) = node else {
            return Ok(self.store(&Node::Leaf {
                path: path.to_vec(),
                value,
            }));
        };
        match self.load(&hash)? {
            Node::Leaf {
                path: old_path,
                value: old_value,
            } => {
                if old_path == path {
                    return Ok(self.store(&Node::Leaf {
                        path: old_path,
                        value,
                    }));
                }
                // Keys are fixed width, so the two leaves diverge at some
                // nibble past the common prefix.
                let split = nibble::common_prefix(&old_path, path);
                let mut children: [Option<H256>; 16] = Default::default();
                children[old_path[split] as usize] = Some(self.store(&Node::Leaf {
                    path: old_path[split + 1..].to_vec(),
                    value: old_value,
                }));
                children[path[split] as usize] = Some(self.store(&Node::Leaf {
                    path: path[split + 1..].to_vec(),
                    value,
                }));
                let branch = self.store(&Node::Branch { children });
                Ok(self.wrap_prefix(&path[..split], branch))
            }
            Node::Extension {
                path: ext,
                child,
            } => {
                let split = nibble::common_prefix(&ext, path);
                if split == ext.len() {
                    let new_child = self.insert_at(Some(child), &path[split..], value)?;
                    return Ok(self.store(&Node::Extension {
                        path: ext,
                        child: new_child,
                    }));
                }
                let mut children: [Option<H256>; 16] = Default::default();
                let old_side = if ext.len() == split + 1 {
                    child
                } else {
                    self.store(&Node::Extension {
                        path: ext[split + 1..].to_vec(),
                        child,
                    })
                };
                children[ext[split] as usize] = Some(old_side);
                children[path[split] as usize] = Some(self.store(&Node::Leaf {
                    path: path[split + 1..].to_vec(),
                    value,
                }));
                let branch = self.store(&Node::Branch { children });
                Ok(self.wrap_prefix(&path[..split], branch))
            }
            Node::Branch { mut children } => {
                let nib = *path.first().ok_or(TrieError::KeyExhausted)? as usize;
                let new_child = self.insert_at(children[nib], &path[1..], value)?;
                children[nib] = Some(new_child);
                Ok(self.store(&Node::Branch { children }))
            }
        }
    }

    /// Wraps a subtree in an extension node when the consumed prefix is
    /// non-empty.
    fn wrap_prefix(&self, prefix: &[u8], child: H256) -> H256 {
        if prefix.is_empty() {
            child
        } else {
            self.store(&Node::Extension {
                path: prefix.to_vec(),
                child,
            })
        }
    }
}
