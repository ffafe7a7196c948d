//! Forward cursors over one trie snapshot.
//!
//! The node cursor walks a snapshot pre-order with an explicit frame stack
//! (node, nibble prefix, next child index). Leaf values surface as separate
//! events whose paths end in the terminator nibble, so a value orders
//! strictly after the node holding it and the emitted paths are strictly
//! increasing. The difference cursor relies on that ordering.

use std::{cmp::Ordering, sync::Arc};

use ethers::types::H256;
use chainscope_types::constants::EMPTY_TRIE_ROOT;

use crate::{
    nibble::{self, TERMINATOR},
    node::Node,
    store::NodeStore,
    trie::Trie,
    TrieError,
};

/// One traversal event: a stored node, or a leaf value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEvent {
    /// Nibble path at which the event sits. Value events end in the
    /// terminator nibble.
    pub path: Vec<u8>,
    /// Hash of the stored node; zero for value events.
    pub hash: H256,
    /// Leaf payload, present only for value events.
    pub value: Option<Vec<u8>>,
}

impl NodeEvent {
    pub fn is_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Converts a value event into its (internal key, raw value) entry. Node
/// events yield `None`.
pub(crate) fn entry_of(event: NodeEvent) -> Result<Option<(H256, Vec<u8>)>, TrieError> {
    let NodeEvent {
        path,
        value: Some(value),
        ..
    } = event
    else {
        return Ok(None);
    };
    let stripped = path
        .strip_suffix(&[TERMINATOR])
        .ok_or(TrieError::InvalidValuePath)?;
    let bytes = nibble::pack(stripped)?;
    if bytes.len() != 32 {
        return Err(TrieError::InvalidValuePath);
    }
    Ok(Some((H256::from_slice(&bytes), value)))
}

enum Frame {
    Node {
        hash: H256,
        node: Node,
        /// Nibble prefix consumed before this node.
        path: Vec<u8>,
        /// Next child slot to visit (1 past it for two-item nodes).
        next_child: usize,
    },
    Value {
        path: Vec<u8>,
        value: Vec<u8>,
    },
}

enum Pending {
    Value(Vec<u8>, Vec<u8>),
    Child(H256, Vec<u8>),
    Exhausted,
}

/// Pre-order cursor over the nodes of one snapshot.
pub struct NodeCursor {
    db: Arc<dyn NodeStore>,
    root: H256,
    stack: Vec<Frame>,
    started: bool,
}

impl NodeCursor {
    pub(crate) fn new(trie: &Trie) -> Self {
        Self {
            db: trie.db.clone(),
            root: trie.root,
            stack: Vec::new(),
            started: false,
        }
    }

    fn load(&self, hash: &H256) -> Result<Node, TrieError> {
        let bytes = self.db.node(hash).ok_or(TrieError::MissingNode(*hash))?;
        Ok(Node::decode(&bytes)?)
    }

    /// Advances to the next event in pre-order. With `descend = false` the
    /// subtree under the most recently returned event is skipped.
    pub fn advance(&mut self, descend: bool) -> Result<Option<NodeEvent>, TrieError> {
        if !self.started {
            self.started = true;
            if self.root == EMPTY_TRIE_ROOT {
                return Ok(None);
            }
            let node = self.load(&self.root)?;
            self.stack.push(Frame::Node {
                hash: self.root,
                node,
                path: Vec::new(),
                next_child: 0,
            });
            return Ok(self.top_event());
        }
        if !descend {
            self.stack.pop();
        }
        self.step()
    }

    /// Positions the cursor so that the value events still to come are
    /// exactly those with keys >= `start`, in order.
    pub fn seek(&mut self, start: &H256) -> Result<(), TrieError> {
        self.stack.clear();
        self.started = true;
        if self.root == EMPTY_TRIE_ROOT {
            return Ok(());
        }
        let key = nibble::unpack(start.as_bytes());
        let mut prefix: Vec<u8> = Vec::new();
        let mut offset = 0usize;
        let mut hash = self.root;
        loop {
            let node = self.load(&hash)?;
            match node {
                Node::Branch { children } => {
                    let Some(&nib) = key.get(offset) else {
                        // Start key exhausted: the whole subtree is in range.
                        self.stack.push(Frame::Node {
                            hash,
                            node: Node::Branch { children },
                            path: prefix,
                            next_child: 0,
                        });
                        return Ok(());
                    };
                    let child = children[nib as usize];
                    self.stack.push(Frame::Node {
                        hash,
                        node: Node::Branch { children },
                        path: prefix.clone(),
                        next_child: nib as usize + 1,
                    });
                    match child {
                        Some(next) => {
                            prefix.push(nib);
                            offset += 1;
                            hash = next;
                        }
                        // No entry on the start path; iteration resumes with
                        // the siblings above it.
                        None => return Ok(()),
                    }
                }
                Node::Extension { path: ext, child } => {
                    let remaining = &key[offset..(offset + ext.len()).min(key.len())];
                    match ext.as_slice().cmp(remaining) {
                        Ordering::Equal => {
                            self.stack.push(Frame::Node {
                                hash,
                                node: Node::Extension {
                                    path: ext.clone(),
                                    child,
                                },
                                path: prefix.clone(),
                                next_child: 1,
                            });
                            prefix.extend_from_slice(&ext);
                            offset += ext.len();
                            hash = child;
                        }
                        // Subtree sits entirely at or past the start key.
                        Ordering::Greater => {
                            self.stack.push(Frame::Node {
                                hash,
                                node: Node::Extension { path: ext, child },
                                path: prefix,
                                next_child: 0,
                            });
                            return Ok(());
                        }
                        // Subtree sits entirely before the start key.
                        Ordering::Less => return Ok(()),
                    }
                }
                Node::Leaf { path: tail, value } => {
                    let mut full = prefix.clone();
                    full.extend_from_slice(&tail);
                    if full.as_slice() >= key.as_slice() {
                        self.stack.push(Frame::Node {
                            hash,
                            node: Node::Leaf { path: tail, value },
                            path: prefix,
                            next_child: 0,
                        });
                    }
                    return Ok(());
                }
            }
        }
    }

    fn step(&mut self) -> Result<Option<NodeEvent>, TrieError> {
        loop {
            let pending = match self.stack.last_mut() {
                None => return Ok(None),
                Some(Frame::Value { .. }) => Pending::Exhausted,
                Some(Frame::Node {
                    node,
                    path,
                    next_child,
                    ..
                }) => match node {
                    Node::Leaf { path: tail, value } => {
                        if *next_child == 0 {
                            *next_child = 1;
                            let mut full = path.clone();
                            full.extend_from_slice(tail);
                            full.push(TERMINATOR);
                            Pending::Value(full, value.clone())
                        } else {
                            Pending::Exhausted
                        }
                    }
                    Node::Extension { path: ext, child } => {
                        if *next_child == 0 {
                            *next_child = 1;
                            let mut sub = path.clone();
                            sub.extend_from_slice(ext);
                            Pending::Child(*child, sub)
                        } else {
                            Pending::Exhausted
                        }
                    }
                    Node::Branch { children } => {
                        let mut found = Pending::Exhausted;
                        while *next_child < 16 {
                            let index = *next_child;
                            *next_child += 1;
                            if let Some(child) = children[index] {
                                let mut sub = path.clone();
                                sub.push(index as u8);
                                found = Pending::Child(child, sub);
                                break;
                            }
                        }
                        found
                    }
                },
            };
            match pending {
                Pending::Exhausted => {
                    self.stack.pop();
                }
                Pending::Value(path, value) => {
                    self.stack.push(Frame::Value { path, value });
                    return Ok(self.top_event());
                }
                Pending::Child(hash, path) => {
                    let node = self.load(&hash)?;
                    self.stack.push(Frame::Node {
                        hash,
                        node,
                        path,
                        next_child: 0,
                    });
                    return Ok(self.top_event());
                }
            }
        }
    }

    fn top_event(&self) -> Option<NodeEvent> {
        match self.stack.last()? {
            Frame::Node { hash, path, .. } => Some(NodeEvent {
                path: path.clone(),
                hash: *hash,
                value: None,
            }),
            Frame::Value { path, value } => Some(NodeEvent {
                path: path.clone(),
                hash: H256::zero(),
                value: Some(value.clone()),
            }),
        }
    }
}

/// Leaf iterator over one snapshot, in internal-key order.
pub struct EntryCursor {
    inner: NodeCursor,
}

impl EntryCursor {
    pub(crate) fn starting_at(trie: &Trie, start: &H256) -> Result<Self, TrieError> {
        let mut inner = NodeCursor::new(trie);
        inner.seek(start)?;
        Ok(Self { inner })
    }

    /// Next entry as (internal key, raw value).
    pub fn next_entry(&mut self) -> Result<Option<(H256, Vec<u8>)>, TrieError> {
        while let Some(event) = self.inner.advance(true)? {
            if let Some(entry) = entry_of(event)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}
