//! Typed view of RLP trie nodes.
//!
//! A node is an RLP list: 17 items for a branch (16 child references plus a
//! value slot that stays empty, since keys are fixed-width digests and can
//! only terminate in a leaf), or 2 items for extension and leaf nodes,
//! distinguished by the hex-prefix flag on the first item. Children are
//! referenced by the keccak256 digest of their encoding.

use ethers::types::H256;
use rlp::{Rlp, RlpStream};
use thiserror::Error;

use crate::nibble::{self, NibbleError};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("rlp decode error {0}")]
    Decoder(#[from] rlp::DecoderError),
    #[error("node has invalid item count {0}")]
    InvalidItemCount(usize),
    #[error("branch value slot expected to be empty")]
    BranchHasValue,
    #[error("child reference expected to be 32 bytes, got {0}")]
    InvalidChildLength(usize),
    #[error("nibble error {0}")]
    Nibble(#[from] NibbleError),
}

/// Decoded trie node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Branch { children: [Option<H256>; 16] },
    Extension { path: Vec<u8>, child: H256 },
    Leaf { path: Vec<u8>, value: Vec<u8> },
}

impl Node {
    /// Decodes a node from its RLP list form.
    pub fn decode(bytes: &[u8]) -> Result<Node, NodeError> {
        let rlp = Rlp::new(bytes);
        match rlp.item_count()? {
            17 => {
                if !rlp.at(16)?.data()?.is_empty() {
                    return Err(NodeError::BranchHasValue);
                }
                let mut children: [Option<H256>; 16] = Default::default();
                for (index, slot) in children.iter_mut().enumerate() {
                    let item = rlp.at(index)?.data()?;
                    if item.is_empty() {
                        continue;
                    }
                    if item.len() != 32 {
                        return Err(NodeError::InvalidChildLength(item.len()));
                    }
                    *slot = Some(H256::from_slice(item));
                }
                Ok(Node::Branch { children })
            }
            2 => {
                let (path, leaf) = nibble::decode_compact(rlp.at(0)?.data()?)?;
                let item = rlp.at(1)?.data()?;
                if leaf {
                    Ok(Node::Leaf {
                        path,
                        value: item.to_vec(),
                    })
                } else {
                    if item.len() != 32 {
                        return Err(NodeError::InvalidChildLength(item.len()));
                    }
                    Ok(Node::Extension {
                        path,
                        child: H256::from_slice(item),
                    })
                }
            }
            count => Err(NodeError::InvalidItemCount(count)),
        }
    }

    /// Encodes the node back to its RLP list form.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new();
        match self {
            Node::Branch { children } => {
                stream.begin_list(17);
                for child in children {
                    match child {
                        Some(hash) => stream.append(hash),
                        None => stream.append_empty_data(),
                    };
                }
                stream.append_empty_data();
            }
            Node::Extension { path, child } => {
                stream.begin_list(2);
                stream.append(&nibble::encode_compact(path, false));
                stream.append(child);
            }
            Node::Leaf { path, value } => {
                stream.begin_list(2);
                stream.append(&nibble::encode_compact(path, true));
                stream.append(value);
            }
        }
        stream.out().to_vec()
    }
}
