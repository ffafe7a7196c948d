//! Canonical block structures.
//!
//! A block is content addressed: its hash is the keccak256 digest of the
//! RLP-encoded header. Blocks are never mutated once inserted into a chain
//! store, and the export file format is nothing more than these encodings
//! written back to back.

use ethers::{
    types::{H160, H256, U256},
    utils::keccak256,
};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use rlp_derive::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

/// Block header. Hashing the RLP encoding of this struct yields the block
/// hash.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: H256,
    pub state_root: H256,
    pub transactions_root: H256,
    pub number: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
}

/// A transaction carried in a block body.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub nonce: u64,
    pub to: H160,
    pub value: U256,
    pub payload: Vec<u8>,
}

/// A full block: header plus body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Encodable for Block {
    fn rlp_append(&self, stream: &mut RlpStream) {
        stream.begin_list(2);
        stream.append(&self.header);
        stream.append_list(&self.transactions);
    }
}

impl Decodable for Block {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Block {
            header: rlp.val_at(0)?,
            transactions: rlp.list_at(1)?,
        })
    }
}

impl Block {
    /// Content hash of the block (keccak256 of the RLP-encoded header).
    pub fn hash(&self) -> H256 {
        H256(keccak256(rlp::encode(&self.header)))
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> H256 {
        self.header.parent_hash
    }

    pub fn state_root(&self) -> H256 {
        self.header.state_root
    }

    /// Canonical serialized form, as written to export streams.
    pub fn encoded(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }
}
