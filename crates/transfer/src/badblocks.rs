//! Reporting of recently rejected blocks.

use ethers::types::H256;
use serde::Serialize;
use serde_json::{json, Value};

use chainscope_store::ChainStore;

/// One reported bad block: its hash, raw encoding, and decoded form (or an
/// error object when the decoded form cannot be produced).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadBlockEntry {
    pub hash: H256,
    pub rlp: String,
    pub block: Value,
}

/// Serializes the store's bounded bad-block list for diagnostics, newest
/// first.
pub fn bad_block_report(store: &dyn ChainStore) -> Vec<BadBlockEntry> {
    store
        .bad_blocks()
        .into_iter()
        .map(|block| BadBlockEntry {
            hash: block.hash(),
            rlp: format!("0x{}", hex::encode(block.encoded())),
            block: serde_json::to_value(&block)
                .unwrap_or_else(|error| json!({ "error": error.to_string() })),
        })
        .collect()
}
