//! Paginated enumeration of one account's storage slots.

use std::collections::BTreeMap;

use ethers::types::{H160, H256, U256};
use log::debug;
use serde::Serialize;
use thiserror::Error;

use chainscope_trie::TrieError;

use crate::view::{StateView, ViewError};

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("account {0:?} does not exist at the requested state")]
    AccountNotFound(H160),
    #[error("storage value at {key:?} is not a scalar: {source}")]
    Value {
        key: H256,
        source: rlp::DecoderError,
    },
    #[error("view error {0}")]
    View(#[from] ViewError),
    #[error("trie error {0}")]
    Trie(#[from] TrieError),
}

/// One storage slot in a range page. `key` is the original slot key when a
/// preimage is recorded; `None` means the key is unknown, not that the slot
/// is absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<H256>,
    pub value: H256,
}

/// One page of a storage range query, keyed by internal key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRangeResult {
    pub storage: BTreeMap<H256, StorageEntry>,
    /// Continuation key; absent when the page reached the end of the trie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key: Option<H256>,
}

/// Pulls up to `max_results` storage entries of `address` starting at
/// `start_key` (inclusive), plus a continuation key when more remain.
///
/// Chaining calls through `next_key` visits every slot exactly once, in the
/// same order as a single unbounded walk, for any page size.
pub fn storage_range_at(
    view: &StateView,
    address: &H160,
    start_key: &H256,
    max_results: usize,
) -> Result<StorageRangeResult, RangeError> {
    let storage = view
        .storage_trie(address)?
        .ok_or(RangeError::AccountNotFound(*address))?;
    let mut cursor = storage.entries_from(start_key)?;
    let mut result = StorageRangeResult::default();
    while result.storage.len() < max_results {
        let Some((internal_key, raw)) = cursor.next_entry()? else {
            break;
        };
        let value = decode_slot(&internal_key, &raw)?;
        let key = storage
            .resolve_preimage(&internal_key)
            .filter(|bytes| bytes.len() == 32)
            .map(|bytes| H256::from_slice(&bytes));
        result.storage.insert(internal_key, StorageEntry { key, value });
    }
    // Peek one entry past the page so the caller can continue.
    result.next_key = cursor.next_entry()?.map(|(key, _)| key);
    debug!(
        "storage range for {address:?}: {} entries, next {:?}",
        result.storage.len(),
        result.next_key
    );
    Ok(result)
}

/// Storage values are the RLP of a single 256-bit scalar; anything else is
/// corrupt data, not a skippable entry.
fn decode_slot(key: &H256, raw: &[u8]) -> Result<H256, RangeError> {
    let value: U256 = rlp::decode(raw).map_err(|source| RangeError::Value {
        key: *key,
        source,
    })?;
    let mut out = H256::zero();
    value.to_big_endian(out.as_bytes_mut());
    Ok(out)
}
