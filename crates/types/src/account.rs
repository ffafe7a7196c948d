//! The account record stored in the state trie.

use ethers::types::{H256, U256};
use rlp_derive::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

use crate::constants::{EMPTY_CODE_HASH, EMPTY_TRIE_ROOT};

/// Account record as kept in the account trie, keyed by the keccak256 digest
/// of the address. The `storage_root` field is the only way to reach an
/// account's storage trie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            storage_root: EMPTY_TRIE_ROOT,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl AccountState {
    /// A plain account holding only a balance.
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// RLP form as stored in the account trie.
    pub fn encoded(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }
}
