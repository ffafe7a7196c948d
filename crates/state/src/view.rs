//! Account view rooted at one block's state root.

use std::sync::Arc;

use ethers::{
    types::{H160, H256},
    utils::keccak256,
};
use thiserror::Error;

use chainscope_trie::{NodeStore, Trie, TrieError};
use chainscope_types::account::AccountState;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("trie error {0}")]
    Trie(#[from] TrieError),
    #[error("account record decode error {0}")]
    Account(#[from] rlp::DecoderError),
}

/// Read-only account view over the state at one block.
///
/// The account trie maps `keccak256(address)` to RLP account records; an
/// account's storage trie is reachable only through its `storage_root`.
pub struct StateView {
    db: Arc<dyn NodeStore>,
    trie: Trie,
}

impl StateView {
    pub fn open(db: Arc<dyn NodeStore>, state_root: H256) -> Self {
        Self {
            trie: Trie::open(db.clone(), state_root),
            db,
        }
    }

    /// The account trie itself.
    pub fn account_trie(&self) -> &Trie {
        &self.trie
    }

    /// Account record for an address, if present at this state.
    pub fn account(&self, address: &H160) -> Result<Option<AccountState>, ViewError> {
        let key = H256(keccak256(address.as_bytes()));
        match self.trie.get(&key)? {
            Some(raw) => Ok(Some(rlp::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Storage root for an address, if the account exists.
    pub fn storage_root(&self, address: &H160) -> Result<Option<H256>, ViewError> {
        Ok(self.account(address)?.map(|account| account.storage_root))
    }

    /// Storage trie handle for an address, if the account exists.
    pub fn storage_trie(&self, address: &H160) -> Result<Option<Trie>, ViewError> {
        Ok(self
            .storage_root(address)?
            .map(|root| Trie::open(self.db.clone(), root)))
    }
}
