//! The admin/debug operation surface of a full node.
//!
//! [`AdminApi`] exposes the transport-agnostic operations; a JSON-RPC or
//! equivalent binding maps onto these methods 1:1. Every operation runs to
//! completion (or failure) synchronously: state reads work on immutable
//! snapshots and need no locking, and the only mutating path (chain import)
//! serializes through the chain store's own insertion discipline.

use std::{path::Path, sync::Arc};

use ethers::types::{H160, H256};
use thiserror::Error;

use chainscope_state::{
    diff::{self, DiffError},
    range::{self, RangeError, StorageRangeResult},
    view::StateView,
};
use chainscope_store::ChainStore;
use chainscope_transfer::{self as transfer, badblocks::BadBlockEntry, TransferError};
use chainscope_trie::NodeStore;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("block {0:?} not found")]
    BlockNotFound(H256),
    #[error("no preimage recorded for {0:?}")]
    PreimageNotFound(H256),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Diff(#[from] DiffError),
    #[error(transparent)]
    Range(#[from] RangeError),
}

/// Admin surface over one node's chain store and trie database.
pub struct AdminApi {
    store: Arc<dyn ChainStore>,
    db: Arc<dyn NodeStore>,
}

impl AdminApi {
    pub fn new(store: Arc<dyn ChainStore>, db: Arc<dyn NodeStore>) -> Self {
        Self { store, db }
    }

    /// Exports the whole chain to `path`; a `.gz` suffix selects gzip.
    /// Returns the number of blocks written.
    pub fn export_chain(&self, path: impl AsRef<Path>) -> Result<u64, AdminError> {
        Ok(transfer::export_to_path(self.store.as_ref(), path)?)
    }

    /// Imports a chain file produced by [`Self::export_chain`]. Batches
    /// already present are skipped, so re-imports and prefix imports are
    /// no-ops. Returns the number of blocks actually inserted.
    pub fn import_chain(&self, path: impl AsRef<Path>) -> Result<u64, AdminError> {
        Ok(transfer::import_from_path(self.store.as_ref(), path)?)
    }

    /// One page of storage slots of `address` at the state of `block_hash`,
    /// starting at `start_key` (inclusive), at most `max_results` entries.
    ///
    /// `tx_index` is accepted for RPC compatibility; transaction replay is
    /// outside this surface, so the block's own post-state is inspected
    /// regardless of its value.
    pub fn storage_range_at(
        &self,
        block_hash: H256,
        _tx_index: usize,
        address: H160,
        start_key: H256,
        max_results: usize,
    ) -> Result<StorageRangeResult, AdminError> {
        let block = self
            .store
            .block_by_hash(&block_hash)
            .ok_or(AdminError::BlockNotFound(block_hash))?;
        let view = StateView::open(self.db.clone(), block.state_root());
        Ok(range::storage_range_at(
            &view,
            &address,
            &start_key,
            max_results,
        )?)
    }

    /// Addresses of accounts changed between the two blocks. With no end
    /// number, the accounts modified by `start` itself.
    pub fn get_modified_accounts_by_number(
        &self,
        start: u64,
        end: Option<u64>,
    ) -> Result<Vec<H160>, AdminError> {
        Ok(diff::modified_accounts_by_number(
            self.store.as_ref(),
            self.db.clone(),
            start,
            end,
        )?)
    }

    /// Addresses of accounts changed between the two blocks. With no end
    /// hash, the accounts modified by `start` itself.
    pub fn get_modified_accounts_by_hash(
        &self,
        start: H256,
        end: Option<H256>,
    ) -> Result<Vec<H160>, AdminError> {
        Ok(diff::modified_accounts_by_hash(
            self.store.as_ref(),
            self.db.clone(),
            start,
            end,
        )?)
    }

    /// Recorded preimage for a hash, when known.
    pub fn preimage(&self, hash: H256) -> Result<Vec<u8>, AdminError> {
        self.db
            .preimage(&hash)
            .ok_or(AdminError::PreimageNotFound(hash))
    }

    /// Recently rejected blocks with their raw and decoded forms.
    pub fn get_bad_blocks(&self) -> Vec<BadBlockEntry> {
        transfer::badblocks::bad_block_report(self.store.as_ref())
    }
}
