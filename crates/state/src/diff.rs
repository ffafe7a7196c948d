//! Accounts modified between two historical states.

use std::sync::Arc;

use ethers::types::{H160, H256};
use log::debug;
use thiserror::Error;

use chainscope_store::ChainStore;
use chainscope_trie::{DifferenceCursor, NodeStore, Trie, TrieError};
use chainscope_types::block::Block;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("start block {0} not found")]
    StartNotFound(String),
    #[error("end block {0} not found")]
    EndNotFound(String),
    #[error("block #{0} has no parent")]
    NoParent(u64),
    #[error("start block height ({start}) must be less than end block height ({end})")]
    InvalidRange { start: u64, end: u64 },
    #[error("no preimage found for key {0:?}")]
    PreimageMissing(H256),
    #[error("trie error {0}")]
    Trie(#[from] TrieError),
}

/// Accounts changed between two blocks resolved by number. With no end
/// number, reports the accounts modified by the start block itself
/// (parent .. start).
pub fn modified_accounts_by_number(
    store: &dyn ChainStore,
    db: Arc<dyn NodeStore>,
    start: u64,
    end: Option<u64>,
) -> Result<Vec<H160>, DiffError> {
    let start_block = store
        .block_by_number(start)
        .ok_or_else(|| DiffError::StartNotFound(format!("#{start}")))?;
    let (start_block, end_block) = match end {
        Some(end) => {
            let end_block = store
                .block_by_number(end)
                .ok_or_else(|| DiffError::EndNotFound(format!("#{end}")))?;
            (start_block, end_block)
        }
        None => shift_to_parent(store, start_block)?,
    };
    modified_accounts(db, &start_block, &end_block)
}

/// Accounts changed between two blocks resolved by hash. With no end hash,
/// reports the accounts modified by the start block itself.
pub fn modified_accounts_by_hash(
    store: &dyn ChainStore,
    db: Arc<dyn NodeStore>,
    start: H256,
    end: Option<H256>,
) -> Result<Vec<H160>, DiffError> {
    let start_block = store
        .block_by_hash(&start)
        .ok_or_else(|| DiffError::StartNotFound(format!("{start:?}")))?;
    let (start_block, end_block) = match end {
        Some(end) => {
            let end_block = store
                .block_by_hash(&end)
                .ok_or_else(|| DiffError::EndNotFound(format!("{end:?}")))?;
            (start_block, end_block)
        }
        None => shift_to_parent(store, start_block)?,
    };
    modified_accounts(db, &start_block, &end_block)
}

/// Re-anchors a single-block query on (parent, block).
fn shift_to_parent(
    store: &dyn ChainStore,
    block: Block,
) -> Result<(Block, Block), DiffError> {
    let parent = store
        .block_by_hash(&block.parent_hash())
        .ok_or(DiffError::NoParent(block.number()))?;
    Ok((parent, block))
}

/// Runs a difference cursor over the two blocks' account tries and resolves
/// every changed key back to its address.
///
/// The result is unique (the cursor never revisits a key) and deterministic,
/// in difference order. A key with no recorded preimage fails the whole call:
/// a partial address set would be indistinguishable from a complete one.
pub fn modified_accounts(
    db: Arc<dyn NodeStore>,
    start_block: &Block,
    end_block: &Block,
) -> Result<Vec<H160>, DiffError> {
    if start_block.number() >= end_block.number() {
        return Err(DiffError::InvalidRange {
            start: start_block.number(),
            end: end_block.number(),
        });
    }
    let old = Trie::open(db.clone(), start_block.state_root());
    let new = Trie::open(db, end_block.state_root());
    let mut cursor = DifferenceCursor::new(&old, &new)?;
    let mut dirty = Vec::new();
    while let Some((key, _value)) = cursor.next_entry()? {
        let preimage = new
            .resolve_preimage(&key)
            .ok_or(DiffError::PreimageMissing(key))?;
        dirty.push(address_from_preimage(&preimage));
    }
    debug!(
        "accounts modified between #{} and #{}: {}",
        start_block.number(),
        end_block.number(),
        dirty.len()
    );
    Ok(dirty)
}

/// Account-trie preimages are addresses; tolerate left padding the way the
/// wire format does.
fn address_from_preimage(bytes: &[u8]) -> H160 {
    let mut out = H160::zero();
    let tail = &bytes[bytes.len().saturating_sub(20)..];
    out.as_bytes_mut()[20 - tail.len()..].copy_from_slice(tail);
    out
}

#[cfg(test)]
mod tests {
    use ethers::types::U256;
    use ethers::utils::keccak256;

    use super::*;
    use chainscope_store::MemoryChainStore;
    use chainscope_trie::{MemoryNodeStore, TrieMut};
    use chainscope_types::{account::AccountState, block::Header, constants::EMPTY_TRIE_ROOT};

    fn address(n: u64) -> H160 {
        H160::from_low_u64_be(n)
    }

    /// Appends a block whose state sets `balance` for `account`.
    fn append_block(
        store: &MemoryChainStore,
        writer: &mut TrieMut,
        account: H160,
        balance: u64,
    ) -> Block {
        writer
            .insert_keyed(
                account.as_bytes(),
                AccountState::with_balance(U256::from(balance)).encoded(),
            )
            .unwrap();
        let parent = store.current_block();
        let block = Block {
            header: Header {
                parent_hash: parent.as_ref().map(Block::hash).unwrap_or_default(),
                state_root: writer.root(),
                number: parent.map(|p| p.number() + 1).unwrap_or_default(),
                ..Header::default()
            },
            transactions: vec![],
        };
        store.insert_chain(vec![block.clone()]).unwrap();
        block
    }

    fn fixture() -> (MemoryChainStore, Arc<MemoryNodeStore>, TrieMut) {
        let db = Arc::new(MemoryNodeStore::new());
        let store = MemoryChainStore::new();
        let genesis = Block {
            header: Header {
                state_root: EMPTY_TRIE_ROOT,
                ..Header::default()
            },
            transactions: vec![],
        };
        store.insert_chain(vec![genesis]).unwrap();
        let writer = TrieMut::new(db.clone());
        (store, db, writer)
    }

    #[test]
    fn single_new_account_is_the_whole_diff() {
        let (store, db, mut writer) = fixture();
        append_block(&store, &mut writer, address(1), 100);
        let dirty = modified_accounts_by_number(&store, db, 0, Some(1)).unwrap();
        assert_eq!(dirty, vec![address(1)]);
    }

    #[test]
    fn wider_ranges_subsume_narrower_ones() {
        let (store, db, mut writer) = fixture();
        append_block(&store, &mut writer, address(1), 100);
        append_block(&store, &mut writer, address(2), 200);

        let narrow = modified_accounts_by_number(&store, db.clone(), 1, Some(2)).unwrap();
        assert_eq!(narrow, vec![address(2)]);

        let wide = modified_accounts_by_number(&store, db, 0, Some(2)).unwrap();
        assert_eq!(wide.len(), 2);
        for account in narrow {
            assert!(wide.contains(&account));
        }
    }

    #[test]
    fn missing_end_defaults_to_the_parent() {
        let (store, db, mut writer) = fixture();
        append_block(&store, &mut writer, address(1), 100);
        let block2 = append_block(&store, &mut writer, address(2), 200);

        let by_number = modified_accounts_by_number(&store, db.clone(), 2, None).unwrap();
        assert_eq!(by_number, vec![address(2)]);

        let by_hash =
            modified_accounts_by_hash(&store, db, block2.hash(), None).unwrap();
        assert_eq!(by_hash, vec![address(2)]);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let (store, db, mut writer) = fixture();
        append_block(&store, &mut writer, address(1), 100);
        append_block(&store, &mut writer, address(2), 200);
        assert!(matches!(
            modified_accounts_by_number(&store, db.clone(), 2, Some(1)),
            Err(DiffError::InvalidRange { start: 2, end: 1 })
        ));
        assert!(matches!(
            modified_accounts_by_number(&store, db, 1, Some(1)),
            Err(DiffError::InvalidRange { start: 1, end: 1 })
        ));
    }

    #[test]
    fn unknown_blocks_are_reported_not_swallowed() {
        let (store, db, mut writer) = fixture();
        append_block(&store, &mut writer, address(1), 100);
        assert!(matches!(
            modified_accounts_by_number(&store, db.clone(), 5, None),
            Err(DiffError::StartNotFound(_))
        ));
        assert!(matches!(
            modified_accounts_by_number(&store, db.clone(), 0, Some(9)),
            Err(DiffError::EndNotFound(_))
        ));
        assert!(matches!(
            modified_accounts_by_hash(&store, db, H256::from_low_u64_be(42), None),
            Err(DiffError::StartNotFound(_))
        ));
    }

    #[test]
    fn genesis_has_no_parent_to_default_to() {
        let (store, db, _writer) = fixture();
        assert!(matches!(
            modified_accounts_by_number(&store, db, 0, None),
            Err(DiffError::NoParent(0))
        ));
    }

    #[test]
    fn missing_preimage_fails_the_whole_call() {
        let (store, db, mut writer) = fixture();
        append_block(&store, &mut writer, address(1), 100);
        // Write an account record directly under its hashed key, without
        // recording the preimage.
        let ghost = address(0xbeef);
        writer
            .insert(
                &H256(keccak256(ghost.as_bytes())),
                AccountState::with_balance(U256::one()).encoded(),
            )
            .unwrap();
        let parent = store.current_block().unwrap();
        let block = Block {
            header: Header {
                parent_hash: parent.hash(),
                state_root: writer.root(),
                number: parent.number() + 1,
                ..Header::default()
            },
            transactions: vec![],
        };
        store.insert_chain(vec![block]).unwrap();

        assert!(matches!(
            modified_accounts_by_number(&store, db, 2, None),
            Err(DiffError::PreimageMissing(_))
        ));
    }
}
