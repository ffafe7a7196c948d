//! End-to-end coverage of the admin surface: chain transfer round trips,
//! modified-account queries and storage range pagination against a node
//! fixture with real trie-backed state.

use std::sync::Arc;

use ethers::types::{H160, H256, U256};

use chainscope_admin::{AdminApi, AdminError};
use chainscope_state::{diff::DiffError, range::RangeError};
use chainscope_store::{ChainStore, MemoryChainStore};
use chainscope_transfer::TransferError;
use chainscope_trie::{MemoryNodeStore, TrieMut};
use chainscope_types::{
    account::AccountState,
    block::{Block, Header},
    constants::EMPTY_TRIE_ROOT,
};

/// A node fixture: chain store, trie database and an account-state writer
/// that appends one block per state change.
struct TestNode {
    store: Arc<MemoryChainStore>,
    db: Arc<MemoryNodeStore>,
    api: AdminApi,
    accounts: TrieMut,
}

fn address(n: u64) -> H160 {
    H160::from_low_u64_be(n)
}

fn slot(n: u64) -> H256 {
    H256::from_low_u64_be(n)
}

impl TestNode {
    fn new() -> Self {
        let store = Arc::new(MemoryChainStore::new());
        let db = Arc::new(MemoryNodeStore::new());
        let genesis = Block {
            header: Header {
                state_root: EMPTY_TRIE_ROOT,
                timestamp: 1_700_000_000,
                ..Header::default()
            },
            transactions: vec![],
        };
        store.insert_chain(vec![genesis]).unwrap();
        let api = AdminApi::new(store.clone(), db.clone());
        let accounts = TrieMut::new(db.clone());
        Self {
            store,
            db,
            api,
            accounts,
        }
    }

    fn seal_block(&mut self) -> Block {
        let parent = self.store.current_block().unwrap();
        let block = Block {
            header: Header {
                parent_hash: parent.hash(),
                state_root: self.accounts.root(),
                number: parent.number() + 1,
                timestamp: parent.header.timestamp + 12,
                ..Header::default()
            },
            transactions: vec![],
        };
        self.store.insert_chain(vec![block.clone()]).unwrap();
        block
    }

    /// Appends a block whose state change is one account balance.
    fn push_balance(&mut self, account: H160, balance: u64) -> Block {
        self.accounts
            .insert_keyed(
                account.as_bytes(),
                AccountState::with_balance(U256::from(balance)).encoded(),
            )
            .unwrap();
        self.seal_block()
    }

    /// Appends a block giving `account` the listed storage slots.
    fn push_storage(&mut self, account: H160, slots: &[(H256, U256)]) -> Block {
        let mut storage = TrieMut::new(self.db.clone());
        for (key, value) in slots {
            storage
                .insert_keyed(key.as_bytes(), rlp::encode(value).to_vec())
                .unwrap();
        }
        let record = AccountState {
            storage_root: storage.root(),
            ..AccountState::default()
        };
        self.accounts
            .insert_keyed(account.as_bytes(), record.encoded())
            .unwrap();
        self.seal_block()
    }
}

#[test]
fn export_import_round_trip() -> anyhow::Result<()> {
    let mut node = TestNode::new();
    for n in 1..=12u64 {
        node.push_balance(address(n), n * 10);
    }
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("chain.rlp");
    assert_eq!(node.api.export_chain(&path)?, 13);

    let target_store = Arc::new(MemoryChainStore::new());
    let target = AdminApi::new(target_store.clone(), Arc::new(MemoryNodeStore::new()));
    assert_eq!(target.import_chain(&path)?, 13);

    for number in 0..=12u64 {
        assert_eq!(
            target_store.block_by_number(number),
            node.store.block_by_number(number),
            "block #{number} must survive the round trip"
        );
    }
    assert_eq!(
        target_store.current_block().map(|b| b.number()),
        node.store.current_block().map(|b| b.number())
    );
    Ok(())
}

#[test]
fn import_is_idempotent() {
    let mut node = TestNode::new();
    for n in 1..=5u64 {
        node.push_balance(address(n), n);
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.rlp");
    node.api.export_chain(&path).unwrap();

    let target_store = Arc::new(MemoryChainStore::new());
    let target = AdminApi::new(target_store.clone(), Arc::new(MemoryNodeStore::new()));
    assert_eq!(target.import_chain(&path).unwrap(), 6);
    assert_eq!(target.import_chain(&path).unwrap(), 0);
    assert_eq!(target_store.block_count(), 6);
}

#[test]
fn gzip_export_import_by_file_name() {
    let mut node = TestNode::new();
    for n in 1..=4u64 {
        node.push_balance(address(n), n);
    }
    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("chain.rlp");
    let zipped = dir.path().join("chain.rlp.gz");
    node.api.export_chain(&plain).unwrap();
    node.api.export_chain(&zipped).unwrap();

    // The gzip file is a different byte stream but imports identically.
    assert_ne!(std::fs::read(&plain).unwrap(), std::fs::read(&zipped).unwrap());

    let target_store = Arc::new(MemoryChainStore::new());
    let target = AdminApi::new(target_store.clone(), Arc::new(MemoryNodeStore::new()));
    assert_eq!(target.import_chain(&zipped).unwrap(), 5);
    assert_eq!(
        target_store.current_block(),
        node.store.current_block()
    );
}

#[test]
fn missing_import_file_is_an_io_error() {
    let node = TestNode::new();
    let dir = tempfile::tempdir().unwrap();
    let err = node
        .api
        .import_chain(dir.path().join("does-not-exist.rlp"))
        .unwrap_err();
    assert!(matches!(err, AdminError::Transfer(TransferError::Io(_))));
}

#[test]
fn modified_accounts_for_a_single_block() {
    let mut node = TestNode::new();
    node.push_balance(address(1), 100);
    let dirty = node.api.get_modified_accounts_by_number(0, Some(1)).unwrap();
    assert_eq!(dirty, vec![address(1)]);
}

#[test]
fn wider_diff_is_a_superset_of_the_narrower_one() {
    let mut node = TestNode::new();
    node.push_balance(address(1), 100);
    node.push_balance(address(2), 200);
    node.push_balance(address(3), 300);

    let narrow = node.api.get_modified_accounts_by_number(2, Some(3)).unwrap();
    assert_eq!(narrow, vec![address(3)]);

    let wide = node.api.get_modified_accounts_by_number(0, Some(3)).unwrap();
    assert_eq!(wide.len(), 3);
    for account in narrow {
        assert!(wide.contains(&account));
    }
}

#[test]
fn single_argument_query_defaults_to_the_parent() {
    let mut node = TestNode::new();
    node.push_balance(address(1), 100);
    let block2 = node.push_balance(address(2), 200);

    let explicit = node.api.get_modified_accounts_by_number(1, Some(2)).unwrap();
    let defaulted = node.api.get_modified_accounts_by_number(2, None).unwrap();
    assert_eq!(explicit, defaulted);

    let by_hash = node
        .api
        .get_modified_accounts_by_hash(block2.hash(), None)
        .unwrap();
    assert_eq!(by_hash, defaulted);
}

#[test]
fn inverted_range_is_rejected() {
    let mut node = TestNode::new();
    for n in 1..=10u64 {
        node.push_balance(address(n), n);
    }
    let err = node
        .api
        .get_modified_accounts_by_number(10, Some(5))
        .unwrap_err();
    assert!(matches!(
        err,
        AdminError::Diff(DiffError::InvalidRange { start: 10, end: 5 })
    ));
}

#[test]
fn unknown_block_hash_is_a_not_found_error() {
    let node = TestNode::new();
    let err = node
        .api
        .get_modified_accounts_by_hash(H256::from_low_u64_be(0xdead), None)
        .unwrap_err();
    assert!(matches!(
        err,
        AdminError::Diff(DiffError::StartNotFound(_))
    ));
}

#[test]
fn storage_range_pages_cover_every_slot_once() {
    let mut node = TestNode::new();
    let owner = address(7);
    let entries = 10u64;
    let slots: Vec<(H256, U256)> = (0..entries)
        .map(|n| (slot(n), U256::from(n + 1)))
        .collect();
    let block = node.push_storage(owner, &slots);

    let full = node
        .api
        .storage_range_at(block.hash(), 0, owner, H256::zero(), usize::MAX)
        .unwrap();
    assert_eq!(full.storage.len(), entries as usize);
    assert!(full.next_key.is_none());
    let expected: Vec<H256> = full.storage.keys().cloned().collect();

    // Every slot was written with its preimage, so original keys resolve.
    for entry in full.storage.values() {
        assert!(entry.key.is_some());
    }

    for page_size in [1usize, 5, 10, 11] {
        let mut seen = Vec::new();
        let mut start = H256::zero();
        loop {
            let page = node
                .api
                .storage_range_at(block.hash(), 0, owner, start, page_size)
                .unwrap();
            assert!(page.storage.len() <= page_size);
            seen.extend(page.storage.keys().cloned());
            match page.next_key {
                Some(next) => start = next,
                None => break,
            }
        }
        assert_eq!(seen, expected, "page size {page_size}");
    }
}

#[test]
fn storage_range_for_an_unknown_account_fails() {
    let mut node = TestNode::new();
    let block = node.push_balance(address(1), 1);
    let err = node
        .api
        .storage_range_at(block.hash(), 0, address(99), H256::zero(), 10)
        .unwrap_err();
    assert!(matches!(
        err,
        AdminError::Range(RangeError::AccountNotFound(_))
    ));
}

#[test]
fn storage_range_for_an_unknown_block_fails() {
    let node = TestNode::new();
    let err = node
        .api
        .storage_range_at(H256::from_low_u64_be(5), 0, address(1), H256::zero(), 10)
        .unwrap_err();
    assert!(matches!(err, AdminError::BlockNotFound(_)));
}

#[test]
fn preimage_lookup_round_trips_through_the_reverse_index() {
    let mut node = TestNode::new();
    let account = address(3);
    node.push_balance(account, 30);

    let hashed = H256(ethers::utils::keccak256(account.as_bytes()));
    assert_eq!(node.api.preimage(hashed).unwrap(), account.as_bytes());
    assert!(matches!(
        node.api.preimage(H256::zero()).unwrap_err(),
        AdminError::PreimageNotFound(_)
    ));
}

#[test]
fn bad_blocks_surface_through_the_api() {
    let node = TestNode::new();
    let rejected = Block {
        header: Header {
            number: 1234,
            ..Header::default()
        },
        transactions: vec![],
    };
    node.store.record_bad_block(rejected.clone());

    let report = node.api.get_bad_blocks();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].hash, rejected.hash());
    assert!(report[0].rlp.starts_with("0x"));
}
