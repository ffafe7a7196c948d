//! Account-level state inspection over trie snapshots.
//!
//! [`view::StateView`] roots an account trie at one block's state root and
//! resolves accounts and their storage tries. On top of it,
//! [`range::storage_range_at`] paginates one account's storage slots, and
//! [`diff::modified_accounts_by_number`] / [`diff::modified_accounts_by_hash`]
//! compute the set of addresses changed between two historical states.

pub mod diff;
pub mod range;
pub mod view;
