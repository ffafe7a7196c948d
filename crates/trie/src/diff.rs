//! Difference traversal between two trie snapshots.
//!
//! Both snapshots are walked in parallel, ordered by nibble path. Whenever
//! the two cursors sit on the same path with the same node hash, content
//! addressing guarantees the subtrees are identical and both are skipped
//! without being descended, so the walk touches work proportional to the
//! changed region rather than the full state.

use std::cmp::Ordering;

use ethers::types::H256;

use crate::{
    cursor::{entry_of, NodeCursor, NodeEvent},
    trie::Trie,
    TrieError,
};

/// Cursor yielding the entries present or changed in `new` relative to
/// `old`, in internal-key order.
///
/// Forward-only and non-restartable; a key is never revisited, and an entry
/// whose value is byte-identical in both snapshots is never reported.
pub struct DifferenceCursor {
    old: NodeCursor,
    new: NodeCursor,
    old_event: Option<NodeEvent>,
    old_done: bool,
}

impl DifferenceCursor {
    pub fn new(old: &Trie, new: &Trie) -> Result<Self, TrieError> {
        let mut old_cursor = old.node_cursor();
        let old_event = old_cursor.advance(true)?;
        let old_done = old_event.is_none();
        Ok(Self {
            old: old_cursor,
            new: new.node_cursor(),
            old_event,
            old_done,
        })
    }

    /// Advances to the next new-side event without an identical counterpart
    /// in the old snapshot. The new cursor moves at least one step per call.
    fn advance(&mut self) -> Result<Option<NodeEvent>, TrieError> {
        let Some(mut current) = self.new.advance(true)? else {
            return Ok(None);
        };
        if self.old_done {
            return Ok(Some(current));
        }
        loop {
            let Some(old_event) = self.old_event.as_ref() else {
                return Ok(Some(current));
            };
            match compare_events(old_event, &current) {
                Ordering::Less => {
                    // The new walk moved past this old node; catch up.
                    match self.old.advance(true)? {
                        Some(event) => self.old_event = Some(event),
                        None => {
                            self.old_done = true;
                            return Ok(Some(current));
                        }
                    }
                }
                // Nothing at this position in the old snapshot.
                Ordering::Greater => return Ok(Some(current)),
                Ordering::Equal => {
                    // Same position, same content. Hash-addressed nodes pin
                    // their whole subtree, so neither side descends.
                    let descend = current.hash.is_zero();
                    match self.new.advance(descend)? {
                        Some(event) => current = event,
                        None => return Ok(None),
                    }
                    match self.old.advance(descend)? {
                        Some(event) => self.old_event = Some(event),
                        None => {
                            self.old_done = true;
                            return Ok(Some(current));
                        }
                    }
                }
            }
        }
    }

    /// Next changed entry as (internal key, new value).
    pub fn next_entry(&mut self) -> Result<Option<(H256, Vec<u8>)>, TrieError> {
        while let Some(event) = self.advance()? {
            if let Some(entry) = entry_of(event)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

/// Orders traversal events by path, with value events before stored nodes at
/// the same path, then by content so identical positions compare equal only
/// when their subtrees are identical.
fn compare_events(a: &NodeEvent, b: &NodeEvent) -> Ordering {
    a.path
        .cmp(&b.path)
        .then_with(|| b.is_value().cmp(&a.is_value()))
        .then_with(|| a.hash.cmp(&b.hash))
        .then_with(|| a.value.cmp(&b.value))
}
