//! Hash-to-block index for prefix cache lookups.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::block_hash::BlockHashWithGroupId;

/// Map from (content hash, cache group) to the block holding that content.
///
/// Each key maps to exactly one block id: the first writer wins. When two
/// blocks independently compute identical content before either is evicted,
/// the second insert is a no-op and that block simply stays unreachable via
/// this key. De-duplication is by block id, never by comparing hash bits.
pub(crate) struct PrefixCacheIndex {
    map: HashMap<BlockHashWithGroupId, usize>,
}

impl PrefixCacheIndex {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert `block_id` under `key` unless the key is already mapped.
    /// Returns whether the entry was actually inserted.
    pub(crate) fn insert(&mut self, key: BlockHashWithGroupId, block_id: usize) -> bool {
        match self.map.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(block_id);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Look up the block cached under `key`.
    pub(crate) fn get(&self, key: &BlockHashWithGroupId) -> Option<usize> {
        self.map.get(key).copied()
    }

    /// Delete the mapping for `key` only if it currently stores `block_id`.
    /// Returns the removed id, or `None` if the key is absent or maps to a
    /// different block.
    pub(crate) fn remove(&mut self, key: &BlockHashWithGroupId, block_id: usize) -> Option<usize> {
        match self.map.get(key) {
            Some(&stored) if stored == block_id => self.map.remove(key),
            _ => None,
        }
    }

    /// Number of distinct keys currently mapped.
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }
}
