//! Metadata for a single KV cache block.

use crate::block_hash::BlockHashWithGroupId;

/// Sentinel value for "no link" in the doubly-linked free list.
pub(crate) const NO_LINK: usize = usize::MAX;

/// Metadata for one fixed-size cache block.
///
/// Blocks are stored in a flat `Vec` indexed by `block_id`. The free list is
/// threaded through the `prev_free`/`next_free` fields, so no heap allocation
/// happens per list node. Only the free queue and the pool write these
/// fields.
#[derive(Debug)]
pub(crate) struct CacheBlock {
    /// Block ID, ranging over 0..capacity for real blocks.
    #[allow(dead_code)]
    pub(crate) block_id: usize,
    /// Reference count. 0 means the block is unreferenced (free or an
    /// eviction candidate).
    pub(crate) ref_cnt: u32,
    /// Content hash, set once the block's contents are finalized and cached.
    /// Retained when the block is freed so a future request with the same
    /// prefix can reclaim it; cleared only on eviction (reallocation).
    pub(crate) block_hash: Option<BlockHashWithGroupId>,
    /// Previous block in the free list (`NO_LINK` when not in the free list).
    pub(crate) prev_free: usize,
    /// Next block in the free list (`NO_LINK` when not in the free list).
    pub(crate) next_free: usize,
    /// Whether this is the null block (placeholder, never allocated or freed).
    pub(crate) is_null: bool,
}

impl CacheBlock {
    pub(crate) fn new(block_id: usize) -> Self {
        Self {
            block_id,
            ref_cnt: 0,
            block_hash: None,
            prev_free: NO_LINK,
            next_free: NO_LINK,
            is_null: false,
        }
    }

    /// Check if this block is currently linked into the free list.
    pub(crate) fn is_free_listed(&self) -> bool {
        self.prev_free != NO_LINK || self.next_free != NO_LINK
    }

    /// Reset the hash when the block is evicted (reallocated) or the prefix
    /// cache is reset.
    pub(crate) fn reset_hash(&mut self) {
        self.block_hash = None;
    }
}
