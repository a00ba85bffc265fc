//! The block pool: fixed-capacity allocation with content-addressed reuse.
//!
//! The pool owns every block for the process lifetime. Allocation pops from
//! the free queue head (oldest-freed first, which doubles as the eviction
//! order), freeing appends at the tail, and a prefix cache hit reclaims an
//! unreferenced block from the middle of the queue in O(1).
//!
//! Key properties:
//! - O(1) allocation and free under heavy churn
//! - Freed blocks retain their content hash and stay indexed as hit
//!   candidates; the hash is cleared only when the block is reallocated
//! - Allocation is all-or-nothing: a failed call leaves no observable state
//!   change

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::block::CacheBlock;
use crate::block_hash::{BlockHash, BlockHashWithGroupId};
use crate::config::CacheConfig;
use crate::error::BlockPoolError;
use crate::fragmentation::{analyze_free_blocks, FragmentationReport};
use crate::free_queue::FreeBlockQueue;
use crate::prefix_index::PrefixCacheIndex;

/// Fixed-capacity, reference-counted block allocator with prefix caching.
///
/// Exactly one logical scheduling step may mutate the pool at a time; every
/// mutating operation takes `&mut self`, so that discipline is visible to the
/// compiler. Callers that need concurrent mutation must add their own
/// exclusion around the whole pool.
pub struct BlockPool {
    /// All blocks. `0..capacity` are allocatable; the null block sits at
    /// `capacity`, and the free queue's fake head/tail sentinels at
    /// `capacity + 1` / `capacity + 2`.
    blocks: Vec<CacheBlock>,
    free_queue: FreeBlockQueue,
    cached_blocks: PrefixCacheIndex,
    enable_caching: bool,
    capacity: usize,
    null_block_id: usize,
    hash_block_size: usize,
    cache_hits: usize,
    cache_misses: usize,
}

impl BlockPool {
    /// Create a pool of `capacity` blocks, all unreferenced and free, with
    /// prefix caching enabled.
    ///
    /// `hash_block_size` is the tokens-per-block granularity of the external
    /// hashing collaborator; the pool stores it for introspection but never
    /// interprets it.
    pub fn new(capacity: usize, hash_block_size: usize) -> Self {
        assert!(capacity > 0, "Must have at least 1 block");
        Self::build(capacity, hash_block_size, true)
    }

    /// Create a pool from a validated [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Result<Self, BlockPoolError> {
        config.validate()?;
        Ok(Self::build(
            config.num_blocks,
            config.hash_block_size,
            config.enable_prefix_caching,
        ))
    }

    fn build(capacity: usize, hash_block_size: usize, enable_caching: bool) -> Self {
        let null_block_id = capacity;
        let fake_head = capacity + 1;
        let fake_tail = capacity + 2;

        let mut blocks: Vec<CacheBlock> = (0..capacity + 3).map(CacheBlock::new).collect();
        blocks[null_block_id].is_null = true;

        let all_ids: Vec<usize> = (0..capacity).collect();
        let free_queue = FreeBlockQueue::new(&mut blocks, &all_ids, fake_head, fake_tail);

        info!(
            "Created block pool: {capacity} blocks, prefix caching {}",
            if enable_caching { "enabled" } else { "disabled" }
        );

        Self {
            blocks,
            free_queue,
            cached_blocks: PrefixCacheIndex::new(),
            enable_caching,
            capacity,
            null_block_id,
            hash_block_size,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Allocate `num_blocks` blocks, popped from the free queue head.
    ///
    /// All-or-nothing: on failure the pool is left exactly as it was before
    /// the call. A popped block that carried a content hash loses its cached
    /// identity (removed from the index, hash cleared) before being handed
    /// out with `ref_cnt == 1`.
    pub fn allocate(&mut self, num_blocks: usize) -> Result<Vec<usize>, BlockPoolError> {
        let available = self.free_queue.len();
        if num_blocks > available {
            return Err(BlockPoolError::InsufficientCapacity {
                requested: num_blocks,
                available,
            });
        }

        // Pop phase. Hashes are untouched here so a mid-pop failure can be
        // rolled back with no observable side effects.
        let mut popped = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            match self.free_queue.pop_front(&mut self.blocks) {
                Ok(block_id) => popped.push(block_id),
                Err(BlockPoolError::EmptyQueue) => {
                    // Unreachable while the size counter is consistent.
                    // Restore the popped blocks to the queue front in their
                    // original relative order, then surface the capacity
                    // failure; EmptyQueue never leaks past this boundary.
                    while let Some(block_id) = popped.pop() {
                        self.free_queue.push_front(&mut self.blocks, block_id)?;
                    }
                    return Err(BlockPoolError::InsufficientCapacity {
                        requested: num_blocks,
                        available,
                    });
                }
                Err(other) => return Err(other),
            }
        }

        // Commit phase: evict stale cached identities and hand the blocks out.
        for &block_id in &popped {
            self.evict_cached_hash(block_id);
            debug_assert_eq!(self.blocks[block_id].ref_cnt, 0);
            self.blocks[block_id].ref_cnt = 1;
        }

        Ok(popped)
    }

    /// Increment the ref count of a block the caller already holds (shared
    /// use of a block that is known to be referenced).
    ///
    /// An unreferenced block must be acquired through [`Self::try_cache_lookup`]
    /// instead, so that free-queue membership stays consistent.
    pub fn retain(&mut self, block_id: usize) -> Result<(), BlockPoolError> {
        self.check_block_id(block_id)?;
        let block = &mut self.blocks[block_id];
        if block.is_null {
            return Err(BlockPoolError::InvariantViolation(
                "the null block cannot be retained".to_string(),
            ));
        }
        if block.ref_cnt == 0 {
            return Err(BlockPoolError::InvariantViolation(format!(
                "block {block_id} retained while unreferenced"
            )));
        }
        block.ref_cnt += 1;
        Ok(())
    }

    /// Release the caller's references on `block_ids`, in order. A block
    /// whose ref count reaches 0 joins the free queue tail; its content hash
    /// (if any) stays indexed, so it remains a prefix cache hit candidate
    /// until an allocation evicts it.
    ///
    /// The whole batch is validated before any ref count changes: a double
    /// free anywhere in the batch fails the call with no partial mutation.
    pub fn release(&mut self, block_ids: &[usize]) -> Result<(), BlockPoolError> {
        let mut decrements: HashMap<usize, u32> = HashMap::new();
        for &block_id in block_ids {
            self.check_block_id(block_id)?;
            *decrements.entry(block_id).or_insert(0) += 1;
        }
        for (&block_id, &count) in &decrements {
            if count > self.blocks[block_id].ref_cnt {
                return Err(BlockPoolError::DoubleFree(block_id));
            }
        }

        for &block_id in block_ids {
            self.blocks[block_id].ref_cnt -= 1;
            if self.blocks[block_id].ref_cnt == 0 {
                self.free_queue.push_back(&mut self.blocks, block_id)?;
            }
        }
        Ok(())
    }

    /// Look up a prefix cache entry and, on a hit, acquire the block.
    ///
    /// Hit acquisition is one combined step: if the block was sitting
    /// unreferenced in the free queue it is removed from the queue and its
    /// ref count bumped together, so there is no window where it looks both
    /// free and claimed.
    pub fn try_cache_lookup(
        &mut self,
        block_hash: BlockHash,
        group_id: u32,
    ) -> Result<Option<usize>, BlockPoolError> {
        if !self.enable_caching {
            return Ok(None);
        }

        let key = BlockHashWithGroupId::new(block_hash, group_id);
        let Some(block_id) = self.cached_blocks.get(&key) else {
            self.cache_misses += 1;
            return Ok(None);
        };

        if self.blocks[block_id].ref_cnt == 0 {
            self.free_queue.remove(&mut self.blocks, block_id)?;
        }
        self.blocks[block_id].ref_cnt += 1;
        self.cache_hits += 1;
        Ok(Some(block_id))
    }

    /// Assign content hashes to blocks whose contents are now finalized and
    /// publish them in the prefix cache index.
    ///
    /// The index keeps the first block cached under each (hash, group) key;
    /// later duplicates keep their hash but stay unreachable through the
    /// index. Null and already-hashed blocks are skipped. No-op when caching
    /// is disabled.
    pub fn cache_blocks(
        &mut self,
        blocks_and_hashes: &[(usize, BlockHash)],
        group_id: u32,
    ) -> Result<(), BlockPoolError> {
        if !self.enable_caching {
            return Ok(());
        }

        for &(block_id, _) in blocks_and_hashes {
            self.check_block_id(block_id)?;
            let block = &self.blocks[block_id];
            if !block.is_null && block.block_hash.is_none() && block.ref_cnt == 0 {
                return Err(BlockPoolError::InvariantViolation(format!(
                    "block {block_id} cached while unreferenced"
                )));
            }
        }

        for &(block_id, block_hash) in blocks_and_hashes {
            let key = BlockHashWithGroupId::new(block_hash, group_id);
            let block = &mut self.blocks[block_id];
            if block.is_null || block.block_hash.is_some() {
                continue;
            }
            block.block_hash = Some(key);
            self.cached_blocks.insert(key, block_id);
        }
        Ok(())
    }

    /// Number of unreferenced blocks available for allocation.
    pub fn free_count(&self) -> usize {
        self.free_queue.len()
    }

    /// Total number of allocatable blocks, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pool usage as a fraction in [0.0, 1.0].
    #[allow(clippy::cast_precision_loss)]
    pub fn usage_ratio(&self) -> f64 {
        1.0 - self.free_count() as f64 / self.capacity as f64
    }

    /// The free queue contents, head (next to allocate) to tail (most
    /// recently freed). Diagnostics only; O(n).
    pub fn free_blocks_snapshot(&self) -> Vec<usize> {
        self.free_queue.snapshot(&self.blocks)
    }

    /// Contiguous-run statistics over the current free block ids.
    pub fn fragmentation(&self) -> FragmentationReport {
        analyze_free_blocks(&self.free_blocks_snapshot())
    }

    /// Number of distinct (hash, group) keys currently indexed.
    pub fn num_cached_keys(&self) -> usize {
        self.cached_blocks.len()
    }

    /// The reserved placeholder block id, meaning "no real block assigned".
    /// Never allocated, freed, or counted against capacity.
    pub fn null_block_id(&self) -> usize {
        self.null_block_id
    }

    /// The hash granularity handed to the external hashing collaborator.
    pub fn hash_block_size(&self) -> usize {
        self.hash_block_size
    }

    pub fn caching_enabled(&self) -> bool {
        self.enable_caching
    }

    /// Prefix cache lookups served from the index vs. missed, since
    /// construction.
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache_hits, self.cache_misses)
    }

    /// Prefix cache hit rate as a percentage.
    #[allow(clippy::cast_precision_loss)]
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }

    /// Drop every cached identity. Only succeeds when all blocks are free;
    /// returns whether the reset happened.
    pub fn reset_prefix_cache(&mut self) -> bool {
        let in_use = self.capacity - self.free_count();
        if in_use != 0 {
            warn!("Prefix cache reset refused: {in_use} blocks are still referenced");
            return false;
        }

        self.cached_blocks.clear();
        for block in &mut self.blocks {
            block.reset_hash();
        }
        true
    }

    /// Ref count of a block (for diagnostics/testing).
    pub fn block_ref_cnt(&self, block_id: usize) -> u32 {
        self.blocks[block_id].ref_cnt
    }

    /// Content hash of a block (for diagnostics/testing).
    pub fn block_hash(&self, block_id: usize) -> Option<BlockHashWithGroupId> {
        self.blocks[block_id].block_hash
    }

    /// Drop the cached identity of a block that is being repurposed.
    ///
    /// A dedup-losing duplicate never owned its index slot, so the index
    /// remove is a no-op for it; its own hash is still cleared.
    fn evict_cached_hash(&mut self, block_id: usize) {
        if let Some(key) = self.blocks[block_id].block_hash {
            if self.cached_blocks.remove(&key, block_id).is_some() {
                debug!("Evicted block {block_id} from the prefix cache");
            }
            self.blocks[block_id].reset_hash();
        }
    }

    /// Reject ids that name neither a real block nor the null block before
    /// they can index into the sentinel entries (or out of bounds).
    fn check_block_id(&self, block_id: usize) -> Result<(), BlockPoolError> {
        if block_id > self.capacity {
            return Err(BlockPoolError::InvariantViolation(format!(
                "block id {block_id} is out of range for a pool of {} blocks",
                self.capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(value: u64) -> BlockHash {
        BlockHash::new(value)
    }

    #[test]
    fn test_construction_all_free() {
        let pool = BlockPool::new(8, 16);
        assert_eq!(pool.free_count(), 8);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.usage_ratio(), 0.0);
        assert_eq!(pool.num_cached_keys(), 0);
        assert_eq!(pool.hash_block_size(), 16);
    }

    #[test]
    fn test_allocate_pops_lowest_ids_first() {
        let mut pool = BlockPool::new(8, 16);
        let blocks = pool.allocate(3).unwrap();
        assert_eq!(blocks, vec![0, 1, 2]);
        assert_eq!(pool.free_count(), 5);
        for &id in &blocks {
            assert_eq!(pool.block_ref_cnt(id), 1);
        }
    }

    #[test]
    fn test_free_count_plus_referenced_is_capacity() {
        let mut pool = BlockPool::new(10, 16);
        let a = pool.allocate(4).unwrap();
        let _b = pool.allocate(3).unwrap();
        pool.release(&a).unwrap();

        let referenced = (0..pool.capacity())
            .filter(|&id| pool.block_ref_cnt(id) > 0)
            .count();
        assert_eq!(pool.free_count() + referenced, pool.capacity());
    }

    #[test]
    fn test_allocate_release_round_trip() {
        let mut pool = BlockPool::new(8, 16);
        let before = pool.free_count();
        let blocks = pool.allocate(5).unwrap();
        pool.release(&blocks).unwrap();
        assert_eq!(pool.free_count(), before);
        assert_eq!(pool.num_cached_keys(), 0);
        for &id in &blocks {
            assert_eq!(pool.block_ref_cnt(id), 0);
        }
    }

    #[test]
    fn test_insufficient_capacity_is_a_noop() {
        let mut pool = BlockPool::new(4, 16);
        let _held = pool.allocate(3).unwrap();
        let snapshot = pool.free_blocks_snapshot();

        let err = pool.allocate(2).unwrap_err();
        assert_eq!(
            err,
            BlockPoolError::InsufficientCapacity {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.free_blocks_snapshot(), snapshot);
    }

    #[test]
    fn test_double_release_errors() {
        let mut pool = BlockPool::new(4, 16);
        let blocks = pool.allocate(1).unwrap();
        pool.release(&blocks).unwrap();
        assert_eq!(
            pool.release(&blocks),
            Err(BlockPoolError::DoubleFree(blocks[0]))
        );
    }

    #[test]
    fn test_release_batch_is_all_or_nothing() {
        let mut pool = BlockPool::new(4, 16);
        let good = pool.allocate(2).unwrap();
        // One valid id and one id that is already unreferenced
        pool.release(&[good[0]]).unwrap();
        let err = pool.release(&[good[1], good[0]]).unwrap_err();
        assert_eq!(err, BlockPoolError::DoubleFree(good[0]));
        // The valid block was not decremented
        assert_eq!(pool.block_ref_cnt(good[1]), 1);
        assert_eq!(pool.free_count(), 3);
    }

    #[test]
    fn test_release_same_block_twice_in_one_batch() {
        let mut pool = BlockPool::new(4, 16);
        let blocks = pool.allocate(1).unwrap();
        let err = pool.release(&[blocks[0], blocks[0]]).unwrap_err();
        assert_eq!(err, BlockPoolError::DoubleFree(blocks[0]));
        assert_eq!(pool.block_ref_cnt(blocks[0]), 1);
    }

    #[test]
    fn test_retain_and_shared_release() {
        let mut pool = BlockPool::new(4, 16);
        let blocks = pool.allocate(1).unwrap();
        pool.retain(blocks[0]).unwrap();
        assert_eq!(pool.block_ref_cnt(blocks[0]), 2);

        pool.release(&blocks).unwrap();
        assert_eq!(pool.block_ref_cnt(blocks[0]), 1);
        assert_eq!(pool.free_count(), 3);

        pool.release(&blocks).unwrap();
        assert_eq!(pool.block_ref_cnt(blocks[0]), 0);
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn test_retain_unreferenced_errors() {
        let mut pool = BlockPool::new(4, 16);
        assert!(matches!(
            pool.retain(0),
            Err(BlockPoolError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_retain_null_block_errors() {
        let mut pool = BlockPool::new(4, 16);
        let null_id = pool.null_block_id();
        assert!(matches!(
            pool.retain(null_id),
            Err(BlockPoolError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_release_null_block_is_double_free() {
        let mut pool = BlockPool::new(4, 16);
        let null_id = pool.null_block_id();
        assert_eq!(
            pool.release(&[null_id]),
            Err(BlockPoolError::DoubleFree(null_id))
        );
    }

    #[test]
    fn test_null_block_outside_allocatable_range() {
        let mut pool = BlockPool::new(4, 16);
        let blocks = pool.allocate(4).unwrap();
        assert!(!blocks.contains(&pool.null_block_id()));
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn test_out_of_range_id_errors() {
        let mut pool = BlockPool::new(4, 16);
        // Ids past the null block would otherwise hit the queue sentinels
        assert!(matches!(
            pool.release(&[7]),
            Err(BlockPoolError::InvariantViolation(_))
        ));
        assert!(matches!(
            pool.retain(100),
            Err(BlockPoolError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_freed_hashed_block_stays_indexed() {
        let mut pool = BlockPool::new(8, 4);
        let blocks = pool.allocate(2).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11)), (blocks[1], hash(22))], 0)
            .unwrap();
        assert_eq!(pool.num_cached_keys(), 2);

        pool.release(&blocks).unwrap();
        // FREE_CACHED: back in the queue, still a hit candidate
        assert_eq!(pool.free_count(), 8);
        assert_eq!(pool.num_cached_keys(), 2);

        let found = pool.try_cache_lookup(hash(11), 0).unwrap();
        assert_eq!(found, Some(blocks[0]));
        // Combined hit-acquisition: referenced again and out of the queue
        assert_eq!(pool.block_ref_cnt(blocks[0]), 1);
        assert_eq!(pool.free_count(), 7);
    }

    #[test]
    fn test_cache_hit_on_referenced_block_only_bumps() {
        let mut pool = BlockPool::new(8, 4);
        let blocks = pool.allocate(1).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11))], 0).unwrap();

        let found = pool.try_cache_lookup(hash(11), 0).unwrap();
        assert_eq!(found, Some(blocks[0]));
        assert_eq!(pool.block_ref_cnt(blocks[0]), 2);
        assert_eq!(pool.free_count(), 7);
    }

    #[test]
    fn test_eviction_clears_hash_and_index() {
        let mut pool = BlockPool::new(2, 4);
        let blocks = pool.allocate(2).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11))], 0).unwrap();
        pool.release(&blocks).unwrap();

        // Retrievable until an allocation pops it from the queue head
        assert!(pool.try_cache_lookup(hash(11), 0).unwrap().is_some());
        pool.release(&[blocks[0]]).unwrap();

        // Reallocating everything repurposes the cached block
        let _fresh = pool.allocate(2).unwrap();
        assert_eq!(pool.block_hash(blocks[0]), None);
        assert_eq!(pool.num_cached_keys(), 0);
        assert_eq!(pool.try_cache_lookup(hash(11), 0).unwrap(), None);
    }

    #[test]
    fn test_duplicate_hash_first_writer_wins() {
        let mut pool = BlockPool::new(2, 4);
        let blocks = pool.allocate(2).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11)), (blocks[1], hash(11))], 0)
            .unwrap();

        // One key; lookup returns the first-cached block
        assert_eq!(pool.num_cached_keys(), 1);
        let found = pool.try_cache_lookup(hash(11), 0).unwrap();
        assert_eq!(found, Some(blocks[0]));

        // The duplicate kept its hash but is unreachable; evicting it must
        // not disturb the winner's index entry
        assert!(pool.block_hash(blocks[1]).is_some());
        pool.release(&[blocks[1]]).unwrap();
        let refreshed = pool.allocate(1).unwrap();
        assert_eq!(refreshed, vec![blocks[1]]);
        assert_eq!(pool.block_hash(blocks[1]), None);
        assert_eq!(pool.num_cached_keys(), 1);
        assert_eq!(pool.try_cache_lookup(hash(11), 0).unwrap(), Some(blocks[0]));
    }

    #[test]
    fn test_same_hash_different_groups() {
        let mut pool = BlockPool::new(8, 4);
        let blocks = pool.allocate(2).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11))], 0).unwrap();
        pool.cache_blocks(&[(blocks[1], hash(11))], 1).unwrap();
        assert_eq!(pool.num_cached_keys(), 2);

        assert_eq!(pool.try_cache_lookup(hash(11), 0).unwrap(), Some(blocks[0]));
        assert_eq!(pool.try_cache_lookup(hash(11), 1).unwrap(), Some(blocks[1]));
        assert_eq!(pool.try_cache_lookup(hash(11), 2).unwrap(), None);
    }

    #[test]
    fn test_cache_unreferenced_block_errors() {
        let mut pool = BlockPool::new(4, 4);
        assert!(matches!(
            pool.cache_blocks(&[(0, hash(11))], 0),
            Err(BlockPoolError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_cache_blocks_skips_already_hashed() {
        let mut pool = BlockPool::new(4, 4);
        let blocks = pool.allocate(1).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11))], 0).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(22))], 0).unwrap();

        let key = pool.block_hash(blocks[0]).unwrap();
        assert_eq!(key.block_hash, hash(11));
        assert_eq!(pool.num_cached_keys(), 1);
    }

    #[test]
    fn test_caching_disabled() {
        let config = CacheConfig {
            num_blocks: 4,
            hash_block_size: 4,
            enable_prefix_caching: false,
        };
        let mut pool = BlockPool::from_config(&config).unwrap();
        assert!(!pool.caching_enabled());

        let blocks = pool.allocate(1).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11))], 0).unwrap();
        assert_eq!(pool.num_cached_keys(), 0);
        assert_eq!(pool.block_hash(blocks[0]), None);
        assert_eq!(pool.try_cache_lookup(hash(11), 0).unwrap(), None);
    }

    #[test]
    fn test_from_config_validates() {
        let config = CacheConfig::new(0, 16);
        assert!(BlockPool::from_config(&config).is_err());
    }

    #[test]
    fn test_usage_ratio() {
        let mut pool = BlockPool::new(4, 16);
        assert_eq!(pool.usage_ratio(), 0.0);
        let blocks = pool.allocate(2).unwrap();
        assert!((pool.usage_ratio() - 0.5).abs() < 1e-9);
        let _rest = pool.allocate(2).unwrap();
        assert!((pool.usage_ratio() - 1.0).abs() < 1e-9);
        pool.release(&blocks).unwrap();
        assert!((pool.usage_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_freed_blocks_are_reallocated_oldest_first() {
        let mut pool = BlockPool::new(4, 16);
        let all = pool.allocate(4).unwrap();
        pool.release(&[all[2]]).unwrap();
        pool.release(&[all[0]]).unwrap();

        // Queue order is free order, not id order
        assert_eq!(pool.free_blocks_snapshot(), vec![all[2], all[0]]);
        assert_eq!(pool.allocate(1).unwrap(), vec![all[2]]);
    }

    #[test]
    fn test_cache_stats() {
        let mut pool = BlockPool::new(8, 4);
        let blocks = pool.allocate(1).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11))], 0).unwrap();

        assert_eq!(pool.cache_stats(), (0, 0));
        assert_eq!(pool.cache_hit_rate(), 0.0);

        pool.try_cache_lookup(hash(11), 0).unwrap();
        pool.try_cache_lookup(hash(99), 0).unwrap();
        assert_eq!(pool.cache_stats(), (1, 1));
        assert!((pool.cache_hit_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_prefix_cache_requires_quiescence() {
        let mut pool = BlockPool::new(4, 4);
        let blocks = pool.allocate(2).unwrap();
        pool.cache_blocks(&[(blocks[0], hash(11))], 0).unwrap();

        assert!(!pool.reset_prefix_cache());
        assert_eq!(pool.num_cached_keys(), 1);

        pool.release(&blocks).unwrap();
        assert!(pool.reset_prefix_cache());
        assert_eq!(pool.num_cached_keys(), 0);
        assert_eq!(pool.block_hash(blocks[0]), None);
        assert_eq!(pool.try_cache_lookup(hash(11), 0).unwrap(), None);
    }

    #[test]
    fn test_fragmentation_through_pool() {
        let mut pool = BlockPool::new(8, 16);
        let all = pool.allocate(8).unwrap();
        pool.release(&[all[1], all[2], all[6]]).unwrap();

        let report = pool.fragmentation();
        assert_eq!(report.num_runs, 2);
        assert_eq!(report.largest_run, 2);
        assert_eq!(report.total_free, 3);
    }

    #[test]
    #[should_panic(expected = "at least 1 block")]
    fn test_zero_capacity_panics() {
        let _pool = BlockPool::new(0, 16);
    }
}
