//! Fixed-capacity KV cache block pooling with content-addressed reuse.
//!
//! This crate re-exports the public surface of `kvblock-core`: a
//! reference-counted block pool for a serving engine's scheduler, with O(1)
//! allocation and free, prefix-cache reuse of freed blocks, and read-only
//! fragmentation diagnostics.
//!
//! ```
//! use kvblock::{BlockHash, BlockPool};
//!
//! let mut pool = BlockPool::new(64, 16);
//!
//! // A request prefills into two blocks, then publishes their hashes.
//! let blocks = pool.allocate(2)?;
//! pool.cache_blocks(&[(blocks[0], BlockHash::new(0xa1)), (blocks[1], BlockHash::new(0xb2))], 0)?;
//! pool.release(&blocks)?;
//!
//! // A later request with the same prefix reclaims the block directly.
//! let hit = pool.try_cache_lookup(BlockHash::new(0xa1), 0)?;
//! assert_eq!(hit, Some(blocks[0]));
//! # Ok::<(), kvblock::BlockPoolError>(())
//! ```

pub use kvblock_core::{
    analyze_free_blocks, BlockHash, BlockHashWithGroupId, BlockPool, BlockPoolError, CacheConfig,
    FragmentationReport,
};
