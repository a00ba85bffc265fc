//! Core block pool for KV cache management.
//!
//! A fixed set of same-sized cache blocks is handed out to inference
//! requests, reclaimed on completion, and transparently reused when a block's
//! content hash matches one an earlier request already computed (prefix
//! caching). The pool integrates eviction with allocation: a freed block
//! keeps its cached identity until the moment it is repurposed.
//!
//! The pool is deliberately not thread-safe. One scheduling loop owns all
//! mutation; execution threads only consume block ids.

#![deny(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

mod block;
mod block_hash;
mod config;
mod error;
mod fragmentation;
mod free_queue;
mod pool;
mod prefix_index;

pub use block_hash::{BlockHash, BlockHashWithGroupId};
pub use config::CacheConfig;
pub use error::BlockPoolError;
pub use fragmentation::{analyze_free_blocks, FragmentationReport};
pub use pool::BlockPool;
