use serde::{Deserialize, Serialize};

use crate::error::BlockPoolError;

/// Construction parameters for a [`BlockPool`].
///
/// [`BlockPool`]: crate::pool::BlockPool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Total number of allocatable blocks. Fixed for the pool lifetime.
    pub num_blocks: usize,
    /// Tokens per block, passed through to the external hashing collaborator.
    /// Not interpreted by the pool itself.
    pub hash_block_size: usize,
    /// Whether freed blocks keep their content hash for prefix reuse.
    #[serde(default = "default_enable_prefix_caching")]
    pub enable_prefix_caching: bool,
}

fn default_enable_prefix_caching() -> bool {
    true
}

impl CacheConfig {
    pub fn new(num_blocks: usize, hash_block_size: usize) -> Self {
        Self {
            num_blocks,
            hash_block_size,
            enable_prefix_caching: true,
        }
    }

    pub fn validate(&self) -> Result<(), BlockPoolError> {
        if self.num_blocks == 0 {
            return Err(BlockPoolError::InvariantViolation(
                "cache config requires at least one block".to_string(),
            ));
        }
        if self.hash_block_size == 0 {
            return Err(BlockPoolError::InvariantViolation(
                "cache config requires a non-zero hash block size".to_string(),
            ));
        }
        Ok(())
    }
}
