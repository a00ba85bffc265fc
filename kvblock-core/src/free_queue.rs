//! Doubly-linked queue of unreferenced blocks.

use crate::block::{CacheBlock, NO_LINK};
use crate::error::BlockPoolError;

/// Ordered queue of free blocks, threaded through the blocks array.
///
/// Uses fake head and tail sentinel entries (stored as indices into the
/// blocks array) to avoid branching on empty/boundary cases. Supports O(1)
/// `pop_front`, `push_back`, `push_front`, and removal of an arbitrary
/// member.
///
/// Eviction order:
/// - Front (head) = oldest freed -> allocated (and thus evicted) first
/// - Back (tail) = most recently freed -> evicted last
pub(crate) struct FreeBlockQueue {
    /// Number of free blocks currently in the queue.
    num_free: usize,
    /// Index of the fake head sentinel in the blocks array.
    fake_head: usize,
    /// Index of the fake tail sentinel in the blocks array.
    fake_tail: usize,
}

impl FreeBlockQueue {
    /// Initialize the free list with all blocks in `block_ids` linked in the
    /// given order.
    ///
    /// `blocks` must already contain entries at `fake_head` and `fake_tail`.
    pub(crate) fn new(
        blocks: &mut [CacheBlock],
        block_ids: &[usize],
        fake_head: usize,
        fake_tail: usize,
    ) -> Self {
        let n = block_ids.len();

        for i in 0..n {
            let id = block_ids[i];
            blocks[id].prev_free = if i > 0 { block_ids[i - 1] } else { fake_head };
            blocks[id].next_free = if i + 1 < n {
                block_ids[i + 1]
            } else {
                fake_tail
            };
        }

        if n > 0 {
            blocks[fake_head].next_free = block_ids[0];
            blocks[fake_tail].prev_free = block_ids[n - 1];
        } else {
            blocks[fake_head].next_free = fake_tail;
            blocks[fake_tail].prev_free = fake_head;
        }

        Self {
            num_free: n,
            fake_head,
            fake_tail,
        }
    }

    /// Pop the block at the head of the queue (oldest freed).
    pub(crate) fn pop_front(
        &mut self,
        blocks: &mut [CacheBlock],
    ) -> Result<usize, BlockPoolError> {
        let first_id = blocks[self.fake_head].next_free;
        if first_id == self.fake_tail {
            return Err(BlockPoolError::EmptyQueue);
        }

        let next_id = blocks[first_id].next_free;
        blocks[self.fake_head].next_free = next_id;
        blocks[next_id].prev_free = self.fake_head;
        blocks[first_id].prev_free = NO_LINK;
        blocks[first_id].next_free = NO_LINK;

        self.num_free -= 1;
        Ok(first_id)
    }

    /// Append a block at the tail (most recently freed).
    pub(crate) fn push_back(
        &mut self,
        blocks: &mut [CacheBlock],
        block_id: usize,
    ) -> Result<(), BlockPoolError> {
        self.check_unlinked(blocks, block_id)?;

        let last_id = blocks[self.fake_tail].prev_free;
        blocks[last_id].next_free = block_id;
        blocks[block_id].prev_free = last_id;
        blocks[block_id].next_free = self.fake_tail;
        blocks[self.fake_tail].prev_free = block_id;

        self.num_free += 1;
        Ok(())
    }

    /// Insert a block at the head of the queue. Used to restore blocks popped
    /// by an allocation attempt that could not complete.
    pub(crate) fn push_front(
        &mut self,
        blocks: &mut [CacheBlock],
        block_id: usize,
    ) -> Result<(), BlockPoolError> {
        self.check_unlinked(blocks, block_id)?;

        let first_id = blocks[self.fake_head].next_free;
        blocks[self.fake_head].next_free = block_id;
        blocks[block_id].prev_free = self.fake_head;
        blocks[block_id].next_free = first_id;
        blocks[first_id].prev_free = block_id;

        self.num_free += 1;
        Ok(())
    }

    /// Detach an arbitrary block from wherever it sits in the chain. O(1)
    /// since links are direct indices, not a search.
    pub(crate) fn remove(
        &mut self,
        blocks: &mut [CacheBlock],
        block_id: usize,
    ) -> Result<(), BlockPoolError> {
        let prev_id = blocks[block_id].prev_free;
        let next_id = blocks[block_id].next_free;
        if prev_id == NO_LINK || next_id == NO_LINK {
            return Err(BlockPoolError::InvariantViolation(format!(
                "block {block_id} removed from the free queue but is not linked into it"
            )));
        }

        blocks[prev_id].next_free = next_id;
        blocks[next_id].prev_free = prev_id;
        blocks[block_id].prev_free = NO_LINK;
        blocks[block_id].next_free = NO_LINK;

        self.num_free -= 1;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.num_free
    }

    /// Walk the queue head to tail and collect block IDs. Read-only and
    /// restartable; reflects the queue state at each call.
    pub(crate) fn snapshot(&self, blocks: &[CacheBlock]) -> Vec<usize> {
        let mut ids = Vec::with_capacity(self.num_free);
        let mut cursor = blocks[self.fake_head].next_free;
        while cursor != self.fake_tail {
            ids.push(cursor);
            cursor = blocks[cursor].next_free;
        }
        ids
    }

    /// A block entering the queue must be unreferenced and not already
    /// linked; anything else means the caller's bookkeeping is corrupt.
    fn check_unlinked(
        &self,
        blocks: &[CacheBlock],
        block_id: usize,
    ) -> Result<(), BlockPoolError> {
        let block = &blocks[block_id];
        if block.is_free_listed() {
            return Err(BlockPoolError::InvariantViolation(format!(
                "block {block_id} pushed onto the free queue twice"
            )));
        }
        if block.ref_cnt != 0 {
            return Err(BlockPoolError::InvariantViolation(format!(
                "block {block_id} pushed onto the free queue with ref count {}",
                block.ref_cnt
            )));
        }
        Ok(())
    }
}
