use thiserror::Error;

/// Errors surfaced by the block pool and its free queue.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BlockPoolError {
    /// An allocation asked for more blocks than are currently unreferenced.
    /// Recoverable: the caller may free or preempt upstream and retry.
    #[error("requested {requested} blocks but only {available} are free")]
    InsufficientCapacity { requested: usize, available: usize },

    /// A block was released while its reference count was already 0. This is
    /// a caller bookkeeping bug and is never silently absorbed.
    #[error("block {0} was released while its ref count was already 0")]
    DoubleFree(usize),

    /// The free queue was popped while empty. Internal condition: the pool
    /// boundary converts this to [`BlockPoolError::InsufficientCapacity`].
    #[error("the free block queue is empty")]
    EmptyQueue,

    /// Detected inconsistency between ref counts, free-list membership, or
    /// cache-index membership. Unreachable when component contracts hold.
    #[error("block pool invariant violated: {0}")]
    InvariantViolation(String),
}
