//! Contiguous-run statistics over the free block id distribution.

/// Summary of how the free capacity is split into runs of consecutive ids.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentationReport {
    /// Number of maximal runs of consecutive free block ids.
    pub num_runs: usize,
    /// Size of the largest run.
    pub largest_run: usize,
    /// Mean run size.
    pub mean_run_size: f64,
    /// External fragmentation ratio: `1 - largest_run / total_free`. 0.0 when
    /// all free blocks form one contiguous run, or when nothing is free.
    pub external_frag_ratio: f64,
    /// Total number of free blocks observed.
    pub total_free: usize,
}

impl FragmentationReport {
    fn empty() -> Self {
        Self {
            num_runs: 0,
            largest_run: 0,
            mean_run_size: 0.0,
            external_frag_ratio: 0.0,
            total_free: 0,
        }
    }
}

/// Analyze a snapshot of free block ids.
///
/// Pure: the input order does not matter and nothing is mutated. Safe to run
/// at any pool-quiescent point.
#[allow(clippy::cast_precision_loss)]
pub fn analyze_free_blocks(free_block_ids: &[usize]) -> FragmentationReport {
    if free_block_ids.is_empty() {
        return FragmentationReport::empty();
    }

    let mut ids = free_block_ids.to_vec();
    ids.sort_unstable();

    let mut num_runs = 1;
    let mut largest_run = 1;
    let mut current_run = 1;
    for window in ids.windows(2) {
        if window[1] == window[0] + 1 {
            current_run += 1;
        } else {
            num_runs += 1;
            current_run = 1;
        }
        largest_run = largest_run.max(current_run);
    }

    let total_free = ids.len();
    FragmentationReport {
        num_runs,
        largest_run,
        mean_run_size: total_free as f64 / num_runs as f64,
        external_frag_ratio: 1.0 - largest_run as f64 / total_free as f64,
        total_free,
    }
}
