// Within-group z-scores and percentile ranks.

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation of one stat across a position-group pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
    pub count: usize,
}

/// Threshold below which standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-12;

impl PoolStats {
    /// Zero variance, up to float noise relative to the mean.
    pub fn is_degenerate(&self) -> bool {
        self.stdev <= STDEV_EPSILON * self.mean.abs().max(1.0)
    }
}

/// Compute mean and standard deviation for a slice of values.
///
/// Uses the sample standard deviation (N - 1 denominator): a position
/// group in one batch is treated as a sample of the league. Fewer than two
/// values give a stdev of 0.0; an empty slice gives all zeros.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    let count = values.len();
    if count == 0 {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
            count,
        };
    }
    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    if count < 2 {
        return PoolStats {
            mean,
            stdev: 0.0,
            count,
        };
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    PoolStats {
        mean,
        stdev: variance.sqrt(),
        count,
    }
}

/// Compute a z-score given a value and pool stats.
///
/// Returns 0.0 when the pool has no usable spread.
pub fn compute_zscore(value: f64, stats: &PoolStats) -> f64 {
    if stats.is_degenerate() {
        return 0.0;
    }
    (value - stats.mean) / stats.stdev
}

/// Z-score a column within its group.
///
/// Null entries stay null. When fewer than `min_sample` values are non-null,
/// or the non-null values have zero variance, every member (null or not)
/// gets exactly 0.0.
pub fn zscore_within_group(values: &[Option<f64>], min_sample: usize) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let stats = compute_pool_stats(&present);
    if present.len() < min_sample || stats.is_degenerate() {
        return vec![Some(0.0); values.len()];
    }
    values
        .iter()
        .map(|v| v.map(|x| compute_zscore(x, &stats)))
        .collect()
}

/// Percentile rank of each value among the non-null values, in (0, 100].
///
/// Ties share the average of their ranks. Null entries stay null.
pub fn percentile_rank(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();
    order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let n = order.len() as f64;
    let mut ranks = vec![None; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && order[end].1 == order[start].1 {
            end += 1;
        }
        // Ranks are 1-based; a tie run [start, end) shares their mean.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &(idx, _) in &order[start..end] {
            ranks[idx] = Some(avg_rank / n * 100.0);
        }
        start = end;
    }
    ranks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
