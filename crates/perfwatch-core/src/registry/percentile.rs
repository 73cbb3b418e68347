//! Nearest-rank percentiles

/// Percentile of an already ascending-sorted slice.
///
/// Uses the nearest-rank method: index `ceil(n * p) - 1`, clamped into
/// `0..n`. An empty slice yields `0.0`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let rank = (sorted.len() as f64 * p).ceil() - 1.0;
    let index = if rank <= 0.0 {
        0
    } else {
        (rank as usize).min(last)
    };
    sorted[index]
}

/// Percentile of an unsorted sequence; sorts a copy first
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}
