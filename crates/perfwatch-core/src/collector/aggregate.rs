//! Online aggregation of metric samples

use crate::models::{AggregatedMetric, AggregatedMetrics, MetricSample};

/// Fold samples into per-name running statistics without keeping history
pub fn aggregate_metrics<'a, I>(samples: I) -> AggregatedMetrics
where
    I: IntoIterator<Item = &'a MetricSample>,
{
    let mut aggregated = AggregatedMetrics::new();
    for sample in samples {
        aggregated
            .entry(sample.name.clone())
            .or_insert_with(AggregatedMetric::default)
            .add(sample);
    }
    aggregated
}
