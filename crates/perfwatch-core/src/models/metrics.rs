//! Aggregated metrics data models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::report::{MetricSample, Rating};

/// Per-rating sample counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDistribution {
    pub good: u64,
    #[serde(rename = "needs-improvement")]
    pub needs_improvement: u64,
    pub poor: u64,
}

impl RatingDistribution {
    /// Count one more sample with the given rating
    pub fn record(&mut self, rating: Rating) {
        match rating {
            Rating::Good => self.good += 1,
            Rating::NeedsImprovement => self.needs_improvement += 1,
            Rating::Poor => self.poor += 1,
        }
    }
}

/// Running statistics for one metric name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub count: u64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub ratings: RatingDistribution,
}

impl Default for AggregatedMetric {
    fn default() -> Self {
        Self {
            count: 0,
            average: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ratings: RatingDistribution::default(),
        }
    }
}

impl AggregatedMetric {
    /// Fold one sample into the running statistics
    pub fn add(&mut self, sample: &MetricSample) {
        self.count += 1;
        let n = self.count as f64;
        self.average = (self.average * (n - 1.0) + sample.value) / n;
        self.min = self.min.min(sample.value);
        self.max = self.max.max(sample.value);
        self.ratings.record(sample.rating);
    }

    /// Share of `poor` samples, in percent
    pub fn poor_percentage(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.ratings.poor as f64 / self.count as f64 * 100.0
        }
    }
}

/// Aggregates keyed by metric name
pub type AggregatedMetrics = BTreeMap<String, AggregatedMetric>;

/// One entry of the "top problematic metrics" ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMetric {
    pub name: String,
    pub average_value: f64,
    pub poor_percentage: f64,
    pub count: u64,
}

/// Client timestamp range covered by a set of reports (epoch milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

/// Statistics over a filtered set of reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    pub total_reports: usize,
    pub total_metrics: usize,
    /// `None` when no reports matched
    pub time_range: Option<TimeRange>,
    pub top_metrics: Vec<TopMetric>,
    pub aggregated: AggregatedMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64, rating: Rating) -> MetricSample {
        MetricSample {
            name: "LCP".to_string(),
            value,
            rating,
            delta: 0.0,
            id: String::new(),
            navigation_type: String::new(),
            entries: vec![],
        }
    }

    #[test]
    fn test_add_tracks_min_max_and_ratings() {
        let mut agg = AggregatedMetric::default();
        agg.add(&sample(3000.0, Rating::NeedsImprovement));
        agg.add(&sample(1000.0, Rating::Good));
        agg.add(&sample(5000.0, Rating::Poor));

        assert_eq!(agg.count, 3);
        assert!((agg.average - 3000.0).abs() < 1e-9);
        assert_eq!(agg.min, 1000.0);
        assert_eq!(agg.max, 5000.0);
        assert_eq!(agg.ratings.good, 1);
        assert_eq!(agg.ratings.needs_improvement, 1);
        assert_eq!(agg.ratings.poor, 1);
    }

    #[test]
    fn test_poor_percentage() {
        let mut agg = AggregatedMetric::default();
        assert_eq!(agg.poor_percentage(), 0.0);
        agg.add(&sample(1.0, Rating::Poor));
        agg.add(&sample(1.0, Rating::Good));
        assert!((agg.poor_percentage() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rating_distribution_wire_name() {
        let value = serde_json::to_value(RatingDistribution::default()).unwrap();
        assert!(value.get("needs-improvement").is_some());
    }
}
