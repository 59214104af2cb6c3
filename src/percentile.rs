//! Percentile ranking and score-distribution binning.
//!
//! Both functions are pure over a population snapshot; fetch failures are the
//! caller's concern and degrade to [`DEFAULT_PERCENTILE`] there.

use crate::result::MetricDirection;

/// "No data, assume median": returned whenever the population is empty or
/// could not be fetched.
pub const DEFAULT_PERCENTILE: f64 = 50.0;

/// Bucket count used for score-distribution charts.
pub const HISTOGRAM_BINS: usize = 10;

/// Share (0-100) of `values` the candidate strictly outperforms.
///
/// Sub-1% results keep two decimals so extremely rare top performers stay
/// distinguishable; everything else rounds to a whole percent.
pub fn percentile_among(values: &[f64], candidate: f64, direction: MetricDirection) -> f64 {
    if values.is_empty() {
        return DEFAULT_PERCENTILE;
    }

    let outperformed = values
        .iter()
        .filter(|&&v| match direction {
            MetricDirection::LowerIsBetter => candidate < v,
            MetricDirection::HigherIsBetter => candidate > v,
        })
        .count();

    let percentile = 100.0 * outperformed as f64 / values.len() as f64;
    if percentile < 1.0 {
        (percentile * 100.0).round() / 100.0
    } else {
        percentile.round()
    }
}

/// One histogram bucket: `[lo, hi)` except the last, which also admits the
/// true maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Equal-width buckets spanning `[min, max]` of the sample.
///
/// Values equal to the maximum land in the last bucket rather than falling
/// off the top edge. An empty sample yields no buckets; a constant sample
/// yields `bins` zero-width buckets with everything in the first.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bucket> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }

    let width = (max - min) / bins as f64;
    let mut buckets: Vec<Bucket> = (0..bins)
        .map(|i| Bucket {
            lo: min + i as f64 * width,
            hi: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for &v in values {
        let idx = if width > 0.0 {
            (((v - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        buckets[idx].count += 1;
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::MetricDirection::{HigherIsBetter, LowerIsBetter};

    #[test]
    fn empty_population_is_median() {
        assert_eq!(percentile_among(&[], 123.0, LowerIsBetter), 50.0);
        assert_eq!(percentile_among(&[], 0.0, HigherIsBetter), 50.0);
    }

    #[test]
    fn strict_counting_per_direction() {
        let pop = [100.0, 200.0, 300.0, 400.0];
        // Time-like: beat everyone slower than you.
        assert_eq!(percentile_among(&pop, 150.0, LowerIsBetter), 75.0);
        // Equal values are not outperformed.
        assert_eq!(percentile_among(&pop, 200.0, LowerIsBetter), 50.0);
        // Count-like: beat everyone below you.
        assert_eq!(percentile_among(&pop, 350.0, HigherIsBetter), 75.0);
    }

    #[test]
    fn sub_one_percent_keeps_two_decimals() {
        // 1 of 300 outperformed -> 0.3333...% -> 0.33
        let pop: Vec<f64> = (0..300).map(|i| i as f64).collect();
        assert_eq!(percentile_among(&pop, 1.5, HigherIsBetter), 0.67);
        assert_eq!(percentile_among(&pop, 0.5, HigherIsBetter), 0.33);
        // Above 1% rounds to whole percent.
        assert_eq!(percentile_among(&pop, 100.5, HigherIsBetter), 34.0);
    }

    #[test]
    fn monotonic_in_the_candidate() {
        let pop = [120.0, 180.0, 220.0, 310.0, 450.0, 450.0, 900.0];
        let mut last = f64::INFINITY;
        for candidate in (0..1000).map(|i| i as f64) {
            let p = percentile_among(&pop, candidate, LowerIsBetter);
            assert!(p <= last, "time percentile must not increase: {candidate}");
            last = p;
        }
        let mut last = -1.0;
        for candidate in (0..1000).map(|i| i as f64) {
            let p = percentile_among(&pop, candidate, HigherIsBetter);
            assert!(p >= last, "count percentile must not decrease: {candidate}");
            last = p;
        }
    }

    #[test]
    fn histogram_covers_range_and_keeps_the_max() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let buckets = histogram(&values, 10);
        assert_eq!(buckets.len(), 10);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), values.len());
        // 10.0 == max must land in the last bucket, not vanish.
        assert_eq!(buckets[9].count, 2);
        assert_eq!(buckets[0].lo, 0.0);
        assert_eq!(buckets[9].hi, 10.0);
    }

    #[test]
    fn histogram_degenerate_cases() {
        assert!(histogram(&[], 10).is_empty());
        let constant = [7.0, 7.0, 7.0];
        let buckets = histogram(&constant, 10);
        assert_eq!(buckets[0].count, 3);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 3);
    }
}
