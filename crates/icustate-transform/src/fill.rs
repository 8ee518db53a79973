//! Windowed scan kernels over stay partitions.
//!
//! Every kernel expects the values to follow a frame already sorted by
//! `(stay_id, hour_bin)` and takes the stay ranges from
//! [`HourlyFrame::partitions`](crate::frame::HourlyFrame::partitions).

use std::ops::Range;

/// Carries the last observed value forward inside each partition.
///
/// Values before the first observation of a partition stay null. Returns the
/// number of filled cells.
pub fn forward_fill<T: Clone>(values: &mut [Option<T>], partitions: &[Range<usize>]) -> usize {
    let mut filled = 0;
    for range in partitions {
        let mut last: Option<T> = None;
        for value in &mut values[range.clone()] {
            match value {
                Some(current) => last = Some(current.clone()),
                None => {
                    if let Some(previous) = &last {
                        *value = Some(previous.clone());
                        filled += 1;
                    }
                }
            }
        }
    }
    filled
}

/// Median of the non-null values; the mean of the two middle values for an
/// even count.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Replaces every null with `value`, returning how many were replaced.
pub fn fill_nulls<T: Clone>(values: &mut [Option<T>], value: T) -> usize {
    let mut filled = 0;
    for slot in values.iter_mut().filter(|v| v.is_none()) {
        *slot = Some(value.clone());
        filled += 1;
    }
    filled
}

/// Running sum that restarts at each partition boundary.
pub fn prefix_sum(values: &[f64], partitions: &[Range<usize>]) -> Vec<f64> {
    let mut sums = vec![0.0; values.len()];
    for range in partitions {
        let mut total = 0.0;
        for row in range.clone() {
            total += values[row];
            sums[row] = total;
        }
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn forward_fill_stops_at_partition_boundary() {
        let mut values = vec![None, Some(1.0), None, Some(2.0), None, None];
        let filled = forward_fill(&mut values, &[0..3, 3..4, 4..6]);
        assert_eq!(values, vec![None, Some(1.0), Some(1.0), Some(2.0), None, None]);
        assert_eq!(filled, 1);
    }

    #[test]
    fn median_averages_middle_pair() {
        assert_eq!(median(&[Some(4.0), None, Some(1.0), Some(3.0), Some(2.0)]), Some(2.5));
        assert_eq!(median(&[Some(7.0), Some(1.0), Some(3.0)]), Some(3.0));
        assert_eq!(median(&[None, None]), None);
    }

    #[test]
    fn prefix_sum_resets_per_stay() {
        let sums = prefix_sum(&[1.0, 2.0, 3.0, 10.0, -4.0], &[0..3, 3..5]);
        assert_eq!(sums, vec![1.0, 3.0, 6.0, 10.0, 6.0]);
    }

    fn partitioned(max_len: usize) -> impl Strategy<Value = (Vec<Option<i32>>, Vec<Range<usize>>)> {
        prop::collection::vec(prop::collection::vec(prop::option::of(0..100i32), 1..8), 0..max_len)
            .prop_map(|groups| {
                let mut values = Vec::new();
                let mut ranges = Vec::new();
                for group in groups {
                    let start = values.len();
                    values.extend(group);
                    ranges.push(start..values.len());
                }
                (values, ranges)
            })
    }

    proptest! {
        #[test]
        fn forward_fill_never_fills_leading_nulls((values, ranges) in partitioned(6)) {
            let mut filled = values.clone();
            forward_fill(&mut filled, &ranges);
            for range in &ranges {
                let first = values[range.clone()].iter().position(Option::is_some);
                for row in range.clone() {
                    match first {
                        Some(offset) if row >= range.start + offset => prop_assert!(filled[row].is_some()),
                        _ => prop_assert!(filled[row].is_none()),
                    }
                    if values[row].is_some() {
                        prop_assert_eq!(filled[row], values[row]);
                    }
                }
            }
        }

        #[test]
        fn prefix_sum_matches_running_total((values, ranges) in partitioned(6)) {
            let plain: Vec<f64> = values.iter().map(|v| f64::from(v.unwrap_or(0))).collect();
            let sums = prefix_sum(&plain, &ranges);
            for range in &ranges {
                for row in range.clone() {
                    let expected: f64 = plain[range.start..=row].iter().sum();
                    prop_assert!((sums[row] - expected).abs() < 1e-9);
                }
            }
        }
    }
}
