/// Arithmetic mean; `None` for an empty series
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation of a series of values
pub fn standard_deviation(values: &[f64]) -> f64 {
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    let variance = values
        .iter()
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Standard deviation relative to the mean.
///
/// Needs at least two samples and a positive mean; otherwise `None`.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    if mean <= 0.0 {
        return None;
    }
    Some(standard_deviation(values) / mean)
}

/// Median of a series; `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Herfindahl-Hirschman index of a set of counts: 1.0 when everything sits in
/// one bucket, `1/n` for an even split over `n` buckets.
pub fn herfindahl_index<I>(counts: I) -> Option<f64>
where
    I: IntoIterator<Item = usize>,
{
    let counts: Vec<usize> = counts.into_iter().filter(|c| *c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return None;
    }
    Some(
        counts
            .iter()
            .map(|c| {
                let share = *c as f64 / total as f64;
                share * share
            })
            .sum(),
    )
}

/// Differences between consecutive, already sorted unix timestamps in seconds
pub fn consecutive_gaps(timestamps: &[i64]) -> Vec<f64> {
    timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0) as f64)
        .collect()
}

/// Share of `part` in `whole`, 0.0 when `whole` is zero
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_standard_deviation() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert!((standard_deviation(&values) - 2.0).abs() < 1e-12);
        assert_eq!(standard_deviation(&[]), 0.0);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[1.0]), None);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
        assert_eq!(coefficient_of_variation(&[3.0, 3.0, 3.0]), Some(0.0));
        let cv = coefficient_of_variation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((cv - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_herfindahl_index() {
        assert_eq!(herfindahl_index(vec![10]), Some(1.0));
        assert!((herfindahl_index(vec![4, 4, 4, 4, 4]).unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(herfindahl_index(vec![0, 0]), None);
    }

    #[test]
    fn test_consecutive_gaps() {
        assert_eq!(consecutive_gaps(&[10, 15, 35]), vec![5.0, 20.0]);
        assert!(consecutive_gaps(&[10]).is_empty());
    }
}
