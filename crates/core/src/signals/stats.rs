//! Small numeric helpers shared by the signal computations

use std::cmp::Ordering;

/// Median of a sample: middle element for odd lengths, mean of the two
/// middle elements for even lengths. `None` for an empty sample.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Median with the PR-side empty convention of 0.0.
pub fn median_or_zero(values: Vec<f64>) -> f64 {
    median(values).unwrap_or(0.0)
}

/// Percentage of `part` in `whole`, rounded to one decimal; 0.0 when the
/// denominator is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 / whole as f64 * 100.0)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_sample_is_the_middle_element() {
        assert_eq!(median(vec![30.0, 10.0, 20.0]), Some(20.0));
    }

    #[test]
    fn median_of_even_sample_averages_the_middle_pair() {
        assert_eq!(median(vec![40.0, 10.0, 20.0, 30.0]), Some(25.0));
    }

    #[test]
    fn median_of_empty_sample_is_none() {
        assert_eq!(median(Vec::new()), None);
        assert_eq!(median_or_zero(Vec::new()), 0.0);
    }

    #[test]
    fn percentage_handles_zero_denominator() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 4), 50.0);
    }
}
