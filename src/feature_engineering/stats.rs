//! Distribution statistics over columns with missing cells

/// Biased sample skewness `g1 = m3 / m2^1.5` over the present values.
///
/// Returns `None` for an empty or constant column.
pub fn skewness(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if present.is_empty() {
        return None;
    }

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let (m2, m3) = present.iter().fold((0.0, 0.0), |(m2, m3), &v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let (m2, m3) = (m2 / n, m3 / n);

    // Relative cutoff so round-off on a constant column does not read as skew
    if m2 <= f64::EPSILON * mean.abs().max(1.0).powi(2) {
        return None;
    }
    Some(m3 / m2.powf(1.5))
}

/// Number of distinct finite values
pub fn distinct_count(values: &[f64]) -> usize {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_is_zero() {
        let values: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|&v| Some(v)).collect();
        assert!(skewness(&values).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_known_value() {
        // [0, 0, 0, 3]: m2 = 1.6875, m3 = 2.53125 -> g1 = 2 / sqrt(3)
        let values = vec![Some(0.0), Some(0.0), Some(0.0), Some(3.0), None];
        let g1 = skewness(&values).unwrap();
        assert!((g1 - 1.154_700_538_379_251_7).abs() < 1e-12);
    }

    #[test]
    fn test_constant_and_empty() {
        assert!(skewness(&[Some(4.0), Some(4.0)]).is_none());
        assert!(skewness(&[None, None]).is_none());
    }

    #[test]
    fn test_distinct_count() {
        assert_eq!(distinct_count(&[1.0, 1.0, 2.0, f64::NAN]), 2);
    }
}
