pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Sample standard deviation (Bessel-corrected). A single value has no spread.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(_), 1) => Some(0.0),
        (Some(data_mean), count) if count > 1 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / (count - 1) as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

/// Converts words per minute to characters per minute.
pub fn wpm_to_cpm(wpm: f64) -> f64 {
    wpm * 5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[15., 7., 55., 12., 4.]), Some(18.6));
    }

    #[test]
    fn test_mean_single_value() {
        assert_eq!(mean(&[42.0]), Some(42.0));
    }

    #[test]
    fn test_mean_empty_slice() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mean_mixed_values() {
        assert_eq!(mean(&[-10.0, 0.0, 10.0]), Some(0.0));
    }

    #[test]
    fn test_std_dev() {
        let result = std_dev(&[2., 4., 4., 4., 5., 5., 7., 9.]).unwrap();
        assert!((result - 2.138089935299395).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_single_value() {
        assert_eq!(std_dev(&[42.0]), Some(0.0));
    }

    #[test]
    fn test_std_dev_empty_slice() {
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_std_dev_identical_values() {
        assert_eq!(std_dev(&[5.0, 5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_std_dev_two_values() {
        let result = std_dev(&[-10.0, -20.0]).unwrap();
        assert!((result - 7.0710678118654755).abs() < 1e-12);
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(wpm_to_cpm(60.0), 300.0);
    }
}
