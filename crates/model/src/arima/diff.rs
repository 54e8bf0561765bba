//! Differencing helpers for integrated models.

/// Apply `d` rounds of first differencing.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo `d` rounds of differencing for values that continue `original`.
pub fn integrate(forecast_diff: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    let mut result = forecast_diff.to_vec();

    for level in (0..d).rev() {
        let anchor = difference(original, level).last().copied().unwrap_or(0.0);
        let mut acc = anchor;
        result = result
            .into_iter()
            .map(|x| {
                acc += x;
                acc
            })
            .collect();
    }

    result
}

/// Suggest a differencing order (0, 1 or 2) by comparing variances.
///
/// Differencing is kept when it reduces the variance by at least 10%.
pub fn suggest_differencing(series: &[f64], max_d: usize) -> usize {
    let mut d = 0;
    let mut current = series.to_vec();
    let mut current_var = variance(&current);

    while d < max_d {
        let next = difference(&current, 1);
        if next.len() < 3 {
            break;
        }
        let next_var = variance(&next);
        if !(current_var > 0.0 && next_var / current_var < 0.9) {
            break;
        }
        d += 1;
        current = next;
        current_var = next_var;
    }

    d
}

/// Sample variance (n - 1).
pub fn variance(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let mean = series.iter().sum::<f64>() / series.len() as f64;
    series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (series.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrate_inverts_difference() {
        let original = [1.0, 3.0, 6.0, 10.0, 15.0];
        // Continuation 21, 28 has first differences 6, 7 and second differences 1, 1.
        assert_eq!(integrate(&[6.0, 7.0], &original, 1), vec![21.0, 28.0]);
        assert_eq!(integrate(&[1.0, 1.0], &original, 2), vec![21.0, 28.0]);
    }

    #[test]
    fn trending_series_is_differenced() {
        let trend: Vec<f64> = (0..100).map(|i| i as f64 * 0.5 + (i as f64).sin()).collect();
        assert!(suggest_differencing(&trend, 2) >= 1);
    }

    #[test]
    fn white_noise_like_series_is_not_differenced() {
        let alternating: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_eq!(suggest_differencing(&alternating, 2), 0);
    }
}
