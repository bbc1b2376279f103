//! Small statistics helpers for trend and anomaly analysis.

/// Ordinary least squares fit of `values` against x = 0, 1, 2, ...
#[derive(Debug, Clone, Copy)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient. Zero for constant series.
    pub r: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Fits a line over index positions. Returns `None` for fewer than
/// two points.
pub fn linear_fit(values: &[f64]) -> Option<LinearFit> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = mean(values);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let r = if syy > 0.0 {
        sxy / (sxx * syy).sqrt()
    } else {
        0.0
    };
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r,
    })
}

/// Indices whose population z-score exceeds `threshold`. A
/// zero-variance series has no anomalies.
pub fn zscore_anomalies(values: &[f64], threshold: f64) -> Vec<usize> {
    let sd = std_dev(values);
    if sd <= 0.0 {
        return Vec::new();
    }
    let m = mean(values);
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| ((v - m) / sd).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_line_has_unit_correlation() {
        let fit = linear_fit(&[100.0, 110.0, 120.0, 130.0]).unwrap();
        assert!((fit.slope - 10.0).abs() < 1e-9);
        assert!((fit.intercept - 100.0).abs() < 1e-9);
        assert!(fit.r >= 0.99);
    }

    #[test]
    fn decreasing_series_has_negative_slope_and_r() {
        let fit = linear_fit(&[30.0, 20.0, 11.0, 3.0]).unwrap();
        assert!(fit.slope < 0.0);
        assert!(fit.r < -0.99);
    }

    #[test]
    fn constant_series_has_zero_correlation() {
        let fit = linear_fit(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r, 0.0);
    }

    #[test]
    fn too_few_points_yield_no_fit() {
        assert!(linear_fit(&[1.0]).is_none());
        assert!(linear_fit(&[]).is_none());
    }

    #[test]
    fn anomalies_need_extreme_zscores() {
        // One spike far outside an otherwise tight series.
        let mut values = vec![10.0; 30];
        values.push(1000.0);
        let anomalies = zscore_anomalies(&values, 3.0);
        assert_eq!(anomalies, vec![30]);
    }

    #[test]
    fn flat_series_has_no_anomalies() {
        assert!(zscore_anomalies(&[7.0, 7.0, 7.0], 3.0).is_empty());
    }
}
