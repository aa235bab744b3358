//! Trend analysis: linear regression (>=2 samples) and Holt's linear
//! (double exponential smoothing) trend method (>=7 samples) as the
//! seasonality-capable estimator for metrics with enough history (spec
//! §4.6). Below 2 samples, callers emit an "insufficient data" note instead
//! of calling into this module.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    LinearRegression,
    HoltLinear,
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub method: Method,
    pub current: f64,
    pub projected: f64,
}

/// `samples` is `(unix_ts_seconds, value)` in ascending time order.
/// `horizon_seconds` is how far past the last sample to project.
pub fn project(samples: &[(i64, f64)], horizon_seconds: f64) -> Option<Projection> {
    if samples.len() < 2 {
        return None;
    }
    let current = samples.last()?.1;
    if samples.len() >= 7 {
        let (level, trend) = holt_linear(samples);
        let projected = level + trend * (horizon_seconds / sample_interval_seconds(samples));
        Some(Projection { method: Method::HoltLinear, current, projected })
    } else {
        let (slope, intercept) = linear_regression(samples)?;
        let last_ts = samples.last()?.0 as f64;
        let projected = intercept + slope * (last_ts + horizon_seconds);
        Some(Projection { method: Method::LinearRegression, current, projected })
    }
}

fn sample_interval_seconds(samples: &[(i64, f64)]) -> f64 {
    if samples.len() < 2 {
        return 1.0;
    }
    let total = (samples.last().unwrap().0 - samples.first().unwrap().0) as f64;
    let steps = (samples.len() - 1) as f64;
    (total / steps).max(1.0)
}

/// Ordinary least squares over `(t, value)` pairs.
fn linear_regression(samples: &[(i64, f64)]) -> Option<(f64, f64)> {
    let n = samples.len() as f64;
    if n < 2.0 {
        return None;
    }
    let sum_t: f64 = samples.iter().map(|(t, _)| *t as f64).sum();
    let sum_v: f64 = samples.iter().map(|(_, v)| *v).sum();
    let sum_tt: f64 = samples.iter().map(|(t, _)| (*t as f64).powi(2)).sum();
    let sum_tv: f64 = samples.iter().map(|(t, v)| (*t as f64) * v).sum();

    let denom = n * sum_tt - sum_t * sum_t;
    if denom.abs() < f64::EPSILON {
        return Some((0.0, sum_v / n));
    }
    let slope = (n * sum_tv - sum_t * sum_v) / denom;
    let intercept = (sum_v - slope * sum_t) / n;
    Some((slope, intercept))
}

/// Holt's linear trend method (double exponential smoothing): level and
/// trend updated per observation with fixed smoothing constants.
fn holt_linear(samples: &[(i64, f64)]) -> (f64, f64) {
    const ALPHA: f64 = 0.5;
    const BETA: f64 = 0.3;

    let mut level = samples[0].1;
    let mut trend = samples[1].1 - samples[0].1;

    for &(_, value) in &samples[1..] {
        let prev_level = level;
        level = ALPHA * value + (1.0 - ALPHA) * (level + trend);
        trend = BETA * (level - prev_level) + (1.0 - BETA) * trend;
    }
    (level, trend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_below_two_samples() {
        assert!(project(&[(0, 1.0)], 3600.0).is_none());
        assert!(project(&[], 3600.0).is_none());
    }

    #[test]
    fn linear_regression_used_below_seven_samples() {
        let samples: Vec<(i64, f64)> = (0..4).map(|i| (i * 3600, 10.0 + i as f64 * 5.0)).collect();
        let proj = project(&samples, 3600.0).unwrap();
        assert_eq!(proj.method, Method::LinearRegression);
        assert!(proj.projected > proj.current);
    }

    #[test]
    fn holt_linear_used_at_seven_or_more_samples() {
        let samples: Vec<(i64, f64)> = (0..8).map(|i| (i * 3600, 50.0 + i as f64 * 2.0)).collect();
        let proj = project(&samples, 3600.0 * 5.0).unwrap();
        assert_eq!(proj.method, Method::HoltLinear);
        assert!(proj.projected > proj.current);
    }

    #[test]
    fn flat_series_projects_flat() {
        let samples: Vec<(i64, f64)> = (0..10).map(|i| (i * 3600, 42.0)).collect();
        let proj = project(&samples, 3600.0 * 10.0).unwrap();
        assert!((proj.projected - 42.0).abs() < 1.0);
    }
}
