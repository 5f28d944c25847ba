//! Ordinary least-squares trend fitting over retained cycle history.

use ft_core::types::{CycleResult, Severity, TrendAnalysis, TrendDirection, TrendMetric};

/// Slope magnitudes below this are read as flat.
pub const STABLE_SLOPE: f64 = 0.5;

// ---------------------------------------------------------------------------
// Regression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit y = slope·x + intercept. Returns `None` with fewer than two points
/// or when every x coincides.
pub fn least_squares(points: &[(f64, f64)]) -> Option<Regression> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(Regression { slope, intercept })
}

// ---------------------------------------------------------------------------
// Metric extraction
// ---------------------------------------------------------------------------

/// The series value of one cycle for the given metric.
pub fn metric_value(result: &CycleResult, metric: TrendMetric) -> f64 {
    match metric {
        TrendMetric::TotalFeedback => result.feedback.len() as f64,
        TrendMetric::CriticalCount => result
            .by_severity
            .get(&Severity::Critical)
            .copied()
            .unwrap_or(0) as f64,
        TrendMetric::HealthScore => result.health_score,
    }
}

/// Classify the slope. Count metrics invert: more issues is a decline.
/// The health score reads the slope literally.
fn direction_for(metric: TrendMetric, slope: f64) -> TrendDirection {
    if slope.abs() < STABLE_SLOPE {
        return TrendDirection::Stable;
    }
    match metric {
        TrendMetric::TotalFeedback | TrendMetric::CriticalCount => {
            if slope > 0.0 {
                TrendDirection::Declining
            } else {
                TrendDirection::Improving
            }
        }
        TrendMetric::HealthScore => {
            if slope > 0.0 {
                TrendDirection::Improving
            } else {
                TrendDirection::Declining
            }
        }
    }
}

/// Trend of `metric` across history, regressed against cycle number.
/// Forecast is the regression value at the next cycle, floored at 0;
/// confidence grows with the number of data points, capped at 95.
pub fn analyze_trend(history: &[&CycleResult], metric: TrendMetric) -> TrendAnalysis {
    let points: Vec<(f64, f64)> = history
        .iter()
        .map(|r| (f64::from(r.cycle), metric_value(r, metric)))
        .collect();

    let data_points = points.len();
    let confidence = (50 + 5 * data_points as u32).min(95);

    match least_squares(&points) {
        Some(fit) => {
            let next_cycle = points.last().map(|(x, _)| x + 1.0).unwrap_or(0.0);
            TrendAnalysis {
                metric,
                direction: direction_for(metric, fit.slope),
                slope: fit.slope,
                forecast: fit.value_at(next_cycle).max(0.0),
                confidence,
                data_points,
            }
        }
        None => TrendAnalysis {
            metric,
            direction: TrendDirection::Stable,
            slope: 0.0,
            forecast: points.last().map(|(_, y)| *y).unwrap_or(0.0).max(0.0),
            confidence,
            data_points,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_fits_a_line() {
        let points: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let fit = least_squares(&points).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.value_at(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn least_squares_needs_two_distinct_x() {
        assert!(least_squares(&[]).is_none());
        assert!(least_squares(&[(1.0, 5.0)]).is_none());
        assert!(least_squares(&[(3.0, 1.0), (3.0, 9.0)]).is_none());
    }

    #[test]
    fn flat_series_has_zero_slope() {
        let points: Vec<(f64, f64)> = (0..6).map(|i| (i as f64, 4.0)).collect();
        let fit = least_squares(&points).unwrap();
        assert!(fit.slope.abs() < 1e-9);
    }
}
