use serde::{Deserialize, Serialize};

const PROBABILITY_EPSILON: f64 = 1e-15;
/// Below this many strictly positive (price, demand) pairs the elasticity is reported as 0.
const MIN_ELASTICITY_POINTS: usize = 10;

/// Goodness of fit for the demand model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    /// Slope of log(demand) against log(price) over the training rows.
    pub price_elasticity: f64,
    pub train_samples: usize,
    pub holdout_samples: usize,
    pub in_sample: bool,
}

/// Goodness of fit for the return-risk classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub log_loss: f64,
    pub accuracy: f64,
    pub base_rate: f64,
    pub train_samples: usize,
    pub holdout_samples: usize,
    pub in_sample: bool,
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / n as f64
}

pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mse = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n as f64;
    mse.sqrt()
}

/// Coefficient of determination. A constant target scores 1.0 when it is
/// reproduced exactly and 0.0 otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = actual[..n].iter().sum::<f64>() / n as f64;
    let total: f64 = actual[..n].iter().map(|a| (a - mean).powi(2)).sum();
    let residual: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    if total <= f64::EPSILON {
        return if residual <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - residual / total
}

pub fn log_loss(actual: &[bool], probabilities: &[f64]) -> f64 {
    let n = actual.len().min(probabilities.len());
    if n == 0 {
        return 0.0;
    }
    let total: f64 = actual
        .iter()
        .zip(probabilities)
        .map(|(&label, &p)| {
            let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
            if label {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / n as f64
}

pub fn accuracy(actual: &[bool], probabilities: &[f64]) -> f64 {
    let n = actual.len().min(probabilities.len());
    if n == 0 {
        return 0.0;
    }
    let correct =
        actual.iter().zip(probabilities).filter(|&(&label, &p)| (p >= 0.5) == label).count();
    correct as f64 / n as f64
}

/// Least-squares slope of `ln(demand)` on `ln(price)`, skipping non-positive pairs.
pub fn log_log_elasticity(prices: &[f64], demand: &[f64]) -> f64 {
    let points: Vec<(f64, f64)> = prices
        .iter()
        .zip(demand)
        .filter(|&(&price, &units)| price > 0.0 && units > 0.0)
        .map(|(price, units)| (price.ln(), units.ln()))
        .collect();
    if points.len() <= MIN_ELASTICITY_POINTS {
        return 0.0;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let covariance: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let variance: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if variance <= f64::EPSILON {
        return 0.0;
    }
    covariance / variance
}

#[cfg(test)]
mod tests {
    use super::{
        accuracy, log_log_elasticity, log_loss, mean_absolute_error, r_squared,
        root_mean_squared_error,
    };

    #[test]
    fn regression_errors_on_known_values() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.0, 2.0, 3.0, 6.0];
        assert!((mean_absolute_error(&actual, &predicted) - 0.5).abs() < 1e-12);
        assert!((root_mean_squared_error(&actual, &predicted) - 1.0).abs() < 1e-12);
        assert!((r_squared(&actual, &actual) - 1.0).abs() < 1e-12);
        assert!(r_squared(&actual, &predicted) < 1.0);
    }

    #[test]
    fn constant_targets_do_not_divide_by_zero() {
        assert_eq!(r_squared(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r_squared(&[5.0, 5.0], &[4.0, 6.0]), 0.0);
    }

    #[test]
    fn log_loss_is_finite_for_confident_mistakes() {
        let loss = log_loss(&[true, false], &[0.0, 1.0]);
        assert!(loss.is_finite());
        assert!(loss > 30.0);
        assert_eq!(accuracy(&[true, false], &[0.9, 0.2]), 1.0);
    }

    #[test]
    fn elasticity_recovers_constant_elasticity_curve() {
        let prices: Vec<f64> = (1..=20).map(|step| step as f64 * 5.0).collect();
        let demand: Vec<f64> = prices.iter().map(|price| 1000.0 * price.powf(-1.5)).collect();
        assert!((log_log_elasticity(&prices, &demand) + 1.5).abs() < 1e-9);
    }

    #[test]
    fn elasticity_needs_enough_points() {
        let prices = [10.0, 20.0, 30.0];
        let demand = [3.0, 2.0, 1.0];
        assert_eq!(log_log_elasticity(&prices, &demand), 0.0);
    }
}
