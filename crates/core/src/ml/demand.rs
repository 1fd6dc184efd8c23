//! Demand regression: a ridge trend over the numeric columns plus a
//! gradient-boosted ensemble of shallow trees fitted on its residuals.
//!
//! The trend carries the price response between observed price points; the
//! trees pick up category and season effects the trend cannot express.
//! Predictions are clamped to the configured demand floor, so the simulator
//! never sees negative units.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::TrainingConfig;
use crate::errors::{ModelKind, PricingError};
use crate::ml::linalg;
use crate::ml::metrics::{
    log_log_elasticity, mean_absolute_error, r_squared, root_mean_squared_error,
    RegressionMetrics,
};
use crate::ml::tree::{RegressionTree, TreeParams};
use crate::ml::{holdout_split, select, DemandPredictor, FeatureVector, NUMERIC_OFFSET, PRICE_INDEX};

const NUMERIC_COLUMNS: usize = 3;
const MIN_DEMAND_ROWS: usize = 2;
const ZERO_VARIANCE: f64 = 1e-12;
const RIDGE_RETRY_FACTOR: f64 = 1e3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandModelParams {
    pub seed: u64,
    pub holdout_fraction: f64,
    pub ridge_lambda: f64,
    pub demand_floor: f64,
    pub boosting_rounds: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

impl From<&TrainingConfig> for DemandModelParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            seed: config.seed,
            holdout_fraction: config.holdout_fraction,
            ridge_lambda: config.ridge_lambda,
            demand_floor: config.demand_floor,
            boosting_rounds: config.boosting_rounds,
            learning_rate: config.boosting_learning_rate,
            tree: TreeParams {
                max_depth: config.tree_max_depth,
                min_samples_leaf: config.tree_min_samples_leaf,
            },
        }
    }
}

impl Default for DemandModelParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

/// Centered ridge fit of demand on current price, markdown and original price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    means: [f64; NUMERIC_COLUMNS],
    coefficients: [f64; NUMERIC_COLUMNS],
    intercept: f64,
}

impl LinearTrend {
    pub fn fit(rows: &[FeatureVector], targets: &[f64], lambda: f64) -> Self {
        let n = rows.len().min(targets.len());
        let intercept = if n == 0 { 0.0 } else { targets[..n].iter().sum::<f64>() / n as f64 };
        let mut trend =
            Self { means: [0.0; NUMERIC_COLUMNS], coefficients: [0.0; NUMERIC_COLUMNS], intercept };
        if n < MIN_DEMAND_ROWS {
            return trend;
        }

        for column in 0..NUMERIC_COLUMNS {
            trend.means[column] =
                rows[..n].iter().map(|row| row[NUMERIC_OFFSET + column]).sum::<f64>() / n as f64;
        }

        let active: Vec<usize> = (0..NUMERIC_COLUMNS)
            .filter(|&column| {
                let mean = trend.means[column];
                let variance = rows[..n]
                    .iter()
                    .map(|row| (row[NUMERIC_OFFSET + column] - mean).powi(2))
                    .sum::<f64>()
                    / n as f64;
                variance > ZERO_VARIANCE
            })
            .collect();
        if active.is_empty() {
            return trend;
        }

        let centered = |row: &FeatureVector, column: usize| {
            row[NUMERIC_OFFSET + column] - trend.means[column]
        };
        let k = active.len();
        let mut gram = vec![vec![0.0; k]; k];
        let mut moment = vec![0.0; k];
        for (row, &target) in rows[..n].iter().zip(targets) {
            let residual = target - intercept;
            for (i, &ci) in active.iter().enumerate() {
                let xi = centered(row, ci);
                moment[i] += xi * residual / n as f64;
                for (j, &cj) in active.iter().enumerate() {
                    gram[i][j] += xi * centered(row, cj) / n as f64;
                }
            }
        }

        let solution = ridge_solve(&gram, &moment, lambda)
            .or_else(|| ridge_solve(&gram, &moment, lambda.max(ZERO_VARIANCE) * RIDGE_RETRY_FACTOR));
        if let Some(weights) = solution {
            for (&column, weight) in active.iter().zip(weights) {
                trend.coefficients[column] = weight;
            }
        }
        trend
    }

    pub fn predict(&self, row: &FeatureVector) -> f64 {
        (0..NUMERIC_COLUMNS).fold(self.intercept, |acc, column| {
            acc + self.coefficients[column] * (row[NUMERIC_OFFSET + column] - self.means[column])
        })
    }

    /// Units gained per unit increase of the current price.
    pub fn price_slope(&self) -> f64 {
        self.coefficients[0]
    }
}

fn ridge_solve(gram: &[Vec<f64>], moment: &[f64], lambda: f64) -> Option<Vec<f64>> {
    let mut regularized = gram.to_vec();
    for (i, row) in regularized.iter_mut().enumerate() {
        row[i] += lambda;
    }
    linalg::solve(regularized, moment.to_vec())
        .filter(|weights| weights.iter().all(|weight| weight.is_finite()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct FittedDemand {
    trend: LinearTrend,
    trees: Vec<RegressionTree>,
    learning_rate: f64,
    demand_floor: f64,
}

impl FittedDemand {
    fn fit(rows: &[FeatureVector], targets: &[f64], params: &DemandModelParams) -> Self {
        let trend = LinearTrend::fit(rows, targets, params.ridge_lambda);
        let mut residuals: Vec<f64> =
            rows.iter().zip(targets).map(|(row, target)| target - trend.predict(row)).collect();

        let mut trees = Vec::new();
        for _ in 0..params.boosting_rounds {
            let tree = RegressionTree::fit(rows, &residuals, &params.tree);
            if tree.is_trivial() {
                break;
            }
            for (residual, row) in residuals.iter_mut().zip(rows) {
                *residual -= params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Self { trend, trees, learning_rate: params.learning_rate, demand_floor: params.demand_floor }
    }

    fn predict(&self, row: &FeatureVector) -> f64 {
        let correction: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        let raw = self.trend.predict(row) + self.learning_rate * correction;
        if raw.is_finite() {
            raw.max(self.demand_floor)
        } else {
            self.demand_floor
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandModel {
    params: DemandModelParams,
    fitted: Option<FittedDemand>,
    metrics: Option<RegressionMetrics>,
}

impl DemandModel {
    pub fn new(params: DemandModelParams) -> Self {
        Self { params, fitted: None, metrics: None }
    }

    pub fn params(&self) -> &DemandModelParams {
        &self.params
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn metrics(&self) -> Option<&RegressionMetrics> {
        self.metrics.as_ref()
    }

    pub fn tree_count(&self) -> usize {
        self.fitted.as_ref().map_or(0, |fitted| fitted.trees.len())
    }

    /// Fits the model and reports holdout error. A failed call leaves any
    /// previously fitted state untouched.
    pub fn train(
        &mut self,
        rows: &[FeatureVector],
        targets: &[f64],
    ) -> Result<&RegressionMetrics, PricingError> {
        validate_inputs(rows, targets)?;

        let split = holdout_split(rows.len(), self.params.holdout_fraction, self.params.seed);
        let train_rows = select(rows, &split.train);
        let train_targets = select(targets, &split.train);
        let fitted = FittedDemand::fit(&train_rows, &train_targets, &self.params);

        let (eval_rows, eval_targets) = if split.in_sample() {
            (train_rows.clone(), train_targets.clone())
        } else {
            (select(rows, &split.holdout), select(targets, &split.holdout))
        };
        let predicted: Vec<f64> = eval_rows.iter().map(|row| fitted.predict(row)).collect();
        let train_prices: Vec<f64> = train_rows.iter().map(|row| row[PRICE_INDEX]).collect();

        let metrics = RegressionMetrics {
            mae: mean_absolute_error(&eval_targets, &predicted),
            rmse: root_mean_squared_error(&eval_targets, &predicted),
            r2: r_squared(&eval_targets, &predicted),
            price_elasticity: log_log_elasticity(&train_prices, &train_targets),
            train_samples: split.train.len(),
            holdout_samples: split.holdout.len(),
            in_sample: split.in_sample(),
        };

        info!(
            event_name = "pricing.demand.trained",
            train_samples = metrics.train_samples,
            holdout_samples = metrics.holdout_samples,
            in_sample = metrics.in_sample,
            trees = fitted.trees.len(),
            price_slope = fitted.trend.price_slope(),
            mae = metrics.mae,
            r2 = metrics.r2,
            "demand model trained"
        );

        self.fitted = Some(fitted);
        Ok(self.metrics.insert(metrics))
    }
}

impl DemandPredictor for DemandModel {
    fn predict_demand(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, PricingError> {
        let fitted =
            self.fitted.as_ref().ok_or(PricingError::ModelNotTrained { model: ModelKind::Demand })?;
        Ok(rows.iter().map(|row| fitted.predict(row)).collect())
    }
}

fn validate_inputs(rows: &[FeatureVector], targets: &[f64]) -> Result<(), PricingError> {
    if rows.is_empty() {
        return Err(PricingError::insufficient(ModelKind::Demand, "no training rows"));
    }
    if rows.len() != targets.len() {
        return Err(PricingError::InvalidTrainingInput(format!(
            "{} feature rows but {} demand targets",
            rows.len(),
            targets.len()
        )));
    }
    if let Some(index) = targets.iter().position(|target| !target.is_finite() || *target < 0.0) {
        return Err(PricingError::InvalidTrainingInput(format!(
            "demand target at row {index} is {} (expected a non-negative unit count)",
            targets[index]
        )));
    }
    if let Some(index) = rows.iter().position(|row| row.iter().any(|value| !value.is_finite())) {
        return Err(PricingError::InvalidTrainingInput(format!(
            "feature row {index} contains a non-finite value"
        )));
    }
    if rows.len() < MIN_DEMAND_ROWS {
        return Err(PricingError::insufficient(
            ModelKind::Demand,
            format!("{} row(s), at least {MIN_DEMAND_ROWS} required", rows.len()),
        ));
    }
    Ok(())
}
