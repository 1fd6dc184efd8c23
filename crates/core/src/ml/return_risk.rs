//! Return-risk classifier.
//!
//! Deterministic logistic regression trained with batch gradient descent on
//! standardized features. Same data and parameters give the same weights.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TrainingConfig;
use crate::errors::{ModelKind, PricingError};
use crate::ml::metrics::{accuracy, log_loss, ClassificationMetrics};
use crate::ml::{
    holdout_split, select, FeatureVector, HoldoutSplit, ReturnRiskPredictor, FEATURE_COUNT,
};

const MIN_SCALE: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnRiskParams {
    pub seed: u64,
    pub holdout_fraction: f64,
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the feature weights; the bias is not regularized.
    pub l2: f64,
}

impl From<&TrainingConfig> for ReturnRiskParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            seed: config.seed,
            holdout_fraction: config.holdout_fraction,
            learning_rate: config.logistic_learning_rate,
            epochs: config.logistic_epochs,
            l2: config.logistic_l2,
        }
    }
}

impl Default for ReturnRiskParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

/// Per-column z-score transform fitted on the training partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: FeatureVector,
    scales: FeatureVector,
}

impl Standardizer {
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut means = [0.0; FEATURE_COUNT];
        let mut scales = [1.0; FEATURE_COUNT];
        if rows.is_empty() {
            return Self { means, scales };
        }

        let n = rows.len() as f64;
        for column in 0..FEATURE_COUNT {
            let mean = rows.iter().map(|row| row[column]).sum::<f64>() / n;
            let variance = rows.iter().map(|row| (row[column] - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            means[column] = mean;
            // constant columns pass through centered
            scales[column] = if std < MIN_SCALE { 1.0 } else { std };
        }
        Self { means, scales }
    }

    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for column in 0..FEATURE_COUNT {
            out[column] = (row[column] - self.means[column]) / self.scales[column];
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct FittedLogistic {
    standardizer: Standardizer,
    bias: f64,
    weights: FeatureVector,
}

impl FittedLogistic {
    fn fit(rows: &[FeatureVector], labels: &[bool], params: &ReturnRiskParams) -> Self {
        let standardizer = Standardizer::fit(rows);
        let x: Vec<FeatureVector> = rows.iter().map(|row| standardizer.transform(row)).collect();
        let y: Vec<f64> = labels.iter().map(|&label| if label { 1.0 } else { 0.0 }).collect();
        let n = x.len() as f64;

        let base_rate = y.iter().sum::<f64>() / n;
        let mut model = Self {
            standardizer,
            bias: (base_rate / (1.0 - base_rate)).ln(),
            weights: [0.0; FEATURE_COUNT],
        };

        for _ in 0..params.epochs {
            let mut bias_gradient = 0.0;
            let mut gradients = [0.0; FEATURE_COUNT];
            for (row, target) in x.iter().zip(&y) {
                let error = model.probability_standardized(row) - target;
                bias_gradient += error;
                for (gradient, value) in gradients.iter_mut().zip(row) {
                    *gradient += error * value;
                }
            }

            model.bias -= params.learning_rate * bias_gradient / n;
            for (weight, gradient) in model.weights.iter_mut().zip(gradients) {
                let step = gradient / n + params.l2 * *weight;
                *weight -= params.learning_rate * step;
            }
        }

        model
    }

    fn probability_standardized(&self, row: &FeatureVector) -> f64 {
        let z = self.weights.iter().zip(row).fold(self.bias, |acc, (w, x)| acc + w * x);
        sigmoid(z)
    }

    fn probability(&self, row: &FeatureVector) -> f64 {
        self.probability_standardized(&self.standardizer.transform(row))
    }
}

fn sigmoid(z: f64) -> f64 {
    let z = z.clamp(-500.0, 500.0);
    1.0 / (1.0 + (-z).exp())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnRiskModel {
    params: ReturnRiskParams,
    fitted: Option<FittedLogistic>,
    metrics: Option<ClassificationMetrics>,
}

impl ReturnRiskModel {
    pub fn new(params: ReturnRiskParams) -> Self {
        Self { params, fitted: None, metrics: None }
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn metrics(&self) -> Option<&ClassificationMetrics> {
        self.metrics.as_ref()
    }

    pub fn train(
        &mut self,
        rows: &[FeatureVector],
        labels: &[bool],
    ) -> Result<&ClassificationMetrics, PricingError> {
        if rows.is_empty() {
            return Err(PricingError::insufficient(ModelKind::ReturnRisk, "no training rows"));
        }
        if rows.len() != labels.len() {
            return Err(PricingError::InvalidTrainingInput(format!(
                "{} feature rows but {} return labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(index) = rows.iter().position(|row| row.iter().any(|value| !value.is_finite()))
        {
            return Err(PricingError::InvalidTrainingInput(format!(
                "feature row {index} contains a non-finite value"
            )));
        }

        if !has_both_classes(labels) {
            return Err(PricingError::insufficient(
                ModelKind::ReturnRisk,
                "return labels contain a single class",
            ));
        }

        let mut split = holdout_split(rows.len(), self.params.holdout_fraction, self.params.seed);
        if !has_both_classes(&select(labels, &split.train)) {
            warn!(
                event_name = "pricing.return_risk.holdout_fallback",
                holdout_samples = split.holdout.len(),
                "holdout took every label of one class, evaluating in-sample"
            );
            split = HoldoutSplit::in_sample_of(rows.len());
        }
        let train_rows = select(rows, &split.train);
        let train_labels = select(labels, &split.train);
        let positives = train_labels.iter().filter(|&&label| label).count();

        let fitted = FittedLogistic::fit(&train_rows, &train_labels, &self.params);
        let (eval_rows, eval_labels) = if split.in_sample() {
            (train_rows, train_labels.clone())
        } else {
            (select(rows, &split.holdout), select(labels, &split.holdout))
        };
        let probabilities: Vec<f64> = eval_rows.iter().map(|row| fitted.probability(row)).collect();

        let metrics = ClassificationMetrics {
            log_loss: log_loss(&eval_labels, &probabilities),
            accuracy: accuracy(&eval_labels, &probabilities),
            base_rate: positives as f64 / train_labels.len() as f64,
            train_samples: split.train.len(),
            holdout_samples: split.holdout.len(),
            in_sample: split.in_sample(),
        };

        info!(
            event_name = "pricing.return_risk.trained",
            train_samples = metrics.train_samples,
            holdout_samples = metrics.holdout_samples,
            in_sample = metrics.in_sample,
            base_rate = metrics.base_rate,
            log_loss = metrics.log_loss,
            accuracy = metrics.accuracy,
            "return-risk model trained"
        );

        self.fitted = Some(fitted);
        Ok(self.metrics.insert(metrics))
    }
}

fn has_both_classes(labels: &[bool]) -> bool {
    labels.iter().any(|&label| label) && labels.iter().any(|&label| !label)
}

impl ReturnRiskPredictor for ReturnRiskModel {
    fn predict_return_probability(
        &self,
        rows: &[FeatureVector],
    ) -> Result<Vec<f64>, PricingError> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(PricingError::ModelNotTrained { model: ModelKind::ReturnRisk })?;
        Ok(rows.iter().map(|row| fitted.probability(row)).collect())
    }
}
