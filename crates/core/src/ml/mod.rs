//! Feature encoding and the two fitted models behind the price simulator.
//!
//! Every model consumes [`FeatureVector`]s laid out in [`FEATURE_NAMES`] order.
//! The encoder is the only producer of those vectors, so fit-time and
//! predict-time layouts cannot drift apart.

pub mod demand;
pub mod encoder;
pub mod linalg;
pub mod metrics;
pub mod return_risk;
pub mod tree;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::errors::PricingError;

pub const FEATURE_COUNT: usize = 8;

/// Categorical codes first (brand, category, season, size, color), then numerics.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "brand",
    "category",
    "season",
    "size",
    "color",
    "current_price",
    "markdown_percentage",
    "original_price",
];

/// Position of the first numeric attribute.
pub const NUMERIC_OFFSET: usize = 5;
pub const PRICE_INDEX: usize = NUMERIC_OFFSET;

pub type FeatureVector = [f64; FEATURE_COUNT];

/// Expected units sold per feature row.
pub trait DemandPredictor: Send + Sync {
    fn predict_demand(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, PricingError>;
}

/// Probability in `[0, 1]` that a sale at the feature row is returned.
pub trait ReturnRiskPredictor: Send + Sync {
    fn predict_return_probability(&self, rows: &[FeatureVector])
        -> Result<Vec<f64>, PricingError>;
}

/// Row indices for fitting and for the goodness-of-fit signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HoldoutSplit {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

impl HoldoutSplit {
    /// Every row trains and is evaluated.
    pub fn in_sample_of(len: usize) -> Self {
        Self { train: (0..len).collect(), holdout: Vec::new() }
    }

    pub fn in_sample(&self) -> bool {
        self.holdout.is_empty()
    }
}

const MIN_TRAINING_ROWS: usize = 2;

/// Seeded shuffle split. Falls back to all rows in-sample when the holdout
/// would be empty or would starve the training partition.
pub(crate) fn holdout_split(len: usize, fraction: f64, seed: u64) -> HoldoutSplit {
    let holdout_len = (len as f64 * fraction).floor() as usize;
    if holdout_len == 0 || len.saturating_sub(holdout_len) < MIN_TRAINING_ROWS {
        return HoldoutSplit::in_sample_of(len);
    }

    let mut shuffled: Vec<usize> = (0..len).collect();
    shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
    let mut holdout = shuffled[..holdout_len].to_vec();
    let mut train = shuffled[holdout_len..].to_vec();
    holdout.sort_unstable();
    train.sort_unstable();
    HoldoutSplit { train, holdout }
}

pub(crate) fn select<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&index| values[index]).collect()
}
