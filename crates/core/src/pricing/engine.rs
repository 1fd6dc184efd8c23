//! Training lifecycle and request path for price optimization.
//!
//! [`TrainedPricingModels`] is the fitted bundle: encoder, demand model and
//! return-risk model, trained together from one transaction set and never
//! mutated afterwards. [`PricingEngine`] holds an optional bundle and is
//! explicitly not ready until the first successful `train`.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::config::TrainingConfig;
use crate::domain::context::ProductContext;
use crate::domain::product::CategoricalAttribute;
use crate::domain::simulation::{OptimizationOutcome, SimulationRow};
use crate::domain::transaction::TransactionRecord;
use crate::errors::{ModelKind, PricingError};
use crate::ml::demand::{DemandModel, DemandModelParams};
use crate::ml::encoder::FeatureEncoder;
use crate::ml::metrics::{ClassificationMetrics, RegressionMetrics};
use crate::ml::return_risk::{ReturnRiskModel, ReturnRiskParams};
use crate::ml::FEATURE_NAMES;
use crate::pricing::grid::PriceGrid;
use crate::pricing::optimizer;
use crate::pricing::simulator::PriceSimulator;

/// Summary of one training pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingReport {
    pub records: usize,
    /// Column order of the feature vectors both models were fitted on.
    pub features: Vec<&'static str>,
    /// Distinct learned values per categorical attribute.
    pub categories: BTreeMap<String, usize>,
    pub demand: RegressionMetrics,
    pub demand_trees: usize,
    pub return_risk: ClassificationMetrics,
}

#[derive(Clone, Debug)]
pub struct TrainedPricingModels {
    encoder: FeatureEncoder,
    demand: DemandModel,
    return_risk: ReturnRiskModel,
    report: TrainingReport,
}

impl TrainedPricingModels {
    pub fn train(
        records: &[TransactionRecord],
        config: &TrainingConfig,
    ) -> Result<Self, PricingError> {
        if records.is_empty() {
            return Err(PricingError::insufficient(ModelKind::Demand, "no transaction records"));
        }
        info!(
            event_name = "pricing.training.started",
            records = records.len(),
            seed = config.seed,
            "training pricing models"
        );

        let encoder = FeatureEncoder::fit(records);
        let features = encoder.encode_all(records);
        let units: Vec<f64> = records.iter().map(|record| record.units_sold).collect();
        let returned: Vec<bool> = records.iter().map(|record| record.is_returned).collect();

        let mut demand = DemandModel::new(DemandModelParams::from(config));
        let demand_metrics = demand.train(&features, &units)?.clone();

        let mut return_risk = ReturnRiskModel::new(ReturnRiskParams::from(config));
        let return_metrics = return_risk.train(&features, &returned)?.clone();

        let categories = CategoricalAttribute::ALL
            .into_iter()
            .map(|attribute| (attribute.as_str().to_string(), encoder.table(attribute).len()))
            .collect();

        let report = TrainingReport {
            records: records.len(),
            features: FEATURE_NAMES.to_vec(),
            categories,
            demand: demand_metrics,
            demand_trees: demand.tree_count(),
            return_risk: return_metrics,
        };

        info!(
            event_name = "pricing.training.completed",
            records = report.records,
            demand_r2 = report.demand.r2,
            return_log_loss = report.return_risk.log_loss,
            "pricing models ready"
        );

        Ok(Self { encoder, demand, return_risk, report })
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn demand(&self) -> &DemandModel {
        &self.demand
    }

    pub fn return_risk(&self) -> &ReturnRiskModel {
        &self.return_risk
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn simulator(&self) -> PriceSimulator<'_, DemandModel, ReturnRiskModel> {
        PriceSimulator::new(&self.encoder, &self.demand, &self.return_risk)
    }
}

#[derive(Clone, Debug)]
pub struct PricingEngine {
    config: TrainingConfig,
    models: Option<TrainedPricingModels>,
}

impl PricingEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config, models: None }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Replaces the current models only when training succeeds.
    pub fn train(&mut self, records: &[TransactionRecord]) -> Result<&TrainingReport, PricingError> {
        let trained = TrainedPricingModels::train(records, &self.config)?;
        Ok(self.models.insert(trained).report())
    }

    pub fn is_ready(&self) -> bool {
        self.models.is_some()
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.models.as_ref().map(TrainedPricingModels::report)
    }

    pub fn models(&self) -> Option<&TrainedPricingModels> {
        self.models.as_ref()
    }

    pub fn simulate(
        &self,
        context: &ProductContext,
        grid: &PriceGrid,
    ) -> Result<Vec<SimulationRow>, PricingError> {
        self.trained()?.simulator().simulate(context, grid)
    }

    pub fn optimize(
        &self,
        context: &ProductContext,
        grid: &PriceGrid,
    ) -> Result<OptimizationOutcome, PricingError> {
        let curve = self.simulate(context, grid)?;
        let outcome = optimizer::optimize(curve)?;
        info!(
            event_name = "pricing.optimize.completed",
            brand = context.brand(),
            category = context.category(),
            best_price = outcome.best.price,
            risk_adjusted_revenue = outcome.best.risk_adjusted_revenue,
            "optimal price selected"
        );
        Ok(outcome)
    }

    fn trained(&self) -> Result<&TrainedPricingModels, PricingError> {
        self.models.as_ref().ok_or(PricingError::ModelNotTrained { model: ModelKind::Demand })
    }
}

#[cfg(test)]
mod tests {
    use super::PricingEngine;
    use crate::config::TrainingConfig;
    use crate::domain::context::ProductContext;
    use crate::errors::{ModelKind, PricingError};
    use crate::pricing::grid::PriceGrid;
    use crate::synthetic::generate_transactions;

    fn context() -> ProductContext {
        ProductContext::builder()
            .brand("Zara")
            .category("Dresses")
            .season("Summer")
            .size("M")
            .color("Black")
            .markdown_percentage(0.0)
            .original_price(120.0)
            .build()
            .expect("context should build")
    }

    fn fast_config() -> TrainingConfig {
        TrainingConfig { boosting_rounds: 10, logistic_epochs: 200, ..TrainingConfig::default() }
    }

    #[test]
    fn engine_is_not_ready_before_training() {
        let engine = PricingEngine::new(TrainingConfig::default());
        let grid = PriceGrid::new(vec![50.0]).expect("valid grid");

        assert!(!engine.is_ready());
        assert!(engine.report().is_none());
        assert_eq!(
            engine.simulate(&context(), &grid),
            Err(PricingError::ModelNotTrained { model: ModelKind::Demand })
        );
    }

    #[test]
    fn training_reports_both_models() {
        let records = generate_transactions(400, 11);
        let mut engine = PricingEngine::new(fast_config());
        let report = engine.train(&records).expect("training should succeed").clone();

        assert_eq!(report.records, 400);
        assert_eq!(report.demand.train_samples + report.demand.holdout_samples, 400);
        assert!(report.return_risk.base_rate > 0.0 && report.return_risk.base_rate < 1.0);
        assert_eq!(report.categories.get("brand"), Some(&8));
        assert_eq!(report.features.len(), 8);
        assert_eq!(report.features[5], "current_price");
        assert!(engine.is_ready());
    }

    #[test]
    fn failed_retrain_keeps_previous_models() {
        let mut engine = PricingEngine::new(fast_config());
        engine.train(&generate_transactions(300, 5)).expect("initial training");

        let error = engine.train(&[]).expect_err("empty dataset");
        assert!(matches!(error, PricingError::InsufficientData { .. }));
        assert!(engine.is_ready());
    }

    #[test]
    fn optimize_selects_a_grid_price() {
        let mut engine = PricingEngine::new(fast_config());
        engine.train(&generate_transactions(400, 3)).expect("training should succeed");
        let grid = PriceGrid::markdown_sweep(120.0, 0.4, 10).expect("valid sweep");

        let outcome = engine.optimize(&context(), &grid).expect("optimization");
        assert_eq!(outcome.curve.len(), 10);
        assert!(grid.prices().contains(&outcome.best.price));
        assert_eq!(outcome.curve[outcome.best_index], outcome.best);
    }
}
