use pricelab_core::config::ConfigOverrides;
use pricelab_core::synthetic::generate_transactions;
use pricelab_core::{PricingEngine, TrainingReport, TransactionRecord};
use serde::Serialize;

use super::{load_config, CommandResult, EXIT_TRAINING};

pub const DEFAULT_ROWS: usize = 2500;

#[derive(Clone, Debug)]
pub struct TrainArgs {
    pub rows: usize,
    pub seed: Option<u64>,
}

impl Default for TrainArgs {
    fn default() -> Self {
        Self { rows: DEFAULT_ROWS, seed: None }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DatasetSummary {
    pub rows: usize,
    pub seed: u64,
    pub total_units: f64,
    pub total_revenue: f64,
    pub return_rate: f64,
    pub markdown_share: f64,
}

impl DatasetSummary {
    pub(crate) fn from_records(records: &[TransactionRecord], seed: u64) -> Self {
        let rows = records.len();
        let share = |count: usize| if rows == 0 { 0.0 } else { count as f64 / rows as f64 };
        Self {
            rows,
            seed,
            total_units: records.iter().map(|record| record.units_sold).sum(),
            total_revenue: records.iter().map(TransactionRecord::revenue).sum(),
            return_rate: share(records.iter().filter(|record| record.is_returned).count()),
            markdown_share: share(
                records.iter().filter(|record| record.markdown_percentage > 0.0).count(),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct TrainPayload<'a> {
    dataset: DatasetSummary,
    report: &'a TrainingReport,
}

pub fn run(args: TrainArgs) -> CommandResult {
    let overrides = ConfigOverrides { seed: args.seed, ..Default::default() };
    let config = match load_config("train", overrides) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let seed = config.training.seed;
    let records = generate_transactions(args.rows, seed);
    let dataset = DatasetSummary::from_records(&records, seed);

    let mut engine = PricingEngine::new(config.training);
    match engine.train(&records) {
        Ok(report) => CommandResult::success_with_data(
            "train",
            format!(
                "trained on {} records (demand r2 {:.3}, return log-loss {:.3})",
                report.records, report.demand.r2, report.return_risk.log_loss
            ),
            TrainPayload { dataset, report },
        ),
        Err(error) => CommandResult::pricing_failure("train", error, EXIT_TRAINING),
    }
}
