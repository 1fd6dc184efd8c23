use anyhow::Context;
use pricelab_core::config::ConfigOverrides;
use pricelab_core::synthetic::generate_transactions;
use pricelab_core::{PriceGrid, PricingEngine, ProductContext, SimulationRow};
use serde::Serialize;

use super::train::{DatasetSummary, DEFAULT_ROWS};
use super::{load_config, CommandResult, EXIT_SIMULATION, EXIT_TRAINING};

#[derive(Clone, Debug)]
pub struct OptimizeArgs {
    pub brand: String,
    pub category: String,
    pub season: String,
    pub size: Option<String>,
    pub color: String,
    pub base_price: f64,
    pub markdown: f64,
    pub steps: Option<usize>,
    pub lower_fraction: Option<f64>,
    pub rows: usize,
    pub seed: Option<u64>,
}

impl OptimizeArgs {
    pub fn new(
        brand: impl Into<String>,
        category: impl Into<String>,
        season: impl Into<String>,
        base_price: f64,
    ) -> Self {
        Self {
            brand: brand.into(),
            category: category.into(),
            season: season.into(),
            size: Some("M".to_string()),
            color: "Black".to_string(),
            base_price,
            markdown: 0.0,
            steps: None,
            lower_fraction: None,
            rows: DEFAULT_ROWS,
            seed: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OptimizePayload {
    dataset: DatasetSummary,
    grid: GridSummary,
    best_index: usize,
    best: SimulationRow,
    curve: Vec<SimulationRow>,
}

#[derive(Debug, Serialize)]
struct GridSummary {
    lower_fraction: f64,
    steps: usize,
    min_price: f64,
    max_price: f64,
}

pub fn run(args: OptimizeArgs) -> CommandResult {
    let overrides = ConfigOverrides {
        seed: args.seed,
        grid_steps: args.steps,
        grid_lower_fraction: args.lower_fraction,
        ..Default::default()
    };
    let config = match load_config("optimize", overrides) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let context = match build_context(&args) {
        Ok(context) => context,
        Err(error) => {
            return CommandResult::failure(
                "optimize",
                "bad_request",
                format!("{error:#}"),
                EXIT_SIMULATION,
            );
        }
    };
    let grid = match PriceGrid::markdown_sweep(
        args.base_price,
        config.simulation.grid_lower_fraction,
        config.simulation.grid_steps,
    ) {
        Ok(grid) => grid,
        Err(error) => return CommandResult::pricing_failure("optimize", error, EXIT_SIMULATION),
    };

    let seed = config.training.seed;
    let records = generate_transactions(args.rows, seed);
    let dataset = DatasetSummary::from_records(&records, seed);
    let mut engine = PricingEngine::new(config.training);
    if let Err(error) = engine.train(&records) {
        return CommandResult::pricing_failure("optimize", error, EXIT_TRAINING);
    }

    match engine.optimize(&context, &grid) {
        Ok(outcome) => {
            let prices = grid.prices();
            let summary = GridSummary {
                lower_fraction: config.simulation.grid_lower_fraction,
                steps: grid.len(),
                min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
                max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            CommandResult::success_with_data(
                "optimize",
                format!(
                    "optimal price {:.2} with risk-adjusted revenue {:.2}",
                    outcome.best.price, outcome.best.risk_adjusted_revenue
                ),
                OptimizePayload {
                    dataset,
                    grid: summary,
                    best_index: outcome.best_index,
                    best: outcome.best,
                    curve: outcome.curve,
                },
            )
        }
        Err(error) => CommandResult::pricing_failure("optimize", error, EXIT_SIMULATION),
    }
}

fn build_context(args: &OptimizeArgs) -> anyhow::Result<ProductContext> {
    let mut builder = ProductContext::builder()
        .brand(args.brand.as_str())
        .category(args.category.as_str())
        .season(args.season.as_str())
        .color(args.color.as_str())
        .markdown_percentage(args.markdown)
        .original_price(args.base_price);
    if let Some(size) = &args.size {
        builder = builder.size(size.as_str());
    }
    builder.build().context("invalid product context")
}
