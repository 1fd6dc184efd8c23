use chrono::NaiveDate;
use pricelab_core::ml::FeatureVector;
use pricelab_core::synthetic::generate_transactions;
use pricelab_core::{
    select_best, ModelKind, PriceGrid, PriceSimulator, PricingEngine, PricingError,
    ProductContext, ProductId, ReturnRiskPredictor, SimulationRow, TrainedPricingModels,
    TrainingConfig, TransactionRecord,
};

type PriceOptimizationResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

struct NoReturns;

impl ReturnRiskPredictor for NoReturns {
    fn predict_return_probability(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, PricingError> {
        Ok(vec![0.0; rows.len()])
    }
}

/// Single product line whose demand is exactly `1000 - 5 * price`.
fn linear_demand_records() -> Vec<TransactionRecord> {
    let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or(NaiveDate::MIN);
    (0..72)
        .map(|i| {
            let price = 20.0 + 2.5 * i as f64;
            TransactionRecord {
                product_id: ProductId("FB000100".to_string()),
                purchase_date: date,
                brand: "Zara".to_string(),
                category: "Dresses".to_string(),
                season: "Summer".to_string(),
                size: Some("M".to_string()),
                color: "Black".to_string(),
                current_price: price,
                markdown_percentage: 0.0,
                original_price: 250.0,
                units_sold: 1000.0 - 5.0 * price,
                is_returned: i % 4 == 0,
            }
        })
        .collect()
}

fn context(brand: &str) -> PriceOptimizationResult<ProductContext> {
    ProductContext::builder()
        .brand(brand)
        .category("Dresses")
        .season("Summer")
        .size("M")
        .color("Black")
        .markdown_percentage(0.0)
        .original_price(250.0)
        .build()
        .map_err(|error| error.to_string())
}

fn grid(prices: &[f64]) -> PriceOptimizationResult<PriceGrid> {
    PriceGrid::new(prices.to_vec()).map_err(|error| error.to_string())
}

fn trained_linear_models() -> PriceOptimizationResult<TrainedPricingModels> {
    TrainedPricingModels::train(&linear_demand_records(), &TrainingConfig::default())
        .map_err(|error| error.to_string())
}

#[test]
fn linear_demand_is_reproduced_across_the_grid() -> PriceOptimizationResult {
    let models = trained_linear_models()?;
    let rows = models
        .simulator()
        .simulate(&context("Zara")?, &grid(&[100.0, 150.0, 200.0])?)
        .map_err(|error| error.to_string())?;

    require_eq!(rows.len(), 3);
    require!((rows[0].predicted_demand - 500.0).abs() < 0.5, "demand at 100: {:?}", rows[0]);
    require!((rows[1].predicted_demand - 250.0).abs() < 0.5, "demand at 150: {:?}", rows[1]);
    require!(rows[2].predicted_demand < 1e-3, "demand at 200: {:?}", rows[2]);
    require!(rows[2].predicted_demand > 0.0);
    Ok(())
}

#[test]
fn optimizer_finds_the_revenue_vertex_without_returns() -> PriceOptimizationResult {
    let models = trained_linear_models()?;
    let simulator = PriceSimulator::new(models.encoder(), models.demand(), &NoReturns);
    let rows = simulator
        .simulate(&context("Zara")?, &grid(&[50.0, 100.0, 150.0, 200.0])?)
        .map_err(|error| error.to_string())?;

    let best = select_best(&rows).map_err(|error| error.to_string())?;
    require_eq!(best.price, 100.0);
    require!(rows.iter().all(|row| row.risk_adjusted_revenue == row.gross_revenue));
    Ok(())
}

#[test]
fn simulation_is_deterministic() -> PriceOptimizationResult {
    let records = generate_transactions(600, 42);
    let config = TrainingConfig { boosting_rounds: 15, ..TrainingConfig::default() };
    let first = TrainedPricingModels::train(&records, &config).map_err(|error| error.to_string())?;
    let second = TrainedPricingModels::train(&records, &config).map_err(|error| error.to_string())?;
    let sweep = PriceGrid::markdown_sweep(120.0, 0.4, 20).map_err(|error| error.to_string())?;
    let context = context("Mango")?;

    let a = first.simulator().simulate(&context, &sweep).map_err(|error| error.to_string())?;
    let b = first.simulator().simulate(&context, &sweep).map_err(|error| error.to_string())?;
    let c = second.simulator().simulate(&context, &sweep).map_err(|error| error.to_string())?;
    require_eq!(a, b);
    require_eq!(a, c);
    require_eq!(first.report(), second.report());
    Ok(())
}

#[test]
fn every_row_respects_floor_bounds_and_revenue_identities() -> PriceOptimizationResult {
    let records = generate_transactions(600, 9);
    let config = TrainingConfig { boosting_rounds: 15, ..TrainingConfig::default() };
    let models = TrainedPricingModels::train(&records, &config).map_err(|error| error.to_string())?;
    let prices: Vec<f64> = (1..=40).map(|step| step as f64 * 25.0).collect();
    let rows = models
        .simulator()
        .simulate(&context("Gap")?, &grid(&prices)?)
        .map_err(|error| error.to_string())?;

    let floor = config.demand_floor;
    for (row, price) in rows.iter().zip(&prices) {
        require_eq!(row.price, *price);
        require!(row.predicted_demand >= floor, "demand below floor: {row:?}");
        require!((0.0..=1.0).contains(&row.return_probability), "probability: {row:?}");
        require_eq!(row.gross_revenue, row.price * row.predicted_demand);
        require_eq!(row.risk_adjusted_revenue, row.gross_revenue * (1.0 - row.return_probability));
    }
    Ok(())
}

#[test]
fn grid_order_is_preserved_even_when_unsorted() -> PriceOptimizationResult {
    let models = trained_linear_models()?;
    let unsorted = [150.0, 50.0, 120.0, 90.0];
    let rows = models
        .simulator()
        .simulate(&context("Zara")?, &grid(&unsorted)?)
        .map_err(|error| error.to_string())?;

    let observed: Vec<f64> = rows.iter().map(|row| row.price).collect();
    require_eq!(observed, unsorted.to_vec());
    Ok(())
}

#[test]
fn single_price_grid_is_supported() -> PriceOptimizationResult {
    let models = trained_linear_models()?;
    let rows = models
        .simulator()
        .simulate(&context("Zara")?, &grid(&[80.0])?)
        .map_err(|error| error.to_string())?;
    require_eq!(rows.len(), 1);
    require_eq!(select_best(&rows).map(|row| row.price), Ok::<f64, PricingError>(80.0));
    Ok(())
}

#[test]
fn unseen_categories_degrade_instead_of_failing() -> PriceOptimizationResult {
    let models = trained_linear_models()?;
    let unknown = ProductContext::builder()
        .brand("Uniqlo")
        .category("Outerwear")
        .season("Winter")
        .color("Teal")
        .markdown_percentage(0.3)
        .original_price(180.0)
        .build()
        .map_err(|error| error.to_string())?;

    let rows = models
        .simulator()
        .simulate(&unknown, &grid(&[60.0, 90.0, 120.0])?)
        .map_err(|error| error.to_string())?;
    require_eq!(rows.len(), 3);
    require!(rows.iter().all(|row| row.risk_adjusted_revenue.is_finite()));
    Ok(())
}

#[test]
fn optimizer_prefers_the_earlier_row_on_ties() -> PriceOptimizationResult {
    let rows = vec![
        SimulationRow::new(10.0, 4.0, 0.0),
        SimulationRow::new(20.0, 2.0, 0.0),
        SimulationRow::new(40.0, 1.0, 0.0),
    ];
    let best = select_best(&rows).map_err(|error| error.to_string())?;
    require_eq!(best.price, 10.0);
    Ok(())
}

#[test]
fn optimizer_rejects_an_empty_curve() -> PriceOptimizationResult {
    require_eq!(select_best(&[]), Err::<&SimulationRow, PricingError>(PricingError::EmptyResult));
    Ok(())
}

#[test]
fn untrained_engine_refuses_requests() -> PriceOptimizationResult {
    let engine = PricingEngine::new(TrainingConfig::default());
    let error = engine
        .optimize(&context("Zara")?, &grid(&[10.0, 20.0])?)
        .err()
        .ok_or("untrained engine should fail")?;
    require_eq!(error, PricingError::ModelNotTrained { model: ModelKind::Demand });
    Ok(())
}

#[test]
fn degenerate_training_sets_are_rejected() -> PriceOptimizationResult {
    let empty = TrainedPricingModels::train(&[], &TrainingConfig::default());
    require!(matches!(empty, Err(PricingError::InsufficientData { .. })));

    let mut no_returns = linear_demand_records();
    for record in &mut no_returns {
        record.is_returned = false;
    }
    let single_class = TrainedPricingModels::train(&no_returns, &TrainingConfig::default());
    require!(matches!(
        single_class,
        Err(PricingError::InsufficientData { model: ModelKind::ReturnRisk, .. })
    ));
    Ok(())
}

#[test]
fn training_report_serializes_for_operators() -> PriceOptimizationResult {
    let mut engine = PricingEngine::new(TrainingConfig::default());
    let report = engine.train(&generate_transactions(400, 17)).map_err(|error| error.to_string())?;
    let value = serde_json::to_value(report).map_err(|error| error.to_string())?;

    require_eq!(value["records"], 400);
    require_eq!(value["features"][0], "brand");
    require_eq!(value["features"][7], "original_price");
    require!(value["categories"]["brand"].as_u64().unwrap_or_default() > 0);
    require!(value["demand"]["rmse"].is_number());
    require!(value["return_risk"]["log_loss"].is_number());
    Ok(())
}
