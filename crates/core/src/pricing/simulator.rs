use tracing::{debug, warn};

use crate::domain::context::ProductContext;
use crate::domain::simulation::SimulationRow;
use crate::errors::{ModelKind, PricingError};
use crate::ml::encoder::FeatureEncoder;
use crate::ml::{DemandPredictor, FeatureVector, ReturnRiskPredictor};
use crate::pricing::grid::PriceGrid;

/// Sweeps price over a grid while holding the rest of a product context fixed.
///
/// Borrows the fitted encoder and both predictors read-only, so any number of
/// simulators may run against the same trained models.
pub struct PriceSimulator<'a, D: ?Sized, R: ?Sized> {
    encoder: &'a FeatureEncoder,
    demand: &'a D,
    return_risk: &'a R,
}

impl<'a, D, R> PriceSimulator<'a, D, R>
where
    D: DemandPredictor + ?Sized,
    R: ReturnRiskPredictor + ?Sized,
{
    pub fn new(encoder: &'a FeatureEncoder, demand: &'a D, return_risk: &'a R) -> Self {
        Self { encoder, demand, return_risk }
    }

    /// One row per grid price, in grid order. Rows whose demand bottoms out
    /// at the floor are kept.
    pub fn simulate(
        &self,
        context: &ProductContext,
        grid: &PriceGrid,
    ) -> Result<Vec<SimulationRow>, PricingError> {
        let mut vectors: Vec<FeatureVector> = Vec::with_capacity(grid.len());
        for (position, &price) in grid.prices().iter().enumerate() {
            let encoded = self.encoder.apply(&context.at_price(price));
            if position == 0 {
                for attribute in encoded.fallbacks() {
                    warn!(
                        event_name = "pricing.simulate.unseen_category",
                        attribute = %attribute,
                        value = context.categorical(attribute).unwrap_or_default(),
                        "category not seen during training, using fallback code"
                    );
                }
            }
            vectors.push(encoded.vector);
        }

        let demand = self.demand.predict_demand(&vectors)?;
        expect_prediction_count(ModelKind::Demand, vectors.len(), demand.len())?;
        let probabilities = self.return_risk.predict_return_probability(&vectors)?;
        expect_prediction_count(ModelKind::ReturnRisk, vectors.len(), probabilities.len())?;

        let rows: Vec<SimulationRow> = grid
            .prices()
            .iter()
            .zip(demand)
            .zip(probabilities)
            .map(|((&price, units), probability)| {
                SimulationRow::new(price, units, probability.clamp(0.0, 1.0))
            })
            .collect();

        debug!(
            event_name = "pricing.simulate.completed",
            brand = context.brand(),
            category = context.category(),
            grid_points = rows.len(),
            "price grid simulated"
        );
        Ok(rows)
    }
}

fn expect_prediction_count(
    model: ModelKind,
    expected: usize,
    actual: usize,
) -> Result<(), PricingError> {
    if expected == actual {
        Ok(())
    } else {
        Err(PricingError::PredictionCountMismatch { model, expected, actual })
    }
}
