use serde::{Deserialize, Serialize};

/// One evaluated grid point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRow {
    pub price: f64,
    pub predicted_demand: f64,
    pub gross_revenue: f64,
    pub return_probability: f64,
    pub risk_adjusted_revenue: f64,
}

impl SimulationRow {
    /// Derives both revenue figures from the model outputs.
    pub fn new(price: f64, predicted_demand: f64, return_probability: f64) -> Self {
        let gross_revenue = price * predicted_demand;
        Self {
            price,
            predicted_demand,
            gross_revenue,
            return_probability,
            risk_adjusted_revenue: gross_revenue * (1.0 - return_probability),
        }
    }
}

/// The selected optimum together with the curve it was chosen from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub best: SimulationRow,
    pub best_index: usize,
    pub curve: Vec<SimulationRow>,
}
