use crate::domain::simulation::{OptimizationOutcome, SimulationRow};
use crate::errors::PricingError;

/// Index of the row with the highest risk-adjusted revenue.
///
/// Ties keep the earliest row; a NaN objective never wins.
pub fn best_index(rows: &[SimulationRow]) -> Result<usize, PricingError> {
    if rows.is_empty() {
        return Err(PricingError::EmptyResult);
    }

    let mut best = 0;
    let mut best_value = objective(&rows[0]);
    for (index, row) in rows.iter().enumerate().skip(1) {
        let value = objective(row);
        if value > best_value {
            best = index;
            best_value = value;
        }
    }
    Ok(best)
}

pub fn select_best(rows: &[SimulationRow]) -> Result<&SimulationRow, PricingError> {
    best_index(rows).map(|index| &rows[index])
}

/// Selects the optimum and keeps the full curve alongside it.
pub fn optimize(curve: Vec<SimulationRow>) -> Result<OptimizationOutcome, PricingError> {
    let best_index = best_index(&curve)?;
    Ok(OptimizationOutcome { best: curve[best_index], best_index, curve })
}

fn objective(row: &SimulationRow) -> f64 {
    if row.risk_adjusted_revenue.is_nan() {
        f64::NEG_INFINITY
    } else {
        row.risk_adjusted_revenue
    }
}
