use serde::{Deserialize, Serialize};

use crate::errors::PricingError;

/// Candidate prices in evaluation order.
///
/// Order is whatever the caller supplied; nothing here sorts or dedupes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceGrid {
    prices: Vec<f64>,
}

impl PriceGrid {
    pub fn new(prices: Vec<f64>) -> Result<Self, PricingError> {
        if prices.is_empty() {
            return Err(PricingError::InvalidPriceGrid("grid is empty".to_string()));
        }
        if let Some((index, price)) =
            prices.iter().enumerate().find(|(_, price)| !price.is_finite() || **price <= 0.0)
        {
            return Err(PricingError::InvalidPriceGrid(format!(
                "price at position {index} is {price}, expected a positive finite value"
            )));
        }
        Ok(Self { prices })
    }

    /// Inclusive linear sweep from `low` to `high`. One step yields `[high]`.
    pub fn linear(low: f64, high: f64, steps: usize) -> Result<Self, PricingError> {
        if steps == 0 {
            return Err(PricingError::InvalidPriceGrid("steps must be at least 1".to_string()));
        }
        if !(low.is_finite() && high.is_finite()) || low > high {
            return Err(PricingError::InvalidPriceGrid(format!(
                "sweep bounds {low}..={high} are not an ascending finite range"
            )));
        }
        if steps == 1 {
            return Self::new(vec![high]);
        }

        let width = high - low;
        let last = (steps - 1) as f64;
        let prices = (0..steps)
            .map(|step| if step + 1 == steps { high } else { low + width * step as f64 / last })
            .collect();
        Self::new(prices)
    }

    /// Sweep from `lower_fraction * reference_price` up to the full reference price.
    pub fn markdown_sweep(
        reference_price: f64,
        lower_fraction: f64,
        steps: usize,
    ) -> Result<Self, PricingError> {
        if !(lower_fraction > 0.0 && lower_fraction <= 1.0) {
            return Err(PricingError::InvalidPriceGrid(format!(
                "lower fraction {lower_fraction} is outside (0, 1]"
            )));
        }
        Self::linear(reference_price * lower_fraction, reference_price, steps)
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::PriceGrid;
    use crate::errors::PricingError;

    #[test]
    fn caller_order_is_preserved() {
        let grid = PriceGrid::new(vec![30.0, 10.0, 20.0]).expect("valid grid");
        assert_eq!(grid.prices(), &[30.0, 10.0, 20.0]);
    }

    #[test]
    fn empty_and_non_positive_grids_are_rejected() {
        assert!(matches!(PriceGrid::new(Vec::new()), Err(PricingError::InvalidPriceGrid(_))));
        assert!(matches!(
            PriceGrid::new(vec![10.0, 0.0]),
            Err(PricingError::InvalidPriceGrid(_))
        ));
        assert!(matches!(
            PriceGrid::new(vec![f64::NAN]),
            Err(PricingError::InvalidPriceGrid(_))
        ));
    }

    #[test]
    fn markdown_sweep_spans_fraction_to_reference() {
        let grid = PriceGrid::markdown_sweep(100.0, 0.4, 20).expect("valid sweep");
        assert_eq!(grid.len(), 20);
        assert!((grid.prices()[0] - 40.0).abs() < 1e-12);
        assert_eq!(grid.prices()[19], 100.0);
        assert!(grid.prices().windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn single_step_sweep_is_the_reference_price() {
        let grid = PriceGrid::linear(10.0, 50.0, 1).expect("valid sweep");
        assert_eq!(grid.prices(), &[50.0]);
    }

    #[test]
    fn zero_lower_fraction_is_rejected() {
        assert!(PriceGrid::markdown_sweep(100.0, 0.0, 5).is_err());
        assert!(PriceGrid::linear(10.0, 50.0, 0).is_err());
    }
}
