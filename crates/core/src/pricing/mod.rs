//! Price sweep, simulation and arg-max selection over trained models.

pub mod engine;
pub mod grid;
pub mod optimizer;
pub mod simulator;

pub use engine::{PricingEngine, TrainedPricingModels, TrainingReport};
pub use grid::PriceGrid;
pub use optimizer::{optimize, select_best};
pub use simulator::PriceSimulator;
