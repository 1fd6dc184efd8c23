pub mod config;
pub mod domain;
pub mod errors;
pub mod ml;
pub mod pricing;
pub mod synthetic;

pub use config::{AppConfig, ConfigError, LoadOptions, TrainingConfig};
pub use domain::context::{PricedContext, ProductContext, ProductContextBuilder};
pub use domain::product::{CategoricalAttribute, ProductId, MISSING_CATEGORY};
pub use domain::simulation::{OptimizationOutcome, SimulationRow};
pub use domain::transaction::TransactionRecord;
pub use errors::{InterfaceError, ModelKind, PricingError};
pub use ml::encoder::{CategoryLookup, EncodedRecord, FeatureEncoder, FALLBACK_CODE};
pub use ml::{DemandPredictor, FeatureVector, ReturnRiskPredictor};
pub use pricing::{
    optimize, select_best, PriceGrid, PriceSimulator, PricingEngine, TrainedPricingModels,
    TrainingReport,
};
