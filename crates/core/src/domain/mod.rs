pub mod context;
pub mod product;
pub mod simulation;
pub mod transaction;
