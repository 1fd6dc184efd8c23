use thiserror::Error;

/// Which fitted model an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Demand,
    ReturnRisk,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Demand => f.write_str("demand"),
            Self::ReturnRisk => f.write_str("return_risk"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("insufficient training data for {model} model: {reason}")]
    InsufficientData { model: ModelKind, reason: String },
    #[error("{model} model has not been trained")]
    ModelNotTrained { model: ModelKind },
    #[error("optimizer received no simulation rows")]
    EmptyResult,
    #[error("invalid price grid: {0}")]
    InvalidPriceGrid(String),
    #[error("invalid product context field `{field}`: {reason}")]
    InvalidContext { field: &'static str, reason: String },
    #[error("invalid training input: {0}")]
    InvalidTrainingInput(String),
    #[error("{model} model returned {actual} predictions for {expected} rows")]
    PredictionCountMismatch { model: ModelKind, expected: usize, actual: usize },
}

impl PricingError {
    pub fn insufficient(model: ModelKind, reason: impl Into<String>) -> Self {
        Self::InsufficientData { model, reason: reason.into() }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotReady { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not ready: {message}")]
    NotReady { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The pricing request could not be processed. Check the inputs and try again."
            }
            Self::NotReady { .. } => {
                "Pricing models are not ready yet. Train them before running a simulation."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl From<PricingError> for InterfaceError {
    fn from(value: PricingError) -> Self {
        let message = value.to_string();
        match value {
            PricingError::EmptyResult
            | PricingError::InvalidPriceGrid(_)
            | PricingError::InvalidContext { .. } => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            PricingError::ModelNotTrained { .. } => {
                Self::NotReady { message, correlation_id: "unassigned".to_owned() }
            }
            PricingError::InsufficientData { .. }
            | PricingError::InvalidTrainingInput(_)
            | PricingError::PredictionCountMismatch { .. } => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
