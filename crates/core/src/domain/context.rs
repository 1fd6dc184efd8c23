use serde::{Deserialize, Serialize};

use crate::domain::product::{CategoricalAttribute, NumericAttributes};
use crate::errors::PricingError;

/// Product attributes held fixed while the simulator sweeps price.
///
/// Built through [`ProductContextBuilder`] so a context with a missing or
/// out-of-range field cannot exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductContext {
    brand: String,
    category: String,
    season: String,
    size: Option<String>,
    color: String,
    markdown_percentage: f64,
    original_price: f64,
}

impl ProductContext {
    pub fn builder() -> ProductContextBuilder {
        ProductContextBuilder::default()
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn markdown_percentage(&self) -> f64 {
        self.markdown_percentage
    }

    pub fn original_price(&self) -> f64 {
        self.original_price
    }

    pub fn categorical(&self, attribute: CategoricalAttribute) -> Option<&str> {
        match attribute {
            CategoricalAttribute::Brand => Some(&self.brand),
            CategoricalAttribute::Category => Some(&self.category),
            CategoricalAttribute::Season => Some(&self.season),
            CategoricalAttribute::Size => self.size.as_deref(),
            CategoricalAttribute::Color => Some(&self.color),
        }
    }

    /// The context with `price` substituted as the current price.
    pub fn at_price(&self, price: f64) -> PricedContext<'_> {
        PricedContext { context: self, price }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PricedContext<'a> {
    pub context: &'a ProductContext,
    pub price: f64,
}

impl PricedContext<'_> {
    pub fn numeric(&self) -> NumericAttributes {
        NumericAttributes {
            current_price: self.price,
            markdown_percentage: self.context.markdown_percentage,
            original_price: self.context.original_price,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProductContextBuilder {
    brand: Option<String>,
    category: Option<String>,
    season: Option<String>,
    size: Option<String>,
    color: Option<String>,
    markdown_percentage: Option<f64>,
    original_price: Option<f64>,
}

impl ProductContextBuilder {
    pub fn brand(mut self, value: impl Into<String>) -> Self {
        self.brand = Some(value.into());
        self
    }

    pub fn category(mut self, value: impl Into<String>) -> Self {
        self.category = Some(value.into());
        self
    }

    pub fn season(mut self, value: impl Into<String>) -> Self {
        self.season = Some(value.into());
        self
    }

    /// Optional; products without a size encode as the missing-category sentinel.
    pub fn size(mut self, value: impl Into<String>) -> Self {
        self.size = Some(value.into());
        self
    }

    pub fn color(mut self, value: impl Into<String>) -> Self {
        self.color = Some(value.into());
        self
    }

    pub fn markdown_percentage(mut self, value: f64) -> Self {
        self.markdown_percentage = Some(value);
        self
    }

    pub fn original_price(mut self, value: f64) -> Self {
        self.original_price = Some(value);
        self
    }

    pub fn build(self) -> Result<ProductContext, PricingError> {
        let markdown_percentage = self.markdown_percentage.ok_or(PricingError::InvalidContext {
            field: "markdown_percentage",
            reason: "field is required".to_string(),
        })?;
        if !markdown_percentage.is_finite() || !(0.0..1.0).contains(&markdown_percentage) {
            return Err(PricingError::InvalidContext {
                field: "markdown_percentage",
                reason: format!("{markdown_percentage} is outside 0.0..1.0"),
            });
        }

        let original_price = self.original_price.ok_or(PricingError::InvalidContext {
            field: "original_price",
            reason: "field is required".to_string(),
        })?;
        if !original_price.is_finite() || original_price <= 0.0 {
            return Err(PricingError::InvalidContext {
                field: "original_price",
                reason: format!("{original_price} must be a positive finite price"),
            });
        }

        let size = self.size.map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        Ok(ProductContext {
            brand: required_text("brand", self.brand)?,
            category: required_text("category", self.category)?,
            season: required_text("season", self.season)?,
            size,
            color: required_text("color", self.color)?,
            markdown_percentage,
            original_price,
        })
    }
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, PricingError> {
    let value = value.ok_or(PricingError::InvalidContext {
        field,
        reason: "field is required".to_string(),
    })?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PricingError::InvalidContext { field, reason: "value is blank".to_string() });
    }
    Ok(trimmed.to_string())
}
