use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::product::{CategoricalAttribute, NumericAttributes, ProductId};

/// One historical sale. Read-only input to the encoder and both models.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub product_id: ProductId,
    pub purchase_date: NaiveDate,
    pub brand: String,
    pub category: String,
    pub season: String,
    pub size: Option<String>,
    pub color: String,
    pub current_price: f64,
    pub markdown_percentage: f64,
    pub original_price: f64,
    pub units_sold: f64,
    pub is_returned: bool,
}

impl TransactionRecord {
    pub fn categorical(&self, attribute: CategoricalAttribute) -> Option<&str> {
        match attribute {
            CategoricalAttribute::Brand => Some(&self.brand),
            CategoricalAttribute::Category => Some(&self.category),
            CategoricalAttribute::Season => Some(&self.season),
            CategoricalAttribute::Size => self.size.as_deref(),
            CategoricalAttribute::Color => Some(&self.color),
        }
    }

    pub fn numeric(&self) -> NumericAttributes {
        NumericAttributes {
            current_price: self.current_price,
            markdown_percentage: self.markdown_percentage,
            original_price: self.original_price,
        }
    }

    pub fn revenue(&self) -> f64 {
        self.current_price * self.units_sold
    }
}
