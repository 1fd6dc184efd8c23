use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Substituted for a categorical value the record does not carry (e.g. size on accessories).
pub const MISSING_CATEGORY: &str = "Unknown";

/// Categorical product attributes, in feature-vector order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalAttribute {
    Brand,
    Category,
    Season,
    Size,
    Color,
}

impl CategoricalAttribute {
    pub const ALL: [Self; 5] = [Self::Brand, Self::Category, Self::Season, Self::Size, Self::Color];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Category => "category",
            Self::Season => "season",
            Self::Size => "size",
            Self::Color => "color",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Brand => 0,
            Self::Category => 1,
            Self::Season => 2,
            Self::Size => 3,
            Self::Color => 4,
        }
    }
}

impl fmt::Display for CategoricalAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric attributes shared by transactions and priced contexts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericAttributes {
    pub current_price: f64,
    pub markdown_percentage: f64,
    pub original_price: f64,
}

impl NumericAttributes {
    pub fn to_array(&self) -> [f64; 3] {
        [self.current_price, self.markdown_percentage, self.original_price]
    }
}
