use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::context::PricedContext;
use crate::domain::product::{CategoricalAttribute, NumericAttributes, MISSING_CATEGORY};
use crate::domain::transaction::TransactionRecord;
use crate::ml::{FeatureVector, FEATURE_COUNT, NUMERIC_OFFSET};

/// Code emitted for a categorical value that was not seen at fit time.
pub const FALLBACK_CODE: u32 = 0;

/// Anything the encoder can turn into a feature vector.
pub trait FeatureSource {
    fn categorical_value(&self, attribute: CategoricalAttribute) -> Option<&str>;
    fn numeric_values(&self) -> NumericAttributes;
}

impl FeatureSource for TransactionRecord {
    fn categorical_value(&self, attribute: CategoricalAttribute) -> Option<&str> {
        self.categorical(attribute)
    }

    fn numeric_values(&self) -> NumericAttributes {
        self.numeric()
    }
}

impl FeatureSource for PricedContext<'_> {
    fn categorical_value(&self, attribute: CategoricalAttribute) -> Option<&str> {
        self.context.categorical(attribute)
    }

    fn numeric_values(&self) -> NumericAttributes {
        self.numeric()
    }
}

/// Result of looking up one categorical value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum CategoryLookup {
    Known(u32),
    Fallback(u32),
}

impl CategoryLookup {
    pub fn code(&self) -> u32 {
        match self {
            Self::Known(code) | Self::Fallback(code) => *code,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Raw category value to dense code (`1..=n`) for one attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingTable {
    attribute: CategoricalAttribute,
    codes: BTreeMap<String, u32>,
}

impl EncodingTable {
    fn fit<'a>(attribute: CategoricalAttribute, values: impl Iterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = values.collect();
        let codes = distinct
            .into_iter()
            .zip(1_u32..)
            .map(|(value, code)| (value.to_string(), code))
            .collect();
        Self { attribute, codes }
    }

    pub fn attribute(&self) -> CategoricalAttribute {
        self.attribute
    }

    pub fn lookup(&self, raw: &str) -> CategoryLookup {
        match self.codes.get(raw) {
            Some(code) => CategoryLookup::Known(*code),
            None => CategoryLookup::Fallback(FALLBACK_CODE),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }
}

/// One encoded record plus which lookups degraded to the fallback code.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedRecord {
    pub vector: FeatureVector,
    pub lookups: [CategoryLookup; 5],
}

impl EncodedRecord {
    pub fn fallbacks(&self) -> impl Iterator<Item = CategoricalAttribute> + '_ {
        CategoricalAttribute::ALL
            .into_iter()
            .filter(|attribute| self.lookups[attribute.index()].is_fallback())
    }

    pub fn has_fallback(&self) -> bool {
        self.lookups.iter().any(CategoryLookup::is_fallback)
    }
}

/// Categorical encoding tables fitted from a transaction set.
///
/// Construction is the fit step, so an encoder that has not been fitted
/// cannot be applied. The tables are never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    tables: Vec<EncodingTable>,
}

impl FeatureEncoder {
    pub fn fit<S: FeatureSource>(records: &[S]) -> Self {
        let tables = CategoricalAttribute::ALL
            .into_iter()
            .map(|attribute| {
                EncodingTable::fit(
                    attribute,
                    records.iter().map(|record| raw_value(record, attribute)),
                )
            })
            .collect();
        Self { tables }
    }

    pub fn table(&self, attribute: CategoricalAttribute) -> &EncodingTable {
        &self.tables[attribute.index()]
    }

    pub fn apply<S: FeatureSource>(&self, record: &S) -> EncodedRecord {
        let mut vector = [0.0; FEATURE_COUNT];
        let mut lookups = [CategoryLookup::Fallback(FALLBACK_CODE); 5];

        for attribute in CategoricalAttribute::ALL {
            let lookup = self.table(attribute).lookup(raw_value(record, attribute));
            vector[attribute.index()] = f64::from(lookup.code());
            lookups[attribute.index()] = lookup;
        }

        let numeric = record.numeric_values().to_array();
        vector[NUMERIC_OFFSET..].copy_from_slice(&numeric);

        EncodedRecord { vector, lookups }
    }

    pub fn encode_all<S: FeatureSource>(&self, records: &[S]) -> Vec<FeatureVector> {
        records.iter().map(|record| self.apply(record).vector).collect()
    }
}

fn raw_value<S: FeatureSource>(record: &S, attribute: CategoricalAttribute) -> &str {
    record
        .categorical_value(attribute)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(MISSING_CATEGORY)
}
