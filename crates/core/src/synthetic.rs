//! Seeded fashion-retail transaction generator.
//!
//! Produces a catalog of products and then samples sales against it. Units
//! sold follow a constant-elasticity response to the markdown so the demand
//! model has a real price signal to recover.

use chrono::{Datelike, Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::product::ProductId;
use crate::domain::transaction::TransactionRecord;

pub const BRANDS: [&str; 8] =
    ["Zara", "H&M", "Forever21", "Mango", "Uniqlo", "Gap", "Banana Republic", "Ann Taylor"];
pub const CATEGORIES: [&str; 6] =
    ["Dresses", "Tops", "Bottoms", "Outerwear", "Shoes", "Accessories"];
pub const SEASONS: [&str; 4] = ["Spring", "Summer", "Fall", "Winter"];
pub const SIZES: [&str; 6] = ["XS", "S", "M", "L", "XL", "XXL"];
pub const COLORS: [&str; 11] = [
    "Black", "White", "Navy", "Gray", "Beige", "Red", "Blue", "Green", "Pink", "Brown", "Purple",
];

const CATALOG_SIZE: usize = 300;
const MARKDOWN_SHARE: f64 = 0.4;
const MARKDOWN_STEPS: [f64; 4] = [0.1, 0.2, 0.3, 0.5];
const MISSING_RATING_SHARE: f64 = 0.15;
const MAX_DAY_OFFSET: u64 = 700;

const BASE_UNITS: f64 = 12.0;
const PRICE_ELASTICITY: f64 = 1.8;
const NOISE: f64 = 0.15;

#[derive(Clone, Debug)]
struct CatalogItem {
    product_id: ProductId,
    brand: &'static str,
    category: &'static str,
    original_price: f64,
}

/// Inclusive base price range by category.
pub fn base_price_range(category: &str) -> (f64, f64) {
    match category {
        "Dresses" => (40.0, 150.0),
        "Tops" => (20.0, 80.0),
        "Bottoms" => (30.0, 100.0),
        "Outerwear" => (80.0, 250.0),
        "Shoes" => (50.0, 180.0),
        _ => (15.0, 60.0),
    }
}

pub fn season_for_month(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "Winter",
        3..=5 => "Spring",
        6..=8 => "Summer",
        _ => "Fall",
    }
}

/// Same `rows` and `seed` always produce the same records.
pub fn generate_transactions(rows: usize, seed: u64) -> Vec<TransactionRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let catalog: Vec<CatalogItem> = (0..CATALOG_SIZE).map(|_| catalog_item(&mut rng)).collect();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN);

    (0..rows)
        .map(|_| {
            let item = &catalog[rng.gen_range(0..catalog.len())];
            let offset = rng.gen_range(0..=MAX_DAY_OFFSET);
            let purchase_date = start.checked_add_days(Days::new(offset)).unwrap_or(start);
            let season = season_for_month(purchase_date.month());

            let size = (item.category != "Accessories").then(|| pick(&mut rng, &SIZES).to_string());
            let color = pick(&mut rng, &COLORS).to_string();

            let markdown_percentage =
                if rng.gen_bool(MARKDOWN_SHARE) { pick(&mut rng, &MARKDOWN_STEPS) } else { 0.0 };
            let current_price = round_to(item.original_price * (1.0 - markdown_percentage), 2);

            let rating = (rng.gen::<f64>() > MISSING_RATING_SHARE)
                .then(|| round_to(triangular(&mut rng, 1.0, 4.5, 5.0), 1));
            let is_returned = rng.gen::<f64>() < return_probability(item.category, rating);

            let price_ratio = current_price / item.original_price;
            let noise = rng.gen_range((1.0 - NOISE)..=(1.0 + NOISE));
            let units_sold = (BASE_UNITS
                * price_ratio.powf(-PRICE_ELASTICITY)
                * seasonal_lift(item.category, season)
                * noise)
                .round()
                .max(0.0);

            TransactionRecord {
                product_id: item.product_id.clone(),
                purchase_date,
                brand: item.brand.to_string(),
                category: item.category.to_string(),
                season: season.to_string(),
                size,
                color,
                current_price,
                markdown_percentage,
                original_price: item.original_price,
                units_sold,
                is_returned,
            }
        })
        .collect()
}

fn catalog_item(rng: &mut StdRng) -> CatalogItem {
    let category = pick(rng, &CATEGORIES);
    let brand = pick(rng, &BRANDS);
    let (low, high) = base_price_range(category);
    CatalogItem {
        product_id: ProductId(format!("FB{:06}", rng.gen_range(1..=9999))),
        brand,
        category,
        original_price: round_to(rng.gen_range(low..=high), 2),
    }
}

fn return_probability(category: &str, rating: Option<f64>) -> f64 {
    let mut probability = 0.05;
    if rating.is_some_and(|rating| rating < 3.0) {
        probability += 0.3;
    }
    if matches!(category, "Dresses" | "Shoes") {
        probability += 0.1;
    }
    probability
}

fn seasonal_lift(category: &str, season: &str) -> f64 {
    match (category, season) {
        ("Outerwear", "Winter") | ("Outerwear", "Fall") => 1.4,
        ("Dresses", "Summer") | ("Dresses", "Spring") => 1.25,
        (_, "Winter") => 0.9,
        _ => 1.0,
    }
}

fn pick<T: Copy>(rng: &mut StdRng, values: &[T]) -> T {
    values[rng.gen_range(0..values.len())]
}

/// Inverse-CDF draw from a triangular distribution on `[low, high]` peaking at `mode`.
fn triangular(rng: &mut StdRng, low: f64, mode: f64, high: f64) -> f64 {
    let u: f64 = rng.gen();
    let split = (mode - low) / (high - low);
    if u < split {
        low + (u * (high - low) * (mode - low)).sqrt()
    } else {
        high - ((1.0 - u) * (high - low) * (high - mode)).sqrt()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{base_price_range, generate_transactions, season_for_month, triangular};

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        assert_eq!(generate_transactions(200, 7), generate_transactions(200, 7));
        assert_ne!(generate_transactions(200, 7), generate_transactions(200, 8));
    }

    #[test]
    fn records_are_internally_consistent() {
        let records = generate_transactions(1_000, 42);
        assert_eq!(records.len(), 1_000);

        for record in &records {
            let (low, high) = base_price_range(&record.category);
            assert!(record.original_price >= low && record.original_price <= high);
            let expected = record.original_price * (1.0 - record.markdown_percentage);
            assert!((record.current_price - expected).abs() <= 0.005 + 1e-9);
            assert!(record.units_sold >= 0.0);
            assert_eq!(record.size.is_none(), record.category == "Accessories");
            assert_eq!(record.season, season_for_month(chrono::Datelike::month(&record.purchase_date)));
        }
    }

    #[test]
    fn markdowns_lift_units_and_returns_occur() {
        let records = generate_transactions(2_000, 42);
        let mean = |marked_down: bool| {
            let units: Vec<f64> = records
                .iter()
                .filter(|record| (record.markdown_percentage >= 0.3) == marked_down)
                .map(|record| record.units_sold)
                .collect();
            units.iter().sum::<f64>() / units.len() as f64
        };
        assert!(mean(true) > mean(false));

        let returned = records.iter().filter(|record| record.is_returned).count();
        assert!(returned > 0 && returned < records.len());
    }

    #[test]
    fn triangular_draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let value = triangular(&mut rng, 1.0, 4.5, 5.0);
            assert!((1.0..=5.0).contains(&value));
        }
    }
}
