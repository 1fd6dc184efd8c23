use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pricelab_core::config::{interpolate_env_vars, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let training = &config.training;
    let simulation = &config.simulation;

    let entries = [
        entry("training.seed", training.seed, &["PRICELAB_TRAINING_SEED"]),
        entry(
            "training.holdout_fraction",
            training.holdout_fraction,
            &["PRICELAB_TRAINING_HOLDOUT_FRACTION"],
        ),
        entry("training.ridge_lambda", training.ridge_lambda, &["PRICELAB_TRAINING_RIDGE_LAMBDA"]),
        entry("training.demand_floor", training.demand_floor, &["PRICELAB_TRAINING_DEMAND_FLOOR"]),
        entry(
            "training.boosting_rounds",
            training.boosting_rounds,
            &["PRICELAB_TRAINING_BOOSTING_ROUNDS"],
        ),
        entry(
            "training.boosting_learning_rate",
            training.boosting_learning_rate,
            &["PRICELAB_TRAINING_BOOSTING_LEARNING_RATE"],
        ),
        entry(
            "training.tree_max_depth",
            training.tree_max_depth,
            &["PRICELAB_TRAINING_TREE_MAX_DEPTH"],
        ),
        entry(
            "training.tree_min_samples_leaf",
            training.tree_min_samples_leaf,
            &["PRICELAB_TRAINING_TREE_MIN_SAMPLES_LEAF"],
        ),
        entry(
            "training.logistic_learning_rate",
            training.logistic_learning_rate,
            &["PRICELAB_TRAINING_LOGISTIC_LEARNING_RATE"],
        ),
        entry(
            "training.logistic_epochs",
            training.logistic_epochs,
            &["PRICELAB_TRAINING_LOGISTIC_EPOCHS"],
        ),
        entry("training.logistic_l2", training.logistic_l2, &["PRICELAB_TRAINING_LOGISTIC_L2"]),
        entry(
            "simulation.grid_lower_fraction",
            simulation.grid_lower_fraction,
            &["PRICELAB_SIMULATION_GRID_LOWER_FRACTION"],
        ),
        entry("simulation.grid_steps", simulation.grid_steps, &["PRICELAB_SIMULATION_GRID_STEPS"]),
        entry(
            "logging.level",
            &config.logging.level,
            &["PRICELAB_LOGGING_LEVEL", "PRICELAB_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["PRICELAB_LOGGING_FORMAT", "PRICELAB_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in entries {
        let source = field_source(
            key_path,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn entry(
    key_path: &'static str,
    value: impl ToString,
    env_keys: &'static [&'static str],
) -> (&'static str, String, &'static [&'static str]) {
    (key_path, value.to_string(), env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    ["pricelab.toml", "config/pricelab.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    interpolate_env_vars(&raw).ok()?.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
