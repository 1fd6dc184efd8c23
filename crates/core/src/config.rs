use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub training: TrainingConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// Knobs for one training pass of the demand and return-risk models.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingConfig {
    pub seed: u64,
    pub holdout_fraction: f64,
    pub ridge_lambda: f64,
    pub demand_floor: f64,
    pub boosting_rounds: usize,
    pub boosting_learning_rate: f64,
    pub tree_max_depth: usize,
    pub tree_min_samples_leaf: usize,
    pub logistic_learning_rate: f64,
    pub logistic_epochs: usize,
    pub logistic_l2: f64,
}

/// Default sweep policy used by callers that build a markdown grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationConfig {
    pub grid_lower_fraction: f64,
    pub grid_steps: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub seed: Option<u64>,
    pub grid_steps: Option<usize>,
    pub grid_lower_fraction: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            holdout_fraction: 0.2,
            ridge_lambda: 1e-6,
            demand_floor: 1e-6,
            boosting_rounds: 50,
            boosting_learning_rate: 0.1,
            tree_max_depth: 3,
            tree_min_samples_leaf: 5,
            logistic_learning_rate: 0.1,
            logistic_epochs: 1000,
            logistic_l2: 0.01,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { grid_lower_fraction: 0.4, grid_steps: 20 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            training: TrainingConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pricelab.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(training) = patch.training {
            let target = &mut self.training;
            if let Some(seed) = training.seed {
                target.seed = seed;
            }
            if let Some(holdout_fraction) = training.holdout_fraction {
                target.holdout_fraction = holdout_fraction;
            }
            if let Some(ridge_lambda) = training.ridge_lambda {
                target.ridge_lambda = ridge_lambda;
            }
            if let Some(demand_floor) = training.demand_floor {
                target.demand_floor = demand_floor;
            }
            if let Some(boosting_rounds) = training.boosting_rounds {
                target.boosting_rounds = boosting_rounds;
            }
            if let Some(boosting_learning_rate) = training.boosting_learning_rate {
                target.boosting_learning_rate = boosting_learning_rate;
            }
            if let Some(tree_max_depth) = training.tree_max_depth {
                target.tree_max_depth = tree_max_depth;
            }
            if let Some(tree_min_samples_leaf) = training.tree_min_samples_leaf {
                target.tree_min_samples_leaf = tree_min_samples_leaf;
            }
            if let Some(logistic_learning_rate) = training.logistic_learning_rate {
                target.logistic_learning_rate = logistic_learning_rate;
            }
            if let Some(logistic_epochs) = training.logistic_epochs {
                target.logistic_epochs = logistic_epochs;
            }
            if let Some(logistic_l2) = training.logistic_l2 {
                target.logistic_l2 = logistic_l2;
            }
        }

        if let Some(simulation) = patch.simulation {
            if let Some(grid_lower_fraction) = simulation.grid_lower_fraction {
                self.simulation.grid_lower_fraction = grid_lower_fraction;
            }
            if let Some(grid_steps) = simulation.grid_steps {
                self.simulation.grid_steps = grid_steps;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRICELAB_TRAINING_SEED") {
            self.training.seed = parse_env("PRICELAB_TRAINING_SEED", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_HOLDOUT_FRACTION") {
            self.training.holdout_fraction =
                parse_env("PRICELAB_TRAINING_HOLDOUT_FRACTION", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_RIDGE_LAMBDA") {
            self.training.ridge_lambda = parse_env("PRICELAB_TRAINING_RIDGE_LAMBDA", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_DEMAND_FLOOR") {
            self.training.demand_floor = parse_env("PRICELAB_TRAINING_DEMAND_FLOOR", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_BOOSTING_ROUNDS") {
            self.training.boosting_rounds =
                parse_env("PRICELAB_TRAINING_BOOSTING_ROUNDS", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_BOOSTING_LEARNING_RATE") {
            self.training.boosting_learning_rate =
                parse_env("PRICELAB_TRAINING_BOOSTING_LEARNING_RATE", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_TREE_MAX_DEPTH") {
            self.training.tree_max_depth = parse_env("PRICELAB_TRAINING_TREE_MAX_DEPTH", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_TREE_MIN_SAMPLES_LEAF") {
            self.training.tree_min_samples_leaf =
                parse_env("PRICELAB_TRAINING_TREE_MIN_SAMPLES_LEAF", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_LOGISTIC_LEARNING_RATE") {
            self.training.logistic_learning_rate =
                parse_env("PRICELAB_TRAINING_LOGISTIC_LEARNING_RATE", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_LOGISTIC_EPOCHS") {
            self.training.logistic_epochs =
                parse_env("PRICELAB_TRAINING_LOGISTIC_EPOCHS", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_TRAINING_LOGISTIC_L2") {
            self.training.logistic_l2 = parse_env("PRICELAB_TRAINING_LOGISTIC_L2", &value)?;
        }

        if let Some(value) = read_env("PRICELAB_SIMULATION_GRID_LOWER_FRACTION") {
            self.simulation.grid_lower_fraction =
                parse_env("PRICELAB_SIMULATION_GRID_LOWER_FRACTION", &value)?;
        }
        if let Some(value) = read_env("PRICELAB_SIMULATION_GRID_STEPS") {
            self.simulation.grid_steps = parse_env("PRICELAB_SIMULATION_GRID_STEPS", &value)?;
        }

        let log_level =
            read_env("PRICELAB_LOGGING_LEVEL").or_else(|| read_env("PRICELAB_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICELAB_LOGGING_FORMAT").or_else(|| read_env("PRICELAB_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(seed) = overrides.seed {
            self.training.seed = seed;
        }
        if let Some(grid_steps) = overrides.grid_steps {
            self.simulation.grid_steps = grid_steps;
        }
        if let Some(grid_lower_fraction) = overrides.grid_lower_fraction {
            self.simulation.grid_lower_fraction = grid_lower_fraction;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_training(&self.training)?;
        validate_simulation(&self.simulation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pricelab.toml"), PathBuf::from("config/pricelab.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` in `input` with the variable's value.
pub fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_training(training: &TrainingConfig) -> Result<(), ConfigError> {
    if !(0.0..=0.9).contains(&training.holdout_fraction) {
        return Err(ConfigError::Validation(
            "training.holdout_fraction must be in range 0.0..=0.9".to_string(),
        ));
    }

    if !training.ridge_lambda.is_finite() || training.ridge_lambda < 0.0 {
        return Err(ConfigError::Validation(
            "training.ridge_lambda must be a finite non-negative number".to_string(),
        ));
    }

    if !training.demand_floor.is_finite() || training.demand_floor <= 0.0 {
        return Err(ConfigError::Validation(
            "training.demand_floor must be strictly positive so demand never reaches zero"
                .to_string(),
        ));
    }

    if !(training.boosting_learning_rate > 0.0 && training.boosting_learning_rate <= 1.0) {
        return Err(ConfigError::Validation(
            "training.boosting_learning_rate must be in range (0.0, 1.0]".to_string(),
        ));
    }

    if training.tree_max_depth == 0 || training.tree_max_depth > 8 {
        return Err(ConfigError::Validation(
            "training.tree_max_depth must be in range 1..=8".to_string(),
        ));
    }

    if training.tree_min_samples_leaf == 0 {
        return Err(ConfigError::Validation(
            "training.tree_min_samples_leaf must be greater than zero".to_string(),
        ));
    }

    if !training.logistic_learning_rate.is_finite() || training.logistic_learning_rate <= 0.0 {
        return Err(ConfigError::Validation(
            "training.logistic_learning_rate must be greater than zero".to_string(),
        ));
    }

    if training.logistic_epochs == 0 {
        return Err(ConfigError::Validation(
            "training.logistic_epochs must be greater than zero".to_string(),
        ));
    }

    if !training.logistic_l2.is_finite() || training.logistic_l2 < 0.0 {
        return Err(ConfigError::Validation(
            "training.logistic_l2 must be a finite non-negative number".to_string(),
        ));
    }

    Ok(())
}

fn validate_simulation(simulation: &SimulationConfig) -> Result<(), ConfigError> {
    if !(simulation.grid_lower_fraction > 0.0 && simulation.grid_lower_fraction <= 1.0) {
        return Err(ConfigError::Validation(
            "simulation.grid_lower_fraction must be in range (0.0, 1.0]".to_string(),
        ));
    }

    if simulation.grid_steps == 0 || simulation.grid_steps > 1000 {
        return Err(ConfigError::Validation(
            "simulation.grid_steps must be in range 1..=1000".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    training: Option<TrainingPatch>,
    simulation: Option<SimulationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TrainingPatch {
    seed: Option<u64>,
    holdout_fraction: Option<f64>,
    ridge_lambda: Option<f64>,
    demand_floor: Option<f64>,
    boosting_rounds: Option<usize>,
    boosting_learning_rate: Option<f64>,
    tree_max_depth: Option<usize>,
    tree_min_samples_leaf: Option<usize>,
    logistic_learning_rate: Option<f64>,
    logistic_epochs: Option<usize>,
    logistic_l2: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulationPatch {
    grid_lower_fraction: Option<f64>,
    grid_steps: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_a_config_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.training.seed == 42, "default seed should be 42")?;
        ensure(config.simulation.grid_steps == 20, "default grid should have 20 steps")?;
        ensure(
            (config.simulation.grid_lower_fraction - 0.4).abs() < f64::EPSILON,
            "default sweep should start at 40% of the reference price",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PRICELAB_SEED", "7");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pricelab.toml");
            fs::write(
                &path,
                r#"
[training]
seed = ${TEST_PRICELAB_SEED}
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.training.seed == 7, "seed should be interpolated from environment")
        })();

        clear_vars(&["TEST_PRICELAB_SEED"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICELAB_LOG_LEVEL", "warn");
        env::set_var("PRICELAB_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["PRICELAB_LOG_LEVEL", "PRICELAB_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICELAB_TRAINING_SEED", "11");
        env::set_var("PRICELAB_SIMULATION_GRID_STEPS", "30");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pricelab.toml");
            fs::write(
                &path,
                r#"
[training]
seed = 3
boosting_rounds = 10

[simulation]
grid_steps = 12

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    grid_steps: Some(5),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.training.boosting_rounds == 10, "file value should beat default")?;
            ensure(config.training.seed == 11, "env seed should win over file and defaults")?;
            ensure(config.simulation.grid_steps == 5, "override grid steps should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["PRICELAB_TRAINING_SEED", "PRICELAB_SIMULATION_GRID_STEPS"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICELAB_TRAINING_LOGISTIC_EPOCHS", "many");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected env override failure but config load succeeded".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "PRICELAB_TRAINING_LOGISTIC_EPOCHS",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["PRICELAB_TRAINING_LOGISTIC_EPOCHS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICELAB_TRAINING_DEMAND_FLOOR", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("training.demand_floor")
            );
            ensure(has_message, "validation failure should mention training.demand_floor")
        })();

        clear_vars(&["PRICELAB_TRAINING_DEMAND_FLOOR"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail",
        )
    }
}
