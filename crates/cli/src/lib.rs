pub mod commands;

use clap::{Parser, Subcommand};
use pricelab_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use commands::optimize::OptimizeArgs;
use commands::train::{TrainArgs, DEFAULT_ROWS};

#[derive(Debug, Parser)]
#[command(
    name = "pricelab",
    about = "Pricelab markdown pricing CLI",
    long_about = "Train demand and return-risk models on synthetic sales history, then sweep candidate prices for a product.",
    after_help = "Examples:\n  pricelab train --rows 2500\n  pricelab optimize --brand Zara --category Dresses --season Summer --base-price 100\n  pricelab doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Generate synthetic history, train both models, and report holdout metrics")]
    Train {
        #[arg(long, default_value_t = DEFAULT_ROWS, help = "Number of synthetic transactions")]
        rows: usize,
        #[arg(long, help = "Seed for generation and holdout split")]
        seed: Option<u64>,
    },
    #[command(about = "Simulate a markdown price sweep and pick the best risk-adjusted price")]
    Optimize {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        season: String,
        #[arg(long, default_value = "M")]
        size: String,
        #[arg(long, default_value = "Black")]
        color: String,
        #[arg(long, help = "Reference (original) price for the sweep")]
        base_price: f64,
        #[arg(long, default_value_t = 0.0, help = "Markdown fraction carried by the product")]
        markdown: f64,
        #[arg(long, help = "Number of grid points")]
        steps: Option<usize>,
        #[arg(long, help = "Lowest grid price as a fraction of the base price")]
        lower_fraction: Option<f64>,
        #[arg(long, default_value_t = DEFAULT_ROWS, help = "Number of synthetic transactions")]
        rows: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    #[command(about = "Validate config and run training and simulation smoke checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let overrides = ConfigOverrides { log_level: cli.log_level.clone(), ..Default::default() };
    let logging = AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Train { rows, seed } => commands::train::run(TrainArgs { rows, seed }),
        Command::Optimize {
            brand,
            category,
            season,
            size,
            color,
            base_price,
            markdown,
            steps,
            lower_fraction,
            rows,
            seed,
        } => commands::optimize::run(OptimizeArgs {
            brand,
            category,
            season,
            size: Some(size),
            color,
            base_price,
            markdown,
            steps,
            lower_fraction,
            rows,
            seed,
        }),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    tracing::debug!(
        event_name = "cli.command.completed",
        exit_code = result.exit_code,
        "command finished"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command payloads on stdout stay parseable.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
