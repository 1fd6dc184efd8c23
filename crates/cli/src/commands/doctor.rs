use pricelab_core::config::{AppConfig, LoadOptions};
use pricelab_core::synthetic::generate_transactions;
use pricelab_core::{PriceGrid, PricingEngine, ProductContext};
use serde::Serialize;

const SMOKE_ROWS: usize = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });

            let mut engine = PricingEngine::new(config.training.clone());
            let training = check_training(&mut engine, config.training.seed);
            let trained = training.status == CheckStatus::Pass;
            checks.push(training);

            if trained {
                checks.push(check_simulation(&engine, &config));
            } else {
                checks.push(DoctorCheck::skipped("simulation_smoke", "training did not succeed"));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck::skipped("training_smoke", "configuration did not load"));
            checks.push(DoctorCheck::skipped("simulation_smoke", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_training(engine: &mut PricingEngine, seed: u64) -> DoctorCheck {
    let records = generate_transactions(SMOKE_ROWS, seed);
    match engine.train(&records) {
        Ok(report) => DoctorCheck {
            name: "training_smoke",
            status: CheckStatus::Pass,
            details: format!(
                "trained on {} synthetic records (demand r2 {:.3}, return accuracy {:.3})",
                report.records, report.demand.r2, report.return_risk.accuracy
            ),
        },
        Err(error) => DoctorCheck {
            name: "training_smoke",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_simulation(engine: &PricingEngine, config: &AppConfig) -> DoctorCheck {
    let result = ProductContext::builder()
        .brand("Zara")
        .category("Dresses")
        .season("Summer")
        .size("M")
        .color("Black")
        .markdown_percentage(0.0)
        .original_price(100.0)
        .build()
        .and_then(|context| {
            let grid = PriceGrid::markdown_sweep(
                context.original_price(),
                config.simulation.grid_lower_fraction,
                config.simulation.grid_steps,
            )?;
            engine.optimize(&context, &grid)
        });

    match result {
        Ok(outcome) => DoctorCheck {
            name: "simulation_smoke",
            status: CheckStatus::Pass,
            details: format!(
                "swept {} prices, optimum {:.2}",
                outcome.curve.len(),
                outcome.best.price
            ),
        },
        Err(error) => DoctorCheck {
            name: "simulation_smoke",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
