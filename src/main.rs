//! Calorie Predictor - Main Entry Point
//!
//! Reads one workout as a JSON object argument, runs the calorie model and
//! prints the prediction on stdout. Logs go to stderr.
//!
//! The prediction is the `Display` of an `f32`, so a whole number prints as `231`, not `231.0`.

use anyhow::Result;
use calorie_predictor::{config::LoggingConfig, AppConfig, Predictor};
use clap::Parser;
use std::io::Write;
use tracing::{debug, info};

/// Predict calories burned from a workout description
#[derive(Parser, Debug)]
#[command(name = "calorie-predictor", version, about)]
struct Cli {
    /// Workout as a JSON object with numeric keys Gender, Age, Height,
    /// Weight, Duration, Heart_Rate and Body_Temp
    input: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config.logging)?;
    debug!(model_path = %config.model.path.display(), format = ?config.model.format, "Configuration loaded");

    let predictor = Predictor::new(config);
    let prediction = predictor.predict_json(&cli.input)?;
    info!(prediction = prediction, "Prediction complete");

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", prediction)?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("calorie_predictor={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
