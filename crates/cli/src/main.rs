//! Body Fat Estimator CLI
//!
//! Talks to a running estimator service (predict, chat, health, reload) and
//! runs the offline pieces locally (BMI, local prediction, retraining).

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{bmi, chat, health, predict, train};
use std::path::PathBuf;

/// Body Fat Estimator CLI
#[derive(Parser)]
#[command(name = "bfe")]
#[command(author, version, about = "CLI for the Body Fat Estimator", long_about = None)]
pub struct Cli {
    /// Service URL (can also be set via BFE_API_URL env var)
    #[arg(long, env = "BFE_API_URL", default_value = "http://127.0.0.1:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate body fat and BMI from measurements
    Predict {
        #[command(flatten)]
        measurements: Measurements,

        /// Predict with the cached artifacts instead of calling the service
        #[arg(long)]
        local: bool,

        /// Artifact directory used with --local
        #[arg(long, default_value = ".")]
        artifact_dir: PathBuf,
    },

    /// Ask the nutrition and fitness assistant
    Chat {
        /// Question to send
        message: String,
    },

    /// Show service health and readiness
    Health,

    /// Compute BMI locally
    Bmi {
        /// Weight in kilograms
        #[arg(long)]
        weight: f64,

        /// Height in centimetres
        #[arg(long)]
        height_cm: f64,
    },

    /// Retrain the model offline and overwrite the cached artifacts
    Train {
        /// CSV dataset with a BodyFat column
        #[arg(long, default_value = "bodyfat.csv")]
        dataset: PathBuf,

        /// Directory to write the artifacts to
        #[arg(long, default_value = ".")]
        artifact_dir: PathBuf,

        /// Number of trees in the forest
        #[arg(long, default_value_t = 200)]
        trees: usize,
    },

    /// Ask the running service to retrain and swap in a new model
    Reload,
}

/// Anthropometric measurements; omitted ones default to 0
#[derive(Args, Debug, Default)]
pub struct Measurements {
    /// Age in years
    #[arg(long)]
    pub age: Option<f64>,

    /// Weight in kilograms
    #[arg(long)]
    pub weight: Option<f64>,

    /// Height in centimetres
    #[arg(long, conflicts_with = "height_in")]
    pub height_cm: Option<f64>,

    /// Height in inches (converted to centimetres)
    #[arg(long)]
    pub height_in: Option<f64>,

    /// Abdomen circumference in cm
    #[arg(long)]
    pub abdomen: Option<f64>,

    /// Neck circumference in cm
    #[arg(long)]
    pub neck: Option<f64>,

    /// Chest circumference in cm
    #[arg(long)]
    pub chest: Option<f64>,

    /// Hip circumference in cm
    #[arg(long)]
    pub hip: Option<f64>,

    /// Thigh circumference in cm
    #[arg(long)]
    pub thigh: Option<f64>,

    /// Biceps circumference in cm
    #[arg(long)]
    pub biceps: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            measurements,
            local,
            artifact_dir,
        } => {
            if local {
                predict::predict_local(&measurements, &artifact_dir, cli.format)?;
            } else {
                let client = client::ApiClient::new(&cli.api_url)?;
                predict::predict_remote(&client, &measurements, cli.format).await?;
            }
        }
        Commands::Chat { message } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            chat::ask(&client, &message, cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&cli.api_url)?;
            health::show_health(&client, cli.format).await?;
        }
        Commands::Bmi { weight, height_cm } => {
            bmi::show_bmi(weight, height_cm, cli.format)?;
        }
        Commands::Train {
            dataset,
            artifact_dir,
            trees,
        } => {
            train::retrain(&dataset, &artifact_dir, trees, cli.verbose, cli.format)?;
        }
        Commands::Reload => {
            let client = client::ApiClient::new(&cli.api_url)?;
            train::reload_remote(&client, cli.format).await?;
        }
    }

    Ok(())
}
