//! CLI for the tax regime comparison engine.
//!
//! Reads a `TaxInput` record as JSON (file or stdin), runs the comparison
//! pipeline and prints the resulting `ComparisonResult` JSON. The `offline`
//! subcommand skips the generation backend entirely; `prompt` renders the
//! instruction prompt for inspection.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use tributo_radar::core::model::deterministic_result;
use tributo_radar::core::types::TaxInput;
use tributo_radar::io::config::load_config;
use tributo_radar::io::generator::CommandGenerator;
use tributo_radar::io::prompt::{PromptVariant, build_prompt};
use tributo_radar::logging;
use tributo_radar::orchestrator::compute_comparison;

#[derive(Parser)]
#[command(
    name = "radar",
    version,
    about = "Simples Nacional vs IBS/CBS comparison engine"
)]
struct Cli {
    /// Path to the TOML configuration (defaults apply when missing).
    #[arg(long, global = true, default_value = "radar.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: generation with retries, fallback on exhaustion.
    Compare {
        /// Input JSON file; reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Deterministic arithmetic path only, no generation backend.
    Offline {
        /// Input JSON file; reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Render the instruction prompt without calling the backend.
    Prompt {
        /// Input JSON file; reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Override the configured prompt variant.
        #[arg(long, value_enum)]
        variant: Option<PromptVariant>,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Compare { input } => {
            let input = read_input(input.as_deref())?;
            let generator = CommandGenerator::from_config(&config.generator);
            let result = compute_comparison(&input, &generator, &config);
            print_json(&result)
        }
        Command::Offline { input } => {
            let input = read_input(input.as_deref())?;
            let result = deterministic_result(&input, &config.rates);
            print_json(&result)
        }
        Command::Prompt { input, variant } => {
            let input = read_input(input.as_deref())?;
            let variant = variant.unwrap_or(config.prompt.variant);
            println!("{}", build_prompt(variant, &input, &config.rates));
            Ok(())
        }
    }
}

/// Read and validate the input record from a file or stdin.
fn read_input(path: Option<&Path>) -> Result<TaxInput> {
    let contents = match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read input from stdin")?;
            buf
        }
    };
    let input: TaxInput = serde_json::from_str(&contents).context("parse input json")?;
    validate_input(&input)?;
    Ok(input)
}

/// Boundary checks the core relies on the caller for.
fn validate_input(input: &TaxInput) -> Result<()> {
    if !(input.monthly_revenue.is_finite() && input.monthly_revenue > 0.0) {
        bail!("monthlyRevenue must be a positive number");
    }
    for (name, value) in [
        ("monthlyPurchases", input.monthly_purchases),
        ("payroll", input.payroll),
        ("otherInputs", input.other_inputs),
        ("accumulatedRevenue", input.accumulated_revenue),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            bail!("{name} must be a non-negative number");
        }
    }
    if !(1..=5).contains(&input.simples_annex) {
        bail!("simplesAnnex must be within 1..=5");
    }
    if let Some(rate) = input.custom_simples_rate
        && !(rate.is_finite() && rate > 0.0 && rate < 100.0)
    {
        bail!("customSimplesRate must be within (0, 100)");
    }
    Ok(())
}

/// Serialize to pretty-printed JSON with trailing newline.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize result json")?;
    println!("{payload}");
    Ok(())
}
