mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::costing::BuildCostArgs;
use commands::finance::FinanceArgs;
use commands::planning::PdRouteArgs;
use commands::valuation::GdvArgs;

/// UK property development appraisal calculations
#[derive(Parser)]
#[command(
    name = "pda",
    version,
    about = "UK property development appraisal calculations",
    long_about = "A CLI for appraising UK property development opportunities with \
                  decimal precision. Supports permitted development route appraisal, \
                  gross development value schedules, build cost plans, and senior/\
                  mezzanine development finance structuring."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Appraise a permitted development (Class MA) conversion
    PdRoute(PdRouteArgs),
    /// Build a gross development value schedule from a unit mix
    Gdv(GdvArgs),
    /// Build a construction cost plan
    BuildCost(BuildCostArgs),
    /// Structure senior and mezzanine development finance
    Finance(FinanceArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::PdRoute(args) => commands::planning::run_pd_route(args),
        Commands::Gdv(args) => commands::valuation::run_gdv(args),
        Commands::BuildCost(args) => commands::costing::run_build_cost(args),
        Commands::Finance(args) => commands::finance::run_finance(args),
        Commands::Version => {
            println!("pda {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
