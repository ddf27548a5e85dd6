use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use propdev_core::costing::build_cost::{self, BuildCostInput};

use crate::input;

/// Arguments for the build cost plan
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct BuildCostArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Scheme name
    #[arg(long)]
    pub scheme_name: Option<String>,

    /// Gross internal area in square metres
    #[arg(long, alias = "gia")]
    pub gia_sqm: Option<Decimal>,

    /// Base construction rate per square metre
    #[arg(long, alias = "rate")]
    pub base_cost_per_sqm: Option<Decimal>,

    /// Contingency as a fraction of construction cost (e.g. 0.05)
    #[arg(long)]
    pub contingency_pct: Option<Decimal>,

    /// Professional fees as a fraction of construction cost (e.g. 0.10)
    #[arg(long, alias = "fees")]
    pub professional_fees_pct: Option<Decimal>,
}

pub fn run_build_cost(args: BuildCostArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cost_input: BuildCostInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        BuildCostInput {
            scheme_name: args
                .scheme_name
                .ok_or("--scheme-name is required (or provide --input)")?,
            gia_sqm: args
                .gia_sqm
                .ok_or("--gia-sqm is required (or provide --input)")?,
            base_cost_per_sqm: args
                .base_cost_per_sqm
                .ok_or("--base-cost-per-sqm is required (or provide --input)")?,
            contingency_pct: args
                .contingency_pct
                .ok_or("--contingency-pct is required (or provide --input)")?,
            professional_fees_pct: args
                .professional_fees_pct
                .ok_or("--professional-fees-pct is required (or provide --input)")?,
        }
    };

    let result = build_cost::build_cost_plan(&cost_input)?;
    Ok(serde_json::to_value(result)?)
}
