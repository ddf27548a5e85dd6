use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use propdev_core::finance::structuring::{self, FinanceStructureInput};

use crate::input;

/// Arguments for development finance structuring
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct FinanceArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Scheme name
    #[arg(long)]
    pub scheme_name: Option<String>,

    /// Site purchase price
    #[arg(long)]
    pub purchase_price: Option<Decimal>,

    /// All-in build cost
    #[arg(long)]
    pub build_cost: Option<Decimal>,

    /// Gross development value
    #[arg(long)]
    pub gdv: Option<Decimal>,

    /// Target loan-to-cost as a fraction (e.g. 0.65)
    #[arg(long, alias = "ltc")]
    pub target_ltc: Option<Decimal>,

    /// Facility term in months
    #[arg(long, alias = "term")]
    pub term_months: Option<u32>,

    /// Layer a mezzanine tranche above the senior facility
    #[arg(long, default_value_t = false)]
    pub require_mezzanine: bool,
}

pub fn run_finance(args: FinanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let finance_input: FinanceStructureInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        FinanceStructureInput {
            scheme_name: args
                .scheme_name
                .ok_or("--scheme-name is required (or provide --input)")?,
            purchase_price: args
                .purchase_price
                .ok_or("--purchase-price is required (or provide --input)")?,
            build_cost: args
                .build_cost
                .ok_or("--build-cost is required (or provide --input)")?,
            gdv: args.gdv.ok_or("--gdv is required (or provide --input)")?,
            target_ltc: args
                .target_ltc
                .ok_or("--target-ltc is required (or provide --input)")?,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
            require_mezzanine: args.require_mezzanine,
        }
    };

    let result = structuring::structure_finance(&finance_input)?;
    Ok(serde_json::to_value(result)?)
}
