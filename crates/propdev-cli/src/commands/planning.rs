use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use propdev_core::planning::pd_route::{self, PdRouteInput};

use crate::input;

/// Arguments for permitted development route appraisal
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PdRouteArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Scheme name
    #[arg(long)]
    pub scheme_name: Option<String>,

    /// Gross internal area in square metres
    #[arg(long, alias = "gia")]
    pub gia_sqm: Option<Decimal>,

    /// Achievable sale value per square foot
    #[arg(long, alias = "psf")]
    pub market_psf: Option<Decimal>,

    /// Site sits in an Article 4 direction area
    #[arg(long, default_value_t = false)]
    pub article_four: bool,

    /// Intended unit count
    #[arg(long, alias = "units")]
    pub target_units: Option<u32>,

    /// Heritage or conservation-area constraint applies
    #[arg(long, default_value_t = false)]
    pub heritage_constraint: bool,
}

pub fn run_pd_route(args: PdRouteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pd_input: PdRouteInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PdRouteInput {
            scheme_name: args
                .scheme_name
                .ok_or("--scheme-name is required (or provide --input)")?,
            gia_sqm: args
                .gia_sqm
                .ok_or("--gia-sqm is required (or provide --input)")?,
            market_psf: args
                .market_psf
                .ok_or("--market-psf is required (or provide --input)")?,
            article_four: args.article_four,
            target_units: args
                .target_units
                .ok_or("--target-units is required (or provide --input)")?,
            heritage_constraint: args.heritage_constraint,
        }
    };

    let result = pd_route::appraise_pd_route(&pd_input)?;
    Ok(serde_json::to_value(result)?)
}
