use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use propdev_core::valuation::gdv::{self, GdvInput, UnitMixEntry};

use crate::input;

/// Arguments for the gross development value schedule
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct GdvArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Scheme name
    #[arg(long)]
    pub scheme_name: Option<String>,

    /// Unit mix entry as label:count:area_sqft:value_psf (repeatable)
    #[arg(long = "unit")]
    pub units: Vec<String>,
}

pub fn run_gdv(args: GdvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let gdv_input: GdvInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        if args.units.is_empty() {
            return Err("at least one --unit is required (or provide --input)".into());
        }
        GdvInput {
            scheme_name: args
                .scheme_name
                .ok_or("--scheme-name is required (or provide --input)")?,
            units: args
                .units
                .iter()
                .map(|spec| parse_unit(spec))
                .collect::<Result<Vec<_>, _>>()?,
        }
    };

    let result = gdv::build_gdv_schedule(&gdv_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Parse one "label:count:area_sqft:value_psf" spec.
fn parse_unit(spec: &str) -> Result<UnitMixEntry, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "invalid --unit '{spec}': expected label:count:area_sqft:value_psf"
        )
        .into());
    }
    Ok(UnitMixEntry {
        label: parts[0].to_string(),
        count: parts[1]
            .parse::<u32>()
            .map_err(|e| format!("invalid count in --unit '{spec}': {e}"))?,
        area_sqft: Decimal::from_str(parts[2])
            .map_err(|e| format!("invalid area in --unit '{spec}': {e}"))?,
        value_psf: Decimal::from_str(parts[3])
            .map_err(|e| format!("invalid value in --unit '{spec}': {e}"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_unit_spec() {
        let entry = parse_unit("1-bed:6:550:625.50").unwrap();
        assert_eq!(entry.label, "1-bed");
        assert_eq!(entry.count, 6);
        assert_eq!(entry.area_sqft, dec!(550));
        assert_eq!(entry.value_psf, dec!(625.50));
    }

    #[test]
    fn test_parse_unit_rejects_short_spec() {
        assert!(parse_unit("1-bed:6:550").is_err());
    }

    #[test]
    fn test_parse_unit_rejects_bad_number() {
        assert!(parse_unit("1-bed:six:550:625").is_err());
    }
}
