//! Gross development value from a unit-mix schedule.
//!
//! Aggregates per-mix achieved rates (taken from comparable evidence) into a
//! blended £/sqft and total scheme value. The invariant consumers rely on:
//! `gdv_per_unit × total_units == total_gdv`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PropdevError;
use crate::types::{with_metadata, Area, ComputationOutput, Money};
use crate::PropdevResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One line of the unit-mix schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMixEntry {
    /// Mix label (e.g. "1-bed", "2-bed duplex")
    pub label: String,
    /// Number of units of this type
    pub count: u32,
    /// Net saleable area per unit (sqft)
    pub area_sqft: Area,
    /// Achieved rate from comparable evidence (£/sqft)
    pub value_psf: Money,
}

/// Input for a GDV schedule computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdvInput {
    /// Scheme identifier
    pub scheme_name: String,
    /// Unit-mix schedule
    pub units: Vec<UnitMixEntry>,
}

/// Valued line of the schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMixValue {
    /// Mix label
    pub label: String,
    /// Number of units of this type
    pub count: u32,
    /// Value of a single unit (area × rate)
    pub unit_value: Money,
    /// Aggregate value across the mix (count × unit value)
    pub aggregate_value: Money,
}

/// Complete GDV schedule output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdvOutput {
    /// Valued schedule, one line per mix
    pub schedule: Vec<UnitMixValue>,
    /// Total unit count
    pub total_units: u32,
    /// Total net saleable area (sqft)
    pub total_area_sqft: Area,
    /// Gross development value
    pub total_gdv: Money,
    /// Blended rate: total GDV / total area
    pub blended_psf: Money,
    /// Average value per unit: total GDV / total units
    pub gdv_per_unit: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build a GDV schedule from a unit mix and comparable-derived rates.
pub fn build_gdv_schedule(input: &GdvInput) -> PropdevResult<ComputationOutput<GdvOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input, &mut warnings)?;

    let mut schedule = Vec::with_capacity(input.units.len());
    let mut total_units: u32 = 0;
    let mut total_area_sqft = Decimal::ZERO;
    let mut total_gdv = Decimal::ZERO;

    for entry in &input.units {
        let count_dec = Decimal::from(entry.count);
        let unit_value = entry.area_sqft * entry.value_psf;
        let aggregate_value = unit_value * count_dec;

        total_units += entry.count;
        total_area_sqft += entry.area_sqft * count_dec;
        total_gdv += aggregate_value;

        schedule.push(UnitMixValue {
            label: entry.label.clone(),
            count: entry.count,
            unit_value,
            aggregate_value,
        });
    }

    if total_area_sqft.is_zero() {
        return Err(PropdevError::DivisionByZero {
            context: "blended rate (GDV / total area)".into(),
        });
    }

    let blended_psf = total_gdv / total_area_sqft;
    let gdv_per_unit = total_gdv / Decimal::from(total_units);

    let output = GdvOutput {
        schedule,
        total_units,
        total_area_sqft,
        total_gdv,
        blended_psf,
        gdv_per_unit,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "GDV Schedule (Comparable Unit Mix)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &GdvInput, warnings: &mut Vec<String>) -> PropdevResult<()> {
    if input.units.is_empty() {
        return Err(PropdevError::InsufficientData(
            "At least one unit-mix entry is required".into(),
        ));
    }

    for (i, entry) in input.units.iter().enumerate() {
        if entry.count == 0 {
            return Err(PropdevError::InvalidInput {
                field: format!("units[{i}].count"),
                reason: "Unit count must be positive".into(),
            });
        }
        if entry.area_sqft <= Decimal::ZERO {
            return Err(PropdevError::InvalidInput {
                field: format!("units[{i}].area_sqft"),
                reason: "Unit area must be positive".into(),
            });
        }
        if entry.value_psf <= Decimal::ZERO {
            return Err(PropdevError::InvalidInput {
                field: format!("units[{i}].value_psf"),
                reason: "Achieved rate must be positive".into(),
            });
        }
    }

    let min_psf = input
        .units
        .iter()
        .map(|u| u.value_psf)
        .fold(input.units[0].value_psf, |a, b| a.min(b));
    let max_psf = input
        .units
        .iter()
        .map(|u| u.value_psf)
        .fold(input.units[0].value_psf, |a, b| a.max(b));

    if min_psf > Decimal::ZERO && max_psf / min_psf > dec!(2) {
        warnings.push(format!(
            "Rate spread across the mix exceeds 2× (£{min_psf} to £{max_psf}/sqft) — \
             check comparable selection"
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> GdvInput {
        GdvInput {
            scheme_name: "Mill conversion".into(),
            units: vec![
                UnitMixEntry {
                    label: "1-bed".into(),
                    count: 6,
                    area_sqft: dec!(550),
                    value_psf: dec!(700),
                },
                UnitMixEntry {
                    label: "2-bed".into(),
                    count: 4,
                    area_sqft: dec!(750),
                    value_psf: dec!(680),
                },
            ],
        }
    }

    #[test]
    fn test_schedule_totals() {
        let result = build_gdv_schedule(&sample_input()).unwrap();
        let out = &result.result;

        // 1-bed: 550 × 700 = 385,000/unit, 6 units = 2,310,000
        // 2-bed: 750 × 680 = 510,000/unit, 4 units = 2,040,000
        assert_eq!(out.schedule[0].unit_value, dec!(385000));
        assert_eq!(out.schedule[0].aggregate_value, dec!(2310000));
        assert_eq!(out.schedule[1].aggregate_value, dec!(2040000));

        assert_eq!(out.total_units, 10);
        // 6 × 550 + 4 × 750 = 6300 sqft
        assert_eq!(out.total_area_sqft, dec!(6300));
        assert_eq!(out.total_gdv, dec!(4350000));
    }

    #[test]
    fn test_blended_psf() {
        let result = build_gdv_schedule(&sample_input()).unwrap();
        let out = &result.result;

        // 4,350,000 / 6,300 ≈ 690.476
        let expected = dec!(4350000) / dec!(6300);
        assert_eq!(out.blended_psf, expected);
    }

    #[test]
    fn test_gdv_per_unit_invariant() {
        let result = build_gdv_schedule(&sample_input()).unwrap();
        let out = &result.result;

        assert_eq!(out.gdv_per_unit, dec!(435000));
        // gdv_per_unit × total_units reconstructs total GDV
        assert_eq!(
            out.gdv_per_unit * Decimal::from(out.total_units),
            out.total_gdv
        );
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let input = GdvInput {
            scheme_name: "Empty".into(),
            units: vec![],
        };
        let result = build_gdv_schedule(&input);
        assert!(matches!(
            result.unwrap_err(),
            PropdevError::InsufficientData(_)
        ));
    }

    #[test]
    fn test_zero_count_rejected() {
        let mut input = sample_input();
        input.units[1].count = 0;
        assert!(build_gdv_schedule(&input).is_err());
    }

    #[test]
    fn test_zero_area_rejected() {
        let mut input = sample_input();
        input.units[0].area_sqft = Decimal::ZERO;
        assert!(build_gdv_schedule(&input).is_err());
    }

    #[test]
    fn test_rate_spread_warning() {
        let mut input = sample_input();
        input.units[0].value_psf = dec!(400);
        input.units[1].value_psf = dec!(900);
        let result = build_gdv_schedule(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("spread")));
    }

    #[test]
    fn test_no_spread_warning_within_band() {
        let result = build_gdv_schedule(&sample_input()).unwrap();
        assert!(result.warnings.is_empty());
    }
}
