//! Build cost plan from a base construction rate.
//!
//! Construction cost is GIA × a caller-supplied rate (regional and
//! specification adjustments are priced into the rate by the caller);
//! contingency and professional fees are each applied to the construction
//! figure and layered on top.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PropdevError;
use crate::types::{with_metadata, Area, ComputationOutput, Money, Rate};
use crate::PropdevResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a build cost plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCostInput {
    /// Scheme identifier
    pub scheme_name: String,
    /// Gross internal area in square metres
    pub gia_sqm: Area,
    /// Base construction rate (£/sqm), regional and spec adjusted
    pub base_cost_per_sqm: Money,
    /// Contingency allowance on construction (e.g. 0.05 = 5%)
    pub contingency_pct: Rate,
    /// Professional fees on construction (e.g. 0.10 = 10%)
    pub professional_fees_pct: Rate,
}

/// Complete build cost plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCostOutput {
    /// GIA × base rate
    pub construction_cost: Money,
    /// Contingency allowance
    pub contingency: Money,
    /// Professional fees (architect, engineer, QS, planning)
    pub professional_fees: Money,
    /// Construction + contingency + fees
    pub total_cost: Money,
    /// Total cost spread back over the GIA (£/sqm)
    pub all_in_cost_per_sqm: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the cost plan for a scheme.
pub fn build_cost_plan(
    input: &BuildCostInput,
) -> PropdevResult<ComputationOutput<BuildCostOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input, &mut warnings)?;

    let construction_cost = input.gia_sqm * input.base_cost_per_sqm;
    let contingency = construction_cost * input.contingency_pct;
    let professional_fees = construction_cost * input.professional_fees_pct;
    let total_cost = construction_cost + contingency + professional_fees;
    let all_in_cost_per_sqm = total_cost / input.gia_sqm;

    let output = BuildCostOutput {
        construction_cost,
        contingency,
        professional_fees,
        total_cost,
        all_in_cost_per_sqm,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Build Cost Plan (Rate × Area)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &BuildCostInput, warnings: &mut Vec<String>) -> PropdevResult<()> {
    if input.gia_sqm <= Decimal::ZERO {
        return Err(PropdevError::InvalidInput {
            field: "gia_sqm".into(),
            reason: "Gross internal area must be positive".into(),
        });
    }

    if input.base_cost_per_sqm <= Decimal::ZERO {
        return Err(PropdevError::InvalidInput {
            field: "base_cost_per_sqm".into(),
            reason: "Base construction rate must be positive".into(),
        });
    }

    if input.contingency_pct < Decimal::ZERO || input.contingency_pct >= Decimal::ONE {
        return Err(PropdevError::InvalidInput {
            field: "contingency_pct".into(),
            reason: "Contingency must be between 0 and 1 (exclusive upper)".into(),
        });
    }

    if input.professional_fees_pct < Decimal::ZERO || input.professional_fees_pct >= Decimal::ONE {
        return Err(PropdevError::InvalidInput {
            field: "professional_fees_pct".into(),
            reason: "Professional fees must be between 0 and 1 (exclusive upper)".into(),
        });
    }

    if input.contingency_pct < dec!(0.03) {
        warnings.push(format!(
            "Contingency of {:.1}% is below 3% — thin for a conversion scheme",
            input.contingency_pct * dec!(100)
        ));
    }

    if input.base_cost_per_sqm < dec!(1200) {
        warnings.push(format!(
            "Base rate £{}/sqm is below £1,200 — verify against current tender prices",
            input.base_cost_per_sqm
        ));
    }

    if input.base_cost_per_sqm > dec!(3500) {
        warnings.push(format!(
            "Base rate £{}/sqm exceeds £3,500 — premium specification assumed",
            input.base_cost_per_sqm
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

    fn sample_input() -> BuildCostInput {
        BuildCostInput {
            scheme_name: "Warehouse block B".into(),
            gia_sqm: dec!(1000),
            base_cost_per_sqm: dec!(1800),
            contingency_pct: dec!(0.05),
            professional_fees_pct: dec!(0.10),
        }
    }

    #[test]
    fn test_cost_layers() {
        let result = build_cost_plan(&sample_input()).unwrap();
        let out = &result.result;

        // Construction: 1000 × 1800 = 1,800,000
        assert_eq!(out.construction_cost, dec!(1800000));
        // Contingency: 5% of construction = 90,000
        assert_eq!(out.contingency, dec!(90000));
        // Fees: 10% of construction = 180,000
        assert_eq!(out.professional_fees, dec!(180000));
        // Total: 2,070,000
        assert_eq!(out.total_cost, dec!(2070000));
    }

    #[test]
    fn test_all_in_rate() {
        let result = build_cost_plan(&sample_input()).unwrap();
        // 2,070,000 / 1000 = 2,070 £/sqm
        assert_eq!(result.result.all_in_cost_per_sqm, dec!(2070));
    }

    #[test]
    fn test_zero_percentages_allowed() {
        let mut input = sample_input();
        input.contingency_pct = Decimal::ZERO;
        input.professional_fees_pct = Decimal::ZERO;
        let result = build_cost_plan(&input).unwrap();
        assert_eq!(result.result.total_cost, result.result.construction_cost);
    }

    #[test]
    fn test_zero_gia_rejected() {
        let mut input = sample_input();
        input.gia_sqm = Decimal::ZERO;
        assert!(build_cost_plan(&input).is_err());
    }

    #[test]
    fn test_contingency_out_of_range_rejected() {
        let mut input = sample_input();
        input.contingency_pct = dec!(1.0);
        assert!(build_cost_plan(&input).is_err());
    }

    #[test]
    fn test_thin_contingency_warning() {
        let mut input = sample_input();
        input.contingency_pct = dec!(0.02);
        let result = build_cost_plan(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("below 3%")));
    }

    #[test]
    fn test_low_base_rate_warning() {
        let mut input = sample_input();
        input.base_cost_per_sqm = dec!(1000);
        let result = build_cost_plan(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("below £1,200")));
    }
}
