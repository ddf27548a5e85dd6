//! Permitted development route appraisal.
//!
//! Sizes a commercial-to-residential conversion under PD rights: gross
//! development value from floor area and an achieved market rate, a baseline
//! conversion build cost, and the senior leverage a lender will typically
//! advance against the scheme. An Article 4 direction withdraws PD rights in
//! the area and pushes the scheme onto the slower full-planning track, which
//! shows up here as a higher build rate and tighter leverage.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PropdevError;
use crate::types::{with_metadata, Area, ComputationOutput, Money, Percent, SQM_TO_SQFT};
use crate::PropdevResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Conversion build rate (£/sqm) where an Article 4 direction applies
const ARTICLE_FOUR_COST_PER_SQM: Decimal = dec!(1950);
/// Conversion build rate (£/sqm) on an unencumbered PD route
const STANDARD_COST_PER_SQM: Decimal = dec!(1780);

/// Base achievable LTC (percentage points) under Article 4
const ARTICLE_FOUR_BASE_LTC: Decimal = dec!(60);
/// Base achievable LTC (percentage points) on a clean PD route
const STANDARD_BASE_LTC: Decimal = dec!(68);
/// LTC uplift for schemes above the unit-count threshold
const SCALE_LTC_UPLIFT: Decimal = dec!(4);
/// Unit count above which the scale uplift applies
const SCALE_UNIT_THRESHOLD: u32 = 12;
/// LTC haircut for heritage-constrained buildings
const HERITAGE_LTC_HAIRCUT: Decimal = dec!(2);
/// Hard ceiling on achievable LTC (percentage points)
const MAX_ACHIEVABLE_LTC: Decimal = dec!(72);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a PD route appraisal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdRouteInput {
    /// Scheme identifier
    pub scheme_name: String,
    /// Gross internal area in square metres
    pub gia_sqm: Area,
    /// Achieved market rate for the completed units (£/sqft)
    pub market_psf: Money,
    /// Whether an Article 4 direction withdraws PD rights for the site
    pub article_four: bool,
    /// Target number of residential units
    pub target_units: u32,
    /// Whether the building carries a heritage constraint (listed or in a
    /// conservation area)
    pub heritage_constraint: bool,
}

/// Derived PD route metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdRouteOutput {
    /// GIA converted to square feet (gia_sqm × 10.764)
    pub total_sqft: Area,
    /// Gross development value (total_sqft × market rate)
    pub gdv: Money,
    /// Baseline conversion cost (gia_sqm × build rate)
    pub build_cost: Money,
    /// Build rate applied (£/sqm)
    pub cost_per_sqm: Money,
    /// Senior loan-to-cost a lender will typically advance (percentage points)
    pub achievable_ltc_pct: Percent,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Appraise a permitted development conversion scheme.
pub fn appraise_pd_route(
    input: &PdRouteInput,
) -> PropdevResult<ComputationOutput<PdRouteOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input, &mut warnings)?;

    let total_sqft = input.gia_sqm * SQM_TO_SQFT;
    let gdv = total_sqft * input.market_psf;

    let cost_per_sqm = if input.article_four {
        ARTICLE_FOUR_COST_PER_SQM
    } else {
        STANDARD_COST_PER_SQM
    };
    let build_cost = input.gia_sqm * cost_per_sqm;

    let achievable_ltc_pct = achievable_ltc(input);

    let output = PdRouteOutput {
        total_sqft,
        gdv,
        build_cost,
        cost_per_sqm,
        achievable_ltc_pct,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Permitted Development Route Appraisal",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Leverage policy
// ---------------------------------------------------------------------------

/// Achievable senior LTC in percentage points. Policy breakpoints: the base
/// depends on the planning route, larger schemes earn an uplift, heritage
/// constraints take a haircut, and the result never exceeds the ceiling.
fn achievable_ltc(input: &PdRouteInput) -> Percent {
    let mut ltc = if input.article_four {
        ARTICLE_FOUR_BASE_LTC
    } else {
        STANDARD_BASE_LTC
    };

    if input.target_units > SCALE_UNIT_THRESHOLD {
        ltc += SCALE_LTC_UPLIFT;
    }

    if input.heritage_constraint {
        ltc -= HERITAGE_LTC_HAIRCUT;
    }

    ltc.min(MAX_ACHIEVABLE_LTC)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &PdRouteInput, warnings: &mut Vec<String>) -> PropdevResult<()> {
    if input.gia_sqm <= Decimal::ZERO {
        return Err(PropdevError::InvalidInput {
            field: "gia_sqm".into(),
            reason: "Gross internal area must be positive".into(),
        });
    }

    if input.market_psf <= Decimal::ZERO {
        return Err(PropdevError::InvalidInput {
            field: "market_psf".into(),
            reason: "Market rate must be positive".into(),
        });
    }

    if input.market_psf < dec!(300) {
        warnings.push(format!(
            "Market rate £{}/sqft is below £300 — verify comparable evidence",
            input.market_psf
        ));
    }

    if input.market_psf > dec!(1500) {
        warnings.push(format!(
            "Market rate £{}/sqft exceeds £1,500 — prime-market assumption, verify",
            input.market_psf
        ));
    }

    if input.gia_sqm > dec!(10000) {
        warnings.push(
            "GIA exceeds 10,000 sqm — schemes of this scale rarely complete under PD alone".into(),
        );
    }

    if input.target_units == 0 {
        warnings.push("Target unit count is zero — leverage uplift cannot apply".into());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_input() -> PdRouteInput {
        PdRouteInput {
            scheme_name: "Former telephone exchange".into(),
            gia_sqm: dec!(820),
            market_psf: dec!(715),
            article_four: false,
            target_units: 14,
            heritage_constraint: false,
        }
    }

    #[test]
    fn test_area_and_gdv_derivation() {
        let result = appraise_pd_route(&sample_input()).unwrap();
        let out = &result.result;

        // 820 sqm × 10.764 = 8826.48 sqft
        assert_eq!(out.total_sqft, dec!(8826.48));

        // 8826.48 × 715 = 6,310,933.20
        assert_eq!(out.gdv, dec!(6310933.20));
    }

    #[test]
    fn test_build_cost_standard_route() {
        let result = appraise_pd_route(&sample_input()).unwrap();
        let out = &result.result;

        // 820 × 1780 = 1,459,600
        assert_eq!(out.build_cost, dec!(1459600));
        assert_eq!(out.cost_per_sqm, dec!(1780));
    }

    #[test]
    fn test_build_cost_article_four() {
        let mut input = sample_input();
        input.article_four = true;
        let result = appraise_pd_route(&input).unwrap();
        let out = &result.result;

        // 820 × 1950 = 1,599,000
        assert_eq!(out.build_cost, dec!(1599000));
        assert_eq!(out.cost_per_sqm, dec!(1950));
    }

    #[test]
    fn test_ltc_standard_route_with_scale_uplift() {
        // 14 units on a clean PD route: 68 + 4 = 72, at the ceiling
        let result = appraise_pd_route(&sample_input()).unwrap();
        assert_eq!(result.result.achievable_ltc_pct, dec!(72));
    }

    #[test]
    fn test_ltc_small_scheme_no_uplift() {
        let mut input = sample_input();
        input.target_units = 12; // threshold is strictly greater-than
        let result = appraise_pd_route(&input).unwrap();
        assert_eq!(result.result.achievable_ltc_pct, dec!(68));
    }

    #[test]
    fn test_ltc_article_four_base() {
        let mut input = sample_input();
        input.article_four = true;
        input.target_units = 8;
        let result = appraise_pd_route(&input).unwrap();
        assert_eq!(result.result.achievable_ltc_pct, dec!(60));
    }

    #[test]
    fn test_ltc_heritage_haircut() {
        let mut input = sample_input();
        input.target_units = 8;
        input.heritage_constraint = true;
        let result = appraise_pd_route(&input).unwrap();
        // 68 − 2 = 66
        assert_eq!(result.result.achievable_ltc_pct, dec!(66));
    }

    #[test]
    fn test_ltc_ceiling_binds() {
        // 68 + 4 = 72 already at the cap; heritage off keeps it there
        let mut input = sample_input();
        input.target_units = 40;
        let result = appraise_pd_route(&input).unwrap();
        assert_eq!(result.result.achievable_ltc_pct, dec!(72));
    }

    #[test]
    fn test_ltc_article_four_large_heritage() {
        let mut input = sample_input();
        input.article_four = true;
        input.target_units = 20;
        input.heritage_constraint = true;
        let result = appraise_pd_route(&input).unwrap();
        // 60 + 4 − 2 = 62
        assert_eq!(result.result.achievable_ltc_pct, dec!(62));
    }

    #[test]
    fn test_zero_gia_rejected() {
        let mut input = sample_input();
        input.gia_sqm = Decimal::ZERO;
        let result = appraise_pd_route(&input);
        assert!(result.is_err());
        match result.unwrap_err() {
            PropdevError::InvalidInput { field, .. } => assert_eq!(field, "gia_sqm"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_psf_rejected() {
        let mut input = sample_input();
        input.market_psf = dec!(-10);
        assert!(appraise_pd_route(&input).is_err());
    }

    #[test]
    fn test_low_psf_warning() {
        let mut input = sample_input();
        input.market_psf = dec!(250);
        let result = appraise_pd_route(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("below £300")));
    }

    #[test]
    fn test_methodology_string() {
        let result = appraise_pd_route(&sample_input()).unwrap();
        assert_eq!(result.methodology, "Permitted Development Route Appraisal");
    }
}
