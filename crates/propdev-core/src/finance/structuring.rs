//! Development finance structuring.
//!
//! Sizes a senior facility against total project cost, optionally layers a
//! mezzanine tranche up to the combined leverage ceiling, and prices both
//! from loan-to-GDV. Profitability ratios drive a lender-appetite
//! classification. Pricing breakpoints are lending policy, not market data:
//! the exact thresholds and the order in which they are checked are part of
//! the contract.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PropdevError;
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::PropdevResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ONE_HUNDRED: Decimal = dec!(100);

/// Combined senior + mezzanine LTC ceiling
const COMBINED_LTC_CEILING: Decimal = dec!(0.85);
/// Most additional LTC a mezzanine tranche can contribute
const MEZZANINE_MAX_ADDITIONAL_LTC: Decimal = dec!(0.15);
/// Base mezzanine coupon (percentage points)
const MEZZANINE_BASE_RATE: Decimal = dec!(15);
/// Coupon premium for deep mezzanine (additional LTC above the threshold)
const MEZZANINE_DEEP_PREMIUM: Decimal = dec!(3);
/// Additional-LTC threshold above which the deep premium applies
const MEZZANINE_DEEP_THRESHOLD: Decimal = dec!(0.10);

/// Senior LTGDV breakpoints (percentage points) and the rates they price to
const SENIOR_LTGDV_HIGH: Decimal = dec!(65);
const SENIOR_LTGDV_MID: Decimal = dec!(60);
const SENIOR_RATE_HIGH: Decimal = dec!(12.5);
const SENIOR_RATE_MID: Decimal = dec!(11.5);
const SENIOR_RATE_LOW: Decimal = dec!(10.5);
const ARRANGEMENT_FEE_HIGH: Decimal = dec!(2.0);
const ARRANGEMENT_FEE_STANDARD: Decimal = dec!(1.5);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a finance structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceStructureInput {
    /// Scheme identifier
    pub scheme_name: String,
    /// Site / building purchase price
    pub purchase_price: Money,
    /// All-in build cost
    pub build_cost: Money,
    /// Gross development value
    pub gdv: Money,
    /// Target senior loan-to-cost (e.g. 0.65 = 65%)
    pub target_ltc: Rate,
    /// Facility term in months
    pub term_months: u32,
    /// Whether to layer a mezzanine tranche above the senior facility
    pub require_mezzanine: bool,
}

/// Mezzanine tranche detail. Present whenever mezzanine was requested, even
/// when the combined ceiling leaves it no headroom (amount zero).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MezzanineTranche {
    /// LTC contributed above the senior facility
    pub additional_ltc: Rate,
    /// Tranche amount (total cost × additional LTC)
    pub amount: Money,
    /// Coupon (percentage points)
    pub rate_pct: Percent,
}

/// How a development lender reads the deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LenderAppetite {
    Strong,
    Moderate,
    Weak,
}

/// Complete finance structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceStructureOutput {
    /// Purchase price + build cost
    pub total_cost: Money,
    /// Senior facility (total cost × target LTC)
    pub senior_debt: Money,
    /// Senior facility against GDV (percentage points)
    pub senior_ltgdv_pct: Percent,
    /// Senior coupon (percentage points)
    pub senior_rate_pct: Percent,
    /// Senior arrangement fee (percentage points)
    pub arrangement_fee_pct: Percent,
    /// Mezzanine tranche, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mezzanine: Option<MezzanineTranche>,
    /// Senior + mezzanine
    pub total_debt: Money,
    /// Total cost − total debt
    pub equity_required: Money,
    /// Total debt against total cost (percentage points)
    pub total_ltc_pct: Percent,
    /// Total debt against GDV (percentage points)
    pub total_ltgdv_pct: Percent,
    /// GDV − total cost
    pub profit: Money,
    /// Profit on cost (percentage points)
    pub profit_on_cost_pct: Percent,
    /// Profit on GDV (percentage points)
    pub profit_on_gdv_pct: Percent,
    /// Lender appetite classification
    pub lender_appetite: LenderAppetite,
    /// Facility term in months (echoed)
    pub term_months: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Structure senior and mezzanine debt for a development and classify lender
/// appetite.
pub fn structure_finance(
    input: &FinanceStructureInput,
) -> PropdevResult<ComputationOutput<FinanceStructureOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input, &mut warnings)?;

    let total_cost = input.purchase_price + input.build_cost;

    let senior_debt = total_cost * input.target_ltc;
    let senior_ltgdv_pct = senior_debt / input.gdv * ONE_HUNDRED;

    let mezzanine = if input.require_mezzanine {
        // Headroom to the combined ceiling, floored at zero when the target
        // already sits at or above it.
        let additional_ltc = MEZZANINE_MAX_ADDITIONAL_LTC
            .min(COMBINED_LTC_CEILING - input.target_ltc)
            .max(Decimal::ZERO);
        let amount = total_cost * additional_ltc;
        let rate_pct = if additional_ltc > MEZZANINE_DEEP_THRESHOLD {
            MEZZANINE_BASE_RATE + MEZZANINE_DEEP_PREMIUM
        } else {
            MEZZANINE_BASE_RATE
        };

        if additional_ltc.is_zero() {
            warnings.push(
                "Mezzanine requested but target LTC leaves no headroom below the 85% \
                 combined ceiling — tranche sized at zero"
                    .into(),
            );
        }

        Some(MezzanineTranche {
            additional_ltc,
            amount,
            rate_pct,
        })
    } else {
        None
    };

    let mezzanine_amount = mezzanine.as_ref().map(|m| m.amount).unwrap_or(Decimal::ZERO);

    let total_debt = senior_debt + mezzanine_amount;
    let equity_required = total_cost - total_debt;
    let total_ltc_pct = total_debt / total_cost * ONE_HUNDRED;
    let total_ltgdv_pct = total_debt / input.gdv * ONE_HUNDRED;

    let profit = input.gdv - total_cost;
    let profit_on_cost_pct = profit / total_cost * ONE_HUNDRED;
    let profit_on_gdv_pct = profit / input.gdv * ONE_HUNDRED;

    let (senior_rate_pct, arrangement_fee_pct) = price_senior(senior_ltgdv_pct);
    let lender_appetite = classify_appetite(profit_on_cost_pct, senior_ltgdv_pct);

    if profit_on_cost_pct < dec!(15) {
        warnings.push(format!(
            "Profit on cost of {:.1}% is below 15% — little margin for cost overrun",
            profit_on_cost_pct
        ));
    }

    let output = FinanceStructureOutput {
        total_cost,
        senior_debt,
        senior_ltgdv_pct,
        senior_rate_pct,
        arrangement_fee_pct,
        mezzanine,
        total_debt,
        equity_required,
        total_ltc_pct,
        total_ltgdv_pct,
        profit,
        profit_on_cost_pct,
        profit_on_gdv_pct,
        lender_appetite,
        term_months: input.term_months,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Development Finance Structure (Senior + Mezzanine)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Pricing policy
// ---------------------------------------------------------------------------

/// Senior coupon and arrangement fee from loan-to-GDV. First matching
/// breakpoint wins.
fn price_senior(senior_ltgdv_pct: Percent) -> (Percent, Percent) {
    let rate = if senior_ltgdv_pct > SENIOR_LTGDV_HIGH {
        SENIOR_RATE_HIGH
    } else if senior_ltgdv_pct > SENIOR_LTGDV_MID {
        SENIOR_RATE_MID
    } else {
        SENIOR_RATE_LOW
    };

    let fee = if senior_ltgdv_pct > SENIOR_LTGDV_HIGH {
        ARRANGEMENT_FEE_HIGH
    } else {
        ARRANGEMENT_FEE_STANDARD
    };

    (rate, fee)
}

/// Appetite classification. First matching tier wins.
fn classify_appetite(profit_on_cost_pct: Percent, senior_ltgdv_pct: Percent) -> LenderAppetite {
    if profit_on_cost_pct > dec!(25) && senior_ltgdv_pct < dec!(65) {
        LenderAppetite::Strong
    } else if profit_on_cost_pct > dec!(18) && senior_ltgdv_pct < dec!(70) {
        LenderAppetite::Moderate
    } else {
        LenderAppetite::Weak
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(
    input: &FinanceStructureInput,
    warnings: &mut Vec<String>,
) -> PropdevResult<()> {
    if input.purchase_price < Decimal::ZERO {
        return Err(PropdevError::InvalidInput {
            field: "purchase_price".into(),
            reason: "Purchase price cannot be negative".into(),
        });
    }

    if input.build_cost <= Decimal::ZERO {
        return Err(PropdevError::InvalidInput {
            field: "build_cost".into(),
            reason: "Build cost must be positive".into(),
        });
    }

    if input.gdv <= Decimal::ZERO {
        return Err(PropdevError::InvalidInput {
            field: "gdv".into(),
            reason: "GDV must be positive".into(),
        });
    }

    if input.target_ltc <= Decimal::ZERO || input.target_ltc >= Decimal::ONE {
        return Err(PropdevError::InvalidInput {
            field: "target_ltc".into(),
            reason: "Target LTC must be between 0 and 1 (exclusive)".into(),
        });
    }

    if input.target_ltc > COMBINED_LTC_CEILING {
        warnings.push(format!(
            "Target LTC of {:.0}% exceeds the 85% combined ceiling — senior lenders \
             will not reach this leverage",
            input.target_ltc * ONE_HUNDRED
        ));
    }

    if input.term_months == 0 {
        return Err(PropdevError::InvalidInput {
            field: "term_months".into(),
            reason: "Facility term must be at least one month".into(),
        });
    }

    if input.term_months > 36 {
        warnings.push(format!(
            "Term of {} months is beyond the typical 36-month development facility",
            input.term_months
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

    /// Scenario A from the appraisal worked examples.
    fn scenario_a() -> FinanceStructureInput {
        FinanceStructureInput {
            scheme_name: "Scenario A".into(),
            purchase_price: dec!(1850000),
            build_cost: dec!(2012000),
            gdv: dec!(6210000),
            target_ltc: dec!(0.65),
            term_months: 18,
            require_mezzanine: false,
        }
    }

    #[test]
    fn test_scenario_a_sizing() {
        let result = structure_finance(&scenario_a()).unwrap();
        let out = &result.result;

        assert_eq!(out.total_cost, dec!(3862000));
        assert_eq!(out.senior_debt, dec!(2510300));
        assert_eq!(out.senior_ltgdv_pct.round_dp(1), dec!(40.4));
        assert!(out.mezzanine.is_none());
        assert_eq!(out.total_debt, dec!(2510300));
        assert_eq!(out.equity_required, dec!(1351700));
    }

    #[test]
    fn test_scenario_a_pricing_and_appetite() {
        let result = structure_finance(&scenario_a()).unwrap();
        let out = &result.result;

        // LTGDV ≈ 40.4% sits below both breakpoints
        assert_eq!(out.senior_rate_pct, dec!(10.5));
        assert_eq!(out.arrangement_fee_pct, dec!(1.5));

        assert_eq!(out.profit, dec!(2348000));
        assert_eq!(out.profit_on_cost_pct.round_dp(1), dec!(60.8));
        assert_eq!(out.lender_appetite, LenderAppetite::Strong);
    }

    #[test]
    fn test_scenario_b_mezzanine_at_ceiling() {
        // Target already at the 85% ceiling: tranche present but sized zero
        let mut input = scenario_a();
        input.target_ltc = dec!(0.85);
        input.require_mezzanine = true;

        let result = structure_finance(&input).unwrap();
        let out = &result.result;

        let mezz = out.mezzanine.as_ref().unwrap();
        assert_eq!(mezz.additional_ltc, Decimal::ZERO);
        assert_eq!(mezz.amount, Decimal::ZERO);
        assert_eq!(out.total_debt, out.senior_debt);
        assert!(result.warnings.iter().any(|w| w.contains("no headroom")));
    }

    #[test]
    fn test_mezzanine_full_headroom() {
        let mut input = scenario_a();
        input.target_ltc = dec!(0.65);
        input.require_mezzanine = true;

        let result = structure_finance(&input).unwrap();
        let mezz = result.result.mezzanine.as_ref().unwrap();

        // min(0.15, 0.85 − 0.65) = 0.15
        assert_eq!(mezz.additional_ltc, dec!(0.15));
        assert_eq!(mezz.amount, dec!(3862000) * dec!(0.15));
        // Deep tranche: 15 + 3
        assert_eq!(mezz.rate_pct, dec!(18));
    }

    #[test]
    fn test_mezzanine_shallow_tranche_base_rate() {
        let mut input = scenario_a();
        input.target_ltc = dec!(0.78);
        input.require_mezzanine = true;

        let result = structure_finance(&input).unwrap();
        let mezz = result.result.mezzanine.as_ref().unwrap();

        // min(0.15, 0.07) = 0.07, at or below the 0.10 deep threshold
        assert_eq!(mezz.additional_ltc, dec!(0.07));
        assert_eq!(mezz.rate_pct, dec!(15));
    }

    #[test]
    fn test_equity_identity() {
        let mut input = scenario_a();
        input.require_mezzanine = true;
        let result = structure_finance(&input).unwrap();
        let out = &result.result;

        let mezz_amount = out.mezzanine.as_ref().map(|m| m.amount).unwrap();
        assert_eq!(
            out.equity_required,
            out.total_cost - out.senior_debt - mezz_amount
        );

        // total_ltc + equity share reconstructs 100%
        let equity_share = out.equity_required / out.total_cost * dec!(100);
        let sum = out.total_ltc_pct + equity_share;
        assert!((sum - dec!(100)).abs() < dec!(0.0000001), "sum was {sum}");
    }

    #[test]
    fn test_senior_rate_tiers() {
        // Push LTGDV above 65: gdv barely above senior debt
        let mut input = scenario_a();
        input.gdv = dec!(3700000);
        let result = structure_finance(&input).unwrap();
        // 2,510,300 / 3,700,000 = 67.8% > 65
        assert_eq!(result.result.senior_rate_pct, dec!(12.5));
        assert_eq!(result.result.arrangement_fee_pct, dec!(2.0));

        // Between 60 and 65
        input.gdv = dec!(4000000);
        let result = structure_finance(&input).unwrap();
        // 62.76%
        assert_eq!(result.result.senior_rate_pct, dec!(11.5));
        assert_eq!(result.result.arrangement_fee_pct, dec!(1.5));
    }

    #[test]
    fn test_appetite_moderate_tier() {
        // profit_on_cost between 18 and 25 with LTGDV below 70
        let mut input = scenario_a();
        input.gdv = dec!(4700000);
        let result = structure_finance(&input).unwrap();
        let out = &result.result;

        // profit = 838,000; on cost ≈ 21.7%; ltgdv ≈ 53.4%
        assert_eq!(out.lender_appetite, LenderAppetite::Moderate);
    }

    #[test]
    fn test_appetite_weak_tier() {
        let mut input = scenario_a();
        input.gdv = dec!(4200000);
        let result = structure_finance(&input).unwrap();
        // profit on cost ≈ 8.8%
        assert_eq!(result.result.lender_appetite, LenderAppetite::Weak);
    }

    #[test]
    fn test_appetite_monotonic_in_profit() {
        // With LTGDV held below 65, increasing profit never demotes appetite
        let mut last_rank = 0u8;
        for gdv in [dec!(4600000), dec!(5000000), dec!(5500000), dec!(6500000)] {
            let mut input = scenario_a();
            input.gdv = gdv;
            let result = structure_finance(&input).unwrap();
            let rank = match result.result.lender_appetite {
                LenderAppetite::Weak => 1,
                LenderAppetite::Moderate => 2,
                LenderAppetite::Strong => 3,
            };
            assert!(
                rank >= last_rank,
                "appetite demoted at gdv {gdv}: rank {rank} after {last_rank}"
            );
            last_rank = rank;
        }
    }

    #[test]
    fn test_zero_gdv_rejected() {
        let mut input = scenario_a();
        input.gdv = Decimal::ZERO;
        assert!(structure_finance(&input).is_err());
    }

    #[test]
    fn test_target_ltc_bounds() {
        let mut input = scenario_a();
        input.target_ltc = Decimal::ZERO;
        assert!(structure_finance(&input).is_err());

        input.target_ltc = dec!(1.0);
        assert!(structure_finance(&input).is_err());
    }

    #[test]
    fn test_zero_term_rejected() {
        let mut input = scenario_a();
        input.term_months = 0;
        assert!(structure_finance(&input).is_err());
    }

    #[test]
    fn test_long_term_warning() {
        let mut input = scenario_a();
        input.term_months = 48;
        let result = structure_finance(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("36-month")));
    }

    #[test]
    fn test_thin_margin_warning() {
        let mut input = scenario_a();
        input.gdv = dec!(4200000);
        let result = structure_finance(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("below 15%")));
    }
}
