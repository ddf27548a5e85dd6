//! The four-step deal progression engine.
//!
//! Orchestrates step submissions against the deal store: validates the
//! payload, attaches a narrative from the insight collaborator, patches the
//! step slice, and moves the progress cursor. Advancement is optimistic per
//! step — submitting step N with `completed = true` moves the cursor to
//! N + 1 without re-validating that steps 1..N−1 are complete, matching the
//! behaviour callers already rely on. `Deal::completed_through` gives the
//! strict contiguous view where it matters.

use chrono::Utc;
use log::{debug, warn};
use rust_decimal::Decimal;

use crate::deal::record::{Deal, DealId, DealPatch, DealStatus, StepSubmission, STEP_COUNT};
use crate::error::EngineError;
use crate::identity::Identity;
use crate::insights::{request_insights, InsightGenerator};
use crate::store::{DealStore, UserStore};
use crate::EngineResult;

/// Creation payload. Name, address, and local authority are immutable once
/// the deal exists.
#[derive(Debug, Clone)]
pub struct NewDeal {
    pub name: String,
    pub address: String,
    pub local_authority: Option<String>,
}

/// Deal progression engine over the store and collaborator seams.
pub struct DealEngine<'a> {
    deals: &'a dyn DealStore,
    users: &'a dyn UserStore,
    insights: Option<&'a dyn InsightGenerator>,
}

impl<'a> DealEngine<'a> {
    pub fn new(deals: &'a dyn DealStore, users: &'a dyn UserStore) -> Self {
        DealEngine {
            deals,
            users,
            insights: None,
        }
    }

    /// Attach the narrative-insight collaborator. Without it, steps persist
    /// with no reasoning text.
    pub fn with_insights(mut self, generator: &'a dyn InsightGenerator) -> Self {
        self.insights = Some(generator);
        self
    }

    /// Create a draft deal for the calling user.
    ///
    /// Requires an authenticated caller whose user row has already been
    /// provisioned by the external identity collaborator.
    pub fn create_deal(
        &self,
        caller: Option<&Identity>,
        new: NewDeal,
    ) -> EngineResult<DealId> {
        let identity = caller.ok_or(EngineError::Unauthenticated)?;
        let user = self
            .users
            .user_by_token(&identity.token_identifier)?
            .ok_or_else(|| EngineError::UserNotFound(identity.token_identifier.clone()))?;

        if new.name.trim().is_empty() {
            return Err(EngineError::validation("name", "Deal name cannot be empty"));
        }

        let deal = Deal::new(user.id, new.name, new.address, new.local_authority);
        let id = deal.id;
        self.deals.insert_deal(deal)?;

        debug!("created deal {id} for user {}", user.id);
        Ok(id)
    }

    /// Submit one wizard step for a deal.
    ///
    /// Requires authentication but deliberately does not verify that the
    /// caller owns the deal; reads and step writes are open to any
    /// authenticated session and the presentation layer scopes what it
    /// offers. Completion moves the cursor forward, an incomplete submission
    /// parks it on the submitted step, and the finance step drives the
    /// draft/complete status.
    pub fn submit_step(
        &self,
        caller: Option<&Identity>,
        deal_id: DealId,
        submission: StepSubmission,
    ) -> EngineResult<()> {
        caller.ok_or(EngineError::Unauthenticated)?;

        let deal = self
            .deals
            .deal(deal_id)?
            .ok_or_else(|| EngineError::not_found("Deal", deal_id))?;

        validate_submission(&submission)?;

        let step_number = submission.step_number();
        let completed = submission.completed();

        let reasoning = self.narrate(&deal, &submission);

        let mut patch = DealPatch {
            current_step: Some(if completed {
                (step_number + 1).min(STEP_COUNT)
            } else {
                step_number
            }),
            updated_at: Some(Utc::now()),
            ..DealPatch::default()
        };

        match submission {
            StepSubmission::Pd(mut step) => {
                step.reasoning = reasoning;
                patch.pd_data = Some(step);
            }
            StepSubmission::Gdv(mut step) => {
                step.reasoning = reasoning;
                patch.gdv_data = Some(step);
            }
            StepSubmission::BuildCost(mut step) => {
                step.reasoning = reasoning;
                patch.build_cost_data = Some(step);
            }
            StepSubmission::Finance(mut step) => {
                step.reasoning = reasoning;
                patch.finance_data = Some(step);
                patch.status = Some(if completed {
                    DealStatus::Complete
                } else {
                    DealStatus::Draft
                });
            }
        }

        if !self.deals.patch_deal(deal_id, patch)? {
            return Err(EngineError::not_found("Deal", deal_id));
        }

        debug!(
            "deal {deal_id}: step {step_number} submitted (completed: {completed})"
        );
        Ok(())
    }

    /// Read a deal. Unauthenticated and unfiltered by ownership.
    pub fn get_deal(&self, deal_id: DealId) -> EngineResult<Option<Deal>> {
        Ok(self.deals.deal(deal_id)?)
    }

    /// All deals owned by the caller, newest first. Empty for anonymous or
    /// unprovisioned callers rather than an error.
    pub fn list_deals(&self, caller: Option<&Identity>) -> EngineResult<Vec<Deal>> {
        let Some(identity) = caller else {
            return Ok(Vec::new());
        };
        let Some(user) = self.users.user_by_token(&identity.token_identifier)? else {
            return Ok(Vec::new());
        };
        Ok(self.deals.deals_by_owner(user.id)?)
    }

    /// Delete a deal outright. Requires authentication; does not verify
    /// ownership.
    pub fn delete_deal(&self, caller: Option<&Identity>, deal_id: DealId) -> EngineResult<()> {
        caller.ok_or(EngineError::Unauthenticated)?;

        if !self.deals.delete_deal(deal_id)? {
            return Err(EngineError::not_found("Deal", deal_id));
        }
        debug!("deleted deal {deal_id}");
        Ok(())
    }

    /// Persist a status produced by an external process (lender review).
    /// The engine itself never transitions a deal into these states and
    /// rejects the internally-driven ones here.
    pub fn record_external_status(
        &self,
        deal_id: DealId,
        status: DealStatus,
    ) -> EngineResult<()> {
        match status {
            DealStatus::FinanceSubmitted | DealStatus::FinanceApproved => {}
            DealStatus::Draft | DealStatus::Complete => {
                return Err(EngineError::validation(
                    "status",
                    "Only finance_submitted and finance_approved may be set externally",
                ));
            }
        }

        let patch = DealPatch {
            status: Some(status),
            updated_at: Some(Utc::now()),
            ..DealPatch::default()
        };

        if !self.deals.patch_deal(deal_id, patch)? {
            return Err(EngineError::not_found("Deal", deal_id));
        }
        Ok(())
    }

    /// Ask the insight collaborator for a step narrative. Failures are
    /// logged and swallowed: metrics persist either way.
    fn narrate(&self, deal: &Deal, submission: &StepSubmission) -> Option<String> {
        let generator = self.insights?;
        let prompt = narrative_prompt(deal, submission);
        match request_insights(generator, &prompt) {
            Ok(payload) => Some(payload.summary),
            Err(e) => {
                warn!(
                    "insight generation failed for deal {} step {}: {e}",
                    deal.id,
                    submission.step_number()
                );
                None
            }
        }
    }
}

/// Prompt for the step narrative, built from the deal header and the
/// submitted figures.
fn narrative_prompt(deal: &Deal, submission: &StepSubmission) -> String {
    let step_label = match submission {
        StepSubmission::Pd(_) => "permitted development route",
        StepSubmission::Gdv(_) => "gross development value",
        StepSubmission::BuildCost(_) => "build cost plan",
        StepSubmission::Finance(_) => "development finance structure",
    };
    let figures = serde_json::to_string(submission).unwrap_or_default();
    format!(
        "Assess the {step_label} for \"{}\" at {}. Respond with a JSON object \
         (summary, verdict, score, insights, recommendations, risks, marketContext). \
         Figures: {figures}",
        deal.name, deal.address
    )
}

// ---------------------------------------------------------------------------
// Submission validation
// ---------------------------------------------------------------------------

/// Presence/sanity checks on the caller-supplied step slice. Derived values
/// are trusted, not recomputed.
fn validate_submission(submission: &StepSubmission) -> EngineResult<()> {
    match submission {
        StepSubmission::Pd(step) => {
            require_positive("pd.metrics.gdv", step.metrics.gdv)?;
            require_positive("pd.metrics.build_cost", step.metrics.build_cost)?;
        }
        StepSubmission::Gdv(step) => {
            if step.metrics.total_units == 0 {
                return Err(EngineError::validation(
                    "gdv.metrics.total_units",
                    "Unit count cannot be zero",
                ));
            }
            require_positive("gdv.metrics.total_gdv", step.metrics.total_gdv)?;
        }
        StepSubmission::BuildCost(step) => {
            require_positive("build_cost.metrics.total_cost", step.metrics.total_cost)?;
        }
        StepSubmission::Finance(step) => {
            require_positive("finance.metrics.total_cost", step.metrics.total_cost)?;
            require_positive("finance.inputs.gdv", step.inputs.gdv)?;
        }
    }
    Ok(())
}

fn require_positive(field: &str, value: Decimal) -> EngineResult<()> {
    if value <= Decimal::ZERO {
        return Err(EngineError::validation(
            field,
            "Value must be positive".to_string(),
        ));
    }
    Ok(())
}
