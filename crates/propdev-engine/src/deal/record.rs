//! The persisted deal record: one row per property opportunity under
//! assessment, holding the outputs of each wizard step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use propdev_core::costing::build_cost::{BuildCostInput, BuildCostOutput};
use propdev_core::finance::structuring::{FinanceStructureInput, FinanceStructureOutput};
use propdev_core::planning::pd_route::{PdRouteInput, PdRouteOutput};
use propdev_core::valuation::gdv::{GdvInput, GdvOutput};

use crate::identity::UserId;

/// Number of wizard steps
pub const STEP_COUNT: u8 = 4;

/// Deal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub Uuid);

impl DealId {
    pub fn new() -> Self {
        DealId(Uuid::new_v4())
    }
}

impl Default for DealId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Deal lifecycle status. The engine drives `Draft` and `Complete`;
/// `FinanceSubmitted` and `FinanceApproved` are set by external processes
/// (lender review) and only persisted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Draft,
    Complete,
    FinanceSubmitted,
    FinanceApproved,
}

/// One submitted step: the inputs the caller worked from, the derived
/// metrics the client computed, a completion flag, and the narrative
/// produced by the insight collaborator. The engine trusts the derived
/// metrics; it does not recompute them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord<I, M> {
    pub inputs: I,
    pub metrics: M,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

pub type PdStep = StepRecord<PdRouteInput, PdRouteOutput>;
pub type GdvStep = StepRecord<GdvInput, GdvOutput>;
pub type BuildCostStep = StepRecord<BuildCostInput, BuildCostOutput>;
pub type FinanceStep = StepRecord<FinanceStructureInput, FinanceStructureOutput>;

/// A step submission, keyed by step number through the variant. Any
/// `reasoning` on the payload is overwritten by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step", content = "data")]
pub enum StepSubmission {
    Pd(PdStep),
    Gdv(GdvStep),
    BuildCost(BuildCostStep),
    Finance(FinanceStep),
}

impl StepSubmission {
    /// Wizard position of this step (1–4).
    pub fn step_number(&self) -> u8 {
        match self {
            StepSubmission::Pd(_) => 1,
            StepSubmission::Gdv(_) => 2,
            StepSubmission::BuildCost(_) => 3,
            StepSubmission::Finance(_) => 4,
        }
    }

    pub fn completed(&self) -> bool {
        match self {
            StepSubmission::Pd(s) => s.completed,
            StepSubmission::Gdv(s) => s.completed,
            StepSubmission::BuildCost(s) => s.completed,
            StepSubmission::Finance(s) => s.completed,
        }
    }

    /// Scheme name carried in the step inputs, for narrative prompts.
    pub fn scheme_name(&self) -> &str {
        match self {
            StepSubmission::Pd(s) => &s.inputs.scheme_name,
            StepSubmission::Gdv(s) => &s.inputs.scheme_name,
            StepSubmission::BuildCost(s) => &s.inputs.scheme_name,
            StepSubmission::Finance(s) => &s.inputs.scheme_name,
        }
    }
}

/// One in-progress deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    /// Owning user. There are no anonymous deals.
    pub owner: UserId,
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_authority: Option<String>,
    pub status: DealStatus,
    /// Progress cursor, 1–4.
    pub current_step: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pd_data: Option<PdStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdv_data: Option<GdvStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_cost_data: Option<BuildCostStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_data: Option<FinanceStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// New draft deal positioned at step 1.
    pub fn new(
        owner: UserId,
        name: String,
        address: String,
        local_authority: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Deal {
            id: DealId::new(),
            owner,
            name,
            address,
            local_authority,
            status: DealStatus::Draft,
            current_step: 1,
            pd_data: None,
            gdv_data: None,
            build_cost_data: None,
            finance_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Count of contiguous completed steps starting from step 1. The strict
    /// view of progress; `current_step` itself advances optimistically per
    /// step and is not re-derived from this.
    pub fn completed_through(&self) -> u8 {
        let flags = [
            self.pd_data.as_ref().map(|s| s.completed).unwrap_or(false),
            self.gdv_data.as_ref().map(|s| s.completed).unwrap_or(false),
            self.build_cost_data
                .as_ref()
                .map(|s| s.completed)
                .unwrap_or(false),
            self.finance_data
                .as_ref()
                .map(|s| s.completed)
                .unwrap_or(false),
        ];
        flags.iter().take_while(|&&done| done).count() as u8
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Partial update applied to a deal. Fields left `None` are untouched; the
/// store applies set fields last-write-wins, mirroring the document-store
/// patch semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DealStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pd_data: Option<PdStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdv_data: Option<GdvStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_cost_data: Option<BuildCostStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_data: Option<FinanceStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
