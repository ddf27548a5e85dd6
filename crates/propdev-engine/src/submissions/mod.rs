//! Calculator submission capture for lead follow-up.
//!
//! Records standalone calculator usage, independent of the deal wizard.
//! Identified users keep at most one row per calculator slug (repeat
//! submissions patch the existing row); anonymous submissions always insert,
//! since there is no stable identity to dedupe on.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::identity::{Identity, UserId};
use crate::store::{SubmissionStore, UserStore};
use crate::EngineResult;

/// Follow-up status assigned to new rows
pub const FOLLOW_UP_PENDING: &str = "pending";

/// Submission identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        SubmissionId(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One captured calculator submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorSubmission {
    pub id: SubmissionId,
    /// Owning user, when the caller was identified and provisioned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    /// Calculator family (e.g. "appraisal")
    pub calculator_type: String,
    /// Specific calculator (e.g. "pd-route", "development-finance")
    pub calculator_slug: String,
    /// Opaque serialized form payload, as submitted
    pub form_data: serde_json::Value,
    /// Page or campaign the submission came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Free-form follow-up state, "pending" on creation
    pub follow_up_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a submission row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Creation payload.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub calculator_type: String,
    pub calculator_slug: String,
    pub form_data: serde_json::Value,
    pub source: Option<String>,
}

/// Submitter details attached to admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitterInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Admin listing row: the submission plus who sent it, when identified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: CalculatorSubmission,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<SubmitterInfo>,
}

/// Aggregate lead-funnel stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionStats {
    pub total: usize,
    pub by_calculator: BTreeMap<String, usize>,
    pub by_follow_up_status: BTreeMap<String, usize>,
    /// Rows created within the trailing seven days
    pub last_seven_days: usize,
}

/// Submission capture over the store seams.
pub struct SubmissionCapture<'a> {
    submissions: &'a dyn SubmissionStore,
    users: &'a dyn UserStore,
}

impl<'a> SubmissionCapture<'a> {
    pub fn new(submissions: &'a dyn SubmissionStore, users: &'a dyn UserStore) -> Self {
        SubmissionCapture { submissions, users }
    }

    /// Record a calculator submission. Anonymous callers are allowed, and an
    /// authenticated caller without a provisioned user row is treated as
    /// anonymous rather than rejected. Identified repeat submissions for the
    /// same calculator slug patch the existing row.
    pub fn record(
        &self,
        caller: Option<&Identity>,
        new: NewSubmission,
    ) -> EngineResult<SubmissionId> {
        if new.calculator_slug.trim().is_empty() {
            return Err(EngineError::validation(
                "calculator_slug",
                "Calculator slug cannot be empty",
            ));
        }

        let user = match caller {
            Some(identity) => self
                .users
                .user_by_token(&identity.token_identifier)?
                .map(|u| u.id),
            None => None,
        };

        if let Some(user_id) = user {
            if let Some(existing) = self
                .submissions
                .submission_by_user_and_slug(user_id, &new.calculator_slug)?
            {
                let patch = SubmissionPatch {
                    form_data: Some(new.form_data),
                    source: new.source,
                    updated_at: Some(Utc::now()),
                    ..SubmissionPatch::default()
                };
                self.submissions.patch_submission(existing.id, patch)?;
                debug!(
                    "patched submission {} for user {user_id} slug {}",
                    existing.id, new.calculator_slug
                );
                return Ok(existing.id);
            }
        }

        let now = Utc::now();
        let submission = CalculatorSubmission {
            id: SubmissionId::new(),
            user,
            calculator_type: new.calculator_type,
            calculator_slug: new.calculator_slug,
            form_data: new.form_data,
            source: new.source,
            follow_up_status: FOLLOW_UP_PENDING.to_string(),
            follow_up_notes: None,
            created_at: now,
            updated_at: now,
        };
        let id = submission.id;
        self.submissions.insert_submission(submission)?;
        debug!("recorded submission {id}");
        Ok(id)
    }

    /// Admin listing, newest first, enriched with submitter details.
    pub fn list(
        &self,
        limit: Option<usize>,
        follow_up_status: Option<&str>,
    ) -> EngineResult<Vec<SubmissionView>> {
        let rows = self.submissions.list_submissions(limit, follow_up_status)?;

        let mut views = Vec::with_capacity(rows.len());
        for submission in rows {
            let submitted_by = match submission.user {
                Some(user_id) => self.users.user_by_id(user_id)?.map(|u| SubmitterInfo {
                    display_name: u.display_name,
                    email: u.email,
                }),
                None => None,
            };
            views.push(SubmissionView {
                submission,
                submitted_by,
            });
        }
        Ok(views)
    }

    /// Admin patch of the follow-up state. Unconditional.
    pub fn update_follow_up(
        &self,
        id: SubmissionId,
        status: String,
        notes: Option<String>,
    ) -> EngineResult<()> {
        let patch = SubmissionPatch {
            follow_up_status: Some(status),
            follow_up_notes: notes,
            updated_at: Some(Utc::now()),
            ..SubmissionPatch::default()
        };

        if !self.submissions.patch_submission(id, patch)? {
            return Err(EngineError::not_found("Submission", id));
        }
        Ok(())
    }

    /// Aggregate counts for the lead funnel.
    pub fn stats(&self) -> EngineResult<SubmissionStats> {
        let rows = self.submissions.all_submissions()?;
        let window_start = Utc::now() - Duration::days(7);

        let mut by_calculator: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_follow_up_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut last_seven_days = 0usize;

        for row in &rows {
            *by_calculator
                .entry(row.calculator_slug.clone())
                .or_default() += 1;
            *by_follow_up_status
                .entry(row.follow_up_status.clone())
                .or_default() += 1;
            if row.created_at >= window_start {
                last_seven_days += 1;
            }
        }

        Ok(SubmissionStats {
            total: rows.len(),
            by_calculator,
            by_follow_up_status,
            last_seven_days,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
