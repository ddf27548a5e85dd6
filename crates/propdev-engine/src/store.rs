//! Document-store boundary.
//!
//! The production deployment backs these traits with a reactive document
//! store; each method maps to one indexed lookup or one atomic single-record
//! mutation. No multi-record transactions are assumed: concurrent patches
//! race last-write-wins per field, which is safe across steps of the same
//! deal because each step writes a disjoint field. [`MemoryStore`] is the
//! in-process reference implementation used by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::deal::{Deal, DealId, DealPatch, DealStatus};
use crate::identity::{UserId, UserRecord};
use crate::submissions::{CalculatorSubmission, SubmissionId, SubmissionPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn poisoned(map: &str) -> StoreError {
    StoreError::Backend(format!("{map} lock poisoned"))
}

/// Identity-token to user-row mapping.
pub trait UserStore {
    fn user_by_token(&self, token_identifier: &str) -> StoreResult<Option<UserRecord>>;
    fn user_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>>;
    fn insert_user(&self, user: UserRecord) -> StoreResult<()>;
}

/// Deal records and their secondary indexes.
pub trait DealStore {
    fn insert_deal(&self, deal: Deal) -> StoreResult<()>;
    fn deal(&self, id: DealId) -> StoreResult<Option<Deal>>;
    /// Owner's deals, newest first.
    fn deals_by_owner(&self, owner: UserId) -> StoreResult<Vec<Deal>>;
    fn deals_by_status(&self, status: DealStatus) -> StoreResult<Vec<Deal>>;
    /// Apply a partial update. Returns false when the deal does not exist.
    fn patch_deal(&self, id: DealId, patch: DealPatch) -> StoreResult<bool>;
    /// Returns false when the deal does not exist.
    fn delete_deal(&self, id: DealId) -> StoreResult<bool>;
}

/// Calculator submission rows and their secondary indexes.
pub trait SubmissionStore {
    fn insert_submission(&self, submission: CalculatorSubmission) -> StoreResult<()>;
    fn submission(&self, id: SubmissionId) -> StoreResult<Option<CalculatorSubmission>>;
    /// The dedupe lookup: one row per (user, slug) for identified users.
    fn submission_by_user_and_slug(
        &self,
        user: UserId,
        calculator_slug: &str,
    ) -> StoreResult<Option<CalculatorSubmission>>;
    /// Apply a partial update. Returns false when the row does not exist.
    fn patch_submission(&self, id: SubmissionId, patch: SubmissionPatch) -> StoreResult<bool>;
    /// Newest first, optionally limited and filtered by follow-up status.
    fn list_submissions(
        &self,
        limit: Option<usize>,
        follow_up_status: Option<&str>,
    ) -> StoreResult<Vec<CalculatorSubmission>>;
    /// Every row, for aggregate stats.
    fn all_submissions(&self) -> StoreResult<Vec<CalculatorSubmission>>;
}

// ---------------------------------------------------------------------------
// In-memory reference implementation
// ---------------------------------------------------------------------------

/// RwLock'd maps standing in for the document store.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    deals: RwLock<HashMap<DealId, Deal>>,
    submissions: RwLock<HashMap<SubmissionId, CalculatorSubmission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a user row directly; stands in for the external user
    /// provisioning collaborator. Get-or-create keyed by identity token.
    pub fn provision_user(&self, user: UserRecord) -> StoreResult<UserId> {
        let mut users = self.users.write().map_err(|_| poisoned("user map"))?;
        if let Some(existing) = users
            .values()
            .find(|u| u.token_identifier == user.token_identifier)
        {
            return Ok(existing.id);
        }
        let id = user.id;
        users.insert(id, user);
        Ok(id)
    }
}

fn newest_first<T, F: Fn(&T) -> DateTime<Utc>>(items: &mut [T], created_at: F) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

impl UserStore for MemoryStore {
    fn user_by_token(&self, token_identifier: &str) -> StoreResult<Option<UserRecord>> {
        let users = self.users.read().map_err(|_| poisoned("user map"))?;
        Ok(users
            .values()
            .find(|u| u.token_identifier == token_identifier)
            .cloned())
    }

    fn user_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        let users = self.users.read().map_err(|_| poisoned("user map"))?;
        Ok(users.get(&id).cloned())
    }

    fn insert_user(&self, user: UserRecord) -> StoreResult<()> {
        self.users
            .write()
            .map_err(|_| poisoned("user map"))?
            .insert(user.id, user);
        Ok(())
    }
}

impl DealStore for MemoryStore {
    fn insert_deal(&self, deal: Deal) -> StoreResult<()> {
        self.deals
            .write()
            .map_err(|_| poisoned("deal map"))?
            .insert(deal.id, deal);
        Ok(())
    }

    fn deal(&self, id: DealId) -> StoreResult<Option<Deal>> {
        Ok(self.deals.read().map_err(|_| poisoned("deal map"))?.get(&id).cloned())
    }

    fn deals_by_owner(&self, owner: UserId) -> StoreResult<Vec<Deal>> {
        let deals = self.deals.read().map_err(|_| poisoned("deal map"))?;
        let mut owned: Vec<Deal> = deals.values().filter(|d| d.owner == owner).cloned().collect();
        newest_first(&mut owned, |d| d.created_at);
        Ok(owned)
    }

    fn deals_by_status(&self, status: DealStatus) -> StoreResult<Vec<Deal>> {
        let deals = self.deals.read().map_err(|_| poisoned("deal map"))?;
        let mut matching: Vec<Deal> =
            deals.values().filter(|d| d.status == status).cloned().collect();
        newest_first(&mut matching, |d| d.created_at);
        Ok(matching)
    }

    fn patch_deal(&self, id: DealId, patch: DealPatch) -> StoreResult<bool> {
        let mut deals = self.deals.write().map_err(|_| poisoned("deal map"))?;
        let Some(deal) = deals.get_mut(&id) else {
            return Ok(false);
        };

        if let Some(status) = patch.status {
            deal.status = status;
        }
        if let Some(step) = patch.current_step {
            deal.current_step = step;
        }
        if let Some(pd) = patch.pd_data {
            deal.pd_data = Some(pd);
        }
        if let Some(gdv) = patch.gdv_data {
            deal.gdv_data = Some(gdv);
        }
        if let Some(bc) = patch.build_cost_data {
            deal.build_cost_data = Some(bc);
        }
        if let Some(fin) = patch.finance_data {
            deal.finance_data = Some(fin);
        }
        if let Some(updated_at) = patch.updated_at {
            deal.updated_at = updated_at;
        }

        Ok(true)
    }

    fn delete_deal(&self, id: DealId) -> StoreResult<bool> {
        Ok(self
            .deals
            .write()
            .map_err(|_| poisoned("deal map"))?
            .remove(&id)
            .is_some())
    }
}

impl SubmissionStore for MemoryStore {
    fn insert_submission(&self, submission: CalculatorSubmission) -> StoreResult<()> {
        self.submissions
            .write()
            .map_err(|_| poisoned("submission map"))?
            .insert(submission.id, submission);
        Ok(())
    }

    fn submission(&self, id: SubmissionId) -> StoreResult<Option<CalculatorSubmission>> {
        let submissions = self.submissions.read().map_err(|_| poisoned("submission map"))?;
        Ok(submissions.get(&id).cloned())
    }

    fn submission_by_user_and_slug(
        &self,
        user: UserId,
        calculator_slug: &str,
    ) -> StoreResult<Option<CalculatorSubmission>> {
        let submissions = self.submissions.read().map_err(|_| poisoned("submission map"))?;
        Ok(submissions
            .values()
            .find(|s| s.user == Some(user) && s.calculator_slug == calculator_slug)
            .cloned())
    }

    fn patch_submission(&self, id: SubmissionId, patch: SubmissionPatch) -> StoreResult<bool> {
        let mut submissions = self.submissions.write().map_err(|_| poisoned("submission map"))?;
        let Some(row) = submissions.get_mut(&id) else {
            return Ok(false);
        };

        if let Some(form_data) = patch.form_data {
            row.form_data = form_data;
        }
        if let Some(source) = patch.source {
            row.source = Some(source);
        }
        if let Some(status) = patch.follow_up_status {
            row.follow_up_status = status;
        }
        if let Some(notes) = patch.follow_up_notes {
            row.follow_up_notes = Some(notes);
        }
        if let Some(updated_at) = patch.updated_at {
            row.updated_at = updated_at;
        }

        Ok(true)
    }

    fn list_submissions(
        &self,
        limit: Option<usize>,
        follow_up_status: Option<&str>,
    ) -> StoreResult<Vec<CalculatorSubmission>> {
        let submissions = self.submissions.read().map_err(|_| poisoned("submission map"))?;
        let mut rows: Vec<CalculatorSubmission> = submissions
            .values()
            .filter(|s| follow_up_status.is_none_or(|f| s.follow_up_status == f))
            .cloned()
            .collect();
        newest_first(&mut rows, |s| s.created_at);
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn all_submissions(&self) -> StoreResult<Vec<CalculatorSubmission>> {
        let submissions = self.submissions.read().map_err(|_| poisoned("submission map"))?;
        Ok(submissions.values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{Deal, DealPatch, DealStatus};
    use crate::identity::Identity;
    use chrono::{Duration, Utc};

    fn provisioned_user(store: &MemoryStore, token: &str) -> UserId {
        let identity = Identity {
            token_identifier: token.into(),
            display_name: None,
            email: None,
        };
        store
            .provision_user(UserRecord::from_identity(&identity))
            .unwrap()
    }

    #[test]
    fn test_user_lookup_by_token_and_id() {
        let store = MemoryStore::new();
        let id = provisioned_user(&store, "token|abc");

        let by_token = store.user_by_token("token|abc").unwrap().unwrap();
        assert_eq!(by_token.id, id);
        assert!(store.user_by_token("token|missing").unwrap().is_none());
        assert!(store.user_by_id(id).unwrap().is_some());
    }

    #[test]
    fn test_reprovisioning_keeps_one_row_per_token() {
        let store = MemoryStore::new();
        let first = provisioned_user(&store, "token|abc");
        let second = provisioned_user(&store, "token|abc");
        assert_eq!(first, second);
    }

    #[test]
    fn test_patch_unknown_deal_returns_false() {
        let store = MemoryStore::new();
        let patch = DealPatch {
            status: Some(DealStatus::Complete),
            ..DealPatch::default()
        };
        assert!(!store.patch_deal(DealId::new(), patch).unwrap());
    }

    #[test]
    fn test_delete_unknown_deal_returns_false() {
        let store = MemoryStore::new();
        assert!(!store.delete_deal(DealId::new()).unwrap());
    }

    #[test]
    fn test_deals_by_owner_newest_first() {
        let store = MemoryStore::new();
        let owner = provisioned_user(&store, "token|abc");

        let mut older = Deal::new(owner, "Older".into(), "1 High St".into(), None);
        older.created_at = Utc::now() - Duration::hours(2);
        let mut newer = Deal::new(owner, "Newer".into(), "2 High St".into(), None);
        newer.created_at = Utc::now() - Duration::hours(1);

        store.insert_deal(older).unwrap();
        store.insert_deal(newer).unwrap();

        let listed = store.deals_by_owner(owner).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Newer");
        assert_eq!(listed[1].name, "Older");
    }

    #[test]
    fn test_deals_by_owner_scopes_to_owner() {
        let store = MemoryStore::new();
        let a = provisioned_user(&store, "token|a");
        let b = provisioned_user(&store, "token|b");

        store
            .insert_deal(Deal::new(a, "Mine".into(), "1 High St".into(), None))
            .unwrap();
        store
            .insert_deal(Deal::new(b, "Theirs".into(), "2 High St".into(), None))
            .unwrap();

        let listed = store.deals_by_owner(a).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Mine");
    }

    #[test]
    fn test_deals_by_status_filters() {
        let store = MemoryStore::new();
        let owner = provisioned_user(&store, "token|abc");

        let mut done = Deal::new(owner, "Done".into(), "1 High St".into(), None);
        done.status = DealStatus::Complete;
        store.insert_deal(done).unwrap();
        store
            .insert_deal(Deal::new(owner, "Open".into(), "2 High St".into(), None))
            .unwrap();

        let complete = store.deals_by_status(DealStatus::Complete).unwrap();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].name, "Done");
    }

    #[test]
    fn test_patch_unknown_submission_returns_false() {
        let store = MemoryStore::new();
        let patch = SubmissionPatch {
            follow_up_status: Some("contacted".into()),
            ..SubmissionPatch::default()
        };
        assert!(!store
            .patch_submission(SubmissionId::new(), patch)
            .unwrap());
    }
}
