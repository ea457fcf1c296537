use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rocket::fairing::AdHoc;
use rocket::tokio::sync::RwLock;
use shared::{
    AcceptedRepository, ContributionStatus, GithubHandle, LedgerEntry, PendingContribution, User,
};

use crate::error::ApiError;

pub mod types;

use types::{LedgerBackup, NewContribution, ReconcileSnapshot, Submitted};

/// Key-indexed document store behind the pipeline. The engine itself is
/// out of scope; every operation the pipeline needs is expressed as one
/// async method here, and all of them go through a single `RwLock` so the
/// conditional insert and the review transitions are atomic.
#[derive(Clone, Default)]
pub struct DB {
    store: Arc<RwLock<Store>>,
}

#[derive(Default)]
struct Store {
    users: HashMap<GithubHandle, User>,
    repos: HashMap<String, AcceptedRepository>,
    contributions: HashMap<u64, PendingContribution>,
    // Uniqueness index over (user, repo_url, number).
    by_tuple: HashMap<(GithubHandle, String, u64), u64>,
    backups: Vec<LedgerBackup>,
    next_id: u64,
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Document store", |rocket| async {
        rocket.manage(DB::default())
    })
}

impl DB {
    // --- roster and repository registry (populated by external collaborators) ---

    pub async fn upsert_user(&self, login: &str, full_name: Option<String>) {
        let mut store = self.store.write().await;
        store
            .users
            .entry(login.to_string())
            .and_modify(|user| user.full_name = full_name.clone())
            .or_insert_with(|| User::new(login.to_string(), full_name));
    }

    pub async fn get_users(&self) -> Vec<User> {
        let store = self.store.read().await;
        let mut users: Vec<_> = store.users.values().cloned().collect();
        users.sort_by(|a, b| a.login.cmp(&b.login));
        users
    }

    pub async fn upsert_repo(&self, repo: AcceptedRepository) {
        let mut store = self.store.write().await;
        store.repos.insert(repo.url.clone(), repo);
    }

    pub async fn get_repo(&self, url: &str) -> Option<AcceptedRepository> {
        self.store.read().await.repos.get(url).cloned()
    }

    pub async fn get_accepted_repos(&self) -> HashMap<String, AcceptedRepository> {
        self.store.read().await.repos.clone()
    }

    // --- submission intake ---

    /// Conditional insert keyed on the uniqueness tuple. A second call for
    /// the same (user, repo, number) is a no-op returning `created: false`,
    /// which is what makes repeated scans safe.
    pub async fn submit_contribution(&self, new: NewContribution) -> Submitted {
        let mut store = self.store.write().await;
        let key = (new.user.clone(), new.repo_url.clone(), new.number);
        if let Some(&id) = store.by_tuple.get(&key) {
            return Submitted { created: false, id };
        }

        store.next_id += 1;
        let id = store.next_id;
        store.contributions.insert(
            id,
            PendingContribution {
                id,
                user: new.user,
                repo_url: new.repo_url,
                number: new.number,
                title: new.title,
                merged_at: new.merged_at,
                suggested_points: new.suggested_points,
                adjusted_points: None,
                status: ContributionStatus::Pending,
            },
        );
        store.by_tuple.insert(key, id);
        Submitted { created: true, id }
    }

    pub async fn get_contribution(&self, id: u64) -> Option<PendingContribution> {
        self.store.read().await.contributions.get(&id).cloned()
    }

    pub async fn list_all(&self) -> Vec<PendingContribution> {
        self.list_where(|_| true).await
    }

    pub async fn list_pending(&self) -> Vec<PendingContribution> {
        self.list_where(|c| c.status.is_pending()).await
    }

    pub async fn list_rejected(&self) -> Vec<PendingContribution> {
        self.list_where(|c| c.status.is_rejected()).await
    }

    pub async fn list_for_user(&self, login: &str) -> Vec<PendingContribution> {
        self.list_where(|c| c.user == login).await
    }

    async fn list_where(
        &self,
        predicate: impl Fn(&PendingContribution) -> bool,
    ) -> Vec<PendingContribution> {
        let store = self.store.read().await;
        let mut records: Vec<_> = store
            .contributions
            .values()
            .filter(|c| predicate(c))
            .cloned()
            .collect();
        records.sort_by_key(|c| c.id);
        records
    }

    // --- review state machine ---
    //
    // Each operation re-checks its precondition under the write lock and
    // answers with a conflict instead of overriding a state that moved
    // underneath the caller.

    pub async fn approve(&self, id: u64, reviewer: &str) -> Result<PendingContribution, ApiError> {
        let mut store = self.store.write().await;
        let record = store
            .contributions
            .get_mut(&id)
            .ok_or(ApiError::NotFound(id))?;
        if !record.status.is_pending() {
            return Err(ApiError::Conflict(format!(
                "contribution {id} is {}, only pending records can be approved",
                record.status.label()
            )));
        }
        record.status = ContributionStatus::Approved {
            reviewer: reviewer.to_string(),
            reviewed_at: Utc::now(),
        };
        Ok(record.clone())
    }

    pub async fn reject(
        &self,
        id: u64,
        reason: Option<String>,
    ) -> Result<PendingContribution, ApiError> {
        let mut store = self.store.write().await;
        let record = store
            .contributions
            .get_mut(&id)
            .ok_or(ApiError::NotFound(id))?;
        if !record.status.is_pending() {
            return Err(ApiError::Conflict(format!(
                "contribution {id} is {}, only pending records can be rejected",
                record.status.label()
            )));
        }
        record.status = ContributionStatus::Rejected { reason };
        Ok(record.clone())
    }

    /// Overwrites the adjusted-points field of an approved record. The
    /// intake-time suggestion is never touched.
    pub async fn adjust_points(
        &self,
        id: u64,
        points: u32,
    ) -> Result<PendingContribution, ApiError> {
        let mut store = self.store.write().await;
        let record = store
            .contributions
            .get_mut(&id)
            .ok_or(ApiError::NotFound(id))?;
        if !record.status.is_approved() {
            return Err(ApiError::Conflict(format!(
                "contribution {id} is {}, only approved records can be adjusted",
                record.status.label()
            )));
        }
        record.adjusted_points = Some(points);
        Ok(record.clone())
    }

    /// Removes a rejected record. Approved records are the audit trail the
    /// ledger is recomputed from and are never deletable.
    pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
        let mut store = self.store.write().await;
        let record = store.contributions.get(&id).ok_or(ApiError::NotFound(id))?;
        if !record.status.is_rejected() {
            return Err(ApiError::Conflict(format!(
                "contribution {id} is {}, only rejected records can be deleted",
                record.status.label()
            )));
        }
        let key = record.key();
        store.contributions.remove(&id);
        store.by_tuple.remove(&key);
        Ok(())
    }

    // --- reconciliation support ---

    /// One consistent view of the roster and all approved records, read
    /// under a single lock acquisition.
    pub async fn reconcile_snapshot(&self) -> ReconcileSnapshot {
        let store = self.store.read().await;
        let mut approved_by_user: HashMap<GithubHandle, Vec<PendingContribution>> = HashMap::new();
        let mut approved_total = 0;
        for record in store.contributions.values() {
            if record.status.is_approved() {
                approved_total += 1;
                approved_by_user
                    .entry(record.user.clone())
                    .or_default()
                    .push(record.clone());
            }
        }
        let mut users: Vec<_> = store.users.values().cloned().collect();
        users.sort_by(|a, b| a.login.cmp(&b.login));
        ReconcileSnapshot {
            users,
            approved_by_user,
            approved_total,
        }
    }

    /// Full replacement of a user's ledger. Returns whether the stored
    /// value changed, or `None` when the user is no longer in the roster.
    pub async fn overwrite_ledger(&self, login: &str, ledger: LedgerEntry) -> Option<bool> {
        let mut store = self.store.write().await;
        let user = store.users.get_mut(login)?;
        let changed = user.ledger != ledger;
        user.ledger = ledger;
        Some(changed)
    }

    /// Contributions currently counted across all roster ledgers; compared
    /// against the approved-record count in the sync validation block.
    pub async fn counted_in_ledgers(&self) -> usize {
        let store = self.store.read().await;
        store
            .users
            .values()
            .map(|user| user.ledger.contributions.len())
            .sum()
    }

    pub async fn store_backup(&self, backup: LedgerBackup) {
        self.store.write().await.backups.push(backup);
    }

    pub async fn latest_backup(&self) -> Option<LedgerBackup> {
        self.store.read().await.backups.last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn submission(user: &str, number: u64) -> NewContribution {
        NewContribution {
            user: user.to_string(),
            repo_url: "https://github.com/acme/widget".to_string(),
            number,
            title: format!("change {number}"),
            merged_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            suggested_points: 50,
        }
    }

    #[rocket::async_test]
    async fn conditional_insert_deduplicates() {
        let db = DB::default();
        let first = db.submit_contribution(submission("alice", 10)).await;
        let second = db.submit_contribution(submission("alice", 10)).await;

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(1, db.list_pending().await.len());
    }

    #[rocket::async_test]
    async fn deleted_tuple_can_be_resubmitted() {
        let db = DB::default();
        let first = db.submit_contribution(submission("alice", 10)).await;
        db.reject(first.id, None).await.unwrap();
        db.delete(first.id).await.unwrap();

        let again = db.submit_contribution(submission("alice", 10)).await;
        assert!(again.created);
        assert_ne!(first.id, again.id);
    }

    #[rocket::async_test]
    async fn review_preconditions_are_enforced() {
        let db = DB::default();
        let id = db.submit_contribution(submission("alice", 1)).await.id;

        db.approve(id, "admin").await.unwrap();
        assert!(matches!(
            db.approve(id, "admin").await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            db.reject(id, None).await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(db.delete(id).await, Err(ApiError::Conflict(_))));

        assert!(matches!(
            db.approve(9999, "admin").await,
            Err(ApiError::NotFound(9999))
        ));
    }

    #[rocket::async_test]
    async fn adjustment_requires_approved_state() {
        let db = DB::default();
        let id = db.submit_contribution(submission("alice", 1)).await.id;
        assert!(matches!(
            db.adjust_points(id, 75).await,
            Err(ApiError::Conflict(_))
        ));

        db.approve(id, "admin").await.unwrap();
        let record = db.adjust_points(id, 75).await.unwrap();
        assert_eq!(Some(75), record.adjusted_points);
        assert_eq!(50, record.suggested_points);
        assert_eq!(75, record.effective_points());
    }
}
