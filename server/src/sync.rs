use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{compute_ledger, GithubHandle, LedgerEntry, PendingContribution};
use tracing::instrument;
use utoipa::ToSchema;

use crate::db::{types::LedgerBackup, DB};

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncReport {
    pub users_processed: usize,
    pub approved_considered: usize,
    pub users_changed: Vec<GithubHandle>,
    pub errors: Vec<SyncError>,
    pub validation: ValidationReport,
    pub backup: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncError {
    pub login: GithubHandle,
    pub message: String,
}

/// Cross-check between storage and the rewritten ledgers. A mismatch
/// signals corrupted data (most commonly approved records owned by a login
/// that is not in the roster); it is surfaced for a human, never fixed
/// silently.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationReport {
    pub approved_in_storage: usize,
    pub counted_in_ledgers: usize,
    pub orphaned: Vec<OrphanedRecord>,
    pub consistent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrphanedRecord {
    pub login: GithubHandle,
    pub repo_url: String,
    pub number: u64,
}

/// Recomputes every user's ledger from their full approved set and
/// overwrites it, never increments. Each output depends only on durable
/// approved records, so re-running the sync, or resuming after a crash,
/// converges to the same ledgers.
#[instrument(skip(db))]
pub async fn reconcile(db: &DB, create_backup: bool) -> SyncReport {
    let started = Instant::now();
    let snapshot = db.reconcile_snapshot().await;
    let mut approved_by_user = snapshot.approved_by_user;

    // Users with approved records get a recompute; users left with a stale
    // non-empty ledger get reset. Everyone else is untouched.
    let work: Vec<(GithubHandle, LedgerEntry, Vec<PendingContribution>)> = snapshot
        .users
        .into_iter()
        .filter_map(|user| {
            let approved = approved_by_user.remove(&user.login).unwrap_or_default();
            if approved.is_empty() && user.ledger.is_empty() {
                None
            } else {
                Some((user.login, user.ledger, approved))
            }
        })
        .collect();

    let backup = if create_backup && !work.is_empty() {
        let taken_at = Utc::now();
        db.store_backup(LedgerBackup {
            taken_at,
            ledgers: work
                .iter()
                .map(|(login, prior, _)| (login.clone(), prior.clone()))
                .collect::<HashMap<_, _>>(),
        })
        .await;
        Some(taken_at)
    } else {
        None
    };

    let mut users_changed = Vec::new();
    let mut errors = Vec::new();
    for (login, _, approved) in &work {
        let ledger = compute_ledger(approved);
        match db.overwrite_ledger(login, ledger).await {
            Some(true) => users_changed.push(login.clone()),
            Some(false) => {}
            None => errors.push(SyncError {
                login: login.clone(),
                message: "user disappeared from the roster mid-run".to_string(),
            }),
        }
    }

    let counted_in_ledgers = db.counted_in_ledgers().await;
    let orphaned: Vec<OrphanedRecord> = approved_by_user
        .into_values()
        .flatten()
        .map(|record| OrphanedRecord {
            login: record.user,
            repo_url: record.repo_url,
            number: record.number,
        })
        .collect();
    let consistent =
        snapshot.approved_total == counted_in_ledgers && orphaned.is_empty() && errors.is_empty();

    if !consistent {
        tracing::warn!(
            "Reconciliation found inconsistencies: {} approved in storage, {} counted, {} orphaned",
            snapshot.approved_total,
            counted_in_ledgers,
            orphaned.len()
        );
    }

    SyncReport {
        users_processed: work.len(),
        approved_considered: snapshot.approved_total,
        users_changed,
        errors,
        validation: ValidationReport {
            approved_in_storage: snapshot.approved_total,
            counted_in_ledgers,
            orphaned,
            consistent,
        },
        backup,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}
