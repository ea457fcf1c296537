use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{GithubHandle, LedgerEntry, PendingContribution, User};

/// Intake payload for the conditional insert. `suggested_points` is the
/// owning repository's configured value at submission time.
#[derive(Debug, Clone)]
pub struct NewContribution {
    pub user: GithubHandle,
    pub repo_url: String,
    pub number: u64,
    pub title: String,
    pub merged_at: DateTime<Utc>,
    pub suggested_points: u32,
}

/// Outcome of the conditional insert: `created` is false when the
/// uniqueness tuple already had a record, and `id` points at whichever
/// record now holds the tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submitted {
    pub created: bool,
    pub id: u64,
}

/// Snapshot of prior ledger values taken before a reconciliation run
/// mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerBackup {
    pub taken_at: DateTime<Utc>,
    pub ledgers: HashMap<GithubHandle, LedgerEntry>,
}

/// A stable, consistent view for one reconciliation run: the roster and
/// every approved record grouped by owner, read under a single lock so a
/// concurrent approval is never half-counted.
#[derive(Debug, Clone)]
pub struct ReconcileSnapshot {
    pub users: Vec<User>,
    pub approved_by_user: HashMap<GithubHandle, Vec<PendingContribution>>,
    pub approved_total: usize,
}
