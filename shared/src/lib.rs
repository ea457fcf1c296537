use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod contribution;
mod scoring;

pub use contribution::*;
pub use scoring::*;

pub type GithubHandle = String;

/// A community member known to the program. Created by the external
/// identity collaborator on first authentication; this pipeline only reads
/// the roster and overwrites ledgers during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub login: GithubHandle,
    pub full_name: Option<String>,
    #[serde(default)]
    pub ledger: LedgerEntry,
}

impl User {
    pub fn new(login: GithubHandle, full_name: Option<String>) -> Self {
        Self {
            login,
            full_name,
            ledger: LedgerEntry::default(),
        }
    }
}

/// A repository accepted into the program by the external repository-review
/// process. Contributions to it earn `points` per merged pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcceptedRepository {
    pub url: String,
    pub owner_login: GithubHandle,
    pub points: u32,
}

/// A user's authoritative score. Derived data: the reconciliation pass is
/// the only writer and always writes by full recomputation, never by
/// increment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub total_points: u32,
    pub badge: Option<String>,
    pub activity_badge: Option<String>,
    pub contributions: Vec<CountedContribution>,
}

impl LedgerEntry {
    pub fn is_empty(&self) -> bool {
        self.total_points == 0 && self.contributions.is_empty() && self.badge.is_none()
    }

    /// Most recent merge among counted contributions, used as the
    /// leaderboard tie-breaker.
    pub fn latest_merge(&self) -> Option<DateTime<Utc>> {
        self.contributions.iter().map(|c| c.merged_at).max()
    }
}

/// One approved contribution as counted toward a ledger total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountedContribution {
    pub contribution_id: u64,
    pub repo_url: String,
    pub number: u64,
    pub points: u32,
    pub merged_at: DateTime<Utc>,
}
