use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ContributionStatus, GithubHandle, LedgerEntry, PendingContribution};
use utoipa::ToSchema;

use crate::leaderboard::RankedUser;

#[derive(Clone, Debug, Serialize, Deserialize, Default, ToSchema)]
#[aliases(PaginatedLeaderboardResponse = PaginatedResponse<LeaderboardRowResponse>)]
pub struct PaginatedResponse<T: Serialize> {
    pub records: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub limit: u64,
    pub total_records: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(records: Vec<T>, page: u64, limit: u64, total_records: u64) -> Self {
        let extra_page = if total_records % limit == 0 { 0 } else { 1 };
        let total_pages = (total_records / limit) + extra_page;
        Self {
            records,
            page,
            total_pages,
            limit,
            total_records,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GithubMeta {
    pub login: String,
    pub name: Option<String>,
    pub image: String,
}

impl GithubMeta {
    pub fn new(login: String, name: Option<String>) -> Self {
        let image = format!("https://github.com/{}.png", login);
        Self { login, name, image }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ContributionResponse {
    pub id: u64,
    pub user: GithubMeta,
    pub repo_url: String,
    pub pull_request_link: String,
    pub number: u64,
    pub title: String,
    pub merged_at: DateTime<Utc>,
    pub suggested_points: u32,
    pub adjusted_points: Option<u32>,
    pub effective_points: u32,
    pub status: String,
    pub reviewer: Option<GithubHandle>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl From<PendingContribution> for ContributionResponse {
    fn from(record: PendingContribution) -> Self {
        let pull_request_link = format!("{}/pull/{}", record.repo_url, record.number);
        let (reviewer, reviewed_at, rejection_reason) = match &record.status {
            ContributionStatus::Pending => (None, None, None),
            ContributionStatus::Approved {
                reviewer,
                reviewed_at,
            } => (Some(reviewer.clone()), Some(*reviewed_at), None),
            ContributionStatus::Rejected { reason } => (None, None, reason.clone()),
        };

        Self {
            id: record.id,
            user: GithubMeta::new(record.user.clone(), None),
            pull_request_link,
            number: record.number,
            merged_at: record.merged_at,
            suggested_points: record.suggested_points,
            adjusted_points: record.adjusted_points,
            effective_points: record.effective_points(),
            status: record.status.label().to_string(),
            reviewer,
            reviewed_at,
            rejection_reason,
            repo_url: record.repo_url,
            title: record.title,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitRequest {
    pub user: GithubHandle,
    #[serde(alias = "repoUrl")]
    pub repo_url: String,
    pub number: u64,
    pub title: String,
    #[serde(alias = "mergedAt")]
    pub merged_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub created: bool,
    pub id: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SyncRequest {
    #[serde(default, alias = "createBackup")]
    pub create_backup: bool,
}

/// What a user's ledger would look like if the previewed record counted.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PreviewResponse {
    pub user: GithubHandle,
    pub total_points: u32,
    pub badge: Option<String>,
    pub activity_badge: Option<String>,
    pub counted_contributions: usize,
}

impl PreviewResponse {
    pub fn new(user: GithubHandle, ledger: LedgerEntry) -> Self {
        Self {
            user,
            total_points: ledger.total_points,
            badge: ledger.badge,
            activity_badge: ledger.activity_badge,
            counted_contributions: ledger.contributions.len(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardRowResponse {
    pub place: u32,
    pub user: GithubMeta,
    pub total_points: u32,
    pub badge: Option<String>,
    pub activity_badge: Option<String>,
    pub contributions: usize,
    pub last_merged_at: Option<DateTime<Utc>>,
}

impl From<RankedUser> for LeaderboardRowResponse {
    fn from(ranked: RankedUser) -> Self {
        let ledger = &ranked.user.ledger;
        Self {
            place: ranked.place,
            total_points: ledger.total_points,
            badge: ledger.badge.clone(),
            activity_badge: ledger.activity_badge.clone(),
            contributions: ledger.contributions.len(),
            last_merged_at: ledger.latest_merge(),
            user: GithubMeta::new(ranked.user.login, ranked.user.full_name),
        }
    }
}
