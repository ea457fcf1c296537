use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GithubHandle;

/// Review lifecycle of a candidate contribution. Modelled as a closed
/// variant so illegal transitions are unrepresentable: `Pending` may move
/// to `Approved` or `Rejected`, `Approved` only ever changes its adjusted
/// points, `Rejected` may only be deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Approved {
        reviewer: GithubHandle,
        reviewed_at: DateTime<Utc>,
    },
    Rejected {
        reason: Option<String>,
    },
}

impl ContributionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ContributionStatus::Pending)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ContributionStatus::Approved { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ContributionStatus::Rejected { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Approved { .. } => "approved",
            ContributionStatus::Rejected { .. } => "rejected",
        }
    }
}

/// The review unit: one merged pull request queued for a human decision.
///
/// `suggested_points` is copied from the repository's configured value at
/// submission time and never changes afterwards; reviewers adjust
/// `adjusted_points` instead so the original suggestion stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingContribution {
    pub id: u64,
    pub user: GithubHandle,
    pub repo_url: String,
    pub number: u64,
    pub title: String,
    pub merged_at: DateTime<Utc>,
    pub suggested_points: u32,
    pub adjusted_points: Option<u32>,
    #[serde(flatten)]
    pub status: ContributionStatus,
}

impl PendingContribution {
    /// Uniqueness tuple: a contribution is queued at most once per
    /// (user, repository, PR number).
    pub fn key(&self) -> (GithubHandle, String, u64) {
        (self.user.clone(), self.repo_url.clone(), self.number)
    }

    /// Points this record contributes to a ledger: the reviewer's
    /// adjustment when present, the intake-time suggestion otherwise.
    pub fn effective_points(&self) -> u32 {
        self.adjusted_points.unwrap_or(self.suggested_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(adjusted: Option<u32>) -> PendingContribution {
        PendingContribution {
            id: 1,
            user: "alice".to_string(),
            repo_url: "https://github.com/acme/widget".to_string(),
            number: 10,
            title: "Fix widget".to_string(),
            merged_at: Utc::now(),
            suggested_points: 50,
            adjusted_points: adjusted,
            status: ContributionStatus::Pending,
        }
    }

    #[test]
    fn effective_points_prefers_adjustment() {
        assert_eq!(50, contribution(None).effective_points());
        assert_eq!(75, contribution(Some(75)).effective_points());
        assert_eq!(0, contribution(Some(0)).effective_points());
    }

    #[test]
    fn status_serializes_as_tagged_variant() {
        let rejected = ContributionStatus::Rejected {
            reason: Some("duplicate".to_string()),
        };
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "duplicate");
        assert_eq!("rejected", rejected.label());
    }
}
