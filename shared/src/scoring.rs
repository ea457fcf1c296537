use super::{CountedContribution, LedgerEntry, PendingContribution};

/// A named rank unlocked at a cumulative point threshold. Tiers are
/// totally ordered by threshold; ties resolve to the higher tier.
#[derive(Debug, Clone, Copy)]
pub struct BadgeTier {
    pub name: &'static str,
    pub min_points: u32,
}

/// An independent badge keyed by the number of approved contributions.
#[derive(Debug, Clone, Copy)]
pub struct ActivityBadge {
    pub name: &'static str,
    pub min_contributions: usize,
}

pub const BADGE_TIERS: [BadgeTier; 4] = [
    BadgeTier {
        name: "Bronze",
        min_points: 1,
    },
    BadgeTier {
        name: "Silver",
        min_points: 100,
    },
    BadgeTier {
        name: "Gold",
        min_points: 250,
    },
    BadgeTier {
        name: "Platinum",
        min_points: 500,
    },
];

pub const ACTIVITY_BADGES: [ActivityBadge; 3] = [
    ActivityBadge {
        name: "First Contribution",
        min_contributions: 1,
    },
    ActivityBadge {
        name: "Regular Contributor",
        min_contributions: 5,
    },
    ActivityBadge {
        name: "Core Contributor",
        min_contributions: 15,
    },
];

pub fn badge_for_points(total_points: u32) -> Option<&'static str> {
    BADGE_TIERS
        .iter()
        .rev()
        .find(|tier| tier.min_points <= total_points)
        .map(|tier| tier.name)
}

pub fn activity_badge_for_count(approved: usize) -> Option<&'static str> {
    ACTIVITY_BADGES
        .iter()
        .rev()
        .find(|badge| badge.min_contributions <= approved)
        .map(|badge| badge.name)
}

/// Maps a user's approved contributions to their authoritative ledger.
///
/// Pure computation with no storage knowledge: the reconciliation pass runs
/// it in bulk, review UIs run it for a single-user preview. Records that
/// are not approved are ignored so a caller can never inflate a total with
/// pending or rejected items. Counted contributions are ordered by merge
/// time so repeated runs over the same input produce identical output.
pub fn compute_ledger(contributions: &[PendingContribution]) -> LedgerEntry {
    let mut counted: Vec<CountedContribution> = contributions
        .iter()
        .filter(|c| c.status.is_approved())
        .map(|c| CountedContribution {
            contribution_id: c.id,
            repo_url: c.repo_url.clone(),
            number: c.number,
            points: c.effective_points(),
            merged_at: c.merged_at,
        })
        .collect();
    counted.sort_by_key(|c| (c.merged_at, c.contribution_id));

    let total_points = counted.iter().map(|c| c.points).sum();
    LedgerEntry {
        total_points,
        badge: badge_for_points(total_points).map(str::to_string),
        activity_badge: activity_badge_for_count(counted.len()).map(str::to_string),
        contributions: counted,
    }
}
