use itertools::Itertools;
use shared::User;

/// Read-only projection of the authoritative ledgers, recomputed on read.
#[derive(Debug, Clone)]
pub struct RankedUser {
    pub place: u32,
    pub user: User,
}

/// Descending by total points; exact point ties break toward the later
/// most-recent merge, so recency rewards a tie but never beats a higher
/// score. Places are 1-based and contiguous.
pub fn rank(users: Vec<User>) -> Vec<RankedUser> {
    users
        .into_iter()
        .sorted_by(|a, b| {
            b.ledger
                .total_points
                .cmp(&a.ledger.total_points)
                .then_with(|| b.ledger.latest_merge().cmp(&a.ledger.latest_merge()))
                .then_with(|| a.login.cmp(&b.login))
        })
        .enumerate()
        .map(|(index, user)| RankedUser {
            place: index as u32 + 1,
            user,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use shared::{CountedContribution, LedgerEntry};

    use super::*;

    fn merged(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()
    }

    fn user(login: &str, points: u32, merges: &[u32]) -> User {
        let mut user = User::new(login.to_string(), None);
        user.ledger = LedgerEntry {
            total_points: points,
            badge: None,
            activity_badge: None,
            contributions: merges
                .iter()
                .enumerate()
                .map(|(i, day)| CountedContribution {
                    contribution_id: i as u64 + 1,
                    repo_url: "https://github.com/acme/widget".to_string(),
                    number: i as u64 + 1,
                    points: 0,
                    merged_at: merged(*day),
                })
                .collect(),
        };
        user
    }

    fn logins(ranked: &[RankedUser]) -> Vec<&str> {
        ranked.iter().map(|r| r.user.login.as_str()).collect()
    }

    #[test]
    fn higher_points_rank_strictly_above() {
        let ranked = rank(vec![
            user("low", 10, &[28]),
            user("high", 100, &[1]),
            user("mid", 50, &[15]),
        ]);
        assert_eq!(vec!["high", "mid", "low"], logins(&ranked));
        assert_eq!(vec![1, 2, 3], ranked.iter().map(|r| r.place).collect::<Vec<_>>());
    }

    #[test]
    fn exact_ties_break_toward_the_later_merge() {
        let ranked = rank(vec![user("early", 50, &[1, 3]), user("late", 50, &[2, 20])]);
        assert_eq!(vec!["late", "early"], logins(&ranked));
    }

    #[test]
    fn recency_never_beats_points() {
        let ranked = rank(vec![user("recent", 40, &[28]), user("steady", 50, &[1])]);
        assert_eq!(vec!["steady", "recent"], logins(&ranked));
    }

    #[test]
    fn places_are_contiguous_even_on_full_ties() {
        let ranked = rank(vec![
            user("a", 50, &[5]),
            user("b", 50, &[5]),
            user("c", 50, &[5]),
        ]);
        assert_eq!(vec![1, 2, 3], ranked.iter().map(|r| r.place).collect::<Vec<_>>());
    }
}
