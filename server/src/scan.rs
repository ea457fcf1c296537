use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rocket::fairing::AdHoc;
use serde::Serialize;
use tracing::instrument;

use crate::db::{types::NewContribution, DB};
use crate::github_pull::GithubClient;

/// One merged pull request as reported by the external source.
#[derive(Debug, Clone)]
pub struct MergedPullRequest {
    pub number: u64,
    pub title: String,
    pub repo_url: String,
    pub merged_at: DateTime<Utc>,
}

/// Seam over the external rate-limited API so the scan can be exercised
/// without the network. The production implementation is
/// [`GithubClient`](crate::github_pull::GithubClient).
#[async_trait]
pub trait ContributionSource: Send + Sync {
    /// Merged pull requests authored by `login`, newest-updated first.
    async fn merged_pull_requests(
        &self,
        login: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MergedPullRequest>>;
}

/// Batch size and inter-batch delay are the backpressure knobs against the
/// external API's rate limit. They trade wall-clock time for throughput
/// safety and stay tunable from configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    pub program_start_date: DateTime<Utc>,
}

impl ScanConfig {
    pub fn new(program_start_date: DateTime<Utc>) -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay: Duration::from_secs(2),
            program_start_date,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub users_scanned: usize,
    pub queued: usize,
    pub skipped: usize,
    pub errors: Vec<ScanError>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ScanError {
    pub login: String,
    pub message: String,
}

/// Walks the full roster in bounded concurrent batches and hands every
/// qualifying merged pull request to the intake. Per-user failures are
/// counted and never abort the batch or the scan; re-running is safe
/// because the intake deduplicates. The cancel flag is honored between
/// batches, in-flight calls run to completion.
#[instrument(skip(source, db, running), fields(batch_size = config.batch_size))]
pub async fn scan(
    source: &dyn ContributionSource,
    db: &DB,
    config: &ScanConfig,
    running: &AtomicBool,
) -> ScanReport {
    let started = Instant::now();
    let users = db.get_users().await;
    let repos = db.get_accepted_repos().await;

    let mut report = ScanReport::default();
    let batch_size = config.batch_size.max(1);
    let batches = users.chunks(batch_size).count();

    for (index, batch) in users.chunks(batch_size).enumerate() {
        if !running.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }

        let results = join_all(batch.iter().map(|user| {
            let login = user.login.clone();
            async move {
                let result = source
                    .merged_pull_requests(&login, config.program_start_date)
                    .await;
                (login, result)
            }
        }))
        .await;

        for (login, result) in results {
            report.users_scanned += 1;
            let prs = match result {
                Ok(prs) => prs,
                Err(e) => {
                    tracing::warn!("Failed to scan {login}: {e:#}");
                    report.errors.push(ScanError {
                        login,
                        message: format!("{e:#}"),
                    });
                    continue;
                }
            };

            for pr in prs {
                if pr.merged_at < config.program_start_date {
                    report.skipped += 1;
                    continue;
                }
                let Some(repo) = repos.get(&pr.repo_url) else {
                    report.skipped += 1;
                    continue;
                };
                let submitted = db
                    .submit_contribution(NewContribution {
                        user: login.clone(),
                        repo_url: pr.repo_url,
                        number: pr.number,
                        title: pr.title,
                        merged_at: pr.merged_at,
                        suggested_points: repo.points,
                    })
                    .await;
                if submitted.created {
                    report.queued += 1;
                }
            }
        }

        if index + 1 < batches {
            rocket::tokio::time::sleep(config.inter_batch_delay).await;
        }
    }

    report.elapsed_ms = started.elapsed().as_millis() as u64;
    report
}

/// Re-runs the scan on an interval until the shared flag is flipped on
/// shutdown.
pub fn stage(
    client: GithubClient,
    config: ScanConfig,
    sleep_duration: Duration,
    running: Arc<AtomicBool>,
) -> AdHoc {
    AdHoc::on_liftoff("Periodic contribution scan", move |rocket| {
        Box::pin(async move {
            let db = rocket
                .state::<DB>()
                .cloned()
                .expect("Failed to get document store");

            rocket::tokio::spawn(async move {
                let mut interval = rocket::tokio::time::interval(sleep_duration);
                while running.load(Ordering::Relaxed) {
                    interval.tick().await;

                    let report = scan(&client, &db, &config, &running).await;
                    if report.errors.is_empty() {
                        tracing::info!(
                            "Scan finished: {} users, {} queued, {} skipped, {}ms",
                            report.users_scanned,
                            report.queued,
                            report.skipped,
                            report.elapsed_ms
                        );
                    } else {
                        tracing::warn!(
                            "Scan finished with {} errors: {} users, {} queued",
                            report.errors.len(),
                            report.users_scanned,
                            report.queued
                        );
                    }
                }
            });
        })
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use chrono::TimeZone;
    use shared::AcceptedRepository;

    use super::*;

    const REPO: &str = "https://github.com/acme/widget";

    struct MockSource {
        prs: HashMap<String, Vec<MergedPullRequest>>,
        failing: HashSet<String>,
    }

    #[async_trait]
    impl ContributionSource for MockSource {
        async fn merged_pull_requests(
            &self,
            login: &str,
            _since: DateTime<Utc>,
        ) -> anyhow::Result<Vec<MergedPullRequest>> {
            if self.failing.contains(login) {
                anyhow::bail!("simulated network failure");
            }
            Ok(self.prs.get(login).cloned().unwrap_or_default())
        }
    }

    fn start_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn config() -> ScanConfig {
        ScanConfig {
            batch_size: 2,
            inter_batch_delay: Duration::ZERO,
            program_start_date: start_date(),
        }
    }

    fn pr(number: u64, repo_url: &str, merged_at: DateTime<Utc>) -> MergedPullRequest {
        MergedPullRequest {
            number,
            title: format!("change {number}"),
            repo_url: repo_url.to_string(),
            merged_at,
        }
    }

    async fn seeded_db(logins: &[&str]) -> DB {
        let db = DB::default();
        for login in logins {
            db.upsert_user(login, None).await;
        }
        db.upsert_repo(AcceptedRepository {
            url: REPO.to_string(),
            owner_login: "acme".to_string(),
            points: 50,
        })
        .await;
        db
    }

    #[rocket::async_test]
    async fn partial_failure_does_not_abort_the_scan() {
        let db = seeded_db(&["alice", "bob", "carol", "dave", "erin"]).await;
        let merged = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let source = MockSource {
            prs: ["alice", "carol", "dave", "erin"]
                .iter()
                .enumerate()
                .map(|(i, login)| (login.to_string(), vec![pr(i as u64 + 1, REPO, merged)]))
                .collect(),
            failing: HashSet::from(["bob".to_string()]),
        };

        let running = AtomicBool::new(true);
        let report = scan(&source, &db, &config(), &running).await;

        assert_eq!(5, report.users_scanned);
        assert_eq!(1, report.errors.len());
        assert_eq!("bob", report.errors[0].login);
        assert_eq!(4, report.queued);
        assert_eq!(4, db.list_pending().await.len());
    }

    #[rocket::async_test]
    async fn filters_pre_program_merges_and_unknown_repos() {
        let db = seeded_db(&["alice"]).await;
        let source = MockSource {
            prs: HashMap::from([(
                "alice".to_string(),
                vec![
                    pr(1, REPO, Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap()),
                    pr(
                        2,
                        "https://github.com/other/repo",
                        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                    ),
                    pr(3, REPO, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
                ],
            )]),
            failing: HashSet::new(),
        };

        let running = AtomicBool::new(true);
        let report = scan(&source, &db, &config(), &running).await;

        assert_eq!(1, report.queued);
        assert_eq!(2, report.skipped);
        let pending = db.list_pending().await;
        assert_eq!(1, pending.len());
        assert_eq!(3, pending[0].number);
        assert_eq!(50, pending[0].suggested_points);
    }

    #[rocket::async_test]
    async fn rescan_queues_nothing_new() {
        let db = seeded_db(&["alice"]).await;
        let merged = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let source = MockSource {
            prs: HashMap::from([("alice".to_string(), vec![pr(1, REPO, merged)])]),
            failing: HashSet::new(),
        };

        let running = AtomicBool::new(true);
        let first = scan(&source, &db, &config(), &running).await;
        let second = scan(&source, &db, &config(), &running).await;

        assert_eq!(1, first.queued);
        assert_eq!(0, second.queued);
        assert_eq!(1, db.list_pending().await.len());
    }

    #[rocket::async_test]
    async fn cancellation_is_honored_between_batches() {
        let db = seeded_db(&["alice", "bob"]).await;
        let source = MockSource {
            prs: HashMap::new(),
            failing: HashSet::new(),
        };

        let running = AtomicBool::new(false);
        let report = scan(&source, &db, &config(), &running).await;

        assert!(report.cancelled);
        assert_eq!(0, report.users_scanned);
    }
}
