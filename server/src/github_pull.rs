use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use octocrab::{models::issues::Issue, Octocrab};
use tracing::instrument;

use crate::scan::{ContributionSource, MergedPullRequest};

pub struct GithubClient {
    pub octocrab: Octocrab,
}

impl GithubClient {
    pub fn new(github_token: String) -> anyhow::Result<Self> {
        let octocrab = octocrab::Octocrab::builder()
            .personal_token(github_token)
            .build()?;
        Ok(Self { octocrab })
    }

    /// One paginated search per user: merged pull requests authored by
    /// `login`, ordered by last-updated descending. The `merged:>=` filter
    /// keeps pre-program history out of the transfer.
    #[instrument(skip(self))]
    async fn merged_prs_since(&self, login: &str, since: NaiveDate) -> anyhow::Result<Vec<Issue>> {
        let query = format!("is:pr is:merged author:{login} merged:>={since}");
        let mut page = self
            .octocrab
            .search()
            .issues_and_pull_requests(query.as_str())
            .sort("updated")
            .order("desc")
            .per_page(100)
            .send()
            .await?;
        let mut items = page.take_items();
        while let Some(mut next_page) = self.octocrab.get_page(&page.next).await? {
            items.append(&mut next_page.take_items());
            page = next_page;
        }
        Ok(items)
    }
}

// The search API reports repositories as api.github.com resource URLs; the
// registry stores canonical github.com URLs.
fn repo_html_url(api_path: &str) -> String {
    format!("https://github.com/{}", api_path.trim_start_matches("/repos/"))
}

#[async_trait]
impl ContributionSource for GithubClient {
    async fn merged_pull_requests(
        &self,
        login: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MergedPullRequest>> {
        let issues = self.merged_prs_since(login, since.date_naive()).await?;
        Ok(issues
            .into_iter()
            .filter_map(|issue| {
                // Merged pull requests close at merge time; items without a
                // close timestamp are still open and never qualify.
                let merged_at = issue.closed_at?;
                Some(MergedPullRequest {
                    number: issue.number,
                    title: issue.title,
                    repo_url: repo_html_url(issue.repository_url.path()),
                    merged_at,
                })
            })
            .collect())
    }
}
