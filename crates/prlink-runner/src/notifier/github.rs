use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use super::{Notifier, NotifyError};

/// Comments on pull requests through the GitHub REST API.
pub struct GitHubNotifier {
    api_url: String,
    client: Client,
    token: String,
    owner: String,
    repo: String,
}

impl GitHubNotifier {
    /// `repository` is `owner/repo`.
    pub fn new(api_url: &str, token: String, repository: &str) -> Result<Self, NotifyError> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| NotifyError::InvalidRepository(repository.to_string()))?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for GitHubNotifier {
    fn name(&self) -> &str {
        "github"
    }

    async fn post_comment(&self, pr_number: u64, body: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{pr_number}/comments",
            self.api_url, self.owner, self.repo
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "prlink")
            .json(&json!({ "body": body }))
            .send()
            .await
            .map_err(|e| NotifyError::CommentFailed(format!("POST comment: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NotifyError::CommentFailed(format!("{status}: {text}")));
        }

        info!("posted comment on {}/{}#{pr_number}", self.owner, self.repo);
        Ok(())
    }
}
