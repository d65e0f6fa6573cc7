pub mod github;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::LinkConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("comment failed: {0}")]
    CommentFailed(String),

    #[error("invalid repository {0:?}, expected owner/repo")]
    InvalidRepository(String),
}

/// Posts the confirmation message back on the pull request.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn post_comment(&self, pr_number: u64, body: &str) -> Result<(), NotifyError>;
}

/// Writes the comment to the log instead of posting it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn post_comment(&self, pr_number: u64, body: &str) -> Result<(), NotifyError> {
        info!("comment for PR #{pr_number}:\n{body}");
        Ok(())
    }
}

/// Pick the notifier for this run. Posting on GitHub needs a token and a
/// repository; `event_repository` is used when none is configured.
pub fn notifier_for(config: &LinkConfig, event_repository: Option<&str>) -> Box<dyn Notifier> {
    let Some(token) = config.github_token.clone() else {
        info!("no GitHub token configured, the confirmation will only be logged");
        return Box::new(LogNotifier);
    };
    let Some(repository) = config.github_repository.as_deref().or(event_repository) else {
        warn!("no GitHub repository known, the confirmation will only be logged");
        return Box::new(LogNotifier);
    };
    match github::GitHubNotifier::new(&config.github_api_url, token, repository) {
        Ok(notifier) => Box::new(notifier),
        Err(e) => {
            warn!("{e}, the confirmation will only be logged");
            Box::new(LogNotifier)
        }
    }
}
