use std::path::{Path, PathBuf};

use prlink_core::PullRequest;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("read event payload {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse event payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("event payload has no pull_request object")]
    NotPullRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEvent {
    action: Option<String>,
    pull_request: Option<PullRequest>,
    repository: Option<Repository>,
}

/// A `pull_request` (or `pull_request_target`) webhook event.
#[derive(Debug, Clone)]
pub struct PullRequestEvent {
    pub action: Option<String>,
    pub pull_request: PullRequest,
    pub repository: Option<Repository>,
}

impl PullRequestEvent {
    pub fn repository_name(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.full_name.as_str())
    }
}

pub fn parse_event(json: &str) -> Result<PullRequestEvent, EventError> {
    let raw: RawEvent = serde_json::from_str(json)?;
    let pull_request = raw.pull_request.ok_or(EventError::NotPullRequest)?;
    Ok(PullRequestEvent {
        action: raw.action,
        pull_request,
        repository: raw.repository,
    })
}

pub fn load_event(path: &Path) -> Result<PullRequestEvent, EventError> {
    let json = std::fs::read_to_string(path).map_err(|source| EventError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_event(&json)
}
