use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a pull request as recorded in the PR database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrState {
    Open,
    Draft,
    Merged,
    Closed,
}

impl PrState {
    pub const ALL: &[PrState] = &[
        PrState::Open,
        PrState::Draft,
        PrState::Merged,
        PrState::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "open",
            PrState::Draft => "draft",
            PrState::Merged => "merged",
            PrState::Closed => "closed",
        }
    }

    /// Name of the select option written to the remote record.
    pub fn display_name(&self) -> &'static str {
        match self {
            PrState::Open => "Open",
            PrState::Draft => "Draft",
            PrState::Merged => "Merged",
            PrState::Closed => "Closed",
        }
    }

    /// Accepts either the wire form or the display form.
    pub fn parse_str(s: &str) -> Option<Self> {
        PrState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s || state.display_name() == s)
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub login: String,
}

/// The `pull_request` object of a GitHub pull_request event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    /// `open` or `closed`.
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub merged: bool,
    pub head: BranchRef,
    pub user: Author,
    pub created_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Draft wins over merged, merged over closed.
    pub fn pr_state(&self) -> PrState {
        if self.draft {
            PrState::Draft
        } else if self.merged {
            PrState::Merged
        } else if self.state == "closed" {
            PrState::Closed
        } else {
            PrState::Open
        }
    }

    pub fn branch(&self) -> &str {
        &self.head.name
    }
}
