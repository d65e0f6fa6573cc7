use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pull_request::{PrState, PullRequest};

/// A PR page in the PR database. Keyed by `number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    pub id: String,
    pub url: String,
    pub number: u64,
    pub title: String,
    pub state: Option<PrState>,
    pub related_task_ids: Vec<String>,
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PrRecord {
    /// Fields of `desired` that differ from this record, as a partial update.
    ///
    /// Only title, state and the task relation are compared. A desired record
    /// without a task never clears an existing relation.
    pub fn diff(&self, desired: &CreatePrRecord) -> UpdatePrRecord {
        let title = desired.record_title();
        let relation_differs = desired
            .task_page_id
            .as_ref()
            .is_some_and(|id| self.related_task_ids.as_slice() != std::slice::from_ref(id));

        UpdatePrRecord {
            title: (self.title != title).then_some(title),
            state: (self.state != Some(desired.state)).then_some(desired.state),
            task_page_id: if relation_differs {
                desired.task_page_id.clone()
            } else {
                None
            },
        }
    }

    pub fn is_linked_to(&self, task_page_id: &str) -> bool {
        self.related_task_ids.iter().any(|id| id == task_page_id)
    }
}

/// A task page in the task database. Never written by this tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub identifier: Option<String>,
    pub related_pr_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePrRecord {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PrState,
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub task_page_id: Option<String>,
}

impl CreatePrRecord {
    pub fn from_pull_request(pr: &PullRequest, task_page_id: Option<String>) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            url: pr.html_url.clone(),
            state: pr.pr_state(),
            author: Some(pr.user.login.clone()),
            created_at: pr.created_at,
            task_page_id,
        }
    }

    /// Title text stored on the record: the PR number followed by its title.
    pub fn record_title(&self) -> String {
        format!("#{} {}", self.number, self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePrRecord {
    /// Full record title, already prefixed with the PR number.
    pub title: Option<String>,
    pub state: Option<PrState>,
    pub task_page_id: Option<String>,
}

impl UpdatePrRecord {
    pub fn relation(task_page_id: &str) -> Self {
        Self {
            task_page_id: Some(task_page_id.to_string()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.state.is_none() && self.task_page_id.is_none()
    }
}
