//! Property names used on the remote PR and task databases.
//!
//! Every field this tool reads or writes is addressed by name, so workspaces
//! with differently named columns only need to override the names here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrSchema {
    pub title: String,
    pub number: String,
    pub url: String,
    pub state: String,
    pub author: String,
    pub created_at: String,
    /// Relation on the PR record pointing at its task.
    pub task_relation: String,
}

impl Default for PrSchema {
    fn default() -> Self {
        Self {
            title: "Title".into(),
            number: "PR Number".into(),
            url: "URL".into(),
            state: "State".into(),
            author: "Author".into(),
            created_at: "Created At".into(),
            task_relation: "Related Task".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSchema {
    /// Identifier property, e.g. a unique-id column rendering as `TASK-40`.
    pub identifier: String,
    /// Relation on the task record listing its PRs.
    pub pr_relation: String,
}

impl Default for TaskSchema {
    fn default() -> Self {
        Self {
            identifier: "ID".into(),
            pr_relation: "Related PRs".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub pr: PrSchema,
    pub task: TaskSchema,
}
