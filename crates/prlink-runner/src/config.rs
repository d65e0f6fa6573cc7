use std::path::PathBuf;

use clap::Parser;
use prlink_core::schema::{PrSchema, RecordSchema, TaskSchema};
use prlink_core::task_id::{TaskIdPattern, DEFAULT_PREFIX};
use prlink_core::PatternError;
use prlink_service::{DEFAULT_BASE_URL, DEFAULT_VERSION};
use thiserror::Error;
use url::Url;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
}

/// Command-line and environment settings. Unset optional settings fall back
/// to their defaults in [`RunnerConfig::resolve`].
#[derive(Debug, Clone, Parser)]
#[command(name = "prlink", about = "Link GitHub pull requests to Notion tasks")]
pub struct RunnerConfig {
    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub notion_token: Option<String>,

    /// Notion database holding PR records
    #[arg(long, env = "NOTION_PR_DB_ID")]
    pub pr_database_id: Option<String>,

    /// Notion database holding task records
    #[arg(long, env = "NOTION_TASK_DB_ID")]
    pub task_database_id: Option<String>,

    /// Task id prefix; the default pattern is `(<PREFIX>-\d+)` [default: TASK]
    #[arg(long, env = "TASK_ID_PREFIX")]
    pub task_id_prefix: Option<String>,

    /// Full task id pattern with one capture group. Overrides the prefix.
    #[arg(long, env = "TASK_ID_PATTERN")]
    pub task_id_pattern: Option<String>,

    /// Relation on the task database listing PRs [default: Related PRs]
    #[arg(long, env = "PR_RELATION_PROPERTY")]
    pub pr_relation_property: Option<String>,

    /// Relation on the PR database pointing at the task [default: Related Task]
    #[arg(long, env = "TASK_RELATION_PROPERTY")]
    pub task_relation_property: Option<String>,

    /// Title property on the PR database [default: Title]
    #[arg(long, env = "PR_TITLE_PROPERTY")]
    pub pr_title_property: Option<String>,

    /// Number property on the PR database [default: PR Number]
    #[arg(long, env = "PR_NUMBER_PROPERTY")]
    pub pr_number_property: Option<String>,

    /// URL property on the PR database [default: URL]
    #[arg(long, env = "PR_URL_PROPERTY")]
    pub pr_url_property: Option<String>,

    /// State (select) property on the PR database [default: State]
    #[arg(long, env = "PR_STATE_PROPERTY")]
    pub pr_state_property: Option<String>,

    /// Author property on the PR database [default: Author]
    #[arg(long, env = "PR_AUTHOR_PROPERTY")]
    pub pr_author_property: Option<String>,

    /// Creation date property on the PR database [default: Created At]
    #[arg(long, env = "PR_CREATED_AT_PROPERTY")]
    pub pr_created_at_property: Option<String>,

    /// Identifier property on the task database [default: ID]
    #[arg(long, env = "TASK_ID_PROPERTY")]
    pub task_id_property: Option<String>,

    #[arg(long, env = "NOTION_API_URL", default_value = DEFAULT_BASE_URL)]
    pub notion_api_url: Url,

    #[arg(long, env = "NOTION_VERSION", default_value = DEFAULT_VERSION)]
    pub notion_version: String,

    /// Token used to comment on the pull request. Without it the
    /// confirmation is only logged.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// `owner/repo`; taken from the event payload when unset
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repository: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    pub github_api_url: Url,

    /// Path to the pull_request event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,
}

/// Resolved, immutable settings for one invocation.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub notion_token: String,
    pub pr_database_id: String,
    pub task_database_id: String,
    pub task_id_prefix: String,
    pub task_id_pattern: TaskIdPattern,
    pub schema: RecordSchema,
    pub notion_api_url: String,
    pub notion_version: String,
    pub github_token: Option<String>,
    pub github_repository: Option<String>,
    pub github_api_url: String,
}

/// Empty values count as unset.
fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(String::from)
}

fn or_default(value: &Option<String>, default: String) -> String {
    present(value).unwrap_or(default)
}

fn base_url(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

impl RunnerConfig {
    pub fn resolve(&self) -> Result<LinkConfig, ConfigError> {
        let (notion_token, pr_database_id, task_database_id) = match (
            present(&self.notion_token),
            present(&self.pr_database_id),
            present(&self.task_database_id),
        ) {
            (Some(token), Some(pr_db), Some(task_db)) => (token, pr_db, task_db),
            (token, pr_db, task_db) => {
                let missing = [
                    ("NOTION_TOKEN", token.is_none()),
                    ("NOTION_PR_DB_ID", pr_db.is_none()),
                    ("NOTION_TASK_DB_ID", task_db.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(ConfigError::Missing(missing));
            }
        };

        let task_id_prefix = or_default(&self.task_id_prefix, DEFAULT_PREFIX.to_string());
        let task_id_pattern = match present(&self.task_id_pattern) {
            Some(pattern) => TaskIdPattern::new(&pattern)?,
            None => TaskIdPattern::from_prefix(&task_id_prefix)?,
        };

        let pr_defaults = PrSchema::default();
        let task_defaults = TaskSchema::default();
        let schema = RecordSchema {
            pr: PrSchema {
                title: or_default(&self.pr_title_property, pr_defaults.title),
                number: or_default(&self.pr_number_property, pr_defaults.number),
                url: or_default(&self.pr_url_property, pr_defaults.url),
                state: or_default(&self.pr_state_property, pr_defaults.state),
                author: or_default(&self.pr_author_property, pr_defaults.author),
                created_at: or_default(&self.pr_created_at_property, pr_defaults.created_at),
                task_relation: or_default(&self.task_relation_property, pr_defaults.task_relation),
            },
            task: TaskSchema {
                identifier: or_default(&self.task_id_property, task_defaults.identifier),
                pr_relation: or_default(&self.pr_relation_property, task_defaults.pr_relation),
            },
        };

        Ok(LinkConfig {
            notion_token,
            pr_database_id,
            task_database_id,
            task_id_prefix,
            task_id_pattern,
            schema,
            notion_api_url: base_url(&self.notion_api_url),
            notion_version: self.notion_version.clone(),
            github_token: present(&self.github_token),
            github_repository: present(&self.github_repository),
            github_api_url: base_url(&self.github_api_url),
        })
    }
}
