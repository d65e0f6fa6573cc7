use async_trait::async_trait;
use prlink_core::record::{CreatePrRecord, PrRecord, TaskRecord, UpdatePrRecord};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl ServiceError {
    /// The API rejected the request payload (HTTP 400).
    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Api { status: 400, .. })
    }
}

/// Result of a find operation.
///
/// `Failed` keeps the reason a lookup could not complete; callers that do not
/// care treat it the same as `NotFound`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(String),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound | Lookup::Failed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Failed(reason) => Lookup::Failed(reason),
        }
    }
}

/// Operations against the PR and task databases.
///
/// `NotionService` talks to the Notion API; `MockRecordService` keeps
/// records in memory for tests.
#[async_trait]
pub trait RecordService: Send + Sync {
    async fn find_pr_by_number(&self, database_id: &str, number: u64) -> Lookup<PrRecord>;

    async fn find_task_by_identifier(
        &self,
        database_id: &str,
        identifier: &str,
    ) -> Lookup<TaskRecord>;

    async fn create_pr(
        &self,
        database_id: &str,
        input: &CreatePrRecord,
    ) -> Result<PrRecord, ServiceError>;

    async fn update_pr(
        &self,
        page_id: &str,
        update: &UpdatePrRecord,
    ) -> Result<PrRecord, ServiceError>;

    /// Find the record for `input.number`, refreshing title, state and
    /// relation in place; create it when no record is found.
    async fn find_or_create_pr(
        &self,
        database_id: &str,
        input: &CreatePrRecord,
    ) -> Result<PrRecord, ServiceError> {
        match self.find_pr_by_number(database_id, input.number).await {
            Lookup::Found(existing) => {
                info!("found existing PR record for #{} ({})", input.number, existing.id);
                let update = existing.diff(input);
                if update.is_empty() {
                    return Ok(existing);
                }
                info!("refreshing PR record {}: {update:?}", existing.id);
                self.update_pr(&existing.id, &update).await
            }
            Lookup::NotFound => {
                info!("creating PR record for #{}", input.number);
                self.create_pr(database_id, input).await
            }
            Lookup::Failed(reason) => {
                warn!("lookup of PR #{} failed ({reason}), creating a new record", input.number);
                self.create_pr(database_id, input).await
            }
        }
    }
}
