use async_trait::async_trait;
use prlink_core::record::{CreatePrRecord, PrRecord, TaskRecord, UpdatePrRecord};
use prlink_core::schema::RecordSchema;
use prlink_core::task_id::TaskId;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::payload::{self, Page, QueryResponse};
use crate::{Lookup, RecordService, ServiceError};

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_VERSION: &str = "2022-06-28";

/// Async client for the Notion REST API.
pub struct NotionService {
    base_url: String,
    client: Client,
    token: String,
    version: String,
    schema: RecordSchema,
}

impl NotionService {
    pub fn new(base_url: &str, token: String, schema: RecordSchema) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
            token,
            version: DEFAULT_VERSION.to_string(),
            schema,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Notion-Version", self.version.as_str())
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        handle_response(resp).await
    }

    async fn query(&self, database_id: &str, body: &Value) -> Result<QueryResponse, ServiceError> {
        debug!("query database {database_id}: {body}");
        let builder = self
            .client
            .post(format!("{}/databases/{database_id}/query", self.base_url))
            .json(body);
        self.send_json(builder).await
    }

    async fn create_page(&self, body: &Value) -> Result<Page, ServiceError> {
        debug!("create page: {body}");
        let builder = self
            .client
            .post(format!("{}/pages", self.base_url))
            .json(body);
        self.send_json(builder).await
    }

    async fn update_page(&self, page_id: &str, body: &Value) -> Result<Page, ServiceError> {
        debug!("update page {page_id}: {body}");
        let builder = self
            .client
            .patch(format!("{}/pages/{page_id}", self.base_url))
            .json(body);
        self.send_json(builder).await
    }

    /// Query the task database and keep the first page whose identifier is
    /// exactly `identifier`.
    async fn query_task(
        &self,
        database_id: &str,
        body: &Value,
        identifier: &str,
    ) -> Result<Option<TaskRecord>, ServiceError> {
        let resp = self.query(database_id, body).await?;
        let task = resp
            .results
            .iter()
            .map(|page| payload::decode_task(&self.schema.task, page))
            .find(|task| task.identifier.as_deref() == Some(identifier));
        if task.is_none() && !resp.results.is_empty() {
            debug!(
                "{} candidate(s) for {identifier} rejected: identifier mismatch",
                resp.results.len()
            );
        }
        Ok(task)
    }

    async fn find_task(
        &self,
        database_id: &str,
        identifier: &str,
    ) -> Result<Option<TaskRecord>, ServiceError> {
        let property = &self.schema.task.identifier;

        if let Some(task_id) = TaskId::parse(identifier) {
            let body = payload::unique_id_filter(property, task_id.number);
            match self.query_task(database_id, &body, identifier).await {
                Ok(found) => return Ok(found),
                Err(e) if e.is_validation() => {
                    info!("{property:?} is not a unique id property ({e}), falling back to text search");
                }
                Err(e) => return Err(e),
            }
        }

        let body = payload::text_contains_filter(property, identifier);
        self.query_task(database_id, &body, identifier).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn parse_error_with_status(status: StatusCode, resp: reqwest::Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        ServiceError::NotFound(message)
    } else {
        ServiceError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl RecordService for NotionService {
    async fn find_pr_by_number(&self, database_id: &str, number: u64) -> Lookup<PrRecord> {
        let body = payload::number_filter(&self.schema.pr.number, number);
        let resp = match self.query(database_id, &body).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("error finding PR record #{number}: {e}");
                return Lookup::Failed(e.to_string());
            }
        };
        match resp.results.first() {
            Some(page) => match payload::decode_pr(&self.schema.pr, page) {
                Ok(record) => Lookup::Found(record),
                Err(e) => {
                    warn!("error decoding PR record #{number}: {e}");
                    Lookup::Failed(e.to_string())
                }
            },
            None => Lookup::NotFound,
        }
    }

    async fn find_task_by_identifier(
        &self,
        database_id: &str,
        identifier: &str,
    ) -> Lookup<TaskRecord> {
        match self.find_task(database_id, identifier).await {
            Ok(Some(task)) => Lookup::Found(task),
            Ok(None) => Lookup::NotFound,
            Err(e) => {
                warn!("error finding task {identifier}: {e}");
                Lookup::Failed(e.to_string())
            }
        }
    }

    async fn create_pr(
        &self,
        database_id: &str,
        input: &CreatePrRecord,
    ) -> Result<PrRecord, ServiceError> {
        if input.title.is_empty() {
            return Err(ServiceError::InvalidInput("PR title is required".into()));
        }
        if input.url.is_empty() {
            return Err(ServiceError::InvalidInput("PR URL is required".into()));
        }
        if let Some(ref task) = input.task_page_id {
            info!("adding task relation {task} at creation");
        }

        let properties = payload::create_pr_properties(&self.schema.pr, input);
        let body = payload::create_page_body(database_id, properties);
        let page = self.create_page(&body).await.inspect_err(|e| {
            error!("error creating PR record #{}: {e}", input.number);
        })?;
        payload::decode_pr(&self.schema.pr, &page)
    }

    async fn update_pr(
        &self,
        page_id: &str,
        update: &UpdatePrRecord,
    ) -> Result<PrRecord, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::InvalidInput("empty update".into()));
        }
        let properties = payload::update_pr_properties(&self.schema.pr, update);
        let body = json!({ "properties": properties });
        let page = self.update_page(page_id, &body).await.inspect_err(|e| {
            error!("error updating PR record {page_id}: {e}");
            if update.task_page_id.is_some() && e.is_validation() {
                error!(
                    "check that the relation property {:?} exists on the PR database",
                    self.schema.pr.task_relation
                );
            }
        })?;
        payload::decode_pr(&self.schema.pr, &page)
    }
}
