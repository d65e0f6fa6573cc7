//! In-process fake of the Notion endpoints this crate calls.
//!
//! Supports database queries with `number`, `unique_id` and `rich_text`
//! filters, page creation and page updates. Pages are kept in memory and
//! returned in the same shape as the real API (typed properties with
//! `plain_text`).

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{patch, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

use crate::payload::property_text;

#[derive(Debug, Clone)]
pub struct FakePage {
    pub id: String,
    pub database_id: String,
    pub properties: Map<String, Value>,
}

impl FakePage {
    fn to_json(&self) -> Value {
        json!({
            "object": "page",
            "id": self.id,
            "url": format!("https://www.notion.so/{}", self.id.replace('-', "")),
            "parent": { "type": "database_id", "database_id": self.database_id },
            "properties": self.properties,
        })
    }
}

#[derive(Debug, Default)]
pub struct FakeNotionState {
    pub pages: Vec<FakePage>,
    pub creates: usize,
    pub updates: Vec<(String, Value)>,
    pub queries: Vec<Value>,
    /// Every query answers 500.
    pub fail_queries: bool,
    /// Every create and update answers 400.
    pub fail_writes: bool,
    /// `unique_id` filters answer 400, as for a plain text id column.
    pub reject_unique_id: bool,
}

impl FakeNotionState {
    pub fn pages_in(&self, database_id: &str) -> Vec<FakePage> {
        self.pages
            .iter()
            .filter(|p| p.database_id == database_id)
            .cloned()
            .collect()
    }
}

#[derive(Clone)]
struct AppState {
    token: String,
    inner: Arc<Mutex<FakeNotionState>>,
}

type Reply = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, code: &str, message: &str) -> Reply {
    (
        status,
        Json(json!({
            "object": "error",
            "status": status.as_u16(),
            "code": code,
            "message": message,
        })),
    )
}

fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), Reply> {
    let expected = format!("Bearer {}", state.token);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "API token is invalid.",
        ));
    }
    if headers.get("notion-version").is_none() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "missing_version",
            "Notion-Version header failed validation",
        ));
    }
    Ok(())
}

fn rich_text_items(items: &Value) -> Value {
    let items = items.as_array().cloned().unwrap_or_default();
    Value::Array(
        items
            .into_iter()
            .map(|mut item| {
                let content = item["text"]["content"].as_str().unwrap_or("").to_string();
                item["plain_text"] = Value::String(content);
                item
            })
            .collect(),
    )
}

/// Turn request-shaped property values into response-shaped ones.
fn normalize_property(value: &Value) -> Value {
    const TYPES: &[&str] = &[
        "title",
        "rich_text",
        "number",
        "url",
        "select",
        "relation",
        "date",
        "unique_id",
    ];
    let Some(kind) = TYPES.iter().find(|t| value.get(**t).is_some()) else {
        return value.clone();
    };
    let inner = match *kind {
        "title" | "rich_text" => rich_text_items(&value[*kind]),
        _ => value[*kind].clone(),
    };
    let mut out = Map::new();
    out.insert("type".into(), json!(kind));
    out.insert(kind.to_string(), inner);
    Value::Object(out)
}

fn matches_filter(page: &FakePage, filter: &Value) -> Result<bool, Reply> {
    let Some(name) = filter["property"].as_str() else {
        return Ok(true);
    };
    let prop = page.properties.get(name).cloned().unwrap_or(Value::Null);

    if let Some(n) = filter["number"]["equals"].as_f64() {
        return Ok(prop["number"].as_f64() == Some(n));
    }
    if let Some(n) = filter["unique_id"]["equals"].as_u64() {
        return Ok(prop["type"] == "unique_id" && prop["unique_id"]["number"].as_u64() == Some(n));
    }
    if let Some(text) = filter["rich_text"]["contains"].as_str() {
        return Ok(property_text(&prop).is_some_and(|s| s.contains(text)));
    }
    Err(api_error(
        StatusCode::BAD_REQUEST,
        "validation_error",
        "unsupported filter",
    ))
}

async fn query_database(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(database_id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(reply) = check_auth(&state, &headers) {
        return reply;
    }
    let mut inner = state.inner.lock().unwrap();
    inner.queries.push(body.clone());
    if inner.fail_queries {
        return api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_server_error",
            "fake query failure",
        );
    }
    let filter = &body["filter"];
    if inner.reject_unique_id && filter.get("unique_id").is_some() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "body failed validation: filter.unique_id does not match property type",
        );
    }

    let mut results = Vec::new();
    for page in inner.pages.iter().filter(|p| p.database_id == database_id) {
        match matches_filter(page, filter) {
            Ok(true) => results.push(page.to_json()),
            Ok(false) => {}
            Err(reply) => return reply,
        }
    }
    (
        StatusCode::OK,
        Json(json!({ "object": "list", "results": results, "has_more": false })),
    )
}

async fn create_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(reply) = check_auth(&state, &headers) {
        return reply;
    }
    let mut inner = state.inner.lock().unwrap();
    if inner.fail_writes {
        return api_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "fake create failure",
        );
    }
    let Some(database_id) = body["parent"]["database_id"].as_str() else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "body.parent.database_id should be defined",
        );
    };
    let properties = body["properties"]
        .as_object()
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| (k.clone(), normalize_property(v)))
                .collect()
        })
        .unwrap_or_default();

    let page = FakePage {
        id: uuid::Uuid::new_v4().to_string(),
        database_id: database_id.to_string(),
        properties,
    };
    let reply = page.to_json();
    inner.pages.push(page);
    inner.creates += 1;
    (StatusCode::OK, Json(reply))
}

async fn update_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(page_id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(reply) = check_auth(&state, &headers) {
        return reply;
    }
    let mut inner = state.inner.lock().unwrap();
    if inner.fail_writes {
        return api_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "fake update failure",
        );
    }
    inner.updates.push((page_id.clone(), body.clone()));
    let Some(page) = inner.pages.iter_mut().find(|p| p.id == page_id) else {
        return api_error(
            StatusCode::NOT_FOUND,
            "object_not_found",
            &format!("Could not find page with ID: {page_id}."),
        );
    };
    if let Some(props) = body["properties"].as_object() {
        for (name, value) in props {
            page.properties.insert(name.clone(), normalize_property(value));
        }
    }
    (StatusCode::OK, Json(page.to_json()))
}

/// A running fake Notion API.
pub struct FakeNotion {
    /// Base URL including the `/v1` prefix.
    pub base_url: String,
    pub state: Arc<Mutex<FakeNotionState>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeNotion {
    /// Seed a task page whose identifier column is a unique id.
    pub fn seed_task(&self, database_id: &str, prefix: &str, number: u64, title: &str) -> String {
        self.seed_page(
            database_id,
            title,
            json!({ "type": "unique_id", "unique_id": { "prefix": prefix, "number": number } }),
        )
    }

    /// Seed a task page whose identifier column is plain text.
    pub fn seed_text_task(&self, database_id: &str, identifier: &str, title: &str) -> String {
        self.seed_page(
            database_id,
            title,
            json!({ "type": "rich_text", "rich_text": [
                { "type": "text", "text": { "content": identifier }, "plain_text": identifier }
            ] }),
        )
    }

    fn seed_page(&self, database_id: &str, title: &str, identifier: Value) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut properties = Map::new();
        properties.insert(
            "Name".into(),
            json!({ "type": "title", "title": [
                { "type": "text", "text": { "content": title }, "plain_text": title }
            ] }),
        );
        properties.insert("ID".into(), identifier);
        properties.insert(
            "Related PRs".into(),
            json!({ "type": "relation", "relation": [] }),
        );
        self.state.lock().unwrap().pages.push(FakePage {
            id: id.clone(),
            database_id: database_id.to_string(),
            properties,
        });
        id
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn update_count(&self) -> usize {
        self.state.lock().unwrap().updates.len()
    }
}

pub fn fake_router(token: &str, state: Arc<Mutex<FakeNotionState>>) -> Router {
    let app_state = AppState {
        token: token.to_string(),
        inner: state,
    };
    Router::new()
        .route("/v1/databases/{database_id}/query", post(query_database))
        .route("/v1/pages", post(create_page))
        .route("/v1/pages/{page_id}", patch(update_page))
        .with_state(app_state)
}

/// Spawn the fake on a random port, accepting `token` as the bearer credential.
pub async fn spawn_fake_notion(token: &str) -> FakeNotion {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(Mutex::new(FakeNotionState::default()));
    let app = fake_router(token, state.clone());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeNotion {
        base_url: format!("http://{addr}/v1"),
        state,
        _handle: handle,
    }
}
