// Shared fixtures for the runner integration tests: a fake GitHub comments
// endpoint and config/event builders pointed at the in-process fakes.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use prlink_core::PullRequest;
use prlink_runner::config::{LinkConfig, RunnerConfig};
use prlink_runner::event::parse_event;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const NOTION_TOKEN: &str = "secret_test";
pub const GITHUB_TOKEN: &str = "ghp_test";
pub const PR_DB: &str = "pr-db";
pub const TASK_DB: &str = "task-db";
pub const REPOSITORY: &str = "acme/app";

#[derive(Debug, Clone)]
pub struct PostedComment {
    pub repository: String,
    pub number: u64,
    pub body: String,
}

#[derive(Clone)]
struct GitHubState {
    token: String,
    comments: Arc<Mutex<Vec<PostedComment>>>,
}

async fn create_comment(
    State(state): State<GitHubState>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {}", state.token);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Bad credentials" })),
        );
    }
    let Some(text) = body.get("body").and_then(Value::as_str) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "body is missing" })),
        );
    };

    let mut comments = state.comments.lock().unwrap();
    comments.push(PostedComment {
        repository: format!("{owner}/{repo}"),
        number,
        body: text.to_string(),
    });
    (
        StatusCode::CREATED,
        Json(json!({ "id": comments.len(), "body": text })),
    )
}

/// A running fake of the GitHub issue comments endpoint.
pub struct FakeGitHub {
    pub api_url: String,
    comments: Arc<Mutex<Vec<PostedComment>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeGitHub {
    pub fn comments(&self) -> Vec<PostedComment> {
        self.comments.lock().unwrap().clone()
    }
}

pub async fn spawn_fake_github(token: &str) -> FakeGitHub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let comments = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/repos/{owner}/{repo}/issues/{number}/comments",
            post(create_comment),
        )
        .with_state(GitHubState {
            token: token.to_string(),
            comments: comments.clone(),
        });
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeGitHub {
        api_url: format!("http://{addr}"),
        comments,
        _handle: handle,
    }
}

/// Resolve a config through the same command-line path the binary uses.
pub fn link_config(notion_api_url: &str, github_api_url: &str, github_token: &str) -> LinkConfig {
    RunnerConfig::try_parse_from([
        "prlink",
        "--notion-token",
        NOTION_TOKEN,
        "--pr-database-id",
        PR_DB,
        "--task-database-id",
        TASK_DB,
        "--task-id-prefix",
        "TASK",
        "--notion-api-url",
        notion_api_url,
        "--github-token",
        github_token,
        "--github-repository",
        REPOSITORY,
        "--github-api-url",
        github_api_url,
    ])
    .unwrap()
    .resolve()
    .unwrap()
}

/// A pull request as delivered in the event payload.
pub fn pull_request(branch: &str, state: &str, merged: bool) -> PullRequest {
    let event = json!({
        "action": "synchronize",
        "pull_request": {
            "number": 12,
            "title": "Add search",
            "html_url": "https://github.com/acme/app/pull/12",
            "state": state,
            "draft": false,
            "merged": merged,
            "head": { "ref": branch },
            "user": { "login": "octocat" },
            "created_at": "2024-05-01T10:00:00Z"
        },
        "repository": { "full_name": REPOSITORY }
    });
    parse_event(&event.to_string()).unwrap().pull_request
}
