use anyhow::{Context, Result};
use prlink_core::record::{CreatePrRecord, PrRecord, TaskRecord};
use prlink_core::PullRequest;
use prlink_service::{Lookup, RecordService};
use tracing::{info, warn};

use crate::config::LinkConfig;
use crate::notifier::Notifier;

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// The branch name carries no task id; nothing was touched.
    NoTaskId,
    /// The PR record exists and points at the task.
    Linked { pr: PrRecord, task: TaskRecord },
    /// The PR record exists but no task matched the id, so no relation was set.
    TaskNotFound { pr: PrRecord, task_id: String },
}

/// Link one pull request to its task.
///
/// Extracts the task id from the head branch, looks the task up, finds or
/// creates the PR record with the relation set, then posts a confirmation.
/// Only a failure to write the PR record is returned as an error; comment
/// failures are logged.
pub async fn link_pull_request(
    config: &LinkConfig,
    records: &dyn RecordService,
    notifier: &dyn Notifier,
    pr: &PullRequest,
) -> Result<LinkOutcome> {
    let state = pr.pr_state();
    info!("processing PR #{}: {}", pr.number, pr.title);
    info!("branch: {}, state: {state}", pr.branch());

    let Some(task_id) = config.task_id_pattern.extract(pr.branch()) else {
        info!(
            "no task id matching {} in branch name, skipping",
            config.task_id_pattern.as_str()
        );
        return Ok(LinkOutcome::NoTaskId);
    };
    info!("found task id: {task_id}");

    let task = match records
        .find_task_by_identifier(&config.task_database_id, &task_id)
        .await
    {
        Lookup::Found(task) => {
            info!("task page: {} ({})", task.id, task.title);
            Some(task)
        }
        Lookup::NotFound => {
            warn!("task {task_id} not found, recording the PR without a relation");
            None
        }
        Lookup::Failed(reason) => {
            warn!("task lookup for {task_id} failed ({reason}), recording the PR without a relation");
            None
        }
    };

    let input = CreatePrRecord::from_pull_request(pr, task.as_ref().map(|t| t.id.clone()));
    let record = records
        .find_or_create_pr(&config.pr_database_id, &input)
        .await
        .with_context(|| format!("failed to record PR #{} in Notion", pr.number))?;
    info!("PR page: {}", record.id);

    if let Some(ref task) = task {
        if task.related_pr_ids.contains(&record.id) {
            info!(
                "task {task_id} already lists this PR in {:?}",
                config.schema.task.pr_relation
            );
        }
    }

    let body = render_comment(&record, task.as_ref(), &task_id);
    match notifier.post_comment(pr.number, &body).await {
        Ok(()) => info!("posted confirmation via {}", notifier.name()),
        Err(e) => warn!("error posting confirmation via {}: {e}", notifier.name()),
    }

    Ok(match task {
        Some(task) => LinkOutcome::Linked { pr: record, task },
        None => LinkOutcome::TaskNotFound {
            pr: record,
            task_id,
        },
    })
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Markdown confirmation posted on the pull request.
pub fn render_comment(pr: &PrRecord, task: Option<&TaskRecord>, task_id: &str) -> String {
    let mut comment = match task {
        Some(_) => String::from("✅ PR has been linked to Notion\n\n"),
        None => String::from("ℹ️ PR recorded in Notion\n\n"),
    };
    comment.push_str(&format!("📝 [PR Page in Notion]({})\n", pr.url));

    match task {
        Some(task) => {
            let text = if task.title.trim().is_empty() {
                "Task Page in Notion".to_string()
            } else {
                escape_link_text(task.title.trim())
            };
            comment.push_str(&format!("🎯 [{text}]({})\n", task.url));
        }
        None => {
            comment.push_str(&format!(
                "⚠️ Task `{task_id}` was not found in Notion, so no relation was set.\n"
            ));
        }
    }
    comment
}
