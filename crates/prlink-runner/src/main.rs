use anyhow::{Context, Result};
use clap::Parser;
use prlink_runner::config::RunnerConfig;
use prlink_runner::event::load_event;
use prlink_runner::linker::{link_pull_request, LinkOutcome};
use prlink_runner::notifier::notifier_for;
use prlink_service::NotionService;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = RunnerConfig::parse();
    let config = args.resolve()?;
    info!("prlink starting");
    info!("notion: {} (version {})", config.notion_api_url, config.notion_version);

    let event_path = args
        .event_path
        .as_deref()
        .context("GITHUB_EVENT_PATH is not set")?;
    let event = load_event(event_path)?;
    if let Some(ref action) = event.action {
        info!("event action: {action}");
    }

    let records = NotionService::new(
        &config.notion_api_url,
        config.notion_token.clone(),
        config.schema.clone(),
    )
    .with_version(&config.notion_version);
    let notifier = notifier_for(&config, event.repository_name());

    match link_pull_request(&config, &records, notifier.as_ref(), &event.pull_request).await {
        Ok(LinkOutcome::NoTaskId) => info!("nothing to link"),
        Ok(LinkOutcome::Linked { pr, task }) => {
            info!("linked PR page {} to task page {}", pr.id, task.id)
        }
        Ok(LinkOutcome::TaskNotFound { pr, task_id }) => {
            info!("recorded PR page {} without a task, {task_id} not found", pr.id)
        }
        Err(e) => {
            error!("{e:#}");
            return Err(e);
        }
    }
    Ok(())
}
