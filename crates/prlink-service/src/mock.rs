use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use prlink_core::record::{CreatePrRecord, PrRecord, TaskRecord, UpdatePrRecord};

use crate::{Lookup, RecordService, ServiceError};

/// In-memory record service for tests. Tracks calls and can be told to fail
/// lookups or writes.
pub struct MockRecordService {
    page_counter: AtomicU64,
    prs: Mutex<Vec<PrRecord>>,
    tasks: Mutex<Vec<TaskRecord>>,
    updates: Mutex<Vec<(String, UpdatePrRecord)>>,
    creates: AtomicU64,
    lookup_fail: bool,
    write_fail: bool,
}

impl Default for MockRecordService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRecordService {
    pub fn new() -> Self {
        Self {
            page_counter: AtomicU64::new(1),
            prs: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            creates: AtomicU64::new(0),
            lookup_fail: false,
            write_fail: false,
        }
    }

    pub fn with_lookup_fail(mut self) -> Self {
        self.lookup_fail = true;
        self
    }

    pub fn with_write_fail(mut self) -> Self {
        self.write_fail = true;
        self
    }

    pub fn with_task(self, identifier: &str, title: &str) -> Self {
        let id = self.next_id("task");
        self.tasks.lock().unwrap().push(TaskRecord {
            url: format!("https://www.notion.so/{id}"),
            id,
            title: title.to_string(),
            identifier: Some(identifier.to_string()),
            related_pr_ids: Vec::new(),
        });
        self
    }

    pub fn create_count(&self) -> u64 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<(String, UpdatePrRecord)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn prs(&self) -> Vec<PrRecord> {
        self.prs.lock().unwrap().clone()
    }

    fn next_id(&self, kind: &str) -> String {
        format!("{kind}-{}", self.page_counter.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl RecordService for MockRecordService {
    async fn find_pr_by_number(&self, _database_id: &str, number: u64) -> Lookup<PrRecord> {
        if self.lookup_fail {
            return Lookup::Failed("mock lookup failure".into());
        }
        match self.prs.lock().unwrap().iter().find(|pr| pr.number == number) {
            Some(pr) => Lookup::Found(pr.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn find_task_by_identifier(
        &self,
        _database_id: &str,
        identifier: &str,
    ) -> Lookup<TaskRecord> {
        if self.lookup_fail {
            return Lookup::Failed("mock lookup failure".into());
        }
        match self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .find(|task| task.identifier.as_deref() == Some(identifier))
        {
            Some(task) => Lookup::Found(task.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn create_pr(
        &self,
        _database_id: &str,
        input: &CreatePrRecord,
    ) -> Result<PrRecord, ServiceError> {
        if self.write_fail {
            return Err(ServiceError::Api {
                status: 400,
                message: "mock create failure".into(),
            });
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id("pr");
        let record = PrRecord {
            url: format!("https://www.notion.so/{id}"),
            id,
            number: input.number,
            title: input.record_title(),
            state: Some(input.state),
            related_task_ids: input.task_page_id.iter().cloned().collect(),
            author: input.author.clone(),
            created_at: input.created_at,
        };
        self.prs.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_pr(
        &self,
        page_id: &str,
        update: &UpdatePrRecord,
    ) -> Result<PrRecord, ServiceError> {
        if self.write_fail {
            return Err(ServiceError::Api {
                status: 400,
                message: "mock update failure".into(),
            });
        }
        self.updates
            .lock()
            .unwrap()
            .push((page_id.to_string(), update.clone()));
        let mut prs = self.prs.lock().unwrap();
        let record = prs
            .iter_mut()
            .find(|pr| pr.id == page_id)
            .ok_or_else(|| ServiceError::NotFound(page_id.to_string()))?;
        if let Some(ref title) = update.title {
            record.title = title.clone();
        }
        if let Some(state) = update.state {
            record.state = Some(state);
        }
        if let Some(ref task) = update.task_page_id {
            record.related_task_ids = vec![task.clone()];
        }
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use prlink_core::PrState;

    use super::*;

    fn input(number: u64) -> CreatePrRecord {
        CreatePrRecord {
            number,
            title: "Add search".into(),
            url: format!("https://github.com/acme/app/pull/{number}"),
            state: PrState::Open,
            author: Some("octocat".into()),
            created_at: None,
            task_page_id: None,
        }
    }

    #[tokio::test]
    async fn find_or_create_creates_once() {
        let svc = MockRecordService::new();
        let first = svc.find_or_create_pr("db", &input(5)).await.unwrap();
        let second = svc.find_or_create_pr("db", &input(5)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(svc.create_count(), 1);
        assert!(svc.updates().is_empty(), "unchanged record must not be updated");
    }

    #[tokio::test]
    async fn find_or_create_distinct_numbers() {
        let svc = MockRecordService::new();
        svc.find_or_create_pr("db", &input(1)).await.unwrap();
        svc.find_or_create_pr("db", &input(2)).await.unwrap();
        assert_eq!(svc.create_count(), 2);
    }

    #[tokio::test]
    async fn find_or_create_refreshes_changed_fields() {
        let svc = MockRecordService::new();
        let created = svc.find_or_create_pr("db", &input(3)).await.unwrap();

        let mut changed = input(3);
        changed.title = "Add fuzzy search".into();
        changed.state = PrState::Merged;
        changed.task_page_id = Some("task-9".into());
        let refreshed = svc.find_or_create_pr("db", &changed).await.unwrap();

        assert_eq!(refreshed.id, created.id);
        assert_eq!(refreshed.title, "#3 Add fuzzy search");
        assert_eq!(refreshed.state, Some(PrState::Merged));
        assert_eq!(refreshed.related_task_ids, vec!["task-9".to_string()]);
        assert_eq!(svc.create_count(), 1);

        let updates = svc.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, created.id);
    }

    #[tokio::test]
    async fn find_or_create_creates_when_lookup_fails() {
        let svc = MockRecordService::new().with_lookup_fail();
        let record = svc.find_or_create_pr("db", &input(4)).await.unwrap();
        assert_eq!(record.number, 4);
        assert_eq!(svc.create_count(), 1);
    }

    #[tokio::test]
    async fn find_or_create_propagates_create_error() {
        let svc = MockRecordService::new().with_write_fail();
        let err = svc.find_or_create_pr("db", &input(6)).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn lookup_failure_is_distinguishable() {
        let svc = MockRecordService::new().with_lookup_fail();
        let lookup = svc.find_task_by_identifier("db", "TASK-1").await;
        assert!(matches!(lookup, Lookup::Failed(_)));
        assert_eq!(lookup.found(), None);

        let svc = MockRecordService::new();
        let lookup = svc.find_task_by_identifier("db", "TASK-1").await;
        assert_eq!(lookup, Lookup::NotFound);
    }

    #[tokio::test]
    async fn seeded_task_is_found() {
        let svc = MockRecordService::new().with_task("TASK-40", "Build search");
        let task = svc
            .find_task_by_identifier("db", "TASK-40")
            .await
            .found()
            .unwrap();
        assert_eq!(task.title, "Build search");
    }
}
