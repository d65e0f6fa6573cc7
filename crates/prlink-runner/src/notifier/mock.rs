use std::sync::Mutex;

use async_trait::async_trait;

use super::{Notifier, NotifyError};

/// A mock notifier for testing that records posted comments and can be told
/// to fail.
pub struct MockNotifier {
    comments: Mutex<Vec<(u64, String)>>,
    fail: bool,
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            comments: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn with_fail(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn post_comment(&self, pr_number: u64, body: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::CommentFailed("mock comment failure".into()));
        }
        self.comments
            .lock()
            .unwrap()
            .push((pr_number, body.to_string()));
        Ok(())
    }
}
