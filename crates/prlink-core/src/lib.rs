pub mod error;
pub mod pull_request;
pub mod record;
pub mod schema;
pub mod task_id;

pub use error::PatternError;
pub use pull_request::{PrState, PullRequest};
pub use record::{CreatePrRecord, PrRecord, TaskRecord, UpdatePrRecord};
pub use schema::{PrSchema, RecordSchema, TaskSchema};
pub use task_id::{TaskId, TaskIdPattern};
