pub mod mock;
mod notion;
pub mod payload;
mod traits;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use mock::MockRecordService;
pub use notion::{NotionService, DEFAULT_BASE_URL, DEFAULT_VERSION};
pub use traits::{Lookup, RecordService, ServiceError};
