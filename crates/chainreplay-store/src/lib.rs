mod error;
mod memory;
mod sqlite;
mod store;

pub use error::{Error, Result};
pub use memory::MemoryTimelineStore;
pub use sqlite::SqliteTimelineStore;
pub use store::{SaveOutcome, StoreStats, TimelineFilter, TimelineStore};
