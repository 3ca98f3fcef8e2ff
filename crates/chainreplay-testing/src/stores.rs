use chainreplay_store::{
    Error, MemoryTimelineStore, Result, SaveOutcome, StoreStats, TimelineFilter, TimelineStore,
};
use chainreplay_types::{ReplayEventCursor, ReplayTimelineRecord};

/// Store wrapper that starts failing `save` after a fixed number of
/// successes. Backs the store-write-failure backfill scenarios.
pub struct FlakyStore {
    inner: MemoryTimelineStore,
    fail_after: usize,
    saves: usize,
}

impl FlakyStore {
    pub fn new(fail_after: usize) -> Self {
        Self {
            inner: MemoryTimelineStore::new(),
            fail_after,
            saves: 0,
        }
    }

    pub fn inner(&self) -> &MemoryTimelineStore {
        &self.inner
    }
}

impl TimelineStore for FlakyStore {
    fn save(&mut self, records: &[ReplayTimelineRecord]) -> Result<SaveOutcome> {
        if self.saves >= self.fail_after {
            return Err(Error::Io(std::io::Error::other(
                "injected store write failure",
            )));
        }
        self.saves += 1;
        self.inner.save(records)
    }

    fn query(&self, filter: &TimelineFilter) -> Result<Vec<ReplayTimelineRecord>> {
        self.inner.query(filter)
    }

    fn get_cursor(&self) -> Result<Option<ReplayEventCursor>> {
        self.inner.get_cursor()
    }

    fn save_cursor(&mut self, cursor: Option<ReplayEventCursor>) -> Result<()> {
        self.inner.save_cursor(cursor)
    }

    fn clear(&mut self) -> Result<()> {
        self.inner.clear()
    }

    fn stats(&self) -> Result<StoreStats> {
        self.inner.stats()
    }
}
