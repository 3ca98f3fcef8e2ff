use std::collections::BTreeMap;
use std::collections::HashSet;

use chainreplay_types::{ReplayEventCursor, ReplayTimelineRecord};

use crate::error::Result;
use crate::store::{
    check_cursor_monotone, SaveOutcome, StoreStats, TimelineFilter, TimelineStore,
};

/// In-memory timeline store. The default backend for tests and for
/// single-shot tool invocations that do not need durability.
#[derive(Default)]
pub struct MemoryTimelineStore {
    records: BTreeMap<(u64, String, String), ReplayTimelineRecord>,
    cursor: Option<ReplayEventCursor>,
}

impl MemoryTimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TimelineStore for MemoryTimelineStore {
    fn save(&mut self, records: &[ReplayTimelineRecord]) -> Result<SaveOutcome> {
        let mut outcome = SaveOutcome::default();
        for record in records {
            let (slot, signature, source_type) = record.store_key();
            let key = (slot, signature.to_string(), source_type.to_string());
            if self.records.contains_key(&key) {
                outcome.duplicates += 1;
            } else {
                self.records.insert(key, record.clone());
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    fn query(&self, filter: &TimelineFilter) -> Result<Vec<ReplayTimelineRecord>> {
        let mut results: Vec<ReplayTimelineRecord> = self
            .records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            (a.event.slot, &a.event.signature, a.event.source_event_sequence).cmp(&(
                b.event.slot,
                &b.event.signature,
                b.event.source_event_sequence,
            ))
        });
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn get_cursor(&self) -> Result<Option<ReplayEventCursor>> {
        Ok(self.cursor.clone())
    }

    fn save_cursor(&mut self, cursor: Option<ReplayEventCursor>) -> Result<()> {
        if let Some(attempted) = &cursor {
            check_cursor_monotone(self.cursor.as_ref(), attempted)?;
        }
        self.cursor = cursor;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.cursor = None;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let mut tasks = HashSet::new();
        let mut disputes = HashSet::new();
        for record in self.records.values() {
            if let Some(task) = &record.event.task_pda {
                tasks.insert(task.clone());
            }
            if let Some(dispute) = &record.event.dispute_pda {
                disputes.insert(dispute.clone());
            }
        }
        Ok(StoreStats {
            event_count: self.records.len(),
            unique_task_count: tasks.len(),
            unique_dispute_count: disputes.len(),
        })
    }
}
