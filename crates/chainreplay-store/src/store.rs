use serde::{Deserialize, Serialize};

use chainreplay_types::{ReplayEventCursor, ReplayTimelineRecord};

use crate::error::Result;

/// Outcome of an idempotent batch save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Aggregate counters for the status surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub event_count: usize,
    pub unique_task_count: usize,
    pub unique_dispute_count: usize,
}

/// Query filter over the stored timeline. All axes are optional and
/// conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Pagination: return records strictly after this `(slot, signature)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<ReplayEventCursor>,
}

impl TimelineFilter {
    pub fn matches(&self, record: &ReplayTimelineRecord) -> bool {
        let event = &record.event;
        if let Some(task) = &self.task_pda
            && event.task_pda.as_deref() != Some(task.as_str())
        {
            return false;
        }
        if let Some(dispute) = &self.dispute_pda
            && event.dispute_pda.as_deref() != Some(dispute.as_str())
        {
            return false;
        }
        if let Some(from) = self.from_slot
            && event.slot < from
        {
            return false;
        }
        if let Some(to) = self.to_slot
            && event.slot > to
        {
            return false;
        }
        if let Some(name) = &self.source_event_name
            && event.source_event_name != *name
        {
            return false;
        }
        if let Some(source_type) = &self.source_event_type
            && record.source_event_type != *source_type
        {
            return false;
        }
        if let Some(cursor) = &self.cursor
            && (event.slot, event.signature.as_str()) <= (cursor.slot, cursor.signature.as_str())
        {
            return false;
        }
        true
    }
}

// NOTE: Concurrency contract. Backfill is the single writer; readers may
// query concurrently from other jobs. Implementations over a transactional
// backend serialize `save` calls within one backfill (page-level atomicity),
// and after `save(R)` returns, a query spanning R's slot range includes
// exactly R minus previously stored duplicates.

/// Durable, idempotent timeline storage.
pub trait TimelineStore: Send {
    /// Idempotent batch append keyed on `(slot, signature, source_event_type)`.
    /// The batch is atomic: either every new record lands or none do.
    fn save(&mut self, records: &[ReplayTimelineRecord]) -> Result<SaveOutcome>;

    /// Filtered read, sorted by `(slot, signature, source_event_sequence)`.
    fn query(&self, filter: &TimelineFilter) -> Result<Vec<ReplayTimelineRecord>>;

    /// Current replay checkpoint, if any.
    fn get_cursor(&self) -> Result<Option<ReplayEventCursor>>;

    /// Persist the replay checkpoint. Writing a cursor strictly behind the
    /// persisted one fails with `Error::CursorRegression`; `None` resets.
    fn save_cursor(&mut self, cursor: Option<ReplayEventCursor>) -> Result<()>;

    /// Drop all records and the cursor. Test utility.
    fn clear(&mut self) -> Result<()>;

    /// Aggregate counters for the status surface.
    fn stats(&self) -> Result<StoreStats>;
}

pub(crate) fn check_cursor_monotone(
    previous: Option<&ReplayEventCursor>,
    attempted: &ReplayEventCursor,
) -> Result<()> {
    if let Some(previous) = previous
        && attempted < previous
    {
        return Err(crate::error::Error::CursorRegression {
            previous: previous.clone(),
            attempted: attempted.clone(),
        });
    }
    Ok(())
}
