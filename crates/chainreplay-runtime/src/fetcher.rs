use chainreplay_types::{RawOnChainEvent, ReplayEventCursor};

/// One page of raw events from the chain, plus the cursor to resume after
/// it. `done` signals the fetcher has reached `to_slot`.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RawOnChainEvent>,
    pub next_cursor: Option<ReplayEventCursor>,
    pub done: bool,
}

/// Paginated event source backing a backfill. Implemented over the RPC
/// client in production and over scripted pages in tests.
///
/// Errors are not retried internally; they surface as a fatal
/// `replay.fetch_failed` and the enclosing runtime may retry by
/// re-invocation.
pub trait PageFetcher {
    fn fetch_page(
        &mut self,
        cursor: Option<&ReplayEventCursor>,
        to_slot: u64,
        page_size: usize,
    ) -> impl Future<Output = anyhow::Result<EventPage>>;
}
