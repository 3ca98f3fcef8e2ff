use std::collections::VecDeque;

use anyhow::anyhow;

use chainreplay_runtime::{EventPage, PageFetcher};
use chainreplay_types::{RawOnChainEvent, ReplayEventCursor};

/// Fetcher that replays a scripted page sequence, ignoring the cursor it is
/// handed. Records call counts for assertions.
pub struct ScriptedFetcher {
    pages: VecDeque<EventPage>,
    pub calls: usize,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<EventPage>) -> Self {
        Self {
            pages: pages.into(),
            calls: 0,
        }
    }

    /// Split an event stream into pages of `page_size`, deriving each page's
    /// cursor from its last event and marking the final page `done`.
    pub fn paged(events: Vec<RawOnChainEvent>, page_size: usize) -> Self {
        let chunks: Vec<Vec<RawOnChainEvent>> = events
            .chunks(page_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();
        let page_count = chunks.len().max(1);

        let mut pages = Vec::new();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let next_cursor = chunk.last().map(|event| ReplayEventCursor {
                slot: event.slot,
                signature: event.signature.clone(),
                event_name: Some(event.event_name.clone()),
            });
            pages.push(EventPage {
                events: chunk,
                next_cursor,
                done: i + 1 == page_count,
            });
        }
        if pages.is_empty() {
            pages.push(EventPage {
                events: Vec::new(),
                next_cursor: None,
                done: true,
            });
        }
        Self::new(pages)
    }
}

impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &mut self,
        _cursor: Option<&ReplayEventCursor>,
        _to_slot: u64,
        _page_size: usize,
    ) -> anyhow::Result<EventPage> {
        self.calls += 1;
        self.pages
            .pop_front()
            .ok_or_else(|| anyhow!("scripted fetcher exhausted after {} pages", self.calls - 1))
    }
}

/// Fetcher that always fails, for `replay.fetch_failed` paths.
pub struct FailingFetcher {
    pub message: String,
}

impl FailingFetcher {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl PageFetcher for FailingFetcher {
    async fn fetch_page(
        &mut self,
        _cursor: Option<&ReplayEventCursor>,
        _to_slot: u64,
        _page_size: usize,
    ) -> anyhow::Result<EventPage> {
        Err(anyhow!("{}", self.message))
    }
}
