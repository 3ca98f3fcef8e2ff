use futures::future::BoxFuture;

use chainreplay_engine::{project, ProjectionMode, ProjectionOptions, ProjectionTelemetry};
use chainreplay_store::TimelineStore;
use chainreplay_types::{AlertKind, ReplayEventCursor, Severity};

use crate::alerts::{AlertContext, AlertDispatcher};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;

pub const ALERT_STORE_WRITE_FAILED: &str = "replay.backfill.store_write_failed";
pub const ALERT_INGESTION_LAG: &str = "replay.backfill.ingestion_lag";

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    pub to_slot: u64,
    pub page_size: usize,
    pub max_lag_slots: Option<u64>,
    pub seed: u64,
    pub created_at_ms: i64,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            to_slot: u64::MAX,
            page_size: 256,
            max_lag_slots: None,
            seed: 0,
            created_at_ms: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackfillProgress {
    PageFetched {
        page: usize,
        events: usize,
    },
    PageStored {
        inserted: usize,
        duplicates: usize,
    },
    StoreWriteFailed {
        message: String,
    },
    LagDetected {
        current_slot: u64,
        last_projected_slot: u64,
    },
    Completed {
        processed: usize,
        pages: usize,
        halted: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct BackfillReport {
    pub processed: usize,
    pub duplicates: usize,
    pub cursor: Option<ReplayEventCursor>,
    pub pages: usize,
    pub telemetry: ProjectionTelemetry,
    pub alerts_emitted: usize,
    /// True when a store write failure stopped the run before the fetcher
    /// was done.
    pub halted: bool,
}

type SlotProbe = Box<dyn Fn() -> BoxFuture<'static, u64> + Send>;

/// Paginated catch-up ingestion: fetch → project (lenient) → save →
/// checkpoint, with alerting on store failures and ingestion lag.
///
/// Single writer: one backfill owns the store mutably for its whole run.
pub struct BackfillService<'a, F> {
    store: &'a mut dyn TimelineStore,
    fetcher: F,
    dispatcher: Option<&'a mut AlertDispatcher>,
    current_slot: Option<SlotProbe>,
}

impl<'a, F: PageFetcher> BackfillService<'a, F> {
    pub fn new(store: &'a mut dyn TimelineStore, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            dispatcher: None,
            current_slot: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: &'a mut AlertDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Chain-tip probe for lag detection.
    pub fn with_current_slot(
        mut self,
        probe: impl Fn() -> BoxFuture<'static, u64> + Send + 'static,
    ) -> Self {
        self.current_slot = Some(Box::new(probe));
        self
    }

    pub async fn run<P>(
        &mut self,
        options: &BackfillOptions,
        cancel: &CancelToken,
        mut on_progress: P,
    ) -> Result<BackfillReport>
    where
        P: FnMut(BackfillProgress),
    {
        let mut report = BackfillReport {
            cursor: self.store.get_cursor()?,
            ..Default::default()
        };
        let mut last_projected_slot: Option<u64> = None;

        loop {
            cancel.check()?;

            let page = self
                .fetcher
                .fetch_page(report.cursor.as_ref(), options.to_slot, options.page_size)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))?;
            report.pages += 1;
            on_progress(BackfillProgress::PageFetched {
                page: report.pages,
                events: page.events.len(),
            });

            // Lenient projection never raises.
            let projection = project(
                &page.events,
                &ProjectionOptions {
                    mode: ProjectionMode::Lenient,
                    trace_id: Some(format!("backfill-{}", options.seed)),
                    seed: options.seed,
                    created_at_ms: options.created_at_ms,
                },
            )?;
            report.telemetry.merge(&projection.telemetry);
            if let Some(max_slot) = projection.events.iter().map(|e| e.slot).max() {
                last_projected_slot =
                    Some(last_projected_slot.map_or(max_slot, |s| s.max(max_slot)));
            }

            cancel.check()?;
            match self.store.save(&projection.records()) {
                Ok(outcome) => {
                    report.processed += outcome.inserted;
                    report.duplicates += outcome.duplicates;
                    on_progress(BackfillProgress::PageStored {
                        inserted: outcome.inserted,
                        duplicates: outcome.duplicates,
                    });

                    if let Some(next_cursor) = &page.next_cursor {
                        // The store enforces monotonicity; a regression here
                        // is a fetcher bug and aborts the run.
                        self.store.save_cursor(Some(next_cursor.clone()))?;
                        report.cursor = Some(next_cursor.clone());
                    }
                }
                Err(store_error) => {
                    // The failed page's cursor is never persisted; the next
                    // run re-fetches it and idempotent saves absorb the
                    // overlap.
                    let message = store_error.to_string();
                    on_progress(BackfillProgress::StoreWriteFailed {
                        message: message.clone(),
                    });
                    if let Some(dispatcher) = self.dispatcher.as_deref_mut() {
                        let mut context = AlertContext::new(
                            ALERT_STORE_WRITE_FAILED,
                            Severity::Error,
                            AlertKind::StoreWriteFailure,
                            message,
                        );
                        context.slot = last_projected_slot;
                        if dispatcher.emit(context).await.is_some() {
                            report.alerts_emitted += 1;
                        }
                    }
                    report.halted = !page.done;
                    break;
                }
            }

            if let (Some(probe), Some(max_lag)) = (&self.current_slot, options.max_lag_slots) {
                let current_slot = probe().await;
                if let Some(last) = last_projected_slot
                    && current_slot.saturating_sub(last) > max_lag
                {
                    on_progress(BackfillProgress::LagDetected {
                        current_slot,
                        last_projected_slot: last,
                    });
                    if let Some(dispatcher) = self.dispatcher.as_deref_mut() {
                        let mut context = AlertContext::new(
                            ALERT_INGESTION_LAG,
                            Severity::Warning,
                            AlertKind::ReplayIngestionLag,
                            format!(
                                "projection lags the chain tip by {} slots",
                                current_slot.saturating_sub(last)
                            ),
                        );
                        context.slot = Some(current_slot);
                        if dispatcher.emit(context).await.is_some() {
                            report.alerts_emitted += 1;
                        }
                    }
                }
            }

            if page.done {
                break;
            }
        }

        on_progress(BackfillProgress::Completed {
            processed: report.processed,
            pages: report.pages,
            halted: report.halted,
        });
        Ok(report)
    }
}
