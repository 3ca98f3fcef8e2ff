use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use futures::future::BoxFuture;

use chainreplay_runtime::AlertAdapter;
use chainreplay_types::ReplayAnomalyAlert;

/// Adapter that records every alert it receives.
#[derive(Default)]
pub struct CollectingAdapter {
    received: Arc<Mutex<Vec<ReplayAnomalyAlert>>>,
}

impl CollectingAdapter {
    /// Returns the adapter plus a handle to its collected alerts.
    pub fn new() -> (Self, Arc<Mutex<Vec<ReplayAnomalyAlert>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                received: received.clone(),
            },
            received,
        )
    }
}

impl AlertAdapter for CollectingAdapter {
    fn name(&self) -> &str {
        "collecting"
    }

    fn emit<'a>(&'a self, alert: &'a ReplayAnomalyAlert) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.received.lock().unwrap().push(alert.clone());
            Ok(())
        })
    }
}

/// Adapter that always fails; dispatcher must swallow it.
pub struct FailingAdapter;

impl AlertAdapter for FailingAdapter {
    fn name(&self) -> &str {
        "failing"
    }

    fn emit<'a>(&'a self, _alert: &'a ReplayAnomalyAlert) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move { Err(anyhow!("sink unavailable")) })
    }
}
