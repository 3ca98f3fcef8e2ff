//! Fixtures and scripted collaborators for exercising the replay pipeline.
//!
//! Provides:
//! - Raw event builders and the canned clean/chaos streams
//! - Scripted page fetchers for backfill runs
//! - A store wrapper that fails after N saves
//! - Alert adapters that collect or fail

mod adapters;
mod fetchers;
mod fixtures;
mod stores;

pub use adapters::{CollectingAdapter, FailingAdapter};
pub use fetchers::{FailingFetcher, ScriptedFetcher};
pub use fixtures::*;
pub use stores::FlakyStore;
