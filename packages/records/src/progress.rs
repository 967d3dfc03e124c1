//! Progress reporting for bulk period loads.
//!
//! Forecasting and trend views preload every period in the catalog. The
//! [`ProgressCallback`] trait lets a front-end render that (e.g. with an
//! `indicatif` bar) without this crate depending on any renderer.

use std::sync::Arc;

/// Receives progress updates from long-running loads.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// concurrent fetches.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Silently ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
