//! Progress reporting for batch fetches.
//!
//! The fetch layer only reports through [`ProgressCallback`]; rendering
//! (progress bars, nothing at all) is chosen by the caller.

use std::sync::Arc;

/// Receives progress updates from a long-running batch.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of units in the batch.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the progress indicator.
    fn set_message(&self, msg: String);

    /// Marks the batch as done.
    fn finish(&self, msg: String);
}

/// Discards all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`] for callers that want no output.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
