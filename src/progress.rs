//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] into a stage config (for
//! example [`crate::config::SplitConfigBuilder::progress_callback`]) to
//! receive events as the extractor, splitter or compressor works through its
//! items. The library never draws anything itself; the `flipbook` binary
//! turns these events into a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use flipbook_prep::{BatchProgressCallback, SplitConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, item: usize, total: usize, detail: &str) {
//!         let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}: item {item}/{total} {detail}");
//!     }
//! }
//!
//! let config = SplitConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by a batch stage as it processes each item.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Items are processed one at a time, in order, but
/// the trait is `Send + Sync` so an implementation can be shared with other
/// threads (a progress bar's ticker, for instance).
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first item.
    ///
    /// # Arguments
    /// * `total`: number of items the stage will attempt
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an item is processed.
    ///
    /// # Arguments
    /// * `item` : 1-indexed item number
    /// * `total`: total items
    fn on_item_start(&self, item: usize, total: usize) {
        let _ = (item, total);
    }

    /// Called when an item was processed successfully.
    ///
    /// # Arguments
    /// * `item`  : 1-indexed item number
    /// * `total` : total items
    /// * `detail`: short human-readable description of what was written
    fn on_item_complete(&self, item: usize, total: usize, detail: &str) {
        let _ = (item, total, detail);
    }

    /// Called when an item was skipped or failed.
    fn on_item_error(&self, item: usize, total: usize, error: &str) {
        let _ = (item, total, error);
    }

    /// Called once after every item has been attempted.
    ///
    /// # Arguments
    /// * `total`        : items attempted
    /// * `success_count`: items that completed without error
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the stage configs.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_item_start(&self, _item: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _item: usize, _total: usize, _detail: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _item: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(5);
        cb.on_item_start(1, 5);
        cb.on_item_complete(1, 5, "page_001.png");
        cb.on_item_error(2, 5, "not found");
        cb.on_batch_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        tracker.on_item_start(1, 3);
        tracker.on_item_complete(1, 3, "cover + page 1");
        tracker.on_item_start(2, 3);
        tracker.on_item_complete(2, 3, "pages 2-3");
        tracker.on_item_start(3, 3);
        tracker.on_item_error(3, 3, "corrupt PNG");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_batch_complete(3, 2);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }
}
