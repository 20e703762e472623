//! Guard against a load finishing after its screen has gone away.
//!
//! A screen creates a [`LoadGuard`] when it mounts, runs its loads through
//! [`LoadGuard::run`], and calls [`LoadGuard::cancel`] on teardown. A load that
//! completes after cancellation yields `None`, so its result never reaches shared
//! state.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct LoadGuard {
    cancelled: Arc<AtomicBool>,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Await `fut`; its output is dropped if the guard was cancelled meanwhile.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let out = fut.await;
        if self.is_cancelled() {
            tracing::debug!("Dropping result of a cancelled load");
            return None;
        }
        Some(out)
    }
}
