//! Cooperative waiting on the tokio timer.
//!
//! A wait is a loop of short actions separated by timer sleeps, so the
//! runtime stays free between ticks. The only way to cut a wait short is to
//! make its predicate false, usually by cancelling the session's [`Liveness`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared countdown bounding cooperative waits.
///
/// Clones share the same counter, so any holder can cancel a wait that is
/// running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<AtomicI64>);

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the countdown to `ticks`.
    pub fn arm(&self, ticks: i64) {
        self.0.store(ticks, Ordering::SeqCst);
    }

    /// Count one tick down and return what is left. Saturates at `i64::MIN`.
    pub fn tick(&self) -> i64 {
        let previous = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_else(|n| n);
        previous.saturating_sub(1)
    }

    pub fn remaining(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        self.remaining() > 0
    }

    /// Force the countdown non-positive; every pending wait ends on its next
    /// tick.
    pub fn cancel(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// Run `action` now, then again every `interval` while `keep_going` holds.
pub async fn polling_loop<T, A, P>(target: &mut T, interval: Duration, mut action: A, mut keep_going: P)
where
    A: FnMut(&mut T),
    P: FnMut(&T) -> bool,
{
    action(target);
    while keep_going(target) {
        tokio::time::sleep(interval).await;
        action(target);
    }
}
