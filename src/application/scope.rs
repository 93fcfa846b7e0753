//! Generation tokens for async work owned by a screen or editor.
//!
//! Every request issued on behalf of a view takes a [`Ticket`]. When the
//! request resolves, its result is applied only if the ticket is still
//! current: a newer request or closing the scope makes it stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct ScopeState {
    generation: AtomicU64,
    closed: AtomicBool,
    on_close: Notify,
}

/// Cloneable handle; all clones observe the same generation.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    state: Arc<ScopeState>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every earlier ticket.
    pub fn ticket(&self) -> Ticket {
        Ticket(self.state.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        !self.is_closed() && self.state.generation.load(Ordering::Acquire) == ticket.0
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Invalidate outstanding tickets without closing the scope.
    pub fn invalidate(&self) {
        self.state.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Close for good. Outstanding and future tickets are all stale.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::Release);
        self.invalidate();
        self.state.on_close.notify_waiters();
    }

    /// Resolves once [`Scope::close`] has been called.
    pub async fn closed(&self) {
        let notified = self.state.on_close.notified();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn latest_ticket_wins() {
        let scope = Scope::new();
        let first = scope.ticket();
        let second = scope.ticket();

        assert!(!scope.is_current(first));
        assert!(scope.is_current(second));
    }

    #[test]
    fn close_invalidates_everything() {
        let scope = Scope::new();
        let ticket = scope.ticket();
        scope.close();

        assert!(!scope.is_current(ticket));
        assert!(!scope.is_current(scope.ticket()));
    }

    #[test]
    fn clones_share_generation() {
        let scope = Scope::new();
        let handle = scope.clone();
        let ticket = scope.ticket();

        handle.invalidate();
        assert!(!scope.is_current(ticket));
    }

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let scope = Scope::new();
        let waiter = {
            let scope = scope.clone();
            tokio::spawn(async move { scope.closed().await })
        };

        tokio::task::yield_now().await;
        scope.close();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("closed() resolved")
            .expect("task joined");
        scope.closed().await;
    }
}
