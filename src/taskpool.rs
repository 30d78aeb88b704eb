// SPDX-License-Identifier: AGPL-3.0-or-later

use std::future::Future;

use futures::future::BoxFuture;

/// Optional executor used to offload `onMessage` dispatch from the
/// receive loop (spec.md §6 "Task-pool interface", §4.F).
///
/// Dispatch through a task pool is explicitly allowed to reorder messages
/// relative to wire order (spec.md §5 "Ordering guarantees"); callers
/// that need strict in-order delivery simply don't configure one
/// (spec.md default: "if absent, dispatch runs inline").
pub trait TaskPool: Send + Sync + 'static {
    /// Submits a unit of work with no return value, per spec.md §6.
    fn submit(&self, unit: BoxFuture<'static, ()>);
}

/// Offloads dispatch onto the ambient tokio runtime, grounded in the
/// teacher's `tokio::spawn` pattern for out-of-band work (the
/// unsolicited-NOP auto-reply in `client/client.rs`).
pub struct TokioTaskPool {
    handle: tokio::runtime::Handle,
}

impl TokioTaskPool {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl TaskPool for TokioTaskPool {
    fn submit(&self, unit: BoxFuture<'static, ()>) {
        self.handle.spawn(unit);
    }
}

/// Runs `fut` either inline or on `pool`, per spec.md §4.F.
pub(crate) async fn dispatch<F>(pool: Option<&dyn TaskPool>, fut: F)
where F: Future<Output = ()> + Send + 'static {
    match pool {
        Some(pool) => pool.submit(Box::pin(fut)),
        None => fut.await,
    }
}
