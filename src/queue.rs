// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;

use crate::{error::SessionError, timing_wheel::TimingWheel};

/// Bounded FIFO of outbound messages (spec.md §4.C).
///
/// `offer(msg, None)` is the synchronous bypass path: the caller is
/// expected to encode-and-write on its own context (spec.md: "invoke
/// encoder directly on the caller's context; bypass the queue"), so this
/// type only implements the queued half of the contract. The session
/// controller (spec.md §4.G `writeMessage`) decides which path to take.
pub struct WriteQueue<M> {
    tx: mpsc::Sender<M>,
    wheel: Arc<dyn TimingWheel>,
}

impl<M: Send + 'static> WriteQueue<M> {
    /// Creates a bounded queue plus the consumer half the send loop owns.
    pub fn new(capacity: usize, wheel: Arc<dyn TimingWheel>) -> (Self, mpsc::Receiver<M>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, wheel }, rx)
    }

    /// Attempts to enqueue `msg`.
    ///
    /// `timeout = None` is the synchronous path (spec.md §4.C "timeout ≤
    /// 0"): a single non-blocking `try_send`, reported as `Blocked`
    /// immediately rather than waiting at all. The session's write half is
    /// owned exclusively by the send loop (no mutex shared with callers,
    /// spec.md §9 "polymorphism over transports" split-ownership design),
    /// so a caller cannot literally invoke the encoder on its own task the
    /// way the spec's original single-threaded model does; a zero-wait
    /// `try_send` is the closest equivalent that preserves "do not make
    /// the caller wait".
    ///
    /// `timeout = Some(d)` attempts to enqueue, waiting up to `d` for
    /// room. The deadline is measured against the shared timing wheel
    /// rather than a per-call timer (spec.md §4.C: "measured on a coarse
    /// timing wheel, not a per-call timer"), so issuing many concurrent
    /// timed offers does not multiply the number of OS timers armed.
    pub async fn offer(&self, msg: M, timeout: Option<Duration>) -> Result<(), SessionError> {
        let Some(timeout) = timeout else {
            return match self.tx.try_send(msg) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => Err(SessionError::Blocked),
                Err(mpsc::error::TrySendError::Closed(_)) => Err(SessionError::SessionClosed),
            };
        };

        let deadline = self.wheel.after(timeout);
        tokio::select! {
            biased;
            res = self.tx.send(msg) => {
                res.map_err(|_| SessionError::SessionClosed)
            }
            _ = deadline => Err(SessionError::Blocked),
        }
    }

    /// `true` once the consumer (send loop) has been dropped, i.e. the
    /// session has finished reaping.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
