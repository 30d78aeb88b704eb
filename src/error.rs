// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

/// Errors surfaced by the session engine (spec.md §7).
///
/// `TimeoutTransient` from spec.md is deliberately absent here: it is
/// swallowed inside the send/receive loops and never escapes as a value a
/// caller can observe (spec.md §7 "Propagation policy").
#[derive(Debug, Error)]
pub enum SessionError {
    /// Any operation attempted after `done` has been latched.
    #[error("session is closed")]
    SessionClosed,

    /// `writeMessage` could not enqueue within the caller-supplied timeout.
    #[error("write queue offer blocked")]
    Blocked,

    /// The decoder reported a framing error, or a decoded/raw message
    /// exceeded `max_message_length`. Fatal for the session.
    #[error("framing error: {0}")]
    Framing(String),

    /// A non-timeout I/O error on the underlying transport. Fatal.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// `run()` was called with a missing listener, encoder, or transport,
    /// or with an invalid tunable (spec.md §3 invariant 7, §6 defaults).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `listener.onOpen()` returned an error; the session closes before
    /// either loop starts, but `onClose` is still invoked.
    #[error("listener.onOpen failed: {0}")]
    ListenerOpen(String),

    /// A loop iteration (or the synchronous write path) panicked. The
    /// panic payload is captured and logged; this variant is what the
    /// session fails with instead of letting the panic escape the task
    /// (spec.md §7 "Propagation policy").
    #[error("panic in session task: {0}")]
    Panicked(String),
}

impl SessionError {
    /// Whether this error should be reported to `listener.onError` per
    /// spec.md §7 ("only if the receive loop carried the error").
    pub fn is_reportable(&self) -> bool {
        !matches!(self, SessionError::SessionClosed | SessionError::Blocked)
    }
}
