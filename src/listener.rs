// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::{error::SessionError, session::Session};

/// Upcalls into user code (spec.md §6 "Event listener interface").
///
/// All five methods are "synchronous from the engine's perspective"
/// (spec.md): the engine awaits each call before moving on, so an
/// `onMessage` implementation that never returns stalls that connection's
/// dispatch, exactly as a blocking callback would in the original design.
#[async_trait]
pub trait EventListener<D: Send + Sync + 'static>: Send + Sync + 'static {
    /// Called once, before either loop starts. Returning `Err` aborts
    /// startup: the session closes immediately and the loops never run,
    /// but `onClose` still fires (spec.md §6, §7 `ListenerOpenError`).
    async fn on_open(&self, _session: &Session<D>) -> Result<(), SessionError> {
        Ok(())
    }

    /// Called once per decoded (and, for UDP, per-datagram) message.
    /// `peer` carries the sending address for UDP (spec.md §6 "UDP message
    /// envelope"); it is always `None` for TCP and WS, which have a single
    /// implied peer for the whole connection.
    async fn on_message(&self, session: &Session<D>, message: D, peer: Option<SocketAddr>);

    /// Called every `cron_period`, only while the session is healthy
    /// (spec.md §4.D case 3).
    async fn on_cron(&self, _session: &Session<D>) {}

    /// Called when the receive loop exits carrying an error (spec.md
    /// §4.E "On exit").
    async fn on_error(&self, _session: &Session<D>, _error: &SessionError) {}

    /// Called exactly once, after the send loop exits (spec.md §4.D,
    /// invariant in §8 property 2).
    async fn on_close(&self, _session: &Session<D>) {}
}
