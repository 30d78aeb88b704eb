// SPDX-License-Identifier: AGPL-3.0-or-later

//! Send loop (spec.md §4.D): one long-running task per session that owns
//! the transport's write half exclusively.

use std::sync::Arc;

use tokio::{sync::mpsc, time::interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Session, WriteItem};
use crate::{
    listener::EventListener,
    transport::{TransportWriter, WriteHalf},
};

pub(super) async fn run<D, L>(
    session: Arc<Session<D>>,
    mut writer: TransportWriter,
    mut queue: mpsc::Receiver<WriteItem>,
    listener: Arc<L>,
) where
    D: Send + Sync + 'static,
    L: EventListener<D>,
{
    let mut cron = interval(session.config.cron_period);
    cron.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; consume it so `on_cron` only fires
    // on the configured cadence, not once at startup.
    cron.tick().await;

    let done: CancellationToken = session.closed_token().clone();
    // spec.md §4.D case 2/3's "send-flag": cleared the moment an
    // encode/write fails, so every subsequent queued message is dropped
    // (not written to a broken transport) and cron stops emitting PINGs,
    // while the loop keeps consuming the queue until the `done`+`rDone`
    // shutdown path terminates it.
    let mut healthy = true;

    loop {
        tokio::select! {
            biased;

            _ = done.cancelled() => {
                // Invariant 2 (spec.md §3): the send loop must not start
                // draining — let alone return — before the receive loop
                // has latched `rDone`. The receive loop notices `done` on
                // its own next iteration (at most one read timeout away)
                // and exits on its own.
                session.recv_done_token().cancelled().await;
                drain_on_close(&session, &mut writer, &mut queue, &mut healthy).await;
                break;
            }

            item = queue.recv() => {
                match item {
                    Some(item) => send_one(&session, &mut writer, item, &mut healthy).await,
                    None => break,
                }
            }

            _ = cron.tick() => {
                if healthy && session.kind() == crate::cfg::enums::TransportKind::Ws {
                    if let Err(e) = writer.write_ping().await {
                        warn!(error = %e, "heartbeat ping failed");
                    }
                }
                listener.on_cron(&session).await;
            }
        }
    }

    writer.close(session.config().wait_on_close).await;
    session.mark_closed();
    listener.on_close(&session).await;
    maybe_reconnect(&session).await;
    debug!("send loop exited");
}

/// Spec.md §5 "Cancellation and timeouts": a closed session that was
/// started by a client requests a reconnect. §9 replaces the original
/// attribute-map side channel with this explicit hook, consulted only
/// once both loops have exited and `onClose` has fired.
async fn maybe_reconnect<D>(session: &Arc<Session<D>>)
where D: Send + Sync + 'static {
    if !session.is_client_owned() {
        return;
    }
    let Some(hook) = session.reconnect_hook() else {
        return;
    };
    let hook = hook.clone();
    if hook.on_stop(session.as_ref()).await {
        debug!("reconnect hook requested a reconnect");
    }
}

/// Drains whatever is already queued, honoring `wait_on_close` as the
/// total budget for the drain (spec.md §4.D "On close").
async fn drain_on_close<D>(
    session: &Arc<Session<D>>,
    writer: &mut TransportWriter,
    queue: &mut mpsc::Receiver<WriteItem>,
    healthy: &mut bool,
) where
    D: Send + Sync + 'static,
{
    let deadline = tokio::time::Instant::now() + session.config().wait_on_close;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout_at(deadline, queue.recv()).await {
            Ok(Some(item)) => send_one(session, writer, item, healthy).await,
            Ok(None) | Err(_) => break,
        }
    }
}

/// Writes one queued item, or drops it silently once `healthy` has been
/// cleared by an earlier failure (spec.md §4.D case 2: "clear the
/// send-flag so further queued messages are dropped, not drained to the
/// network"). On success, advances `writePkgs` by `item.pkgs` (1 for
/// every write path except `writeBytesVector`, spec.md §4.G). On
/// failure, clears `healthy` and closes the session (spec.md §4.D case
/// 2: "on encode/write failure, call `stop()`").
async fn send_one<D>(
    session: &Arc<Session<D>>,
    writer: &mut TransportWriter,
    item: WriteItem,
    healthy: &mut bool,
) where
    D: Send + Sync + 'static,
{
    if !*healthy {
        return;
    }
    let len = item.bytes.len() as u64;
    match writer.write(&item.bytes, item.peer).await {
        Ok(()) => {
            session.stat().add_write_bytes(len);
            session.stat().add_write_pkgs(item.pkgs);
        },
        Err(e) => {
            warn!(error = %e, "write failed");
            *healthy = false;
            session.close();
        },
    }
}
