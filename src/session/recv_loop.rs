// SPDX-License-Identifier: AGPL-3.0-or-later

//! Receive loop (spec.md §4.E): one long-running task per session that
//! owns the transport's read half exclusively, accumulates bytes,
//! decodes frames, and dispatches decoded messages (spec.md §4.F).

use std::{net::SocketAddr, sync::Arc};

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use super::Session;
use crate::{
    cfg::enums::TransportKind,
    codec::DecodeOutcome,
    error::SessionError,
    listener::EventListener,
    taskpool::{self, TaskPool},
    transport::{udp::CONNECT_PING, ReadHalf, ReadOutcome, TransportReader},
};

pub(super) async fn run<D, L>(
    session: Arc<Session<D>>,
    mut reader: TransportReader,
    listener: Arc<L>,
    task_pool: Option<Arc<dyn TaskPool>>,
) where
    D: Send + Sync + 'static,
    L: EventListener<D>,
{
    let result = match session.kind() {
        TransportKind::Tcp => run_tcp(&session, &mut reader, &listener, task_pool.as_deref()).await,
        TransportKind::Udp => run_udp(&session, &mut reader, &listener, task_pool.as_deref()).await,
        TransportKind::Ws => run_ws(&session, &mut reader, &listener, task_pool.as_deref()).await,
    };

    // Latch `rDone` as soon as the loop returns, before the `on_error`
    // upcall or `session.close()`: the send loop's drain phase must never
    // start before this point (spec.md invariant 2).
    session.mark_recv_done();

    if let Err(e) = &result {
        warn!(error = %e, "receive loop exited with error");
        listener.on_error(&session, e).await;
    }
    session.close();
    debug!("receive loop exited");
}

async fn run_tcp<D, L>(
    session: &Arc<Session<D>>,
    reader: &mut TransportReader,
    listener: &Arc<L>,
    task_pool: Option<&dyn TaskPool>,
) -> Result<(), SessionError>
where
    D: Send + Sync + 'static,
    L: EventListener<D>,
{
    let mut scratch = vec![0u8; session.config().read_buffer_size];
    let mut acc = BytesMut::new();

    loop {
        if session.is_closed() {
            return Ok(());
        }
        let outcome = tokio::select! {
            biased;
            _ = session.closed_token().cancelled() => return Ok(()),
            r = reader.read_tcp(&mut scratch, session.config().read_timeout) => r?,
        };
        match outcome {
            ReadOutcome::TimedOut => continue,
            ReadOutcome::Ready(0) => {
                return Err(SessionError::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "peer closed the connection",
                )));
            },
            ReadOutcome::Ready(n) => {
                session.stat().add_read_bytes(n as u64);
                acc.extend_from_slice(&scratch[..n]);
            },
        }

        loop {
            if session.config().max_message_length > 0 && acc.len() > session.config().max_message_length {
                return Err(SessionError::Framing(format!(
                    "accumulated {} bytes exceeds max_message_length {}",
                    acc.len(),
                    session.config().max_message_length
                )));
            }
            match session.decoder().decode(&acc)? {
                DecodeOutcome::NeedMoreData => break,
                DecodeOutcome::Skip(n) => {
                    acc.advance(n);
                },
                DecodeOutcome::Message(msg, n) => {
                    acc.advance(n);
                    dispatch(session, listener, task_pool, msg, None).await;
                },
            }
        }
    }
}

async fn run_udp<D, L>(
    session: &Arc<Session<D>>,
    reader: &mut TransportReader,
    listener: &Arc<L>,
    task_pool: Option<&dyn TaskPool>,
) -> Result<(), SessionError>
where
    D: Send + Sync + 'static,
    L: EventListener<D>,
{
    let mut buf = vec![0u8; session.config().udp_max_buf_len()];

    loop {
        if session.is_closed() {
            return Ok(());
        }
        let outcome = tokio::select! {
            biased;
            _ = session.closed_token().cancelled() => return Ok(()),
            r = reader.read_udp(&mut buf, session.config().read_timeout) => r?,
        };
        match outcome {
            ReadOutcome::TimedOut => continue,
            ReadOutcome::Ready((n, _peer)) if &buf[..n] == CONNECT_PING => {
                continue;
            },
            ReadOutcome::Ready((n, peer)) => {
                session.record_peer(peer);
                session.stat().add_read_bytes(n as u64);
                if session.config().max_message_length > 0 && n > session.config().max_message_length {
                    return Err(SessionError::Framing(format!(
                        "datagram of {n} bytes exceeds max_message_length {}",
                        session.config().max_message_length
                    )));
                }
                match session.decoder().decode(&buf[..n])? {
                    DecodeOutcome::NeedMoreData => {
                        warn!("UDP decoder requested more data for a single datagram; dropping it");
                    },
                    DecodeOutcome::Skip(_) => {},
                    DecodeOutcome::Message(msg, _) => {
                        dispatch(session, listener, task_pool, msg, Some(peer)).await;
                    },
                }
            },
        }
    }
}

async fn run_ws<D, L>(
    session: &Arc<Session<D>>,
    reader: &mut TransportReader,
    listener: &Arc<L>,
    task_pool: Option<&dyn TaskPool>,
) -> Result<(), SessionError>
where
    D: Send + Sync + 'static,
    L: EventListener<D>,
{
    loop {
        if session.is_closed() {
            return Ok(());
        }
        let outcome = tokio::select! {
            biased;
            _ = session.closed_token().cancelled() => return Ok(()),
            r = reader.read_ws(session.config().read_timeout) => r?,
        };
        match outcome {
            ReadOutcome::TimedOut => continue,
            ReadOutcome::Ready(frame) => {
                session.stat().add_read_bytes(frame.bytes.len() as u64);
                if session.config().max_message_length > 0
                    && frame.bytes.len() > session.config().max_message_length
                {
                    return Err(SessionError::Framing(format!(
                        "WS frame of {} bytes exceeds max_message_length {}",
                        frame.bytes.len(),
                        session.config().max_message_length
                    )));
                }
                match session.decoder().decode(&frame.bytes)? {
                    DecodeOutcome::NeedMoreData => {
                        warn!("WS decoder requested more data for a single frame; dropping it");
                    },
                    DecodeOutcome::Skip(_) => {},
                    DecodeOutcome::Message(msg, _) => {
                        dispatch(session, listener, task_pool, msg, None).await;
                    },
                }
            },
        }
    }
}

/// Builds and runs (inline or on `task_pool`) the unit of work that
/// delivers one decoded message to the listener and increments
/// `readPkgs` on return (spec.md §4.F). `peer` is `Some` only for UDP
/// datagrams (spec.md §6 "UDP message envelope").
async fn dispatch<D, L>(
    session: &Arc<Session<D>>,
    listener: &Arc<L>,
    task_pool: Option<&dyn TaskPool>,
    message: D,
    peer: Option<SocketAddr>,
) where
    D: Send + Sync + 'static,
    L: EventListener<D>,
{
    let session = session.clone();
    let listener = listener.clone();
    taskpool::dispatch(task_pool, async move {
        listener.on_message(&session, message, peer).await;
        session.stat().inc_read_pkgs();
    })
    .await;
}
