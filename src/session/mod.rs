// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session controller (spec.md §4.G): the lifecycle owner that wires a
//! [`crate::transport::Transport`], a codec, an [`crate::listener::EventListener`],
//! and the send/receive loops together.

mod recv_loop;
mod send_loop;

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    attrs::{AttrKey, AttrStore, ATTR_CLIENT_OWNED},
    cfg::{
        config::SessionConfig,
        enums::{EndpointKind, TransportKind},
    },
    codec::{Decoder, Encoder},
    error::SessionError,
    listener::EventListener,
    queue::WriteQueue,
    stats::SessionStats,
    taskpool::TaskPool,
    timing_wheel::shared_timing_wheel,
    transport::{SplitTransport, Transport},
};

/// One queued write: encoded bytes plus, for UDP, the datagram's
/// destination (spec.md §4.A — TCP/WS ignore it).
pub(crate) struct WriteItem {
    pub bytes: Vec<u8>,
    pub peer: Option<SocketAddr>,
    /// How many `writePkgs` this item counts as on success: 1 for every
    /// write path except `writeBytesVector`, which counts as `len(parts)`
    /// (spec.md §4.G).
    pub pkgs: u64,
}

/// Session lifecycle (spec.md §3): `Configured → Open → Closing → Closed`,
/// each transition one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Configured = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Configured,
            1 => SessionState::Open,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }
}

struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    fn new(initial: SessionState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Advances the state forward, never backward; a no-op if `next` is
    /// not strictly later than the current state.
    fn advance(&self, next: SessionState) {
        loop {
            let cur = self.0.load(Ordering::Acquire);
            if next as u8 <= cur {
                return;
            }
            if self
                .0
                .compare_exchange(cur, next as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }
}

/// Hook invoked when a client-owned session reaches `Closed`, letting the
/// owner decide whether to re-establish the connection (spec.md §9: this
/// replaces the original attribute-map reconnect side channel with an
/// explicit callback).
#[async_trait]
pub trait ReconnectHook: Send + Sync + 'static {
    async fn on_stop(&self, session: &dyn std::any::Any) -> bool;
}

/// A running session over one connection, generic over the decoded
/// message type produced by its codec.
pub struct Session<D: Send + Sync + 'static> {
    config: SessionConfig,
    kind: TransportKind,
    stats: Arc<SessionStats>,
    attrs: AttrStore,
    state: AtomicSessionState,
    write_queue: WriteQueue<WriteItem>,
    closed: CancellationToken,
    /// Latched by the receive loop on its way out (spec.md §3 `rDone`,
    /// invariant 2). The send loop must observe this before it starts
    /// draining the write queue, so the transport's final `close()` never
    /// races the receive loop's last read.
    recv_done: CancellationToken,
    decoder: Arc<dyn Decoder<Message = D>>,
    encoder: Arc<dyn Encoder<Message = D>>,
    /// Last peer a UDP datagram was observed from, used to resolve a
    /// `None` destination on writes (spec.md §4.A transport capability
    /// table: UDP `write` needs a peer; the receive loop is the only
    /// thing that ever learns one).
    last_peer: Mutex<Option<SocketAddr>>,
    reconnect_hook: Option<Arc<dyn ReconnectHook>>,
}

impl<D: Send + Sync + 'static> Session<D> {
    /// Starts a session over `transport`, spawning the send and receive
    /// loops (spec.md §5). Returns immediately with a handle in the
    /// `Open` state; the loops run until the connection closes or
    /// `close()` is called.
    #[allow(clippy::too_many_arguments)]
    pub async fn run<L>(
        config: SessionConfig,
        transport: Transport,
        decoder: Arc<dyn Decoder<Message = D>>,
        encoder: Arc<dyn Encoder<Message = D>>,
        listener: Arc<L>,
        task_pool: Option<Arc<dyn TaskPool>>,
    ) -> Result<Arc<Self>, SessionError>
    where
        L: EventListener<D>,
    {
        Self::run_with_reconnect_hook(config, transport, decoder, encoder, listener, task_pool, None)
            .await
    }

    /// As [`Session::run`], additionally wiring a [`ReconnectHook`] invoked
    /// once the session reaches `Closed`, if it was marked client-owned
    /// via [`Session::mark_client_owned`] (spec.md §9 reconnect redesign).
    #[allow(clippy::too_many_arguments)]
    pub async fn run_with_reconnect_hook<L>(
        config: SessionConfig,
        transport: Transport,
        decoder: Arc<dyn Decoder<Message = D>>,
        encoder: Arc<dyn Encoder<Message = D>>,
        listener: Arc<L>,
        task_pool: Option<Arc<dyn TaskPool>>,
        reconnect_hook: Option<Arc<dyn ReconnectHook>>,
    ) -> Result<Arc<Self>, SessionError>
    where
        L: EventListener<D>,
    {
        config.validate()?;
        let kind = transport.kind();
        let wheel = shared_timing_wheel();
        let (write_queue, write_rx) = WriteQueue::new(config.write_queue_capacity, wheel);

        let session = Arc::new(Self {
            config,
            kind,
            stats: Arc::new(SessionStats::default()),
            attrs: AttrStore::new(),
            state: AtomicSessionState::new(SessionState::Configured),
            write_queue,
            closed: CancellationToken::new(),
            recv_done: CancellationToken::new(),
            decoder,
            encoder,
            last_peer: Mutex::new(None),
            reconnect_hook,
        });

        session.state.advance(SessionState::Open);
        let opened = guarded(listener.on_open(&session))
            .await
            .unwrap_or_else(Err);
        if let Err(e) = opened {
            warn!(error = %e, "on_open rejected session");
            session.state.advance(SessionState::Closed);
            session.recv_done.cancel();
            listener.on_close(&session).await;
            return Err(e);
        }

        let (reader, writer) = transport.split();

        tokio::spawn(send_loop::run(
            session.clone(),
            writer,
            write_rx,
            listener.clone(),
        ));
        tokio::spawn(recv_loop::run(
            session.clone(),
            reader,
            listener,
            task_pool,
        ));

        info!(kind = ?session.kind, "session opened");
        Ok(session)
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn endpoint(&self) -> EndpointKind {
        self.config.endpoint
    }

    /// The session's display label (spec.md §3 `name`): the configured
    /// `name` if one was set, otherwise `"<endpoint>-<transport>"`
    /// (e.g. `"server-tcp"`).
    pub fn name(&self) -> String {
        self.config
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.config.endpoint, self.kind))
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// `true` once `close()` has been called, i.e. `done` is latched
    /// (spec.md invariant 1). This is true for the whole `Closing`→`Closed`
    /// span, not just the terminal state: both loops and `writeMessage`
    /// must stop treating the session as open as soon as a close is
    /// requested, not only once the reaper has finished. Use [`Session::state`]
    /// to distinguish `Closing` from `Closed` precisely.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// The raw counters (spec.md §3 `stats`), for callers that want to read
    /// individual fields rather than the rendered line `stat()` produces.
    pub(crate) fn stat(&self) -> &SessionStats {
        &self.stats
    }

    /// A cloned handle to this session's statistics, so a caller can poll
    /// counters from another task without holding onto the whole session
    /// (spec.md §3 `stats`).
    pub fn stats_handle(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }

    /// One human-readable line summarizing this session: name, transport
    /// kind, and the four counters (spec.md §4.G `stat()`).
    pub fn stat_line(&self) -> String {
        format!("session[{} kind={}] {}", self.name(), self.kind, self.stats)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn get_attribute<T: Clone + 'static>(&self, key: impl Into<AttrKey>) -> Option<T> {
        self.attrs.get(&key.into())
    }

    pub fn set_attribute<T: Send + Sync + 'static>(&self, key: impl Into<AttrKey>, value: T) {
        self.attrs.set(key.into(), value)
    }

    pub fn remove_attribute(&self, key: impl Into<AttrKey>) {
        self.attrs.remove(&key.into())
    }

    /// Marks this session as owned by a client-side reconnect loop
    /// (spec.md §9 reconnect hook).
    pub fn mark_client_owned(&self) {
        self.set_attribute(ATTR_CLIENT_OWNED, true);
    }

    pub fn is_client_owned(&self) -> bool {
        self.get_attribute::<bool>(ATTR_CLIENT_OWNED).unwrap_or(false)
    }

    /// Encodes `message` and enqueues it, waiting up to the session's
    /// configured write timeout for room in the write queue (spec.md
    /// §4.C).
    pub async fn write_message(&self, message: &D) -> Result<(), SessionError> {
        self.write_message_timeout(message, Some(self.config.write_timeout)).await
    }

    /// As [`Session::write_message`], with an explicit `timeout` (spec.md
    /// §4.C `writeMessage(message, timeout)`): `None` is the synchronous
    /// bypass path, `Some(d)` waits up to `d` for room in the queue.
    pub async fn write_message_timeout(
        &self,
        message: &D,
        timeout: Option<Duration>,
    ) -> Result<(), SessionError> {
        let encoder = self.encoder.clone();
        let bytes = guarded_sync(move || encoder.encode(message)).and_then(std::convert::identity)?;
        self.write_bytes_timeout(bytes, None, timeout).await
    }

    /// Enqueues raw bytes directly, bypassing the codec (spec.md §4.D
    /// synchronous/typed write paths collapse to the same queue), waiting
    /// up to the session's configured write timeout for room.
    pub async fn write_bytes(&self, bytes: Vec<u8>, peer: Option<SocketAddr>) -> Result<(), SessionError> {
        self.write_bytes_timeout(bytes, peer, Some(self.config.write_timeout)).await
    }

    /// As [`Session::write_bytes`], with an explicit `timeout` (spec.md
    /// §4.C). For UDP, a `None` peer falls back to the last datagram
    /// sender the receive loop observed.
    pub async fn write_bytes_timeout(
        &self,
        bytes: Vec<u8>,
        peer: Option<SocketAddr>,
        timeout: Option<Duration>,
    ) -> Result<(), SessionError> {
        self.enqueue(bytes, peer, timeout, 1).await
    }

    /// Enqueues several buffers as one logical write (concatenated),
    /// convenient for codecs that build a message out of header + body
    /// slices without an intermediate copy at the call site. Counts as
    /// `len(parts)` toward `writePkgs` on success (spec.md §4.G
    /// `writeBytesVector`).
    pub async fn write_bytes_vector(
        &self,
        parts: Vec<Vec<u8>>,
        peer: Option<SocketAddr>,
    ) -> Result<(), SessionError> {
        let pkgs = parts.len() as u64;
        let total = parts.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for part in parts {
            bytes.extend_from_slice(&part);
        }
        self.enqueue(bytes, peer, Some(self.config.write_timeout), pkgs).await
    }

    async fn enqueue(
        &self,
        bytes: Vec<u8>,
        peer: Option<SocketAddr>,
        timeout: Option<Duration>,
        pkgs: u64,
    ) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::SessionClosed);
        }
        let peer = peer.or_else(|| {
            if self.kind == TransportKind::Udp {
                *self.last_peer.lock().expect("last_peer lock poisoned")
            } else {
                None
            }
        });
        let item = WriteItem { bytes, peer, pkgs };
        self.write_queue.offer(item, timeout).await
    }

    /// Begins graceful shutdown: no new writes are accepted, queued writes
    /// drain for up to `wait_on_close`, then the transport is closed
    /// (spec.md §4.D/§4.G).
    pub fn close(&self) {
        if self.state.get() as u8 >= SessionState::Closing as u8 {
            return;
        }
        self.state.advance(SessionState::Closing);
        self.closed.cancel();
        debug!("session closing");
    }

    pub(crate) fn closed_token(&self) -> &CancellationToken {
        &self.closed
    }

    pub(crate) fn mark_closed(&self) {
        self.state.advance(SessionState::Closed);
    }

    pub(crate) fn decoder(&self) -> &Arc<dyn Decoder<Message = D>> {
        &self.decoder
    }

    /// The token the receive loop latches on its way out (spec.md §3
    /// `rDone`). The send loop awaits this before draining.
    pub(crate) fn recv_done_token(&self) -> &CancellationToken {
        &self.recv_done
    }

    /// Latches `recv_done` (spec.md invariant 2). Idempotent: cancelling
    /// an already-cancelled token is a no-op.
    pub(crate) fn mark_recv_done(&self) {
        self.recv_done.cancel();
    }

    pub(crate) fn record_peer(&self, peer: SocketAddr) {
        *self.last_peer.lock().expect("last_peer lock poisoned") = Some(peer);
    }

    pub(crate) fn reconnect_hook(&self) -> Option<&Arc<dyn ReconnectHook>> {
        self.reconnect_hook.as_ref()
    }
}

/// Runs `fut` to completion, catching any panic it raises instead of
/// letting it unwind across the task boundary (spec.md §7: "Panics within
/// loops... must be caught, logged with a stack trace, and treated as
/// fatal for that session; they must not escape").
pub(crate) async fn guarded<F>(fut: F) -> Result<F::Output, SessionError>
where F: std::future::Future {
    std::panic::AssertUnwindSafe(fut).catch_unwind().await.map_err(|payload| {
        let msg = panic_message(&payload);
        error!(panic = %msg, "panic caught in session task");
        SessionError::Panicked(msg)
    })
}

/// As [`guarded`], for a synchronous closure (user-supplied codec calls,
/// which never cross an `.await` point).
///
/// Wrapped in `AssertUnwindSafe` rather than bounding `f: UnwindSafe`: `f`
/// typically captures an `Arc<dyn Encoder<...>>`, and a bare trait object
/// is never `RefUnwindSafe`, so requiring `UnwindSafe` on the closure
/// would reject every real caller.
pub(crate) fn guarded_sync<F, T>(f: F) -> Result<T, SessionError>
where F: FnOnce() -> T {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).map_err(|payload| {
        let msg = panic_message(&payload);
        error!(panic = %msg, "panic caught in session task");
        SessionError::Panicked(msg)
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
