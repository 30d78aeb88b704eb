// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transport adapter: a uniform capability set over TCP, UDP, and
//! WebSocket connections (spec.md §4.A).
//!
//! Each variant is split once, at `Session::run()` time, into an
//! independent read half and write half (spec.md §5: receive loop and
//! send loop are the two long-running units; neither needs to
//! synchronize with the other over the transport itself). For TCP that
//! is the stream's own owned read/write halves; for UDP both halves
//! share the socket via `Arc` (its `send_to`/`recv_from` already take
//! `&self`); for WS it is `futures::StreamExt::split`'s sink/stream
//! pair.

pub mod tcp;
pub mod udp;
pub mod ws;

use std::{net::SocketAddr, time::Duration};

use enum_dispatch::enum_dispatch;
use tokio_tungstenite::WebSocketStream;

use crate::{cfg::enums::TransportKind, error::SessionError};
pub use tcp::TcpTransport;
pub use udp::UdpTransport;
pub use ws::WsTransport;

/// Concrete WS stream used by [`Transport::Ws`]. TLS termination is out
/// of this crate's scope (spec.md §1 Non-goals); callers that need TLS
/// perform the handshake themselves and hand the resulting duplex to
/// `tokio-tungstenite` before constructing a session, same as any other
/// WS upgrade.
pub type WsStream = WebSocketStream<tokio::net::TcpStream>;

/// One `transport.read` outcome (spec.md §4.A: "A timeout read... is NOT
/// an error to the caller").
#[derive(Debug)]
pub enum ReadOutcome<T> {
    /// Data was read.
    Ready(T),
    /// The read deadline elapsed before any data arrived; the receive
    /// loop should simply iterate again.
    TimedOut,
}

/// One WebSocket frame, already defragmented into owned bytes.
#[derive(Debug)]
pub struct WsFrame {
    pub bytes: Vec<u8>,
    /// `true` for a `Message::Binary` frame, `false` for `Message::Text`.
    /// Codecs that only speak one of the two can ignore this; ones that
    /// need to preserve the distinction (e.g. re-emitting Text replies)
    /// use it to pick the right frame type on write.
    pub is_binary: bool,
}

/// A connection not yet split into independent read/write halves.
/// Constructed by the caller and handed to [`crate::session::Session`].
#[enum_dispatch]
pub enum Transport {
    Tcp(TcpTransport),
    Udp(UdpTransport),
    Ws(WsTransport),
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Tcp(_) => TransportKind::Tcp,
            Transport::Udp(_) => TransportKind::Udp,
            Transport::Ws(_) => TransportKind::Ws,
        }
    }
}

#[enum_dispatch(Transport)]
pub trait SplitTransport {
    fn split(self) -> (TransportReader, TransportWriter);
}

/// Read-only half, owned exclusively by the receive loop (spec.md §4.E).
#[enum_dispatch]
pub enum TransportReader {
    Tcp(tcp::TcpReader),
    Udp(udp::UdpReader),
    Ws(ws::WsReader),
}

/// Write-only half, owned exclusively by the send loop (spec.md §4.D).
#[enum_dispatch]
pub enum TransportWriter {
    Tcp(tcp::TcpWriter),
    Udp(udp::UdpWriter),
    Ws(ws::WsWriter),
}

#[enum_dispatch(TransportReader)]
pub trait ReadHalf {
    /// Reads raw TCP bytes into `buf`. Only meaningful for
    /// [`TransportReader::Tcp`].
    async fn read_tcp(
        &mut self,
        buf: &mut [u8],
        deadline: Duration,
    ) -> Result<ReadOutcome<usize>, SessionError>;

    /// Reads one datagram. Only meaningful for [`TransportReader::Udp`].
    async fn read_udp(
        &mut self,
        buf: &mut [u8],
        deadline: Duration,
    ) -> Result<ReadOutcome<(usize, SocketAddr)>, SessionError>;

    /// Reads one frame. Only meaningful for [`TransportReader::Ws`].
    async fn read_ws(&mut self, deadline: Duration) -> Result<ReadOutcome<WsFrame>, SessionError>;
}

#[enum_dispatch(TransportWriter)]
pub trait WriteHalf {
    /// Writes a full message (spec.md §4.A `write`): for TCP, writes all
    /// bytes; for UDP, sends one datagram to `peer` (falling back to the
    /// last-seen sender if `peer` is `None`); for WS, sends one binary
    /// frame.
    async fn write(&mut self, bytes: &[u8], peer: Option<SocketAddr>) -> Result<(), SessionError>;

    /// Sends a WS PING control frame; a no-op for TCP/UDP.
    async fn write_ping(&mut self) -> Result<(), SessionError>;

    /// Closes the write side, waiting up to `wait` for a graceful
    /// half-close/drain where the variant supports one.
    async fn close(&mut self, wait: Duration);
}
