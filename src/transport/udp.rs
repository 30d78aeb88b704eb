// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{net::UdpSocket, time::timeout};

use super::{ReadHalf, ReadOutcome, TransportReader, TransportWriter, WriteHalf, WsFrame};
use crate::error::SessionError;

/// Reserved sentinel datagram (spec.md §6, §9 `connectPing`) used by the
/// surrounding runtime to keep NAT paths warm. Received but never
/// dispatched to `onMessage` (spec.md S4).
pub const CONNECT_PING: &[u8] = b"\0CONNECT_PING\0";

/// UDP transport adapter (spec.md §4.A), unsplit.
///
/// `UdpSocket::send_to`/`recv_from` both take `&self`, so the two halves
/// share one socket through an `Arc` instead of needing an `into_split`
/// equivalent the way TCP does.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
        }
    }
}

impl super::SplitTransport for UdpTransport {
    fn split(self) -> (TransportReader, TransportWriter) {
        (
            TransportReader::Udp(UdpReader(self.socket.clone())),
            TransportWriter::Udp(UdpWriter(self.socket)),
        )
    }
}

pub struct UdpReader(Arc<UdpSocket>);
pub struct UdpWriter(Arc<UdpSocket>);

impl ReadHalf for UdpReader {
    async fn read_tcp(
        &mut self,
        _buf: &mut [u8],
        _deadline: Duration,
    ) -> Result<ReadOutcome<usize>, SessionError> {
        Err(SessionError::Configuration(
            "read_tcp called on a UDP transport".into(),
        ))
    }

    async fn read_udp(
        &mut self,
        buf: &mut [u8],
        deadline: Duration,
    ) -> Result<ReadOutcome<(usize, SocketAddr)>, SessionError> {
        match timeout(deadline, self.0.recv_from(buf)).await {
            Ok(Ok((n, peer))) => Ok(ReadOutcome::Ready((n, peer))),
            Ok(Err(e)) => Err(SessionError::Transport(e)),
            Err(_elapsed) => Ok(ReadOutcome::TimedOut),
        }
    }

    async fn read_ws(
        &mut self,
        _deadline: Duration,
    ) -> Result<ReadOutcome<WsFrame>, SessionError> {
        Err(SessionError::Configuration(
            "read_ws called on a UDP transport".into(),
        ))
    }
}

impl WriteHalf for UdpWriter {
    /// Sends one datagram to `peer`. Unlike TCP/WS, UDP has no connection
    /// to silently imply a destination from, so the caller (the send
    /// loop, which learns the peer from the receive loop via the
    /// session's last-seen-peer tracking, spec.md §4.A) must supply one.
    async fn write(&mut self, bytes: &[u8], peer: Option<SocketAddr>) -> Result<(), SessionError> {
        let dest = peer.ok_or_else(|| {
            SessionError::Configuration("no destination peer for UDP write".into())
        })?;
        self.0.send_to(bytes, dest).await?;
        Ok(())
    }

    async fn write_ping(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn close(&mut self, _wait: Duration) {}
}
