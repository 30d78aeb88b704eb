// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    time::timeout,
};

use super::{ReadHalf, ReadOutcome, TransportReader, TransportWriter, WriteHalf, WsFrame};
use crate::error::SessionError;

/// TCP transport adapter (spec.md §4.A), unsplit.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl super::SplitTransport for TcpTransport {
    fn split(self) -> (TransportReader, TransportWriter) {
        let (r, w) = self.stream.into_split();
        (
            TransportReader::Tcp(TcpReader(r)),
            TransportWriter::Tcp(TcpWriter(w)),
        )
    }
}

pub struct TcpReader(OwnedReadHalf);
pub struct TcpWriter(OwnedWriteHalf);

impl ReadHalf for TcpReader {
    async fn read_tcp(
        &mut self,
        buf: &mut [u8],
        deadline: Duration,
    ) -> Result<ReadOutcome<usize>, SessionError> {
        match timeout(deadline, self.0.read(buf)).await {
            Ok(Ok(n)) => Ok(ReadOutcome::Ready(n)),
            Ok(Err(e)) => Err(SessionError::Transport(e)),
            Err(_elapsed) => Ok(ReadOutcome::TimedOut),
        }
    }

    async fn read_udp(
        &mut self,
        _buf: &mut [u8],
        _deadline: Duration,
    ) -> Result<ReadOutcome<(usize, SocketAddr)>, SessionError> {
        Err(SessionError::Configuration(
            "read_udp called on a TCP transport".into(),
        ))
    }

    async fn read_ws(
        &mut self,
        _deadline: Duration,
    ) -> Result<ReadOutcome<WsFrame>, SessionError> {
        Err(SessionError::Configuration(
            "read_ws called on a TCP transport".into(),
        ))
    }
}

impl WriteHalf for TcpWriter {
    async fn write(&mut self, bytes: &[u8], _peer: Option<SocketAddr>) -> Result<(), SessionError> {
        self.0.write_all(bytes).await?;
        Ok(())
    }

    async fn write_ping(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn close(&mut self, wait: Duration) {
        let _ = self.0.shutdown().await;
        tokio::time::sleep(wait).await;
    }
}
