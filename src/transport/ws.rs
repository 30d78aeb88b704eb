// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{net::SocketAddr, time::Duration};

use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use super::{ReadHalf, ReadOutcome, TransportReader, TransportWriter, WriteHalf, WsFrame, WsStream};
use crate::error::SessionError;

/// WebSocket transport adapter (spec.md §4.A), grounded in the pack's
/// `tokio_tungstenite` usage (kube-rs remote-exec client).
pub struct WsTransport {
    stream: WsStream,
}

impl WsTransport {
    pub fn new(stream: WsStream) -> Self {
        Self { stream }
    }
}

impl super::SplitTransport for WsTransport {
    fn split(self) -> (TransportReader, TransportWriter) {
        let (sink, stream) = self.stream.split();
        (
            TransportReader::Ws(WsReader(stream)),
            TransportWriter::Ws(WsWriter(sink)),
        )
    }
}

pub struct WsReader(SplitStream<WsStream>);
pub struct WsWriter(SplitSink<WsStream, Message>);

impl ReadHalf for WsReader {
    async fn read_tcp(
        &mut self,
        _buf: &mut [u8],
        _deadline: Duration,
    ) -> Result<ReadOutcome<usize>, SessionError> {
        Err(SessionError::Configuration(
            "read_tcp called on a WS transport".into(),
        ))
    }

    async fn read_udp(
        &mut self,
        _buf: &mut [u8],
        _deadline: Duration,
    ) -> Result<ReadOutcome<(usize, SocketAddr)>, SessionError> {
        Err(SessionError::Configuration(
            "read_udp called on a WS transport".into(),
        ))
    }

    async fn read_ws(&mut self, deadline: Duration) -> Result<ReadOutcome<WsFrame>, SessionError> {
        match timeout(deadline, self.0.next()).await {
            Ok(Some(Ok(Message::Binary(bytes)))) => Ok(ReadOutcome::Ready(WsFrame {
                bytes: bytes.into(),
                is_binary: true,
            })),
            Ok(Some(Ok(Message::Text(text)))) => Ok(ReadOutcome::Ready(WsFrame {
                bytes: text.into_bytes(),
                is_binary: false,
            })),
            // Ping/Pong/Frame/Close control frames carry no application
            // payload; treat them the same as a timed-out read so the
            // receive loop simply iterates (tungstenite answers Pings
            // with Pongs internally).
            Ok(Some(Ok(_))) => Ok(ReadOutcome::TimedOut),
            Ok(Some(Err(e))) => Err(SessionError::Transport(std::io::Error::other(e))),
            Ok(None) => Err(SessionError::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "websocket stream closed",
            ))),
            Err(_elapsed) => Ok(ReadOutcome::TimedOut),
        }
    }
}

impl WriteHalf for WsWriter {
    async fn write(&mut self, bytes: &[u8], _peer: Option<SocketAddr>) -> Result<(), SessionError> {
        self.0
            .send(Message::Binary(bytes.to_vec().into()))
            .await
            .map_err(|e| SessionError::Transport(std::io::Error::other(e)))
    }

    async fn write_ping(&mut self) -> Result<(), SessionError> {
        self.0
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| SessionError::Transport(std::io::Error::other(e)))
    }

    async fn close(&mut self, wait: Duration) {
        let _ = timeout(wait, self.0.close()).await;
    }
}
