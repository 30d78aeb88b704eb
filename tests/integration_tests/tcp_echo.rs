// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use connsession::{SessionConfig, Transport};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::support::{recording_listener, LengthPrefixedCodec};

/// S1: one TCP session decodes a framed message and the listener's echo
/// reply comes back byte-for-byte.
#[tokio::test]
async fn tcp_session_echoes_one_framed_message() {
    let listener_socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener_socket.local_addr().unwrap();

    let server_task = tokio::spawn(async move {
        let (stream, _peer) = listener_socket.accept().await.unwrap();
        let transport = connsession::transport::TcpTransport::new(stream).unwrap();
        let codec = Arc::new(LengthPrefixedCodec);
        let listener = recording_listener();
        let session = connsession::Session::run(
            SessionConfig::default(),
            Transport::Tcp(transport),
            codec.clone(),
            codec,
            listener.clone(),
            None,
        )
        .await
        .unwrap();
        // spec.md §3 `name`: no explicit name was configured, so it
        // defaults to "<endpoint>-<transport>".
        assert_eq!(session.name(), "server-tcp");
        assert!(session.stat_line().contains("readPkgs="));
        listener
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    let payload = b"hello world";
    let mut frame = Vec::new();
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    client.write_all(&frame).await.unwrap();

    let mut header = [0u8; 2];
    client.read_exact(&mut header).await.unwrap();
    let len = u16::from_be_bytes(header) as usize;
    let mut body = vec![0u8; len];
    client.read_exact(&mut body).await.unwrap();
    assert_eq!(body, payload);

    drop(client);
    let _ = tokio::time::timeout(Duration::from_secs(1), server_task).await;
}
