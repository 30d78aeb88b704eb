// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use connsession::{SessionConfig, Transport};
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream},
};

use crate::support::LengthPrefixedCodec;

/// S3: messages queued just before `close()` still reach the peer, within
/// `wait_on_close` (spec.md §4.D "On close").
#[tokio::test]
async fn queued_writes_drain_before_close_completes() {
    let listener_socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener_socket.local_addr().unwrap();

    let server_task = tokio::spawn(async move {
        let (stream, _peer) = listener_socket.accept().await.unwrap();
        let transport = connsession::transport::TcpTransport::new(stream).unwrap();
        let codec = Arc::new(LengthPrefixedCodec);
        let listener = super::support::recording_listener();

        let mut config = SessionConfig::default();
        config.wait_on_close = Duration::from_millis(500);

        let session = connsession::Session::run(
            config,
            Transport::Tcp(transport),
            codec.clone(),
            codec,
            listener,
            None,
        )
        .await
        .unwrap();

        for i in 0..5u8 {
            session.write_message(&vec![i; 3]).await.unwrap();
        }
        session.close();
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    for _ in 0..5 {
        let mut header = [0u8; 2];
        client.read_exact(&mut header).await.unwrap();
        let len = u16::from_be_bytes(header) as usize;
        let mut body = vec![0u8; len];
        client.read_exact(&mut body).await.unwrap();
        assert_eq!(len, 3);
    }

    let _ = tokio::time::timeout(Duration::from_secs(2), server_task).await;
}
