// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use connsession::{SessionConfig, Transport};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::support::{recording_listener, LengthPrefixedCodec};

/// S6: a frame split across several small writes is still reassembled
/// into exactly one decoded message (spec.md §4.E accumulation buffer).
#[tokio::test]
async fn partial_frame_written_byte_by_byte_is_reassembled() {
    let listener_socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener_socket.local_addr().unwrap();

    let listener = recording_listener();
    let listener_for_assert = listener.clone();

    let server_task = tokio::spawn(async move {
        let (stream, _peer) = listener_socket.accept().await.unwrap();
        let transport = connsession::transport::TcpTransport::new(stream).unwrap();
        let codec = Arc::new(LengthPrefixedCodec);

        connsession::Session::run(
            SessionConfig::default(),
            Transport::Tcp(transport),
            codec.clone(),
            codec,
            listener,
            None,
        )
        .await
        .unwrap();
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    let payload = b"reassembled";
    let mut frame = Vec::new();
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);

    for byte in &frame {
        client.write_all(&[*byte]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        listener_for_assert.received.lock().unwrap().as_slice(),
        &[payload.to_vec()]
    );

    drop(client);
    let _ = tokio::time::timeout(Duration::from_secs(1), server_task).await;
}
