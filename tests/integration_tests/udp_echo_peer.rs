// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use connsession::{SessionConfig, Transport};
use tokio::{net::UdpSocket, time::timeout};

use crate::support::{recording_listener, LengthPrefixedCodec};

/// spec.md §6 "UDP message envelope": the listener sees the sending
/// address alongside the payload, and a reply with no explicit peer falls
/// back to that last-seen sender (spec.md §4.A transport capability
/// table).
#[tokio::test]
async fn udp_session_reports_peer_and_echoes_back_to_it() {
    let server_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let server_addr = server_socket.local_addr().unwrap();
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let client_addr = client.local_addr().unwrap();

    let transport = connsession::transport::UdpTransport::new(server_socket);
    let codec = Arc::new(LengthPrefixedCodec);
    let listener = recording_listener();

    let mut config = SessionConfig::default();
    config.read_timeout = Duration::from_millis(50);

    let _session = connsession::Session::run(
        config,
        Transport::Udp(transport),
        codec.clone(),
        codec,
        listener.clone(),
        None,
    )
    .await
    .unwrap();

    let mut frame = Vec::new();
    let payload = b"ping";
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    client.send_to(&frame, server_addr).await.unwrap();

    let mut reply = [0u8; 64];
    let (n, from) = timeout(Duration::from_secs(1), client.recv_from(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(from, server_addr);
    assert_eq!(&reply[..n], frame.as_slice());

    assert_eq!(*listener.last_peer.lock().unwrap(), Some(client_addr));
}
