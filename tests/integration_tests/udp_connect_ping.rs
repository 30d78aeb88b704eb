// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use connsession::{transport::udp::CONNECT_PING, SessionConfig, Transport};
use tokio::net::UdpSocket;

use crate::support::{recording_listener, LengthPrefixedCodec};

/// S4: a `CONNECT_PING` sentinel datagram never reaches `on_message`.
#[tokio::test]
async fn connect_ping_is_discarded_silently() {
    let server_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let server_addr = server_socket.local_addr().unwrap();
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

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

    client.send_to(CONNECT_PING, server_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(listener.received.lock().unwrap().is_empty());
}
