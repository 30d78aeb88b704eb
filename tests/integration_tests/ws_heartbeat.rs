// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use connsession::{SessionConfig, Transport};
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use crate::support::{recording_listener, LengthPrefixedCodec};

/// S5: the send loop emits a WS PING on every cron tick (spec.md §4.D
/// case 3, §9 heartbeat cadence == `cron_period`).
#[tokio::test]
async fn websocket_session_pings_on_cron_cadence() {
    let listener_socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener_socket.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _peer) = listener_socket.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let transport = connsession::transport::WsTransport::new(ws);
        let codec = Arc::new(LengthPrefixedCodec);
        let listener = recording_listener();

        let mut config = SessionConfig::default();
        config.cron_period = Duration::from_millis(30);

        let _session = connsession::Session::run(
            config,
            Transport::Ws(transport),
            codec.clone(),
            codec,
            listener,
            None,
        )
        .await
        .unwrap();

        // Keep this task (and the session's loops, spawned from inside
        // `run`) alive long enough for the client to observe a ping.
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let (mut ws_stream, _response) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/")).await.unwrap();

    let ping_seen = tokio::time::timeout(Duration::from_millis(400), async {
        loop {
            match ws_stream.next().await {
                Some(Ok(Message::Ping(_))) => return true,
                Some(Ok(_)) => continue,
                _ => return false,
            }
        }
    })
    .await
    .unwrap_or(false);

    assert!(ping_seen, "expected at least one PING within the cron cadence");
}
