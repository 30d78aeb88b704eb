// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use connsession::{DecodeOutcome, Decoder, Encoder, EventListener, Session, SessionError};

/// A length-prefixed (u16 big-endian) codec shared by the integration
/// scenarios (spec.md S1, S6).
pub struct LengthPrefixedCodec;

impl Decoder for LengthPrefixedCodec {
    type Message = Vec<u8>;

    fn decode(&self, buf: &[u8]) -> Result<DecodeOutcome<Self::Message>, SessionError> {
        if buf.len() < 2 {
            return Ok(DecodeOutcome::NeedMoreData);
        }
        let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        if buf.len() < 2 + len {
            return Ok(DecodeOutcome::NeedMoreData);
        }
        Ok(DecodeOutcome::Message(buf[2..2 + len].to_vec(), 2 + len))
    }
}

impl Encoder for LengthPrefixedCodec {
    type Message = Vec<u8>;

    fn encode(&self, message: &Self::Message) -> Result<Vec<u8>, SessionError> {
        let mut out = Vec::with_capacity(2 + message.len());
        out.extend_from_slice(&(message.len() as u16).to_be_bytes());
        out.extend_from_slice(message);
        Ok(out)
    }
}

/// Records every message `on_message` delivers, for assertion by the
/// calling test.
#[derive(Default)]
pub struct RecordingListener {
    pub received: Mutex<Vec<Vec<u8>>>,
    pub cron_ticks: std::sync::atomic::AtomicUsize,
    /// The `peer` seen on the most recent `on_message` call (spec.md §6
    /// "UDP message envelope"); `None` for TCP/WS.
    pub last_peer: Mutex<Option<SocketAddr>>,
}

#[async_trait]
impl EventListener<Vec<u8>> for RecordingListener {
    async fn on_message(&self, session: &Session<Vec<u8>>, message: Vec<u8>, peer: Option<SocketAddr>) {
        *self.last_peer.lock().expect("lock poisoned") = peer;
        // Echo straight back, as S1 expects.
        let _ = session.write_message(&message).await;
        self.received.lock().expect("lock poisoned").push(message);
    }

    async fn on_cron(&self, _session: &Session<Vec<u8>>) {
        self.cron_ticks
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}

pub fn recording_listener() -> Arc<RecordingListener> {
    Arc::new(RecordingListener::default())
}
