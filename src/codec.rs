// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::SessionError;

/// Result of one decoder invocation over the accumulation buffer (spec.md
/// §4.B).
///
/// The receive loop re-invokes the decoder per the state-machine the four
/// variants encode:
///
/// - `NeedMoreData` — not enough bytes yet; stop, keep the buffer, read
///   more from the transport.
/// - `Skip(n)` — discard `n` bytes (junk/heartbeat) and call the decoder
///   again immediately.
/// - `Message(msg, n)` — emit `msg`, discard `n` bytes, and call the
///   decoder again in case a second message is already buffered.
///
/// A decode error is not a variant here: it is the `Err` side of
/// [`Decoder::decode`]'s `Result`, and is always fatal (spec.md §4.B case
/// 1).
#[derive(Debug)]
pub enum DecodeOutcome<M> {
    NeedMoreData,
    Skip(usize),
    Message(M, usize),
}

/// User-supplied incremental decoder (spec.md §4.B).
///
/// Implementations must uphold the contract documented on
/// [`DecodeOutcome`]: in particular, returning `Message(_, 0)` or
/// `Skip(0)` forever would spin the receive loop, so those combinations
/// are a decoder bug, not something the engine works around.
pub trait Decoder: Send + Sync + 'static {
    type Message: Send + 'static;

    /// Attempt to decode one message out of the front of `buf`.
    ///
    /// `buf` holds everything read so far and not yet consumed. The
    /// decoder never sees bytes it has already consumed in a prior call.
    fn decode(&self, buf: &[u8]) -> Result<DecodeOutcome<Self::Message>, SessionError>;
}

/// User-supplied encoder (spec.md §4.B).
///
/// The "fused write" case from the spec — an encoder that performs I/O
/// itself — is expressed in Rust by having `Encoder::Message` be encoded
/// to bytes here and letting [`crate::session::Session::write_bytes`] (or
/// the write queue's synchronous path) perform the actual transport
/// write; the engine does not need a second trait shape for it.
pub trait Encoder: Send + Sync + 'static {
    type Message: Send + 'static;

    /// Encode one message into bytes ready for `transport.write`.
    fn encode(&self, message: &Self::Message) -> Result<Vec<u8>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A trivial length-prefixed (u16 big-endian) codec, used by the
    /// crate's own unit/integration tests (spec.md S1, S6).
    pub struct LengthPrefixed;

    impl Decoder for LengthPrefixed {
        type Message = Vec<u8>;

        fn decode(&self, buf: &[u8]) -> Result<DecodeOutcome<Self::Message>, SessionError> {
            if buf.len() < 2 {
                return Ok(DecodeOutcome::NeedMoreData);
            }
            let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
            if buf.len() < 2 + len {
                return Ok(DecodeOutcome::NeedMoreData);
            }
            let msg = buf[2..2 + len].to_vec();
            Ok(DecodeOutcome::Message(msg, 2 + len))
        }
    }

    impl Encoder for LengthPrefixed {
        type Message = Vec<u8>;

        fn encode(&self, message: &Self::Message) -> Result<Vec<u8>, SessionError> {
            let mut out = Vec::with_capacity(2 + message.len());
            out.extend_from_slice(&(message.len() as u16).to_be_bytes());
            out.extend_from_slice(message);
            Ok(out)
        }
    }

    #[test]
    fn needs_more_data_until_length_prefix_available() {
        let codec = LengthPrefixed;
        assert!(matches!(
            codec.decode(&[0x00]).unwrap(),
            DecodeOutcome::NeedMoreData
        ));
    }

    #[test]
    fn needs_more_data_until_body_available() {
        let codec = LengthPrefixed;
        let buf = [0x00, 0x03, b'a', b'b'];
        assert!(matches!(
            codec.decode(&buf).unwrap(),
            DecodeOutcome::NeedMoreData
        ));
    }

    #[test]
    fn decodes_one_complete_message() {
        let codec = LengthPrefixed;
        let encoded = codec.encode(&b"hello".to_vec()).unwrap();
        match codec.decode(&encoded).unwrap() {
            DecodeOutcome::Message(msg, consumed) => {
                assert_eq!(msg, b"hello");
                assert_eq!(consumed, encoded.len());
            },
            other => panic!("expected Message, got {other:?}"),
        }
    }
}
