// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Transport-agnostic per-connection session engine.
//!
//! Wraps one TCP stream, UDP socket, or WebSocket connection in a
//! [`session::Session`]: a framed, backpressured message channel with
//! heartbeats, graceful shutdown, and per-connection statistics. See
//! `DESIGN.md` in the crate root for how each module is grounded.

pub mod attrs;
pub mod cfg;
pub mod codec;
pub mod error;
pub mod listener;
pub mod queue;
pub mod session;
pub mod stats;
pub mod taskpool;
pub mod timing_wheel;
pub mod transport;

pub use cfg::{
    config::SessionConfig,
    enums::{EndpointKind, TransportKind},
};
pub use codec::{DecodeOutcome, Decoder, Encoder};
pub use error::SessionError;
pub use listener::EventListener;
pub use session::{Session, SessionState};
pub use stats::SessionStats;
pub use transport::Transport;
