// SPDX-License-Identifier: AGPL-3.0-or-later

//! Single entry point for all integration tests, compiled as one test
//! binary rather than one per file.

#![allow(clippy::all)]

#[path = "integration_tests/support.rs"]
mod support;

#[path = "integration_tests/tcp_echo.rs"]
mod tcp_echo;

#[path = "integration_tests/tcp_partial_frame.rs"]
mod tcp_partial_frame;

#[path = "integration_tests/backpressure.rs"]
mod backpressure;

#[path = "integration_tests/graceful_drain.rs"]
mod graceful_drain;

#[path = "integration_tests/udp_connect_ping.rs"]
mod udp_connect_ping;

#[path = "integration_tests/udp_echo_peer.rs"]
mod udp_echo_peer;

#[path = "integration_tests/ws_heartbeat.rs"]
mod ws_heartbeat;
