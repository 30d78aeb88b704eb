// SPDX-License-Identifier: AGPL-3.0-or-later

use core::fmt;

use serde::{Deserialize, Serialize};

/// Which underlying transport a session is bound to.
///
/// Drives both the default `name` (spec.md §3) and which receive-loop
/// variant `Session::run()` dispatches to (spec.md §4.E).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Udp,
    Ws,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Udp => "udp",
            TransportKind::Ws => "ws",
        })
    }
}

/// Tags the owner that created a session (spec.md §3 `endpoint`).
///
/// A client-owned session is the one eligible for the reconnect hook
/// (spec.md §5 "Cancellation and timeouts", §9 "Attribute map").
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Client,
    Server,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointKind::Client => "client",
            EndpointKind::Server => "server",
        })
    }
}
