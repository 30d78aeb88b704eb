// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{cfg::enums::EndpointKind, error::SessionError};

/// Default read buffer size for the TCP receive loop (spec.md §6).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;
/// Default per-I/O read/write deadline (spec.md §6).
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);
/// Default cron/heartbeat interval (spec.md §6).
pub const DEFAULT_CRON_PERIOD: Duration = Duration::from_secs(60);
/// Default maximum time the send loop keeps draining after close (spec.md
/// §6).
pub const DEFAULT_WAIT_ON_CLOSE: Duration = Duration::from_secs(3);
/// Default bounded write-queue capacity (spec.md §6).
pub const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 1024;

/// Tunables a caller sets before `Session::run()` (spec.md §3 invariant 7:
/// behaviour after `run()` is undefined unless these are all set
/// atomically, so `Session::run()` simply consumes one of these by value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Display label. `None` means the transport/endpoint default applies
    /// (spec.md §3 `name`, e.g. `"tcp-server"`).
    #[serde(default)]
    pub name: Option<String>,

    /// Which side opened the connection (spec.md §3 `endpoint`). Only the
    /// type tag is tracked here — the owner reference itself is external
    /// (spec.md §1 Non-goals: "client/server bootstrap and connection
    /// acceptance").
    #[serde(default = "default_endpoint")]
    pub endpoint: EndpointKind,

    /// Bytes read per `transport.read` call on the TCP path (spec.md
    /// §4.E).
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// Per-I/O read deadline.
    #[serde(default = "default_io_timeout")]
    pub read_timeout: Duration,

    /// Per-I/O write deadline.
    #[serde(default = "default_io_timeout")]
    pub write_timeout: Duration,

    /// Cron/heartbeat interval; also the WS PING cadence.
    #[serde(default = "default_cron_period")]
    pub cron_period: Duration,

    /// Maximum time the send loop keeps draining the write queue after
    /// `done` latches.
    #[serde(default = "default_wait_on_close")]
    pub wait_on_close: Duration,

    /// Bounded write-queue capacity (spec.md §4.C).
    #[serde(default = "default_write_queue_capacity")]
    pub write_queue_capacity: usize,

    /// Per-decoded-message byte cap. `0` means unlimited (spec.md §3).
    #[serde(default)]
    pub max_message_length: usize,
}

fn default_endpoint() -> EndpointKind {
    EndpointKind::Server
}

fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}

fn default_io_timeout() -> Duration {
    DEFAULT_IO_TIMEOUT
}

fn default_cron_period() -> Duration {
    DEFAULT_CRON_PERIOD
}

fn default_wait_on_close() -> Duration {
    DEFAULT_WAIT_ON_CLOSE
}

fn default_write_queue_capacity() -> usize {
    DEFAULT_WRITE_QUEUE_CAPACITY
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: None,
            endpoint: EndpointKind::Server,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            read_timeout: DEFAULT_IO_TIMEOUT,
            write_timeout: DEFAULT_IO_TIMEOUT,
            cron_period: DEFAULT_CRON_PERIOD,
            wait_on_close: DEFAULT_WAIT_ON_CLOSE,
            write_queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
            max_message_length: 0,
        }
    }
}

impl SessionConfig {
    /// Validates the invariants spec.md §3/§4.C/§4.D/§4.G place on these
    /// fields: `cron_period >= 1ms`, `wait_on_close > 0`,
    /// `write_queue_capacity >= 1`.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cron_period.is_zero() {
            return Err(SessionError::Configuration(
                "cron_period must be >= 1ms".into(),
            ));
        }
        if self.wait_on_close.is_zero() {
            return Err(SessionError::Configuration(
                "wait_on_close must be > 0".into(),
            ));
        }
        if self.write_queue_capacity == 0 {
            return Err(SessionError::Configuration(
                "write_queue_capacity must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Upper bound for the UDP receive buffer (spec.md §4.E, §9 second
    /// Open Question): `max_message_length + read_buffer_size`, bounded
    /// above by `2 * max_message_length` whenever a cap is configured.
    pub fn udp_max_buf_len(&self) -> usize {
        if self.max_message_length == 0 {
            return self.read_buffer_size.max(DEFAULT_READ_BUFFER_SIZE);
        }
        (self.max_message_length + self.read_buffer_size).min(2 * self.max_message_length)
    }
}
