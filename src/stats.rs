// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;

/// Atomic per-connection counters (spec.md §3 `stats`, invariant 5).
///
/// Updated without a lock: the four counters only ever increase while the
/// session is open, so `Ordering::Relaxed` is sufficient — callers never
/// need to observe one counter's update as happening-before another's.
#[derive(Debug)]
pub struct SessionStats {
    read_bytes: AtomicU64,
    write_bytes: AtomicU64,
    read_pkgs: AtomicU64,
    write_pkgs: AtomicU64,
    opened_at: Instant,
    last_active_millis: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        let opened_at = Instant::now();
        Self {
            read_bytes: AtomicU64::new(0),
            write_bytes: AtomicU64::new(0),
            read_pkgs: AtomicU64::new(0),
            write_pkgs: AtomicU64::new(0),
            opened_at,
            last_active_millis: AtomicU64::new(0),
        }
    }

    /// Recorded by the transport adapter on every successful read
    /// (spec.md §4.A "Statistics counters").
    pub fn add_read_bytes(&self, n: u64) {
        self.read_bytes.fetch_add(n, Ordering::Relaxed);
        self.touch();
    }

    /// Recorded by the transport adapter on every successful write.
    pub fn add_write_bytes(&self, n: u64) {
        self.write_bytes.fetch_add(n, Ordering::Relaxed);
        self.touch();
    }

    /// Incremented once per successfully decoded/dispatched message
    /// (spec.md §4.F), never per raw read.
    pub fn inc_read_pkgs(&self) {
        self.read_pkgs.fetch_add(1, Ordering::Relaxed);
    }

    /// Incremented once per successfully encoded+written message, or by
    /// `len(parts)` for `writeBytesVector` (spec.md §4.G).
    pub fn add_write_pkgs(&self, n: u64) {
        self.write_pkgs.fetch_add(n, Ordering::Relaxed);
    }

    pub fn read_bytes(&self) -> u64 {
        self.read_bytes.load(Ordering::Relaxed)
    }

    pub fn write_bytes(&self) -> u64 {
        self.write_bytes.load(Ordering::Relaxed)
    }

    pub fn read_pkgs(&self) -> u64 {
        self.read_pkgs.load(Ordering::Relaxed)
    }

    pub fn write_pkgs(&self) -> u64 {
        self.write_pkgs.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        let elapsed = self.opened_at.elapsed().as_millis() as u64;
        self.last_active_millis.store(elapsed, Ordering::Relaxed);
    }

    /// How long ago the last successful read or write happened.
    pub fn idle_for(&self) -> std::time::Duration {
        let last = self.last_active_millis.load(Ordering::Relaxed);
        let now = self.opened_at.elapsed().as_millis() as u64;
        std::time::Duration::from_millis(now.saturating_sub(last))
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "readBytes={} writeBytes={} readPkgs={} writePkgs={} idleFor={:?}",
            self.read_bytes(),
            self.write_bytes(),
            self.read_pkgs(),
            self.write_pkgs(),
            self.idle_for()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = SessionStats::new();
        assert_eq!(stats.read_bytes(), 0);
        assert_eq!(stats.write_bytes(), 0);
        assert_eq!(stats.read_pkgs(), 0);
        assert_eq!(stats.write_pkgs(), 0);
    }

    #[test]
    fn counters_are_monotonically_non_decreasing() {
        let stats = SessionStats::new();
        stats.add_read_bytes(10);
        stats.add_read_bytes(5);
        assert_eq!(stats.read_bytes(), 15);
        stats.inc_read_pkgs();
        stats.inc_read_pkgs();
        assert_eq!(stats.read_pkgs(), 2);
        stats.add_write_pkgs(3);
        assert_eq!(stats.write_pkgs(), 3);
    }

    #[test]
    fn display_includes_all_counters() {
        let stats = SessionStats::new();
        stats.add_read_bytes(1);
        let rendered = stats.to_string();
        assert!(rendered.contains("readBytes=1"));
        assert!(rendered.contains("writePkgs=0"));
    }
}
