// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock, RwLockReadGuard},
};

/// Opaque attribute key (spec.md §3 `attrs`, §9 "Attribute map").
///
/// Keys compare by the string they were constructed from; the value side
/// is genuinely opaque (`Box<dyn Any + Send + Sync>`), matching the
/// "opaque key to opaque value" contract in the spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrKey(Arc<str>);

impl AttrKey {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttrKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reserved key the reconnect hook (spec.md §9) reads to decide whether a
/// session was started by a client and is therefore eligible to
/// reconnect.
pub const ATTR_CLIENT_OWNED: &str = "__session.client_owned";

pub(crate) type AttrMap = HashMap<AttrKey, Box<dyn Any + Send + Sync>>;

/// Session-lifetime attribute storage guarded by a single reader/writer
/// lock (spec.md §3 invariant 6: "readers of configuration never observe
/// torn values"). The engine's other configuration knobs
/// (`max_message_length`, `cron_period`, `wait_on_close`, write-queue
/// capacity) are set once in [`crate::cfg::config::SessionConfig`] before
/// `run()` and never mutated afterward (spec.md invariant 7), so only this
/// map needs a lock of its own.
pub(crate) struct AttrStore {
    map: RwLock<AttrMap>,
}

impl AttrStore {
    pub(crate) fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get<T: Clone + 'static>(&self, key: &AttrKey) -> Option<T> {
        let guard: RwLockReadGuard<'_, AttrMap> =
            self.map.read().expect("attribute lock poisoned");
        guard.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub(crate) fn set<T: Send + Sync + 'static>(&self, key: AttrKey, value: T) {
        let mut guard = self.map.write().expect("attribute lock poisoned");
        guard.insert(key, Box::new(value));
    }

    pub(crate) fn remove(&self, key: &AttrKey) {
        let mut guard = self.map.write().expect("attribute lock poisoned");
        guard.remove(key);
    }
}
