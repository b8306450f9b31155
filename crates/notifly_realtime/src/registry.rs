//! Listener registry keyed by event name.
//!
//! A listener is a shared callback. Identity is the callback allocation, so
//! registering the same [`Listener`] twice under one name is a no-op and
//! `off` removes exactly the one that was registered.

use crate::state::ChannelEvent;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

type Callback = dyn Fn(&ChannelEvent) + Send + Sync;

#[derive(Clone)]
pub struct Listener(Arc<Callback>);

impl Listener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        Listener(Arc::new(callback))
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    fn call(&self, event: &ChannelEvent) {
        (self.0)(event)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Listener {}

impl Hash for Listener {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:#x})", self.addr())
    }
}

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<HashMap<String, HashSet<Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the listener was already registered for `event`.
    pub fn on(&self, event: &str, listener: &Listener) -> bool {
        let mut map = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        map.entry(event.to_string())
            .or_default()
            .insert(listener.clone())
    }

    /// Returns `false` when the listener was not registered for `event`.
    pub fn off(&self, event: &str, listener: &Listener) -> bool {
        let mut map = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let Some(set) = map.get_mut(event) else {
            return false;
        };
        let removed = set.remove(listener);
        if set.is_empty() {
            map.remove(event);
        }
        removed
    }

    /// Invokes every listener registered under the event's name and returns
    /// how many ran. Callbacks run outside the lock and may call `on`/`off`.
    pub fn emit(&self, event: &ChannelEvent) -> usize {
        let snapshot: Vec<Listener> = {
            let map = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            match map.get(event.name()) {
                Some(set) => set.iter().cloned().collect(),
                None => return 0,
            }
        };
        for listener in &snapshot {
            listener.call(event);
        }
        snapshot.len()
    }

    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(event)
            .map_or(0, HashSet::len)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        let counts: HashMap<&str, usize> = map.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("ListenerRegistry").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EVENT_NOTIFICATION, EVENT_RECONNECT_FAILED};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Listener, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let listener = Listener::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (listener, hits)
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let registry = ListenerRegistry::new();
        let (listener, hits) = counting();

        assert!(registry.on(EVENT_RECONNECT_FAILED, &listener));
        assert!(!registry.on(EVENT_RECONNECT_FAILED, &listener));
        assert_eq!(registry.emit(&ChannelEvent::ReconnectFailed), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_removes_only_that_listener() {
        let registry = ListenerRegistry::new();
        let (first, first_hits) = counting();
        let (second, second_hits) = counting();
        registry.on(EVENT_RECONNECT_FAILED, &first);
        registry.on(EVENT_RECONNECT_FAILED, &second);

        assert!(registry.off(EVENT_RECONNECT_FAILED, &first));
        assert!(!registry.off(EVENT_RECONNECT_FAILED, &first));
        registry.emit(&ChannelEvent::ReconnectFailed);

        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_only_reach_their_name() {
        let registry = ListenerRegistry::new();
        let (listener, hits) = counting();
        registry.on(EVENT_NOTIFICATION, &listener);

        assert_eq!(registry.emit(&ChannelEvent::ReconnectFailed), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_unregister_itself() {
        let registry = Arc::new(ListenerRegistry::new());
        let slot: Arc<RwLock<Option<Listener>>> = Arc::new(RwLock::new(None));

        let reg = registry.clone();
        let me = slot.clone();
        let listener = Listener::new(move |_| {
            if let Some(l) = me.read().unwrap().as_ref() {
                reg.off(EVENT_RECONNECT_FAILED, l);
            }
        });
        *slot.write().unwrap() = Some(listener.clone());

        registry.on(EVENT_RECONNECT_FAILED, &listener);
        registry.emit(&ChannelEvent::ReconnectFailed);
        assert_eq!(registry.listener_count(EVENT_RECONNECT_FAILED), 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let registry = ListenerRegistry::new();
        let (listener, _) = counting();
        registry.on(EVENT_NOTIFICATION, &listener);
        registry.on(EVENT_RECONNECT_FAILED, &listener);
        registry.clear();
        assert_eq!(registry.listener_count(EVENT_NOTIFICATION), 0);
        assert_eq!(registry.listener_count(EVENT_RECONNECT_FAILED), 0);
    }

    proptest! {
        // Any interleaving of on/off leaves the listener registered iff the
        // last operation was `on`.
        #[test]
        fn registration_tracks_last_operation(ops in proptest::collection::vec(any::<bool>(), 1..32)) {
            let registry = ListenerRegistry::new();
            let (listener, hits) = counting();
            for &register in &ops {
                if register {
                    registry.on(EVENT_RECONNECT_FAILED, &listener);
                } else {
                    registry.off(EVENT_RECONNECT_FAILED, &listener);
                }
            }
            registry.emit(&ChannelEvent::ReconnectFailed);
            let expected = usize::from(*ops.last().unwrap());
            prop_assert_eq!(hits.load(Ordering::SeqCst), expected);
        }
    }
}
