//! Dependency slots (`Dep`) — one per reactive property or observed container.
//!
//! Each Dep is a monotonically-id'd subscriber list with a `depend`/`notify` pair. Subscriber order
//! is insertion order (`indexmap::IndexMap`), not that flush order depends on it — the scheduler
//! re-sorts by watcher id regardless — but an ordered set makes "who subscribed first" inspectable
//! for debugging and keeps iteration deterministic across runs.

use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::watcher::{depend_active_watcher, Watcher, WatcherId};

static NEXT_DEP_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(NEXT_DEP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A dependency slot. Subscribers are held weakly: a Dep never keeps a Watcher alive. Observers own
/// their Deps, but a Dep must not own a Watcher back, or a destroyed component's watcher would leak
/// through every Dep it ever touched.
#[derive(Debug)]
pub struct Dep {
    id: DepId,
    subscribers: std::cell::RefCell<IndexMap<WatcherId, Weak<Watcher>>>,
}

impl Dep {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: DepId::next(),
            subscribers: std::cell::RefCell::new(IndexMap::new()),
        })
    }

    pub fn id(&self) -> DepId {
        self.id
    }

    /// Adds `watcher` to this Dep's subscriber set, deduplicating by id.
    pub fn subscribe(&self, watcher: &Rc<Watcher>) {
        self.subscribers
            .borrow_mut()
            .entry(watcher.id())
            .or_insert_with(|| Rc::downgrade(watcher));
    }

    pub fn unsubscribe(&self, id: WatcherId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }

    /// Connects this Dep to the currently active watcher, if any.
    pub fn depend(self: &Rc<Self>) {
        depend_active_watcher(self);
    }

    /// Fans out to every live subscriber, in insertion order. Dead (dropped) watchers are pruned
    /// lazily as they're encountered rather than on every read, since a subscriber only dies once
    /// its owning component is torn down.
    pub fn notify(&self) {
        let snapshot: Vec<Weak<Watcher>> = self.subscribers.borrow().values().cloned().collect();
        let mut dead = Vec::new();
        for weak in &snapshot {
            match weak.upgrade() {
                Some(watcher) => watcher.update(),
                None => dead.push(weak.clone()),
            }
        }
        if !dead.is_empty() {
            self.subscribers
                .borrow_mut()
                .retain(|_, w| w.upgrade().is_some());
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}
