//! The flush scheduler: batches watcher updates into a single microtask-like tick, flushing in
//! ascending watcher-id order so parent render watchers run before their children's (watchers are
//! always created in parent-then-child order, so smaller ids are always "higher" in the tree) and
//! user watchers fire before render watchers for the same tick.
//!
//! The queue/flush/presence-set shape mirrors Vue's `scheduler.js`; the pluggable [`FlushTrigger`]
//! stands in for the host microtask primitive, the same kind of channel-based deferral a
//! message-loop-driven runtime would use to coalesce a burst of updates into one flush.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fxhash::{FxHashMap, FxHashSet};
use futures_channel::oneshot;

use crate::watcher::{Watcher, WatcherId};
#[allow(unused_imports)]
use crate::watcher::WatcherOwner;

/// Defers a flush callback to whatever "next microtask" means for the embedding host. The default
/// [`ImmediateTrigger`] just runs it inline, which is what every test in this crate uses; a real
/// UI host wires this to its own event loop (e.g. an `async fn` executor, a platform idle
/// callback, or a GTK/Win32 message-queue post).
pub trait FlushTrigger {
    fn schedule(&self, flush: Box<dyn FnOnce()>);
}

/// Runs the flush synchronously, in-line with the mutation that scheduled it. Useful for tests
/// and for hosts with no event loop of their own.
#[derive(Debug, Default)]
pub struct ImmediateTrigger;

impl FlushTrigger for ImmediateTrigger {
    fn schedule(&self, flush: Box<dyn FnOnce()>) {
        flush();
    }
}

pub struct Scheduler {
    queue: RefCell<Vec<Rc<Watcher>>>,
    /// Presence set: a watcher id is in here iff it's currently queued and hasn't started running
    /// yet this pass. `queue_watcher` consults this to no-op a duplicate enqueue unconditionally.
    has: RefCell<FxHashSet<WatcherId>>,
    /// Dev-only: counts how many times a watcher has re-added itself to `has` during its own
    /// flush pass (i.e. running it caused it to be queued again before its "turn" came back
    /// around). Cleared at the end of every flush.
    circular: RefCell<FxHashMap<WatcherId, u32>>,
    flushing: Cell<bool>,
    waiting: Cell<bool>,
    cursor: Cell<usize>,
    trigger: Box<dyn FlushTrigger>,
    sync_mode: Cell<bool>,
    dev_checks: bool,
    max_update_count: u32,
    next_tick_callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Scheduler {
    pub fn new(trigger: Box<dyn FlushTrigger>, sync_mode: bool, dev_checks: bool, max_update_count: u32) -> Rc<Self> {
        Rc::new(Self {
            queue: RefCell::new(Vec::new()),
            has: RefCell::new(FxHashSet::default()),
            circular: RefCell::new(FxHashMap::default()),
            flushing: Cell::new(false),
            waiting: Cell::new(false),
            cursor: Cell::new(0),
            trigger,
            sync_mode: Cell::new(sync_mode),
            dev_checks,
            max_update_count,
            next_tick_callbacks: RefCell::new(Vec::new()),
        })
    }

    pub fn set_sync_mode(&self, sync: bool) {
        self.sync_mode.set(sync);
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    /// Enqueues `watcher`. A no-op if `watcher`'s id is already present in the queue and hasn't run
    /// yet this pass — unconditional, not just a dev-mode diagnostic. If a flush is already under
    /// way, a newly-queued watcher is spliced in at a position past the current cursor so it still
    /// runs this tick (matching Vue's "insert in id order among not-yet-run entries" behavior)
    /// rather than being dropped or deferred to the next tick.
    pub fn queue_watcher(self: &Rc<Self>, watcher: Rc<Watcher>) {
        let id = watcher.id();
        if !self.has.borrow_mut().insert(id) {
            return;
        }
        if !self.flushing.get() {
            self.queue.borrow_mut().push(watcher);
        } else {
            let mut queue = self.queue.borrow_mut();
            let cursor = self.cursor.get();
            let mut i = queue.len();
            while i > cursor + 1 && queue[i - 1].id() > id {
                i -= 1;
            }
            queue.insert(i, watcher);
        }
        if !self.waiting.get() {
            self.waiting.set(true);
            if self.sync_mode.get() {
                self.flush_now();
            } else {
                let me = self.clone();
                self.trigger.schedule(Box::new(move || me.flush_now()));
            }
        }
    }

    /// Runs every queued watcher in ascending id order, including any watchers queued as a side
    /// effect of running an earlier one in the same pass, then resolves any pending
    /// [`Scheduler::next_tick`] callbacks.
    pub fn flush_now(self: &Rc<Self>) {
        self.flushing.set(true);
        self.queue.borrow_mut().sort_by_key(|w| w.id());

        let mut updated_owners = Vec::new();
        let mut idx = 0;
        loop {
            let watcher = {
                let queue = self.queue.borrow();
                match queue.get(idx) {
                    Some(w) => w.clone(),
                    None => break,
                }
            };
            self.cursor.set(idx);
            let id = watcher.id();
            self.has.borrow_mut().remove(&id);

            let capped = self.dev_checks
                && self.circular.borrow().get(&id).copied().unwrap_or(0) > self.max_update_count;
            if !capped && watcher.is_active() {
                watcher.fire_before();
                watcher.run();
                if watcher.flags.render && watcher.is_active() {
                    if let Some(owner) = watcher.owner_handle() {
                        if !owner.is_destroyed() {
                            updated_owners.push(owner);
                        }
                    }
                }
            }

            // Running `watcher` (or a watcher it triggered) may have re-added `id` to `has` before
            // this entry's own turn came back around — a same-flush self-trigger loop. Count it and
            // cap it so a runaway cycle can't keep re-running forever within one flush.
            if self.dev_checks && self.has.borrow().contains(&id) {
                let mut circular = self.circular.borrow_mut();
                let count = circular.entry(id).or_insert(0);
                *count += 1;
                if *count > self.max_update_count {
                    tracing::error!(
                        watcher_id = id.as_u64(),
                        max = self.max_update_count,
                        "infinite update loop detected; no longer running this watcher this flush"
                    );
                }
            }
            idx += 1;
        }

        self.queue.borrow_mut().clear();
        self.has.borrow_mut().clear();
        self.circular.borrow_mut().clear();
        self.cursor.set(0);
        self.flushing.set(false);
        self.waiting.set(false);

        for owner in updated_owners {
            owner.call_updated();
        }

        for cb in self.next_tick_callbacks.borrow_mut().drain(..) {
            cb();
        }
    }

    /// Runs `cb` after the in-flight (or next) flush completes. If nothing is queued and no flush
    /// is pending, runs `cb` immediately — there's nothing to wait for.
    pub fn next_tick(self: &Rc<Self>, cb: Box<dyn FnOnce()>) {
        if !self.waiting.get() && !self.flushing.get() {
            cb();
            return;
        }
        self.next_tick_callbacks.borrow_mut().push(cb);
    }

    /// Async sibling of [`Scheduler::next_tick`]: resolves a future via a one-shot channel once
    /// the flush this was called during (or the next one, if none is in flight) completes.
    pub fn next_tick_future(self: &Rc<Self>) -> impl std::future::Future<Output = ()> {
        let (tx, rx) = oneshot::channel();
        self.next_tick(Box::new(move || {
            let _ = tx.send(());
        }));
        async move {
            let _ = rx.await;
        }
    }
}
