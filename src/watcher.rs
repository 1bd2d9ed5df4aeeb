//! The watcher abstraction: render watchers, user watchers, and lazy/computed watchers all share
//! this one type, distinguished only by their [`WatcherFlags`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::dep::{Dep, DepId};
use crate::scheduler::Scheduler;
use crate::value::{values_equal, walk_deep, Value};

static NEXT_WATCHER_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

impl WatcherId {
    fn next() -> Self {
        Self(NEXT_WATCHER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A type-erased handle to whatever owns a watcher (a `ComponentInstance<H>`, for any `H`), so
/// `Watcher`/`Scheduler`/`Dep` never need to be generic over the host node type — the same
/// type-erasure trick as a `dyn Any`-backed props container, kept out of non-generic code paths.
pub trait WatcherOwner {
    fn is_destroyed(&self) -> bool;
    fn call_before_update(&self);
    fn call_updated(&self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WatcherFlags {
    pub deep: bool,
    pub user: bool,
    pub lazy: bool,
    pub sync: bool,
    /// Marks the component's render watcher specifically, so the scheduler knows to fire the
    /// owning component's `updated` hook after a flush that ran this watcher.
    pub render: bool,
}

/// Either a user closure or a compiled dotted-path accessor (the `$watch('a.b.c')` case).
pub enum WatcherGetter {
    Fn(Rc<dyn Fn() -> Value>),
    Path {
        root: Rc<dyn Fn() -> Value>,
        segments: Vec<Rc<str>>,
    },
}

/// Compiles a dotted path into segments. An empty path, or one containing an empty segment (e.g.
/// `"a..b"` or a leading/trailing dot), is invalid; the caller degrades to a no-op getter with a
/// dev warning.
fn compile_path(path: &str) -> Option<Vec<Rc<str>>> {
    if path.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }
        segments.push(Rc::from(part));
    }
    Some(segments)
}

pub struct Watcher {
    id: WatcherId,
    getter: WatcherGetter,
    pub flags: WatcherFlags,
    callback: Option<Rc<dyn Fn(&Value, &Value)>>,
    owner: RefCell<Option<Weak<dyn WatcherOwner>>>,
    scheduler: Weak<Scheduler>,
    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,
    current_deps: RefCell<IndexMap<DepId, Rc<Dep>>>,
    pending_deps: RefCell<IndexMap<DepId, Rc<Dep>>>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("flags", &self.flags)
            .field("active", &self.active.get())
            .field("dirty", &self.dirty.get())
            .finish()
    }
}

thread_local! {
    static ACTIVE_STACK: RefCell<Vec<Rc<Watcher>>> = RefCell::new(Vec::new());
}

fn push_active(w: Rc<Watcher>) {
    ACTIVE_STACK.with(|s| s.borrow_mut().push(w));
}

fn pop_active() -> Option<Rc<Watcher>> {
    ACTIVE_STACK.with(|s| s.borrow_mut().pop())
}

pub fn current_active() -> Option<Rc<Watcher>> {
    ACTIVE_STACK.with(|s| s.borrow().last().cloned())
}

/// Connects `dep` to the watcher on top of the active-watcher stack, if any. Every accessor in
/// `value.rs` funnels through `Dep::depend`, which calls this.
pub fn depend_active_watcher(dep: &Rc<Dep>) {
    if let Some(w) = current_active() {
        w.add_dep(dep.clone());
    }
}

impl Watcher {
    #[allow(clippy::too_many_arguments)]
    fn build(
        getter: WatcherGetter,
        flags: WatcherFlags,
        callback: Option<Rc<dyn Fn(&Value, &Value)>>,
        owner: Option<Weak<dyn WatcherOwner>>,
        scheduler: Weak<Scheduler>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: WatcherId::next(),
            getter,
            flags,
            callback,
            owner: RefCell::new(owner),
            scheduler,
            active: Cell::new(true),
            dirty: Cell::new(flags.lazy),
            value: RefCell::new(Value::Null),
            current_deps: RefCell::new(IndexMap::new()),
            pending_deps: RefCell::new(IndexMap::new()),
        })
    }

    /// Creates a watcher from a user closure getter. If `flags.lazy` is unset, the caller is
    /// expected to invoke [`Watcher::get`] once immediately after construction (render watchers
    /// and eager user watchers do this in `ComponentInstance`; computed watchers, being lazy, do
    /// not run until first read).
    pub fn new_fn(
        getter: Rc<dyn Fn() -> Value>,
        flags: WatcherFlags,
        callback: Option<Rc<dyn Fn(&Value, &Value)>>,
        owner: Option<Weak<dyn WatcherOwner>>,
        scheduler: Weak<Scheduler>,
    ) -> Rc<Self> {
        Self::build(WatcherGetter::Fn(getter), flags, callback, owner, scheduler)
    }

    /// Creates a watcher from a dotted path against `root` (e.g. `root` returns the component's
    /// `data` record and `path` is `"user.name"`). An unparseable path degrades to a no-op getter
    /// with a dev warning rather than failing construction.
    pub fn new_path(
        root: Rc<dyn Fn() -> Value>,
        path: &str,
        flags: WatcherFlags,
        callback: Option<Rc<dyn Fn(&Value, &Value)>>,
        owner: Option<Weak<dyn WatcherOwner>>,
        scheduler: Weak<Scheduler>,
    ) -> Rc<Self> {
        let getter = match compile_path(path) {
            Some(segments) => WatcherGetter::Path { root, segments },
            None => {
                tracing::warn!(path, "invalid watch path; watcher will never fire");
                WatcherGetter::Fn(Rc::new(|| Value::Null))
            }
        };
        Self::build(getter, flags, callback, owner, scheduler)
    }

    pub fn id(&self) -> WatcherId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn last_value(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set_owner(&self, owner: Weak<dyn WatcherOwner>) {
        *self.owner.borrow_mut() = Some(owner);
    }

    fn owner_destroyed(&self) -> bool {
        match &*self.owner.borrow() {
            Some(owner) => owner.upgrade().map(|o| o.is_destroyed()).unwrap_or(true),
            None => false,
        }
    }

    pub fn owner_handle(&self) -> Option<Rc<dyn WatcherOwner>> {
        self.owner.borrow().as_ref().and_then(|o| o.upgrade())
    }

    /// Registers `dep` as touched by the getter currently running on this watcher. Deduplicates
    /// by dep id within the same `get()` call; subscribes only the first time this Dep has ever
    /// been seen by this watcher.
    pub fn add_dep(self: &Rc<Self>, dep: Rc<Dep>) {
        let id = dep.id();
        if self.pending_deps.borrow().contains_key(&id) {
            return;
        }
        let first_time = !self.current_deps.borrow().contains_key(&id);
        self.pending_deps.borrow_mut().insert(id, dep.clone());
        if first_time {
            dep.subscribe(self);
        }
    }

    /// Runs the getter with `self` on top of the active-watcher stack, performs a deep walk if
    /// `flags.deep`, then reconciles the pending/current dep sets ("Dep cleanup").
    pub fn get(self: &Rc<Self>) -> Value {
        push_active(self.clone());
        let value = match &self.getter {
            WatcherGetter::Fn(f) => f(),
            WatcherGetter::Path { root, segments } => {
                let mut current = root();
                for seg in segments {
                    current = match &current {
                        Value::Record(rec) => rec.borrow().get(seg),
                        _ => Value::Null,
                    };
                }
                current
            }
        };
        if self.flags.deep {
            let mut seen = fxhash::FxHashSet::default();
            walk_deep(&value, &mut seen);
        }
        let popped = pop_active();
        debug_assert!(popped.map(|p| p.id == self.id).unwrap_or(false));
        self.cleanup_deps();
        *self.value.borrow_mut() = value.clone();
        value
    }

    fn cleanup_deps(self: &Rc<Self>) {
        let mut current = self.current_deps.borrow_mut();
        let mut pending = self.pending_deps.borrow_mut();
        for (id, dep) in current.iter() {
            if !pending.contains_key(id) {
                dep.unsubscribe(self.id);
            }
        }
        std::mem::swap(&mut *current, &mut *pending);
        pending.clear();
    }

    /// `update()`: lazy watchers just mark dirty, sync watchers run immediately, everything else
    /// goes through the scheduler.
    pub fn update(self: &Rc<Self>) {
        if self.flags.lazy {
            self.dirty.set(true);
            return;
        }
        if self.flags.sync {
            self.run();
            return;
        }
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.queue_watcher(self.clone());
        }
    }

    /// Re-evaluates via `get()` and, if the value changed (or is a container, or `deep` is set),
    /// invokes the callback. User watchers trap panics from both the getter and the callback.
    pub fn run(self: &Rc<Self>) {
        if !self.active.get() || self.owner_destroyed() {
            return;
        }
        let old_value = self.value.borrow().clone();
        let new_value = if self.flags.user {
            match crate::error::trap_user("watcher", || self.get()) {
                Some(v) => v,
                None => return,
            }
        } else {
            self.get()
        };
        let changed = !values_equal(&old_value, &new_value) || new_value.is_container() || self.flags.deep;
        if changed {
            if let Some(cb) = self.callback.clone() {
                if self.flags.user {
                    crate::error::trap_user("watcher callback", || cb(&old_value, &new_value));
                } else {
                    cb(&old_value, &new_value);
                }
            }
        }
    }

    /// Invoked by the scheduler immediately before `run()`. Only render watchers fire the owning
    /// component's `beforeUpdate` hook this way; other watcher kinds are no-ops here.
    pub fn fire_before(&self) {
        if self.flags.render {
            if let Some(owner) = self.owner_handle() {
                owner.call_before_update();
            }
        }
    }

    /// Computed/lazy semantics: evaluates if dirty, then — regardless — forwards this watcher's
    /// current Deps to whichever watcher is active *outside* this call.
    pub fn evaluate_if_dirty(self: &Rc<Self>) -> Value {
        if self.dirty.get() {
            self.get();
            self.dirty.set(false);
        }
        self.depend();
        self.value.borrow().clone()
    }

    fn depend(self: &Rc<Self>) {
        if let Some(outer) = current_active() {
            if outer.id == self.id {
                return;
            }
            for dep in self.current_deps.borrow().values() {
                outer.add_dep(dep.clone());
            }
        }
    }

    /// Unsubscribes from every currently-held Dep and flips `active = false`. Removing this
    /// watcher from its owner's watcher list is the owner's responsibility.
    pub fn teardown(self: &Rc<Self>) {
        if !self.active.get() {
            return;
        }
        self.active.set(false);
        for dep in self.current_deps.borrow().values() {
            dep.unsubscribe(self.id);
        }
        self.current_deps.borrow_mut().clear();
        self.pending_deps.borrow_mut().clear();
    }
}
