//! The runtime: ties a [`NodeOps`] host, a [`Scheduler`], and a [`Patcher`] together, and is the
//! crate's external entry point — the Rust analog of calling `new Vue(options).$mount(el)` plus
//! the global `Vue.nextTick`/`Vue.set`/`Vue.delete` statics, gathered onto one owned object instead
//! of mutable globals.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::component::{ComponentDef, ComponentInstance};
use crate::module::Module;
use crate::node_ops::NodeOps;
use crate::patch::Patcher;
use crate::scheduler::{FlushTrigger, ImmediateTrigger, Scheduler};
use crate::value::{observe, PlainValue, Value};
use crate::vnode::Key;

/// Tunables for how aggressively the scheduler flushes, and
/// whether the dev-only diagnostics (infinite-update-loop guard, hydration/read-barrier warnings)
/// are compiled in via the `dev-checks` feature are actually *armed* at runtime.
pub struct RuntimeConfig {
    /// Run every flush synchronously, inline with the mutation that triggered it. Off by default;
    /// tests that want deterministic single-step assertions turn this on.
    pub sync_mode: bool,
    /// Caps how many times a single watcher may be re-enqueued within one flush before the
    /// scheduler gives up and logs instead of looping forever.
    pub max_update_count: u32,
    /// Whether the infinite-update-loop guard and other dev-only checks are armed. Defaults to the
    /// `dev-checks` feature flag but can be overridden independently (e.g. a release build that
    /// still wants the guard active).
    pub dev_checks: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sync_mode: false,
            max_update_count: 100,
            dev_checks: cfg!(feature = "dev-checks"),
        }
    }
}

pub struct Runtime<O: NodeOps> {
    scheduler: Rc<Scheduler>,
    patcher: Patcher<O>,
    root: RefCell<Option<Rc<ComponentInstance<O>>>>,
    self_weak: Weak<Runtime<O>>,
}

impl<O: NodeOps + 'static> Runtime<O> {
    pub fn new(ops: O, modules: Vec<Box<dyn Module<O>>>, config: RuntimeConfig) -> Rc<Self> {
        Self::with_trigger(ops, modules, config, Box::new(ImmediateTrigger))
    }

    pub fn with_trigger(ops: O, modules: Vec<Box<dyn Module<O>>>, config: RuntimeConfig, trigger: Box<dyn FlushTrigger>) -> Rc<Self> {
        let scheduler = Scheduler::new(trigger, config.sync_mode, config.dev_checks, config.max_update_count);
        let patcher = Patcher::new(ops, modules);
        let runtime = Rc::new_cyclic(|weak_self| Runtime {
            scheduler,
            patcher: patcher.clone(),
            root: RefCell::new(None),
            self_weak: weak_self.clone(),
        });
        patcher.bind_runtime(&runtime);
        runtime
    }

    pub fn scheduler_weak(&self) -> Weak<Scheduler> {
        Rc::downgrade(&self.scheduler)
    }

    pub fn patcher(&self) -> &Patcher<O> {
        &self.patcher
    }

    pub fn ops(&self) -> &O {
        self.patcher.ops()
    }

    /// Instantiates and mounts `def` as the root component under `parent_node`, replacing any
    /// previously mounted root. Equivalent to `new Vue(options).$mount(el)`.
    pub fn mount_root(self: &Rc<Self>, def: Rc<ComponentDef<O>>, props: Vec<(Rc<str>, Value)>, parent_node: O::Node) -> Rc<ComponentInstance<O>> {
        self.unmount_root();
        let runtime = self.self_weak.upgrade().expect("runtime mounting its own root");
        let instance = ComponentInstance::create(&runtime, def, props, None);
        instance.mount(&self.patcher, parent_node, None);
        *self.root.borrow_mut() = Some(instance.clone());
        instance
    }

    /// Tears down the currently mounted root instance, if any, removing its host nodes.
    pub fn unmount_root(self: &Rc<Self>) {
        if let Some(root) = self.root.borrow_mut().take() {
            if let Some(parent) = root.root_node().and_then(|node| self.patcher.ops().parent_node(&node)) {
                root.destroy(&self.patcher, &parent);
            } else {
                tracing::warn!("unmount_root: root instance has no host parent to detach from");
            }
        }
    }

    pub fn root(&self) -> Option<Rc<ComponentInstance<O>>> {
        self.root.borrow().clone()
    }

    /// Observes a plain value tree, producing the reactive form (`Vue.observable`/`Vue.set`'s
    /// initialization path).
    pub fn observable(&self, plain: PlainValue) -> Value {
        observe(plain)
    }

    /// `Vue.set(record, key, value)`: defines or assigns `key` on a reactive record, notifying
    /// dependents either way.
    pub fn set_prop(&self, container: &Value, key: &str, value: Value) {
        if let Value::Record(r) = container {
            r.borrow_mut().set(key, value);
        } else {
            tracing::warn!(key, "set() target is not a reactive record");
        }
    }

    /// `Vue.delete(record, key)`.
    pub fn delete_prop(&self, container: &Value, key: &str) {
        if let Value::Record(r) = container {
            r.borrow_mut().del(key);
        } else {
            tracing::warn!(key, "delete() target is not a reactive record");
        }
    }

    /// `Vue.set(list, index, value)` for the list case — `key`'s role is the numeric index.
    pub fn set_index(&self, container: &Value, index: usize, value: Value) {
        if let Value::List(l) = container {
            l.borrow_mut().set(index, value);
        } else {
            tracing::warn!(index, "set() target is not a reactive list");
        }
    }

    /// Runs `cb` once the in-flight (or next) flush completes.
    pub fn next_tick(&self, cb: impl FnOnce() + 'static) {
        self.scheduler.next_tick(Box::new(cb));
    }

    pub fn next_tick_future(&self) -> impl std::future::Future<Output = ()> {
        self.scheduler.next_tick_future()
    }
}

/// Convenience for building a `(Rc<str>, Value)` prop/provide pair from a plain value, used when
/// assembling the prop list handed to [`ComponentInstance::create`].
pub fn prop(key: impl Into<Rc<str>>, plain: PlainValue) -> (Rc<str>, Value) {
    (key.into(), observe(plain))
}

/// Convenience for building a `Key::Str` or `Key::Int` from whatever the caller has handy, used
/// when constructing keyed list VNodes outside of `vnode.rs` itself.
pub fn key_from(value: impl Into<Key>) -> Key {
    value.into()
}
