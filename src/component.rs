//! Component instances: own data, the render watcher, parent/child links, and mount state.
//!
//! Initialization and teardown follow the strict ordering a Vue component instance uses
//! internally (`_init`/`$destroy`), generalized to explicit Rust closures instead of string-keyed
//! option merging.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::trap_user;
use crate::node_ops::NodeOps;
use crate::patch::Patcher;
use crate::runtime::Runtime;
use crate::value::{empty_record, observe, shallow_record, PlainValue, Value};
use crate::vnode::VNode;
use crate::watcher::{Watcher, WatcherFlags, WatcherOwner};

pub type RenderFn<O> = Rc<dyn Fn(&Rc<ComponentInstance<O>>) -> VNode<O>>;
pub type DataFn = Rc<dyn Fn() -> PlainValue>;
pub type ComputedFn<O> = Rc<dyn Fn(&Rc<ComponentInstance<O>>) -> Value>;
pub type MethodFn<O> = Rc<dyn Fn(&Rc<ComponentInstance<O>>, &[Value]) -> Value>;
pub type WatchFn<O> = Rc<dyn Fn(&Rc<ComponentInstance<O>>, &Value, &Value)>;
pub type HookFn<O> = Rc<dyn Fn(&Rc<ComponentInstance<O>>)>;
pub type ProvideFn<O> = Rc<dyn Fn(&Rc<ComponentInstance<O>>) -> Vec<(Rc<str>, Value)>>;

thread_local! {
    /// Stack of instances currently executing their render function, type-erased since a bare
    /// `thread_local!` can't itself be generic over `O`. Lets a nested `Component` VNode created
    /// mid-render find its logical parent instance without threading it through every render call.
    static RENDER_STACK: RefCell<Vec<Rc<dyn Any>>> = RefCell::new(Vec::new());
}

fn push_rendering_instance<O: NodeOps + 'static>(instance: Rc<ComponentInstance<O>>) {
    RENDER_STACK.with(|stack| stack.borrow_mut().push(instance));
}

fn pop_rendering_instance() {
    RENDER_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// The instance whose render function is currently executing on this thread, if any.
pub fn current_rendering_instance<O: NodeOps + 'static>() -> Option<Rc<ComponentInstance<O>>> {
    RENDER_STACK.with(|stack| stack.borrow().last().and_then(|rc| rc.clone().downcast::<ComponentInstance<O>>().ok()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
    Activated,
    Deactivated,
}

pub struct HookTable<O> {
    pub before_create: Option<HookFn<O>>,
    pub created: Option<HookFn<O>>,
    pub before_mount: Option<HookFn<O>>,
    pub mounted: Option<HookFn<O>>,
    pub before_update: Option<HookFn<O>>,
    pub updated: Option<HookFn<O>>,
    pub before_destroy: Option<HookFn<O>>,
    pub destroyed: Option<HookFn<O>>,
    pub activated: Option<HookFn<O>>,
    pub deactivated: Option<HookFn<O>>,
}

impl<O> Default for HookTable<O> {
    fn default() -> Self {
        Self {
            before_create: None,
            created: None,
            before_mount: None,
            mounted: None,
            before_update: None,
            updated: None,
            before_destroy: None,
            destroyed: None,
            activated: None,
            deactivated: None,
        }
    }
}

pub struct WatchSpec<O> {
    pub path: Rc<str>,
    pub callback: WatchFn<O>,
    pub deep: bool,
    pub immediate: bool,
}

/// The static definition of a component: the Rust analog of a Vue component's options object.
/// Shared (via `Rc`) across every VNode/instance of the same component type; component identity
/// for `same_vnode` purposes is `Rc::ptr_eq` on this struct.
pub struct ComponentDef<O> {
    pub data: Option<DataFn>,
    pub computed: Vec<(Rc<str>, ComputedFn<O>)>,
    pub methods: Vec<(Rc<str>, MethodFn<O>)>,
    pub watch: Vec<WatchSpec<O>>,
    pub render: RenderFn<O>,
    pub provide: Option<ProvideFn<O>>,
    pub inject: Vec<Rc<str>>,
    pub hooks: HookTable<O>,
}

pub struct ComponentInstance<O: NodeOps> {
    def: Rc<ComponentDef<O>>,
    runtime: Weak<Runtime<O>>,
    self_weak: Weak<ComponentInstance<O>>,
    data: RefCell<Value>,
    props: RefCell<Value>,
    injected: RefCell<IndexMap<Rc<str>, Value>>,
    provided: RefCell<IndexMap<Rc<str>, Value>>,
    computed_watchers: RefCell<IndexMap<Rc<str>, Rc<Watcher>>>,
    user_watchers: RefCell<Vec<Rc<Watcher>>>,
    render_watcher: RefCell<Option<Rc<Watcher>>>,
    parent: RefCell<Option<Weak<ComponentInstance<O>>>>,
    children: RefCell<Vec<Rc<ComponentInstance<O>>>>,
    vnode: RefCell<Option<VNode<O>>>,
    is_mounted: Cell<bool>,
    is_destroyed: Cell<bool>,
    is_being_destroyed: Cell<bool>,
    root_node: RefCell<Option<O::Node>>,
}

pub fn call_hook<O: NodeOps>(instance: &Rc<ComponentInstance<O>>, hook: Hook) {
    let f = match hook {
        Hook::BeforeCreate => instance.def.hooks.before_create.clone(),
        Hook::Created => instance.def.hooks.created.clone(),
        Hook::BeforeMount => instance.def.hooks.before_mount.clone(),
        Hook::Mounted => instance.def.hooks.mounted.clone(),
        Hook::BeforeUpdate => instance.def.hooks.before_update.clone(),
        Hook::Updated => instance.def.hooks.updated.clone(),
        Hook::BeforeDestroy => instance.def.hooks.before_destroy.clone(),
        Hook::Destroyed => instance.def.hooks.destroyed.clone(),
        Hook::Activated => instance.def.hooks.activated.clone(),
        Hook::Deactivated => instance.def.hooks.deactivated.clone(),
    };
    if let Some(f) = f {
        let instance = instance.clone();
        trap_user("lifecycle hook", move || f(&instance));
    }
}

impl<O: NodeOps + 'static> WatcherOwner for ComponentInstance<O> {
    fn is_destroyed(&self) -> bool {
        self.is_destroyed.get()
    }

    fn call_before_update(&self) {
        if let Some(rc) = self.self_weak.upgrade() {
            call_hook(&rc, Hook::BeforeUpdate);
        }
    }

    fn call_updated(&self) {
        if let Some(rc) = self.self_weak.upgrade() {
            call_hook(&rc, Hook::Updated);
        }
    }
}

impl<O: NodeOps + 'static> ComponentInstance<O> {
    /// Instantiates a component. Follows the fixed order: `before_create`, resolve `inject`, init
    /// `props → methods → data → computed → user watchers`, publish `provide`, fire `created`.
    /// Mounting (if a target is supplied) is a caller-driven follow-up step via
    /// [`ComponentInstance::mount`], matching the "finally mount, if a target was supplied" clause.
    pub fn create(
        runtime: &Rc<Runtime<O>>,
        def: Rc<ComponentDef<O>>,
        props_pairs: Vec<(Rc<str>, Value)>,
        parent: Option<&Rc<ComponentInstance<O>>>,
    ) -> Rc<ComponentInstance<O>> {
        let instance = Rc::new_cyclic(|weak_self| ComponentInstance {
            def: def.clone(),
            runtime: Rc::downgrade(runtime),
            self_weak: weak_self.clone(),
            data: RefCell::new(Value::Null),
            props: RefCell::new(Value::Null),
            injected: RefCell::new(IndexMap::new()),
            provided: RefCell::new(IndexMap::new()),
            computed_watchers: RefCell::new(IndexMap::new()),
            user_watchers: RefCell::new(Vec::new()),
            render_watcher: RefCell::new(None),
            parent: RefCell::new(parent.map(Rc::downgrade)),
            children: RefCell::new(Vec::new()),
            vnode: RefCell::new(None),
            is_mounted: Cell::new(false),
            is_destroyed: Cell::new(false),
            is_being_destroyed: Cell::new(false),
            root_node: RefCell::new(None),
        });

        if let Some(parent) = parent {
            parent.children.borrow_mut().push(instance.clone());
        }

        call_hook(&instance, Hook::BeforeCreate);

        {
            let mut injected = IndexMap::new();
            for key in &def.inject {
                match instance.find_provided(key) {
                    Some(v) => {
                        injected.insert(key.clone(), v);
                    }
                    None => tracing::warn!(key = %key, "inject target not provided by any ancestor"),
                }
            }
            *instance.injected.borrow_mut() = injected;
        }

        *instance.props.borrow_mut() = shallow_record(props_pairs);

        // methods are stateless lookups against `def.methods`, nothing to initialize.

        *instance.data.borrow_mut() = match &def.data {
            Some(data_fn) => observe(data_fn()),
            None => empty_record(),
        };

        {
            let mut computed_watchers = IndexMap::new();
            for (name, getter) in &def.computed {
                let inst_weak = instance.self_weak.clone();
                let getter = getter.clone();
                let owner_weak: Weak<dyn WatcherOwner> = instance.self_weak.clone();
                let w = Watcher::new_fn(
                    Rc::new(move || match inst_weak.upgrade() {
                        Some(inst) => getter(&inst),
                        None => Value::Null,
                    }),
                    WatcherFlags {
                        lazy: true,
                        ..Default::default()
                    },
                    None,
                    Some(owner_weak),
                    runtime.scheduler_weak(),
                );
                computed_watchers.insert(name.clone(), w);
            }
            *instance.computed_watchers.borrow_mut() = computed_watchers;
        }

        for spec in &def.watch {
            instance.watch_path(spec.path.clone(), spec.callback.clone(), spec.deep, spec.immediate);
        }

        if let Some(provide_fn) = &def.provide {
            let pairs = provide_fn(&instance);
            let mut map = IndexMap::new();
            for (k, v) in pairs {
                map.insert(k, v);
            }
            *instance.provided.borrow_mut() = map;
        }

        call_hook(&instance, Hook::Created);

        instance
    }

    fn find_provided(&self, key: &str) -> Option<Value> {
        let mut cursor = self.parent.borrow().clone();
        while let Some(weak) = cursor {
            let parent = weak.upgrade()?;
            if let Some(v) = parent.provided.borrow().get(key) {
                return Some(v.clone());
            }
            cursor = parent.parent.borrow().clone();
        }
        None
    }

    pub fn data_get(&self, key: &str) -> Value {
        match &*self.data.borrow() {
            Value::Record(r) => r.borrow().get(key),
            _ => Value::Null,
        }
    }

    pub fn data_set(&self, key: &str, value: Value) {
        if let Value::Record(r) = &*self.data.borrow() {
            r.borrow_mut().set(key, value);
        }
    }

    pub fn prop(&self, key: &str) -> Value {
        match &*self.props.borrow() {
            Value::Record(r) => r.borrow().get(key),
            _ => Value::Null,
        }
    }

    pub fn injected(&self, key: &str) -> Value {
        self.injected.borrow().get(key).cloned().unwrap_or(Value::Null)
    }

    /// Applies new prop values in place (the owning VNode was matched by `same_vnode` and is being
    /// patched, not recreated). Props stay the same reactive record instance, so dependents of
    /// individual prop keys are notified rather than torn down and rebuilt.
    pub fn update_props(&self, pairs: &[(Rc<str>, Value)]) {
        if let Value::Record(r) = &*self.props.borrow() {
            let mut record = r.borrow_mut();
            for (k, v) in pairs {
                record.set(k, v.clone());
            }
        }
    }

    pub fn call_method(self: &Rc<Self>, name: &str, args: &[Value]) -> Value {
        match self.def.methods.iter().find(|(n, _)| &**n == name) {
            Some((_, f)) => f(self, args),
            None => {
                tracing::warn!(name, "call to undefined method");
                Value::Null
            }
        }
    }

    pub fn computed(self: &Rc<Self>, name: &str) -> Value {
        let watcher = self.computed_watchers.borrow().get(name).cloned();
        match watcher {
            Some(w) => w.evaluate_if_dirty(),
            None => {
                tracing::warn!(name, "read of undefined computed property");
                Value::Null
            }
        }
    }

    /// `$watch`-equivalent: watches a dotted path against `data`, invoking `callback(old, new)` on
    /// change. `immediate` runs the callback once up front with `old = Null`.
    pub fn watch_path(
        self: &Rc<Self>,
        path: Rc<str>,
        callback: WatchFn<O>,
        deep: bool,
        immediate: bool,
    ) -> Rc<Watcher> {
        let inst_weak = self.self_weak.clone();
        let inst_for_cb = self.self_weak.clone();
        let root: Rc<dyn Fn() -> Value> = Rc::new(move || {
            inst_weak.upgrade().map(|i| i.data.borrow().clone()).unwrap_or(Value::Null)
        });
        let cb: Rc<dyn Fn(&Value, &Value)> = Rc::new(move |old, new| {
            if let Some(inst) = inst_for_cb.upgrade() {
                callback(&inst, old, new);
            }
        });
        let owner_weak: Weak<dyn WatcherOwner> = self.self_weak.clone();
        let flags = WatcherFlags {
            deep,
            user: true,
            lazy: false,
            sync: false,
            render: false,
        };
        let runtime_scheduler = self.runtime.upgrade().map(|rt| rt.scheduler_weak()).unwrap_or_default();
        let watcher = Watcher::new_path(root, &path, flags, Some(cb), Some(owner_weak), runtime_scheduler);
        if immediate {
            watcher.run();
        } else {
            watcher.get();
        }
        self.user_watchers.borrow_mut().push(watcher.clone());
        watcher
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    pub fn root_node(&self) -> Option<O::Node> {
        self.root_node.borrow().clone()
    }

    pub fn def(&self) -> &Rc<ComponentDef<O>> {
        &self.def
    }

    /// Creates the render watcher and runs it once, producing and patching the first VNode tree
    /// against `parent_node`/`reference`. Fires `before_mount` first and `mounted` after, for
    /// top-level instances (a child mounted as part of its parent's patch fires `mounted` via the
    /// patcher's component-init hook instead, once the whole subtree is attached).
    pub fn mount(self: &Rc<Self>, patcher: &Patcher<O>, parent_node: O::Node, reference: Option<O::Node>) {
        call_hook(self, Hook::BeforeMount);

        let inst_weak = self.self_weak.clone();
        let render = self.def.render.clone();
        let getter: Rc<dyn Fn() -> Value> = {
            let patcher = patcher.clone();
            let parent_node = parent_node.clone();
            Rc::new(move || {
                let inst = match inst_weak.upgrade() {
                    Some(i) => i,
                    None => return Value::Null,
                };
                if inst.is_destroyed.get() {
                    return Value::Null;
                }
                // The instance stays on top of the render stack through the whole patch, not just
                // the render call itself: nested Component VNodes are only actually instantiated
                // while the patcher walks the tree it produced, and they need to find `inst` as
                // their logical parent at that point, not whatever rendered before or after it.
                push_rendering_instance(inst.clone());
                let new_vnode = trap_user("render", || render(&inst));
                let new_vnode = match new_vnode {
                    Some(v) => v,
                    None => {
                        pop_rendering_instance();
                        return Value::Null;
                    }
                };
                let old_vnode = inst.vnode.borrow_mut().take();
                let reference = if old_vnode.is_some() { None } else { reference.clone() };
                let root = patcher.patch(old_vnode, new_vnode, &parent_node, reference.as_ref());
                pop_rendering_instance();
                if let Some(root) = &root {
                    *inst.root_node.borrow_mut() = Some(root.elm().expect("patched root must have a host node"));
                    *inst.vnode.borrow_mut() = Some(root);
                }
                let was_mounted = inst.is_mounted.replace(true);
                if !was_mounted {
                    call_hook(&inst, Hook::Mounted);
                }
                Value::Null
            })
        };

        let owner_weak: Weak<dyn WatcherOwner> = self.self_weak.clone();
        let runtime_scheduler = self.runtime.upgrade().map(|rt| rt.scheduler_weak()).unwrap_or_default();
        let watcher = Watcher::new_fn(
            getter,
            WatcherFlags {
                render: true,
                ..Default::default()
            },
            None,
            Some(owner_weak),
            runtime_scheduler,
        );
        *self.render_watcher.borrow_mut() = Some(watcher.clone());
        watcher.get();
    }

    /// Destroys the subtree rooted at this instance: `before_destroy`, detach from the parent's
    /// children, tear down every watcher, remove the host nodes via `Patcher::patch_out`,
    /// `destroyed`. Descendant component instances are torn down as a side effect of
    /// `patch_out` recursing through nested `Component` VNodes (each via
    /// [`ComponentInstance::teardown_in_place`], since their host removal is already covered by
    /// this instance's own single top-level `remove_child`) — this method does not walk
    /// `children` itself, to avoid a redundant second teardown.
    pub fn destroy(self: &Rc<Self>, patcher: &Patcher<O>, parent_node: &O::Node) {
        if self.is_being_destroyed.get() || self.is_destroyed.get() {
            return;
        }
        self.is_being_destroyed.set(true);
        call_hook(self, Hook::BeforeDestroy);

        if let Some(parent_weak) = self.parent.borrow_mut().take() {
            if let Some(parent) = parent_weak.upgrade() {
                parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, self));
            }
        }

        if let Some(w) = self.render_watcher.borrow_mut().take() {
            w.teardown();
        }
        for w in self.user_watchers.borrow_mut().drain(..) {
            w.teardown();
        }
        for w in self.computed_watchers.borrow_mut().values() {
            w.teardown();
        }
        self.computed_watchers.borrow_mut().clear();

        self.is_destroyed.set(true);

        if let Some(old) = self.vnode.borrow_mut().take() {
            patcher.patch_out(old, parent_node);
        }

        call_hook(self, Hook::Destroyed);
        self.root_node.borrow_mut().take();
    }

    /// Tears down lifecycle state only, for a descendant whose host nodes are being removed as a
    /// side effect of an ancestor's own single `remove_child` call. Unlike [`destroy`], this never
    /// touches the host tree directly — it hands its own last-rendered vnode to
    /// `Patcher::invoke_destroy`, which fires module `destroy` hooks and recurses into any further
    /// nested component instances without issuing any more `remove_child` calls of its own.
    pub fn teardown_in_place(self: &Rc<Self>, patcher: &Patcher<O>) {
        if self.is_being_destroyed.get() || self.is_destroyed.get() {
            return;
        }
        self.is_being_destroyed.set(true);
        call_hook(self, Hook::BeforeDestroy);

        if let Some(parent_weak) = self.parent.borrow_mut().take() {
            if let Some(parent) = parent_weak.upgrade() {
                parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, self));
            }
        }

        if let Some(w) = self.render_watcher.borrow_mut().take() {
            w.teardown();
        }
        for w in self.user_watchers.borrow_mut().drain(..) {
            w.teardown();
        }
        for w in self.computed_watchers.borrow_mut().values() {
            w.teardown();
        }
        self.computed_watchers.borrow_mut().clear();

        self.is_destroyed.set(true);
        if let Some(vnode) = self.vnode.borrow_mut().take() {
            patcher.invoke_destroy(&vnode);
        }
        call_hook(self, Hook::Destroyed);
        self.root_node.borrow_mut().take();
    }
}
