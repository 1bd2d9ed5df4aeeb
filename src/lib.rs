//! Renderer-agnostic reactivity and virtual-DOM patching core.
//!
//! Three layers, each usable independently of the others:
//!
//! - **Reactive values** ([`value`], [`dep`], [`watcher`], [`scheduler`], [`observer`]): an
//!   `Observer`/`Dep`/`Watcher` graph in the mold of Vue's reactivity system, batched through a
//!   microtask-like flush scheduler.
//! - **VNode patching** ([`vnode`], [`module`], [`node_ops`], [`patch`]): a snabbdom-style virtual
//!   DOM diffed against any host tree that implements [`node_ops::NodeOps`].
//! - **Components** ([`component`], [`runtime`]): instances that own reactive state, a render
//!   watcher, and a lifecycle, tying the two layers together.

pub mod component;
pub mod dep;
pub mod error;
pub mod module;
pub mod node_ops;
pub mod observer;
pub mod patch;
pub mod runtime;
pub mod scheduler;
pub mod value;
pub mod vnode;
pub mod watcher;

pub mod prelude {
    pub use crate::component::{
        ComponentDef, ComponentInstance, ComputedFn, DataFn, Hook, HookFn, HookTable, MethodFn, ProvideFn, RenderFn, WatchFn, WatchSpec,
    };
    pub use crate::error::{trap_render, trap_user, set_global_error_handler, CoreError, GlobalErrorHandler};
    pub use crate::module::Module;
    pub use crate::node_ops::NodeOps;
    pub use crate::patch::Patcher;
    pub use crate::runtime::{prop, Runtime, RuntimeConfig};
    pub use crate::value::{observe, shallow_record, PlainValue, Value};
    pub use crate::vnode::{Key, VData, VNode};
}
