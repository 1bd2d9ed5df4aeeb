//! Pluggable per-attribute-kind patchers. A platform supplies a fixed list (attributes, props,
//! class, style, events, transition); user directives are funnelled through a directive module
//! applied last. Each hook kind fires across every installed module, in module order.

use crate::node_ops::NodeOps;
use crate::vnode::VNode;

/// `O` is the concrete [`NodeOps`] implementation modules are allowed to call into from their
/// hooks (e.g. to set a DOM attribute directly rather than going through the patcher).
///
/// `create`/`activate` take `None` for a freshly created node (there is no previous vnode to diff
/// against) rather than a synthetic empty placeholder.
pub trait Module<O: NodeOps> {
    fn create(&self, _old: Option<&VNode<O>>, _vnode: &VNode<O>, _ops: &O) {}
    fn update(&self, _old: &VNode<O>, _vnode: &VNode<O>, _ops: &O) {}
    fn remove(&self, _vnode: &VNode<O>, _ops: &O) {}
    fn destroy(&self, _vnode: &VNode<O>, _ops: &O) {}
    fn activate(&self, _old: Option<&VNode<O>>, _vnode: &VNode<O>, _ops: &O) {}
}
