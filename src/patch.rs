//! The patcher: walks two VNode trees and drives a [`NodeOps`] host through the minimal
//! create/update/remove/move calls needed to get from one to the other.
//!
//! Keyed children are reconciled with the classic four-pointer algorithm (old_start/old_end vs.
//! new_start/new_end, falling back to a lazily-built key→index map for anything that doesn't match
//! at either end) rather than a longest-increasing-subsequence-based move-minimizing diff —
//! simpler to verify and the standard choice once VNodes carry explicit keys instead of a
//! template-diffing pass.

use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

use crate::component::{current_rendering_instance, ComponentInstance};
use crate::module::Module;
use crate::node_ops::NodeOps;
use crate::runtime::Runtime;
use crate::vnode::{same_vnode, Key, VNode, VNodeKind};

struct PatcherInner<O: NodeOps> {
    ops: O,
    modules: Vec<Box<dyn Module<O>>>,
    runtime: std::cell::RefCell<Weak<Runtime<O>>>,
}

/// Cheaply clonable handle to the patcher; every [`crate::component::ComponentInstance`] holds one
/// to drive its own subtree.
pub struct Patcher<O: NodeOps> {
    inner: Rc<PatcherInner<O>>,
}

impl<O: NodeOps> Clone for Patcher<O> {
    fn clone(&self) -> Self {
        Patcher { inner: self.inner.clone() }
    }
}

impl<O: NodeOps + 'static> Patcher<O> {
    pub fn new(ops: O, modules: Vec<Box<dyn Module<O>>>) -> Self {
        Patcher {
            inner: Rc::new(PatcherInner {
                ops,
                modules,
                runtime: std::cell::RefCell::new(Weak::new()),
            }),
        }
    }

    pub(crate) fn bind_runtime(&self, runtime: &Rc<Runtime<O>>) {
        *self.inner.runtime.borrow_mut() = Rc::downgrade(runtime);
    }

    fn runtime(&self) -> Rc<Runtime<O>> {
        self.inner
            .runtime
            .borrow()
            .upgrade()
            .expect("patcher used before its runtime was bound")
    }

    pub fn ops(&self) -> &O {
        &self.inner.ops
    }

    /// Patches `old` (if any) into `new`, creating or updating host nodes under `parent` as
    /// needed, and returns `new` with `elm` populated. `reference` positions a brand-new node when
    /// there is no `old` to anchor against.
    pub fn patch(&self, old: Option<VNode<O>>, new: VNode<O>, parent: &O::Node, reference: Option<&O::Node>) -> Option<VNode<O>> {
        match old {
            None => {
                self.create_vnode(&new, parent, reference);
                Some(new)
            }
            Some(old) => {
                if same_vnode(&old, &new) {
                    self.patch_vnode(&old, &new);
                    Some(new)
                } else {
                    let insert_ref = old.elm();
                    self.create_vnode(&new, parent, insert_ref.as_ref());
                    self.patch_out(old, parent);
                    Some(new)
                }
            }
        }
    }

    /// Fully removes `vnode` (and everything beneath it) from `parent_node`: fires `remove` module
    /// hooks on `vnode` itself, tears down and fires `destroy` hooks across the whole subtree
    /// (post-order), then detaches `vnode.elm()` with a single host call.
    pub fn patch_out(&self, vnode: VNode<O>, parent_node: &O::Node) {
        for m in &self.inner.modules {
            m.remove(&vnode, &self.inner.ops);
        }
        self.invoke_destroy(&vnode);
        if let Some(elm) = vnode.elm() {
            self.inner.ops.remove_child(parent_node, &elm);
        }
    }

    /// Walks `vnode`'s subtree firing `destroy` module hooks post-order and tearing down any
    /// nested component instances in place. Never removes a host node itself — the caller either
    /// already did (via [`Patcher::patch_out`]) or is about to, with a single call covering the
    /// whole subtree at once.
    pub(crate) fn invoke_destroy(&self, vnode: &VNode<O>) {
        if let VNodeKind::Element { children, .. } = &vnode.kind {
            for child in children {
                self.invoke_destroy(child);
            }
        }
        if let VNodeKind::Component { instance, .. } = &vnode.kind {
            if let Some(inst) = instance.borrow().clone() {
                inst.teardown_in_place(self);
            }
        }
        for m in &self.inner.modules {
            m.destroy(vnode, &self.inner.ops);
        }
    }

    fn create_vnode(&self, vnode: &VNode<O>, parent: &O::Node, reference: Option<&O::Node>) {
        match &vnode.kind {
            VNodeKind::Text(text) => {
                let node = self.inner.ops.create_text(text);
                self.inner.ops.insert_before(parent, &node, reference);
                vnode.set_elm(Some(node));
            }
            VNodeKind::Comment(text) => {
                let node = self.inner.ops.create_comment(text);
                self.inner.ops.insert_before(parent, &node, reference);
                vnode.set_elm(Some(node));
            }
            VNodeKind::Element { tag, namespace, children, .. } => {
                let node = match namespace {
                    Some(ns) => self.inner.ops.create_element_ns(tag, ns),
                    None => self.inner.ops.create_element(tag),
                };
                for child in children {
                    self.create_vnode(child, &node, None);
                }
                vnode.set_elm(Some(node.clone()));
                for m in &self.inner.modules {
                    m.create(None, vnode, &self.inner.ops);
                }
                self.inner.ops.insert_before(parent, &node, reference);
            }
            VNodeKind::Component { def, props, instance } => {
                let runtime = self.runtime();
                let parent_instance = current_rendering_instance::<O>();
                let new_instance = ComponentInstance::create(&runtime, def.clone(), props.clone(), parent_instance.as_ref());
                *instance.borrow_mut() = Some(new_instance.clone());
                new_instance.mount(self, parent.clone(), reference.cloned());
                vnode.set_elm(new_instance.root_node());
            }
        }
    }

    fn patch_vnode(&self, old: &VNode<O>, new: &VNode<O>) {
        new.set_elm(old.elm());

        match (&old.kind, &new.kind) {
            (VNodeKind::Text(old_text), VNodeKind::Text(new_text)) => {
                if old_text != new_text {
                    if let Some(elm) = new.elm() {
                        self.inner.ops.set_text_content(&elm, new_text);
                    }
                }
            }
            (VNodeKind::Comment(_), VNodeKind::Comment(_)) => {}
            (
                VNodeKind::Element { children: old_children, .. },
                VNodeKind::Element { children: new_children, .. },
            ) => {
                for m in &self.inner.modules {
                    m.update(old, new, &self.inner.ops);
                }
                if let Some(elm) = new.elm() {
                    self.diff_children(&elm, old_children, new_children);
                }
            }
            (VNodeKind::Component { instance: old_instance, .. }, VNodeKind::Component { props: new_props, instance: new_instance, .. }) => {
                let inst = old_instance.borrow().clone();
                *new_instance.borrow_mut() = inst.clone();
                if let Some(inst) = inst {
                    inst.update_props(new_props);
                    new.set_elm(inst.root_node());
                }
            }
            _ => unreachable!("same_vnode guarantees matching kinds"),
        }
    }

    /// Four-pointer keyed reconciliation (old_start/old_end/new_start/new_end), falling back to a
    /// lazily-built key→index map for moves that don't match at either end. Children without keys
    /// only ever match positionally, exactly as the pointer comparisons at each step require.
    fn diff_children(&self, parent: &O::Node, old_children: &[VNode<O>], new_children: &[VNode<O>]) {
        let mut old_start = 0usize;
        let mut old_end = old_children.len();
        let mut new_start = 0usize;
        let mut new_end = new_children.len();
        let mut consumed = vec![false; old_children.len()];
        let mut key_to_index: Option<FxHashMap<Key, usize>> = None;

        while old_start < old_end && new_start < new_end {
            if consumed[old_start] {
                old_start += 1;
                continue;
            }
            if consumed[old_end - 1] {
                old_end -= 1;
                continue;
            }
            let old_start_vn = &old_children[old_start];
            let old_end_vn = &old_children[old_end - 1];
            let new_start_vn = &new_children[new_start];
            let new_end_vn = &new_children[new_end - 1];

            if same_vnode(old_start_vn, new_start_vn) {
                self.patch_vnode(old_start_vn, new_start_vn);
                consumed[old_start] = true;
                old_start += 1;
                new_start += 1;
            } else if same_vnode(old_end_vn, new_end_vn) {
                self.patch_vnode(old_end_vn, new_end_vn);
                consumed[old_end - 1] = true;
                old_end -= 1;
                new_end -= 1;
            } else if same_vnode(old_start_vn, new_end_vn) {
                self.patch_vnode(old_start_vn, new_end_vn);
                let reference = self.node_after(old_end_vn);
                if let Some(elm) = new_end_vn.elm() {
                    self.inner.ops.insert_before(parent, &elm, reference.as_ref());
                }
                consumed[old_start] = true;
                old_start += 1;
                new_end -= 1;
            } else if same_vnode(old_end_vn, new_start_vn) {
                self.patch_vnode(old_end_vn, new_start_vn);
                if let Some(elm) = new_start_vn.elm() {
                    self.inner.ops.insert_before(parent, &elm, old_start_vn.elm().as_ref());
                }
                consumed[old_end - 1] = true;
                old_end -= 1;
                new_start += 1;
            } else {
                let map = key_to_index.get_or_insert_with(|| {
                    let mut map = FxHashMap::default();
                    for i in old_start..old_end {
                        if consumed[i] {
                            continue;
                        }
                        if let Some(key) = &old_children[i].key {
                            map.insert(key.clone(), i);
                        }
                    }
                    map
                });
                let matched = new_start_vn.key.as_ref().and_then(|k| map.get(k)).copied();
                match matched {
                    Some(idx) if !consumed[idx] && same_vnode(&old_children[idx], new_start_vn) => {
                        self.patch_vnode(&old_children[idx], new_start_vn);
                        if let Some(elm) = new_start_vn.elm() {
                            self.inner.ops.insert_before(parent, &elm, old_start_vn.elm().as_ref());
                        }
                        consumed[idx] = true;
                    }
                    Some(idx) if !consumed[idx] => {
                        // Same key, different tag/kind — a v-if branch toggling under a shared
                        // key is the common case. same_vnode says these can't be patched into one
                        // another, so replace: create the new node and tear down the stale old one.
                        self.create_vnode(new_start_vn, parent, old_start_vn.elm().as_ref());
                        self.patch_out(old_children[idx].clone(), parent);
                        consumed[idx] = true;
                    }
                    _ => {
                        self.create_vnode(new_start_vn, parent, old_start_vn.elm().as_ref());
                    }
                }
                new_start += 1;
            }
        }

        if old_start < old_end {
            for i in old_start..old_end {
                if !consumed[i] {
                    self.patch_out(old_children[i].clone(), parent);
                }
            }
        }

        if new_start < new_end {
            let reference = new_children.get(new_end).and_then(|v| v.elm());
            for new_vn in &new_children[new_start..new_end] {
                self.create_vnode(new_vn, parent, reference.as_ref());
            }
        }
    }

    fn node_after(&self, vnode: &VNode<O>) -> Option<O::Node> {
        vnode.elm().and_then(|elm| self.inner.ops.next_sibling(&elm))
    }
}
