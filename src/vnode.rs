//! The virtual-node model the patcher diffs. Generic over the [`NodeOps`] implementation `O`
//! supplied by the integrator, so the same VNode type works across renderer backends without
//! committing to one concrete host handle. `O::Node` is the concrete host handle stored in `elm`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::{ComponentDef, ComponentInstance};
use crate::node_ops::NodeOps;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

/// Recognized data keys on an element/component VNode: `attrs`, `props`, `on`, `class`, `style`,
/// `key`, `ref`, `hook`. `key` is lifted out onto [`VNode::key`] directly; the rest stay here for
/// modules to consume.
#[derive(Default, Clone)]
pub struct VData {
    pub attrs: Vec<(Rc<str>, Value)>,
    pub props: Vec<(Rc<str>, Value)>,
    pub on: Vec<(Rc<str>, Rc<dyn Fn(Value)>)>,
    pub class: Vec<Rc<str>>,
    pub style: Vec<(Rc<str>, Rc<str>)>,
    pub r#ref: Option<Rc<str>>,
}

pub enum VNodeKind<O: NodeOps> {
    Element {
        tag: Rc<str>,
        namespace: Option<Rc<str>>,
        data: VData,
        children: Vec<VNode<O>>,
    },
    Component {
        def: Rc<ComponentDef<O>>,
        props: Vec<(Rc<str>, Value)>,
        instance: RefCell<Option<Rc<ComponentInstance<O>>>>,
    },
    Text(Rc<str>),
    Comment(Rc<str>),
}

/// Written manually rather than derived: deriving would add an `O: Clone` bound on the whole impl,
/// but only `O::Node` (via `Rc`/`RefCell` of it) ever actually needs cloning.
impl<O: NodeOps> Clone for VNodeKind<O> {
    fn clone(&self) -> Self {
        match self {
            VNodeKind::Element { tag, namespace, data, children } => VNodeKind::Element {
                tag: tag.clone(),
                namespace: namespace.clone(),
                data: data.clone(),
                children: children.clone(),
            },
            VNodeKind::Component { def, props, instance } => VNodeKind::Component {
                def: def.clone(),
                props: props.clone(),
                instance: RefCell::new(instance.borrow().clone()),
            },
            VNodeKind::Text(t) => VNodeKind::Text(t.clone()),
            VNodeKind::Comment(t) => VNodeKind::Comment(t.clone()),
        }
    }
}

pub struct VNode<O: NodeOps> {
    pub kind: VNodeKind<O>,
    pub key: Option<Key>,
    pub elm: RefCell<Option<O::Node>>,
    /// `type` attribute, tracked separately because `sameVnode` special-cases it for
    /// `<input>`-equivalent elements (changing `type` must force a replace, not an in-place patch).
    pub input_type: Option<Rc<str>>,
}

impl<O: NodeOps> Clone for VNode<O> {
    fn clone(&self) -> Self {
        VNode {
            kind: self.kind.clone(),
            key: self.key.clone(),
            elm: RefCell::new(self.elm.borrow().clone()),
            input_type: self.input_type.clone(),
        }
    }
}

impl<O: NodeOps> VNode<O> {
    pub fn element(tag: impl Into<Rc<str>>, data: VData, children: Vec<VNode<O>>) -> Self {
        let key = data
            .attrs
            .iter()
            .find(|(k, _)| &**k == "key")
            .map(|(_, v)| Key::Str(Rc::from(v.to_display_string())));
        let input_type = data
            .attrs
            .iter()
            .find(|(k, _)| &**k == "type")
            .map(|(_, v)| Rc::from(v.to_display_string()));
        Self {
            kind: VNodeKind::Element {
                tag: tag.into(),
                namespace: None,
                data,
                children,
            },
            key,
            elm: RefCell::new(None),
            input_type,
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    pub fn component(def: Rc<ComponentDef<O>>, props: Vec<(Rc<str>, Value)>, key: Option<Key>) -> Self {
        Self {
            kind: VNodeKind::Component {
                def,
                props,
                instance: RefCell::new(None),
            },
            key,
            elm: RefCell::new(None),
            input_type: None,
        }
    }

    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Self {
            kind: VNodeKind::Text(text.into()),
            key: None,
            elm: RefCell::new(None),
            input_type: None,
        }
    }

    pub fn comment(text: impl Into<Rc<str>>) -> Self {
        Self {
            kind: VNodeKind::Comment(text.into()),
            key: None,
            elm: RefCell::new(None),
            input_type: None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, VNodeKind::Comment(_))
    }

    fn has_data(&self) -> bool {
        matches!(self.kind, VNodeKind::Element { .. } | VNodeKind::Component { .. })
    }

    pub fn children(&self) -> Option<&[VNode<O>]> {
        match &self.kind {
            VNodeKind::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn elm(&self) -> Option<O::Node> {
        self.elm.borrow().clone()
    }

    pub fn set_elm(&self, node: Option<O::Node>) {
        *self.elm.borrow_mut() = node;
    }
}

/// Two VNodes match iff keys are equal, tag/comment-ness agree, both (or neither) carry "data",
/// and — for `<input>`-equivalent elements — the `type` attribute also agrees.
pub fn same_vnode<O: NodeOps>(a: &VNode<O>, b: &VNode<O>) -> bool {
    if a.key != b.key {
        return false;
    }
    if a.is_comment() != b.is_comment() {
        return false;
    }
    if a.has_data() != b.has_data() {
        return false;
    }
    match (&a.kind, &b.kind) {
        (VNodeKind::Element { tag: ta, .. }, VNodeKind::Element { tag: tb, .. }) => {
            if ta != tb {
                return false;
            }
            if ta.eq_ignore_ascii_case("input") && a.input_type != b.input_type {
                return false;
            }
            true
        }
        (VNodeKind::Component { def: da, .. }, VNodeKind::Component { def: db, .. }) => Rc::ptr_eq(da, db),
        (VNodeKind::Text(_), VNodeKind::Text(_)) => true,
        (VNodeKind::Comment(_), VNodeKind::Comment(_)) => true,
        _ => false,
    }
}
