//! An in-memory host tree used by the integration tests to stand in for a real DOM/terminal/GUI
//! backend. Records every call in `log` so tests can assert both the resulting tree shape and the
//! exact sequence of host operations the patcher issued.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use vibrant_core::prelude::NodeOps;

pub enum NodeKind {
    Element(String),
    Text,
    Comment,
}

pub struct NodeData {
    pub kind: NodeKind,
    pub text: String,
    pub parent: Option<NodeHandle>,
    pub children: Vec<NodeHandle>,
}

#[derive(Clone)]
pub struct NodeHandle(pub Rc<RefCell<NodeData>>);

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl NodeHandle {
    fn new(kind: NodeKind, text: String) -> Self {
        NodeHandle(Rc::new(RefCell::new(NodeData {
            kind,
            text,
            parent: None,
            children: Vec::new(),
        })))
    }

    pub fn tag(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn text(&self) -> String {
        self.0.borrow().text.clone()
    }

    pub fn children(&self) -> Vec<NodeHandle> {
        self.0.borrow().children.clone()
    }

    /// Flattened text content of the subtree, the way a browser's `textContent` getter works.
    pub fn text_content(&self) -> String {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text => data.text.clone(),
            NodeKind::Comment => String::new(),
            NodeKind::Element(_) => data.children.iter().map(|c| c.text_content()).collect(),
        }
    }
}

#[derive(Default)]
pub struct RecordingOps {
    pub log: RefCell<Vec<String>>,
}

impl RecordingOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle::new(NodeKind::Element("root".to_string()), String::new())
    }
}

impl NodeOps for RecordingOps {
    type Node = NodeHandle;

    fn create_element(&self, tag: &str) -> NodeHandle {
        self.log.borrow_mut().push(format!("create_element({tag})"));
        NodeHandle::new(NodeKind::Element(tag.to_string()), String::new())
    }

    fn create_element_ns(&self, tag: &str, namespace: &str) -> NodeHandle {
        self.log.borrow_mut().push(format!("create_element_ns({tag}, {namespace})"));
        NodeHandle::new(NodeKind::Element(tag.to_string()), String::new())
    }

    fn create_text(&self, text: &str) -> NodeHandle {
        self.log.borrow_mut().push(format!("create_text({text:?})"));
        NodeHandle::new(NodeKind::Text, text.to_string())
    }

    fn create_comment(&self, text: &str) -> NodeHandle {
        self.log.borrow_mut().push(format!("create_comment({text:?})"));
        NodeHandle::new(NodeKind::Comment, text.to_string())
    }

    fn insert_before(&self, parent: &NodeHandle, node: &NodeHandle, reference: Option<&NodeHandle>) {
        self.log.borrow_mut().push(format!(
            "insert_before(parent={:?}, reference={:?})",
            parent.tag(),
            reference.and_then(|r| r.tag())
        ));
        {
            let mut parent_data = parent.0.borrow_mut();
            parent_data.children.retain(|c| c != node);
            let pos = match reference {
                Some(r) => parent_data.children.iter().position(|c| c == r).unwrap_or(parent_data.children.len()),
                None => parent_data.children.len(),
            };
            parent_data.children.insert(pos, node.clone());
        }
        node.0.borrow_mut().parent = Some(parent.clone());
    }

    fn remove_child(&self, parent: &NodeHandle, node: &NodeHandle) {
        self.log.borrow_mut().push(format!("remove_child(parent={:?})", parent.tag()));
        parent.0.borrow_mut().children.retain(|c| c != node);
        node.0.borrow_mut().parent = None;
    }

    fn parent_node(&self, node: &NodeHandle) -> Option<NodeHandle> {
        node.0.borrow().parent.clone()
    }

    fn next_sibling(&self, node: &NodeHandle) -> Option<NodeHandle> {
        let parent = node.0.borrow().parent.clone()?;
        let children = parent.0.borrow().children.clone();
        let idx = children.iter().position(|c| c == node)?;
        children.get(idx + 1).cloned()
    }

    fn tag_name(&self, node: &NodeHandle) -> Option<String> {
        node.tag()
    }

    fn set_text_content(&self, node: &NodeHandle, text: &str) {
        self.log.borrow_mut().push(format!("set_text_content({text:?})"));
        node.0.borrow_mut().text = text.to_string();
    }

    fn set_style_scope(&self, _node: &NodeHandle, scope_id: &str) {
        self.log.borrow_mut().push(format!("set_style_scope({scope_id:?})"));
    }
}
