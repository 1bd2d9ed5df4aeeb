//! The host-tree abstraction. An integrator implements `NodeOps<Node = H>` once for its target
//! (a browser DOM, a terminal cell grid, a retained GUI tree...) and the patcher drives it through
//! nothing but this trait, keeping the core renderer-agnostic.

/// Host node handle requirements. Kept minimal: the patcher only ever clones and compares handles,
/// never inspects them.
pub trait NodeOps {
    type Node: Clone + PartialEq;

    fn create_element(&self, tag: &str) -> Self::Node;
    fn create_element_ns(&self, tag: &str, namespace: &str) -> Self::Node;
    fn create_text(&self, text: &str) -> Self::Node;
    fn create_comment(&self, text: &str) -> Self::Node;

    fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);
    fn append_child(&self, parent: &Self::Node, node: &Self::Node) {
        self.insert_before(parent, node, None);
    }
    fn remove_child(&self, parent: &Self::Node, node: &Self::Node);

    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn set_text_content(&self, node: &Self::Node, text: &str);
    fn set_style_scope(&self, node: &Self::Node, scope_id: &str);
}
