//! Drives the patcher directly (no component, no runtime) over two keyed `<li>` lists and checks
//! that reordering moves existing host nodes instead of recreating them, while additions/removals
//! still create/remove exactly the nodes that changed.

mod support;

use support::RecordingOps;
use vibrant_core::prelude::*;

fn item(key: &str) -> VNode<RecordingOps> {
    VNode::element("li", VData::default(), vec![VNode::text(key)]).with_key(Key::from(key))
}

fn elm_by_key(vnode: &VNode<RecordingOps>, key: &str) -> support::NodeHandle {
    vnode
        .children()
        .unwrap()
        .iter()
        .find(|c| c.key == Some(Key::from(key)))
        .and_then(|c| c.elm())
        .unwrap_or_else(|| panic!("no child keyed {key:?}"))
}

#[test]
fn reorders_without_recreating_surviving_nodes() {
    let ops = RecordingOps::new();
    let root = ops.root();
    let patcher = Patcher::new(ops, Vec::new());

    let old_list = VNode::element("ul", VData::default(), vec![item("a"), item("b"), item("c")]);
    let mounted = patcher.patch(None, old_list, &root, None).unwrap();

    let a_before = elm_by_key(&mounted, "a");
    let c_before = elm_by_key(&mounted, "c");

    let new_list = VNode::element("ul", VData::default(), vec![item("c"), item("a"), item("d")]);
    let patched = patcher.patch(Some(mounted), new_list, &root, None).unwrap();

    let a_after = elm_by_key(&patched, "a");
    let c_after = elm_by_key(&patched, "c");

    assert_eq!(a_before, a_after, "surviving keyed node 'a' must not be recreated");
    assert_eq!(c_before, c_after, "surviving keyed node 'c' must not be recreated");

    let ul = patched.elm().unwrap();
    let child_texts: Vec<String> = ul.children().iter().map(|c| c.text_content()).collect();
    assert_eq!(child_texts, vec!["c", "a", "d"]);
}

#[test]
fn same_key_but_different_kind_replaces_instead_of_panicking() {
    // A `v-if` branch toggling under a shared key is the classic case: the old and new child
    // agree on key "shared" but are different VNode kinds (an element vs. a text node), so
    // `same_vnode` says no even though the key→index fallback finds a match. This must replace
    // the node, not hand it to `patch_vnode`, which only knows how to patch matching kinds.
    let ops = RecordingOps::new();
    let root = ops.root();
    let patcher = Patcher::new(ops, Vec::new());

    let shared_div = VNode::element("div", VData::default(), vec![VNode::text("old-shared")]).with_key(Key::from("shared"));
    let old_list = VNode::element(
        "ul",
        VData::default(),
        vec![item("a"), shared_div, item("c")],
    );
    let mounted = patcher.patch(None, old_list, &root, None).unwrap();

    let shared_text = VNode::text("new-shared").with_key(Key::from("shared"));
    let new_list = VNode::element(
        "ul",
        VData::default(),
        vec![item("c"), item("d"), shared_text],
    );
    let patched = patcher.patch(Some(mounted), new_list, &root, None).unwrap();

    let ul = patched.elm().unwrap();
    let child_texts: Vec<String> = ul.children().iter().map(|c| c.text_content()).collect();
    assert_eq!(child_texts, vec!["c", "d", "new-shared"]);
}

#[test]
fn patch_out_removes_dropped_keys_from_the_host_tree() {
    let ops = RecordingOps::new();
    let root = ops.root();
    let patcher = Patcher::new(ops, Vec::new());

    let old_list = VNode::element("ul", VData::default(), vec![item("a"), item("b")]);
    let mounted = patcher.patch(None, old_list, &root, None).unwrap();
    let b_elm = elm_by_key(&mounted, "b");

    let new_list = VNode::element("ul", VData::default(), vec![item("a")]);
    let patched = patcher.patch(Some(mounted), new_list, &root, None).unwrap();

    let ul = patched.elm().unwrap();
    assert_eq!(ul.children().len(), 1);
    assert!(b_elm.text_content() == "b", "removed node's own content is untouched, just detached");
    assert!(ul.children().iter().all(|c| *c != b_elm));
}
