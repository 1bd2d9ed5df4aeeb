//! End-to-end: mount a component, call a method that mutates `data`, and confirm the render
//! watcher reruns and the host tree reflects the new value — all synchronously, since the default
//! `RuntimeConfig` pairs `ImmediateTrigger` with `sync_mode: false`, and `ImmediateTrigger` still
//! runs the flush inline.

mod support;

use std::rc::Rc;

use support::RecordingOps;
use vibrant_core::prelude::*;

fn counter_def(hooks: HookTable<RecordingOps>) -> Rc<ComponentDef<RecordingOps>> {
    Rc::new(ComponentDef {
        data: Some(Rc::new(|| PlainValue::record([("count", PlainValue::from(0.0))]))),
        computed: vec![],
        methods: vec![(
            Rc::from("increment"),
            Rc::new(|inst: &Rc<ComponentInstance<RecordingOps>>, _args: &[Value]| {
                let current = inst.data_get("count").as_number().unwrap_or(0.0);
                inst.data_set("count", Value::Number(current + 1.0));
                Value::Null
            }) as MethodFn<RecordingOps>,
        )],
        watch: vec![],
        render: Rc::new(|inst: &Rc<ComponentInstance<RecordingOps>>| {
            let count = inst.data_get("count");
            VNode::element("div", VData::default(), vec![VNode::text(count.to_display_string())])
        }),
        provide: None,
        inject: vec![],
        hooks,
    })
}

#[test]
fn rerenders_host_tree_after_method_mutates_data() {
    let ops = RecordingOps::new();
    let root = ops.root();
    let runtime = Runtime::new(ops, vec![], RuntimeConfig::default());
    let instance = runtime.mount_root(counter_def(HookTable::default()), vec![], root.clone());

    assert_eq!(root.text_content(), "0");

    instance.call_method("increment", &[]);
    assert_eq!(root.text_content(), "1");

    instance.call_method("increment", &[]);
    instance.call_method("increment", &[]);
    assert_eq!(root.text_content(), "3");
}

#[test]
fn mounted_hook_fires_once_and_updated_hook_fires_on_rerender() {
    let mounted_calls = Rc::new(std::cell::Cell::new(0u32));
    let updated_calls = Rc::new(std::cell::Cell::new(0u32));
    let mounted_for_hook = mounted_calls.clone();
    let updated_for_hook = updated_calls.clone();

    let hooks = HookTable {
        mounted: Some(Rc::new(move |_inst| mounted_for_hook.set(mounted_for_hook.get() + 1))),
        updated: Some(Rc::new(move |_inst| updated_for_hook.set(updated_for_hook.get() + 1))),
        ..HookTable::default()
    };

    let ops = RecordingOps::new();
    let root = ops.root();
    let runtime = Runtime::new(ops, vec![], RuntimeConfig::default());
    let instance = runtime.mount_root(counter_def(hooks), vec![], root);

    assert_eq!(mounted_calls.get(), 1);
    assert_eq!(updated_calls.get(), 0);

    instance.call_method("increment", &[]);
    assert_eq!(mounted_calls.get(), 1);
    assert_eq!(updated_calls.get(), 1);
}
