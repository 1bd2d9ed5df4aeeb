//! Computed properties: cached between reads, recomputed only once a dependency actually changes.

mod support;

use std::cell::Cell;
use std::rc::Rc;

use support::RecordingOps;
use vibrant_core::prelude::*;

fn doubled_def(calls: Rc<Cell<u32>>) -> Rc<ComponentDef<RecordingOps>> {
    Rc::new(ComponentDef {
        data: Some(Rc::new(|| PlainValue::record([("a", PlainValue::from(1.0))]))),
        computed: vec![(
            Rc::from("doubled"),
            Rc::new(move |inst: &Rc<ComponentInstance<RecordingOps>>| {
                calls.set(calls.get() + 1);
                let a = inst.data_get("a").as_number().unwrap_or(0.0);
                Value::Number(a * 2.0)
            }) as ComputedFn<RecordingOps>,
        )],
        methods: vec![],
        watch: vec![],
        render: Rc::new(|_inst| VNode::comment("")),
        provide: None,
        inject: vec![],
        hooks: HookTable::default(),
    })
}

#[test]
fn recomputes_after_dependency_changes() {
    let ops = RecordingOps::new();
    let root = ops.root();
    let runtime = Runtime::new(ops, vec![], RuntimeConfig::default());
    let instance = runtime.mount_root(doubled_def(Rc::new(Cell::new(0))), vec![], root);

    assert_eq!(instance.computed("doubled").as_number(), Some(2.0));
    instance.data_set("a", Value::Number(5.0));
    assert_eq!(instance.computed("doubled").as_number(), Some(10.0));
}

#[test]
fn caches_between_reads_with_no_dependency_change() {
    let calls = Rc::new(Cell::new(0u32));
    let ops = RecordingOps::new();
    let root = ops.root();
    let runtime = Runtime::new(ops, vec![], RuntimeConfig::default());
    let instance = runtime.mount_root(doubled_def(calls.clone()), vec![], root);

    instance.computed("doubled");
    instance.computed("doubled");
    instance.computed("doubled");
    assert_eq!(calls.get(), 1, "repeated reads with nothing dirtied must not re-run the getter");

    instance.data_set("a", Value::Number(2.0));
    instance.computed("doubled");
    instance.computed("doubled");
    assert_eq!(calls.get(), 2, "one dependency change triggers exactly one re-run, not per-read");
}
