//! A watcher whose getter branches on a flag and reads only one of two properties must stop
//! tracking whichever property it no longer reads — the classic "conditional dependency" case for
//! a dependency-tracking reactivity graph. Exercises `Watcher`/`Dep` directly, no component layer.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use vibrant_core::value::shallow_record;
use vibrant_core::value::Value;
use vibrant_core::watcher::{Watcher, WatcherFlags};

#[test]
fn drops_stale_dependencies_and_picks_up_new_ones_after_a_branch_flips() {
    let state = shallow_record(vec![
        (Rc::from("flag"), Value::Bool(true)),
        (Rc::from("a"), Value::Number(1.0)),
        (Rc::from("b"), Value::Number(2.0)),
    ]);

    let calls = Rc::new(Cell::new(0u32));
    let calls_for_getter = calls.clone();
    let state_for_getter = state.clone();
    let getter: Rc<dyn Fn() -> Value> = Rc::new(move || {
        calls_for_getter.set(calls_for_getter.get() + 1);
        match &state_for_getter {
            Value::Record(r) => {
                let r = r.borrow();
                if r.get("flag").as_bool().unwrap_or(false) {
                    r.get("a")
                } else {
                    r.get("b")
                }
            }
            _ => Value::Null,
        }
    });

    let watcher = Watcher::new_fn(
        getter,
        WatcherFlags { sync: true, ..Default::default() },
        None,
        None,
        Weak::new(),
    );
    watcher.get();
    assert_eq!(calls.get(), 1);

    let set = |key: &str, value: Value| {
        if let Value::Record(r) = &state {
            r.borrow_mut().set(key, value);
        }
    };

    // `b` is not currently depended on (flag is true, getter reads `a`) — touching it must not
    // trigger a re-run.
    set("b", Value::Number(20.0));
    assert_eq!(calls.get(), 1, "mutating the untaken branch's property must not re-run the watcher");

    // `a` is depended on — touching it reruns the watcher.
    set("a", Value::Number(10.0));
    assert_eq!(calls.get(), 2);

    // Flip the branch: the watcher now reads `b` instead of `a`.
    set("flag", false);
    assert_eq!(calls.get(), 3);

    // `a` is no longer depended on; mutating it must be a no-op for this watcher.
    set("a", Value::Number(99.0));
    assert_eq!(calls.get(), 3, "dependency on the now-untaken branch must have been dropped");

    // `b` is the live dependency now.
    set("b", Value::Number(30.0));
    assert_eq!(calls.get(), 4);
}
