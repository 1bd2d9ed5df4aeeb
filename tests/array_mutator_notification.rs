//! Every `ObservedList` mutator (`push`/`pop`/`shift`/`unshift`/`splice`/`sort_by`/`reverse`)
//! notifies dependents, the way Vue's wrapped array methods do — plain index assignment is the one
//! mutation this layer deliberately never observes (see `ObservedList::set` instead).

use std::cell::Cell;
use std::rc::{Rc, Weak};

use vibrant_core::value::{observe, PlainValue, Value};
use vibrant_core::watcher::{Watcher, WatcherFlags};

fn watch_list_len(list: &Value) -> (Rc<Watcher>, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0u32));
    let calls_for_getter = calls.clone();
    let list_for_getter = list.clone();
    let getter: Rc<dyn Fn() -> Value> = Rc::new(move || {
        calls_for_getter.set(calls_for_getter.get() + 1);
        match &list_for_getter {
            Value::List(l) => Value::Number(l.borrow().to_vec().len() as f64),
            _ => Value::Null,
        }
    });
    let watcher = Watcher::new_fn(getter, WatcherFlags { sync: true, ..Default::default() }, None, None, Weak::new());
    watcher.get();
    (watcher, calls)
}

#[test]
fn push_and_pop_notify() {
    let list = observe(PlainValue::List(vec![PlainValue::from(1.0), PlainValue::from(2.0)]));
    let (_watcher, calls) = watch_list_len(&list);
    assert_eq!(calls.get(), 1);

    if let Value::List(l) = &list {
        l.borrow_mut().push(Value::Number(3.0));
    }
    assert_eq!(calls.get(), 2);

    if let Value::List(l) = &list {
        l.borrow_mut().pop();
    }
    assert_eq!(calls.get(), 3);
}

#[test]
fn shift_unshift_and_splice_notify() {
    let list = observe(PlainValue::List(vec![PlainValue::from(1.0), PlainValue::from(2.0)]));
    let (_watcher, calls) = watch_list_len(&list);
    assert_eq!(calls.get(), 1);

    if let Value::List(l) = &list {
        l.borrow_mut().unshift(Value::Number(0.0));
    }
    assert_eq!(calls.get(), 2);

    if let Value::List(l) = &list {
        l.borrow_mut().shift();
    }
    assert_eq!(calls.get(), 3);

    if let Value::List(l) = &list {
        l.borrow_mut().splice(0, 1, vec![Value::Number(9.0), Value::Number(10.0)]);
    }
    assert_eq!(calls.get(), 4);
}

#[test]
fn sort_and_reverse_notify_even_though_length_is_unchanged() {
    let list = observe(PlainValue::List(vec![PlainValue::from(3.0), PlainValue::from(1.0), PlainValue::from(2.0)]));
    let (_watcher, calls) = watch_list_len(&list);
    assert_eq!(calls.get(), 1);

    if let Value::List(l) = &list {
        l.borrow_mut().sort_by(|a, b| a.as_number().partial_cmp(&b.as_number()).unwrap());
    }
    assert_eq!(calls.get(), 2, "sort_by must notify even though it doesn't change the element count");

    if let Value::List(l) = &list {
        l.borrow_mut().reverse();
    }
    assert_eq!(calls.get(), 3);
}

#[test]
fn index_set_notifies_only_on_actual_change() {
    let list = observe(PlainValue::List(vec![PlainValue::from(1.0), PlainValue::from(2.0)]));
    let (_watcher, calls) = watch_list_len(&list);
    assert_eq!(calls.get(), 1);

    if let Value::List(l) = &list {
        l.borrow_mut().set(0, Value::Number(1.0));
    }
    assert_eq!(calls.get(), 1, "writing an equal value must not notify");

    if let Value::List(l) = &list {
        l.borrow_mut().set(0, Value::Number(42.0));
    }
    assert_eq!(calls.get(), 2);
}
