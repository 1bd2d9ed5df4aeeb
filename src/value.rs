//! The dynamic, observed value tree.
//!
//! JS frameworks rewrite a plain object's own properties into accessor pairs at observation
//! time. Rust has no equivalent of runtime-rewritable accessors, so here the reactive value is an
//! explicit enum (`Value`) and reads/writes go through `Property`/`ObservedList` methods instead
//! of transparent field access.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dep::Dep;

/// A plain, *unobserved* value tree as supplied by user code, e.g. the initial `data()` of a
/// component. `Runtime::observable` walks this into a fully reactive [`Value`].
#[derive(Debug, Clone)]
pub enum PlainValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Vec<PlainValue>),
    Record(Vec<(Rc<str>, PlainValue)>),
    /// An already-opaque value (a VNode, a component instance, any host object) that must never
    /// be observed.
    Opaque(Rc<dyn std::any::Any>),
}

impl PlainValue {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        PlainValue::Str(s.into())
    }

    pub fn record(entries: impl IntoIterator<Item = (&'static str, PlainValue)>) -> Self {
        PlainValue::Record(entries.into_iter().map(|(k, v)| (Rc::from(k), v)).collect())
    }
}

impl From<f64> for PlainValue {
    fn from(n: f64) -> Self {
        PlainValue::Number(n)
    }
}

impl From<bool> for PlainValue {
    fn from(b: bool) -> Self {
        PlainValue::Bool(b)
    }
}

impl From<&str> for PlainValue {
    fn from(s: &str) -> Self {
        PlainValue::Str(Rc::from(s))
    }
}

/// The reactive value tree. Lists and records are always observed — there is no "unobserved
/// `Value`" — so `observe(observe(v)) == observe(v)` holds trivially by `Rc` identity.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Rc<RefCell<ObservedList>>),
    Record(Rc<RefCell<ObservedRecord>>),
    Opaque(Rc<dyn std::any::Any>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Record(_))
    }

    /// Renders the value as the text a text-VNode would show. Used by the counter-style examples
    /// and by tests; not part of the reactive contract itself.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Str(s) => s.to_string(),
            Value::List(_) | Value::Record(_) | Value::Opaque(_) => String::new(),
        }
    }
}

/// Value-level equality used by change detection. Containers compare by identity (same Observer):
/// two distinct observed records with equal contents are still a "change" because this crate never
/// deep-compares containers on write — only reference identity for containers, by-value for
/// primitives. NaN is treated as equal to itself.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        (Value::Record(x), Value::Record(y)) => Rc::ptr_eq(x, y),
        (Value::Opaque(x), Value::Opaque(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// A single reactive record slot: a `Dep` plus the value it currently holds.
///
/// `ReadOnly` models the JS edge case of an accessor property with no setter: writes are accepted
/// syntactically but silently dropped.
#[derive(Debug)]
pub enum PropertySlot {
    Plain(Value),
    ReadOnly(Value),
}

#[derive(Debug)]
pub struct Property {
    pub dep: Rc<Dep>,
    slot: PropertySlot,
}

impl Property {
    fn new(value: Value) -> Self {
        Self {
            dep: Dep::new(),
            slot: PropertySlot::Plain(value),
        }
    }

    fn read_only(value: Value) -> Self {
        Self {
            dep: Dep::new(),
            slot: PropertySlot::ReadOnly(value),
        }
    }

    fn value(&self) -> &Value {
        match &self.slot {
            PropertySlot::Plain(v) | PropertySlot::ReadOnly(v) => v,
        }
    }
}

#[derive(Debug)]
pub struct ObservedRecord {
    pub dep: Rc<Dep>,
    props: IndexMap<Rc<str>, Property>,
    frozen: bool,
}

#[derive(Debug)]
pub struct ObservedList {
    pub dep: Rc<Dep>,
    items: Vec<Value>,
}

/// Recursively observes a [`PlainValue`] tree, producing the reactive [`Value`] form.
///
/// Suppressed entirely while [`crate::observer::deep_observation_suppressed`] returns `true` — in
/// that mode containers are wrapped with empty contents lazily filled in by the caller instead of
/// recursed into, matching the use case
/// of binding a child component's props without re-deepening an already-owned value.
pub fn observe(plain: PlainValue) -> Value {
    match plain {
        PlainValue::Null => Value::Null,
        PlainValue::Bool(b) => Value::Bool(b),
        PlainValue::Number(n) => Value::Number(n),
        PlainValue::Str(s) => Value::Str(s),
        PlainValue::Opaque(o) => Value::Opaque(o),
        PlainValue::List(items) => {
            let observed = if crate::observer::deep_observation_suppressed() {
                Vec::new()
            } else {
                items.into_iter().map(observe).collect()
            };
            Value::List(Rc::new(RefCell::new(ObservedList {
                dep: Dep::new(),
                items: observed,
            })))
        }
        PlainValue::Record(entries) => {
            let mut props = IndexMap::with_capacity(entries.len());
            for (k, v) in entries {
                let value = if crate::observer::deep_observation_suppressed() {
                    observe_shallow(v)
                } else {
                    observe(v)
                };
                props.insert(k, Property::new(value));
            }
            Value::Record(Rc::new(RefCell::new(ObservedRecord {
                dep: Dep::new(),
                props,
                frozen: false,
            })))
        }
    }
}

fn observe_shallow(plain: PlainValue) -> Value {
    match plain {
        PlainValue::List(_) | PlainValue::Record(_) => {
            // Leave nested containers unobserved-but-wrapped is not representable without an
            // "unobserved" variant; in suppressed mode we still observe one level so the value is
            // usable, but do not recurse further than that single level.
            observe(plain)
        }
        other => observe(other),
    }
}

/// Wraps already-reactive values as the properties of a fresh record without re-observing them —
/// the props case ("props are observed, shallow"). The record itself is reactive (each key gets
/// its own `Dep`); the values passed in are used exactly as given.
pub fn shallow_record(pairs: Vec<(Rc<str>, Value)>) -> Value {
    let mut props = IndexMap::with_capacity(pairs.len());
    for (k, v) in pairs {
        props.insert(k, Property::new(v));
    }
    Value::Record(Rc::new(RefCell::new(ObservedRecord {
        dep: Dep::new(),
        props,
        frozen: false,
    })))
}

pub fn empty_record() -> Value {
    shallow_record(Vec::new())
}

/// Idempotent: re-observing an already-reactive [`Value`] returns the same underlying `Rc`.
/// Containers are always-observed, so this is just a clone.
pub fn reobserve(value: &Value) -> Value {
    value.clone()
}

impl ObservedRecord {
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.props.keys()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    /// Reads a property, subscribing the active watcher (if any) to both the property's own Dep
    /// and, when the value is itself a container, the container's Dep.
    pub fn get(&self, key: &str) -> Value {
        match self.props.get(key) {
            Some(prop) => {
                prop.dep.depend();
                let value = prop.value().clone();
                if let Value::List(list) = &value {
                    list.borrow().dep.depend();
                }
                if let Value::Record(rec) = &value {
                    rec.borrow().dep.depend();
                }
                value
            }
            None => {
                self.dep.depend();
                Value::Null
            }
        }
    }

    /// `set(record, key, value)`. Existing keys are assigned in place; new keys are defined and
    /// notify the container-level Dep.
    pub fn set(&mut self, key: &str, value: Value) {
        if self.frozen {
            tracing::warn!(key, "write to a frozen record ignored");
            return;
        }
        if let Some(prop) = self.props.get_mut(key) {
            match &prop.slot {
                PropertySlot::ReadOnly(_) => {
                    tracing::warn!(key, "write to a read-only property dropped");
                }
                PropertySlot::Plain(old) => {
                    if values_equal(old, &value) {
                        return;
                    }
                    prop.slot = PropertySlot::Plain(value);
                    prop.dep.notify();
                }
            }
        } else {
            let key: Rc<str> = Rc::from(key);
            self.props.insert(key, Property::new(value));
            self.dep.notify();
        }
    }

    pub fn define_read_only(&mut self, key: &str, value: Value) {
        self.props.insert(Rc::from(key), Property::read_only(value));
    }

    /// `del(record, key)`.
    pub fn del(&mut self, key: &str) {
        if self.frozen {
            tracing::warn!(key, "delete on a frozen record ignored");
            return;
        }
        if self.props.shift_remove(key).is_some() {
            self.dep.notify();
        }
    }
}

impl ObservedList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index reads subscribe like property reads; index *writes* are intentionally not exposed
    /// here — plain element assignment by index is not intercepted. Use `set` for an index write
    /// that must notify.
    pub fn get(&self, index: usize) -> Value {
        self.dep.depend();
        self.items.get(index).cloned().unwrap_or(Value::Null)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.dep.depend();
        self.items.clone()
    }

    /// The external `set(list, index, value)` entry point: splices at a valid index and notifies.
    pub fn set(&mut self, index: usize, value: Value) {
        if index < self.items.len() {
            if values_equal(&self.items[index], &value) {
                return;
            }
            self.items[index] = value;
            self.dep.notify();
        } else {
            tracing::warn!(index, len = self.items.len(), "set() index out of bounds");
        }
    }

    pub fn del(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
            self.dep.notify();
        }
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
        self.dep.notify();
    }

    pub fn pop(&mut self) -> Option<Value> {
        let v = self.items.pop();
        if v.is_some() {
            self.dep.notify();
        }
        v
    }

    pub fn shift(&mut self) -> Option<Value> {
        if self.items.is_empty() {
            None
        } else {
            let v = self.items.remove(0);
            self.dep.notify();
            Some(v)
        }
    }

    pub fn unshift(&mut self, value: Value) {
        self.items.insert(0, value);
        self.dep.notify();
    }

    pub fn splice(&mut self, start: usize, delete_count: usize, inserted: Vec<Value>) -> Vec<Value> {
        let start = start.min(self.items.len());
        let end = (start + delete_count).min(self.items.len());
        let removed: Vec<Value> = self.items.splice(start..end, inserted).collect();
        self.dep.notify();
        removed
    }

    pub fn sort_by(&mut self, mut cmp: impl FnMut(&Value, &Value) -> std::cmp::Ordering) {
        self.items.sort_by(|a, b| cmp(a, b));
        self.dep.notify();
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
        self.dep.notify();
    }
}

/// Touches every reachable property of `value` once, deeply, subscribing the currently active
/// watcher along the way. Used by `Watcher::get` when `deep: true`. `seen` holds the Observer
/// identities already visited this walk, short-circuiting cycles.
pub fn walk_deep(value: &Value, seen: &mut fxhash::FxHashSet<usize>) {
    match value {
        Value::Record(rec) => {
            let ptr = Rc::as_ptr(rec) as usize;
            if !seen.insert(ptr) {
                return;
            }
            let rec = rec.borrow();
            rec.dep.depend();
            let keys: Vec<Rc<str>> = rec.keys().cloned().collect();
            for k in keys {
                let v = rec.get(&k);
                walk_deep(&v, seen);
            }
        }
        Value::List(list) => {
            let ptr = Rc::as_ptr(list) as usize;
            if !seen.insert(ptr) {
                return;
            }
            let list = list.borrow();
            list.dep.depend();
            for v in list.to_vec() {
                walk_deep(&v, seen);
            }
        }
        _ => {}
    }
}

