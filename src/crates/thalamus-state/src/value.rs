//! The observable state tree.
//!
//! A tree of [`ObservableMap`] and [`ObservableList`] collections holding
//! [`Value`] leaves. Every mutation fires the owning collection's local
//! `changed` signal and then bubbles a `recursive_changed` notification up
//! the parent chain to the root, carrying a handle to the collection the
//! mutation originated in.
//!
//! Collections are shared by reference: assigning a map or list into two
//! places aliases the same underlying collection. Children keep a weak
//! back-pointer to their parent, which is how addresses are computed and
//! how recursive notifications bubble.
//!
//! A collection may carry a *remote-storage hook*. While the hook is
//! installed, plain writes are handed to the hook instead of being applied;
//! the mirror applies them through a back channel with `from_remote = true`
//! (which bypasses the hook) and eventually invokes the write's done
//! callback.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::signal::Signal;

/// Whether a mutation set or removed an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Set,
    Delete,
}

/// Collection keys: list indices arrive as `Int`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Bool(bool),
    String(String),
}

impl Key {
    /// The bracketed address segment for this key, e.g. `['Running']` or
    /// `[3]`.
    pub fn address_segment(&self) -> String {
        match self {
            Key::Int(i) => format!("[{}]", i),
            Key::Bool(b) => format!("[{}]", b),
            Key::String(s) => format!("['{}']", s),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Bool(b) => write!(f, "{}", b),
            Key::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

/// A tree value: a primitive or a shared collection handle.
#[derive(Clone)]
pub enum Value {
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Map(ObservableMapHandle),
    List(ObservableListHandle),
}

pub type ObservableMapHandle = Rc<ObservableMap>;
pub type ObservableListHandle = Rc<ObservableList>;

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric coercion: ints widen, numeric strings parse. Some device
    /// front-ends write thresholds and gains as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ObservableMapHandle> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableListHandle> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<Collection> {
        match self {
            Value::Map(m) => Some(Collection::Map(Rc::clone(m))),
            Value::List(l) => Some(Collection::List(Rc::clone(l))),
            _ => None,
        }
    }

    /// Builds a detached tree fragment from JSON.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                let list = ObservableList::new();
                for item in items {
                    let child = Value::from_json(item);
                    list.push(child);
                }
                Value::List(list)
            }
            serde_json::Value::Object(entries) => {
                let map = ObservableMap::new();
                for (key, item) in entries {
                    let child = Value::from_json(item);
                    map.assign(Key::String(key.clone()), child);
                }
                Value::Map(map)
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::None => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::String(s) => serde_json::Value::from(s.clone()),
            Value::Map(m) => m.to_json(),
            Value::List(l) => l.to_json(),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality, ignoring collection identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                let left = a.entries();
                let right = b.entries();
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
            }
            (Value::List(a), Value::List(b)) => {
                let left = a.values();
                let right = b.values();
                left.len() == right.len()
                    && left.iter().zip(right.iter()).all(|(va, vb)| va == vb)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ObservableMapHandle> for Value {
    fn from(v: ObservableMapHandle) -> Self {
        Value::Map(v)
    }
}

impl From<ObservableListHandle> for Value {
    fn from(v: ObservableListHandle) -> Self {
        Value::List(v)
    }
}

/// Local change notification: fired on the collection the mutation applied
/// to. For `Delete` the value is the removed entry.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub action: Action,
    pub key: Key,
    pub value: Value,
}

/// Recursive change notification: re-fired at every ancestor, carrying the
/// collection the mutation originated in.
#[derive(Clone, Debug)]
pub struct RecursiveChangeEvent {
    pub origin: Collection,
    pub action: Action,
    pub key: Key,
    pub value: Value,
}

/// A map-or-list handle.
#[derive(Clone)]
pub enum Collection {
    Map(ObservableMapHandle),
    List(ObservableListHandle),
}

impl Collection {
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        match (self, other) {
            (Collection::Map(a), Collection::Map(b)) => Rc::ptr_eq(a, b),
            (Collection::List(a), Collection::List(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_map(&self, map: &ObservableMapHandle) -> bool {
        matches!(self, Collection::Map(m) if Rc::ptr_eq(m, map))
    }

    pub fn is_list(&self, list: &ObservableListHandle) -> bool {
        matches!(self, Collection::List(l) if Rc::ptr_eq(l, list))
    }

    pub fn as_map(&self) -> Option<&ObservableMapHandle> {
        match self {
            Collection::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableListHandle> {
        match self {
            Collection::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn address(&self) -> String {
        match self {
            Collection::Map(m) => m.address(),
            Collection::List(l) => l.address(),
        }
    }

    pub fn parent(&self) -> Option<Collection> {
        match self {
            Collection::Map(m) => m.parent(),
            Collection::List(l) => l.parent(),
        }
    }

    fn key_of_value(&self, value: &Value) -> Option<Key> {
        match self {
            Collection::Map(m) => m.key_of(value),
            Collection::List(l) => l.key_of(value),
        }
    }

    fn notify(&self, event: &RecursiveChangeEvent) {
        match self {
            Collection::Map(m) => m.notify(event),
            Collection::List(l) => l.notify(event),
        }
    }

    fn set_remote_storage_inner(&self, hook: Option<RemoteStorageHook>) {
        match self {
            Collection::Map(m) => m.set_remote_storage(hook),
            Collection::List(l) => l.set_remote_storage(hook),
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collection({})", self.address())
    }
}

/// Completion callback for a deferred (mirrored) write.
pub type DoneCallback = Box<dyn FnOnce()>;

/// Remote-storage hook. Returning `None` means the hook took the write and
/// will invoke the callback once the mirror acknowledges it; returning the
/// callback back declines the write, which is then applied locally.
pub type RemoteStorageHook =
    Rc<dyn Fn(Action, &str, Value, DoneCallback) -> Option<DoneCallback>>;

enum ParentLink {
    Map(Weak<ObservableMap>),
    List(Weak<ObservableList>),
}

impl ParentLink {
    fn upgrade(&self) -> Option<Collection> {
        match self {
            ParentLink::Map(w) => w.upgrade().map(Collection::Map),
            ParentLink::List(w) => w.upgrade().map(Collection::List),
        }
    }
}

/// Shared bookkeeping for both collection kinds.
struct CollectionCore {
    parent: RefCell<Option<ParentLink>>,
    remote_storage: RefCell<Option<RemoteStorageHook>>,
}

impl CollectionCore {
    fn new() -> Self {
        Self {
            parent: RefCell::new(None),
            remote_storage: RefCell::new(None),
        }
    }
}

/// An observable string/int/bool-keyed mapping.
pub struct ObservableMap {
    content: RefCell<BTreeMap<Key, Value>>,
    pub changed: Signal<ChangeEvent>,
    pub recursive_changed: Signal<RecursiveChangeEvent>,
    core: CollectionCore,
    weak_self: RefCell<Weak<ObservableMap>>,
}

impl ObservableMap {
    pub fn new() -> ObservableMapHandle {
        let map = Rc::new(ObservableMap {
            content: RefCell::new(BTreeMap::new()),
            changed: Signal::new(),
            recursive_changed: Signal::new(),
            core: CollectionCore::new(),
            weak_self: RefCell::new(Weak::new()),
        });
        *map.weak_self.borrow_mut() = Rc::downgrade(&map);
        map
    }

    pub fn handle(&self) -> ObservableMapHandle {
        self.weak_self
            .borrow()
            .upgrade()
            .expect("collection accessed outside an Rc")
    }

    fn as_collection(&self) -> Collection {
        Collection::Map(self.handle())
    }

    /// Fetches `key`. A missing key is a contract violation.
    pub fn at(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        self.try_at(key.clone())
            .unwrap_or_else(|| panic!("key {:?} missing from {}", key, self.address()))
    }

    pub fn try_at(&self, key: impl Into<Key>) -> Option<Value> {
        self.content.borrow().get(&key.into()).cloned()
    }

    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.content.borrow().contains_key(&key.into())
    }

    pub fn len(&self) -> usize {
        self.content.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.borrow().is_empty()
    }

    /// Snapshot of the current entries.
    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.content
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // Typed convenience accessors used heavily by node configuration code.

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.try_at(key).and_then(|v| v.as_bool())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.try_at(key).and_then(|v| v.as_f64())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.try_at(key).and_then(|v| v.as_int())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.try_at(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn assign(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.assign_with(key.into(), value.into(), None, false);
    }

    /// Sets `key` to `value`. With a remote-storage hook installed and
    /// `from_remote == false` the write is deferred through the hook;
    /// otherwise it applies immediately, firing the local signal first and
    /// then the recursive chain.
    pub fn assign_with(
        &self,
        key: Key,
        value: Value,
        callback: Option<DoneCallback>,
        from_remote: bool,
    ) {
        if !from_remote {
            let hook = self.core.remote_storage.borrow().clone();
            if let Some(hook) = hook {
                let address = format!("{}{}", self.address(), key.address_segment());
                let done: DoneCallback = callback.unwrap_or_else(|| Box::new(|| {}));
                match hook(Action::Set, &address, value.clone(), done) {
                    None => return,
                    Some(declined) => {
                        self.apply_set(key, value, Some(declined));
                        return;
                    }
                }
            }
        }
        self.apply_set(key, value, callback);
    }

    fn apply_set(&self, key: Key, value: Value, callback: Option<DoneCallback>) {
        let previous = self.content.borrow().get(&key).cloned();
        if let Some(prev) = previous {
            detach(&prev, &self.as_collection());
        }
        let hook = self.core.remote_storage.borrow().clone();
        attach(&value, self.as_collection(), hook);
        self.content.borrow_mut().insert(key.clone(), value.clone());
        if let Some(cb) = callback {
            cb();
        }
        let event = ChangeEvent {
            action: Action::Set,
            key,
            value,
        };
        self.changed.emit(&event);
        self.notify(&RecursiveChangeEvent {
            origin: self.as_collection(),
            action: event.action,
            key: event.key,
            value: event.value,
        });
    }

    pub fn erase(&self, key: impl Into<Key>) {
        self.erase_with(key.into(), None, false);
    }

    /// Removes `key`. Removing a missing key is a no-op (the callback still
    /// runs).
    pub fn erase_with(&self, key: Key, callback: Option<DoneCallback>, from_remote: bool) {
        if !from_remote {
            let hook = self.core.remote_storage.borrow().clone();
            if let Some(hook) = hook {
                let address = format!("{}{}", self.address(), key.address_segment());
                let done: DoneCallback = callback.unwrap_or_else(|| Box::new(|| {}));
                match hook(Action::Delete, &address, Value::None, done) {
                    None => return,
                    Some(declined) => {
                        self.apply_erase(key, Some(declined));
                        return;
                    }
                }
            }
        }
        self.apply_erase(key, callback);
    }

    fn apply_erase(&self, key: Key, callback: Option<DoneCallback>) {
        let removed = self.content.borrow_mut().remove(&key);
        let Some(removed) = removed else {
            if let Some(cb) = callback {
                cb();
            }
            return;
        };
        detach(&removed, &self.as_collection());
        if let Some(cb) = callback {
            cb();
        }
        let event = ChangeEvent {
            action: Action::Delete,
            key,
            value: removed,
        };
        self.changed.emit(&event);
        self.notify(&RecursiveChangeEvent {
            origin: self.as_collection(),
            action: event.action,
            key: event.key,
            value: event.value,
        });
    }

    /// Replays the current contents to `observer` as `Set` events.
    pub fn recap_with(&self, mut observer: impl FnMut(&ChangeEvent)) {
        for (key, value) in self.entries() {
            observer(&ChangeEvent {
                action: Action::Set,
                key,
                value,
            });
        }
    }

    /// Replays the current contents through the `changed` signal, so late
    /// subscribers observe existing entries as fresh sets.
    pub fn recap(&self) {
        for (key, value) in self.entries() {
            self.changed.emit(&ChangeEvent {
                action: Action::Set,
                key,
                value,
            });
        }
    }

    fn notify(&self, event: &RecursiveChangeEvent) {
        self.recursive_changed.emit(event);
        if let Some(parent) = self.parent() {
            parent.notify(event);
        }
    }

    pub fn parent(&self) -> Option<Collection> {
        self.core.parent.borrow().as_ref().and_then(ParentLink::upgrade)
    }

    /// The key under which `value` is stored, compared by collection
    /// identity for maps and lists.
    pub fn key_of(&self, value: &Value) -> Option<Key> {
        self.content
            .borrow()
            .iter()
            .find(|(_, v)| value_ptr_eq(v, value))
            .map(|(k, _)| k.clone())
    }

    pub fn address(&self) -> String {
        match self.parent() {
            Some(parent) => {
                let key = parent
                    .key_of_value(&Value::Map(self.handle()))
                    .map(|k| k.address_segment())
                    .unwrap_or_default();
                format!("{}{}", parent.address(), key)
            }
            None => "$".to_string(),
        }
    }

    /// Installs (or clears) the remote-storage hook on this collection and
    /// every collection beneath it.
    pub fn set_remote_storage(&self, hook: Option<RemoteStorageHook>) {
        *self.core.remote_storage.borrow_mut() = hook.clone();
        for (_, value) in self.entries() {
            if let Some(child) = value.as_collection() {
                child.set_remote_storage_inner(hook.clone());
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (key, value) in self.entries() {
            object.insert(key.to_string(), value.to_json());
        }
        serde_json::Value::Object(object)
    }
}

/// An observable ordered sequence.
pub struct ObservableList {
    content: RefCell<Vec<Value>>,
    pub changed: Signal<ChangeEvent>,
    pub recursive_changed: Signal<RecursiveChangeEvent>,
    core: CollectionCore,
    weak_self: RefCell<Weak<ObservableList>>,
}

impl ObservableList {
    pub fn new() -> ObservableListHandle {
        let list = Rc::new(ObservableList {
            content: RefCell::new(Vec::new()),
            changed: Signal::new(),
            recursive_changed: Signal::new(),
            core: CollectionCore::new(),
            weak_self: RefCell::new(Weak::new()),
        });
        *list.weak_self.borrow_mut() = Rc::downgrade(&list);
        list
    }

    pub fn handle(&self) -> ObservableListHandle {
        self.weak_self
            .borrow()
            .upgrade()
            .expect("collection accessed outside an Rc")
    }

    fn as_collection(&self) -> Collection {
        Collection::List(self.handle())
    }

    /// Fetches index `i`. Out of range is a contract violation.
    pub fn at(&self, i: usize) -> Value {
        self.try_at(i)
            .unwrap_or_else(|| panic!("index {} out of range in {}", i, self.address()))
    }

    pub fn try_at(&self, i: usize) -> Option<Value> {
        self.content.borrow().get(i).cloned()
    }

    pub fn len(&self) -> usize {
        self.content.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.borrow().is_empty()
    }

    pub fn values(&self) -> Vec<Value> {
        self.content.borrow().clone()
    }

    pub fn push(&self, value: impl Into<Value>) {
        let index = self.len();
        self.set_with(index, value.into(), None, false);
    }

    pub fn push_with(&self, value: Value, callback: Option<DoneCallback>, from_remote: bool) {
        let index = self.len();
        self.set_with(index, value, callback, from_remote);
    }

    pub fn set(&self, index: usize, value: impl Into<Value>) {
        self.set_with(index, value.into(), None, false);
    }

    /// Sets index `index`, extending the sequence with `None` padding when
    /// writing past the end.
    pub fn set_with(
        &self,
        index: usize,
        value: Value,
        callback: Option<DoneCallback>,
        from_remote: bool,
    ) {
        if !from_remote {
            let hook = self.core.remote_storage.borrow().clone();
            if let Some(hook) = hook {
                let address = format!("{}[{}]", self.address(), index);
                let done: DoneCallback = callback.unwrap_or_else(|| Box::new(|| {}));
                match hook(Action::Set, &address, value.clone(), done) {
                    None => return,
                    Some(declined) => {
                        self.apply_set(index, value, Some(declined));
                        return;
                    }
                }
            }
        }
        self.apply_set(index, value, callback);
    }

    fn apply_set(&self, index: usize, value: Value, callback: Option<DoneCallback>) {
        while self.len() < index {
            let pad_index = self.len();
            self.apply_set(pad_index, Value::None, None);
        }
        let previous = self.try_at(index);
        if let Some(prev) = &previous {
            detach(prev, &self.as_collection());
        }
        let hook = self.core.remote_storage.borrow().clone();
        attach(&value, self.as_collection(), hook);
        {
            let mut content = self.content.borrow_mut();
            if index < content.len() {
                content[index] = value.clone();
            } else {
                content.push(value.clone());
            }
        }
        if let Some(cb) = callback {
            cb();
        }
        let event = ChangeEvent {
            action: Action::Set,
            key: Key::Int(index as i64),
            value,
        };
        self.changed.emit(&event);
        self.notify(&RecursiveChangeEvent {
            origin: self.as_collection(),
            action: event.action,
            key: event.key,
            value: event.value,
        });
    }

    pub fn erase(&self, index: usize) {
        self.erase_with(index, None, false);
    }

    /// Removes index `index`, shifting later entries down. Out-of-range is
    /// a no-op.
    pub fn erase_with(&self, index: usize, callback: Option<DoneCallback>, from_remote: bool) {
        if !from_remote {
            let hook = self.core.remote_storage.borrow().clone();
            if let Some(hook) = hook {
                let address = format!("{}[{}]", self.address(), index);
                let done: DoneCallback = callback.unwrap_or_else(|| Box::new(|| {}));
                match hook(Action::Delete, &address, Value::None, done) {
                    None => return,
                    Some(declined) => {
                        self.apply_erase(index, Some(declined));
                        return;
                    }
                }
            }
        }
        self.apply_erase(index, callback);
    }

    fn apply_erase(&self, index: usize, callback: Option<DoneCallback>) {
        if index >= self.len() {
            if let Some(cb) = callback {
                cb();
            }
            return;
        }
        let removed = self.content.borrow_mut().remove(index);
        detach(&removed, &self.as_collection());
        if let Some(cb) = callback {
            cb();
        }
        let event = ChangeEvent {
            action: Action::Delete,
            key: Key::Int(index as i64),
            value: removed,
        };
        self.changed.emit(&event);
        self.notify(&RecursiveChangeEvent {
            origin: self.as_collection(),
            action: event.action,
            key: event.key,
            value: event.value,
        });
    }

    pub fn pop(&self) {
        if !self.is_empty() {
            self.erase(self.len() - 1);
        }
    }

    pub fn recap_with(&self, mut observer: impl FnMut(&ChangeEvent)) {
        for (index, value) in self.values().into_iter().enumerate() {
            observer(&ChangeEvent {
                action: Action::Set,
                key: Key::Int(index as i64),
                value,
            });
        }
    }

    pub fn recap(&self) {
        for (index, value) in self.values().into_iter().enumerate() {
            self.changed.emit(&ChangeEvent {
                action: Action::Set,
                key: Key::Int(index as i64),
                value,
            });
        }
    }

    fn notify(&self, event: &RecursiveChangeEvent) {
        self.recursive_changed.emit(event);
        if let Some(parent) = self.parent() {
            parent.notify(event);
        }
    }

    pub fn parent(&self) -> Option<Collection> {
        self.core.parent.borrow().as_ref().and_then(ParentLink::upgrade)
    }

    pub fn key_of(&self, value: &Value) -> Option<Key> {
        self.content
            .borrow()
            .iter()
            .position(|v| value_ptr_eq(v, value))
            .map(|i| Key::Int(i as i64))
    }

    pub fn address(&self) -> String {
        match self.parent() {
            Some(parent) => {
                let key = parent
                    .key_of_value(&Value::List(self.handle()))
                    .map(|k| k.address_segment())
                    .unwrap_or_default();
                format!("{}{}", parent.address(), key)
            }
            None => "$".to_string(),
        }
    }

    pub fn set_remote_storage(&self, hook: Option<RemoteStorageHook>) {
        *self.core.remote_storage.borrow_mut() = hook.clone();
        for value in self.values() {
            if let Some(child) = value.as_collection() {
                child.set_remote_storage_inner(hook.clone());
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.values().iter().map(Value::to_json).collect())
    }
}

fn value_ptr_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Map(x), Value::Map(y)) => Rc::ptr_eq(x, y),
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn attach(value: &Value, parent: Collection, hook: Option<RemoteStorageHook>) {
    let link = match &parent {
        Collection::Map(m) => ParentLink::Map(Rc::downgrade(m)),
        Collection::List(l) => ParentLink::List(Rc::downgrade(l)),
    };
    match value {
        Value::Map(m) => {
            *m.core.parent.borrow_mut() = Some(link);
            m.set_remote_storage(hook);
        }
        Value::List(l) => {
            *l.core.parent.borrow_mut() = Some(link);
            l.set_remote_storage(hook);
        }
        _ => {}
    }
}

fn detach(value: &Value, parent: &Collection) {
    match value {
        Value::Map(m) => {
            let attached_here = m.parent().map(|p| p.ptr_eq(parent)).unwrap_or(false);
            if attached_here {
                *m.core.parent.borrow_mut() = None;
            }
        }
        Value::List(l) => {
            let attached_here = l.parent().map(|p| p.ptr_eq(parent)).unwrap_or(false);
            if attached_here {
                *l.core.parent.borrow_mut() = None;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_assign_and_get() {
        let map = ObservableMap::new();
        map.assign("Running", true);
        map.assign("Threshold", 1.6);
        map.assign("Name", "wave");

        assert_eq!(map.get_bool("Running"), Some(true));
        assert_eq!(map.get_f64("Threshold"), Some(1.6));
        assert_eq!(map.get_string("Name"), Some("wave".to_string()));
        assert!(map.try_at("Missing").is_none());
    }

    #[test]
    fn test_string_coerces_to_f64() {
        let map = ObservableMap::new();
        map.assign("Threshold", "2.5");
        assert_eq!(map.get_f64("Threshold"), Some(2.5));
    }

    #[test]
    fn test_local_signal_then_recursive() {
        let root = ObservableMap::new();
        let child = ObservableMap::new();
        root.assign("child", child.clone());

        let order = Rc::new(RefCell::new(Vec::new()));

        let order1 = Rc::clone(&order);
        let _local = child.changed.connect(move |ev| {
            order1.borrow_mut().push(format!("local {}", ev.key));
        });
        let order2 = Rc::clone(&order);
        let child2 = child.clone();
        let _recursive = root.recursive_changed.connect(move |ev| {
            assert!(ev.origin.is_map(&child2));
            order2.borrow_mut().push(format!("root {}", ev.key));
        });

        child.assign("Running", true);
        assert_eq!(
            *order.borrow(),
            vec!["local Running".to_string(), "root Running".to_string()]
        );
    }

    #[test]
    fn test_delete_carries_removed_value() {
        let map = ObservableMap::new();
        map.assign("x", 3i64);

        let seen = Rc::new(RefCell::new(None));
        let seen2 = Rc::clone(&seen);
        let _c = map.changed.connect(move |ev| {
            if ev.action == Action::Delete {
                *seen2.borrow_mut() = Some(ev.value.clone());
            }
        });
        map.erase("x");
        assert_eq!(*seen.borrow(), Some(Value::Int(3)));
        // Deleting again is a no-op.
        map.erase("x");
    }

    #[test]
    fn test_recap_replay_rebuilds_contents() {
        let map = ObservableMap::new();
        map.assign("a", 1i64);
        map.assign("b", "two");
        let nested = ObservableMap::new();
        nested.assign("inner", true);
        map.assign("c", nested);

        let rebuilt = ObservableMap::new();
        map.recap_with(|ev| {
            rebuilt.assign_with(ev.key.clone(), ev.value.clone(), None, false);
        });

        assert_eq!(Value::Map(map), Value::Map(rebuilt));
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::json!({
            "nodes": [
                {"type": "WAVE", "name": "wave", "Frequency": 10.0, "Running": false},
                {"type": "STORAGE", "name": "storage", "Sources": "wave"}
            ],
            "total": 2,
            "note": null
        });
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), json);
        let round = Value::from_json(&value.to_json());
        assert_eq!(value, round);
    }

    #[test]
    fn test_addresses() {
        let root = ObservableMap::new();
        let nodes = ObservableList::new();
        root.assign("nodes", nodes.clone());
        let node = ObservableMap::new();
        nodes.push(node.clone());

        assert_eq!(root.address(), "$");
        assert_eq!(nodes.address(), "$['nodes']");
        assert_eq!(node.address(), "$['nodes'][0]");
    }

    #[test]
    fn test_shared_collection_aliases() {
        let root = ObservableMap::new();
        let shared = ObservableMap::new();
        root.assign("a", shared.clone());
        root.assign("b", shared.clone());

        shared.assign("x", 1i64);
        let a = root.at("a");
        let b = root.at("b");
        assert_eq!(a.as_map().unwrap().get_int("x"), Some(1));
        assert_eq!(b.as_map().unwrap().get_int("x"), Some(1));
        // The parent link points at the root; the first alias wins for
        // address computation.
        assert_eq!(shared.address(), "$['a']");
    }

    #[test]
    fn test_remote_storage_defers_writes() {
        let root = ObservableMap::new();
        let pending: Rc<RefCell<Vec<(String, Value, DoneCallback)>>> =
            Rc::new(RefCell::new(Vec::new()));

        let pending2 = Rc::clone(&pending);
        root.set_remote_storage(Some(Rc::new(move |_action, address, value, done| {
            pending2
                .borrow_mut()
                .push((address.to_string(), value, done));
            None
        })));

        let applied = Rc::new(RefCell::new(false));
        let applied2 = Rc::clone(&applied);
        let _c = root.changed.connect(move |_| *applied2.borrow_mut() = true);

        let called = Rc::new(RefCell::new(false));
        let called2 = Rc::clone(&called);
        root.assign_with(
            Key::from("Running"),
            Value::Bool(true),
            Some(Box::new(move || *called2.borrow_mut() = true)),
            false,
        );

        // Hooked write: nothing applied locally, callback blocked.
        assert!(!root.contains("Running"));
        assert!(!*applied.borrow());
        assert!(!*called.borrow());
        assert_eq!(pending.borrow().len(), 1);
        assert_eq!(pending.borrow()[0].0, "$['Running']");

        // The back channel applies the change and releases the callback.
        root.assign_with(Key::from("Running"), Value::Bool(true), None, true);
        assert_eq!(root.get_bool("Running"), Some(true));
        assert!(*applied.borrow());
        let (_, _, done) = pending.borrow_mut().remove(0);
        done();
        assert!(*called.borrow());
    }

    #[test]
    fn test_remote_storage_propagates_to_children() {
        let root = ObservableMap::new();
        let count = Rc::new(RefCell::new(0));
        let count2 = Rc::clone(&count);
        root.set_remote_storage(Some(Rc::new(move |_a, _addr, _v, _done| {
            *count2.borrow_mut() += 1;
            None
        })));

        // A collection attached after the hook inherits it.
        root.assign_with(
            Key::from("child"),
            Value::Map(ObservableMap::new()),
            None,
            true,
        );
        let child = root.at("child");
        child.as_map().unwrap().assign("x", 1i64);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_list_padding_and_erase() {
        let list = ObservableList::new();
        list.set(2, 5i64);
        assert_eq!(list.len(), 3);
        assert_eq!(list.at(0), Value::None);
        assert_eq!(list.at(2), Value::Int(5));

        list.erase(0);
        assert_eq!(list.len(), 2);
        assert_eq!(list.at(1), Value::Int(5));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_list_out_of_range_panics() {
        let list = ObservableList::new();
        list.at(0);
    }
}
