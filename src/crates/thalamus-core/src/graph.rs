//! The node graph: a live directory of typed nodes driven by the `nodes`
//! sequence of the state tree.
//!
//! Inserting an entry constructs the node of the declared `type`,
//! mutating `type` destroys and rebuilds the instance, deleting the entry
//! destroys it. Lookup is lazy: [`NodeGraph::get_node_async`] and
//! [`NodeGraph::get_node_scoped`] deliver a handle when a matching node
//! first appears.

use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::thread_pool::ThreadPool;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};
use thalamus_state::{
    Action, ChangeEvent, Connection, ObservableListHandle, ObservableMapHandle, Signal,
};

/// Name-or-type node selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Name(String),
    Type(String),
}

impl Selector {
    pub fn name(name: impl Into<String>) -> Selector {
        Selector::Name(name.into())
    }

    pub fn node_type(tag: impl Into<String>) -> Selector {
        Selector::Type(tag.into())
    }

    fn matches_state(&self, state: &ObservableMapHandle) -> bool {
        match self {
            Selector::Name(name) => state.get_string("name").as_deref() == Some(name),
            Selector::Type(tag) => state.get_string("type").as_deref() == Some(tag),
        }
    }
}

impl From<&thalamus_proto::NodeSelector> for Selector {
    fn from(selector: &thalamus_proto::NodeSelector) -> Selector {
        if !selector.name.is_empty() {
            Selector::Name(selector.name.clone())
        } else {
            Selector::Type(selector.r#type.clone())
        }
    }
}

/// Constructor table entry for one node type.
pub trait NodeFactory {
    fn type_name(&self) -> &'static str;

    /// One-shot environment check/initialization. Factories returning
    /// `false` are dropped from the registry at startup.
    fn prepare(&self) -> bool {
        true
    }

    /// Teardown counterpart of `prepare`, run when the graph drops.
    fn cleanup(&self) {}

    fn create(&self, state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<dyn Node>>;
}

/// Implemented by node types registered through [`typed_factory`].
pub trait TypedNode: Node + 'static {
    const TYPE_NAME: &'static str;

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>>;

    fn prepare() -> bool {
        true
    }

    fn cleanup() {}
}

struct TypedFactory<T: TypedNode>(std::marker::PhantomData<T>);

impl<T: TypedNode> NodeFactory for TypedFactory<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn prepare(&self) -> bool {
        T::prepare()
    }

    fn cleanup(&self) {
        T::cleanup()
    }

    fn create(&self, state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<dyn Node>> {
        Ok(T::create(state, graph)?)
    }
}

/// Registry entry for `T`.
pub fn typed_factory<T: TypedNode>() -> Rc<dyn NodeFactory> {
    Rc::new(TypedFactory::<T>(std::marker::PhantomData))
}

struct Slot {
    state: ObservableMapHandle,
    type_tag: String,
    node: Option<Rc<dyn Node>>,
    _entry_connection: Connection,
}

struct ScopedEntry {
    selector: Selector,
    signal: Rc<Signal<Weak<dyn Node>>>,
}

pub struct GraphInner {
    nodes_state: ObservableListHandle,
    slots: RefCell<Vec<Slot>>,
    factories: RefCell<BTreeMap<String, Rc<dyn NodeFactory>>>,
    pending: RefCell<Vec<(Selector, Box<dyn FnOnce(Weak<dyn Node>)>)>>,
    scoped: RefCell<Vec<ScopedEntry>>,
    events_signal: Signal<thalamus_proto::Event>,
    log_signal: Signal<thalamus_proto::Text>,
    notification_signal: Signal<thalamus_proto::Notification>,
    thread_pool: ThreadPool,
    start_steady: Instant,
    start_system: Duration,
    start_wall: chrono::DateTime<chrono::Local>,
    runtime: RefCell<Option<tokio::runtime::Handle>>,
    root: RefCell<Option<thalamus_state::Value>>,
    io: RefCell<Option<crate::executor::WeakIoExecutor>>,
    channels: RefCell<HashMap<String, tonic::transport::Channel>>,
    _nodes_connection: RefCell<Option<Connection>>,
}

/// Cloneable handle to the graph, valid on the io executor only.
#[derive(Clone)]
pub struct NodeGraph {
    inner: Rc<GraphInner>,
}

/// Non-owning graph handle for storage inside nodes.
#[derive(Clone)]
pub struct NodeGraphWeak {
    inner: Weak<GraphInner>,
}

impl NodeGraphWeak {
    pub fn upgrade(&self) -> Option<NodeGraph> {
        self.inner.upgrade().map(|inner| NodeGraph { inner })
    }
}

impl NodeGraph {
    /// Builds a graph over `nodes` with the given factory set. Factories
    /// whose `prepare` fails are dropped. Existing entries are constructed
    /// immediately.
    pub fn with_factories(
        nodes: ObservableListHandle,
        factories: Vec<Rc<dyn NodeFactory>>,
    ) -> NodeGraph {
        let mut table = BTreeMap::new();
        for factory in factories {
            if factory.prepare() {
                table.insert(factory.type_name().to_string(), factory);
            } else {
                tracing::info!(
                    node_type = factory.type_name(),
                    "node factory unavailable, dropping from registry"
                );
            }
        }

        let inner = Rc::new(GraphInner {
            nodes_state: nodes.clone(),
            slots: RefCell::new(Vec::new()),
            factories: RefCell::new(table),
            pending: RefCell::new(Vec::new()),
            scoped: RefCell::new(Vec::new()),
            events_signal: Signal::new(),
            log_signal: Signal::new(),
            notification_signal: Signal::new(),
            thread_pool: ThreadPool::new("ThreadPool", 0),
            start_steady: crate::clock::start_instant(),
            start_system: crate::clock::system_now(),
            start_wall: chrono::Local::now(),
            runtime: RefCell::new(tokio::runtime::Handle::try_current().ok()),
            root: RefCell::new(None),
            io: RefCell::new(None),
            channels: RefCell::new(HashMap::new()),
            _nodes_connection: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let connection = nodes.changed.connect(move |ev| {
            if let Some(inner) = weak.upgrade() {
                GraphInner::on_nodes(&inner, ev);
            }
        });
        *inner._nodes_connection.borrow_mut() = Some(connection);

        let graph = NodeGraph { inner };
        let inner2 = Rc::clone(&graph.inner);
        nodes.recap_with(|ev| GraphInner::on_nodes(&inner2, ev));
        graph.inner.thread_pool.start();
        graph
    }

    /// Builds a graph with the default node registry.
    pub fn new(nodes: ObservableListHandle) -> NodeGraph {
        Self::with_factories(nodes, crate::nodes::default_factories())
    }

    pub fn downgrade(&self) -> NodeGraphWeak {
        NodeGraphWeak {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// First node matching `selector`, in insertion order. Empty slots
    /// (failed constructions) do not match.
    pub fn get_node(&self, selector: &Selector) -> Option<Rc<dyn Node>> {
        let slots = self.inner.slots.borrow();
        slots
            .iter()
            .find(|slot| slot.node.is_some() && selector.matches_state(&slot.state))
            .and_then(|slot| slot.node.clone())
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<Rc<dyn Node>> {
        self.get_node(&Selector::name(name))
    }

    /// Invokes `callback` with the first match, now or on first future
    /// appearance. The callback fires at most once.
    pub fn get_node_async(
        &self,
        selector: Selector,
        callback: impl FnOnce(Weak<dyn Node>) + 'static,
    ) {
        if let Some(node) = self.get_node(&selector) {
            callback(Rc::downgrade(&node));
            return;
        }
        self.inner
            .pending
            .borrow_mut()
            .push((selector, Box::new(callback)));
    }

    /// Like [`get_node_async`], but the subscription is cancelled when the
    /// returned guard drops. Fires at most once.
    ///
    /// [`get_node_async`]: NodeGraph::get_node_async
    pub fn get_node_scoped(
        &self,
        selector: Selector,
        callback: impl Fn(&Weak<dyn Node>) + 'static,
    ) -> Connection {
        if let Some(node) = self.get_node(&selector) {
            callback(&Rc::downgrade(&node));
            return Connection::empty();
        }
        let signal: Rc<Signal<Weak<dyn Node>>> = Rc::new(Signal::new());
        let connection = signal.connect(callback);
        self.inner
            .scoped
            .borrow_mut()
            .push(ScopedEntry { selector, signal });
        connection
    }

    /// Display name for a registered type tag.
    pub fn type_name(&self, tag: &str) -> Option<String> {
        self.inner
            .factories
            .borrow()
            .get(tag)
            .map(|f| f.type_name().to_string())
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.inner.factories.borrow().keys().cloned().collect()
    }

    /// `(name, type, modalities)` snapshot of the current node directory.
    pub fn node_infos(&self) -> Vec<thalamus_proto::NodeInfo> {
        let slots = self.inner.slots.borrow();
        slots
            .iter()
            .map(|slot| thalamus_proto::NodeInfo {
                name: slot.state.get_string("name").unwrap_or_default(),
                r#type: slot.type_tag.clone(),
                modalities: slot
                    .node
                    .as_ref()
                    .map(|n| n.modalities().bits())
                    .unwrap_or(0),
            })
            .collect()
    }

    pub fn nodes_state(&self) -> ObservableListHandle {
        self.inner.nodes_state.clone()
    }

    pub fn thread_pool(&self) -> ThreadPool {
        self.inner.thread_pool.clone()
    }

    /// Steady clock at process start.
    pub fn start_steady(&self) -> Instant {
        self.inner.start_steady
    }

    /// System clock at process start, as duration since the epoch.
    pub fn start_system(&self) -> Duration {
        self.inner.start_system
    }

    /// Local wall-clock time at graph start, used for output file naming.
    pub fn start_wall(&self) -> chrono::DateTime<chrono::Local> {
        self.inner.start_wall
    }

    /// Runtime handle for network edges (absent in bare synchronous
    /// tests).
    pub fn runtime(&self) -> Option<tokio::runtime::Handle> {
        self.inner.runtime.borrow().clone()
    }

    /// Overrides the network runtime. The server wires the multi-thread
    /// transport runtime in here so network tasks stay off the io thread.
    pub fn set_runtime(&self, runtime: tokio::runtime::Handle) {
        *self.inner.runtime.borrow_mut() = Some(runtime);
    }

    /// Installs the root state value for the bridge and JSONPath
    /// addressed operations.
    pub fn set_root(&self, root: thalamus_state::Value) {
        *self.inner.root.borrow_mut() = Some(root);
    }

    /// The root state value, once installed.
    pub fn root(&self) -> Option<thalamus_state::Value> {
        self.inner.root.borrow().clone()
    }

    /// Installs the post handle other threads use to reach this graph.
    /// The graph keeps only a weak handle so it cannot keep its own task
    /// queue alive at shutdown.
    pub fn set_io_executor(&self, io: crate::executor::IoExecutor) {
        *self.inner.io.borrow_mut() = Some(io.downgrade());
    }

    /// Post handle onto this graph's io executor, once installed.
    pub fn io_executor(&self) -> Option<crate::executor::IoExecutor> {
        self.inner.io.borrow().as_ref().and_then(|io| io.upgrade())
    }

    /// Broadcast signal for externally injected events; the storage
    /// pipeline records these.
    pub fn events_signal(&self) -> &Signal<thalamus_proto::Event> {
        &self.inner.events_signal
    }

    /// Broadcast signal for log records, local and remote.
    pub fn log_signal(&self) -> &Signal<thalamus_proto::Text> {
        &self.inner.log_signal
    }

    pub fn notification_signal(&self) -> &Signal<thalamus_proto::Notification> {
        &self.inner.notification_signal
    }

    pub fn emit_event(&self, event: thalamus_proto::Event) {
        self.inner.events_signal.emit(&event);
    }

    pub fn emit_log(&self, text: thalamus_proto::Text) {
        self.inner.log_signal.emit(&text);
    }

    /// Surfaces a warning to attached front-ends.
    pub fn warn(&self, title: impl Into<String>, message: impl Into<String>) {
        let title = title.into();
        let message = message.into();
        tracing::warn!(title = %title, "{}", message);
        self.inner
            .notification_signal
            .emit(&thalamus_proto::Notification {
                title,
                message,
                time: crate::clock::to_nanos(crate::clock::system_now()),
            });
    }

    /// Shared lazy channel to `url`. A bare `host` gets the default port
    /// 50050; a bare `host:port` gets an http scheme.
    pub fn channel(&self, url: &str) -> Result<tonic::transport::Channel> {
        let mut target = url.trim().to_string();
        let has_port = target
            .rsplit_once(':')
            .map(|(_, tail)| tail.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !has_port {
            target = format!("{}:50050", target);
        }
        if !target.contains("://") {
            target = format!("http://{}", target);
        }

        if let Some(channel) = self.inner.channels.borrow().get(&target) {
            return Ok(channel.clone());
        }
        let endpoint = tonic::transport::Endpoint::from_shared(target.clone())
            .map_err(|e| GraphError::Configuration(format!("bad address '{}': {}", url, e)))?;
        let channel = endpoint.connect_lazy();
        self.inner
            .channels
            .borrow_mut()
            .insert(target, channel.clone());
        Ok(channel)
    }
}

impl GraphInner {
    fn on_nodes(inner: &Rc<GraphInner>, ev: &ChangeEvent) {
        let Some(index) = ev.key.as_int() else {
            return;
        };
        let index = index as usize;
        match ev.action {
            Action::Set => {
                let Some(state) = ev.value.as_map().cloned() else {
                    tracing::warn!(index, "nodes entry is not a mapping, ignoring");
                    return;
                };

                let weak = Rc::downgrade(inner);
                let state_weak = Rc::downgrade(&state);
                let entry_connection = state.changed.connect(move |entry_ev| {
                    if let (Some(inner), Some(state)) = (weak.upgrade(), state_weak.upgrade()) {
                        GraphInner::on_node_entry(&inner, &state, entry_ev);
                    }
                });

                let type_tag = state.get_string("type").unwrap_or_default();
                let node = GraphInner::construct(inner, &type_tag, &state);
                let slot = Slot {
                    state: state.clone(),
                    type_tag,
                    node,
                    _entry_connection: entry_connection,
                };
                {
                    let mut slots = inner.slots.borrow_mut();
                    if index < slots.len() {
                        slots[index] = slot;
                    } else {
                        slots.push(slot);
                    }
                }
                // Replay the entry so selector subscriptions see its name
                // and type.
                let inner2 = Rc::clone(inner);
                let state2 = state.clone();
                state.recap_with(move |entry_ev| {
                    GraphInner::on_node_entry(&inner2, &state2, entry_ev)
                });
            }
            Action::Delete => {
                let mut slots = inner.slots.borrow_mut();
                if index < slots.len() {
                    slots.remove(index);
                }
            }
        }
    }

    fn on_node_entry(inner: &Rc<GraphInner>, state: &ObservableMapHandle, ev: &ChangeEvent) {
        if ev.action != Action::Set {
            return;
        }
        let Some(key) = ev.key.as_str() else {
            return;
        };
        let Some(value) = ev.value.as_str().map(str::to_string) else {
            return;
        };

        let index = {
            let slots = inner.slots.borrow();
            slots
                .iter()
                .position(|slot| Rc::ptr_eq(&slot.state, state))
        };
        let Some(index) = index else {
            return;
        };

        match key {
            "type" => {
                let needs_rebuild = inner.slots.borrow()[index].type_tag != value;
                if needs_rebuild {
                    let node = GraphInner::construct(inner, &value, state);
                    let mut slots = inner.slots.borrow_mut();
                    slots[index].type_tag = value.clone();
                    slots[index].node = node;
                }
                let node = inner.slots.borrow()[index]
                    .node
                    .as_ref()
                    .map(Rc::downgrade);
                if let Some(node) = node {
                    inner.notify(
                        |selector| matches!(selector, Selector::Type(t) if *t == value),
                        &node,
                    );
                }
            }
            "name" => {
                let node = inner.slots.borrow()[index]
                    .node
                    .as_ref()
                    .map(Rc::downgrade);
                if let Some(node) = node {
                    inner.notify(
                        |selector| matches!(selector, Selector::Name(n) if *n == value),
                        &node,
                    );
                }
            }
            _ => {}
        }
    }

    fn construct(
        inner: &Rc<GraphInner>,
        type_tag: &str,
        state: &ObservableMapHandle,
    ) -> Option<Rc<dyn Node>> {
        let factory = inner.factories.borrow().get(type_tag).cloned();
        let Some(factory) = factory else {
            tracing::warn!(node_type = type_tag, "no factory for node type");
            return None;
        };
        let graph = NodeGraph {
            inner: Rc::clone(inner),
        };
        match factory.create(state.clone(), &graph) {
            Ok(node) => Some(node),
            Err(e) => {
                tracing::error!(
                    node_type = type_tag,
                    name = %state.get_string("name").unwrap_or_default(),
                    error = %e,
                    "node construction failed"
                );
                None
            }
        }
    }

    fn notify(&self, matches: impl Fn(&Selector) -> bool, node: &Weak<dyn Node>) {
        let mut one_shots = Vec::new();
        {
            let mut pending = self.pending.borrow_mut();
            let mut i = 0;
            while i < pending.len() {
                if matches(&pending[i].0) {
                    one_shots.push(pending.remove(i));
                } else {
                    i += 1;
                }
            }
        }
        for (_, callback) in one_shots {
            callback(node.clone());
        }

        let mut fired = Vec::new();
        {
            let mut scoped = self.scoped.borrow_mut();
            scoped.retain(|entry| {
                if matches(&entry.selector) {
                    fired.push(Rc::clone(&entry.signal));
                    false
                } else {
                    !entry.signal.is_empty()
                }
            });
        }
        for signal in fired {
            signal.emit(node);
        }
    }
}

impl Drop for GraphInner {
    fn drop(&mut self) {
        self.slots.borrow_mut().clear();
        for factory in self.factories.borrow().values() {
            factory.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Modalities;
    use std::cell::Cell;
    use thalamus_state::{ObservableList, ObservableMap, Value};

    struct ProbeNode {
        ready: Signal<()>,
    }

    impl Node for ProbeNode {
        fn ready(&self) -> &Signal<()> {
            &self.ready
        }

        fn modalities(&self) -> Modalities {
            Modalities::NONE
        }
    }

    impl TypedNode for ProbeNode {
        const TYPE_NAME: &'static str = "PROBE";

        fn create(_state: ObservableMapHandle, _graph: &NodeGraph) -> crate::error::Result<Rc<Self>> {
            Ok(Rc::new(ProbeNode {
                ready: Signal::new(),
            }))
        }
    }

    struct AbsentNode {
        ready: Signal<()>,
    }

    impl Node for AbsentNode {
        fn ready(&self) -> &Signal<()> {
            &self.ready
        }

        fn modalities(&self) -> Modalities {
            Modalities::NONE
        }
    }

    impl TypedNode for AbsentNode {
        const TYPE_NAME: &'static str = "ABSENT";

        fn create(_state: ObservableMapHandle, _graph: &NodeGraph) -> crate::error::Result<Rc<Self>> {
            Ok(Rc::new(AbsentNode {
                ready: Signal::new(),
            }))
        }

        fn prepare() -> bool {
            false
        }
    }

    fn test_graph(nodes: &ObservableListHandle) -> NodeGraph {
        NodeGraph::with_factories(
            nodes.clone(),
            vec![typed_factory::<ProbeNode>(), typed_factory::<AbsentNode>()],
        )
    }

    fn push_node(nodes: &ObservableListHandle, name: &str, tag: &str) -> ObservableMapHandle {
        let entry = ObservableMap::new();
        entry.assign("type", tag);
        entry.assign("name", name);
        nodes.push(Value::Map(entry.clone()));
        entry
    }

    #[test]
    fn test_insert_constructs_node() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        push_node(&nodes, "a", "PROBE");
        assert!(graph.get_node_by_name("a").is_some());
        assert!(graph.get_node(&Selector::node_type("PROBE")).is_some());
    }

    #[test]
    fn test_prepare_failure_drops_factory() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        assert_eq!(graph.registered_types(), vec!["PROBE".to_string()]);
        push_node(&nodes, "a", "ABSENT");
        // The entry stays, the slot is empty.
        assert_eq!(nodes.len(), 1);
        assert!(graph.get_node_by_name("a").is_none());
    }

    #[test]
    fn test_delete_destroys_node() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        push_node(&nodes, "a", "PROBE");
        let node = graph.get_node_by_name("a").unwrap();
        let weak = Rc::downgrade(&node);
        drop(node);
        nodes.erase(0);
        assert!(weak.upgrade().is_none());
        assert!(graph.get_node_by_name("a").is_none());
    }

    #[test]
    fn test_type_mutation_rebuilds() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        let entry = push_node(&nodes, "a", "PROBE");
        let before = graph.get_node_by_name("a").unwrap();
        entry.assign("type", "PROBE");
        // Same tag: same instance.
        assert!(Rc::ptr_eq(
            &before,
            &graph.get_node_by_name("a").unwrap()
        ));
        entry.assign("type", "ABSENT");
        assert!(graph.get_node_by_name("a").is_none());
        entry.assign("type", "PROBE");
        let after = graph.get_node_by_name("a").unwrap();
        assert!(!Rc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_get_node_async_fires_on_future_match() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        graph.get_node_async(Selector::name("later"), move |node| {
            assert!(node.upgrade().is_some());
            fired2.set(fired2.get() + 1);
        });
        assert_eq!(fired.get(), 0);
        push_node(&nodes, "later", "PROBE");
        assert_eq!(fired.get(), 1);
        // One-shot: renaming another node to the same name does not refire.
        push_node(&nodes, "later", "PROBE");
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_get_node_scoped_cancelled_on_drop() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        let connection = graph.get_node_scoped(Selector::name("later"), move |_| {
            fired2.set(fired2.get() + 1);
        });
        drop(connection);
        push_node(&nodes, "later", "PROBE");
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn test_get_node_scoped_immediate_match() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        push_node(&nodes, "now", "PROBE");
        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        let _connection = graph.get_node_scoped(Selector::name("now"), move |node| {
            assert!(node.upgrade().is_some());
            fired2.set(fired2.get() + 1);
        });
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_node_infos() {
        let nodes = ObservableList::new();
        let graph = test_graph(&nodes);
        push_node(&nodes, "a", "PROBE");
        push_node(&nodes, "b", "MISSING_TYPE");
        let infos = graph.node_infos();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "a");
        assert_eq!(infos[0].r#type, "PROBE");
        assert_eq!(infos[1].r#type, "MISSING_TYPE");
    }
}
