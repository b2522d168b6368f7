//! Run triggers.
//!
//! [`RunNode`] fans its own `Running` flag out to a comma-separated list
//! of local target nodes. [`Run2Node`] takes a list of `{Name, Address}`
//! rows and additionally dispatches to remote graphs through the
//! `observable_bridge_write` RPC; a row with an empty address is a local
//! dispatch.

use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, TypedNode};
use crate::node::{Modalities, Node};
use crate::nodes::recap_map;
use std::cell::RefCell;
use std::rc::Rc;
use thalamus_proto::thalamus_client::ThalamusClient;
use thalamus_proto::{observable_change, ObservableChange, ObservableTransaction};
use thalamus_state::{
    Connection, ObservableListHandle, ObservableMapHandle, RecursiveChangeEvent, Signal, Value,
};

/// Writes `Running = value` into the state entry of every node named in
/// `targets`, skipping `own_state`.
fn run_local_targets(
    nodes: &ObservableListHandle,
    targets: &[String],
    own_state: &ObservableMapHandle,
    value: bool,
) {
    for entry in nodes.values() {
        let Some(entry) = entry.as_map() else {
            continue;
        };
        if Rc::ptr_eq(entry, own_state) {
            continue;
        }
        let Some(name) = entry.get_string("name") else {
            continue;
        };
        if targets.iter().any(|t| t == &name) {
            entry.assign("Running", value);
        }
    }
}

pub struct RunNode {
    ready: Signal<()>,
    state: ObservableMapHandle,
    nodes: ObservableListHandle,
    _state_connection: RefCell<Option<Connection>>,
}

impl RunNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        if ev.key.as_str() != Some("Running") || !ev.origin.is_map(&self.state) {
            return;
        }
        let Some(value) = ev.value.as_bool() else {
            return;
        };
        let Some(targets) = self.state.get_string("Targets") else {
            return;
        };
        let targets: Vec<String> = targets
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        run_local_targets(&self.nodes, &targets, &self.state, value);
    }
}

impl Node for RunNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::NONE
    }
}

impl TypedNode for RunNode {
    const TYPE_NAME: &'static str = "RUNNER";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new(RunNode {
            ready: Signal::new(),
            state: state.clone(),
            nodes: graph.nodes_state(),
            _state_connection: RefCell::new(None),
        });

        let weak = Rc::downgrade(&node);
        let connection = state.recursive_changed.connect(move |ev| {
            if let Some(node) = weak.upgrade() {
                node.on_change(ev);
            }
        });
        *node._state_connection.borrow_mut() = Some(connection);
        let node2 = Rc::clone(&node);
        recap_map(&state, move |ev| node2.on_change(ev));
        Ok(node)
    }
}

pub struct Run2Node {
    ready: Signal<()>,
    state: ObservableMapHandle,
    nodes: ObservableListHandle,
    graph: NodeGraphWeak,
    _state_connection: RefCell<Option<Connection>>,
}

impl Run2Node {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        if ev.key.as_str() != Some("Running") || !ev.origin.is_map(&self.state) {
            return;
        }
        let Some(value) = ev.value.as_bool() else {
            return;
        };
        let Some(Value::List(targets)) = self.state.try_at("Targets") else {
            return;
        };
        for row in targets.values() {
            let Some(row) = row.as_map() else {
                continue;
            };
            let name = row.get_string("Name").unwrap_or_default();
            let address = row.get_string("Address").unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            if address.is_empty() {
                run_local_targets(&self.nodes, &[name], &self.state, value);
            } else {
                self.dispatch_remote(&address, &name, value);
            }
        }
    }

    fn dispatch_remote(&self, address: &str, name: &str, value: bool) {
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        let Some(runtime) = graph.runtime() else {
            tracing::warn!("remote run target requires a network runtime");
            return;
        };
        let channel = match graph.channel(address) {
            Ok(channel) => channel,
            Err(e) => {
                tracing::error!(address, error = %e, "remote run target rejected");
                return;
            }
        };
        let transaction = ObservableTransaction {
            changes: vec![ObservableChange {
                address: format!("$['nodes'][?@.name == '{}']['Running']", name),
                value: serde_json::Value::Bool(value).to_string(),
                action: observable_change::Action::Set as i32,
            }],
            id: 0,
            acknowledged: 0,
        };
        let address = address.to_string();
        runtime.spawn(async move {
            let mut client = ThalamusClient::new(channel);
            if let Err(status) = client.observable_bridge_write(transaction).await {
                tracing::warn!(address = %address, %status, "remote run dispatch failed");
            }
        });
    }
}

impl Node for Run2Node {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::NONE
    }
}

impl TypedNode for Run2Node {
    const TYPE_NAME: &'static str = "RUNNER2";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new(Run2Node {
            ready: Signal::new(),
            state: state.clone(),
            nodes: graph.nodes_state(),
            graph: graph.downgrade(),
            _state_connection: RefCell::new(None),
        });

        let weak = Rc::downgrade(&node);
        let connection = state.recursive_changed.connect(move |ev| {
            if let Some(node) = weak.upgrade() {
                node.on_change(ev);
            }
        });
        *node._state_connection.borrow_mut() = Some(connection);
        let node2 = Rc::clone(&node);
        recap_map(&state, move |ev| node2.on_change(ev));
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::typed_factory;
    use crate::nodes::{AnalogSourceNode, NoneNode};
    use thalamus_state::{ObservableList, ObservableMap};

    fn push_entry(nodes: &ObservableListHandle, name: &str, tag: &str) -> ObservableMapHandle {
        let entry = ObservableMap::new();
        entry.assign("type", tag);
        entry.assign("name", name);
        nodes.push(Value::Map(entry.clone()));
        entry
    }

    #[test]
    fn test_runner_fans_out_running() {
        let nodes = ObservableList::new();
        let _graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![
                typed_factory::<NoneNode>(),
                typed_factory::<AnalogSourceNode>(),
                typed_factory::<RunNode>(),
            ],
        );
        let a = push_entry(&nodes, "a", "ANALOG");
        let b = push_entry(&nodes, "b", "ANALOG");
        let c = push_entry(&nodes, "c", "ANALOG");
        let runner = push_entry(&nodes, "runner", "RUNNER");
        runner.assign("Targets", "a, b");

        runner.assign("Running", true);
        assert_eq!(a.get_bool("Running"), Some(true));
        assert_eq!(b.get_bool("Running"), Some(true));
        assert!(c.try_at("Running").is_none());

        runner.assign("Running", false);
        assert_eq!(a.get_bool("Running"), Some(false));
        assert_eq!(b.get_bool("Running"), Some(false));
    }

    #[test]
    fn test_runner_skips_itself() {
        let nodes = ObservableList::new();
        let _graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![typed_factory::<RunNode>()],
        );
        let runner = push_entry(&nodes, "runner", "RUNNER");
        runner.assign("Targets", "runner");
        // Writing its own Running key again would recurse forever.
        runner.assign("Running", true);
        assert_eq!(runner.get_bool("Running"), Some(true));
    }

    #[test]
    fn test_run2_local_rows() {
        let nodes = ObservableList::new();
        let _graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![
                typed_factory::<AnalogSourceNode>(),
                typed_factory::<Run2Node>(),
            ],
        );
        let a = push_entry(&nodes, "a", "ANALOG");
        let runner = push_entry(&nodes, "runner", "RUNNER2");
        let targets = ObservableList::new();
        let row = ObservableMap::new();
        row.assign("Name", "a");
        targets.push(Value::Map(row));
        runner.assign("Targets", Value::List(targets));

        runner.assign("Running", true);
        assert_eq!(a.get_bool("Running"), Some(true));
    }
}
