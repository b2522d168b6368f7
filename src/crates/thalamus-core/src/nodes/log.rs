//! Text log nodes.
//!
//! [`LogNode`] accepts strings through `process` and surfaces them as a
//! text stream. [`RemoteLogNode`] follows the log stream of a remote
//! server and re-fires each record locally with its originating
//! `remote_time` preserved.

use crate::clock;
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, TypedNode};
use crate::node::{Modalities, Node};
use crate::nodes::recap_map;
use crate::text::{TextNode, TextOutput, TextSpan};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use thalamus_proto::thalamus_client::ThalamusClient;
use thalamus_state::{Connection, ObservableMapHandle, RecursiveChangeEvent, Signal};

pub struct LogNode {
    ready: Signal<()>,
    output: TextOutput,
}

impl Node for LogNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::TEXT
    }

    fn as_text(&self) -> Option<&dyn TextNode> {
        Some(self)
    }

    fn process(&self, request: &serde_json::Value) -> Result<serde_json::Value> {
        if let Some(text) = request.as_str() {
            self.output.publish(text.to_string());
            self.ready.emit(&());
        }
        Ok(serde_json::Value::Null)
    }
}

impl TextNode for LogNode {
    fn text(&self) -> TextSpan<'_> {
        self.output.text()
    }

    fn time(&self) -> Duration {
        self.output.time()
    }
}

impl TypedNode for LogNode {
    const TYPE_NAME: &'static str = "LOG";

    fn create(_state: ObservableMapHandle, _graph: &NodeGraph) -> Result<Rc<Self>> {
        Ok(Rc::new(LogNode {
            ready: Signal::new(),
            output: TextOutput::new(),
        }))
    }
}

pub struct RemoteLogNode {
    ready: Signal<()>,
    output: TextOutput,
    graph: NodeGraphWeak,
    remote_time: Cell<u64>,
    weak_self: std::rc::Weak<RemoteLogNode>,
    network_task: RefCell<Option<tokio::task::JoinHandle<()>>>,
    local_task: RefCell<Option<tokio::task::JoinHandle<()>>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl RemoteLogNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        if ev.key.as_str() != Some("Address") {
            return;
        }
        let Some(address) = ev.value.as_str().map(str::trim).map(str::to_string) else {
            return;
        };
        self.connect_remote(address);
    }

    fn connect_remote(&self, address: String) {
        self.disconnect();
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        let Some(runtime) = graph.runtime() else {
            tracing::warn!("remote log requires a network runtime");
            return;
        };
        let channel = match graph.channel(&address) {
            Ok(channel) => channel,
            Err(e) => {
                tracing::error!(address = %address, error = %e, "remote log address rejected");
                return;
            }
        };

        // Records flow from the network task into an io-local drain task
        // that republishes them.
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<thalamus_proto::Text>();
        let weak = self.weak_self.clone();
        let local = tokio::task::spawn_local(async move {
            while let Some(text) = rx.recv().await {
                let Some(node) = weak.upgrade() else {
                    break;
                };
                node.on_remote_text(text);
            }
        });
        *self.local_task.borrow_mut() = Some(local);

        let name_for_task = address.clone();
        let network = runtime.spawn(async move {
            let mut client = ThalamusClient::new(channel);
            let mut stream = match client.logout(thalamus_proto::Empty {}).await {
                Ok(response) => response.into_inner(),
                Err(status) => {
                    tracing::warn!(address = %name_for_task, %status, "log stream failed");
                    return;
                }
            };
            loop {
                match stream.message().await {
                    Ok(Some(text)) => {
                        if tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(status) => {
                        tracing::info!(address = %name_for_task, %status, "log stream closed");
                        break;
                    }
                }
            }
        });
        *self.network_task.borrow_mut() = Some(network);
    }

    fn disconnect(&self) {
        if let Some(task) = self.network_task.borrow_mut().take() {
            task.abort();
        }
        if let Some(task) = self.local_task.borrow_mut().take() {
            task.abort();
        }
    }

    fn on_remote_text(&self, text: thalamus_proto::Text) {
        self.remote_time.set(text.time);
        self.output
            .publish_at(text.text.clone(), clock::steady_now());
        self.ready.emit(&());
        if let Some(graph) = self.graph.upgrade() {
            graph.emit_log(thalamus_proto::Text {
                text: text.text,
                time: clock::to_nanos(clock::steady_now()),
                remote_time: text.time,
                node: text.node,
            });
        }
    }

    pub fn remote_time(&self) -> Duration {
        Duration::from_nanos(self.remote_time.get())
    }
}

impl Node for RemoteLogNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::TEXT
    }

    fn as_text(&self) -> Option<&dyn TextNode> {
        Some(self)
    }
}

impl TextNode for RemoteLogNode {
    fn text(&self) -> TextSpan<'_> {
        self.output.text()
    }

    fn time(&self) -> Duration {
        self.output.time()
    }
}

impl TypedNode for RemoteLogNode {
    const TYPE_NAME: &'static str = "REMOTE_LOG";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| RemoteLogNode {
            ready: Signal::new(),
            output: TextOutput::new(),
            graph: graph.downgrade(),
            remote_time: Cell::new(0),
            weak_self: weak.clone(),
            network_task: RefCell::new(None),
            local_task: RefCell::new(None),
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

impl Drop for RemoteLogNode {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::text_view;
    use thalamus_state::ObservableList;

    #[test]
    fn test_log_node_process_publishes_text() {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(nodes, vec![]);
        let node = LogNode::create(thalamus_state::ObservableMap::new(), &graph).unwrap();

        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        let _c = node.ready.connect(move |_| fired2.set(fired2.get() + 1));

        node.process(&serde_json::json!("session started")).unwrap();
        assert_eq!(fired.get(), 1);

        let text = text_view(&*node).unwrap();
        assert_eq!(&*text.text(), "session started");
        assert!(text.has_text_data());
    }

    #[test]
    fn test_log_node_ignores_non_strings() {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(nodes, vec![]);
        let node = LogNode::create(thalamus_state::ObservableMap::new(), &graph).unwrap();
        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        let _c = node.ready.connect(move |_| fired2.set(fired2.get() + 1));
        node.process(&serde_json::json!({"not": "text"})).unwrap();
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn test_remote_text_attribution() {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(nodes, vec![]);
        let node =
            RemoteLogNode::create(thalamus_state::ObservableMap::new(), &graph).unwrap();

        let seen = Rc::new(RefCell::new(None));
        let seen2 = Rc::clone(&seen);
        let _c = graph.log_signal().connect(move |text| {
            *seen2.borrow_mut() = Some(text.clone());
        });

        node.on_remote_text(thalamus_proto::Text {
            text: "from afar".to_string(),
            time: 1234,
            remote_time: 0,
            node: "peer".to_string(),
        });

        assert_eq!(&*TextNode::text(&*node), "from afar");
        assert_eq!(node.remote_time(), Duration::from_nanos(1234));
        let seen = seen.borrow();
        let record = seen.as_ref().unwrap();
        assert_eq!(record.remote_time, 1234);
        assert_eq!(record.node, "peer");
    }
}
