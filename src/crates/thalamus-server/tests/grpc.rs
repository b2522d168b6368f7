//! In-process gRPC round trips: a real tonic server on a loopback port,
//! with the node graph and io executor on the test's local set.

use prost::Message;
use std::net::SocketAddr;
use std::time::Duration;
use thalamus_core::{analog_view, io_channel, text_view, NodeGraph};
use thalamus_proto::thalamus_client::ThalamusClient;
use thalamus_proto::thalamus_server::ThalamusServer;
use thalamus_proto::{
    observable_change, AnalogRequest, AnalogResponse, Empty, InjectAnalogRequest, NodeRequest,
    NodeSelector, ObservableChange, ObservableTransaction, Ping, ReplayRequest, Span,
    StringMessage,
};
use thalamus_server::{StateManager, ThalamusService};
use thalamus_state::{ObservableList, ObservableListHandle, ObservableMap, ObservableMapHandle, Value};
use tokio_stream::wrappers::TcpListenerStream;

struct Harness {
    addr: SocketAddr,
    graph: NodeGraph,
    root: ObservableMapHandle,
    nodes: ObservableListHandle,
}

async fn start() -> Harness {
    let (io, queue) = io_channel();
    let root = ObservableMap::new();
    let nodes = ObservableList::new();
    root.assign("nodes", nodes.clone());

    let graph = NodeGraph::new(nodes.clone());
    graph.set_runtime(tokio::runtime::Handle::current());
    graph.set_io_executor(io.clone());
    graph.set_root(Value::Map(root.clone()));
    tokio::task::spawn_local(queue.run(graph.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = ThalamusService::new(io);
    tokio::task::spawn_local(async move {
        let _ = tonic::transport::Server::builder()
            .add_service(ThalamusServer::new(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await;
    });
    // Give the listener a beat to come up.
    tokio::time::sleep(Duration::from_millis(20)).await;

    Harness {
        addr,
        graph,
        root,
        nodes,
    }
}

impl Harness {
    async fn client(&self) -> ThalamusClient<tonic::transport::Channel> {
        ThalamusClient::connect(format!("http://{}", self.addr))
            .await
            .expect("client connect")
    }

    fn push_node(&self, config: serde_json::Value) -> ObservableMapHandle {
        let entry = match Value::from_json(&config) {
            Value::Map(map) => map,
            _ => panic!("node config must be an object"),
        };
        self.nodes.push(Value::Map(entry.clone()));
        entry
    }
}

fn name_selector(name: &str) -> NodeSelector {
    NodeSelector {
        name: name.to_string(),
        r#type: String::new(),
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..300 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn test_ping_echoes_payload() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            let mut client = harness.client().await;

            let pings = vec![
                Ping {
                    id: 1,
                    payload: vec![1, 2, 3],
                },
                Ping {
                    id: 2,
                    payload: vec![0; 4096],
                },
            ];
            let outbound = tokio_stream::iter(pings.clone());
            let mut pongs = client.ping(outbound).await.unwrap().into_inner();

            for ping in &pings {
                let pong = pongs.message().await.unwrap().unwrap();
                assert_eq!(pong.id, ping.id);
                assert_eq!(pong.payload, ping.payload);
            }
        })
        .await;
}

#[tokio::test]
async fn test_unary_introspection() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            harness.push_node(serde_json::json!({"type": "ANALOG", "name": "raw"}));
            let mut client = harness.client().await;

            let name = client
                .get_type_name(StringMessage {
                    value: "WAVE".to_string(),
                })
                .await
                .unwrap()
                .into_inner();
            assert_eq!(name.value, "WAVE");
            assert!(client
                .get_type_name(StringMessage {
                    value: "NO_SUCH".to_string(),
                })
                .await
                .is_err());

            let modalities = client
                .get_modalities(name_selector("raw"))
                .await
                .unwrap()
                .into_inner();
            assert_eq!(
                modalities.modalities,
                thalamus_core::Modalities::ANALOG.bits()
            );
        })
        .await;
}

#[tokio::test]
async fn test_analog_stream_delivers_injections() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            harness.push_node(serde_json::json!({"type": "ANALOG", "name": "raw"}));
            let mut client = harness.client().await;

            let mut stream = client
                .analog(AnalogRequest {
                    node: Some(name_selector("raw")),
                })
                .await
                .unwrap()
                .into_inner();

            let graph = harness.graph.clone();
            tokio::task::spawn_local(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let node = graph.get_node_by_name("raw").unwrap();
                analog_view(&*node)
                    .unwrap()
                    .inject(
                        vec![vec![1.5, 2.5]],
                        vec![Duration::from_millis(1)],
                        vec!["0".to_string()],
                    )
                    .unwrap();
            });

            let response = stream.message().await.unwrap().unwrap();
            assert_eq!(response.data, vec![1.5, 2.5]);
            assert_eq!(response.spans.len(), 1);
            assert_eq!(response.spans[0].name, "0");
            assert_eq!(response.sample_intervals, vec![1_000_000]);
        })
        .await;
}

#[tokio::test]
async fn test_inject_analog_reaches_node() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            harness.push_node(serde_json::json!({"type": "ANALOG", "name": "raw"}));
            let mut client = harness.client().await;

            let request = InjectAnalogRequest {
                node: "raw".to_string(),
                signal: Some(AnalogResponse {
                    data: vec![7.0, 8.0, 9.0],
                    spans: vec![Span {
                        begin: 0,
                        end: 3,
                        name: "0".to_string(),
                    }],
                    sample_intervals: vec![2_000_000],
                    ..Default::default()
                }),
            };
            client
                .inject_analog(tokio_stream::iter(vec![request]))
                .await
                .unwrap();

            let graph = harness.graph.clone();
            eventually(move || {
                let Some(node) = graph.get_node_by_name("raw") else {
                    return false;
                };
                let analog = analog_view(&*node).unwrap();
                analog.num_channels() == 1 && &*analog.data(0) == &[7.0, 8.0, 9.0]
            })
            .await;
        })
        .await;
}

#[tokio::test]
async fn test_node_request_drives_log_node() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            harness.push_node(serde_json::json!({"type": "LOG", "name": "log"}));
            let mut client = harness.client().await;

            client
                .node_request(NodeRequest {
                    node: "log".to_string(),
                    json: "\"experiment 12 begins\"".to_string(),
                })
                .await
                .unwrap();

            let graph = harness.graph.clone();
            eventually(move || {
                let Some(node) = graph.get_node_by_name("log") else {
                    return false;
                };
                let text = text_view(&*node).unwrap();
                let matches = &*text.text() == "experiment 12 begins";
                matches
            })
            .await;
        })
        .await;
}

#[tokio::test]
async fn test_graph_stream_snapshots_directory() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            harness.push_node(serde_json::json!({"type": "ANALOG", "name": "a"}));
            harness.push_node(serde_json::json!({"type": "LOG", "name": "b"}));
            let mut client = harness.client().await;

            let mut stream = client
                .graph(thalamus_proto::GraphRequest {})
                .await
                .unwrap()
                .into_inner();
            let snapshot = stream.message().await.unwrap().unwrap();
            let names: Vec<_> = snapshot.nodes.iter().map(|n| n.name.clone()).collect();
            assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        })
        .await;
}

#[tokio::test]
async fn test_observable_bridge_write_applies_jsonpath() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            let entry = harness.push_node(serde_json::json!({"type": "ANALOG", "name": "raw"}));
            let mut client = harness.client().await;

            client
                .observable_bridge_write(ObservableTransaction {
                    changes: vec![ObservableChange {
                        address: "$['nodes'][?@.name == 'raw']['Running']".to_string(),
                        value: "true".to_string(),
                        action: observable_change::Action::Set as i32,
                    }],
                    id: 0,
                    acknowledged: 0,
                })
                .await
                .unwrap();

            eventually(move || entry.get_bool("Running") == Some(true)).await;
        })
        .await;
}

#[tokio::test]
async fn test_replay_injects_recorded_analog() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            harness.push_node(serde_json::json!({"type": "ANALOG", "name": "raw"}));
            let mut client = harness.client().await;

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("session.log");
            let record = thalamus_proto::StorageRecord {
                time: 1,
                node: "raw".to_string(),
                body: Some(thalamus_proto::storage_record::Body::Analog(
                    AnalogResponse {
                        data: vec![4.0, 5.0],
                        spans: vec![Span {
                            begin: 0,
                            end: 2,
                            name: "0".to_string(),
                        }],
                        sample_intervals: vec![1_000_000],
                        ..Default::default()
                    },
                )),
            };
            let mut bytes = Vec::new();
            thalamus_proto::framing::append_frame(&mut bytes, &record.encode_to_vec());
            std::fs::write(&path, bytes).unwrap();

            client
                .replay(ReplayRequest {
                    filename: path.to_string_lossy().into_owned(),
                    nodes: vec![],
                })
                .await
                .unwrap();

            let graph = harness.graph.clone();
            eventually(move || {
                let Some(node) = graph.get_node_by_name("raw") else {
                    return false;
                };
                let analog = analog_view(&*node).unwrap();
                analog.num_channels() == 1 && &*analog.data(0) == &[4.0, 5.0]
            })
            .await;
        })
        .await;
}

#[tokio::test]
async fn test_logout_streams_log_records() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            let mut client = harness.client().await;

            let mut stream = client.logout(Empty {}).await.unwrap().into_inner();
            // Let the subscription land on the io executor first.
            tokio::time::sleep(Duration::from_millis(50)).await;
            harness.graph.emit_log(thalamus_proto::Text {
                text: "hello".to_string(),
                time: 3,
                remote_time: 0,
                node: "tester".to_string(),
            });

            let text = stream.message().await.unwrap().unwrap();
            assert_eq!(text.text, "hello");
            assert_eq!(text.node, "tester");
        })
        .await;
}

#[tokio::test]
async fn test_bridge_acks_resolve_in_issue_order() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;

            // Client side: a fresh mirrored tree.
            let client_root = ObservableMap::new();
            let channel = tonic::transport::Endpoint::from_shared(format!(
                "http://{}",
                harness.addr
            ))
            .unwrap()
            .connect_lazy();
            let _manager = StateManager::attach(
                &Value::Map(client_root.clone()),
                channel,
                tokio::runtime::Handle::current(),
            );

            // The server recap arrives and materializes `nodes` locally.
            let mirror = client_root.clone();
            eventually(move || mirror.contains("nodes")).await;

            // Two writes in the same io tick: the callbacks must resolve
            // in issue order.
            let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
            let order1 = std::rc::Rc::clone(&order);
            let order2 = std::rc::Rc::clone(&order);
            client_root.assign_with(
                thalamus_state::Key::from("a"),
                Value::Int(1),
                Some(Box::new(move || order1.borrow_mut().push(1))),
                false,
            );
            client_root.assign_with(
                thalamus_state::Key::from("a"),
                Value::Int(2),
                Some(Box::new(move || order2.borrow_mut().push(2))),
                false,
            );

            // Deferred through the hook: not applied locally yet.
            assert!(!client_root.contains("a"));

            let order_check = std::rc::Rc::clone(&order);
            eventually(move || order_check.borrow().len() == 2).await;
            assert_eq!(*order.borrow(), vec![1, 2]);

            // The echo applied both writes on both sides.
            assert_eq!(client_root.get_int("a"), Some(2));
            assert_eq!(
                harness.root.get_int("a"),
                Some(2),
                "authoritative tree converged"
            );
        })
        .await;
}

#[tokio::test]
async fn test_remote_probe_bandwidth() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let harness = start().await;
            harness.push_node(serde_json::json!({"type": "ANALOG", "name": "target"}));
            let remote_state = harness.push_node(serde_json::json!({
                "type": "REMOTE",
                "name": "probe",
                "Address": format!("127.0.0.1:{}", harness.addr.port()),
                "Node": "target",
                "Probe Frequency": 10.0,
                "Probe Size": 4096
            }));
            remote_state.assign("Running", true);

            tokio::time::sleep(Duration::from_millis(1100)).await;

            let node = harness.graph.get_node_by_name("probe").unwrap();
            let analog = analog_view(&*node).unwrap();
            assert_eq!(analog.name(1), "Bytes Per Second");
            let bps = {
                let data = analog.data(1);
                data.first().copied().unwrap_or(0.0)
            };
            // Request plus response, 4096-byte payloads at 10 Hz.
            let expected = 2.0 * 4096.0 * 10.0;
            assert!(
                bps > expected * 0.8 && bps < expected * 1.2,
                "bytes per second {} outside 20% of {}",
                bps,
                expected
            );

            remote_state.assign("Running", false);
        })
        .await;
}
