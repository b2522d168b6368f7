//! The `Thalamus` gRPC service.
//!
//! Every handler that touches the graph posts a closure onto the io
//! executor and streams results back over channels; the transport threads
//! never touch the state tree or a node accessor directly. Subscriptions
//! sever themselves when the client side of a stream goes away.

use std::cell::RefCell;
use std::rc::Rc;
use thalamus_core::{
    analog_view, image_view, motion_view, stim_view, text_view, AnalogNode, IoExecutor, Node,
    NodeGraph, Selector,
};
use thalamus_proto::thalamus_server::Thalamus;
use thalamus_proto::{
    observable_change, remote_node_message, AnalogRequest, AnalogResponse, Empty, Event,
    GraphRequest, GraphResponse, Image, ImageRequest, InjectAnalogRequest, ModalitiesMessage,
    NodeRequest, NodeResponse, NodeSelector, Notification, ObservableTransaction, Ping, Pong,
    RemoteNodeMessage, ReplayRequest, Span, StimRequest, StimResponse, StorageRecord,
    StringListMessage, StringMessage, Text, XsensResponse,
};
use thalamus_state::{jsonpath, Action, Connection, Signal, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};
use tonic::{Request, Response, Status, Streaming};

const STREAM_BUFFER: usize = 64;

/// Service state shared across requests: just the post handle, the graph
/// itself stays on the io thread.
pub struct ThalamusService {
    io: IoExecutor,
}

impl ThalamusService {
    pub fn new(io: IoExecutor) -> Self {
        Self { io }
    }

    /// Runs `f` on the io executor and awaits its result.
    async fn with_graph<T: Send + 'static>(
        &self,
        f: impl FnOnce(&NodeGraph) -> T + Send + 'static,
    ) -> Result<T, Status> {
        let (tx, rx) = oneshot::channel();
        self.io.post(move |graph| {
            let _ = tx.send(f(graph));
        });
        rx.await
            .map_err(|_| Status::unavailable("io executor unavailable"))
    }

    /// Subscribes a bounded stream to a node's `ready`, applying `build`
    /// per event. Full buffers drop the frame; a closed receiver severs
    /// the subscription.
    fn subscribe_ready<T: Send + 'static>(
        &self,
        selector: Selector,
        build: fn(&dyn Node) -> Option<T>,
    ) -> ReceiverStream<Result<T, Status>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        self.io.post(move |graph| {
            let lookup_guard: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
            let lookup_guard2 = Rc::clone(&lookup_guard);
            let connection = graph.get_node_scoped(selector, move |weak| {
                let Some(node) = weak.upgrade() else {
                    return;
                };
                let tx = tx.clone();
                let ready_guard: Rc<RefCell<Option<Connection>>> =
                    Rc::new(RefCell::new(None));
                let ready_guard2 = Rc::clone(&ready_guard);
                let node_weak = Rc::downgrade(&node);
                let ready_connection = node.ready().connect(move |_| {
                    let Some(node) = node_weak.upgrade() else {
                        return;
                    };
                    let Some(item) = build(&*node) else {
                        return;
                    };
                    match tx.try_send(Ok(item)) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            // Slow consumer: lose the frame, keep the
                            // latency floor.
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            ready_guard2.borrow_mut().take();
                        }
                    }
                });
                *ready_guard.borrow_mut() = Some(ready_connection);
                lookup_guard2.borrow_mut().take();
            });
            *lookup_guard.borrow_mut() = Some(connection);
        });
        ReceiverStream::new(rx)
    }

    /// Subscribes an unbounded stream to one of the graph's broadcast
    /// signals.
    fn subscribe_broadcast<T: Clone + Send + 'static>(
        &self,
        select: fn(&NodeGraph) -> &Signal<T>,
    ) -> UnboundedReceiverStream<Result<T, Status>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.io.post(move |graph| {
            let guard: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
            let guard2 = Rc::clone(&guard);
            let connection = select(graph).connect(move |item| {
                if tx.send(Ok(item.clone())).is_err() {
                    guard2.borrow_mut().take();
                }
            });
            *guard.borrow_mut() = Some(connection);
        });
        UnboundedReceiverStream::new(rx)
    }
}

/// Packs a node's current analog output into its wire form.
fn analog_response(analog: &dyn AnalogNode) -> AnalogResponse {
    let mut response = AnalogResponse {
        time: thalamus_core::clock::to_nanos(analog.time()),
        remote_time: thalamus_core::clock::to_nanos(analog.remote_time()),
        ..Default::default()
    };
    for channel in 0..analog.num_channels() {
        let begin = response.data.len() as u64;
        {
            let data = analog.data(channel);
            response.data.extend_from_slice(&data);
        }
        response.spans.push(Span {
            begin,
            end: response.data.len() as u64,
            name: analog.name(channel),
        });
        response
            .sample_intervals
            .push(analog.sample_interval(channel).as_nanos() as u64);
    }
    response
}

fn build_analog(node: &dyn Node) -> Option<AnalogResponse> {
    let analog = analog_view(node)?;
    if !analog.has_analog_data() {
        return None;
    }
    Some(analog_response(analog))
}

fn build_channel_info(node: &dyn Node) -> Option<AnalogResponse> {
    let analog = analog_view(node)?;
    let mut response = AnalogResponse {
        channels_changed: true,
        ..Default::default()
    };
    for channel in 0..analog.num_channels() {
        response.spans.push(Span {
            begin: 0,
            end: 0,
            name: analog.name(channel),
        });
        response
            .sample_intervals
            .push(analog.sample_interval(channel).as_nanos() as u64);
    }
    Some(response)
}

fn build_xsens(node: &dyn Node) -> Option<XsensResponse> {
    let motion = motion_view(node)?;
    if !motion.has_motion_data() {
        return None;
    }
    let segments = motion.segments().iter().map(|s| s.to_wire()).collect();
    Some(XsensResponse {
        segments,
        pose_name: motion.pose_name(),
        time: thalamus_core::clock::to_nanos(motion.time()),
    })
}

fn build_image(node: &dyn Node) -> Option<Image> {
    let image = image_view(node)?;
    if !image.has_image_data() {
        return None;
    }
    let mut planes = Vec::with_capacity(image.num_planes());
    for i in 0..image.num_planes() {
        planes.push(image.plane(i).to_vec());
    }
    Some(Image {
        width: image.width(),
        height: image.height(),
        format: image.format().to_wire() as i32,
        data: planes,
        frame_interval: image.frame_interval().as_nanos() as u64,
        time: thalamus_core::clock::to_nanos(image.time()),
    })
}

/// Shallow recap of the root as a transaction replaying the current tree.
fn recap_transaction(root: &Value) -> ObservableTransaction {
    let mut changes = Vec::new();
    if let Some(map) = root.as_map() {
        for (key, value) in map.entries() {
            changes.push(thalamus_proto::ObservableChange {
                address: format!("${}", key.address_segment()),
                value: value.to_json().to_string(),
                action: observable_change::Action::Set as i32,
            });
        }
    }
    ObservableTransaction {
        changes,
        id: 0,
        acknowledged: 0,
    }
}

fn apply_transaction(graph: &NodeGraph, transaction: &ObservableTransaction) {
    let Some(root) = graph.root() else {
        tracing::warn!("bridge write with no root installed");
        return;
    };
    for change in &transaction.changes {
        let (action, address, value) = thalamus_proto::convert::change_from_wire(change);
        let result = match action {
            Action::Set => jsonpath::set(&root, address, value, true),
            Action::Delete => jsonpath::delete(&root, address, true),
        };
        if let Err(e) = result {
            tracing::warn!(address, error = %e, "bridge change failed to apply");
        }
    }
}

/// Spans plus packed data back into per-channel buffers.
fn unpack_channels(response: &AnalogResponse) -> (Vec<Vec<f64>>, Vec<std::time::Duration>, Vec<String>) {
    let mut channels = Vec::with_capacity(response.spans.len());
    let mut names = Vec::with_capacity(response.spans.len());
    for span in &response.spans {
        let begin = (span.begin as usize).min(response.data.len());
        let end = (span.end as usize).min(response.data.len());
        channels.push(response.data[begin.min(end)..end].to_vec());
        names.push(span.name.clone());
    }
    let intervals = response
        .sample_intervals
        .iter()
        .map(|ns| std::time::Duration::from_nanos(*ns))
        .collect();
    (channels, intervals, names)
}

#[tonic::async_trait]
impl Thalamus for ThalamusService {
    async fn get_type_name(
        &self,
        request: Request<StringMessage>,
    ) -> Result<Response<StringMessage>, Status> {
        let tag = request.into_inner().value;
        let tag2 = tag.clone();
        let name = self
            .with_graph(move |graph| graph.type_name(&tag2))
            .await?;
        match name {
            Some(value) => Ok(Response::new(StringMessage { value })),
            None => Err(Status::not_found(format!("unknown node type '{}'", tag))),
        }
    }

    async fn get_modalities(
        &self,
        request: Request<NodeSelector>,
    ) -> Result<Response<ModalitiesMessage>, Status> {
        let selector = Selector::from(&request.into_inner());
        let modalities = self
            .with_graph(move |graph| {
                graph
                    .get_node(&selector)
                    .map(|node| node.modalities().bits())
            })
            .await?;
        match modalities {
            Some(modalities) => Ok(Response::new(ModalitiesMessage { modalities })),
            None => Err(Status::not_found("no matching node")),
        }
    }

    async fn get_recommended_channels(
        &self,
        request: Request<NodeSelector>,
    ) -> Result<Response<StringListMessage>, Status> {
        let selector = Selector::from(&request.into_inner());
        let channels = self
            .with_graph(move |graph| {
                graph.get_node(&selector).map(|node| {
                    analog_view(&*node)
                        .map(|analog| analog.recommended_channels())
                        .unwrap_or_default()
                })
            })
            .await?;
        match channels {
            Some(values) => Ok(Response::new(StringListMessage { values })),
            None => Err(Status::not_found("no matching node")),
        }
    }

    async fn node_request(
        &self,
        request: Request<NodeRequest>,
    ) -> Result<Response<NodeResponse>, Status> {
        let req = request.into_inner();
        let payload: serde_json::Value = serde_json::from_str(&req.json)
            .map_err(|e| Status::invalid_argument(format!("bad request JSON: {}", e)))?;
        let result = self
            .with_graph(move |graph| {
                let node = graph
                    .get_node_by_name(&req.node)
                    .ok_or_else(|| format!("no node named '{}'", req.node))?;
                node.process(&payload).map_err(|e| e.to_string())
            })
            .await?;
        match result {
            Ok(value) => Ok(Response::new(NodeResponse {
                json: value.to_string(),
            })),
            Err(message) => Err(Status::failed_precondition(message)),
        }
    }

    async fn replay(
        &self,
        request: Request<ReplayRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let filename = req.filename.clone();
        let records = tokio::task::spawn_blocking(move || read_record_log(&filename))
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .map_err(|e| Status::not_found(e.to_string()))?;

        let only = req.nodes;
        self.with_graph(move |graph| {
            for record in records {
                if !only.is_empty() && !only.contains(&record.node) {
                    continue;
                }
                replay_record(graph, &record);
            }
        })
        .await?;
        Ok(Response::new(Empty {}))
    }

    async fn observable_bridge_write(
        &self,
        request: Request<ObservableTransaction>,
    ) -> Result<Response<Empty>, Status> {
        let transaction = request.into_inner();
        self.with_graph(move |graph| apply_transaction(graph, &transaction))
            .await?;
        Ok(Response::new(Empty {}))
    }

    type GraphStream = UnboundedReceiverStream<Result<GraphResponse, Status>>;

    async fn graph(
        &self,
        _request: Request<GraphRequest>,
    ) -> Result<Response<Self::GraphStream>, Status> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.io.post(move |graph| {
            let _ = tx.send(Ok(GraphResponse {
                nodes: graph.node_infos(),
            }));
            let nodes = graph.nodes_state();
            let guard: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
            let guard2 = Rc::clone(&guard);
            let graph2 = graph.clone();
            let connection = nodes.changed.connect(move |_| {
                let snapshot = GraphResponse {
                    nodes: graph2.node_infos(),
                };
                if tx.send(Ok(snapshot)).is_err() {
                    guard2.borrow_mut().take();
                }
            });
            *guard.borrow_mut() = Some(connection);
        });
        Ok(Response::new(UnboundedReceiverStream::new(rx)))
    }

    type AnalogStream = ReceiverStream<Result<AnalogResponse, Status>>;

    async fn analog(
        &self,
        request: Request<AnalogRequest>,
    ) -> Result<Response<Self::AnalogStream>, Status> {
        let selector = request
            .into_inner()
            .node
            .as_ref()
            .map(Selector::from)
            .ok_or_else(|| Status::invalid_argument("missing node selector"))?;
        Ok(Response::new(self.subscribe_ready(selector, build_analog)))
    }

    type ChannelInfoStream = ReceiverStream<Result<AnalogResponse, Status>>;

    async fn channel_info(
        &self,
        request: Request<AnalogRequest>,
    ) -> Result<Response<Self::ChannelInfoStream>, Status> {
        let selector = request
            .into_inner()
            .node
            .as_ref()
            .map(Selector::from)
            .ok_or_else(|| Status::invalid_argument("missing node selector"))?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        self.io.post(move |graph| {
            let lookup_guard: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
            let lookup_guard2 = Rc::clone(&lookup_guard);
            let connection = graph.get_node_scoped(selector, move |weak| {
                let Some(node) = weak.upgrade() else {
                    return;
                };
                // Names and intervals now, and again on every channel
                // layout change.
                if let Some(info) = build_channel_info(&*node) {
                    let _ = tx.try_send(Ok(info));
                }
                let Some(analog) = analog_view(&*node) else {
                    return;
                };
                let tx = tx.clone();
                let guard: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
                let guard2 = Rc::clone(&guard);
                let node_weak = Rc::downgrade(&node);
                let channels_connection = analog.channels_changed().connect(move |_| {
                    let Some(node) = node_weak.upgrade() else {
                        return;
                    };
                    let Some(info) = build_channel_info(&*node) else {
                        return;
                    };
                    if matches!(
                        tx.try_send(Ok(info)),
                        Err(mpsc::error::TrySendError::Closed(_))
                    ) {
                        guard2.borrow_mut().take();
                    }
                });
                *guard.borrow_mut() = Some(channels_connection);
                lookup_guard2.borrow_mut().take();
            });
            *lookup_guard.borrow_mut() = Some(connection);
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type XsensStream = ReceiverStream<Result<XsensResponse, Status>>;

    async fn xsens(
        &self,
        request: Request<NodeSelector>,
    ) -> Result<Response<Self::XsensStream>, Status> {
        let selector = Selector::from(&request.into_inner());
        Ok(Response::new(self.subscribe_ready(selector, build_xsens)))
    }

    type ImageStream = ReceiverStream<Result<Image, Status>>;

    async fn image(
        &self,
        request: Request<ImageRequest>,
    ) -> Result<Response<Self::ImageStream>, Status> {
        let selector = request
            .into_inner()
            .node
            .as_ref()
            .map(Selector::from)
            .ok_or_else(|| Status::invalid_argument("missing node selector"))?;
        Ok(Response::new(self.subscribe_ready(selector, build_image)))
    }

    type LogoutStream = UnboundedReceiverStream<Result<Text, Status>>;

    async fn logout(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::LogoutStream>, Status> {
        Ok(Response::new(
            self.subscribe_broadcast(|graph| graph.log_signal()),
        ))
    }

    type NotificationStream = UnboundedReceiverStream<Result<Notification, Status>>;

    async fn notification(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::NotificationStream>, Status> {
        Ok(Response::new(
            self.subscribe_broadcast(|graph| graph.notification_signal()),
        ))
    }

    async fn events(
        &self,
        request: Request<Streaming<Event>>,
    ) -> Result<Response<Empty>, Status> {
        let mut stream = request.into_inner();
        while let Some(event) = stream.message().await? {
            self.io.post(move |graph| graph.emit_event(event));
        }
        Ok(Response::new(Empty {}))
    }

    async fn log(&self, request: Request<Streaming<Text>>) -> Result<Response<Empty>, Status> {
        let mut stream = request.into_inner();
        while let Some(text) = stream.message().await? {
            self.io.post(move |graph| graph.emit_log(text));
        }
        Ok(Response::new(Empty {}))
    }

    async fn inject_analog(
        &self,
        request: Request<Streaming<InjectAnalogRequest>>,
    ) -> Result<Response<Empty>, Status> {
        let mut stream = request.into_inner();
        while let Some(inject) = stream.message().await? {
            let Some(signal) = inject.signal else {
                continue;
            };
            let node = inject.node;
            self.io.post(move |graph| {
                let Some(target) = graph.get_node_by_name(&node) else {
                    tracing::warn!(node = %node, "inject target not found");
                    return;
                };
                let Some(analog) = analog_view(&*target) else {
                    tracing::warn!(node = %node, "inject target is not analog");
                    return;
                };
                let (channels, intervals, names) = unpack_channels(&signal);
                if let Err(e) = analog.inject(channels, intervals, names) {
                    tracing::warn!(node = %node, error = %e, "inject rejected");
                }
            });
        }
        Ok(Response::new(Empty {}))
    }

    type ObservableBridgeV2Stream = UnboundedReceiverStream<Result<ObservableTransaction, Status>>;

    async fn observable_bridge_v2(
        &self,
        request: Request<Streaming<ObservableTransaction>>,
    ) -> Result<Response<Self::ObservableBridgeV2Stream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::unbounded_channel();

        // Recap plus ongoing echo of every tree change, the originator
        // included: the echo is what makes a mirrored client's deferred
        // writes visible.
        let tx_changes = tx.clone();
        self.io.post(move |graph| {
            let Some(root) = graph.root() else {
                tracing::warn!("bridge opened with no root installed");
                return;
            };
            let _ = tx_changes.send(Ok(recap_transaction(&root)));
            let Some(map) = root.as_map() else {
                return;
            };
            let guard: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
            let guard2 = Rc::clone(&guard);
            let tx_changes2 = tx_changes.clone();
            let connection = map.recursive_changed.connect(move |ev| {
                let address = format!("{}{}", ev.origin.address(), ev.key.address_segment());
                let change = thalamus_proto::ObservableChange {
                    address,
                    value: ev.value.to_json().to_string(),
                    action: observable_change::Action::from(ev.action) as i32,
                };
                let transaction = ObservableTransaction {
                    changes: vec![change],
                    id: 0,
                    acknowledged: 0,
                };
                if tx_changes2.send(Ok(transaction)).is_err() {
                    guard2.borrow_mut().take();
                }
            });
            *guard.borrow_mut() = Some(connection);
        });

        // Inbound transactions apply on the io executor; the ack is sent
        // from the same post, so acks leave in issue order.
        let io = self.io.clone();
        tokio::spawn(async move {
            loop {
                match inbound.message().await {
                    Ok(Some(transaction)) => {
                        if transaction.changes.is_empty() {
                            // Pure acknowledgement from the peer.
                            continue;
                        }
                        let tx = tx.clone();
                        io.post(move |graph| {
                            apply_transaction(graph, &transaction);
                            if transaction.id != 0 {
                                let _ = tx.send(Ok(ObservableTransaction {
                                    changes: Vec::new(),
                                    id: 0,
                                    acknowledged: transaction.id,
                                }));
                            }
                        });
                    }
                    Ok(None) => break,
                    Err(status) => {
                        tracing::info!(%status, "bridge stream closed");
                        break;
                    }
                }
            }
        });

        Ok(Response::new(UnboundedReceiverStream::new(rx)))
    }

    type PingStream = ReceiverStream<Result<Pong, Status>>;

    async fn ping(
        &self,
        request: Request<Streaming<Ping>>,
    ) -> Result<Response<Self::PingStream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            while let Ok(Some(ping)) = inbound.message().await {
                let pong = Pong {
                    id: ping.id,
                    payload: ping.payload,
                };
                if tx.send(Ok(pong)).await.is_err() {
                    break;
                }
            }
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type RemoteNodeStream = UnboundedReceiverStream<Result<RemoteNodeMessage, Status>>;

    async fn remote_node(
        &self,
        request: Request<Streaming<RemoteNodeMessage>>,
    ) -> Result<Response<Self::RemoteNodeStream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::unbounded_channel();
        let io = self.io.clone();
        tokio::spawn(async move {
            while let Ok(Some(message)) = inbound.message().await {
                let Some(remote_node_message::Content::Request(call)) = message.content else {
                    continue;
                };
                let id = message.id;
                let tx = tx.clone();
                io.post(move |graph| {
                    let reply = dispatch_process(graph, &call.node, &call.json);
                    let _ = tx.send(Ok(RemoteNodeMessage {
                        id,
                        content: Some(remote_node_message::Content::Response(
                            remote_node_message::Response { json: reply },
                        )),
                    }));
                });
            }
        });
        Ok(Response::new(UnboundedReceiverStream::new(rx)))
    }

    type StimStream = UnboundedReceiverStream<Result<StimResponse, Status>>;

    async fn stim(
        &self,
        request: Request<Streaming<StimRequest>>,
    ) -> Result<Response<Self::StimStream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::unbounded_channel();
        let io = self.io.clone();
        tokio::spawn(async move {
            while let Ok(Some(stim_request)) = inbound.message().await {
                let tx = tx.clone();
                io.post(move |graph| {
                    let id = stim_request.id;
                    let selector = stim_request
                        .node
                        .as_ref()
                        .map(Selector::from)
                        .unwrap_or_else(|| Selector::node_type("STIM_PRINTER".to_string()));
                    let Some(node) = graph.get_node(&selector) else {
                        let _ = tx.send(Ok(StimResponse {
                            id,
                            error: "no matching stim node".to_string(),
                            declaration: None,
                        }));
                        return;
                    };
                    let Some(stim) = stim_view(&*node) else {
                        let _ = tx.send(Ok(StimResponse {
                            id,
                            error: "node has no stim capability".to_string(),
                            declaration: None,
                        }));
                        return;
                    };
                    let future = stim.stim(stim_request);
                    tokio::task::spawn_local(async move {
                        let response = future.await;
                        let _ = tx.send(Ok(response));
                    });
                });
            }
        });
        Ok(Response::new(UnboundedReceiverStream::new(rx)))
    }
}

fn dispatch_process(graph: &NodeGraph, node: &str, json: &str) -> String {
    let payload: serde_json::Value = match serde_json::from_str(json) {
        Ok(payload) => payload,
        Err(e) => return serde_json::json!({"error": format!("bad JSON: {}", e)}).to_string(),
    };
    let Some(target) = graph.get_node_by_name(node) else {
        return serde_json::json!({"error": format!("no node named '{}'", node)}).to_string();
    };
    match target.process(&payload) {
        Ok(value) => value.to_string(),
        Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
    }
}

fn read_record_log(path: &str) -> std::io::Result<Vec<StorageRecord>> {
    let file = std::fs::File::open(path)?;
    let mut reader = thalamus_proto::framing::FrameReader::new(std::io::BufReader::new(file));
    let mut records = Vec::new();
    while let Some(record) = reader.next_message::<StorageRecord>()? {
        records.push(record);
    }
    Ok(records)
}

/// Replays one record into the matching node. Analog and text records
/// inject; motion and image replay is not supported by the derived nodes
/// and is skipped with a log line.
fn replay_record(graph: &NodeGraph, record: &StorageRecord) {
    use thalamus_proto::storage_record::Body;
    let Some(body) = &record.body else {
        return;
    };
    let Some(node) = graph.get_node_by_name(&record.node) else {
        return;
    };
    match body {
        Body::Analog(response) => {
            if let Some(analog) = analog_view(&*node) {
                let (channels, intervals, names) = unpack_channels(response);
                if let Err(e) = analog.inject(channels, intervals, names) {
                    tracing::warn!(node = %record.node, error = %e, "analog replay rejected");
                }
            }
        }
        Body::Text(text) => {
            if text_view(&*node).is_some() {
                if let Err(e) = node.process(&serde_json::Value::String(text.text.clone())) {
                    tracing::warn!(node = %record.node, error = %e, "text replay rejected");
                }
            }
        }
        Body::Xsens(_) | Body::Image(_) => {
            tracing::warn!(node = %record.node, "motion/image replay is not supported");
        }
        Body::Event(_) | Body::Compressed(_) => {}
    }
}
