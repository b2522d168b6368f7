//! Remote node mirror and link probe.
//!
//! Mirrors a named node on another server by subscribing to its analog
//! and motion streams, and measures the link with a fixed-size ping/pong
//! probe. Channel 0 (`Ping`) carries the observed round trip in
//! milliseconds, channel 1 (`Bytes Per Second`) the probe throughput over
//! the last second, and the mirrored channels follow.

use crate::analog::{AnalogNode, AnalogSpan};
use crate::clock;
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, TypedNode};
use crate::motion::{MotionCaptureNode, MotionOutput, MotionSegment, SegmentSpan};
use crate::node::{Modalities, Node};
use crate::nodes::recap_map;
use prost::Message;
use rand::RngCore;
use std::cell::{Cell, Ref, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};
use thalamus_proto::thalamus_client::ThalamusClient;
use thalamus_proto::{AnalogRequest, AnalogResponse, NodeSelector, Ping, XsensResponse};
use thalamus_state::{Connection, ObservableMapHandle, RecursiveChangeEvent, Signal};
use tokio_stream::wrappers::ReceiverStream;

const PING_CHANNEL: usize = 0;
const BPS_CHANNEL: usize = 1;
const RESERVED_CHANNELS: usize = 2;

enum Update {
    Ping(f64),
    BytesPerSecond(f64),
    Analog(AnalogResponse),
    Xsens(XsensResponse),
}

struct RemoteState {
    channels: Vec<Vec<f64>>,
    intervals: Vec<Duration>,
    names: Vec<String>,
    time: Duration,
    remote_time: Duration,
    address: String,
    node_name: String,
    probe_interval: Duration,
    probe_size: usize,
}

pub struct RemoteNode {
    ready: Signal<()>,
    channels_changed: Signal<()>,
    graph: NodeGraphWeak,
    state: ObservableMapHandle,
    inner: RefCell<RemoteState>,
    motion: MotionOutput,
    has_analog: Cell<bool>,
    has_motion: Cell<bool>,
    weak_self: Weak<RemoteNode>,
    network_task: RefCell<Option<tokio::task::JoinHandle<()>>>,
    local_task: RefCell<Option<tokio::task::JoinHandle<()>>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl RemoteNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        let Some(key) = ev.key.as_str() else {
            return;
        };
        match key {
            "Address" => {
                if let Some(v) = ev.value.as_str() {
                    self.inner.borrow_mut().address = v.trim().to_string();
                }
            }
            "Node" => {
                if let Some(v) = ev.value.as_str() {
                    self.inner.borrow_mut().node_name = v.trim().to_string();
                }
            }
            "Probe Frequency" => {
                if let Some(hz) = ev.value.as_f64() {
                    if hz > 0.0 {
                        self.inner.borrow_mut().probe_interval =
                            Duration::from_secs_f64(1.0 / hz);
                    }
                }
            }
            "Probe Size" => {
                if let Some(v) = ev.value.as_int() {
                    self.inner.borrow_mut().probe_size = v.max(0) as usize;
                }
            }
            "Running" => {
                if ev.value.as_bool().unwrap_or(false) {
                    self.start();
                } else {
                    self.stop();
                }
            }
            _ => {}
        }
    }

    fn start(&self) {
        self.stop();
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        let Some(runtime) = graph.runtime() else {
            tracing::warn!("remote node requires a network runtime");
            return;
        };
        let (address, node_name, probe_interval, probe_size) = {
            let inner = self.inner.borrow();
            (
                inner.address.clone(),
                inner.node_name.clone(),
                inner.probe_interval,
                inner.probe_size,
            )
        };
        if address.is_empty() || node_name.is_empty() {
            tracing::warn!("remote node needs both Address and Node");
            return;
        }
        let channel = match graph.channel(&address) {
            Ok(channel) => channel,
            Err(e) => {
                tracing::error!(address = %address, error = %e, "remote address rejected");
                return;
            }
        };

        // Updates flow from the network task into an io-local drain task,
        // which applies them to the node and fires `ready`.
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Update>();
        let weak = self.weak_self.clone();
        let local = tokio::task::spawn_local(async move {
            while let Some(update) = rx.recv().await {
                let Some(node) = weak.upgrade() else {
                    break;
                };
                node.apply_update(update);
            }
        });
        *self.local_task.borrow_mut() = Some(local);

        let network = runtime.spawn(probe_target(
            channel,
            node_name,
            probe_interval,
            probe_size,
            tx,
        ));
        *self.network_task.borrow_mut() = Some(network);
    }

    fn stop(&self) {
        if let Some(task) = self.network_task.borrow_mut().take() {
            task.abort();
        }
        if let Some(task) = self.local_task.borrow_mut().take() {
            task.abort();
        }
    }

    fn apply_update(&self, update: Update) {
        match update {
            Update::Ping(rtt_ms) => {
                {
                    let mut inner = self.inner.borrow_mut();
                    if inner.channels.len() < RESERVED_CHANNELS {
                        inner.channels.resize(RESERVED_CHANNELS, Vec::new());
                    }
                    inner.channels[PING_CHANNEL] = vec![rtt_ms];
                    inner.time = clock::steady_now();
                }
                self.emit_analog();
            }
            Update::BytesPerSecond(bps) => {
                {
                    let mut inner = self.inner.borrow_mut();
                    if inner.channels.len() < RESERVED_CHANNELS {
                        inner.channels.resize(RESERVED_CHANNELS, Vec::new());
                    }
                    inner.channels[BPS_CHANNEL] = vec![bps];
                    inner.time = clock::steady_now();
                }
                self.emit_analog();
            }
            Update::Analog(response) => {
                let renamed = {
                    let mut inner = self.inner.borrow_mut();
                    let expected = response.spans.len() + RESERVED_CHANNELS;
                    let renamed = inner.names.len() != expected
                        || response
                            .spans
                            .iter()
                            .zip(inner.names.iter().skip(RESERVED_CHANNELS))
                            .any(|(span, name)| &span.name != name);

                    inner.channels.truncate(RESERVED_CHANNELS);
                    inner.intervals.truncate(RESERVED_CHANNELS);
                    inner.names.truncate(RESERVED_CHANNELS);
                    for span in &response.spans {
                        let begin = span.begin as usize;
                        let end = (span.end as usize).min(response.data.len());
                        inner
                            .channels
                            .push(response.data[begin.min(end)..end].to_vec());
                        inner.names.push(span.name.clone());
                    }
                    for interval in &response.sample_intervals {
                        inner.intervals.push(Duration::from_nanos(*interval));
                    }
                    while inner.intervals.len() < inner.channels.len() {
                        inner.intervals.push(Duration::ZERO);
                    }
                    inner.time = clock::steady_now();
                    inner.remote_time = Duration::from_nanos(response.time);
                    renamed
                };
                if renamed {
                    self.channels_changed.emit(&());
                }
                self.emit_analog();
            }
            Update::Xsens(response) => {
                let segments = response
                    .segments
                    .iter()
                    .map(MotionSegment::from_wire)
                    .collect();
                self.motion.publish(segments, response.pose_name);
                self.has_motion.set(true);
                self.ready.emit(&());
                self.has_motion.set(false);
            }
        }
    }

    fn emit_analog(&self) {
        self.has_analog.set(true);
        self.ready.emit(&());
        self.has_analog.set(false);
    }
}

/// Network side of the mirror: three streams plus the probe clock.
async fn probe_target(
    channel: tonic::transport::Channel,
    node_name: String,
    probe_interval: Duration,
    probe_size: usize,
    tx: tokio::sync::mpsc::UnboundedSender<Update>,
) {
    let mut analog_client = ThalamusClient::new(channel.clone());
    let mut xsens_client = ThalamusClient::new(channel.clone());
    let mut ping_client = ThalamusClient::new(channel);

    let selector = NodeSelector {
        name: node_name.clone(),
        r#type: String::new(),
    };

    let mut analog_stream = match analog_client
        .analog(AnalogRequest {
            node: Some(selector.clone()),
        })
        .await
    {
        Ok(response) => response.into_inner(),
        Err(status) => {
            tracing::warn!(%status, "analog stream failed");
            return;
        }
    };
    let mut xsens_stream = match xsens_client.xsens(selector).await {
        Ok(response) => Some(response.into_inner()),
        Err(status) => {
            tracing::info!(%status, "xsens stream unavailable");
            None
        }
    };

    let (ping_tx, ping_rx) = tokio::sync::mpsc::channel::<Ping>(16);
    let mut pong_stream = match ping_client.ping(ReceiverStream::new(ping_rx)).await {
        Ok(response) => response.into_inner(),
        Err(status) => {
            tracing::warn!(%status, "ping stream failed");
            return;
        }
    };

    let mut ticker = tokio::time::interval(probe_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut next_id = 0u32;
    let mut in_flight: HashMap<u32, Instant> = HashMap::new();
    let mut transfers: VecDeque<(Instant, u64)> = VecDeque::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                next_id = next_id.wrapping_add(1);
                let mut payload = vec![0u8; probe_size];
                rand::thread_rng().fill_bytes(&mut payload);
                let ping = Ping { id: next_id, payload };
                let now = Instant::now();
                transfers.push_back((now, ping.encoded_len() as u64));
                in_flight.insert(next_id, now);
                if ping_tx.send(ping).await.is_err() {
                    break;
                }
                let bps = window_rate(&mut transfers, now);
                if tx.send(Update::BytesPerSecond(bps)).is_err() {
                    break;
                }
            }
            pong = pong_stream.message() => {
                match pong {
                    Ok(Some(pong)) => {
                        let now = Instant::now();
                        transfers.push_back((now, pong.encoded_len() as u64));
                        if let Some(sent) = in_flight.remove(&pong.id) {
                            let rtt_ms = now.duration_since(sent).as_secs_f64() * 1e3;
                            if tx.send(Update::Ping(rtt_ms)).is_err() {
                                break;
                            }
                        }
                        let bps = window_rate(&mut transfers, now);
                        if tx.send(Update::BytesPerSecond(bps)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(status) => {
                        tracing::info!(%status, "ping stream closed");
                        break;
                    }
                }
            }
            analog = analog_stream.message() => {
                match analog {
                    Ok(Some(response)) => {
                        if tx.send(Update::Analog(response)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(status) => {
                        tracing::info!(%status, "analog stream closed");
                        break;
                    }
                }
            }
            xsens = maybe_message(&mut xsens_stream) => {
                match xsens {
                    Some(response) => {
                        if tx.send(Update::Xsens(response)).is_err() {
                            break;
                        }
                    }
                    None => {
                        xsens_stream = None;
                    }
                }
            }
        }
    }
}

/// Next motion frame, or pend forever when the stream is absent.
async fn maybe_message(
    stream: &mut Option<tonic::codec::Streaming<XsensResponse>>,
) -> Option<XsensResponse> {
    match stream {
        Some(stream) => match stream.message().await {
            Ok(Some(response)) => Some(response),
            _ => None,
        },
        None => std::future::pending().await,
    }
}

/// Probe bytes observed over the trailing second, as bytes per second.
fn window_rate(transfers: &mut VecDeque<(Instant, u64)>, now: Instant) -> f64 {
    let window = Duration::from_secs(1);
    while let Some((t, _)) = transfers.front() {
        if now.duration_since(*t) > window {
            transfers.pop_front();
        } else {
            break;
        }
    }
    transfers.iter().map(|(_, b)| *b).sum::<u64>() as f64
}

impl Node for RemoteNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::ANALOG | Modalities::MOTION
    }

    fn as_analog(&self) -> Option<&dyn AnalogNode> {
        Some(self)
    }

    fn as_motion(&self) -> Option<&dyn MotionCaptureNode> {
        Some(self)
    }
}

impl AnalogNode for RemoteNode {
    fn channels_changed(&self) -> &Signal<()> {
        &self.channels_changed
    }

    fn num_channels(&self) -> usize {
        self.inner.borrow().channels.len()
    }

    fn data(&self, channel: usize) -> AnalogSpan<'_> {
        Ref::map(self.inner.borrow(), |inner| {
            inner.channels[channel].as_slice()
        })
    }

    fn sample_interval(&self, channel: usize) -> Duration {
        self.inner
            .borrow()
            .intervals
            .get(channel)
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    fn time(&self) -> Duration {
        self.inner.borrow().time
    }

    fn remote_time(&self) -> Duration {
        self.inner.borrow().remote_time
    }

    fn name(&self, channel: usize) -> String {
        self.inner
            .borrow()
            .names
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    fn recommended_channels(&self) -> Vec<String> {
        self.inner.borrow().names.clone()
    }

    fn has_analog_data(&self) -> bool {
        self.has_analog.get()
    }

    fn inject(
        &self,
        channels: Vec<Vec<f64>>,
        sample_intervals: Vec<Duration>,
        names: Vec<String>,
    ) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.channels = channels;
            inner.intervals = sample_intervals;
            inner.names = names;
            inner.time = clock::steady_now();
        }
        self.emit_analog();
        Ok(())
    }
}

impl MotionCaptureNode for RemoteNode {
    fn segments(&self) -> SegmentSpan<'_> {
        self.motion.segments()
    }

    fn pose_name(&self) -> String {
        self.motion.pose_name()
    }

    fn time(&self) -> Duration {
        self.motion.time()
    }

    fn has_motion_data(&self) -> bool {
        self.has_motion.get()
    }

    fn inject(&self, segments: Vec<MotionSegment>) -> Result<()> {
        self.motion.publish(segments, String::new());
        self.has_motion.set(true);
        self.ready.emit(&());
        self.has_motion.set(false);
        Ok(())
    }
}

impl TypedNode for RemoteNode {
    const TYPE_NAME: &'static str = "REMOTE";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| RemoteNode {
            ready: Signal::new(),
            channels_changed: Signal::new(),
            graph: graph.downgrade(),
            state: state.clone(),
            inner: RefCell::new(RemoteState {
                channels: vec![Vec::new(), Vec::new()],
                intervals: vec![Duration::ZERO, Duration::ZERO],
                names: vec!["Ping".to_string(), "Bytes Per Second".to_string()],
                time: Duration::ZERO,
                remote_time: Duration::ZERO,
                address: String::new(),
                node_name: String::new(),
                probe_interval: Duration::from_millis(200),
                probe_size: 32,
            }),
            motion: MotionOutput::new(),
            has_analog: Cell::new(false),
            has_motion: Cell::new(false),
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

impl Drop for RemoteNode {
    fn drop(&mut self) {
        self.stop();
        if self.state.contains("Running") {
            self.state.assign("Running", false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{analog_view, motion_view};
    use thalamus_state::{ObservableList, ObservableMap};

    fn build() -> Rc<RemoteNode> {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(nodes, vec![]);
        RemoteNode::create(ObservableMap::new(), &graph).unwrap()
    }

    #[test]
    fn test_probe_channels_present() {
        let node = build();
        let analog = analog_view(&*node).unwrap();
        assert_eq!(analog.num_channels(), 2);
        assert_eq!(analog.name(0), "Ping");
        assert_eq!(analog.name(1), "Bytes Per Second");
    }

    #[test]
    fn test_ping_update_publishes_rtt() {
        let node = build();
        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        let has_data = Rc::new(Cell::new(false));
        let has_data2 = Rc::clone(&has_data);
        let weak = Rc::downgrade(&node);
        let _c = node.ready.connect(move |_| {
            fired2.set(fired2.get() + 1);
            let node = weak.upgrade().unwrap();
            has_data2.set(AnalogNode::has_analog_data(&*node));
        });

        node.apply_update(Update::Ping(2.5));
        assert_eq!(fired.get(), 1);
        // has_analog_data is only advertised inside the ready window.
        assert!(has_data.get());
        assert!(!AnalogNode::has_analog_data(&*node));
        let analog = analog_view(&*node).unwrap();
        assert_eq!(&*analog.data(0), &[2.5]);
    }

    #[test]
    fn test_analog_update_appends_remote_channels() {
        let node = build();
        let renames = Rc::new(Cell::new(0));
        let renames2 = Rc::clone(&renames);
        let _c = node.channels_changed.connect(move |_| {
            renames2.set(renames2.get() + 1);
        });

        node.apply_update(Update::Analog(AnalogResponse {
            data: vec![1.0, 2.0, 3.0],
            spans: vec![
                thalamus_proto::Span {
                    begin: 0,
                    end: 2,
                    name: "a".to_string(),
                },
                thalamus_proto::Span {
                    begin: 2,
                    end: 3,
                    name: "b".to_string(),
                },
            ],
            sample_intervals: vec![1_000_000, 2_000_000],
            time: 42,
            ..Default::default()
        }));

        assert_eq!(renames.get(), 1);
        let analog = analog_view(&*node).unwrap();
        assert_eq!(analog.num_channels(), 4);
        assert_eq!(&*analog.data(2), &[1.0, 2.0]);
        assert_eq!(&*analog.data(3), &[3.0]);
        assert_eq!(analog.name(2), "a");
        assert_eq!(analog.sample_interval(3), Duration::from_millis(2));
        assert_eq!(analog.remote_time(), Duration::from_nanos(42));

        // Same shape again: no rename notification.
        node.apply_update(Update::Analog(AnalogResponse {
            data: vec![9.0, 9.0, 9.0],
            spans: vec![
                thalamus_proto::Span {
                    begin: 0,
                    end: 2,
                    name: "a".to_string(),
                },
                thalamus_proto::Span {
                    begin: 2,
                    end: 3,
                    name: "b".to_string(),
                },
            ],
            sample_intervals: vec![1_000_000, 2_000_000],
            time: 43,
            ..Default::default()
        }));
        assert_eq!(renames.get(), 1);
    }

    #[test]
    fn test_xsens_update_publishes_motion() {
        let node = build();
        node.apply_update(Update::Xsens(XsensResponse {
            segments: vec![thalamus_proto::Segment {
                id: 1,
                frame: 2,
                x: 1.0,
                ..Default::default()
            }],
            pose_name: "T".to_string(),
            time: 5,
        }));
        let motion = motion_view(&*node).unwrap();
        assert_eq!(motion.segments().len(), 1);
        assert_eq!(motion.pose_name(), "T");
    }

    #[test]
    fn test_window_rate() {
        let mut transfers = VecDeque::new();
        let base = Instant::now();
        transfers.push_back((base, 100));
        transfers.push_back((base + Duration::from_millis(500), 200));
        let rate = window_rate(&mut transfers, base + Duration::from_millis(900));
        assert_eq!(rate, 300.0);
        // The first transfer ages out of the window.
        let rate = window_rate(&mut transfers, base + Duration::from_millis(1600));
        assert_eq!(rate, 200.0);
    }
}
