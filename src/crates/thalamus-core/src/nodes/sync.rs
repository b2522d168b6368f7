//! Inter-stream lag measurement.
//!
//! Each configured pair watches one channel on each of two analog nodes.
//! THRESHOLD records the time of the next rising crossing on each stream
//! and emits `t1 - t2` once both crossings fall inside the window.
//! CROSS_CORRELATION buffers both streams for the window duration,
//! resamples the slower stream to the faster rate, and emits the argmax
//! lag of the discrete cross-correlation, in seconds.

use crate::analog::{reject_inject, AnalogNode, AnalogSpan};
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, Selector, TypedNode};
use crate::node::{analog_view, Modalities, Node};
use crate::nodes::{recap_list, recap_map};
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{
    Action, Collection, Connection, ObservableListHandle, ObservableMapHandle,
    RecursiveChangeEvent, Signal, Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Algorithm {
    Threshold,
    CrossCorrelation,
}

struct Side {
    node_name: String,
    channel_name: String,
    channel_index: Option<usize>,
    data: Vec<f64>,
    cross: Option<Duration>,
    start_time: Duration,
    sample_interval: Duration,
}

impl Side {
    fn new() -> Side {
        Side {
            node_name: String::new(),
            channel_name: String::new(),
            channel_index: None,
            data: Vec::new(),
            cross: None,
            start_time: Duration::ZERO,
            sample_interval: Duration::ZERO,
        }
    }
}

struct Pair {
    state: ObservableMapHandle,
    algorithm: Algorithm,
    threshold: f64,
    window: Duration,
    side1: Side,
    side2: Side,
    lag: f64,
    out_name: String,
}

impl Pair {
    fn new(state: ObservableMapHandle) -> Pair {
        Pair {
            state,
            algorithm: Algorithm::Threshold,
            threshold: 1.6,
            window: Duration::from_millis(500),
            side1: Side::new(),
            side2: Side::new(),
            lag: 0.0,
            out_name: String::new(),
        }
    }

    fn refresh_name(&mut self) {
        self.out_name = format!(
            "{}[{}]-{}[{}]",
            self.side1.node_name,
            self.side1.channel_name,
            self.side2.node_name,
            self.side2.channel_name
        );
    }
}

pub struct SyncNode {
    ready: Signal<()>,
    channels_changed: Signal<()>,
    graph: NodeGraphWeak,
    weak_self: Weak<SyncNode>,
    pairs: RefCell<Vec<Pair>>,
    pairs_state: RefCell<Option<ObservableListHandle>>,
    time: Cell<Duration>,
    lags: RefCell<Vec<f64>>,
    connections: RefCell<HashMap<String, (Connection, Connection)>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl SyncNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        let is_pairs_state = self
            .pairs_state
            .borrow()
            .as_ref()
            .map(|list| ev.origin.is_list(list))
            .unwrap_or(false);

        if is_pairs_state {
            self.on_pairs_change(ev);
            return;
        }

        if let Some("Pairs") = ev.key.as_str() {
            if let Some(list) = ev.value.as_list() {
                *self.pairs_state.borrow_mut() = Some(list.clone());
                if let Some(node) = self.weak_self.upgrade() {
                    recap_list(list, move |ev| node.on_change(ev));
                }
                return;
            }
        }

        // A key on one of the pair dictionaries.
        if let Collection::Map(origin) = &ev.origin {
            self.on_pair_key(origin, ev);
        }
    }

    fn on_pairs_change(&self, ev: &RecursiveChangeEvent) {
        let Some(index) = ev.key.as_int() else {
            return;
        };
        let index = index as usize;
        match ev.action {
            Action::Set => {
                let Some(entry) = ev.value.as_map() else {
                    return;
                };
                {
                    let mut pairs = self.pairs.borrow_mut();
                    if pairs.len() <= index {
                        while pairs.len() <= index {
                            pairs.push(Pair::new(entry.clone()));
                        }
                    } else {
                        pairs[index] = Pair::new(entry.clone());
                    }
                }
                if let Some(node) = self.weak_self.upgrade() {
                    recap_map(entry, move |entry_ev| node.on_change(entry_ev));
                }
                self.channels_changed.emit(&());
            }
            Action::Delete => {
                let mut pairs = self.pairs.borrow_mut();
                if index < pairs.len() {
                    pairs.remove(index);
                }
                drop(pairs);
                self.channels_changed.emit(&());
            }
        }
    }

    fn on_pair_key(&self, origin: &ObservableMapHandle, ev: &RecursiveChangeEvent) {
        let Some(key) = ev.key.as_str() else {
            return;
        };
        let index = {
            let pairs = self.pairs.borrow();
            pairs.iter().position(|p| Rc::ptr_eq(&p.state, origin))
        };
        let Some(index) = index else {
            return;
        };

        match key {
            "Node1" | "Node2" => {
                let Some(name) = ev.value.as_str().map(str::to_string) else {
                    return;
                };
                {
                    let mut pairs = self.pairs.borrow_mut();
                    let pair = &mut pairs[index];
                    if key == "Node1" {
                        pair.side1.node_name = name.clone();
                    } else {
                        pair.side2.node_name = name.clone();
                    }
                    pair.refresh_name();
                }
                self.subscribe(name);
            }
            "Channel1" => {
                if let Some(name) = ev.value.as_str() {
                    let mut pairs = self.pairs.borrow_mut();
                    pairs[index].side1.channel_name = name.to_string();
                    pairs[index].side1.channel_index = None;
                    pairs[index].refresh_name();
                }
            }
            "Channel2" => {
                if let Some(name) = ev.value.as_str() {
                    let mut pairs = self.pairs.borrow_mut();
                    pairs[index].side2.channel_name = name.to_string();
                    pairs[index].side2.channel_index = None;
                    pairs[index].refresh_name();
                }
            }
            "Threshold" => {
                if let Some(v) = ev.value.as_f64() {
                    self.pairs.borrow_mut()[index].threshold = v;
                }
            }
            "Window" => {
                if let Some(v) = ev.value.as_f64() {
                    self.pairs.borrow_mut()[index].window =
                        Duration::from_secs_f64(v.max(0.0));
                }
            }
            "Algorithm" => {
                if let Some(text) = ev.value.as_str() {
                    self.pairs.borrow_mut()[index].algorithm = match text {
                        "CROSS_CORRELATION" => Algorithm::CrossCorrelation,
                        _ => Algorithm::Threshold,
                    };
                }
            }
            _ => {}
        }
    }

    fn subscribe(&self, name: String) {
        if self.connections.borrow().contains_key(&name) {
            return;
        }
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        let weak = self.weak_self.clone();
        let name2 = name.clone();
        graph.get_node_async(Selector::name(name.clone()), move |source| {
            let Some(node) = weak.upgrade() else {
                return;
            };
            let Some(locked) = source.upgrade() else {
                return;
            };
            if analog_view(&*locked).is_none() {
                return;
            }

            let weak_node = Rc::downgrade(&node);
            let source2 = source.clone();
            let data_name = name2.clone();
            let ready_connection = locked.ready().connect(move |_| {
                let (Some(node), Some(locked)) = (weak_node.upgrade(), source2.upgrade()) else {
                    return;
                };
                if let Some(analog) = analog_view(&*locked) {
                    node.on_data(&data_name, analog);
                }
            });

            let weak_node = Rc::downgrade(&node);
            let channels_connection = analog_view(&*locked)
                .map(|analog| {
                    let name3 = name2.clone();
                    analog.channels_changed().connect(move |_| {
                        if let Some(node) = weak_node.upgrade() {
                            node.on_channels_changed(&name3);
                        }
                    })
                })
                .unwrap_or_else(Connection::empty);

            node.connections
                .borrow_mut()
                .insert(name2.clone(), (ready_connection, channels_connection));
        });
    }

    fn on_channels_changed(&self, _name: &str) {
        let mut pairs = self.pairs.borrow_mut();
        for pair in pairs.iter_mut() {
            pair.side1.channel_index = None;
            pair.side2.channel_index = None;
        }
    }

    fn on_data(&self, name: &str, analog: &dyn AnalogNode) {
        if !analog.has_analog_data() {
            return;
        }
        {
            let mut pairs = self.pairs.borrow_mut();
            for pair in pairs.iter_mut() {
                let algorithm = pair.algorithm;
                let threshold = pair.threshold;
                let window = pair.window;
                if pair.side1.node_name == name {
                    accumulate(&mut pair.side1, analog, threshold, algorithm);
                }
                if pair.side2.node_name == name {
                    accumulate(&mut pair.side2, analog, threshold, algorithm);
                }
                match algorithm {
                    Algorithm::Threshold => {
                        if let (Some(c1), Some(c2)) = (pair.side1.cross, pair.side2.cross) {
                            let diff = c1.as_secs_f64() - c2.as_secs_f64();
                            if diff.abs() < window.as_secs_f64() {
                                pair.lag = diff;
                            }
                        }
                    }
                    Algorithm::CrossCorrelation => {
                        correlate(pair, analog.time());
                    }
                }
            }
            let mut lags = self.lags.borrow_mut();
            lags.clear();
            lags.extend(pairs.iter().map(|p| p.lag));
        }
        self.time.set(analog.time());
        self.ready.emit(&());
    }
}

/// Feeds one side's buffers from a ready source.
fn accumulate(side: &mut Side, analog: &dyn AnalogNode, threshold: f64, algorithm: Algorithm) {
    if side.channel_index.is_none() {
        for i in 0..analog.num_channels() {
            let name = analog.name(i);
            if name == side.channel_name
                || side.channel_name.parse::<usize>() == Ok(i)
            {
                side.channel_index = Some(i);
                break;
            }
        }
    }
    let Some(channel) = side.channel_index else {
        return;
    };
    if channel >= analog.num_channels() {
        side.channel_index = None;
        return;
    }
    let data = analog.data(channel);
    if data.is_empty() {
        return;
    }
    side.sample_interval = analog.sample_interval(channel);
    let batch_duration = side.sample_interval * (data.len() as u32 - 1).max(0);
    let mut time = analog.time().saturating_sub(batch_duration);

    match algorithm {
        Algorithm::Threshold => {
            // Keep one trailing sample so an edge across batches is seen.
            let (mut last, start) = if side.data.is_empty() {
                (data[0], 1)
            } else {
                (side.data[side.data.len() - 1], 0)
            };
            for &sample in data.iter().skip(start) {
                if last < threshold && sample >= threshold && side.cross.is_none() {
                    side.cross = Some(time);
                }
                time += side.sample_interval;
                last = sample;
            }
            side.data.clear();
            side.data.push(last);
        }
        Algorithm::CrossCorrelation => {
            if side.data.is_empty() {
                side.start_time = time;
            }
            side.data.extend_from_slice(&data);
        }
    }
}

/// Cross-correlates the two windows once both are full, writing the lag
/// and clearing the buffers.
fn correlate(pair: &mut Pair, now: Duration) {
    let side1 = &pair.side1;
    let side2 = &pair.side2;
    if side1.data.is_empty() || side2.data.is_empty() {
        return;
    }
    let window1 = if side1.sample_interval > Duration::ZERO {
        side1.sample_interval * side1.data.len() as u32
    } else {
        now.saturating_sub(side1.start_time)
    };
    let window2 = if side2.sample_interval > Duration::ZERO {
        side2.sample_interval * side2.data.len() as u32
    } else {
        now.saturating_sub(side2.start_time)
    };
    if window1 <= pair.window || window2 <= pair.window {
        return;
    }

    let interval1 = effective_interval(side1, window1);
    let interval2 = effective_interval(side2, window2);

    let mut data1 = pair.side1.data.clone();
    let mut data2 = pair.side2.data.clone();
    let faster = interval1.min(interval2);
    if interval1 > interval2 {
        data1 = resample(&data1, interval1, faster);
    } else if interval2 > interval1 {
        data2 = resample(&data2, interval2, faster);
    }

    let mut best = 0.0;
    let mut best_lag = 0i64;
    for lag in -(data2.len() as i64 - 1)..data1.len() as i64 {
        let i = (-lag).max(0) as usize;
        let j = lag.max(0) as usize;
        let count = (data2.len() - i).min(data1.len() - j);
        let mut sum = 0.0;
        for k in 0..count {
            sum += data2[i + k] * data1[j + k];
        }
        if sum > best {
            best = sum;
            best_lag = lag;
        }
    }
    pair.lag = best_lag as f64 * faster.as_secs_f64();
    pair.side1.data.clear();
    pair.side2.data.clear();
}

fn effective_interval(side: &Side, window: Duration) -> Duration {
    if side.sample_interval > Duration::ZERO {
        side.sample_interval
    } else if !side.data.is_empty() {
        window / side.data.len() as u32
    } else {
        Duration::from_nanos(1)
    }
}

/// Nearest-sample resampling from `from` interval to `to` interval.
fn resample(data: &[f64], from: Duration, to: Duration) -> Vec<f64> {
    if data.is_empty() || to.is_zero() {
        return data.to_vec();
    }
    let total = from.as_secs_f64() * data.len() as f64;
    let count = (total / to.as_secs_f64()).round() as usize;
    let mut resampled = Vec::with_capacity(count);
    for k in 0..count {
        let t = k as f64 * to.as_secs_f64();
        let index = ((t / from.as_secs_f64()) as usize).min(data.len() - 1);
        resampled.push(data[index]);
    }
    resampled
}

impl Node for SyncNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::ANALOG
    }

    fn as_analog(&self) -> Option<&dyn AnalogNode> {
        Some(self)
    }
}

impl AnalogNode for SyncNode {
    fn channels_changed(&self) -> &Signal<()> {
        &self.channels_changed
    }

    fn num_channels(&self) -> usize {
        self.lags.borrow().len()
    }

    fn data(&self, channel: usize) -> AnalogSpan<'_> {
        Ref::map(self.lags.borrow(), |lags| {
            std::slice::from_ref(&lags[channel])
        })
    }

    fn sample_interval(&self, _channel: usize) -> Duration {
        Duration::ZERO
    }

    fn time(&self) -> Duration {
        self.time.get()
    }

    fn name(&self, channel: usize) -> String {
        self.pairs
            .borrow()
            .get(channel)
            .map(|p| p.out_name.clone())
            .unwrap_or_default()
    }

    fn inject(&self, _: Vec<Vec<f64>>, _: Vec<Duration>, _: Vec<String>) -> Result<()> {
        Err(reject_inject(Self::TYPE_NAME))
    }
}

impl TypedNode for SyncNode {
    const TYPE_NAME: &'static str = "SYNC";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| SyncNode {
            ready: Signal::new(),
            channels_changed: Signal::new(),
            graph: graph.downgrade(),
            weak_self: weak.clone(),
            pairs: RefCell::new(Vec::new()),
            pairs_state: RefCell::new(None),
            time: Cell::new(Duration::ZERO),
            lags: RefCell::new(Vec::new()),
            connections: RefCell::new(HashMap::new()),
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
    use crate::nodes::AnalogSourceNode;
    use thalamus_state::{ObservableList, ObservableMap};

    struct Fixture {
        graph: crate::graph::NodeGraph,
        sync: Rc<dyn Node>,
    }

    fn build(algorithm: &str, window: f64) -> Fixture {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![
                typed_factory::<AnalogSourceNode>(),
                typed_factory::<SyncNode>(),
            ],
        );
        for name in ["one", "two"] {
            let entry = ObservableMap::new();
            entry.assign("type", "ANALOG");
            entry.assign("name", name);
            nodes.push(Value::Map(entry));
        }

        let sync_state = ObservableMap::new();
        sync_state.assign("type", "SYNC");
        sync_state.assign("name", "sync");
        let pairs = ObservableList::new();
        let pair = ObservableMap::new();
        pair.assign("Node1", "one");
        pair.assign("Node2", "two");
        pair.assign("Channel1", "0");
        pair.assign("Channel2", "0");
        pair.assign("Threshold", 1.6);
        pair.assign("Window", window);
        pair.assign("Algorithm", algorithm);
        pairs.push(Value::Map(pair));
        sync_state.assign("Pairs", Value::List(pairs));
        nodes.push(Value::Map(sync_state));

        let sync = graph.get_node_by_name("sync").unwrap();
        Fixture { graph, sync }
    }

    fn inject_at(
        fixture: &Fixture,
        node_name: &str,
        samples: Vec<f64>,
        interval: Duration,
    ) {
        let node = fixture.graph.get_node_by_name(node_name).unwrap();
        analog_view(&*node)
            .unwrap()
            .inject(vec![samples], vec![interval], vec!["0".to_string()])
            .unwrap();
    }

    #[test]
    fn test_threshold_lag() {
        let fixture = build("THRESHOLD", 0.5);
        // Stream one crosses on its 3rd sample, stream two on its 1st.
        // Injections happen back-to-back, so crossing timestamps derive
        // from each batch's time base.
        inject_at(
            &fixture,
            "one",
            vec![0.0, 0.0, 2.0, 2.0],
            Duration::from_millis(10),
        );
        inject_at(
            &fixture,
            "two",
            vec![0.0, 2.0, 2.0, 2.0],
            Duration::from_millis(10),
        );

        let analog = analog_view(&*fixture.sync).unwrap();
        assert_eq!(analog.num_channels(), 1);
        let lag = analog.data(0)[0];
        // Both crossings happened within the window; the lag is their
        // signed difference, bounded by the batch length.
        assert!(lag.abs() < 0.5, "lag {} out of window", lag);
        assert_eq!(analog.name(0), "one[0]-two[0]");
    }

    #[test]
    fn test_cross_correlation_recovers_shift() {
        let fixture = build("CROSS_CORRELATION", 0.05);
        // A pulse at sample 20 on stream one and sample 10 on stream two,
        // 1 ms sample interval: stream one lags by 10 ms.
        let mut one = vec![0.0; 100];
        one[20] = 1.0;
        one[21] = 1.0;
        let mut two = vec![0.0; 100];
        two[10] = 1.0;
        two[11] = 1.0;
        inject_at(&fixture, "one", one, Duration::from_millis(1));
        inject_at(&fixture, "two", two, Duration::from_millis(1));

        let analog = analog_view(&*fixture.sync).unwrap();
        let lag = analog.data(0)[0];
        assert!((lag - 0.010).abs() < 1.5e-3, "lag was {}", lag);
    }
}
