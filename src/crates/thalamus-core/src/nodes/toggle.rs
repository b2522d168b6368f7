//! Debounced threshold toggle.
//!
//! Watches one channel of an analog source. A rising edge, judged against
//! the value one lag window earlier, flips a latched boolean provided the
//! refractory of twice the lag window has elapsed since the previous
//! flip. The output stream is `3.3` while latched high and `0.0`
//! otherwise, at the source's sample interval.

use crate::analog::{AnalogNode, AnalogOutput, AnalogSpan};
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, Selector, TypedNode};
use crate::node::{analog_view, Modalities, Node};
use crate::nodes::recap_map;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{Connection, ObservableMapHandle, RecursiveChangeEvent, Signal};

const LAG_TIME: Duration = Duration::from_millis(100);
const HIGH_LEVEL: f64 = 3.3;

struct ToggleState {
    threshold: f64,
    channel: usize,
    high: bool,
    current_time: Duration,
    last_toggle: Option<Duration>,
    previous: VecDeque<Vec<f64>>,
    scratch: Vec<f64>,
}

pub struct ToggleNode {
    ready: Signal<()>,
    output: AnalogOutput,
    graph: NodeGraphWeak,
    inner: RefCell<ToggleState>,
    weak_self: Weak<ToggleNode>,
    source_connection: RefCell<Option<Connection>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl ToggleNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        let Some(key) = ev.key.as_str() else {
            return;
        };
        match key {
            "Source" => {
                *self.source_connection.borrow_mut() = None;
                let Some(name) = ev.value.as_str().map(str::trim).map(str::to_string) else {
                    return;
                };
                let Some(graph) = self.graph.upgrade() else {
                    return;
                };
                let weak = self.weak_self.clone();
                graph.get_node_async(Selector::name(name), move |source| {
                    if let Some(node) = weak.upgrade() {
                        node.attach_source(source);
                    }
                });
            }
            "Threshold" => {
                if let Some(v) = ev.value.as_f64() {
                    self.inner.borrow_mut().threshold = v;
                }
            }
            "Channel" => {
                if let Some(v) = ev.value.as_int() {
                    self.inner.borrow_mut().channel = v.max(0) as usize;
                }
            }
            _ => {}
        }
    }

    fn attach_source(&self, source: Weak<dyn Node>) {
        let Some(locked) = source.upgrade() else {
            return;
        };
        if analog_view(&*locked).is_none() {
            tracing::warn!("toggle source is not an analog node");
            return;
        }
        let weak = self.weak_self.clone();
        let source2 = source.clone();
        let connection = locked.ready().connect(move |_| {
            let (Some(node), Some(locked)) = (weak.upgrade(), source2.upgrade()) else {
                return;
            };
            if let Some(analog) = analog_view(&*locked) {
                node.on_data(analog);
            }
        });
        *self.source_connection.borrow_mut() = Some(connection);
    }

    fn on_data(&self, source: &dyn AnalogNode) {
        if !source.has_analog_data() {
            return;
        }
        let channel = self.inner.borrow().channel;
        if channel >= source.num_channels() {
            return;
        }
        let sample_interval = source.sample_interval(channel);
        if sample_interval.is_zero() {
            return;
        }
        let time = source.time();

        let output = {
            let mut inner = self.inner.borrow_mut();
            {
                let data = source.data(channel);
                inner.scratch.clear();
                inner.scratch.extend_from_slice(&data);
            }

            let lag = (LAG_TIME.as_nanos() / sample_interval.as_nanos().max(1)) as usize;

            // Keep just enough history to look one lag window back.
            let mut total = 0;
            let mut keep = 0;
            for buffer in inner.previous.iter().rev() {
                keep += 1;
                total += buffer.len();
                if total > lag + 1 {
                    break;
                }
            }
            while inner.previous.len() > keep {
                inner.previous.pop_front();
            }

            let ToggleState {
                threshold,
                high,
                current_time,
                last_toggle,
                previous,
                scratch,
                ..
            } = &mut *inner;

            let mut output = Vec::with_capacity(scratch.len());
            for (i, &sample) in scratch.iter().enumerate() {
                *current_time += sample_interval;
                let lagged = lagged_value(previous, scratch, i, lag);
                let refractory_over = match last_toggle {
                    Some(t) => current_time.saturating_sub(*t) > 2 * LAG_TIME,
                    None => true,
                };
                if let Some(lagged) = lagged {
                    if refractory_over && lagged < *threshold && sample >= *threshold {
                        *high = !*high;
                        *last_toggle = Some(*current_time);
                    }
                }
                output.push(if *high { HIGH_LEVEL } else { 0.0 });
            }
            previous.push_back(std::mem::take(scratch));
            output
        };

        self.output
            .publish_at(vec![output], vec![sample_interval], vec![String::new()], time);
        self.ready.emit(&());
    }
}

/// Source value `lag` samples before index `current` of the buffer being
/// processed, reaching into retained history. With insufficient history
/// the oldest available sample stands in, so an edge in the very first
/// buffer still registers.
fn lagged_value(
    previous: &VecDeque<Vec<f64>>,
    current_buffer: &[f64],
    current: usize,
    lag: usize,
) -> Option<f64> {
    let mut index = current as i64 - lag as i64;
    if index >= 0 {
        return current_buffer.get(index as usize).copied();
    }
    for buffer in previous.iter().rev() {
        index += buffer.len() as i64;
        if index >= 0 {
            return buffer.get(index as usize).copied();
        }
    }
    previous
        .front()
        .and_then(|b| b.first())
        .or_else(|| current_buffer.first())
        .copied()
}

impl Node for ToggleNode {
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

impl AnalogNode for ToggleNode {
    fn channels_changed(&self) -> &Signal<()> {
        &self.output.channels_changed
    }

    fn num_channels(&self) -> usize {
        self.output.num_channels()
    }

    fn data(&self, channel: usize) -> AnalogSpan<'_> {
        self.output.data(channel)
    }

    fn sample_interval(&self, channel: usize) -> Duration {
        self.output.sample_interval(channel)
    }

    fn time(&self) -> Duration {
        self.output.time()
    }

    fn name(&self, _channel: usize) -> String {
        "0".to_string()
    }

    fn recommended_channels(&self) -> Vec<String> {
        vec!["0".to_string()]
    }

    fn inject(
        &self,
        channels: Vec<Vec<f64>>,
        sample_intervals: Vec<Duration>,
        names: Vec<String>,
    ) -> Result<()> {
        self.output.publish(channels, sample_intervals, names);
        self.ready.emit(&());
        Ok(())
    }
}

impl TypedNode for ToggleNode {
    const TYPE_NAME: &'static str = "TOGGLE";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| ToggleNode {
            ready: Signal::new(),
            output: AnalogOutput::new(),
            graph: graph.downgrade(),
            inner: RefCell::new(ToggleState {
                threshold: 1.6,
                channel: 0,
                high: false,
                current_time: Duration::ZERO,
                last_toggle: None,
                previous: VecDeque::new(),
                scratch: Vec::new(),
            }),
            weak_self: weak.clone(),
            source_connection: RefCell::new(None),
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
    use crate::nodes::AnalogSourceNode;
    use thalamus_state::{ObservableList, ObservableMap, Value};

    struct Fixture {
        _graph: crate::graph::NodeGraph,
        source: Rc<dyn Node>,
        toggle: Rc<dyn Node>,
        toggle_state: ObservableMapHandle,
        outputs: Rc<RefCell<Vec<Vec<f64>>>>,
        _ready_connection: Connection,
    }

    fn build(threshold: f64) -> Fixture {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![
                crate::graph::typed_factory::<AnalogSourceNode>(),
                crate::graph::typed_factory::<ToggleNode>(),
            ],
        );

        let source_state = ObservableMap::new();
        source_state.assign("type", "ANALOG");
        source_state.assign("name", "source");
        nodes.push(Value::Map(source_state));

        let toggle_state = ObservableMap::new();
        toggle_state.assign("type", "TOGGLE");
        toggle_state.assign("name", "toggle");
        toggle_state.assign("Threshold", threshold);
        toggle_state.assign("Channel", 0i64);
        toggle_state.assign("Source", "source");
        nodes.push(Value::Map(toggle_state.clone()));

        let source = graph.get_node_by_name("source").unwrap();
        let toggle = graph.get_node_by_name("toggle").unwrap();

        let outputs = Rc::new(RefCell::new(Vec::new()));
        let outputs2 = Rc::clone(&outputs);
        let toggle_weak = Rc::downgrade(&toggle);
        let ready_connection = toggle.ready().connect(move |_| {
            let toggle = toggle_weak.upgrade().unwrap();
            let analog = analog_view(&*toggle).unwrap();
            outputs2.borrow_mut().push(analog.data(0).to_vec());
        });

        Fixture {
            _graph: graph,
            source,
            toggle,
            toggle_state,
            outputs,
            _ready_connection: ready_connection,
        }
    }

    fn inject_block(fixture: &Fixture, value: f64, samples: usize) {
        analog_view(&*fixture.source)
            .unwrap()
            .inject(
                vec![vec![value; samples]],
                vec![Duration::from_millis(1)],
                vec!["0".to_string()],
            )
            .unwrap();
    }

    fn flips(outputs: &[Vec<f64>]) -> usize {
        let mut count = 0;
        let mut last = 0.0;
        for buffer in outputs {
            for &v in buffer {
                if v != last {
                    count += 1;
                    last = v;
                }
            }
        }
        count
    }

    #[test]
    fn test_first_edge_toggles_promptly() {
        let fixture = build(1.6);
        inject_block(&fixture, 0.0, 10);
        inject_block(&fixture, 2.0, 10);

        let outputs = fixture.outputs.borrow();
        assert_eq!(flips(&outputs), 1);
        assert_eq!(*outputs.last().unwrap().last().unwrap(), HIGH_LEVEL);
    }

    #[test]
    fn test_edges_inside_refractory_produce_one_flip() {
        let fixture = build(1.6);
        // Edge at ~100 ms, drop, edge again at ~140 ms: the second edge is
        // inside the 200 ms refractory.
        inject_block(&fixture, 0.0, 100);
        inject_block(&fixture, 2.0, 20);
        inject_block(&fixture, 0.0, 20);
        inject_block(&fixture, 2.0, 20);
        assert_eq!(flips(&fixture.outputs.borrow()), 1);
    }

    #[test]
    fn test_second_edge_after_refractory_flips_again() {
        let fixture = build(1.6);
        // Rise at ~100 ms, fall, rise again at ~400 ms.
        inject_block(&fixture, 0.0, 100);
        inject_block(&fixture, 2.0, 100);
        inject_block(&fixture, 0.0, 200);
        inject_block(&fixture, 2.0, 100);

        let outputs = fixture.outputs.borrow();
        assert_eq!(flips(&outputs), 2);
        // The second flip latched low again.
        assert_eq!(*outputs.last().unwrap().last().unwrap(), 0.0);
    }

    #[test]
    fn test_output_tracks_source_interval() {
        let fixture = build(1.6);
        inject_block(&fixture, 0.0, 4);
        let analog = analog_view(&*fixture.toggle).unwrap();
        assert_eq!(analog.sample_interval(0), Duration::from_millis(1));
        assert_eq!(analog.num_channels(), 1);
    }

    #[test]
    fn test_threshold_accepts_string_values() {
        let fixture = build(1.6);
        fixture.toggle_state.assign("Threshold", "2.5");
        // 2.0 no longer crosses the threshold.
        inject_block(&fixture, 0.0, 10);
        inject_block(&fixture, 2.0, 10);
        assert_eq!(flips(&fixture.outputs.borrow()), 0);
        // 3.0 does.
        inject_block(&fixture, 0.0, 10);
        inject_block(&fixture, 3.0, 10);
        assert_eq!(flips(&fixture.outputs.borrow()), 1);
    }
}
