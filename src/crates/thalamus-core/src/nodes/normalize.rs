//! Running min/max normalization.
//!
//! Tracks a per-channel range over everything seen so far and rescales
//! each sample into `[Min, Max]`. The epsilon in the denominator keeps a
//! constant-valued channel at the output minimum instead of NaN. The
//! range table can be persisted to a sidecar file with the `Cache`
//! command and cleared with `Reset`.

use crate::analog::{reject_inject, AnalogNode, AnalogOutput, AnalogSpan};
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, Selector, TypedNode};
use crate::node::{analog_view, Modalities, Node};
use crate::nodes::recap_map;
use std::cell::RefCell;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{Connection, ObservableMapHandle, RecursiveChangeEvent, Signal};

const CACHE_FILE: &str = ".normalize_cache";

type Range = (f64, f64);

const EMPTY_RANGE: Range = (f64::MAX, -f64::MAX);

struct NormalizeState {
    ranges: Vec<Range>,
    cached: Vec<Range>,
    out_min: f64,
    out_max: f64,
}

pub struct NormalizeNode {
    ready: Signal<()>,
    output: AnalogOutput,
    graph: NodeGraphWeak,
    cache_path: PathBuf,
    inner: RefCell<NormalizeState>,
    weak_self: Weak<NormalizeNode>,
    source_connection: RefCell<Option<Connection>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl NormalizeNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        let Some(key) = ev.key.as_str() else {
            return;
        };
        match key {
            "Min" => {
                if let Some(v) = ev.value.as_f64() {
                    self.inner.borrow_mut().out_min = v;
                }
            }
            "Max" => {
                if let Some(v) = ev.value.as_f64() {
                    self.inner.borrow_mut().out_max = v;
                }
            }
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
            _ => {}
        }
    }

    fn attach_source(&self, source: Weak<dyn Node>) {
        let Some(locked) = source.upgrade() else {
            return;
        };
        if analog_view(&*locked).is_none() {
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
        let num_channels = source.num_channels();
        let mut channels = Vec::with_capacity(num_channels);
        let mut intervals = Vec::with_capacity(num_channels);
        let mut names = Vec::with_capacity(num_channels);
        {
            let mut inner = self.inner.borrow_mut();
            while inner.ranges.len() < num_channels {
                let index = inner.ranges.len();
                let seeded = inner.cached.get(index).copied().unwrap_or(EMPTY_RANGE);
                inner.ranges.push(seeded);
            }
            let out_min = inner.out_min;
            let out_max = inner.out_max;

            for i in 0..num_channels {
                let mut transformed = source.data(i).to_vec();
                let range = &mut inner.ranges[i];
                for x in &mut transformed {
                    range.0 = range.0.min(*x);
                    range.1 = range.1.max(*x);
                    *x = (*x - range.0) / (range.1 - range.0 + f64::MIN_POSITIVE)
                        * (out_max - out_min)
                        + out_min;
                }
                channels.push(transformed);
                intervals.push(source.sample_interval(i));
                names.push(source.name(i));
            }
        }

        self.output
            .publish_at(channels, intervals, names, source.time());
        self.ready.emit(&());
    }

    fn write_cache(&self) -> std::io::Result<()> {
        let inner = self.inner.borrow();
        let mut bytes = Vec::with_capacity(inner.ranges.len() * 16);
        for (min, max) in &inner.ranges {
            bytes.extend_from_slice(&min.to_le_bytes());
            bytes.extend_from_slice(&max.to_le_bytes());
        }
        let mut file = std::fs::File::create(&self.cache_path)?;
        file.write_all(&bytes)
    }

    fn print_ranges(&self) {
        for (i, (min, max)) in self.inner.borrow().ranges.iter().enumerate() {
            tracing::info!(channel = i + 1, min, max, "normalize range");
        }
    }
}

fn read_cache(path: &PathBuf) -> Vec<Range> {
    let Ok(mut file) = std::fs::File::open(path) else {
        return Vec::new();
    };
    let mut bytes = Vec::new();
    if file.read_to_end(&mut bytes).is_err() {
        return Vec::new();
    }
    bytes
        .chunks_exact(16)
        .map(|chunk| {
            let min = f64::from_le_bytes(chunk[..8].try_into().unwrap());
            let max = f64::from_le_bytes(chunk[8..].try_into().unwrap());
            (min, max)
        })
        .collect()
}

impl Node for NormalizeNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::ANALOG
    }

    fn as_analog(&self) -> Option<&dyn AnalogNode> {
        Some(self)
    }

    fn process(&self, request: &serde_json::Value) -> Result<serde_json::Value> {
        match request.as_str() {
            Some("Cache") => {
                self.write_cache()?;
                self.print_ranges();
            }
            Some("Reset") => {
                let mut inner = self.inner.borrow_mut();
                let count = inner.ranges.len();
                inner.ranges.clear();
                inner.ranges.resize(count, EMPTY_RANGE);
                inner.cached.clear();
            }
            _ => {}
        }
        Ok(serde_json::Value::Null)
    }
}

impl AnalogNode for NormalizeNode {
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

    fn name(&self, channel: usize) -> String {
        self.output.name(channel)
    }

    fn recommended_channels(&self) -> Vec<String> {
        self.output.names()
    }

    fn inject(&self, _: Vec<Vec<f64>>, _: Vec<Duration>, _: Vec<String>) -> Result<()> {
        Err(reject_inject(Self::TYPE_NAME))
    }
}

impl TypedNode for NormalizeNode {
    const TYPE_NAME: &'static str = "NORMALIZE";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let cache_path = PathBuf::from(CACHE_FILE);
        let cached = read_cache(&cache_path);
        let node = Rc::new_cyclic(|weak| NormalizeNode {
            ready: Signal::new(),
            output: AnalogOutput::new(),
            graph: graph.downgrade(),
            cache_path,
            inner: RefCell::new(NormalizeState {
                ranges: Vec::new(),
                cached,
                out_min: 0.0,
                out_max: 1.0,
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

    fn build() -> (crate::graph::NodeGraph, Rc<dyn Node>, Rc<dyn Node>) {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![
                crate::graph::typed_factory::<AnalogSourceNode>(),
                crate::graph::typed_factory::<NormalizeNode>(),
            ],
        );

        let source_state = ObservableMap::new();
        source_state.assign("type", "ANALOG");
        source_state.assign("name", "source");
        nodes.push(Value::Map(source_state));

        let normalize_state = ObservableMap::new();
        normalize_state.assign("type", "NORMALIZE");
        normalize_state.assign("name", "normalize");
        normalize_state.assign("Min", 0.0);
        normalize_state.assign("Max", 1.0);
        normalize_state.assign("Source", "source");
        nodes.push(Value::Map(normalize_state));

        let source = graph.get_node_by_name("source").unwrap();
        let normalize = graph.get_node_by_name("normalize").unwrap();
        (graph, source, normalize)
    }

    fn inject(source: &Rc<dyn Node>, samples: Vec<f64>) {
        analog_view(&**source)
            .unwrap()
            .inject(
                vec![samples],
                vec![Duration::from_millis(1)],
                vec!["0".to_string()],
            )
            .unwrap();
    }

    #[test]
    fn test_running_range_saturates() {
        let (_graph, source, normalize) = build();
        inject(&source, vec![0.0, 10.0]);
        {
            let analog = analog_view(&*normalize).unwrap();
            assert_eq!(&*analog.data(0), &[0.0, 1.0]);
        }
        // The range widens; the new extremes still map to the rails.
        inject(&source, vec![-5.0, 15.0]);
        {
            let analog = analog_view(&*normalize).unwrap();
            assert_eq!(&*analog.data(0), &[0.0, 1.0]);
        }
        // A mid-range value lands proportionally inside the widened range.
        inject(&source, vec![5.0]);
        let analog = analog_view(&*normalize).unwrap();
        let value = analog.data(0)[0];
        assert!((value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_channel_yields_out_min() {
        let (_graph, source, normalize) = build();
        inject(&source, vec![7.0, 7.0, 7.0]);
        let analog = analog_view(&*normalize).unwrap();
        assert_eq!(&*analog.data(0), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_first_sample_of_channel_is_out_min() {
        let (_graph, source, normalize) = build();
        inject(&source, vec![3.0]);
        let analog = analog_view(&*normalize).unwrap();
        assert_eq!(analog.data(0)[0], 0.0);
    }
}
