//! Channel routing across sources.
//!
//! `Sources` maps source node names to rows describing where each input
//! channel lands: `{Name, Channel, Out Channel, Out Name}`. The node
//! exposes a virtual analog view whose channel `k` forwards the
//! configured `(source, channel)` pair at that source's sample interval.
//! Rows are auto-populated for newly observed source channels so the
//! operator only fills in the out column. `Max Channels` caps the view.

use crate::analog::{reject_inject, AnalogNode, AnalogOutput, AnalogSpan};
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, Selector, TypedNode};
use crate::node::{analog_view, Modalities, Node};
use crate::nodes::recap_map;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{
    Connection, ObservableMap, ObservableMapHandle, RecursiveChangeEvent, Signal, Value,
};

#[derive(Clone)]
struct Mapping {
    source: String,
    in_channel: usize,
    out_name: String,
}

struct PickerState {
    mappings: Vec<Option<Mapping>>,
    max_channels: usize,
    // Copied output per exposed channel, refreshed when its source fires.
    channels: Vec<Vec<f64>>,
    intervals: Vec<Duration>,
}

pub struct ChannelPickerNode {
    ready: Signal<()>,
    output: AnalogOutput,
    state: ObservableMapHandle,
    graph: NodeGraphWeak,
    inner: RefCell<PickerState>,
    weak_self: Weak<ChannelPickerNode>,
    resolved: RefCell<HashMap<String, (Weak<dyn Node>, Connection)>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl ChannelPickerNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        if let Some(key) = ev.key.as_str() {
            if key == "Max Channels" && ev.origin.is_map(&self.state) {
                if let Some(v) = ev.value.as_int() {
                    self.inner.borrow_mut().max_channels = v.max(0) as usize;
                }
            }
        }
        self.resolve_sources();
        self.rebuild_mappings();
    }

    /// Ensures every configured source name has a lazy lookup and a ready
    /// subscription.
    fn resolve_sources(&self) {
        let Some(Value::Map(sources)) = self.state.try_at("Sources") else {
            return;
        };
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        for (key, _) in sources.entries() {
            let Some(name) = key.as_str().map(str::to_string) else {
                continue;
            };
            if self.resolved.borrow().contains_key(&name) {
                continue;
            }
            let weak = self.weak_self.clone();
            let name2 = name.clone();
            graph.get_node_async(Selector::name(name.clone()), move |source| {
                let Some(node) = weak.upgrade() else {
                    return;
                };
                node.attach_source(name2, source);
            });
        }
    }

    fn attach_source(&self, name: String, source: Weak<dyn Node>) {
        let Some(locked) = source.upgrade() else {
            return;
        };
        if analog_view(&*locked).is_none() {
            tracing::warn!(source = %name, "channel picker source is not analog");
            return;
        }
        let weak = self.weak_self.clone();
        let name2 = name.clone();
        let source2 = source.clone();
        let connection = locked.ready().connect(move |_| {
            let (Some(node), Some(locked)) = (weak.upgrade(), source2.upgrade()) else {
                return;
            };
            if let Some(analog) = analog_view(&*locked) {
                node.on_source_ready(&name2, analog);
            }
        });
        self.resolved.borrow_mut().insert(name, (source, connection));
        self.rebuild_mappings();
    }

    /// Recomputes the out-channel table from the `Sources` configuration.
    fn rebuild_mappings(&self) {
        let Some(Value::Map(sources)) = self.state.try_at("Sources") else {
            return;
        };
        let mut mappings: Vec<Option<Mapping>> = Vec::new();
        for (key, rows) in sources.entries() {
            let Some(source_name) = key.as_str().map(str::to_string) else {
                continue;
            };
            let Some(rows) = rows.as_list() else {
                continue;
            };
            for (index, row) in rows.values().into_iter().enumerate() {
                let Some(row) = row.as_map() else {
                    continue;
                };
                let Some(out_channel) = row.get_int("Out Channel") else {
                    continue;
                };
                if out_channel < 0 {
                    continue;
                }
                let out_channel = out_channel as usize;
                let in_channel = row
                    .get_int("Channel")
                    .map(|v| v.max(0) as usize)
                    .unwrap_or(index);
                let out_name = row
                    .get_string("Out Name")
                    .or_else(|| row.get_string("Name"))
                    .unwrap_or_default();
                if mappings.len() <= out_channel {
                    mappings.resize(out_channel + 1, None);
                }
                mappings[out_channel] = Some(Mapping {
                    source: source_name.clone(),
                    in_channel,
                    out_name,
                });
            }
        }

        let mut inner = self.inner.borrow_mut();
        let limit = inner.max_channels.min(mappings.len());
        mappings.truncate(limit.max(0));
        inner.channels.resize(mappings.len(), Vec::new());
        inner.intervals.resize(mappings.len(), Duration::ZERO);
        inner.mappings = mappings;
        drop(inner);
        self.output.channels_changed.emit(&());
    }

    fn on_source_ready(&self, name: &str, source: &dyn AnalogNode) {
        if !source.has_analog_data() {
            return;
        }
        self.populate_rows(name, source);

        let (channels, intervals, names) = {
            let mut inner = self.inner.borrow_mut();
            let PickerState {
                mappings,
                channels,
                intervals,
                ..
            } = &mut *inner;
            for (k, mapping) in mappings.iter().enumerate() {
                let Some(mapping) = mapping else {
                    continue;
                };
                if mapping.source != name || mapping.in_channel >= source.num_channels() {
                    continue;
                }
                channels[k].clear();
                channels[k].extend_from_slice(&source.data(mapping.in_channel));
                intervals[k] = source.sample_interval(mapping.in_channel);
            }
            let names = mappings
                .iter()
                .map(|m| m.as_ref().map(|m| m.out_name.clone()).unwrap_or_default())
                .collect::<Vec<_>>();
            (channels.clone(), intervals.clone(), names)
        };

        self.output
            .publish_at(channels, intervals, names, source.time());
        self.ready.emit(&());
    }

    /// Appends configuration rows for source channels that have no row
    /// yet, so new channels become visible to the operator.
    fn populate_rows(&self, name: &str, source: &dyn AnalogNode) {
        let Some(Value::Map(sources)) = self.state.try_at("Sources") else {
            return;
        };
        let Some(Value::List(rows)) = sources.try_at(name) else {
            return;
        };
        for i in rows.len()..source.num_channels() {
            let row = ObservableMap::new();
            row.assign("Name", source.name(i));
            row.assign("Channel", i as i64);
            rows.push(Value::Map(row));
        }
    }
}

impl Node for ChannelPickerNode {
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

impl AnalogNode for ChannelPickerNode {
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

impl TypedNode for ChannelPickerNode {
    const TYPE_NAME: &'static str = "CHANNEL_PICKER";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| ChannelPickerNode {
            ready: Signal::new(),
            output: AnalogOutput::new(),
            state: state.clone(),
            graph: graph.downgrade(),
            inner: RefCell::new(PickerState {
                mappings: Vec::new(),
                max_channels: usize::MAX,
                channels: Vec::new(),
                intervals: Vec::new(),
            }),
            weak_self: weak.clone(),
            resolved: RefCell::new(HashMap::new()),
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
    use thalamus_state::{ObservableList, ObservableListHandle};

    struct Fixture {
        _graph: crate::graph::NodeGraph,
        nodes: ObservableListHandle,
        picker: Rc<dyn Node>,
        picker_state: ObservableMapHandle,
    }

    fn build() -> Fixture {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![
                typed_factory::<AnalogSourceNode>(),
                typed_factory::<ChannelPickerNode>(),
            ],
        );

        for name in ["left", "right"] {
            let entry = ObservableMap::new();
            entry.assign("type", "ANALOG");
            entry.assign("name", name);
            nodes.push(Value::Map(entry));
        }

        let picker_state = ObservableMap::new();
        picker_state.assign("type", "CHANNEL_PICKER");
        picker_state.assign("name", "picker");
        let sources = ObservableMap::new();
        let left_rows = ObservableList::new();
        let row = ObservableMap::new();
        row.assign("Channel", 0i64);
        row.assign("Out Channel", 0i64);
        row.assign("Out Name", "left0");
        left_rows.push(Value::Map(row));
        sources.assign("left", Value::List(left_rows));
        let right_rows = ObservableList::new();
        let row = ObservableMap::new();
        row.assign("Channel", 1i64);
        row.assign("Out Channel", 1i64);
        row.assign("Out Name", "right1");
        right_rows.push(Value::Map(row));
        sources.assign("right", Value::List(right_rows));
        picker_state.assign("Sources", Value::Map(sources));
        nodes.push(Value::Map(picker_state.clone()));

        let picker = graph.get_node_by_name("picker").unwrap();
        Fixture {
            _graph: graph,
            nodes,
            picker,
            picker_state,
        }
    }

    fn inject(fixture: &Fixture, node_name: &str, channels: Vec<Vec<f64>>, interval_ms: u64) {
        let node = fixture._graph.get_node_by_name(node_name).unwrap();
        let count = channels.len();
        analog_view(&*node)
            .unwrap()
            .inject(
                channels,
                vec![Duration::from_millis(interval_ms); count],
                (0..count).map(|i| i.to_string()).collect(),
            )
            .unwrap();
    }

    #[test]
    fn test_forwards_configured_pairs() {
        let fixture = build();
        inject(&fixture, "left", vec![vec![1.0, 2.0]], 1);
        inject(&fixture, "right", vec![vec![9.0], vec![5.0, 6.0]], 2);

        let analog = analog_view(&*fixture.picker).unwrap();
        assert_eq!(analog.num_channels(), 2);
        assert_eq!(&*analog.data(0), &[1.0, 2.0]);
        assert_eq!(&*analog.data(1), &[5.0, 6.0]);
        assert_eq!(analog.sample_interval(0), Duration::from_millis(1));
        assert_eq!(analog.sample_interval(1), Duration::from_millis(2));
        assert_eq!(analog.name(0), "left0");
        assert_eq!(analog.name(1), "right1");
    }

    #[test]
    fn test_max_channels_caps_view() {
        let fixture = build();
        fixture.picker_state.assign("Max Channels", 1i64);
        inject(&fixture, "left", vec![vec![1.0]], 1);
        inject(&fixture, "right", vec![vec![9.0], vec![5.0]], 1);
        let analog = analog_view(&*fixture.picker).unwrap();
        assert_eq!(analog.num_channels(), 1);
    }

    #[test]
    fn test_rows_auto_populate_for_new_channels() {
        let fixture = build();
        inject(&fixture, "left", vec![vec![1.0], vec![2.0], vec![3.0]], 1);
        let sources = fixture.picker_state.try_at("Sources").unwrap();
        let rows = sources
            .as_map()
            .unwrap()
            .try_at("left")
            .unwrap()
            .as_list()
            .unwrap()
            .clone();
        // One configured row plus two auto-populated ones.
        assert_eq!(rows.len(), 3);
        let row = rows.at(2);
        assert_eq!(row.as_map().unwrap().get_int("Channel"), Some(2));
        let _ = &fixture.nodes;
    }

    #[test]
    fn test_late_source_attaches() {
        let fixture = build();
        // A source configured before it exists in the graph.
        let sources = fixture.picker_state.try_at("Sources").unwrap();
        let rows = ObservableList::new();
        let row = ObservableMap::new();
        row.assign("Channel", 0i64);
        row.assign("Out Channel", 2i64);
        row.assign("Out Name", "late0");
        rows.push(Value::Map(row));
        sources.as_map().unwrap().assign("late", Value::List(rows));

        let entry = ObservableMap::new();
        entry.assign("type", "ANALOG");
        entry.assign("name", "late");
        fixture.nodes.push(Value::Map(entry));

        inject(&fixture, "late", vec![vec![7.5]], 1);
        let analog = analog_view(&*fixture.picker).unwrap();
        assert_eq!(analog.num_channels(), 3);
        assert_eq!(&*analog.data(2), &[7.5]);
    }
}
