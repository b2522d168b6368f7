//! Per-sample expression transform.
//!
//! `Equation` is parsed once on configuration; on every `ready` of the
//! source the program is evaluated per sample with `X` (and `x`) bound to
//! the sample, and the result replaces the sample in the output view.

use crate::analog::{reject_inject, AnalogNode, AnalogOutput, AnalogSpan};
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, Selector, TypedNode};
use crate::node::{analog_view, Modalities, Node};
use crate::nodes::calculator::{self, Expr, Number};
use crate::nodes::recap_map;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{Connection, ObservableMapHandle, RecursiveChangeEvent, Signal};

pub struct AlgebraNode {
    ready: Signal<()>,
    output: AnalogOutput,
    state: ObservableMapHandle,
    graph: NodeGraphWeak,
    program: RefCell<Option<Expr>>,
    vars: RefCell<HashMap<String, Number>>,
    weak_self: Weak<AlgebraNode>,
    source_connection: RefCell<Option<Connection>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl AlgebraNode {
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
            "Equation" => {
                let Some(text) = ev.value.as_str() else {
                    return;
                };
                match calculator::parse(text) {
                    Ok(program) => {
                        *self.program.borrow_mut() = Some(program);
                        self.state.assign("Parser Error", false);
                    }
                    Err(e) => {
                        tracing::warn!(equation = text, error = %e, "equation failed to parse");
                        *self.program.borrow_mut() = None;
                        self.state.assign("Parser Error", true);
                    }
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

        let program = self.program.borrow();
        let mut vars = self.vars.borrow_mut();
        for i in 0..num_channels {
            let mut transformed = source.data(i).to_vec();
            if let Some(program) = program.as_ref() {
                for sample in &mut transformed {
                    vars.insert("X".to_string(), Number::Float(*sample));
                    vars.insert("x".to_string(), Number::Float(*sample));
                    match calculator::eval(program, &vars) {
                        Ok(result) => *sample = result.as_f64(),
                        Err(e) => {
                            tracing::error!(error = %e, "equation evaluation failed");
                            return;
                        }
                    }
                }
            }
            channels.push(transformed);
            intervals.push(source.sample_interval(i));
            names.push(source.name(i));
        }
        drop(program);
        drop(vars);

        self.output
            .publish_at(channels, intervals, names, source.time());
        self.ready.emit(&());
    }
}

impl Node for AlgebraNode {
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

impl AnalogNode for AlgebraNode {
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

impl TypedNode for AlgebraNode {
    const TYPE_NAME: &'static str = "ALGEBRA";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| AlgebraNode {
            ready: Signal::new(),
            output: AnalogOutput::new(),
            state: state.clone(),
            graph: graph.downgrade(),
            program: RefCell::new(None),
            vars: RefCell::new(HashMap::new()),
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

    fn build(equation: &str) -> (crate::graph::NodeGraph, Rc<dyn Node>, Rc<dyn Node>, ObservableMapHandle) {
        let nodes = ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(
            nodes.clone(),
            vec![
                crate::graph::typed_factory::<AnalogSourceNode>(),
                crate::graph::typed_factory::<AlgebraNode>(),
            ],
        );

        let source_state = ObservableMap::new();
        source_state.assign("type", "ANALOG");
        source_state.assign("name", "source");
        nodes.push(Value::Map(source_state));

        let algebra_state = ObservableMap::new();
        algebra_state.assign("type", "ALGEBRA");
        algebra_state.assign("name", "algebra");
        algebra_state.assign("Equation", equation);
        algebra_state.assign("Source", "source");
        nodes.push(Value::Map(algebra_state.clone()));

        let source = graph.get_node_by_name("source").unwrap();
        let algebra = graph.get_node_by_name("algebra").unwrap();
        (graph, source, algebra, algebra_state)
    }

    #[test]
    fn test_affine_transform() {
        let (_graph, source, algebra, state) = build("X*2+1");
        assert_eq!(state.get_bool("Parser Error"), Some(false));

        analog_view(&*source)
            .unwrap()
            .inject(
                vec![vec![0.0, 1.0, -1.0, 3.5]],
                vec![Duration::from_millis(1)],
                vec!["0".to_string()],
            )
            .unwrap();

        let analog = analog_view(&*algebra).unwrap();
        assert_eq!(&*analog.data(0), &[1.0, 3.0, -1.0, 8.0]);
        assert_eq!(analog.sample_interval(0), Duration::from_millis(1));
        assert_eq!(analog.name(0), "0");
    }

    #[test]
    fn test_parser_error_flag() {
        let (_graph, _source, _algebra, state) = build("X*+");
        assert_eq!(state.get_bool("Parser Error"), Some(true));
    }

    #[test]
    fn test_no_program_passes_through() {
        let (_graph, source, algebra, state) = build("X*+");
        assert_eq!(state.get_bool("Parser Error"), Some(true));
        analog_view(&*source)
            .unwrap()
            .inject(
                vec![vec![4.0, 5.0]],
                vec![Duration::from_millis(1)],
                vec!["0".to_string()],
            )
            .unwrap();
        let analog = analog_view(&*algebra).unwrap();
        assert_eq!(&*analog.data(0), &[4.0, 5.0]);
    }

    #[test]
    fn test_inject_rejected() {
        let (_graph, _source, algebra, _state) = build("X");
        let analog = analog_view(&*algebra).unwrap();
        assert!(analog.inject(vec![], vec![], vec![]).is_err());
    }
}
