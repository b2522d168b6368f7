//! The reference node set.

mod algebra;
pub(crate) mod calculator;
mod channel_picker;
mod log;
mod normalize;
mod pool_metrics;
mod remote;
mod runner;
mod stim_printer;
mod storage;
mod sync;
mod toggle;
mod wallclock;
mod wave;

pub use algebra::AlgebraNode;
pub use channel_picker::ChannelPickerNode;
pub use log::{LogNode, RemoteLogNode};
pub use normalize::NormalizeNode;
pub use pool_metrics::PoolMetricsNode;
pub use remote::RemoteNode;
pub use runner::{RunNode, Run2Node};
pub use stim_printer::StimPrinterNode;
pub use storage::StorageNode;
pub use sync::SyncNode;
pub use toggle::ToggleNode;
pub use wallclock::WallClockNode;
pub use wave::WaveGeneratorNode;

use crate::analog::{AnalogNode, AnalogOutput, AnalogSpan};
use crate::error::Result;
use crate::graph::{typed_factory, NodeFactory, NodeGraph, TypedNode};
use crate::node::{Modalities, Node};
use std::rc::Rc;
use std::time::Duration;
use thalamus_state::{
    ChangeEvent, Collection, ObservableListHandle, ObservableMapHandle, RecursiveChangeEvent,
    Signal,
};

/// The default registry table.
pub fn default_factories() -> Vec<Rc<dyn NodeFactory>> {
    vec![
        typed_factory::<NoneNode>(),
        typed_factory::<AnalogSourceNode>(),
        typed_factory::<WaveGeneratorNode>(),
        typed_factory::<ToggleNode>(),
        typed_factory::<AlgebraNode>(),
        typed_factory::<NormalizeNode>(),
        typed_factory::<ChannelPickerNode>(),
        typed_factory::<SyncNode>(),
        typed_factory::<RunNode>(),
        typed_factory::<Run2Node>(),
        typed_factory::<WallClockNode>(),
        typed_factory::<LogNode>(),
        typed_factory::<RemoteLogNode>(),
        typed_factory::<RemoteNode>(),
        typed_factory::<StimPrinterNode>(),
        typed_factory::<PoolMetricsNode>(),
        typed_factory::<StorageNode>(),
    ]
}

/// Replays a map's contents as recursive change events rooted at the map,
/// the way node constructors consume their configuration.
pub(crate) fn recap_map(state: &ObservableMapHandle, mut observer: impl FnMut(&RecursiveChangeEvent)) {
    let origin = Collection::Map(state.clone());
    state.recap_with(|ev: &ChangeEvent| {
        observer(&RecursiveChangeEvent {
            origin: origin.clone(),
            action: ev.action,
            key: ev.key.clone(),
            value: ev.value.clone(),
        })
    });
}

/// List counterpart of [`recap_map`].
pub(crate) fn recap_list(
    list: &ObservableListHandle,
    mut observer: impl FnMut(&RecursiveChangeEvent),
) {
    let origin = Collection::List(list.clone());
    list.recap_with(|ev: &ChangeEvent| {
        observer(&RecursiveChangeEvent {
            origin: origin.clone(),
            action: ev.action,
            key: ev.key.clone(),
            value: ev.value.clone(),
        })
    });
}

/// Placeholder node holding a graph slot with no behavior.
pub struct NoneNode {
    ready: Signal<()>,
}

impl Node for NoneNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::NONE
    }
}

impl TypedNode for NoneNode {
    const TYPE_NAME: &'static str = "NONE";

    fn create(_state: ObservableMapHandle, _graph: &NodeGraph) -> Result<Rc<Self>> {
        Ok(Rc::new(NoneNode {
            ready: Signal::new(),
        }))
    }
}

/// A bare analog output buffer exposed as a node. Data arrives only
/// through `inject`, which makes this the standard target for replay and
/// for the `inject_analog` RPC.
pub struct AnalogSourceNode {
    ready: Signal<()>,
    output: AnalogOutput,
}

impl AnalogSourceNode {
    pub fn detached() -> Rc<Self> {
        Rc::new(AnalogSourceNode {
            ready: Signal::new(),
            output: AnalogOutput::new(),
        })
    }
}

impl Node for AnalogSourceNode {
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

impl AnalogNode for AnalogSourceNode {
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

impl TypedNode for AnalogSourceNode {
    const TYPE_NAME: &'static str = "ANALOG";

    fn create(_state: ObservableMapHandle, _graph: &NodeGraph) -> Result<Rc<Self>> {
        Ok(Self::detached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_inject_fires_ready() {
        let node = AnalogSourceNode::detached();
        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        let _c = node.ready.connect(move |_| fired2.set(fired2.get() + 1));

        node.inject(
            vec![vec![1.0, 2.0]],
            vec![Duration::from_millis(1)],
            vec!["0".to_string()],
        )
        .unwrap();

        assert_eq!(fired.get(), 1);
        assert_eq!(&*AnalogNode::data(&*node, 0), &[1.0, 2.0]);
    }
}
