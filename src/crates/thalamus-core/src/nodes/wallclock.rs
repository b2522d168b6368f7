//! System-clock sampler.
//!
//! Once a second, emits one analog sample holding the wall-clock epoch in
//! nanoseconds, timestamped with the steady clock. Recordings of this
//! stream anchor the steady timeline of a session to calendar time.
//! `inject` overwrites the exposed sample, which makes replay
//! deterministic.

use crate::analog::{AnalogNode, AnalogSpan};
use crate::clock;
use crate::error::Result;
use crate::graph::{NodeGraph, TypedNode};
use crate::node::{Modalities, Node};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{ObservableMapHandle, Signal};

const CHANNEL_NAME: &str = "Epoch (ns)";

struct ClockSample {
    system_ns: f64,
    steady: Duration,
}

pub struct WallClockNode {
    ready: Signal<()>,
    channels_changed: Signal<()>,
    sample: RefCell<ClockSample>,
    task: RefCell<Option<tokio::task::JoinHandle<()>>>,
}

impl WallClockNode {
    fn on_timer(&self) {
        {
            let mut sample = self.sample.borrow_mut();
            sample.steady = clock::steady_now();
            sample.system_ns = clock::system_now().as_nanos() as f64;
        }
        self.ready.emit(&());
    }
}

impl Node for WallClockNode {
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

impl AnalogNode for WallClockNode {
    fn channels_changed(&self) -> &Signal<()> {
        &self.channels_changed
    }

    fn num_channels(&self) -> usize {
        1
    }

    fn data(&self, _channel: usize) -> AnalogSpan<'_> {
        std::cell::Ref::map(self.sample.borrow(), |s| std::slice::from_ref(&s.system_ns))
    }

    fn sample_interval(&self, _channel: usize) -> Duration {
        Duration::from_secs(1)
    }

    fn time(&self) -> Duration {
        self.sample.borrow().steady
    }

    fn name(&self, _channel: usize) -> String {
        CHANNEL_NAME.to_string()
    }

    fn recommended_channels(&self) -> Vec<String> {
        vec![CHANNEL_NAME.to_string()]
    }

    fn inject(
        &self,
        channels: Vec<Vec<f64>>,
        _sample_intervals: Vec<Duration>,
        _names: Vec<String>,
    ) -> Result<()> {
        let Some(value) = channels.first().and_then(|c| c.first()) else {
            return Ok(());
        };
        {
            let mut sample = self.sample.borrow_mut();
            sample.system_ns = *value;
            sample.steady = clock::steady_now();
        }
        self.ready.emit(&());
        Ok(())
    }
}

impl TypedNode for WallClockNode {
    const TYPE_NAME: &'static str = "WALLCLOCK";

    fn create(_state: ObservableMapHandle, _graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new(WallClockNode {
            ready: Signal::new(),
            channels_changed: Signal::new(),
            sample: RefCell::new(ClockSample {
                system_ns: 0.0,
                steady: Duration::ZERO,
            }),
            task: RefCell::new(None),
        });

        let weak: Weak<WallClockNode> = Rc::downgrade(&node);
        let handle = tokio::task::spawn_local(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let Some(node) = weak.upgrade() else {
                    break;
                };
                node.on_timer();
            }
        });
        *node.task.borrow_mut() = Some(handle);
        Ok(node)
    }
}

impl Drop for WallClockNode {
    fn drop(&mut self) {
        if let Some(task) = self.task.borrow_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::analog_view;

    fn detached() -> Rc<WallClockNode> {
        Rc::new(WallClockNode {
            ready: Signal::new(),
            channels_changed: Signal::new(),
            sample: RefCell::new(ClockSample {
                system_ns: 0.0,
                steady: Duration::ZERO,
            }),
            task: RefCell::new(None),
        })
    }

    #[test]
    fn test_timer_publishes_epoch() {
        let node = detached();
        node.on_timer();
        let analog: &dyn AnalogNode = &*node;
        let value = analog.data(0)[0];
        // The wall clock reads as recent calendar time (after 2020).
        assert!(value > 1.5e18);
        assert_eq!(analog.num_channels(), 1);
        assert_eq!(analog.name(0), CHANNEL_NAME);
        assert_eq!(analog.sample_interval(0), Duration::from_secs(1));
    }

    #[test]
    fn test_inject_overwrites_sample() {
        let node = detached();
        let fired = Rc::new(std::cell::Cell::new(0));
        let fired2 = Rc::clone(&fired);
        let _c = node.ready.connect(move |_| fired2.set(fired2.get() + 1));

        analog_view(&*node)
            .unwrap()
            .inject(vec![vec![42.0]], vec![], vec![])
            .unwrap();

        assert_eq!(fired.get(), 1);
        let analog: &dyn AnalogNode = &*node;
        assert_eq!(analog.data(0)[0], 42.0);
    }
}
