//! Thread-pool occupancy monitor.
//!
//! Samples the shared pool's idle-thread count every 32 ms and exposes it
//! as a one-channel analog stream, so pool saturation is recorded through
//! the same substrate as every other signal.

use crate::analog::{AnalogNode, AnalogOutput, AnalogSpan};
use crate::clock;
use crate::error::Result;
use crate::graph::{NodeGraph, TypedNode};
use crate::node::{Modalities, Node};
use crate::thread_pool::ThreadPool;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{ObservableMapHandle, Signal};

const POLL_INTERVAL: Duration = Duration::from_millis(32);
const CHANNEL_NAME: &str = "Idle Threads";

pub struct PoolMetricsNode {
    ready: Signal<()>,
    output: AnalogOutput,
    pool: ThreadPool,
    emitted: RefCell<Duration>,
    start: RefCell<Duration>,
    task: RefCell<Option<tokio::task::JoinHandle<()>>>,
}

impl PoolMetricsNode {
    fn on_timer(&self) {
        let mut buffer = Vec::new();
        {
            let elapsed = clock::steady_now().saturating_sub(*self.start.borrow());
            let mut emitted = self.emitted.borrow_mut();
            while *emitted <= elapsed {
                buffer.push(self.pool.idle() as f64);
                *emitted += POLL_INTERVAL;
            }
        }
        self.output.publish(
            vec![buffer],
            vec![POLL_INTERVAL],
            vec![CHANNEL_NAME.to_string()],
        );
        self.ready.emit(&());
    }
}

impl Node for PoolMetricsNode {
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

impl AnalogNode for PoolMetricsNode {
    fn channels_changed(&self) -> &Signal<()> {
        &self.output.channels_changed
    }

    fn num_channels(&self) -> usize {
        self.output.num_channels()
    }

    fn data(&self, channel: usize) -> AnalogSpan<'_> {
        self.output.data(channel)
    }

    fn sample_interval(&self, _channel: usize) -> Duration {
        POLL_INTERVAL
    }

    fn time(&self) -> Duration {
        self.output.time()
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
        sample_intervals: Vec<Duration>,
        names: Vec<String>,
    ) -> Result<()> {
        self.output.publish(channels, sample_intervals, names);
        self.ready.emit(&());
        Ok(())
    }
}

impl TypedNode for PoolMetricsNode {
    const TYPE_NAME: &'static str = "THREAD_POOL";

    fn create(_state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new(PoolMetricsNode {
            ready: Signal::new(),
            output: AnalogOutput::new(),
            pool: graph.thread_pool(),
            emitted: RefCell::new(Duration::ZERO),
            start: RefCell::new(clock::steady_now()),
            task: RefCell::new(None),
        });

        let weak: Weak<PoolMetricsNode> = Rc::downgrade(&node);
        let handle = tokio::task::spawn_local(async move {
            loop {
                tokio::time::sleep(POLL_INTERVAL).await;
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

impl Drop for PoolMetricsNode {
    fn drop(&mut self) {
        if let Some(task) = self.task.borrow_mut().take() {
            task.abort();
        }
    }
}
