//! Synthetic waveform generator.
//!
//! Produces one or more waves (`Sine`, `Square`, `Triangle`, `Random`)
//! sampled at `Sample Rate`, emitted in batches every `Poll Interval`
//! milliseconds. Each tick emits every sample whose ideal time falls in
//! `(previous tick, now]`, so a stalled executor catches up instead of
//! dropping samples. Wave 0 is configured with flat keys on the node
//! entry; additional waves come from the `Waves` list.

use crate::analog::{AnalogNode, AnalogOutput, AnalogSpan};
use crate::clock;
use crate::error::Result;
use crate::graph::{NodeGraph, TypedNode};
use crate::node::{Modalities, Node};
use crate::nodes::{recap_list, recap_map};
use rand::Rng;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thalamus_state::{Action, Connection, ObservableListHandle, ObservableMapHandle,
    RecursiveChangeEvent, Signal, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Sine,
    Square,
    Triangle,
    Random,
}

struct Wave {
    shape: Shape,
    frequency: f64,
    amplitude: f64,
    phase_ns: i64,
    interval_ns: i64,
    duty_cycle: f64,
    duty_interval_ns: i64,
    offset: f64,
    current: f64,
    last_switch: Duration,
}

impl Default for Wave {
    fn default() -> Self {
        Wave {
            shape: Shape::Sine,
            frequency: 1.0,
            amplitude: 1.0,
            phase_ns: 0,
            interval_ns: 1_000_000_000,
            duty_cycle: 0.5,
            duty_interval_ns: 500_000_000,
            offset: 0.0,
            current: 0.0,
            last_switch: Duration::ZERO,
        }
    }
}

impl Wave {
    fn sample(&mut self, time: Duration, rng: &mut rand::rngs::ThreadRng) -> f64 {
        let t = time.as_nanos() as i64;
        match self.shape {
            Shape::Sine => {
                self.amplitude
                    * (2.0 * std::f64::consts::PI
                        * (self.frequency * t as f64 + self.phase_ns as f64)
                        / 1e9)
                        .sin()
                    + self.offset
            }
            Shape::Square => {
                let modulo = (t - self.phase_ns).rem_euclid(self.interval_ns.max(1));
                if modulo < self.duty_interval_ns {
                    self.amplitude + self.offset
                } else {
                    -self.amplitude + self.offset
                }
            }
            Shape::Triangle => {
                let interval = self.interval_ns.max(1);
                let quarter = interval / 4;
                let three_quarter = 3 * quarter;
                let modulo = (t - self.phase_ns).rem_euclid(interval);
                if modulo < quarter {
                    modulo as f64 / quarter as f64 * self.amplitude + self.offset
                } else if modulo < three_quarter {
                    (1.0 - (modulo - quarter) as f64 / quarter as f64) * self.amplitude
                        + self.offset
                } else {
                    (modulo - three_quarter) as f64 / quarter as f64 * self.amplitude
                        - self.amplitude
                        + self.offset
                }
            }
            Shape::Random => {
                if (time.saturating_sub(self.last_switch)).as_nanos() as i64 > self.interval_ns {
                    self.current =
                        self.amplitude * rng.gen_range(0..=1) as f64 + self.offset;
                    self.last_switch = time;
                }
                self.current
            }
        }
    }

    fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
        if frequency > 0.0 {
            self.interval_ns = (1e9 / frequency) as i64;
        }
        self.duty_interval_ns = (self.interval_ns as f64 * self.duty_cycle) as i64;
    }
}

struct WaveState {
    waves: Vec<Wave>,
    waves_state: Option<ObservableListHandle>,
    last_wave_count: usize,
    sample_interval: Duration,
    poll_interval: Duration,
    running: bool,
    start: Duration,
    emitted: Duration,
    names: Vec<String>,
}

pub struct WaveGeneratorNode {
    ready: Signal<()>,
    output: AnalogOutput,
    state: ObservableMapHandle,
    inner: RefCell<WaveState>,
    weak_self: Weak<WaveGeneratorNode>,
    task: RefCell<Option<tokio::task::JoinHandle<()>>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl WaveGeneratorNode {
    fn on_change(&self, ev: &RecursiveChangeEvent) {
        enum Target {
            Flat,
            Indexed(usize),
            NotOurs,
        }

        let target = {
            let inner = self.inner.borrow();
            if ev.origin.is_map(&self.state) {
                Target::Flat
            } else if inner
                .waves_state
                .as_ref()
                .map(|list| ev.origin.is_list(list))
                .unwrap_or(false)
            {
                // Handled below: a wave entry appeared or vanished.
                drop(inner);
                self.on_waves_list_change(ev);
                return;
            } else if inner
                .waves_state
                .as_ref()
                .zip(ev.origin.parent())
                .map(|(list, parent)| parent.is_list(list))
                .unwrap_or(false)
            {
                let list = inner.waves_state.as_ref().unwrap();
                match list.key_of(&Value::Map(
                    ev.origin.as_map().expect("wave entries are maps").clone(),
                )) {
                    Some(key) => Target::Indexed(key.as_int().unwrap_or(0) as usize),
                    None => Target::NotOurs,
                }
            } else {
                Target::NotOurs
            }
        };

        let Some(key) = ev.key.as_str() else {
            return;
        };

        if matches!(target, Target::Flat) && key == "Waves" {
            if let Some(list) = ev.value.as_list() {
                self.inner.borrow_mut().waves_state = Some(list.clone());
                if let Some(node) = self.weak_self.upgrade() {
                    recap_list(list, move |ev| node.on_change(ev));
                }
            }
            return;
        }

        let wave_index = match target {
            Target::Flat => 0,
            Target::Indexed(i) => i,
            Target::NotOurs => return,
        };

        {
            let mut inner = self.inner.borrow_mut();
            if inner.waves.len() <= wave_index {
                inner.waves.resize_with(wave_index + 1, Wave::default);
            }
        }

        match key {
            "Frequency" => {
                if let Some(v) = ev.value.as_f64() {
                    self.inner.borrow_mut().waves[wave_index].set_frequency(v);
                }
            }
            "Amplitude" => {
                if let Some(v) = ev.value.as_f64() {
                    self.inner.borrow_mut().waves[wave_index].amplitude = v;
                }
            }
            "Offset" => {
                if let Some(v) = ev.value.as_f64() {
                    self.inner.borrow_mut().waves[wave_index].offset = v;
                }
            }
            "Duty Cycle" => {
                if let Some(v) = ev.value.as_f64() {
                    let mut inner = self.inner.borrow_mut();
                    let wave = &mut inner.waves[wave_index];
                    wave.duty_cycle = v;
                    wave.duty_interval_ns = (wave.interval_ns as f64 * v) as i64;
                }
            }
            "Phase" => {
                if let Some(v) = ev.value.as_f64() {
                    self.inner.borrow_mut().waves[wave_index].phase_ns = (1e9 * v) as i64;
                }
            }
            "Shape" => {
                if let Some(text) = ev.value.as_str() {
                    let shape = match text {
                        "Square" => Shape::Square,
                        "Triangle" => Shape::Triangle,
                        "Random" => Shape::Random,
                        _ => Shape::Sine,
                    };
                    self.inner.borrow_mut().waves[wave_index].shape = shape;
                }
            }
            "Poll Interval" => {
                if let Some(v) = ev.value.as_int() {
                    self.inner.borrow_mut().poll_interval =
                        Duration::from_millis(v.max(1) as u64);
                }
            }
            "Sample Rate" => {
                if let Some(rate) = ev.value.as_f64() {
                    if rate > 0.0 {
                        self.inner.borrow_mut().sample_interval =
                            Duration::from_nanos((1e9 / rate) as u64);
                    }
                }
                self.output.channels_changed.emit(&());
            }
            "Running" => {
                let running = ev.value.as_bool().unwrap_or(false);
                {
                    let mut inner = self.inner.borrow_mut();
                    inner.running = running;
                    for wave in &mut inner.waves {
                        wave.last_switch = Duration::ZERO;
                    }
                    if running {
                        inner.start = clock::steady_now();
                        inner.emitted = Duration::ZERO;
                    }
                }
                if running {
                    self.start_task();
                } else if let Some(task) = self.task.borrow_mut().take() {
                    task.abort();
                }
            }
            _ => {}
        }
    }

    fn on_waves_list_change(&self, ev: &RecursiveChangeEvent) {
        match ev.action {
            Action::Set => {
                if let Some(entry) = ev.value.as_map() {
                    if let Some(node) = self.weak_self.upgrade() {
                        recap_map(entry, move |entry_ev| node.on_change(entry_ev));
                    }
                }
            }
            Action::Delete => {
                if let Some(index) = ev.key.as_int() {
                    let mut inner = self.inner.borrow_mut();
                    let index = index as usize;
                    if index < inner.waves.len() {
                        inner.waves.remove(index);
                    }
                }
            }
        }
    }

    fn start_task(&self) {
        if let Some(task) = self.task.borrow_mut().take() {
            task.abort();
        }
        self.tick();
        let weak = self.weak_self.clone();
        let handle = tokio::task::spawn_local(async move {
            loop {
                let poll_interval = match weak.upgrade() {
                    Some(node) => node.inner.borrow().poll_interval,
                    None => break,
                };
                tokio::time::sleep(poll_interval).await;
                let Some(node) = weak.upgrade() else {
                    break;
                };
                if !node.tick() {
                    break;
                }
            }
        });
        *self.task.borrow_mut() = Some(handle);
    }

    /// Generates all samples due since the previous tick. Returns false
    /// once the generator has stopped.
    fn tick(&self) -> bool {
        let mut rng = rand::thread_rng();
        let (channels, intervals, names, count_changed) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.running {
                return false;
            }
            if inner.sample_interval.is_zero() {
                return true;
            }

            let wave_count = inner.waves.len();
            let count_changed = wave_count != inner.last_wave_count;
            inner.last_wave_count = wave_count;

            let now = clock::steady_now();
            let elapsed = now.saturating_sub(inner.start);
            let sample_interval = inner.sample_interval;

            let mut final_time = inner.emitted;
            let emitted = inner.emitted;
            let mut channels = Vec::with_capacity(wave_count);
            for wave in &mut inner.waves {
                let mut buffer = Vec::new();
                let mut t = emitted;
                while t <= elapsed {
                    buffer.push(wave.sample(t, &mut rng));
                    t += sample_interval;
                }
                final_time = t;
                channels.push(buffer);
            }
            inner.emitted = final_time;

            while inner.names.len() < wave_count {
                let next_name = inner.names.len().to_string();
                inner.names.push(next_name);
            }
            let names = inner.names[..wave_count].to_vec();
            let intervals = vec![sample_interval; wave_count];
            (channels, intervals, names, count_changed)
        };

        if count_changed {
            self.output.channels_changed.emit(&());
        }
        self.output.publish(channels, intervals, names);
        self.ready.emit(&());
        true
    }
}

impl Node for WaveGeneratorNode {
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

impl AnalogNode for WaveGeneratorNode {
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

impl TypedNode for WaveGeneratorNode {
    const TYPE_NAME: &'static str = "WAVE";

    fn create(state: ObservableMapHandle, _graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| WaveGeneratorNode {
            ready: Signal::new(),
            output: AnalogOutput::new(),
            state: state.clone(),
            inner: RefCell::new(WaveState {
                waves: Vec::new(),
                waves_state: None,
                last_wave_count: 0,
                sample_interval: Duration::ZERO,
                poll_interval: Duration::from_millis(100),
                running: false,
                start: Duration::ZERO,
                emitted: Duration::ZERO,
                names: Vec::new(),
            }),
            weak_self: weak.clone(),
            task: RefCell::new(None),
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

impl Drop for WaveGeneratorNode {
    fn drop(&mut self) {
        if let Some(task) = self.task.borrow_mut().take() {
            task.abort();
        }
        if self.state.contains("Running") {
            self.state.assign("Running", false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thalamus_state::ObservableMap;

    fn wave_node(config: serde_json::Value) -> Rc<WaveGeneratorNode> {
        let state = ObservableMap::new();
        if let Value::Map(map) = Value::from_json(&config) {
            for (key, value) in map.entries() {
                state.assign_with(key, value, None, false);
            }
        }
        let nodes = thalamus_state::ObservableList::new();
        let graph = crate::graph::NodeGraph::with_factories(nodes, vec![]);
        WaveGeneratorNode::create(state, &graph).unwrap()
    }

    fn generate(node: &Rc<WaveGeneratorNode>, elapsed: Duration) -> Vec<Vec<f64>> {
        // Drive the sampler directly instead of waiting on timers.
        {
            let mut inner = node.inner.borrow_mut();
            inner.running = true;
            inner.start = clock::steady_now()
                .checked_sub(elapsed)
                .unwrap_or_default();
            inner.emitted = Duration::ZERO;
        }
        assert!(node.tick());
        (0..node.num_channels())
            .map(|c| AnalogNode::data(&**node, c).to_vec())
            .collect()
    }

    #[test]
    fn test_sine_samples() {
        let node = wave_node(serde_json::json!({
            "Frequency": 1.0,
            "Amplitude": 1.0,
            "Sample Rate": 1000.0,
            "Poll Interval": 100
        }));
        let channels = generate(&node, Duration::from_millis(200));
        assert_eq!(channels.len(), 1);
        let samples = &channels[0];
        assert!(samples.len() >= 200);
        for (k, sample) in samples.iter().enumerate() {
            let expected = (2.0 * std::f64::consts::PI * k as f64 / 1000.0).sin();
            assert!(
                (sample - expected).abs() < 1e-9,
                "sample {} was {}, expected {}",
                k,
                sample,
                expected
            );
        }
    }

    #[test]
    fn test_square_duty_cycle() {
        let node = wave_node(serde_json::json!({
            "Frequency": 10.0,
            "Amplitude": 1.0,
            "Shape": "Square",
            "Duty Cycle": 0.5,
            "Sample Rate": 1000.0
        }));
        let channels = generate(&node, Duration::from_millis(100));
        let samples = &channels[0];
        // One 10 Hz period is 100 samples: first half high, second half low.
        assert_eq!(samples[0], 1.0);
        assert_eq!(samples[25], 1.0);
        assert_eq!(samples[60], -1.0);
        assert_eq!(samples[99], -1.0);
    }

    #[test]
    fn test_catch_up_after_long_pause() {
        let node = wave_node(serde_json::json!({
            "Frequency": 1.0,
            "Sample Rate": 1000.0
        }));
        let channels = generate(&node, Duration::from_millis(500));
        // A half second pause still yields every ideal sample.
        assert!(channels[0].len() >= 500);
    }

    #[test]
    fn test_multiple_waves() {
        let node = wave_node(serde_json::json!({
            "Sample Rate": 1000.0,
            "Waves": [
                {"Frequency": 1.0, "Amplitude": 1.0},
                {"Frequency": 2.0, "Amplitude": 0.5, "Shape": "Triangle"}
            ]
        }));
        let channels = generate(&node, Duration::from_millis(50));
        assert_eq!(channels.len(), 2);
        assert_eq!(AnalogNode::name(&*node, 0), "0");
        assert_eq!(AnalogNode::name(&*node, 1), "1");
    }
}
