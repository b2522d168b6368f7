//! Analog signal contract and the shared output buffer.

use crate::clock;
use crate::error::{GraphError, Result};
use std::cell::{Ref, RefCell};
use std::time::Duration;
use thalamus_state::Signal;

/// A borrowed span of samples, valid only until the producing node's next
/// `ready`.
pub type AnalogSpan<'a> = Ref<'a, [f64]>;

/// Borrowed span of 16-bit samples for sources that produce shorts.
pub type ShortSpan<'a> = Ref<'a, [i16]>;

/// Read-only analog interface: an ordered set of channels, each a span of
/// samples with its own sample interval and name.
pub trait AnalogNode {
    /// Fires when `num_channels` or channel naming changes.
    fn channels_changed(&self) -> &Signal<()>;

    fn num_channels(&self) -> usize;

    /// The samples most recently produced on `channel`. Consumers must
    /// copy anything they keep before returning to the scheduler.
    fn data(&self, channel: usize) -> AnalogSpan<'_>;

    /// Raw 16-bit samples, for sources that acquire shorts.
    fn short_data(&self, _channel: usize) -> Option<ShortSpan<'_>> {
        None
    }

    fn is_short_data(&self) -> bool {
        false
    }

    fn sample_interval(&self, channel: usize) -> Duration;

    /// Steady-clock timestamp of the most recent sample.
    fn time(&self) -> Duration;

    /// Timestamp attributed by a remote originator, where one exists.
    fn remote_time(&self) -> Duration {
        self.time()
    }

    fn name(&self, channel: usize) -> String;

    fn recommended_channels(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the most recent `ready` carried analog output.
    fn has_analog_data(&self) -> bool {
        true
    }

    /// Replaces the exposed output, for replay and test harnesses.
    /// Derived nodes that compute their output from a source reject this.
    fn inject(
        &self,
        channels: Vec<Vec<f64>>,
        sample_intervals: Vec<Duration>,
        names: Vec<String>,
    ) -> Result<()>;
}

struct AnalogData {
    channels: Vec<Vec<f64>>,
    sample_intervals: Vec<Duration>,
    names: Vec<String>,
    time: Duration,
}

/// The shared analog output buffer.
///
/// Nodes that produce analog data embed one of these, publish into it, and
/// then fire their own `ready`. Accessors hand out borrows of the
/// published buffers; the producer must not publish again until all
/// synchronous `ready` handlers have returned, which is exactly the
/// single-threaded dispatch discipline of the io executor.
pub struct AnalogOutput {
    inner: RefCell<AnalogData>,
    pub channels_changed: Signal<()>,
}

impl Default for AnalogOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogOutput {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(AnalogData {
                channels: Vec::new(),
                sample_intervals: Vec::new(),
                names: Vec::new(),
                time: Duration::ZERO,
            }),
            channels_changed: Signal::new(),
        }
    }

    /// Publishes a fresh set of channel buffers, timestamped now.
    pub fn publish(
        &self,
        channels: Vec<Vec<f64>>,
        sample_intervals: Vec<Duration>,
        names: Vec<String>,
    ) {
        self.publish_at(channels, sample_intervals, names, clock::steady_now());
    }

    pub fn publish_at(
        &self,
        channels: Vec<Vec<f64>>,
        sample_intervals: Vec<Duration>,
        names: Vec<String>,
        time: Duration,
    ) {
        let mut inner = self.inner.borrow_mut();
        inner.channels = channels;
        inner.sample_intervals = sample_intervals;
        inner.names = names;
        inner.time = time;
    }

    pub fn num_channels(&self) -> usize {
        self.inner.borrow().channels.len()
    }

    pub fn data(&self, channel: usize) -> AnalogSpan<'_> {
        Ref::map(self.inner.borrow(), |d| d.channels[channel].as_slice())
    }

    pub fn sample_interval(&self, channel: usize) -> Duration {
        let inner = self.inner.borrow();
        inner
            .sample_intervals
            .get(channel)
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn time(&self) -> Duration {
        self.inner.borrow().time
    }

    pub fn name(&self, channel: usize) -> String {
        self.inner
            .borrow()
            .names
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.borrow().names.clone()
    }
}

/// Error helper for derived nodes that cannot accept injected data.
pub fn reject_inject(node: &str) -> GraphError {
    GraphError::Unsupported {
        node: node.to_string(),
        operation: "inject".to_string(),
    }
}

/// Sample interval to frequency, `0` interval maps to `0.0`.
pub fn interval_to_frequency(interval: Duration) -> f64 {
    let nanos = interval.as_nanos();
    if nanos == 0 {
        0.0
    } else {
        1e9 / nanos as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_borrow() {
        let output = AnalogOutput::new();
        output.publish(
            vec![vec![1.0, 2.0], vec![3.0]],
            vec![Duration::from_millis(1), Duration::from_millis(2)],
            vec!["a".to_string(), "b".to_string()],
        );

        assert_eq!(output.num_channels(), 2);
        assert_eq!(&*output.data(0), &[1.0, 2.0]);
        assert_eq!(&*output.data(1), &[3.0]);
        assert_eq!(output.sample_interval(1), Duration::from_millis(2));
        assert_eq!(output.name(0), "a");
    }

    #[test]
    fn test_interval_to_frequency() {
        assert_eq!(interval_to_frequency(Duration::from_millis(1)), 1000.0);
        assert_eq!(interval_to_frequency(Duration::ZERO), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_channel_panics() {
        let output = AnalogOutput::new();
        let _ = output.data(0);
    }
}
