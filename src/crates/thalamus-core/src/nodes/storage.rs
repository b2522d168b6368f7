//! The recording pipeline.
//!
//! Subscribes to the `ready` signal of every node named in `Sources` and
//! serializes each event into a single length-framed record log, together
//! with externally injected events and log records. Serialization and
//! deflate run banded on the thread pool; a dedicated writer thread only
//! performs I/O. When `Compress Analog` is set, each `(node, channel)`
//! pair becomes a deflate stream whose chunks are wrapped in `Compressed`
//! records; shutdown finishes every stream with one trailing record.
//!
//! The queue depth and queued byte count are republished once a second as
//! the node's own analog channels.

use crate::analog::{AnalogNode, AnalogSpan};
use crate::clock;
use crate::error::Result;
use crate::graph::{NodeGraph, NodeGraphWeak, Selector, TypedNode};
use crate::node::{analog_view, image_view, motion_view, text_view, Modalities, Node};
use crate::thread_pool::ThreadPool;
use flate2::{Compress, Compression, FlushCompress, Status};
use parking_lot::{Condvar, Mutex};
use prost::Message;
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thalamus_proto::{compressed, storage_record, AnalogResponse, Compressed, Span, StorageRecord};
use thalamus_state::{ChangeEvent, Connection, ObservableMapHandle, Signal};

const EVENTS_METRIC: i32 = 1;
const LOG_METRIC: i32 = 2;
const FIRST_SOURCE_METRIC: i32 = 3;

struct Shared {
    queue: Mutex<Vec<(StorageRecord, i32)>>,
    condition: Condvar,
    running: AtomicBool,
    queued_records: AtomicU64,
    queued_bytes: AtomicU64,
}

#[derive(Default)]
struct Metrics {
    values: Vec<f64>,
    is_rate: Vec<bool>,
    names: Vec<String>,
    offsets: HashMap<(i32, i32), usize>,
}

pub struct StorageNode {
    ready: Signal<()>,
    channels_changed: Signal<()>,
    state: ObservableMapHandle,
    graph: NodeGraphWeak,
    weak_self: Weak<StorageNode>,
    shared: Arc<Shared>,
    writer: RefCell<Option<std::thread::JoinHandle<()>>>,
    metrics: RefCell<Metrics>,
    metrics_time: Cell<Duration>,
    last_publish: Cell<Duration>,
    compress: Cell<bool>,
    streams: RefCell<HashMap<(usize, usize), i32>>,
    next_stream: Cell<i32>,
    source_connections: RefCell<Vec<Connection>>,
    event_connections: RefCell<Vec<Connection>>,
    stats_task: RefCell<Option<tokio::task::JoinHandle<()>>>,
    _state_connection: RefCell<Option<Connection>>,
}

impl StorageNode {
    /// `<path>.<YYYYMMDDhhmmss>.<N>` with the smallest unused `N`.
    pub fn next_file(path: &Path, start: chrono::DateTime<chrono::Local>) -> PathBuf {
        let stamp = start.format("%Y%m%d%H%M%S");
        let mut n = 0;
        loop {
            n += 1;
            let candidate = PathBuf::from(format!("{}.{}.{}", path.display(), stamp, n));
            if !candidate.exists() {
                return candidate;
            }
        }
    }

    fn on_change(&self, _ev: &ChangeEvent) {
        let Some(running) = self.state.get_bool("Running") else {
            return;
        };
        if !running {
            self.stop();
            return;
        }
        let Some(output_file) = self.state.get_string("Output File") else {
            tracing::warn!("storage has no Output File configured");
            self.stop();
            return;
        };
        let compress = self.state.get_bool("Compress Analog").unwrap_or(false);
        self.compress.set(compress);
        self.last_publish.set(clock::steady_now());
        self.start(PathBuf::from(output_file), compress);

        self.source_connections.borrow_mut().clear();
        self.event_connections.borrow_mut().clear();
        {
            let mut metrics = self.metrics.borrow_mut();
            *metrics = Metrics::default();
        }

        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        self.subscribe_broadcasts(&graph);
        if let Some(sources) = self.state.get_string("Sources") {
            let mut metric_index = FIRST_SOURCE_METRIC;
            for token in sources.split(',') {
                let token = token.trim().to_string();
                if token.is_empty() {
                    continue;
                }
                self.subscribe_source(&graph, token, metric_index);
                metric_index += 1;
            }
        }
    }

    fn subscribe_broadcasts(&self, graph: &NodeGraph) {
        let weak = self.weak_self.clone();
        let events = graph.events_signal().connect(move |event| {
            if let Some(node) = weak.upgrade() {
                node.on_event(event);
            }
        });
        let weak = self.weak_self.clone();
        let logs = graph.log_signal().connect(move |text| {
            if let Some(node) = weak.upgrade() {
                node.on_log(text);
            }
        });
        let mut connections = self.event_connections.borrow_mut();
        connections.push(events);
        connections.push(logs);
    }

    fn subscribe_source(&self, graph: &NodeGraph, token: String, metric_index: i32) {
        let weak = self.weak_self.clone();
        graph.get_node_async(Selector::name(token.clone()), move |source| {
            let Some(node) = weak.upgrade() else {
                return;
            };
            let Some(locked) = source.upgrade() else {
                return;
            };
            let weak_node = Rc::downgrade(&node);
            let source2 = source.clone();
            let connection = locked.ready().connect(move |_| {
                let (Some(node), Some(locked)) = (weak_node.upgrade(), source2.upgrade())
                else {
                    return;
                };
                node.on_source_ready(&token, &locked, metric_index);
            });
            node.source_connections.borrow_mut().push(connection);
        });
    }

    fn on_source_ready(&self, name: &str, source: &Rc<dyn Node>, metric_index: i32) {
        if !self.shared.running.load(Ordering::Relaxed) {
            return;
        }
        if let Some(analog) = analog_view(&**source) {
            if analog.has_analog_data() {
                self.record_analog(name, source, analog, metric_index);
            }
        }
        if let Some(motion) = motion_view(&**source) {
            if motion.has_motion_data() {
                self.record_motion(name, motion, metric_index);
            }
        }
        if let Some(image) = image_view(&**source) {
            if image.has_image_data() {
                self.record_image(name, image, metric_index);
            }
        }
        if let Some(text) = text_view(&**source) {
            if text.has_text_data() {
                self.record_text(name, text, metric_index);
            }
        }
    }

    fn record_analog(
        &self,
        name: &str,
        source: &Rc<dyn Node>,
        analog: &dyn AnalogNode,
        metric_index: i32,
    ) {
        let compress = self.compress.get();
        let node_key = Rc::as_ptr(source) as *const () as usize;
        let time = clock::to_nanos(analog.time());
        let remote_time = clock::to_nanos(analog.remote_time());

        if compress {
            for channel in 0..analog.num_channels() {
                let data = analog.data(channel);
                if data.is_empty() {
                    continue;
                }
                let channel_name = analog.name(channel);
                self.count_metric(metric_index, channel as i32, data.len() as f64, || {
                    format!("{}({})", name, channel_name)
                });
                let body = AnalogResponse {
                    data: data.to_vec(),
                    spans: vec![Span {
                        begin: 0,
                        end: data.len() as u64,
                        name: channel_name,
                    }],
                    sample_intervals: vec![analog.sample_interval(channel).as_nanos() as u64],
                    time,
                    remote_time,
                    ..Default::default()
                };
                drop(data);
                let stream = self.stream_id(node_key, channel);
                self.queue_record(
                    StorageRecord {
                        time,
                        node: name.to_string(),
                        body: Some(storage_record::Body::Analog(body)),
                    },
                    stream,
                );
            }
            return;
        }

        let mut body = AnalogResponse {
            time,
            remote_time,
            ..Default::default()
        };
        for channel in 0..analog.num_channels() {
            let channel_name = analog.name(channel);
            let begin = body.data.len() as u64;
            {
                let data = analog.data(channel);
                self.count_metric(metric_index, channel as i32, data.len() as f64, || {
                    format!("{}({})", name, channel_name)
                });
                body.data.extend_from_slice(&data);
            }
            body.spans.push(Span {
                begin,
                end: body.data.len() as u64,
                name: analog.name(channel),
            });
            body.sample_intervals
                .push(analog.sample_interval(channel).as_nanos() as u64);
        }
        self.queue_record(
            StorageRecord {
                time,
                node: name.to_string(),
                body: Some(storage_record::Body::Analog(body)),
            },
            0,
        );
    }

    fn record_motion(&self, name: &str, motion: &dyn crate::motion::MotionCaptureNode, metric_index: i32) {
        self.count_metric(metric_index, -1, 1.0, || format!("{} (motion)", name));
        let segments = motion
            .segments()
            .iter()
            .map(|s| s.to_wire())
            .collect::<Vec<_>>();
        let time = clock::to_nanos(motion.time());
        self.queue_record(
            StorageRecord {
                time,
                node: name.to_string(),
                body: Some(storage_record::Body::Xsens(thalamus_proto::XsensResponse {
                    segments,
                    pose_name: motion.pose_name(),
                    time,
                })),
            },
            0,
        );
    }

    fn record_image(&self, name: &str, image: &dyn crate::image::ImageNode, metric_index: i32) {
        self.count_metric(metric_index, -2, 1.0, || format!("{} (image)", name));
        let mut planes = Vec::with_capacity(image.num_planes());
        for i in 0..image.num_planes() {
            planes.push(image.plane(i).to_vec());
        }
        let time = clock::to_nanos(image.time());
        self.queue_record(
            StorageRecord {
                time,
                node: name.to_string(),
                body: Some(storage_record::Body::Image(thalamus_proto::Image {
                    width: image.width(),
                    height: image.height(),
                    format: image.format().to_wire() as i32,
                    data: planes,
                    frame_interval: image.frame_interval().as_nanos() as u64,
                    time,
                })),
            },
            0,
        );
    }

    fn record_text(&self, name: &str, text: &dyn crate::text::TextNode, metric_index: i32) {
        self.count_metric(metric_index, -3, 1.0, || format!("{} (text)", name));
        let time = clock::to_nanos(text.time());
        self.queue_record(
            StorageRecord {
                time,
                node: name.to_string(),
                body: Some(storage_record::Body::Text(thalamus_proto::Text {
                    text: text.text().to_string(),
                    time,
                    ..Default::default()
                })),
            },
            0,
        );
    }

    fn on_event(&self, event: &thalamus_proto::Event) {
        if !self.shared.running.load(Ordering::Relaxed) {
            return;
        }
        self.count_metric(EVENTS_METRIC, 0, 1.0, || "Events".to_string());
        self.queue_record(
            StorageRecord {
                time: event.time,
                node: String::new(),
                body: Some(storage_record::Body::Event(event.clone())),
            },
            0,
        );
    }

    fn on_log(&self, text: &thalamus_proto::Text) {
        if !self.shared.running.load(Ordering::Relaxed) {
            return;
        }
        self.count_metric(LOG_METRIC, 0, 1.0, || "Log".to_string());
        self.queue_record(
            StorageRecord {
                time: text.time,
                node: text.node.clone(),
                body: Some(storage_record::Body::Text(text.clone())),
            },
            0,
        );
    }

    fn stream_id(&self, node_key: usize, channel: usize) -> i32 {
        let mut streams = self.streams.borrow_mut();
        *streams.entry((node_key, channel)).or_insert_with(|| {
            let id = self.next_stream.get();
            self.next_stream.set(id + 1);
            id
        })
    }

    fn count_metric(
        &self,
        index: i32,
        sub_index: i32,
        count: f64,
        name: impl FnOnce() -> String,
    ) {
        let added = {
            let mut metrics = self.metrics.borrow_mut();
            let key = (index, sub_index);
            match metrics.offsets.get(&key).copied() {
                Some(offset) => {
                    metrics.values[offset] += count;
                    false
                }
                None => {
                    let offset = metrics.values.len();
                    metrics.offsets.insert(key, offset);
                    metrics.values.push(count);
                    metrics.is_rate.push(true);
                    metrics.names.push(name());
                    true
                }
            }
        };
        if added {
            self.channels_changed.emit(&());
        }
    }

    fn set_gauge(&self, index: i32, sub_index: i32, value: f64, name: impl FnOnce() -> String) {
        let added = {
            let mut metrics = self.metrics.borrow_mut();
            let key = (index, sub_index);
            match metrics.offsets.get(&key).copied() {
                Some(offset) => {
                    metrics.values[offset] = value;
                    false
                }
                None => {
                    let offset = metrics.values.len();
                    metrics.offsets.insert(key, offset);
                    metrics.values.push(value);
                    metrics.is_rate.push(false);
                    metrics.names.push(name());
                    true
                }
            }
        };
        if added {
            self.channels_changed.emit(&());
        }
    }

    fn queue_record(&self, record: StorageRecord, stream: i32) {
        self.shared.queued_records.fetch_add(1, Ordering::Relaxed);
        self.shared
            .queued_bytes
            .fetch_add(record.encoded_len() as u64, Ordering::Relaxed);
        let mut queue = self.shared.queue.lock();
        queue.push((record, stream));
        self.shared.condition.notify_one();
    }

    fn start(&self, output_file: PathBuf, compress: bool) {
        self.stop();
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.queued_records.store(0, Ordering::Relaxed);
        self.shared.queued_bytes.store(0, Ordering::Relaxed);
        self.shared.queue.lock().clear();
        self.streams.borrow_mut().clear();
        self.next_stream.set(0);

        let shared = Arc::clone(&self.shared);
        let pool = graph.thread_pool();
        let path = Self::next_file(&output_file, graph.start_wall());
        tracing::info!(path = %path.display(), compress, "storage recording started");
        let handle = std::thread::Builder::new()
            .name("STORAGE".to_string())
            .spawn(move || writer_target(shared, pool, path, compress))
            .expect("failed to spawn storage writer");
        *self.writer.borrow_mut() = Some(handle);

        // Once a second the metric counters become the node's own output.
        let weak = self.weak_self.clone();
        let stats = tokio::task::spawn_local(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let Some(node) = weak.upgrade() else {
                    break;
                };
                if !node.shared.running.load(Ordering::Relaxed) {
                    break;
                }
                node.on_stats_timer();
            }
        });
        if let Some(previous) = self.stats_task.borrow_mut().replace(stats) {
            previous.abort();
        }
    }

    fn on_stats_timer(&self) {
        self.set_gauge(0, 0, self.shared.queued_records.load(Ordering::Relaxed) as f64, || {
            "Output Queue Count".to_string()
        });
        self.set_gauge(0, 1, self.shared.queued_bytes.load(Ordering::Relaxed) as f64, || {
            "Output Queue Bytes".to_string()
        });

        let now = clock::steady_now();
        let elapsed = now.saturating_sub(self.last_publish.get()).as_secs_f64();
        if elapsed > 0.0 {
            let mut metrics = self.metrics.borrow_mut();
            let metrics = &mut *metrics;
            for (value, is_rate) in metrics.values.iter_mut().zip(metrics.is_rate.iter()) {
                if *is_rate {
                    *value /= elapsed;
                }
            }
        }
        self.metrics_time.set(now);
        self.ready.emit(&());
        self.last_publish.set(now);
        let mut metrics = self.metrics.borrow_mut();
        let metrics = &mut *metrics;
        for (value, is_rate) in metrics.values.iter_mut().zip(metrics.is_rate.iter()) {
            if *is_rate {
                *value = 0.0;
            }
        }
    }

    fn stop(&self) {
        if let Some(task) = self.stats_task.borrow_mut().take() {
            task.abort();
        }
        if self.shared.running.swap(false, Ordering::SeqCst) {
            self.shared.condition.notify_all();
        }
        if let Some(handle) = self.writer.borrow_mut().take() {
            let _ = handle.join();
        }
        self.source_connections.borrow_mut().clear();
        self.event_connections.borrow_mut().clear();
    }
}

/// Drains the queue to disk until `running` clears, then flushes every
/// deflate stream.
fn writer_target(shared: Arc<Shared>, pool: ThreadPool, path: PathBuf, compress: bool) {
    let file = match std::fs::File::create(&path) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to open record log");
            return;
        }
    };
    let mut output = std::io::BufWriter::new(file);
    let mut streams: HashMap<i32, Arc<Mutex<Compress>>> = HashMap::new();

    loop {
        let batch = {
            let mut queue = shared.queue.lock();
            if queue.is_empty() {
                if !shared.running.load(Ordering::SeqCst) {
                    break;
                }
                shared
                    .condition
                    .wait_for(&mut queue, Duration::from_secs(1));
            }
            std::mem::take(&mut *queue)
        };
        if batch.is_empty() {
            continue;
        }
        write_batch(&shared, &pool, &mut output, &mut streams, batch, compress);
    }

    finish_streams(&pool, &mut output, &mut streams);
    if let Err(e) = output.flush() {
        tracing::error!(error = %e, "record log flush failed");
    }
    tracing::info!(path = %path.display(), "storage recording closed");
}

fn write_batch(
    shared: &Arc<Shared>,
    pool: &ThreadPool,
    output: &mut impl Write,
    streams: &mut HashMap<i32, Arc<Mutex<Compress>>>,
    batch: Vec<(StorageRecord, i32)>,
    compress: bool,
) {
    let count = batch.len();
    let mut bytes_taken = 0u64;

    // Partition: indexes of plain records, and compressed-analog indexes
    // grouped per stream so one band owns each deflate context.
    let mut plain = Vec::new();
    let mut per_stream: HashMap<i32, Vec<usize>> = HashMap::new();
    for (i, (record, stream)) in batch.iter().enumerate() {
        bytes_taken += record.encoded_len() as u64;
        let is_compressed_analog =
            compress && matches!(record.body, Some(storage_record::Body::Analog(_)));
        if is_compressed_analog {
            streams
                .entry(*stream)
                .or_insert_with(|| Arc::new(Mutex::new(Compress::new(Compression::new(1), true))));
            per_stream.entry(*stream).or_default().push(i);
        } else {
            plain.push(i);
        }
    }

    let batch = Arc::new(batch);
    let outputs: Arc<Mutex<Vec<Option<Vec<u8>>>>> = Arc::new(Mutex::new(vec![None; count]));
    let pending = Arc::new((Mutex::new(0usize), Condvar::new()));

    let spawn = |job: Box<dyn FnOnce() + Send>| {
        *pending.0.lock() += 1;
        let pending = Arc::clone(&pending);
        pool.push(move || {
            job();
            let mut remaining = pending.0.lock();
            *remaining -= 1;
            pending.1.notify_all();
        });
    };

    // Plain records serialize in chunks sized to the pool.
    let band = (plain.len() / pool.num_threads().max(1)).max(1);
    for chunk in plain.chunks(band) {
        let chunk = chunk.to_vec();
        let batch = Arc::clone(&batch);
        let outputs = Arc::clone(&outputs);
        spawn(Box::new(move || {
            for i in chunk {
                let bytes = batch[i].0.encode_to_vec();
                outputs.lock()[i] = Some(bytes);
            }
        }));
    }

    // Each deflate stream is processed in order by one job.
    for (stream, indexes) in per_stream {
        let context = Arc::clone(&streams[&stream]);
        let batch = Arc::clone(&batch);
        let outputs = Arc::clone(&outputs);
        spawn(Box::new(move || {
            let mut context = context.lock();
            for i in indexes {
                let serialized = batch[i].0.encode_to_vec();
                let chunk = deflate_chunk(&mut context, &serialized, FlushCompress::None);
                let wrapped = StorageRecord {
                    time: batch[i].0.time,
                    node: String::new(),
                    body: Some(storage_record::Body::Compressed(Compressed {
                        r#type: compressed::Type::Analog as i32,
                        stream,
                        size: serialized.len() as u64,
                        data: chunk,
                    })),
                };
                outputs.lock()[i] = Some(wrapped.encode_to_vec());
            }
        }));
    }

    {
        let mut remaining = pending.0.lock();
        while *remaining > 0 {
            pending.1.wait(&mut remaining);
        }
    }

    let outputs = outputs.lock();
    for bytes in outputs.iter().flatten() {
        write_frame(output, bytes);
    }
    shared
        .queued_records
        .fetch_sub(count as u64, Ordering::Relaxed);
    let queued = &shared.queued_bytes;
    let mut current = queued.load(Ordering::Relaxed);
    loop {
        let next = current.saturating_sub(bytes_taken);
        match queued.compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

fn finish_streams(
    pool: &ThreadPool,
    output: &mut impl Write,
    streams: &mut HashMap<i32, Arc<Mutex<Compress>>>,
) {
    let _ = pool;
    let mut ids: Vec<i32> = streams.keys().copied().collect();
    ids.sort_unstable();
    for stream in ids {
        let context = Arc::clone(&streams[&stream]);
        let mut context = context.lock();
        let chunk = deflate_chunk(&mut context, &[], FlushCompress::Finish);
        let trailer = StorageRecord {
            time: 0,
            node: String::new(),
            body: Some(storage_record::Body::Compressed(Compressed {
                r#type: compressed::Type::None as i32,
                stream,
                size: 0,
                data: chunk,
            })),
        };
        write_frame(output, &trailer.encode_to_vec());
    }
    streams.clear();
}

fn write_frame(output: &mut impl Write, bytes: &[u8]) {
    let size = (bytes.len() as u64).to_be_bytes();
    if let Err(e) = output.write_all(&size).and_then(|_| output.write_all(bytes)) {
        tracing::error!(error = %e, "record log write failed");
    }
}

/// Runs `input` through the deflate context, returning whatever output
/// the context produced. With `FlushCompress::None` the context may
/// retain bytes that only appear in a later chunk.
fn deflate_chunk(context: &mut Compress, input: &[u8], flush: FlushCompress) -> Vec<u8> {
    let mut out = Vec::new();
    let mut consumed = 0usize;
    let mut buffer = vec![0u8; 4096];
    loop {
        let before_in = context.total_in();
        let before_out = context.total_out();
        let status = context
            .compress(&input[consumed..], &mut buffer, flush)
            .expect("deflate failed");
        consumed += (context.total_in() - before_in) as usize;
        let produced = (context.total_out() - before_out) as usize;
        out.extend_from_slice(&buffer[..produced]);
        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                let done = match flush {
                    FlushCompress::Finish => false,
                    _ => consumed >= input.len() && produced < buffer.len(),
                };
                let stalled = produced == 0
                    && consumed >= input.len()
                    && matches!(status, Status::BufError);
                if done || stalled {
                    break;
                }
            }
        }
    }
    out
}

impl Node for StorageNode {
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

impl AnalogNode for StorageNode {
    fn channels_changed(&self) -> &Signal<()> {
        &self.channels_changed
    }

    fn num_channels(&self) -> usize {
        self.metrics.borrow().values.len()
    }

    fn data(&self, channel: usize) -> AnalogSpan<'_> {
        Ref::map(self.metrics.borrow(), |m| {
            std::slice::from_ref(&m.values[channel])
        })
    }

    fn sample_interval(&self, _channel: usize) -> Duration {
        Duration::from_secs(1)
    }

    fn time(&self) -> Duration {
        self.metrics_time.get()
    }

    fn name(&self, channel: usize) -> String {
        self.metrics
            .borrow()
            .names
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    fn recommended_channels(&self) -> Vec<String> {
        self.metrics.borrow().names.clone()
    }

    fn inject(&self, _: Vec<Vec<f64>>, _: Vec<Duration>, _: Vec<String>) -> Result<()> {
        Err(crate::analog::reject_inject(Self::TYPE_NAME))
    }
}

impl TypedNode for StorageNode {
    const TYPE_NAME: &'static str = "STORAGE";

    fn create(state: ObservableMapHandle, graph: &NodeGraph) -> Result<Rc<Self>> {
        let node = Rc::new_cyclic(|weak| StorageNode {
            ready: Signal::new(),
            channels_changed: Signal::new(),
            state: state.clone(),
            graph: graph.downgrade(),
            weak_self: weak.clone(),
            shared: Arc::new(Shared {
                queue: Mutex::new(Vec::new()),
                condition: Condvar::new(),
                running: AtomicBool::new(false),
                queued_records: AtomicU64::new(0),
                queued_bytes: AtomicU64::new(0),
            }),
            writer: RefCell::new(None),
            metrics: RefCell::new(Metrics::default()),
            metrics_time: Cell::new(Duration::ZERO),
            last_publish: Cell::new(Duration::ZERO),
            compress: Cell::new(false),
            streams: RefCell::new(HashMap::new()),
            next_stream: Cell::new(0),
            source_connections: RefCell::new(Vec::new()),
            event_connections: RefCell::new(Vec::new()),
            stats_task: RefCell::new(None),
            _state_connection: RefCell::new(None),
        });

        let weak = Rc::downgrade(&node);
        let connection = state.changed.connect(move |ev| {
            if let Some(node) = weak.upgrade() {
                node.on_change(ev);
            }
        });
        *node._state_connection.borrow_mut() = Some(connection);

        let node2 = Rc::clone(&node);
        state.recap_with(move |ev| node2.on_change(ev));
        Ok(node)
    }
}

impl Drop for StorageNode {
    fn drop(&mut self) {
        if self.state.contains("Running") {
            self.state.assign("Running", false);
        }
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_file_picks_unused_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("capture");
        let start = chrono::Local::now();
        let first = StorageNode::next_file(&base, start);
        assert!(first.to_string_lossy().ends_with(".1"));
        std::fs::write(&first, b"x").unwrap();
        let second = StorageNode::next_file(&base, start);
        assert!(second.to_string_lossy().ends_with(".2"));
    }

    #[test]
    fn test_deflate_round_trip_across_chunks() {
        let mut context = Compress::new(Compression::new(1), true);
        let part1 = deflate_chunk(&mut context, b"hello ", FlushCompress::None);
        let part2 = deflate_chunk(&mut context, b"deflate world", FlushCompress::None);
        let tail = deflate_chunk(&mut context, &[], FlushCompress::Finish);

        let mut compressed = Vec::new();
        compressed.extend_from_slice(&part1);
        compressed.extend_from_slice(&part2);
        compressed.extend_from_slice(&tail);

        let mut decoder = flate2::read::ZlibDecoder::new(compressed.as_slice());
        let mut decoded = String::new();
        std::io::Read::read_to_string(&mut decoder, &mut decoded).unwrap();
        assert_eq!(decoded, "hello deflate world");
    }

    #[test]
    fn test_write_frame_layout() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &[1, 2, 3]);
        assert_eq!(&buf[..8], &[0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(&buf[8..], &[1, 2, 3]);
    }
}
