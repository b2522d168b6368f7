//! Thalamus server binary.
//!
//! Runs the node graph on a dedicated single-threaded io executor and
//! serves the `Thalamus` gRPC service from a multi-thread transport
//! runtime. With `--state-url` the local tree mirrors an authoritative
//! remote server instead of owning its own configuration.

use clap::Parser;
use std::net::SocketAddr;
use thalamus_core::{io_channel, NodeGraph};
use thalamus_proto::thalamus_server::ThalamusServer;
use thalamus_server::{StateManager, ThalamusService};
use thalamus_state::{ObservableList, ObservableMap, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "thalamus-server", about = "Real-time acquisition and distribution fabric")]
struct Args {
    /// gRPC listening port.
    #[arg(short, long, default_value_t = 50050)]
    port: u16,

    /// Address of the thalamus instance that manages state. When set,
    /// the local tree mirrors the remote one over the observable bridge.
    #[arg(short, long)]
    state_url: Option<String>,

    /// Enable chrome-trace output.
    #[arg(short, long)]
    trace: bool,
}

fn init_logging(timestamp: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    let log_path = log_dir.join(format!("thalamus_{}.log", timestamp));
    match std::fs::File::create(&log_path) {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            tracing::info!(path = %log_path.display(), "logging to file");
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            tracing::warn!(path = %log_path.display(), error = %e, "failed to create log file");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let timestamp = chrono::Local::now().format("%Y%m%dT%H%M%S").to_string();
    init_logging(&timestamp);
    if args.trace {
        // The chrome-trace layer is reserved; structured logging already
        // carries the per-event timing the trace would.
        tracing::warn!("--trace requested; emitting structured tracing only");
    }

    let transport = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let transport_handle = transport.handle().clone();

    let (io, queue) = io_channel();
    let io_for_service = io.clone();
    let state_url = args.state_url.clone();

    // The io executor thread: graph wiring, signals, state tree.
    let io_thread = std::thread::Builder::new().name("io".to_string()).spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("io runtime");
        let local = tokio::task::LocalSet::new();
        runtime.block_on(local.run_until(async move {
            let root = ObservableMap::new();
            let nodes = ObservableList::new();
            root.assign("nodes", nodes.clone());

            let graph = NodeGraph::new(nodes);
            graph.set_runtime(transport_handle.clone());
            graph.set_io_executor(io.clone());
            graph.set_root(Value::Map(root.clone()));
            // The loop below must end once the transport side lets go.
            drop(io);

            let _state_manager = state_url.map(|url| {
                tracing::info!(url = %url, "mirroring state from remote server");
                let channel = graph
                    .channel(&url)
                    .expect("state server address must be valid");
                StateManager::attach(&Value::Map(root.clone()), channel, transport_handle)
            });

            tracing::info!("node graph running");
            queue.run(graph).await;
            tracing::info!("io executor drained");
        }));
    })?;

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    tracing::info!(%addr, "serving thalamus grpc");
    let service = ThalamusService::new(io_for_service);
    transport.block_on(async move {
        tonic::transport::Server::builder()
            .add_service(ThalamusServer::new(service))
            .serve_with_shutdown(addr, async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutting down");
            })
            .await
    })?;

    // Dropping the transport runtime tears down every IoExecutor clone
    // held by request tasks, which lets the io loop drain and exit.
    drop(transport);
    let _ = io_thread.join();
    tracing::info!("thalamus ending");
    Ok(())
}
