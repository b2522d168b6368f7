//! The io executor boundary.
//!
//! All graph wiring, state-tree mutation and `ready` delivery happens on
//! one single-threaded executor (a tokio `LocalSet` on a dedicated
//! current-thread runtime). Other threads, including the RPC transport and
//! device adapters, interact with the graph exclusively by posting
//! closures through an [`IoExecutor`]; the closure runs on the io thread
//! with access to the live [`NodeGraph`].

use crate::graph::NodeGraph;
use tokio::sync::mpsc;

type IoTask = Box<dyn FnOnce(&NodeGraph) + Send>;

/// Cross-thread handle used to post work onto the io executor.
#[derive(Clone)]
pub struct IoExecutor {
    tx: mpsc::UnboundedSender<IoTask>,
}

impl IoExecutor {
    /// Queues `task` to run on the io thread. Posting after the executor
    /// has shut down is silently dropped, matching the teardown path where
    /// late device-thread completions have nowhere to land.
    pub fn post(&self, task: impl FnOnce(&NodeGraph) + Send + 'static) {
        let _ = self.tx.send(Box::new(task));
    }

    /// A handle that does not keep the executor loop alive. The graph
    /// holds one of these so the loop can drain once every transport-side
    /// handle has dropped.
    pub fn downgrade(&self) -> WeakIoExecutor {
        WeakIoExecutor {
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning counterpart of [`IoExecutor`].
#[derive(Clone)]
pub struct WeakIoExecutor {
    tx: mpsc::WeakUnboundedSender<IoTask>,
}

impl WeakIoExecutor {
    pub fn upgrade(&self) -> Option<IoExecutor> {
        self.tx.upgrade().map(|tx| IoExecutor { tx })
    }
}

/// Receiving side of the post queue; owned by the io thread.
pub struct IoTaskQueue {
    rx: mpsc::UnboundedReceiver<IoTask>,
}

impl IoTaskQueue {
    /// Drains posted tasks against `graph` until every [`IoExecutor`]
    /// handle has dropped.
    pub async fn run(mut self, graph: NodeGraph) {
        while let Some(task) = self.rx.recv().await {
            task(&graph);
        }
    }

    /// Runs at most the currently queued tasks, without waiting. Test
    /// harnesses use this to interleave posted work deterministically.
    pub fn drain_now(&mut self, graph: &NodeGraph) {
        while let Ok(task) = self.rx.try_recv() {
            task(graph);
        }
    }
}

/// Creates the post channel for one io executor.
pub fn io_channel() -> (IoExecutor, IoTaskQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IoExecutor { tx }, IoTaskQueue { rx })
}
