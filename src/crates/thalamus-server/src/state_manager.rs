//! Mirroring client for the observable bridge.
//!
//! Attaches a remote-storage hook to the local root so every local write
//! becomes an outbound transaction, and applies inbound transactions with
//! `from_remote = true`. A write's done callback resolves when its
//! acknowledgement arrives; acks arrive in issue order, so callbacks
//! resolve in issue order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thalamus_proto::convert::{change_from_wire, change_to_wire};
use thalamus_proto::thalamus_client::ThalamusClient;
use thalamus_proto::ObservableTransaction;
use thalamus_state::{jsonpath, Action, DoneCallback, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub struct StateManager {
    network_task: tokio::task::JoinHandle<()>,
    local_task: tokio::task::JoinHandle<()>,
}

impl StateManager {
    /// Attaches `root` to the authoritative server behind `channel`.
    ///
    /// Must run on the io executor thread; the transport work is spawned
    /// onto `runtime`.
    pub fn attach(
        root: &Value,
        channel: tonic::transport::Channel,
        runtime: tokio::runtime::Handle,
    ) -> StateManager {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel::<ObservableTransaction>();
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<ObservableTransaction>();

        // Pending io-side callbacks keyed by transaction id.
        let pending: Rc<RefCell<HashMap<u64, DoneCallback>>> =
            Rc::new(RefCell::new(HashMap::new()));
        let next_id = Rc::new(std::cell::Cell::new(1u64));

        let hook_outbox = outbox_tx.clone();
        let hook_pending = Rc::clone(&pending);
        let hook_next_id = Rc::clone(&next_id);
        let hook: thalamus_state::RemoteStorageHook = Rc::new(
            move |action: Action, address: &str, value: Value, done: DoneCallback| {
                let id = hook_next_id.get();
                hook_next_id.set(id + 1);
                let transaction = ObservableTransaction {
                    changes: vec![change_to_wire(action, address, &value)],
                    id,
                    acknowledged: 0,
                };
                hook_pending.borrow_mut().insert(id, done);
                tracing::trace!(id, address, "bridge change queued");
                if hook_outbox.send(transaction).is_err() {
                    // Transport gone for good: release the write locally.
                    return hook_pending.borrow_mut().remove(&id);
                }
                None
            },
        );
        match root {
            Value::Map(map) => map.set_remote_storage(Some(hook)),
            Value::List(list) => list.set_remote_storage(Some(hook)),
            _ => tracing::error!("state manager root must be a collection"),
        }

        // Io-local applier: resolves acks and applies authoritative
        // changes, acknowledging each applied transaction.
        let local_root = root.clone();
        let local_pending = Rc::clone(&pending);
        let ack_outbox = outbox_tx;
        let local_task = tokio::task::spawn_local(async move {
            while let Some(transaction) = inbound_rx.recv().await {
                if transaction.acknowledged != 0 {
                    tracing::trace!(id = transaction.acknowledged, "bridge acknowledged");
                    if let Some(done) =
                        local_pending.borrow_mut().remove(&transaction.acknowledged)
                    {
                        done();
                    }
                    continue;
                }
                for change in &transaction.changes {
                    let (action, address, value) = change_from_wire(change);
                    let result = match action {
                        Action::Set => jsonpath::set(&local_root, address, value, true),
                        Action::Delete => jsonpath::delete(&local_root, address, true),
                    };
                    if let Err(e) = result {
                        tracing::warn!(address, error = %e, "bridge change failed to apply");
                    }
                }
                if transaction.id != 0 {
                    let _ = ack_outbox.send(ObservableTransaction {
                        changes: Vec::new(),
                        id: 0,
                        acknowledged: transaction.id,
                    });
                }
            }
        });

        // Transport side: one bidi stream against the authoritative
        // server. Reconnection is left to the channel; a closed stream
        // leaves pending callbacks parked.
        let network_task = runtime.spawn(async move {
            let mut client = ThalamusClient::new(channel);
            let outbound = UnboundedReceiverStream::new(outbox_rx);
            let mut inbound = match client.observable_bridge_v2(outbound).await {
                Ok(response) => response.into_inner(),
                Err(status) => {
                    tracing::error!(%status, "observable bridge failed to open");
                    return;
                }
            };
            loop {
                match inbound.message().await {
                    Ok(Some(transaction)) => {
                        if inbound_tx.send(transaction).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("observable bridge closed by server");
                        break;
                    }
                    Err(status) => {
                        tracing::warn!(%status, "observable bridge stream error");
                        break;
                    }
                }
            }
        });

        StateManager {
            network_task,
            local_task,
        }
    }
}

impl Drop for StateManager {
    fn drop(&mut self) {
        self.network_task.abort();
        self.local_task.abort();
    }
}
