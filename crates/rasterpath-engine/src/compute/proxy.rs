//! Request correlation layer over the worker task.
//!
//! The proxy assigns every dispatched request a fresh [`RequestId`],
//! registers a pending completion for it, and routes worker responses
//! back by id. Progress messages invoke the request's progress callback
//! without settling it; completions and failures settle it. Shutting the
//! proxy down drops all pending registrations so awaiting callers
//! observe cancellation instead of hanging.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::kernel::ComputeKernel;
use super::protocol::{BackendRequest, RequestId, RequestPayload, ResponsePayload};
use super::worker;
use crate::error::{RasterPathError, Result};
use crate::types::ProgressCallback;

const REQUEST_CHANNEL_CAPACITY: usize = 16;

struct PendingRequest {
    completion: oneshot::Sender<ResponsePayload>,
    on_progress: Option<ProgressCallback>,
}

type PendingTable = Arc<Mutex<HashMap<RequestId, PendingRequest>>>;

/// Handle to a running compute backend.
///
/// Owns the worker task and the response-routing task; both are aborted
/// on [`ComputeProxy::shutdown`] or drop.
pub struct ComputeProxy {
    request_tx: mpsc::Sender<BackendRequest>,
    pending: PendingTable,
    next_id: AtomicU64,
    worker_task: JoinHandle<()>,
    routing_task: JoinHandle<()>,
}

impl ComputeProxy {
    /// Spawn the worker hosting `kernel` and the response router.
    pub fn start(kernel: Box<dyn ComputeKernel>) -> Self {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (response_tx, mut response_rx) = mpsc::unbounded_channel();
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));

        let worker_task = worker::spawn_worker(kernel, request_rx, response_tx);

        let routing = pending.clone();
        let routing_task = tokio::spawn(async move {
            while let Some(response) = response_rx.recv().await {
                if let Some(update) = response.payload.progress_update() {
                    // Clone the callback out of the lock; user code never
                    // runs under the pending table lock.
                    let callback = routing
                        .lock()
                        .get(&response.id)
                        .and_then(|entry| entry.on_progress.clone());
                    if let Some(callback) = callback {
                        callback(update);
                    }
                    continue;
                }

                let settled = routing.lock().remove(&response.id);
                match settled {
                    Some(entry) => {
                        let _ = entry.completion.send(response.payload);
                    }
                    None => {
                        warn!("Dropping response for unknown request id {}", response.id);
                    }
                }
            }
        });

        Self {
            request_tx,
            pending,
            next_id: AtomicU64::new(1),
            worker_task,
            routing_task,
        }
    }

    /// Send a request and await its completion payload.
    ///
    /// Progress messages for this request invoke `on_progress` as they
    /// stream; a `Failed` completion surfaces as a backend error. If the
    /// proxy shuts down while the request is in flight the caller gets
    /// [`RasterPathError::Cancelled`].
    pub async fn dispatch(
        &self,
        payload: RequestPayload,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ResponsePayload> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (completion_tx, completion_rx) = oneshot::channel();
        self.pending.lock().insert(
            id,
            PendingRequest {
                completion: completion_tx,
                on_progress,
            },
        );

        if self
            .request_tx
            .send(BackendRequest { id, payload })
            .await
            .is_err()
        {
            self.pending.lock().remove(&id);
            return Err(RasterPathError::Cancelled);
        }

        match completion_rx.await {
            Ok(ResponsePayload::Failed { message }) => Err(RasterPathError::Backend { message }),
            Ok(payload) => Ok(payload),
            Err(_) => Err(RasterPathError::Cancelled),
        }
    }

    /// Stop the backend and reject every in-flight request.
    ///
    /// Clearing the pending table drops the completion senders, settling
    /// all awaiting dispatches with [`RasterPathError::Cancelled`].
    pub fn shutdown(&self) {
        self.pending.lock().clear();
        self.worker_task.abort();
        self.routing_task.abort();
        debug!("Compute proxy shut down");
    }
}

impl Drop for ComputeProxy {
    fn drop(&mut self) {
        self.worker_task.abort();
        self.routing_task.abort();
    }
}
