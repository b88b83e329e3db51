//! Kernel-hosting worker task.
//!
//! The worker owns the kernel and drains the request channel one job at
//! a time. Jobs run inline on the task; progress closures forward kernel
//! progress as protocol messages tagged with the request's correlation
//! id, and the final completion (or failure) settles the request.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::kernel::ComputeKernel;
use super::protocol::{
    BackendRequest, BackendResponse, ReadyResponse, RequestPayload, ResponsePayload,
};

/// Spawn the worker task hosting `kernel`.
///
/// The task exits when the request channel closes or when no receiver
/// remains for its responses.
pub(crate) fn spawn_worker(
    mut kernel: Box<dyn ComputeKernel>,
    mut request_rx: mpsc::Receiver<BackendRequest>,
    response_tx: mpsc::UnboundedSender<BackendResponse>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = request_rx.recv().await {
            let id = request.id;
            let payload = handle_request(kernel.as_mut(), request, &response_tx);
            if response_tx.send(BackendResponse { id, payload }).is_err() {
                break;
            }
        }
        debug!("Compute worker stopped");
    })
}

fn handle_request(
    kernel: &mut dyn ComputeKernel,
    request: BackendRequest,
    response_tx: &mpsc::UnboundedSender<BackendResponse>,
) -> ResponsePayload {
    let id = request.id;
    match request.payload {
        RequestPayload::Init(init) => match kernel.init(&init.config) {
            Ok(capabilities) => ResponsePayload::Ready(ReadyResponse {
                success: true,
                capabilities: Some(capabilities),
            }),
            Err(err) => {
                warn!("Kernel init failed: {}", err);
                ResponsePayload::Ready(ReadyResponse {
                    success: false,
                    capabilities: None,
                })
            }
        },
        RequestPayload::Rasterize(job) => {
            let mut progress = |update| {
                let _ = response_tx.send(BackendResponse {
                    id,
                    payload: ResponsePayload::RasterizeProgress(update),
                });
            };
            match kernel.rasterize(&job, &mut progress) {
                Ok(geometry) => ResponsePayload::RasterizeComplete(geometry),
                Err(err) => ResponsePayload::Failed {
                    message: err.to_string(),
                },
            }
        }
        RequestPayload::GenerateToolpath(job) => {
            let mut progress = |update| {
                let _ = response_tx.send(BackendResponse {
                    id,
                    payload: ResponsePayload::ToolpathProgress(update),
                });
            };
            match kernel.generate_toolpath(&job, &mut progress) {
                Ok(toolpath) => ResponsePayload::ToolpathComplete(toolpath),
                Err(err) => ResponsePayload::Failed {
                    message: err.to_string(),
                },
            }
        }
        RequestPayload::RadialGenerateToolpaths(job) => {
            let mut progress = |update| {
                let _ = response_tx.send(BackendResponse {
                    id,
                    payload: ResponsePayload::ToolpathProgress(update),
                });
            };
            match kernel.generate_radial_toolpaths(&job, &mut progress) {
                Ok(toolpaths) => ResponsePayload::RadialToolpathsComplete(toolpaths),
                Err(err) => ResponsePayload::Failed {
                    message: err.to_string(),
                },
            }
        }
    }
}
