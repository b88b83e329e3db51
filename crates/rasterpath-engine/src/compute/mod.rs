//! Compute backend boundary.
//!
//! The backend runs as an owned tokio worker task behind a serde-typed
//! request/response protocol. `protocol` defines the wire shapes,
//! `kernel` the numeric seam and the CPU reference implementation,
//! `worker` the hosting task, and `proxy` the request correlation layer
//! the controller talks to.

pub mod kernel;
pub mod protocol;
pub mod proxy;
pub(crate) mod worker;

pub use kernel::{ComputeKernel, CpuKernel, KernelError};
pub use protocol::{
    BackendRequest, BackendResponse, DeviceCapabilities, FilterMode, InitRequest, PlanarToolpath,
    RadialToolpaths, RadialToolpathsRequest, RasterizeRequest, ReadyResponse, RequestId,
    RequestPayload, ResponsePayload, ToolpathRequest, EMPTY_CELL,
};
pub use proxy::ComputeProxy;
