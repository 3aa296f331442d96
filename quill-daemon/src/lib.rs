//! Daemon runtime: throttle/scheduler + debounce + socket server.

mod error;
pub mod debounce;
pub mod log_rotation;
pub mod paths;
pub mod protocol;
pub mod runtime;
pub mod scheduler;

pub use debounce::Debouncer;
pub use error::DaemonError;
pub use protocol::{
    request_status, request_stop, request_sync, send_event, send_request, DaemonRequest,
    DaemonResponse,
};
pub use runtime::{run, start_blocking};
pub use scheduler::{HostEvent, Scheduler, BLUR_RESYNC_INTERVAL};
