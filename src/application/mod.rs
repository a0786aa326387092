//! Application Layer - Scan loop and its supporting use cases

pub mod alert;
pub mod retry;
pub mod scanner;
pub mod shutdown;

pub use alert::render_alert;
pub use retry::{RetryError, RetryPolicy};
pub use scanner::{CycleError, ScanOrchestrator, ScanSettings, ScanState, ScanStatus};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};
