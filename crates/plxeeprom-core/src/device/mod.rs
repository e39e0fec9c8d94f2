//! Per-device state: the handle, its lock and byte-stream sessions

mod handle;
pub mod sync;

pub use handle::{DeviceHandle, Session};
pub use sync::{InterruptibleGuard, InterruptibleMutex, Interrupter};
