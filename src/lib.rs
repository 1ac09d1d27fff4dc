//! qiot: post-quantum IoT telemetry over ML-KEM
//!
//! Umbrella crate re-exporting the workspace members; integration tests live
//! in `tests/`.

pub use qiot_core;
pub use qiot_device;
pub use qiot_server;
