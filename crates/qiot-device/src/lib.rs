//! qiot-device: IoT device client for the post-quantum telemetry server

pub mod client;
pub mod error;
pub mod telemetry;

pub use client::{ClientBuilder, DeviceClient};
pub use error::{ClientError, Result};
pub use telemetry::{message_for, message_for_or_default, DEFAULT_MESSAGE};
