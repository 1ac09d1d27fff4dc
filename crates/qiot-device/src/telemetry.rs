//! Simulated sensor readings per device type

use crate::error::{ClientError, Result};

/// Reading sent when the device type is not recognised
pub const DEFAULT_MESSAGE: &str = "Patient Heartbeat: 72 BPM";

const PROFILES: &[(&str, &str)] = &[
    ("sensor1", "Patient Heartbeat: 72 BPM"),
    ("sensor2", "Body Temperature: 36.8 C"),
    ("sensor3", "Blood Oxygen: 98% SpO2"),
    ("sensor4", "Blood Pressure: 120/80 mmHg"),
];

/// Canned reading for a known device type
pub fn message_for(device_type: &str) -> Result<&'static str> {
    PROFILES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(device_type))
        .map(|(_, message)| *message)
        .ok_or_else(|| ClientError::UnknownDeviceType(device_type.to_string()))
}

/// Like [`message_for`], falling back to [`DEFAULT_MESSAGE`]
pub fn message_for_or_default(device_type: &str) -> &'static str {
    match message_for(device_type) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "Using default reading");
            DEFAULT_MESSAGE
        }
    }
}

pub fn known_device_types() -> impl Iterator<Item = &'static str> {
    PROFILES.iter().map(|(name, _)| *name)
}
