//! Audio device enumeration through the default cpal host.
//!
//! cpal identifies devices by name, so an [`AudioDevice`] id and name are the
//! same string.

use cpal::traits::{DeviceTrait, HostTrait};

use live_call_core::{AudioDevice, SessionError};

/// Lists input (microphone) and output (speaker) devices.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List capture (microphone) devices.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioDevice>, SessionError> {
        let default = self.default_capture_device_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| {
                log::warn!("Failed to list input devices: {}", e);
                SessionError::DeviceNotAvailable
            })?;
        Ok(describe(devices, default.as_deref()))
    }

    /// List render (speaker/headphone) devices.
    pub fn list_render_devices(&self) -> Result<Vec<AudioDevice>, SessionError> {
        let default = self.default_render_device_name();
        let devices = self
            .host
            .output_devices()
            .map_err(|e| {
                log::warn!("Failed to list output devices: {}", e);
                SessionError::DeviceNotAvailable
            })?;
        Ok(describe(devices, default.as_deref()))
    }

    pub fn default_capture_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    pub fn default_render_device_name(&self) -> Option<String> {
        self.host.default_output_device().and_then(|d| d.name().ok())
    }

    /// Find an input device by exact name.
    pub(crate) fn input_device(&self, name: &str) -> Option<cpal::Device> {
        self.host
            .input_devices()
            .ok()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
    }

    pub(crate) fn default_input_device(&self) -> Option<cpal::Device> {
        self.host.default_input_device()
    }

    pub(crate) fn default_output_device(&self) -> Option<cpal::Device> {
        self.host.default_output_device()
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(devices: impl Iterator<Item = cpal::Device>, default: Option<&str>) -> Vec<AudioDevice> {
    devices
        .filter_map(|d| d.name().ok())
        .map(|name| AudioDevice {
            id: name.clone(),
            is_default: default == Some(name.as_str()),
            name,
        })
        .collect()
}
