use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use soundsentry_foundation::AudioError;

/// Setup-time device discovery and selection. Devices are addressed by their
/// enumeration index, matching what `--list-devices` prints.
pub struct DeviceManager {
    host: Host,
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host.id()
    }

    pub fn list_inputs(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok());
        Ok(Self::collect(self.host.input_devices()?, default_name))
    }

    pub fn list_outputs(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok());
        Ok(Self::collect(self.host.output_devices()?, default_name))
    }

    fn collect(devices: impl Iterator<Item = Device>, default_name: Option<String>) -> Vec<DeviceInfo> {
        devices
            .enumerate()
            .map(|(index, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| format!("<unnamed device {}>", index));
                let is_default = default_name.as_deref() == Some(name.as_str());
                DeviceInfo {
                    index,
                    name,
                    is_default,
                }
            })
            .collect()
    }

    /// Open an input device by enumeration index, or the host default when
    /// no index is given.
    pub fn open_input(&self, index: Option<usize>) -> Result<Device, AudioError> {
        match index {
            Some(wanted) => {
                let device = self
                    .host
                    .input_devices()?
                    .nth(wanted)
                    .ok_or(AudioError::DeviceNotFound {
                        index: Some(wanted),
                    })?;
                if let Ok(name) = device.name() {
                    tracing::info!(
                        "Selected input device {} ({}, host: {:?})",
                        wanted,
                        name,
                        self.host_id()
                    );
                }
                Ok(device)
            }
            None => {
                let device = self
                    .host
                    .default_input_device()
                    .ok_or(AudioError::NoInputDevices)?;
                if let Ok(name) = device.name() {
                    tracing::info!("Selected default input device: {} (host: {:?})", name, self.host_id());
                }
                Ok(device)
            }
        }
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
