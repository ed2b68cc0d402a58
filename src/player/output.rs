use super::MidiSink;
use crate::error::PlayerError;
use midir::{MidiOutput, MidiOutputConnection};

#[cfg(unix)]
use midir::os::unix::VirtualOutput;

const CLIENT_NAME: &str = "mmlc";
const VIRTUAL_PORT_NAME: &str = "mmlc-out";

/// A live MIDI output device, backed by midir.
///
/// Ports are selected by case-insensitive substring match; with no filter
/// the first port is used. When no hardware port exists at all, a named
/// virtual port is created instead of failing (unix backends).
pub struct MidirOutput {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirOutput {
    pub fn open(device: Option<&str>) -> Result<Self, PlayerError> {
        let midi_out =
            MidiOutput::new(CLIENT_NAME).map_err(|e| PlayerError::Init(e.to_string()))?;

        let ports = midi_out.ports();
        if ports.is_empty() {
            #[cfg(unix)]
            {
                let connection = midi_out
                    .create_virtual(VIRTUAL_PORT_NAME)
                    .map_err(|e| PlayerError::Connect(e.to_string()))?;
                return Ok(Self {
                    connection,
                    port_name: format!("{VIRTUAL_PORT_NAME} (virtual)"),
                });
            }
            #[cfg(not(unix))]
            return Err(PlayerError::NoOutputPorts);
        }

        let (port, port_name) = match device {
            Some(filter) => {
                let filter_lower = filter.to_lowercase();
                ports
                    .iter()
                    .find_map(|p| {
                        let name = midi_out.port_name(p).unwrap_or_default();
                        name.to_lowercase()
                            .contains(&filter_lower)
                            .then(|| (p.clone(), name))
                    })
                    .ok_or_else(|| PlayerError::DeviceNotFound(filter.to_string()))?
            }
            None => {
                let p = ports[0].clone();
                let name = midi_out
                    .port_name(&p)
                    .unwrap_or_else(|_| "unknown".to_string());
                (p, name)
            }
        };

        let connection = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| PlayerError::Connect(e.to_string()))?;

        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Name of the connected (or virtual) port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// All available MIDI output port names.
    pub fn list_devices() -> Vec<String> {
        let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) else {
            return Vec::new();
        };
        midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect()
    }

    /// Whether any port name contains `device` (case-insensitive).
    pub fn device_available(device: &str) -> bool {
        let device_lower = device.to_lowercase();
        Self::list_devices()
            .iter()
            .any(|name| name.to_lowercase().contains(&device_lower))
    }
}

impl MidiSink for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<(), PlayerError> {
        self.connection
            .send(message)
            .map_err(|e| PlayerError::Send(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_does_not_panic() {
        // May be empty in CI/test environments
        let _ = MidirOutput::list_devices();
    }

    #[test]
    fn test_unknown_device_is_not_available() {
        assert!(!MidirOutput::device_available(
            "no such device, surely 0b1d4e"
        ));
    }
}
