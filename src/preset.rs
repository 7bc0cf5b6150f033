//! Preset documents
//!
//! A preset is a JSON document describing target devices, pages, overlays
//! and controls. Parsing is permissive: absent fields take defaults, and
//! controls or values that cannot be placed are skipped with a warning.
//! Page and control-set ids are 1-based, as the editor writes them.

use crate::codec::Message;
use crate::control::{Control, ControlStore, ControlType, ControlValue, Overlay, MAX_VALUES};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Highest device id a preset may declare
pub const MAX_DEVICES: u8 = 32;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("device {id}: {reason}")]
    InvalidDevice { id: u8, reason: &'static str },
}

/// Target synth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    pub id: u8,
    pub name: String,
    /// Local I/O port, 0 or 1
    pub port: u8,
    /// 1-16
    pub channel: u8,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            id: 1,
            name: String::new(),
            port: 0,
            channel: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    pub id: u8,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresetValue {
    /// Sub-value name, e.g. "value" or "attack"
    pub id: String,
    pub default_value: Option<i32>,
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub overlay_id: Option<u8>,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresetControl {
    pub id: u16,
    pub page_id: u8,
    pub control_set_id: u8,
    pub pot_id: u8,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    pub name: String,
    pub color: String,
    pub visible: bool,
    pub values: Vec<PresetValue>,
}

impl Default for PresetControl {
    fn default() -> Self {
        Self {
            id: 0,
            page_id: 1,
            control_set_id: 1,
            pot_id: 1,
            control_type: ControlType::Fader,
            name: String::new(),
            color: "FFFFFF".to_string(),
            visible: true,
            values: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preset {
    pub version: u8,
    pub name: String,
    pub project_id: String,
    pub devices: Vec<Device>,
    pub pages: Vec<Page>,
    pub overlays: Vec<Overlay>,
    pub controls: Vec<PresetControl>,
}

impl Preset {
    /// Parse and validate a preset document
    pub fn parse(data: &[u8]) -> Result<Self, PresetError> {
        let preset: Preset = serde_json::from_slice(data)?;
        preset.validate()?;
        debug!(
            "Preset '{}' parsed: {} devices, {} controls",
            preset.name,
            preset.devices.len(),
            preset.controls.len()
        );
        Ok(preset)
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        for device in &self.devices {
            if device.id == 0 || device.id > MAX_DEVICES {
                return Err(PresetError::InvalidDevice {
                    id: device.id,
                    reason: "id must be 1-32",
                });
            }
            if !(1..=16).contains(&device.channel) {
                return Err(PresetError::InvalidDevice {
                    id: device.id,
                    reason: "channel must be 1-16",
                });
            }
            if device.port > 1 {
                return Err(PresetError::InvalidDevice {
                    id: device.id,
                    reason: "port must be 0 or 1",
                });
            }
        }
        Ok(())
    }

    pub fn device(&self, id: u8) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Build the parameter tree described by the preset
    pub fn build_controls(&self) -> ControlStore {
        let mut store = ControlStore::new();
        for overlay in &self.overlays {
            store.insert_overlay(overlay.clone());
        }

        for pc in &self.controls {
            let mut control = Control::new(pc.id, pc.control_type);
            control.page_id = pc.page_id;
            control.control_set_id = pc.control_set_id;
            control.pot_id = pc.pot_id;
            control.name = pc.name.clone();
            control.color = pc.color.clone();
            control.visible = pc.visible;

            for pv in pc.values.iter().take(MAX_VALUES) {
                let name = if pv.id.is_empty() { "value" } else { pv.id.as_str() };
                let Some(handle) = pc.control_type.handle_of(name) else {
                    warn!("Control {}: no value '{}' on a {}", pc.id, name, pc.control_type);
                    continue;
                };

                let message = pv.message.clone();
                let min = pv.min.unwrap_or(message.min);
                let max = pv.max.unwrap_or(message.max);
                let default = pv.default_value.unwrap_or(min);
                let mut value = ControlValue::new(handle, min, max, default, message);
                value.overlay_id = pv.overlay_id;
                let overlay = store.overlay(pv.overlay_id);
                value.label = value.format_label(pc.control_type, overlay);

                if !control.add_value(value) {
                    warn!("Control {}: duplicate value '{}'", pc.id, name);
                }
            }

            if store.get(control.id).is_some() {
                warn!("Duplicate control id {} replaced", control.id);
            }
            store.insert(control);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MessageKind;

    const PRESET: &str = r#"{
        "version": 2,
        "name": "Test",
        "projectId": "test-project",
        "devices": [{"id": 1, "name": "Synth", "port": 0, "channel": 3}],
        "overlays": [{"id": 1, "items": [{"value": 0, "label": "Off"}, {"value": 127, "label": "On"}]}],
        "controls": [
            {"id": 1, "type": "fader", "name": "Cutoff",
             "values": [{"message": {"deviceId": 1, "type": "cc7", "parameterNumber": 74}}]},
            {"id": 2, "type": "adsr", "pageId": 2,
             "values": [
                {"id": "attack", "message": {"type": "cc7", "parameterNumber": 73}},
                {"id": "release", "min": 0, "max": 10, "defaultValue": 4, "message": {"type": "cc7", "parameterNumber": 72}},
                {"id": "bogus", "message": {"type": "cc7", "parameterNumber": 1}}
             ]},
            {"id": 3, "type": "list", "values": [{"overlayId": 1, "message": {"type": "cc7", "parameterNumber": 9}}]}
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let preset = Preset::parse(PRESET.as_bytes()).unwrap();
        assert_eq!(preset.project_id, "test-project");
        assert_eq!(preset.device(1).unwrap().channel, 3);

        let store = preset.build_controls();
        assert_eq!(store.len(), 3);

        let fader = store.get(1).unwrap();
        assert_eq!(fader.page_id, 1);
        assert_eq!(fader.values[0].message.kind, MessageKind::Cc7);
        assert_eq!((fader.values[0].min, fader.values[0].max), (0, 127));

        let adsr = store.get(2).unwrap();
        assert_eq!(adsr.values.len(), 2);
        let release = adsr.value_by_name("release").unwrap();
        assert_eq!(release.handle, 3);
        assert_eq!(release.value, 4);

        let list = store.get(3).unwrap();
        assert_eq!(list.values[0].label, "Off");
    }

    #[test]
    fn test_invalid_device_rejected() {
        let doc = r#"{"devices": [{"id": 1, "channel": 17}]}"#;
        assert!(matches!(
            Preset::parse(doc.as_bytes()),
            Err(PresetError::InvalidDevice { id: 1, .. })
        ));
        assert!(matches!(Preset::parse(b"[1,2"), Err(PresetError::Parse(_))));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let preset = Preset::parse(b"{}").unwrap();
        assert!(preset.build_controls().is_empty());
    }
}
