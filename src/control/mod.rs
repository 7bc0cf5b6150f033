//! Parameter tree - controls, their sub-values and the owning arena
//!
//! Controls are created from preset data and live in a [`ControlStore`].
//! Everything else refers to them through [`ControlId`] and [`ValueRef`]
//! handles, so a preset reload simply rebuilds the store.

mod overlay;
mod types;

pub use overlay::{Overlay, OverlayItem};
pub use types::{ControlId, ControlType, ValueRef, MAX_VALUES};

use crate::codec::{linear, Message, MessageKind};
use std::collections::{BTreeMap, HashMap};

/// Pages per preset
pub const PAGES: u8 = 12;
/// Control sets per page
pub const CONTROL_SETS: u8 = 3;

/// One named sub-value of a control
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValue {
    pub handle: u8,
    pub default: i32,
    pub min: i32,
    pub max: i32,
    pub overlay_id: Option<u8>,
    /// Display label cache, refreshed on every value change
    pub label: String,
    pub message: Message,
    /// Current logical value
    pub value: i32,
}

impl ControlValue {
    pub fn new(handle: u8, min: i32, max: i32, default: i32, message: Message) -> Self {
        let value = default.clamp(min.min(max), min.max(max));
        Self {
            handle,
            default,
            min,
            max,
            overlay_id: None,
            label: String::new(),
            message,
            value,
        }
    }

    /// Wire value for logical `value`
    pub fn to_wire(&self, control_type: ControlType, overlay: Option<&Overlay>, value: i32) -> u16 {
        match control_type {
            ControlType::Pad => linear::encode_toggle(value, &self.message),
            ControlType::List => {
                let index = value.max(0) as usize;
                overlay
                    .and_then(|o| o.value_at(index))
                    .unwrap_or_else(|| linear::encode_index(value, self.message.effective_bit_width()))
            }
            _ => linear::encode(value, self.min, self.max, &self.message),
        }
    }

    /// Logical value for wire value `wire`
    pub fn from_wire(&self, control_type: ControlType, overlay: Option<&Overlay>, wire: u16) -> i32 {
        match control_type {
            ControlType::Pad => linear::decode_toggle(wire, &self.message),
            ControlType::List => overlay
                .and_then(|o| o.index_of(wire))
                .map(|i| i as i32)
                .unwrap_or(i32::from(wire)),
            _ => linear::decode(wire, self.min, self.max, &self.message),
        }
    }

    /// Whether the registry keeps the logical value instead of a wire
    /// encoding. Virtual values have no wire form and relative messages
    /// only ever carry deltas.
    pub fn stores_logical(&self) -> bool {
        self.message.kind == MessageKind::Virtual || self.message.is_relative()
    }

    /// Value kept in the wire registry for logical `value`
    pub fn to_registry(&self, control_type: ControlType, overlay: Option<&Overlay>, value: i32) -> u16 {
        if !self.stores_logical() {
            return self.to_wire(control_type, overlay, value);
        }
        let (lo, hi) = self.bounds();
        let offset = i64::from(value.clamp(lo, hi)) - i64::from(lo);
        offset.min(i64::from(u16::MAX)) as u16
    }

    /// Inverse of [`ControlValue::to_registry`]
    pub fn from_registry(&self, control_type: ControlType, overlay: Option<&Overlay>, stored: u16) -> i32 {
        if !self.stores_logical() {
            return self.from_wire(control_type, overlay, stored);
        }
        let (lo, hi) = self.bounds();
        (i64::from(lo) + i64::from(stored)).min(i64::from(hi)) as i32
    }

    /// `(min, max)` in ascending order
    pub fn bounds(&self) -> (i32, i32) {
        (self.min.min(self.max), self.min.max(self.max))
    }

    /// Display text for the current value
    pub fn format_label(&self, control_type: ControlType, overlay: Option<&Overlay>) -> String {
        match control_type {
            ControlType::Pad => {
                if self.value != 0 {
                    "On".to_string()
                } else {
                    "Off".to_string()
                }
            }
            ControlType::List => overlay
                .and_then(|o| o.label_at(self.value.max(0) as usize))
                .map(str::to_string)
                .unwrap_or_else(|| self.value.to_string()),
            _ => self.value.to_string(),
        }
    }
}

/// One logical on-screen parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub id: ControlId,
    pub page_id: u8,
    pub control_set_id: u8,
    /// Pot (encoder) bound to the control on its control set
    pub pot_id: u8,
    pub control_type: ControlType,
    pub name: String,
    /// RRGGBB
    pub color: String,
    pub visible: bool,
    pub values: Vec<ControlValue>,
}

impl Control {
    pub fn new(id: ControlId, control_type: ControlType) -> Self {
        Self {
            id,
            page_id: 0,
            control_set_id: 0,
            pot_id: 0,
            control_type,
            name: String::new(),
            color: "FFFFFF".to_string(),
            visible: true,
            values: Vec::new(),
        }
    }

    /// Attach a sub-value; rejected once the control holds [`MAX_VALUES`]
    /// values or when the handle is already used
    pub fn add_value(&mut self, value: ControlValue) -> bool {
        if self.values.len() >= MAX_VALUES || self.value(value.handle).is_some() {
            return false;
        }
        self.values.push(value);
        true
    }

    pub fn value(&self, handle: u8) -> Option<&ControlValue> {
        self.values.iter().find(|v| v.handle == handle)
    }

    pub fn value_mut(&mut self, handle: u8) -> Option<&mut ControlValue> {
        self.values.iter_mut().find(|v| v.handle == handle)
    }

    /// Sub-value addressed by name, e.g. `"attack"`
    pub fn value_by_name(&self, name: &str) -> Option<&ControlValue> {
        self.control_type.handle_of(name).and_then(|h| self.value(h))
    }
}

/// Arena owning every control and overlay of the loaded preset
#[derive(Debug, Clone, Default)]
pub struct ControlStore {
    controls: BTreeMap<ControlId, Control>,
    overlays: HashMap<u8, Overlay>,
}

impl ControlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, control: Control) {
        self.controls.insert(control.id, control);
    }

    pub fn insert_overlay(&mut self, overlay: Overlay) {
        self.overlays.insert(overlay.id, overlay);
    }

    pub fn get(&self, id: ControlId) -> Option<&Control> {
        self.controls.get(&id)
    }

    pub fn get_mut(&mut self, id: ControlId) -> Option<&mut Control> {
        self.controls.get_mut(&id)
    }

    pub fn value(&self, r: ValueRef) -> Option<&ControlValue> {
        self.controls.get(&r.control)?.value(r.handle)
    }

    pub fn value_mut(&mut self, r: ValueRef) -> Option<&mut ControlValue> {
        self.controls.get_mut(&r.control)?.value_mut(r.handle)
    }

    pub fn overlay(&self, id: Option<u8>) -> Option<&Overlay> {
        id.and_then(|id| self.overlays.get(&id))
    }

    /// Control type together with the sub-value, for codec calls
    pub fn resolve(&self, r: ValueRef) -> Option<(ControlType, &ControlValue, Option<&Overlay>)> {
        let control = self.controls.get(&r.control)?;
        let value = control.value(r.handle)?;
        Some((control.control_type, value, self.overlay(value.overlay_id)))
    }

    /// Set the logical value of `r` from a registry value and refresh its
    /// label. Returns the new logical value.
    pub fn apply_stored(&mut self, r: ValueRef, stored: u16) -> Option<i32> {
        let (control_type, value, overlay) = self.resolve(r)?;
        let logical = value.from_registry(control_type, overlay, stored);
        let mut updated = value.clone();
        updated.value = logical;
        updated.label = updated.format_label(control_type, overlay);
        *self.value_mut(r)? = updated;
        Some(logical)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    /// Every sub-value handle in the store
    pub fn value_refs(&self) -> Vec<ValueRef> {
        self.controls
            .values()
            .flat_map(|c| c.values.iter().map(move |v| ValueRef::new(c.id, v.handle)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
