//! Overlays: value/label tables used by list controls

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayItem {
    pub value: u16,
    #[serde(default)]
    pub label: String,
}

/// Ordered list mapping a list control's index to a wire value and label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: u8,
    #[serde(default)]
    pub items: Vec<OverlayItem>,
}

impl Overlay {
    /// Wire value of the item at `index`
    pub fn value_at(&self, index: usize) -> Option<u16> {
        self.items.get(index).map(|item| item.value)
    }

    /// Index of the first item carrying wire value `value`
    pub fn index_of(&self, value: u16) -> Option<usize> {
        self.items.iter().position(|item| item.value == value)
    }

    pub fn label_at(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(|item| item.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
