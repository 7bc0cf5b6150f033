//! LookupEntry - canonical cell for one wire address

use super::types::Origin;
use crate::control::ValueRef;

/// Last wire value of one address plus the sub-values that display it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupEntry {
    value: Option<u16>,
    dirty: bool,
    origin: Origin,
    /// Unique, in insertion order
    destinations: Vec<ValueRef>,
}

impl LookupEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a destination. Returns false if it was already present.
    pub fn add_destination(&mut self, destination: ValueRef) -> bool {
        if self.destinations.contains(&destination) {
            return false;
        }
        self.destinations.push(destination);
        true
    }

    /// Remove a destination. Returns false if it was not present.
    pub fn remove_destination(&mut self, destination: ValueRef) -> bool {
        match self.destinations.iter().position(|d| *d == destination) {
            Some(index) => {
                self.destinations.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn has_destinations(&self) -> bool {
        !self.destinations.is_empty()
    }

    pub fn destinations(&self) -> &[ValueRef] {
        &self.destinations
    }

    /// Last wire value, `None` until the address has been written
    pub fn value(&self) -> Option<u16> {
        self.value
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = origin;
    }

    /// Store a new wire value. Marks dirty only when the value changes.
    pub fn set_midi_value(&mut self, value: u16) -> bool {
        if self.value == Some(value) {
            return false;
        }
        self.value = Some(value);
        self.dirty = true;
        true
    }

    /// OR a fragment into the stored value and mark dirty.
    ///
    /// Used to assemble values that arrive split across several messages.
    pub fn apply_to_midi_value(&mut self, fragment: u16) {
        self.value = Some(self.value.unwrap_or(0) | fragment);
        self.dirty = true;
    }

    pub fn mark_as_processed(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_destination_is_idempotent() {
        let mut entry = LookupEntry::new();
        let r = ValueRef::new(1, 0);
        assert!(!entry.has_destinations());
        assert!(entry.add_destination(r));
        assert!(!entry.add_destination(r));
        assert_eq!(entry.destinations().len(), 1);
        assert!(entry.has_destinations());

        assert!(entry.remove_destination(r));
        assert!(!entry.remove_destination(r));
        assert!(!entry.has_destinations());
    }

    #[test]
    fn test_destination_order_is_stable() {
        let mut entry = LookupEntry::new();
        for control in [5, 2, 9] {
            entry.add_destination(ValueRef::new(control, 0));
        }
        entry.remove_destination(ValueRef::new(2, 0));
        entry.add_destination(ValueRef::new(2, 0));
        let order: Vec<_> = entry.destinations().iter().map(|d| d.control).collect();
        assert_eq!(order, vec![5, 9, 2]);
    }

    #[test]
    fn test_set_midi_value_dirty_semantics() {
        let mut entry = LookupEntry::new();
        assert!(!entry.is_dirty());

        assert!(entry.set_midi_value(10));
        assert!(entry.is_dirty());
        entry.mark_as_processed();
        assert!(!entry.is_dirty());

        assert!(!entry.set_midi_value(10));
        assert!(!entry.is_dirty());

        entry.set_midi_value(11);
        assert!(entry.is_dirty());
    }

    #[test]
    fn test_apply_fragment_always_dirties() {
        let mut entry = LookupEntry::new();
        entry.set_midi_value(0x40 << 7);
        entry.mark_as_processed();
        entry.apply_to_midi_value(0);
        assert!(entry.is_dirty());
        entry.apply_to_midi_value(0x05);
        assert_eq!(entry.value(), Some((0x40 << 7) | 0x05));
    }
}
