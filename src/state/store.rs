//! ParameterMap - every LookupEntry of the loaded preset
//!
//! Keyed by wire address. A reverse index from sub-value to address keeps
//! each sub-value bound to at most one entry.

use super::lookup::LookupEntry;
use super::types::{Origin, WireKey};
use crate::control::ValueRef;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// A dirty entry handed out by [`ParameterMap::take_dirty`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyEntry {
    pub key: WireKey,
    pub value: u16,
    pub origin: Origin,
    pub destinations: Vec<ValueRef>,
}

/// Owns all wire-address cells
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    entries: BTreeMap<WireKey, LookupEntry>,
    bindings: HashMap<ValueRef, WireKey>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `key`, created empty on first reference
    pub fn get_or_create(&mut self, key: WireKey) -> &mut LookupEntry {
        self.entries.entry(key).or_default()
    }

    pub fn get(&self, key: &WireKey) -> Option<&LookupEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &WireKey) -> Option<&mut LookupEntry> {
        self.entries.get_mut(key)
    }

    /// Bind a sub-value to an address, dropping any previous association.
    /// Returns false when it was already bound to `key`.
    pub fn bind(&mut self, key: WireKey, destination: ValueRef) -> bool {
        if let Some(previous) = self.bindings.get(&destination).copied() {
            if previous == key {
                return false;
            }
            if let Some(entry) = self.entries.get_mut(&previous) {
                entry.remove_destination(destination);
            }
        }
        self.bindings.insert(destination, key);
        self.get_or_create(key).add_destination(destination)
    }

    /// Address a sub-value is bound to
    pub fn key_of(&self, destination: ValueRef) -> Option<WireKey> {
        self.bindings.get(&destination).copied()
    }

    /// Store a wire value with its origin. Returns true if the entry became dirty.
    ///
    /// A file restore over a local change that has not been flushed yet
    /// keeps the local origin, so the pending MIDI still goes out.
    pub fn set_value(&mut self, key: WireKey, value: u16, origin: Origin) -> bool {
        let entry = self.get_or_create(key);
        let pending_local = entry.is_dirty() && entry.origin().emits_midi();
        let changed = entry.set_midi_value(value);
        if changed && !(pending_local && origin == Origin::File) {
            entry.set_origin(origin);
            trace!("{} = {} ({})", key, value, origin);
        }
        changed
    }

    /// OR a fragment of a split value into the entry
    pub fn apply_fragment(&mut self, key: WireKey, fragment: u16, origin: Origin) {
        let entry = self.get_or_create(key);
        entry.apply_to_midi_value(fragment);
        entry.set_origin(origin);
    }

    pub fn value(&self, key: &WireKey) -> Option<u16> {
        self.entries.get(key).and_then(LookupEntry::value)
    }

    /// Dirty entries in address order; each is marked processed
    pub fn take_dirty(&mut self) -> Vec<DirtyEntry> {
        let mut dirty = Vec::new();
        for (key, entry) in self.entries.iter_mut().filter(|(_, e)| e.is_dirty()) {
            entry.mark_as_processed();
            if let Some(value) = entry.value() {
                dirty.push(DirtyEntry {
                    key: *key,
                    value,
                    origin: entry.origin(),
                    destinations: entry.destinations().to_vec(),
                });
            }
        }
        dirty
    }

    pub fn has_dirty(&self) -> bool {
        self.entries.values().any(LookupEntry::is_dirty)
    }

    /// Addresses holding a value, with that value
    pub fn values(&self) -> impl Iterator<Item = (WireKey, u16)> + '_ {
        self.entries
            .iter()
            .filter_map(|(key, entry)| entry.value().map(|v| (*key, v)))
    }

    /// Drop everything; used before binding a newly loaded preset
    pub fn clear(&mut self) {
        self.entries.clear();
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
