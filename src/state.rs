//! Wire registry - canonical state per MIDI wire address
//!
//! Every (device, message kind, parameter number) triple owns exactly one
//! [`LookupEntry`]. Sub-values that share an address are fanned out from
//! that entry, and dirty flags collapse bursts of changes into one flush
//! per processing tick.

mod lookup;
mod persistence;
mod store;
mod types;

pub use lookup::LookupEntry;
pub use persistence::{BlobError, BLOB_VERSION};
pub use store::{DirtyEntry, ParameterMap};
pub use types::{Origin, WireKey};
