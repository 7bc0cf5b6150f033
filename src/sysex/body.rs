//! JSON bodies carried by sysex commands
//!
//! Every field is optional at the serde level; handlers decide which ones
//! are mandatory with [`super::command::required`].

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectBody {
    pub project_id: Option<String>,
}

/// Addresses one snapshot: load, remove, request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotLocationBody {
    pub project_id: Option<String>,
    pub bank_number: Option<u8>,
    pub slot: Option<u8>,
}

/// Save a snapshot or change its metadata
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotInfoBody {
    pub project_id: Option<String>,
    pub bank_number: Option<u8>,
    pub slot: Option<u8>,
    pub name: String,
    /// RRGGBB
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotSwapBody {
    pub project_id: Option<String>,
    pub source_bank_number: Option<u8>,
    pub source_slot: Option<u8>,
    pub dest_bank_number: Option<u8>,
    pub dest_slot: Option<u8>,
}

/// Control attributes changed by an update command; absent fields stay as they are
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlUpdateBody {
    pub name: Option<String>,
    pub color: Option<String>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValueLabelBody {
    pub text: String,
}
