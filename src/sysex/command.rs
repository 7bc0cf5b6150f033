//! ElectraCommand - decoded sysex command envelope

use super::{CommandKind, ObjectKind};
use crate::midi::{format_hex, SYSEX_END, SYSEX_START};
use crate::preset::PresetError;
use crate::state::BlobError;
use crate::storage::StorageError;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    #[error("unknown command byte 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("unknown object byte 0x{0:02X}")]
    UnknownObject(u8),

    #[error("no handler for {kind:?}/{object:?}")]
    Unsupported {
        kind: CommandKind,
        object: ObjectKind,
    },

    #[error("{what} {value} out of range")]
    OutOfRange { what: &'static str, value: u16 },

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage busy")]
    Busy,

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error(transparent)]
    Snapshot(#[from] BlobError),
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Busy => CommandError::Busy,
            StorageError::InvalidSlot { bank, .. } => CommandError::OutOfRange {
                what: "bank/slot",
                value: u16::from(bank),
            },
            other => CommandError::Storage(other),
        }
    }
}

impl CommandError {
    /// Errors that are logged and dropped without a nack
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            CommandError::UnknownCommand(_)
                | CommandError::UnknownObject(_)
                | CommandError::Unsupported { .. }
        )
    }
}

/// Decoded command: kind, object, parameter bytes and optional body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectraCommand {
    pub kind: CommandKind,
    pub object: ObjectKind,
    pub params: Vec<u8>,
    pub body: Vec<u8>,
}

impl ElectraCommand {
    /// Number of parameter bytes carried by a (command, object) pair.
    /// `None` marks pairs that have no handler.
    pub fn param_count(kind: CommandKind, object: ObjectKind) -> Option<usize> {
        use CommandKind as K;
        use ObjectKind as O;

        Some(match (kind, object) {
            (K::FileUpload, O::Preset | O::Configuration | O::Script | O::SnapshotImport) => 0,
            (
                K::FileRequest,
                O::Preset | O::PresetList | O::SnapshotList | O::Snapshot | O::Configuration,
            ) => 0,
            (K::MidiLearnToggle, O::MidiLearn) => 1,
            (K::Remove, O::Snapshot) => 0,
            (K::Remove, O::PresetSlot) => 2,
            (K::Swap, O::Snapshot) => 0,
            (K::Switch, O::PresetSlot) => 2,
            (K::Switch, O::Page | O::ControlSet | O::SnapshotBank) => 1,
            (K::Switch, O::Snapshot) => 0,
            (K::Update, O::Control) => 2,
            (K::Update, O::Ports) => 2,
            (K::Update, O::SubscribedEvents) => 1,
            (K::Update, O::Snapshot | O::SnapshotInfo) => 0,
            (K::UpdateRuntime, O::ControlValue) => 3,
            (K::Event, O::SnapshotBank) => 1,
            (K::SystemCall, O::Reboot | O::UpdateMode) => 0,
            _ => return None,
        })
    }

    /// Decode a complete sysex frame including F0/F7
    pub fn parse(frame: &[u8]) -> Result<Self, CommandError> {
        if frame.len() < 4 || frame[0] != SYSEX_START || frame[frame.len() - 1] != SYSEX_END {
            return Err(CommandError::Malformed("not a complete sysex frame"));
        }
        let inner = &frame[1..frame.len() - 1];
        if inner.iter().any(|b| *b > 0x7F) {
            return Err(CommandError::Malformed("status byte inside frame"));
        }

        let kind = CommandKind::from_byte(inner[0]).ok_or(CommandError::UnknownCommand(inner[0]))?;
        let object = ObjectKind::from_byte(inner[1]).ok_or(CommandError::UnknownObject(inner[1]))?;
        let count = Self::param_count(kind, object)
            .ok_or(CommandError::Unsupported { kind, object })?;

        let rest = &inner[2..];
        if rest.len() < count {
            return Err(CommandError::Malformed("missing parameter bytes"));
        }
        let (params, body) = rest.split_at(count);

        Ok(Self {
            kind,
            object,
            params: params.to_vec(),
            body: body.to_vec(),
        })
    }

    pub fn param(&self, index: usize) -> Option<u8> {
        self.params.get(index).copied()
    }

    /// 14-bit parameter built from bytes `index` (low) and `index + 1` (high)
    pub fn param14(&self, index: usize) -> Option<u16> {
        let lsb = u16::from(self.param(index)?);
        let msb = u16::from(self.param(index + 1)?);
        Some(lsb | (msb << 7))
    }

    /// Parameter `index` checked against `0..=max`
    pub fn param_in_range(
        &self,
        index: usize,
        max: u8,
        what: &'static str,
    ) -> Result<u8, CommandError> {
        let value = self
            .param(index)
            .ok_or(CommandError::Malformed("missing parameter bytes"))?;
        if value > max {
            return Err(CommandError::OutOfRange {
                what,
                value: u16::from(value),
            });
        }
        Ok(value)
    }

    /// Parse the body as JSON; an empty body yields the defaults
    pub fn body_json<T: DeserializeOwned + Default>(&self) -> Result<T, CommandError> {
        if self.body.is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn describe(&self) -> String {
        format!(
            "{:?}/{:?} params [{}] body {} bytes",
            self.kind,
            self.object,
            format_hex(&self.params),
            self.body.len()
        )
    }
}

/// Take a field the operation cannot do without
pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, CommandError> {
    value.ok_or(CommandError::MissingField(field))
}
