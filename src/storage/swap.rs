//! Journaled exchange of two snapshot slots
//!
//! Before touching any file the swap writes `swap.journal` holding both
//! original records. Payload files then move in three renames through
//! `swap.tmp`, the journal phase advancing after each one, and finally the
//! metadata records are rewritten from the journal. Every step checks the
//! files it moves, so replaying a journal after a crash finishes the swap
//! without repeating work.

use super::snapshots::{SnapshotRecord, SnapshotStore};
use super::{io_error, remove_file_if_exists, write_atomic, StorageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const JOURNAL_FILE: &str = "swap.journal";
const TMP_FILE: &str = "swap.tmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) enum SwapPhase {
    Started,
    SourceParked,
    DestMoved,
    FilesSwapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct SlotAddr {
    pub bank: u8,
    pub slot: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SwapJournal {
    pub phase: SwapPhase,
    pub source: SlotAddr,
    pub dest: SlotAddr,
    pub source_record: Option<SnapshotRecord>,
    pub dest_record: Option<SnapshotRecord>,
}

impl SnapshotStore {
    /// Exchange two slots, payloads and metadata. An empty destination
    /// turns the swap into a move.
    pub fn swap(
        &self,
        source_bank: u8,
        source_slot: u8,
        dest_bank: u8,
        dest_slot: u8,
    ) -> Result<(), StorageError> {
        Self::snapshot_id(source_bank, source_slot)?;
        Self::snapshot_id(dest_bank, dest_slot)?;
        if (source_bank, source_slot) == (dest_bank, dest_slot) {
            return Ok(());
        }

        let source_record = self.info(source_bank, source_slot)?.ok_or(StorageError::EmptySlot {
            bank: source_bank,
            slot: source_slot,
        })?;
        let dest_record = self.info(dest_bank, dest_slot)?;

        // leftover from a swap that never wrote its journal
        remove_file_if_exists(&self.tmp_path())?;

        let journal = SwapJournal {
            phase: SwapPhase::Started,
            source: SlotAddr { bank: source_bank, slot: source_slot },
            dest: SlotAddr { bank: dest_bank, slot: dest_slot },
            source_record: Some(source_record),
            dest_record,
        };
        self.write_journal(&journal)?;
        self.run_swap(journal)?;

        info!(
            "Snapshot swap: {}/{} <-> {}/{}",
            source_bank, source_slot, dest_bank, dest_slot
        );
        Ok(())
    }

    /// Finish a swap left behind by an interrupted run
    pub(super) fn recover_swap(&self) -> Result<(), StorageError> {
        let path = self.journal_path();
        if !path.exists() {
            return Ok(());
        }
        let bytes = std::fs::read(&path).map_err(io_error(&path))?;
        match serde_json::from_slice::<SwapJournal>(&bytes) {
            Ok(journal) => {
                warn!("Resuming interrupted snapshot swap at {:?}", journal.phase);
                self.run_swap(journal)
            }
            Err(e) => {
                warn!("Discarding unreadable swap journal: {}", e);
                remove_file_if_exists(&path)
            }
        }
    }

    fn run_swap(&self, mut journal: SwapJournal) -> Result<(), StorageError> {
        let source = self.slot_path(journal.source.bank, journal.source.slot);
        let dest = self.slot_path(journal.dest.bank, journal.dest.slot);
        let tmp = self.tmp_path();

        if journal.phase == SwapPhase::Started {
            if source.exists() && !tmp.exists() {
                rename(&source, &tmp)?;
            }
            journal.phase = SwapPhase::SourceParked;
            self.write_journal(&journal)?;
        }

        if journal.phase == SwapPhase::SourceParked {
            if dest.exists() && !source.exists() {
                rename(&dest, &source)?;
            }
            journal.phase = SwapPhase::DestMoved;
            self.write_journal(&journal)?;
        }

        if journal.phase == SwapPhase::DestMoved {
            if tmp.exists() {
                rename(&tmp, &dest)?;
            }
            journal.phase = SwapPhase::FilesSwapped;
            self.write_journal(&journal)?;
        }

        self.commit_swap_metadata(&journal)?;
        remove_file_if_exists(&self.journal_path())?;
        debug!("Swap journal cleared");
        Ok(())
    }

    /// Full field swap: each record moves with its payload
    fn commit_swap_metadata(&self, journal: &SwapJournal) -> Result<(), StorageError> {
        let (source, dest) = (journal.source, journal.dest);
        let source_id = Self::snapshot_id(source.bank, source.slot)?;
        let dest_id = Self::snapshot_id(dest.bank, dest.slot)?;

        match &journal.source_record {
            Some(record) => {
                let moved = record.relocated(dest.bank, dest.slot);
                self.db.update(dest_id, &moved.to_bytes())?
            }
            None => self.db.remove(dest_id)?,
        }
        match &journal.dest_record {
            Some(record) => {
                let moved = record.relocated(source.bank, source.slot);
                self.db.update(source_id, &moved.to_bytes())?
            }
            None => self.db.remove(source_id)?,
        }
        Ok(())
    }

    fn write_journal(&self, journal: &SwapJournal) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(journal)?;
        write_atomic(&self.journal_path(), &data)
    }

    fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(TMP_FILE)
    }
}

fn rename(from: &Path, to: &Path) -> Result<(), StorageError> {
    std::fs::rename(from, to).map_err(io_error(from))
}
