//! JSONL write-ahead log for [`crate::queue_entry::QueueEvent`], grounded on
//! the teacher's event-sourced storage layer: an append-only, `fsync`d
//! journal that is replayed to rebuild in-memory state after a crash.

use crate::queue_entry::QueueEvent;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a QueueEvent,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    event: QueueEvent,
}

/// A single WAL entry with its assigned sequence number.
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: QueueEvent,
}

/// Append-only JSONL log of [`QueueEvent`]s.
///
/// Every `append` is flushed and `fsync`d immediately — the offline queue is
/// low-volume (backend calls deferred while offline), so the teacher's group
/// commit batching isn't worth the complexity here; durability on every
/// write is.
pub struct Wal {
    file: File,
    path: PathBuf,
    write_seq: u64,
}

impl Wal {
    /// Open or create a WAL at `path`, replaying existing entries.
    ///
    /// Returns the opened log plus every entry found, in order, so the
    /// caller can rebuild a [`crate::queue::OfflineQueue`].
    pub fn open(path: &Path) -> Result<(Self, Vec<WalEntry>), WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (entries, write_seq) = Self::replay(&file)?;

        Ok((
            Self {
                file,
                path: path.to_owned(),
                write_seq,
            },
            entries,
        ))
    }

    fn replay(file: &File) -> Result<(Vec<WalEntry>, u64), WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut max_seq = 0u64;
        let mut line = String::new();
        let mut offset = 0u64;

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!(offset, "corrupt WAL entry, stopping replay");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                offset += bytes_read as u64;
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    warn!(offset, error = %e, "corrupt WAL entry, stopping replay");
                    break;
                }
            };

            max_seq = max_seq.max(record.seq);
            offset += bytes_read as u64;
            entries.push(WalEntry {
                seq: record.seq,
                event: record.event,
            });
        }

        Ok((entries, max_seq))
    }

    /// Append and durably flush a single event.
    pub fn append(&mut self, event: &QueueEvent) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let record = WalRecordRef { seq, event };
        let mut json_bytes = serde_json::to_vec(&record)?;
        json_bytes.push(b'\n');
        self.file.write_all(&json_bytes)?;
        self.file.sync_all()?;
        Ok(seq)
    }

    /// Rewrite the log keeping only entries needed to reconstruct `keep`,
    /// discarding events for entries that have reached a terminal state.
    pub fn compact(&mut self, keep: &[WalEntry]) -> Result<(), WalError> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for entry in keep {
                let record = WalRecordRef {
                    seq: entry.seq,
                    event: &entry.event,
                };
                let mut bytes = serde_json::to_vec(&record)?;
                bytes.push(b'\n');
                tmp.write_all(&bytes)?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
