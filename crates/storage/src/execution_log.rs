//! Local append-only record of completed executions, kept so a worker can
//! reconcile its last-known result with the backend after being offline.
//!
//! Not part of spec.md's explicit component list; supplements it per the
//! backend-outage scenario (spec.md §8) — the worker needs somewhere to
//! remember "what did I just run" that survives a crash independent of the
//! offline queue's own durability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use station_core::ExecutionResult;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionLogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogRecord {
    pub logged_at: DateTime<Utc>,
    pub result: ExecutionResult,
    pub reconciled: bool,
}

/// JSONL append-only history of [`ExecutionResult`]s for one batch worker.
pub struct ExecutionLog {
    path: PathBuf,
}

impl ExecutionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, result: &ExecutionResult, now: DateTime<Utc>) -> Result<(), ExecutionLogError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let record = ExecutionLogRecord {
            logged_at: now,
            result: result.clone(),
            reconciled: false,
        };
        let mut bytes = serde_json::to_vec(&record)?;
        bytes.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }

    /// Results not yet confirmed as delivered to the backend.
    pub fn unreconciled(&self) -> Result<Vec<ExecutionLogRecord>, ExecutionLogError> {
        self.read_all().map(|records| {
            records.into_iter().filter(|r| !r.reconciled).collect()
        })
    }

    fn read_all(&self) -> Result<Vec<ExecutionLogRecord>, ExecutionLogError> {
        let file = match OpenOptions::new().read(true).open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "execution_log_tests.rs"]
mod tests;
