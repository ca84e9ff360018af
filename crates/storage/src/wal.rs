// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable operation records

use pv_core::Operation;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A single row mutation recorded in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalRecord {
    /// A new operation was accepted
    OperationInsert { operation: Operation },
    /// An existing operation row was replaced
    OperationUpdate { operation: Operation },
}

impl WalRecord {
    pub fn operation(&self) -> &Operation {
        match self {
            WalRecord::OperationInsert { operation } | WalRecord::OperationUpdate { operation } => {
                operation
            }
        }
    }
}

/// Append-only JSON-lines log; every append is fsynced before returning
pub struct Wal {
    file: File,
    sequence: u64,
    /// Length of the log up to the last complete, synced line
    len: u64,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// A trailing partial line (no newline) left by a crash mid-append is
    /// truncated so later appends start on a clean line.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let contents = std::fs::read(path)?;
        let mut len = contents.len() as u64;
        if !contents.is_empty() && contents.last() != Some(&b'\n') {
            let keep = contents
                .iter()
                .rposition(|b| *b == b'\n')
                .map(|pos| pos + 1)
                .unwrap_or(0);
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = contents.len() - keep,
                "truncating torn WAL tail"
            );
            file.set_len(keep as u64)?;
            len = keep as u64;
        }

        let reader = BufReader::new(File::open(path)?);
        let sequence = reader.lines().count() as u64;

        Ok(Self {
            file,
            sequence,
            len,
        })
    }

    /// Append a record to the log.
    ///
    /// A failed write or sync is rolled back to the last complete line, so a
    /// later append never lands after a partial one.
    pub fn append(&mut self, record: &WalRecord) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            record: record.clone(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        // A fragment whose rollback also failed is still on disk
        let on_disk = self.file.metadata()?.len();
        if on_disk > self.len {
            tracing::warn!(
                dropped_bytes = on_disk - self.len,
                "truncating partial WAL append"
            );
            self.file.set_len(self.len)?;
        }

        if let Err(e) = self.write_line(&line) {
            if let Err(rollback) = self.file.set_len(self.len) {
                tracing::warn!(error = %rollback, "failed to roll back partial WAL append");
            }
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.sequence += 1;
        Ok(self.sequence)
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line)?;
        self.file.sync_all()
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all records from the log.
    ///
    /// A final line that does not parse is a torn write from a crash during
    /// `append` and is skipped; an unparseable line anywhere else is
    /// corruption.
    pub fn replay(path: &Path) -> Result<Vec<WalRecord>, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
        let last = lines.len();
        let mut records = Vec::with_capacity(lines.len());

        for (idx, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(line) {
                Ok(entry) => records.push(entry.record),
                Err(source) if idx + 1 == last => {
                    tracing::warn!(line = idx + 1, error = %source, "skipping torn WAL tail");
                }
                Err(source) => {
                    return Err(WalError::Corrupt {
                        line: idx + 1,
                        source,
                    })
                }
            }
        }

        Ok(records)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WalEntry {
    seq: u64,
    record: WalRecord,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
