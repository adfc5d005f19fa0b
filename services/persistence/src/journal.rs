//! Append-only write journal with checksums
//!
//! Every committed batch becomes one length-prefixed record:
//!
//! ```text
//! [body_len: u32]
//! [sequence: u64]
//! [timestamp: i64]
//! [payload_len: u32][payload: bytes]
//! [checksum: u32]  // CRC32C over sequence + timestamp + payload
//! ```
//!
//! A record is either fully on disk with a valid checksum or it never
//! happened: replay stops at the first short or corrupt record and
//! discards the tail, which is what makes batch commits atomic across
//! a crash.

use crc32c::crc32c;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const JOURNAL_FILE: &str = "journal.bin";

// Sanity bound; anything larger is treated as corruption.
const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record too large: {size} bytes")]
    RecordTooLarge { size: usize },
}

/// A single journal record holding one serialized write batch.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalRecord {
    /// Monotonic record sequence, starting at 1.
    pub sequence: u64,
    /// Unix nanosecond commit timestamp.
    pub timestamp: i64,
    /// Bincode-serialized batch payload.
    pub payload: Vec<u8>,
}

impl JournalRecord {
    fn checksum(sequence: u64, timestamp: i64, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(16 + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let payload_len = self.payload.len() as u32;
        // body = 8 (seq) + 8 (ts) + 4 (payload_len) + payload + 4 (crc)
        let body_len: u32 = 8 + 8 + 4 + payload_len + 4;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&Self::checksum(self.sequence, self.timestamp, &self.payload).to_le_bytes());
        buf
    }

    /// Decode one record from `data`, returning `(record, bytes_consumed)`.
    ///
    /// Returns `None` for anything short, oversized, or checksum-invalid;
    /// the caller treats that as the end of the valid prefix.
    fn from_bytes(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < 4 {
            return None;
        }
        let body_len = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
        // Body: 8 + 8 + 4 + payload + 4, so 24 when the payload is empty.
        if body_len < 24 || body_len > 24 + MAX_PAYLOAD_BYTES {
            return None;
        }
        let total = 4 + body_len;
        if data.len() < total {
            return None;
        }

        let body = &data[4..total];
        let sequence = u64::from_le_bytes(body[0..8].try_into().unwrap());
        let timestamp = i64::from_le_bytes(body[8..16].try_into().unwrap());
        let payload_len = u32::from_le_bytes(body[16..20].try_into().unwrap()) as usize;
        if 20 + payload_len + 4 != body.len() {
            return None;
        }
        let payload = body[20..20 + payload_len].to_vec();
        let stored_crc = u32::from_le_bytes(body[20 + payload_len..].try_into().unwrap());

        if stored_crc != Self::checksum(sequence, timestamp, &payload) {
            return None;
        }

        Some((
            Self {
                sequence,
                timestamp,
                payload,
            },
            total,
        ))
    }
}

/// Controls when `fsync` is called after an append.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    /// Fsync after every append (default; a commit survives power loss).
    Always,
    /// Fsync every N appends.
    EveryN(usize),
    /// Never fsync explicitly; rely on the OS cache.
    Never,
}

/// Result of replaying a journal directory.
#[derive(Debug)]
pub struct Replay {
    /// Valid records, in commit order.
    pub records: Vec<JournalRecord>,
    /// Length of the valid record prefix, in bytes.
    pub valid_bytes: u64,
    /// Bytes discarded from the corrupt or truncated tail.
    pub discarded_bytes: u64,
}

impl Replay {
    /// Sequence the next appended record should carry.
    pub fn next_sequence(&self) -> u64 {
        self.records.last().map(|r| r.sequence + 1).unwrap_or(1)
    }
}

/// Read back the valid record prefix of the journal in `dir`.
///
/// An absent file yields an empty replay. Records with a bad checksum,
/// a short frame, or a non-increasing sequence end the valid prefix.
pub fn replay(dir: &Path) -> Result<Replay, JournalError> {
    let path = dir.join(JOURNAL_FILE);
    if !path.exists() {
        return Ok(Replay {
            records: Vec::new(),
            valid_bytes: 0,
            discarded_bytes: 0,
        });
    }

    let mut data = Vec::new();
    File::open(&path)?.read_to_end(&mut data)?;

    let mut records = Vec::new();
    let mut pos = 0usize;
    let mut last_sequence = 0u64;

    while pos < data.len() {
        match JournalRecord::from_bytes(&data[pos..]) {
            Some((record, consumed)) if record.sequence > last_sequence => {
                last_sequence = record.sequence;
                pos += consumed;
                records.push(record);
            }
            _ => break,
        }
    }

    let discarded = (data.len() - pos) as u64;
    if discarded > 0 {
        tracing::warn!(
            path = %path.display(),
            discarded_bytes = discarded,
            "discarding corrupt journal tail"
        );
    }

    Ok(Replay {
        records,
        valid_bytes: pos as u64,
        discarded_bytes: discarded,
    })
}

/// Cut a corrupt tail off the journal so that appended records follow
/// the valid prefix directly.
pub fn truncate_tail(dir: &Path, valid_bytes: u64) -> Result<(), JournalError> {
    let path = dir.join(JOURNAL_FILE);
    if path.exists() {
        let file = OpenOptions::new().write(true).open(&path)?;
        file.set_len(valid_bytes)?;
        file.sync_all()?;
    }
    Ok(())
}

/// Appender for the journal file.
pub struct JournalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    next_sequence: u64,
    fsync_policy: FsyncPolicy,
    appends_since_fsync: usize,
}

impl JournalWriter {
    /// Open the journal in `dir` for appending, creating it if needed.
    ///
    /// `next_sequence` usually comes from [`Replay::next_sequence`].
    pub fn open(
        dir: &Path,
        next_sequence: u64,
        fsync_policy: FsyncPolicy,
    ) -> Result<Self, JournalError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            next_sequence,
            fsync_policy,
            appends_since_fsync: 0,
        })
    }

    /// Append one payload, returning the sequence it was assigned.
    ///
    /// The frame is flushed to the OS on every call; durability beyond
    /// that follows the fsync policy.
    pub fn append(&mut self, timestamp: i64, payload: &[u8]) -> Result<u64, JournalError> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(JournalError::RecordTooLarge {
                size: payload.len(),
            });
        }

        let record = JournalRecord {
            sequence: self.next_sequence,
            timestamp,
            payload: payload.to_vec(),
        };
        self.writer.write_all(&record.to_bytes())?;
        self.writer.flush()?;

        self.appends_since_fsync += 1;
        let should_fsync = match self.fsync_policy {
            FsyncPolicy::Always => true,
            FsyncPolicy::EveryN(n) => self.appends_since_fsync >= n,
            FsyncPolicy::Never => false,
        };
        if should_fsync {
            self.writer.get_ref().sync_all()?;
            self.appends_since_fsync = 0;
        }

        self.next_sequence += 1;
        Ok(record.sequence)
    }

    /// Force flush + fsync (used before shutdown).
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.appends_since_fsync = 0;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}
