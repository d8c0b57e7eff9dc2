use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{error, info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::dedup::lock::FileLock;
use crate::dedup::record::DuplicateRecord;

/// Upper bound for one framed entry; anything larger is a damaged length
const MAX_ENTRY_LEN: usize = 1 << 20;
const FRAME_HEADER_LEN: u64 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub record: DuplicateRecord,
    pub appended_at: DateTime<Utc>,
}

/// What a replay recovered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub entries: usize,
    pub skipped: usize,
    pub truncated_bytes: u64,
}

/// Append-only duplicate log.
///
/// Each entry is framed as `[len: u32][crc32: u32][bincode LogEntry]`. The
/// log is never rewritten. Damaged regions are skipped on replay, and only
/// a torn tail with no intact frame after it is cut off on open.
pub struct DuplicateLog {
    file: File,
    path: PathBuf,
    position: u64,
    _lock: FileLock,
}

impl DuplicateLog {
    /// Open (creating if needed) the log, replay every readable entry and
    /// position the writer at the end of the last complete frame
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, Vec<LogEntry>, ReplaySummary)> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let lock = FileLock::acquire(&path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let (entries, mut summary, valid_len) = Self::replay(&mut file)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            summary.truncated_bytes = file_len - valid_len;
            warn!(path = %path.display(), bytes = summary.truncated_bytes, "cutting torn tail off duplicate log");
            file.set_len(valid_len)?;
        }
        file.seek(SeekFrom::Start(valid_len))?;

        info!(path = %path.display(), entries = summary.entries, skipped = summary.skipped,
              "replayed duplicate log");

        Ok((DuplicateLog { file, path, position: valid_len, _lock: lock }, entries, summary))
    }

    fn replay(file: &mut File) -> Result<(Vec<LogEntry>, ReplaySummary, u64)> {
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        BufReader::new(&*file).read_to_end(&mut bytes)?;

        let mut entries = Vec::new();
        let mut summary = ReplaySummary::default();
        let mut offset = 0usize;
        let mut valid_len = 0u64;

        while offset < bytes.len() {
            let Some(data) = intact_frame_at(&bytes, offset) else {
                // A damaged frame in the middle is skipped up to the next
                // intact one; only a damaged tail with nothing after it is cut
                match resync(&bytes, offset + 1) {
                    Some(next) => {
                        warn!(offset, resumed_at = next, "skipping damaged region of duplicate log");
                        summary.skipped += 1;
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            };
            offset += FRAME_HEADER_LEN as usize + data.len();
            valid_len = offset as u64;

            match bincode::deserialize::<LogEntry>(data) {
                Ok(entry) => {
                    entries.push(entry);
                    summary.entries += 1;
                }
                Err(e) => {
                    warn!(offset, error = %e, "skipping undecodable duplicate log entry");
                    summary.skipped += 1;
                }
            }
        }

        Ok((entries, summary, valid_len))
    }

    /// Append records and flush them to disk
    pub fn append(&mut self, records: &[DuplicateRecord]) -> Result<()> {
        let appended_at = Utc::now();
        let mut buffer = Vec::new();
        for record in records {
            let entry = LogEntry { record: record.clone(), appended_at };
            let data = bincode::serialize(&entry)?;
            if data.len() > MAX_ENTRY_LEN {
                return Err(Error::new(ErrorKind::InvalidInput,
                                      format!("duplicate record for {} is too large", record.doc_id())));
            }
            buffer.extend_from_slice(&(data.len() as u32).to_le_bytes());
            buffer.extend_from_slice(&crc32fast::hash(&data).to_le_bytes());
            buffer.extend_from_slice(&data);
        }

        if let Err(e) = self.file.write_all(&buffer).and_then(|()| self.file.sync_data()) {
            self.rollback();
            return Err(e.into());
        }
        self.position += buffer.len() as u64;
        Ok(())
    }

    /// Drop a partially written batch so later appends follow the last
    /// complete frame
    fn rollback(&mut self) {
        let restored = self.file.set_len(self.position)
            .and_then(|()| self.file.seek(SeekFrom::Start(self.position)).map(|_| ()));
        if let Err(e) = restored {
            error!(path = %self.path.display(), error = %e, "could not roll back partial duplicate log append");
        }
    }

    /// Bytes of complete entries on disk
    pub fn len(&self) -> u64 {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Payload of the frame at `offset` if its length is sane, it fits in
/// the file and its checksum matches
fn intact_frame_at(bytes: &[u8], offset: usize) -> Option<&[u8]> {
    let header_end = offset.checked_add(FRAME_HEADER_LEN as usize)?;
    let header = bytes.get(offset..header_end)?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    // Entries are never empty, so a zeroed header is not a frame
    if len == 0 || len > MAX_ENTRY_LEN {
        return None;
    }
    let data = bytes.get(header_end..header_end + len)?;
    (crc32fast::hash(data) == checksum).then_some(data)
}

/// Offset of the first intact frame at or after `from`
fn resync(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&offset| intact_frame_at(bytes, offset).is_some())
}
