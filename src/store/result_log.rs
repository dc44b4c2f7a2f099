//! Result Log: append-only (owner id, voice id, timestamp) table.
//!
//! Rows are only ever appended. Errors are returned to the caller; losing
//! an enrollment row silently would orphan the clips generated for it.

use super::StoreError;
use chrono::NaiveDateTime;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const HEADER: [&str; 3] = ["User_ID", "Voice_ID", "Timestamp"];

/// A voice issued by the service for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceIdentity {
    pub owner_id: String,
    pub voice_id: String,
    pub enrolled_at: NaiveDateTime,
}

impl VoiceIdentity {
    /// Identity stamped with the current local time.
    pub fn now(owner_id: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            voice_id: voice_id.into(),
            enrolled_at: chrono::Local::now().naive_local(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log with only a header row if it is missing.
    pub fn ensure_exists(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.open_for_append()?;
        tracing::info!("Created result log: {:?}", self.path);
        Ok(true)
    }

    /// Append one row and flush it to disk.
    pub fn append(&self, identity: &VoiceIdentity) -> Result<(), StoreError> {
        let mut writer = self.open_for_append()?;
        let timestamp = identity.enrolled_at.format(TIMESTAMP_FORMAT).to_string();
        writer
            .write_record([
                identity.owner_id.as_str(),
                identity.voice_id.as_str(),
                timestamp.as_str(),
            ])
            .map_err(|e| StoreError::csv(&self.path, e))?;
        writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(&self.path, e.into_error()))?;
        file.sync_all().map_err(|e| StoreError::io(&self.path, e))?;

        tracing::info!(
            "Saved user data: {} -> {}",
            identity.owner_id,
            identity.voice_id
        );
        Ok(())
    }

    /// Read every row, oldest first.
    pub fn read_all(&self) -> Result<Vec<VoiceIdentity>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| StoreError::csv(&self.path, e))?;

        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| StoreError::csv(&self.path, e))?;
            let raw_ts = row.get(2).unwrap_or_default();
            let enrolled_at = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT).map_err(|_| {
                StoreError::Timestamp {
                    path: self.path.display().to_string(),
                    value: raw_ts.to_string(),
                }
            })?;
            rows.push(VoiceIdentity {
                owner_id: row.get(0).unwrap_or_default().to_string(),
                voice_id: row.get(1).unwrap_or_default().to_string(),
                enrolled_at,
            });
        }
        Ok(rows)
    }

    /// Open in append mode, writing the header first when the file is new or empty.
    fn open_for_append(&self) -> Result<csv::Writer<fs::File>, StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        let is_empty = file
            .metadata()
            .map_err(|e| StoreError::io(&self.path, e))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer
                .write_record(HEADER)
                .map_err(|e| StoreError::csv(&self.path, e))?;
            writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
        }
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let log = ResultLog::new(dir.path().join("User_Data.csv"));

        log.append(&VoiceIdentity {
            owner_id: "alice".into(),
            voice_id: "V123".into(),
            enrolled_at: at(9, 30, 0),
        })
        .unwrap();
        log.append(&VoiceIdentity {
            owner_id: "john.v2".into(),
            voice_id: "V456".into(),
            enrolled_at: at(9, 31, 5),
        })
        .unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            contents,
            "User_ID,Voice_ID,Timestamp\n\
             alice,V123,2026-10-17 09:30:00\n\
             john.v2,V456,2026-10-17 09:31:05\n"
        );
    }

    #[test]
    fn test_read_all_round_trips_rows() {
        let dir = TempDir::new().unwrap();
        let log = ResultLog::new(dir.path().join("log.csv"));
        let identity = VoiceIdentity {
            owner_id: "alice".into(),
            voice_id: "V123".into(),
            enrolled_at: at(12, 0, 0),
        };
        log.append(&identity).unwrap();
        log.append(&identity).unwrap();

        let rows = log.read_all().unwrap();
        assert_eq!(rows, vec![identity.clone(), identity]);
    }

    #[test]
    fn test_ensure_exists_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let log = ResultLog::new(dir.path().join("sub").join("log.csv"));

        assert!(log.ensure_exists().unwrap());
        assert!(!log.ensure_exists().unwrap());
        assert_eq!(
            fs::read_to_string(log.path()).unwrap(),
            "User_ID,Voice_ID,Timestamp\n"
        );
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_failure_propagates() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the open fail.
        let path = dir.path().join("log.csv");
        fs::create_dir(&path).unwrap();
        let log = ResultLog::new(&path);

        let err = log.append(&VoiceIdentity::now("alice", "V1")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_bad_timestamp_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "User_ID,Voice_ID,Timestamp\nalice,V1,2026-10-d 09:00:00\n").unwrap();

        let err = ResultLog::new(&path).read_all().unwrap_err();
        assert!(matches!(err, StoreError::Timestamp { .. }));
    }
}
