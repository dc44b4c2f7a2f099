//! Input Store: the (text, output name) table.

use super::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

const SEED_ROWS: [[&str; 2]; 2] = [
    ["This is a test sentence.", "T001"],
    ["Another test sentence for audio.", "T002"],
];

/// One usable row of the input table.
///
/// `id` is the 1-based position among valid rows of the current load and
/// must not be persisted across loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub id: usize,
    pub text: String,
    pub output_name: String,
}

impl TextRecord {
    /// Display label such as `T001`.
    pub fn label(&self) -> String {
        format!("T{:03}", self.id)
    }
}

/// Reader for the two-column input table. The header row is ignored.
#[derive(Debug, Clone)]
pub struct InputStore {
    path: PathBuf,
}

impl InputStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table with a header and two sample rows if it is missing.
    ///
    /// Returns `true` when a new file was written.
    pub fn ensure_exists(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut writer =
            csv::Writer::from_path(&self.path).map_err(|e| StoreError::csv(&self.path, e))?;
        writer
            .write_record(["Text", "File_name"])
            .map_err(|e| StoreError::csv(&self.path, e))?;
        for row in SEED_ROWS {
            writer
                .write_record(row)
                .map_err(|e| StoreError::csv(&self.path, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(&self.path, e))?;

        tracing::info!("Created input table with sample rows: {:?}", self.path);
        Ok(true)
    }

    /// Read every usable row. Read errors are logged and yield an empty list.
    pub fn load(&self) -> Vec<TextRecord> {
        match self.try_load() {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Error loading text inputs: {}", e);
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<TextRecord>, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| StoreError::csv(&self.path, e))?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| StoreError::csv(&self.path, e))?;
            let text = row.get(0).unwrap_or_default();
            let output_name = row.get(1).unwrap_or_default();
            if text.is_empty() || output_name.is_empty() {
                tracing::debug!("Skipping incomplete input row: {:?}", row);
                continue;
            }

            let record = TextRecord {
                id: records.len() + 1,
                text: text.to_string(),
                output_name: output_name.to_string(),
            };
            tracing::debug!(
                "Loaded text input: {} {:?} -> {}",
                record.label(),
                record.text,
                record.output_name
            );
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, InputStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("texts.csv");
        fs::write(&path, contents).unwrap();
        (dir, InputStore::new(path))
    }

    #[test]
    fn test_load_assigns_ids_among_valid_rows() {
        let (_dir, store) = store_with(
            "Text,File_name\n\
             Hello world,T001\n\
             ,orphan\n\
             no name,\n\
             Goodbye,T002\n",
        );

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].text, "Hello world");
        assert_eq!(records[0].output_name, "T001");
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].text, "Goodbye");
        assert_eq!(records[1].label(), "T002");
    }

    #[test]
    fn test_load_trims_and_handles_quotes() {
        let (_dir, store) = store_with("Text,File_name\n\"  Hi, there  \",  greet \nsolo\n");

        let records = store.load();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "Hi, there");
        assert_eq!(records[0].output_name, "greet");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let store = InputStore::new("/no/such/texts.csv");
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_header_only_is_empty() {
        let (_dir, store) = store_with("Text,File_name\n");
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_ensure_exists_seeds_once() {
        let dir = TempDir::new().unwrap();
        let store = InputStore::new(dir.path().join("nested").join("texts.csv"));

        assert!(store.ensure_exists().unwrap());
        assert!(!store.ensure_exists().unwrap());

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].output_name, "T001");
        assert_eq!(records[1].text, "Another test sentence for audio.");
    }
}
