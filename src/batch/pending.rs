//! Pending-file queue owned by one session.

use super::naming::owner_id_from_file_name;
use std::path::{Path, PathBuf};

/// A saved voice sample waiting for the next generate action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedSample {
    pub file_path: PathBuf,
    pub owner_id: String,
}

impl UploadedSample {
    /// Derive the owner id from the file name of `file_path`.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            owner_id: owner_id_from_file_name(&file_name),
            file_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Files uploaded since the last generate action.
///
/// Uploads append; a generate action drains the queue exactly once.
#[derive(Debug, Default, Clone)]
pub struct PendingFiles {
    samples: Vec<UploadedSample>,
}

impl PendingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: UploadedSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadedSample> {
        self.samples.iter()
    }

    /// Remove and return everything queued.
    pub fn take(&mut self) -> Vec<UploadedSample> {
        std::mem::take(&mut self.samples)
    }
}
