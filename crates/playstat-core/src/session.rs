//! Loaded-file session
//!
//! Holds the datasets the user has added, keyed by path, and runs merges over
//! them. A failed add or refresh leaves the session unchanged, and a failed
//! merge writes no output.

use crate::error::{Error, Result};
use crate::merger::{merge_datasets, MergePolicy, MergedDataset};
use crate::parser::parse_export;
use crate::record::FileDataset;
use crate::writer::write_export;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default output file name, without extension
pub const DEFAULT_OUTPUT_NAME: &str = "merged";

/// Where a merged export should be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    /// Directory that must already exist
    pub dir: PathBuf,
    /// File name; `.xml` is appended when missing
    pub name: String,
}

impl OutputTarget {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Validate the target and build the full output path
    pub fn resolve(&self) -> Result<PathBuf> {
        if !self.dir.is_dir() {
            return Err(Error::OutputDirMissing(self.dir.clone()));
        }

        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::EmptyOutputName);
        }

        let file_name = if name.to_lowercase().ends_with(".xml") {
            name.to_string()
        } else {
            format!("{}.xml", name)
        };

        Ok(self.dir.join(file_name))
    }
}

impl Default for OutputTarget {
    /// The user's Documents folder, or the current directory
    fn default() -> Self {
        let dir = dirs::document_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir, DEFAULT_OUTPUT_NAME)
    }
}

/// Result of a merge that was written to disk
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub output_path: PathBuf,
    pub merged: MergedDataset,
}

/// Datasets loaded for merging, in the order they were added
#[derive(Debug, Default)]
pub struct Session {
    datasets: Vec<FileDataset>,
}

impl Session {
    /// Create a new empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a file and add it to the session.
    ///
    /// Files are keyed by canonical path, so two spellings of the same file
    /// are rejected as duplicates.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&FileDataset> {
        let path = canonical_path(path.as_ref())?;
        if self.position(&path).is_some() {
            return Err(Error::DuplicateFile(path));
        }

        let dataset = parse_export(&path)?;
        info!(path = %path.display(), entries = dataset.entry_count(), "added file");
        self.datasets.push(dataset);

        let last = self.datasets.len() - 1;
        Ok(&self.datasets[last])
    }

    /// Remove a file from the session
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> Result<FileDataset> {
        let path = path.as_ref();
        let idx = self
            .position(path)
            .ok_or_else(|| Error::FileNotLoaded(path.to_path_buf()))?;

        debug!(path = %path.display(), "removed file");
        Ok(self.datasets.remove(idx))
    }

    /// Re-read a loaded file from disk.
    ///
    /// On failure the previously loaded dataset is kept.
    pub fn refresh_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&FileDataset> {
        let path = path.as_ref();
        let idx = self
            .position(path)
            .ok_or_else(|| Error::FileNotLoaded(path.to_path_buf()))?;

        let dataset = parse_export(&self.datasets[idx].file_path)?;
        debug!(path = %path.display(), entries = dataset.entry_count(), "refreshed file");
        self.datasets[idx] = dataset;
        Ok(&self.datasets[idx])
    }

    /// Get a loaded dataset by path
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&FileDataset> {
        self.position(path.as_ref()).map(|idx| &self.datasets[idx])
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.position(path.as_ref()).is_some()
    }

    /// Loaded datasets in insertion order
    pub fn datasets(&self) -> &[FileDataset] {
        &self.datasets
    }

    /// Loaded file paths in insertion order
    pub fn paths(&self) -> Vec<&Path> {
        self.datasets.iter().map(|d| d.file_path.as_path()).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Merge all loaded datasets in insertion order
    pub fn merge(&self, policy: MergePolicy) -> Result<MergedDataset> {
        if self.datasets.len() < 2 {
            return Err(Error::InsufficientInput {
                found: self.datasets.len(),
            });
        }
        merge_datasets(&self.datasets, policy)
    }

    /// Validate the output target, merge, and write the export
    pub fn merge_to(&self, policy: MergePolicy, target: &OutputTarget) -> Result<MergeOutcome> {
        let output_path = target.resolve()?;
        let merged = self.merge(policy)?;
        write_export(&merged, &output_path)?;

        Ok(MergeOutcome {
            output_path,
            merged,
        })
    }

    fn position(&self, path: &Path) -> Option<usize> {
        // A path that no longer resolves can still match what was stored
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.datasets.iter().position(|d| d.file_path == path)
    }
}

fn canonical_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}
