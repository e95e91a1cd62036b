//! Core record types for playback statistics

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single keyed play-count entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Key identifying the tracked item
    pub key: String,
    /// Number of recorded plays
    pub play_count: u64,
    /// Remaining entry attributes, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
}

impl Record {
    /// Create a new record without extra attributes
    pub fn new(key: impl Into<String>, play_count: u64) -> Self {
        Self {
            key: key.into(),
            play_count,
            attributes: Vec::new(),
        }
    }

    /// Get an extra attribute by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Aggregate statistics over a set of play-counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayStats {
    pub entry_count: usize,
    pub total_plays: u64,
    pub average: f64,
    /// Population standard deviation about `average`
    pub deviation: f64,
}

impl PlayStats {
    /// Compute statistics for the given play-counts.
    ///
    /// `name` identifies the record set in errors. An empty set is an error
    /// rather than a NaN average, and the total is overflow-checked.
    pub fn compute(counts: &[u64], name: &str) -> Result<Self> {
        if counts.is_empty() {
            return Err(Error::EmptyDataset {
                name: name.to_string(),
            });
        }

        let total_plays = counts
            .iter()
            .try_fold(0u64, |acc, &c| acc.checked_add(c))
            .ok_or_else(|| Error::PlayCountOverflow {
                name: name.to_string(),
            })?;

        let entry_count = counts.len();
        let average = total_plays as f64 / entry_count as f64;
        let var_sum: f64 = counts
            .iter()
            .map(|&c| {
                let d = c as f64 - average;
                d * d
            })
            .sum();
        let deviation = (var_sum / entry_count as f64).sqrt();

        Ok(Self {
            entry_count,
            total_plays,
            average,
            deviation,
        })
    }
}

/// A parsed export file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDataset {
    /// File name without directories
    pub file_name: String,
    /// Path the file was loaded from
    pub file_path: PathBuf,
    /// File size in bytes
    pub file_size: u64,
    /// Version tag from the file
    pub version: String,
    /// Mapping descriptor from the file
    pub mapping: String,
    /// Entries in document order
    pub records: Vec<Record>,
    /// Statistics over `records`
    pub stats: PlayStats,
}

impl FileDataset {
    /// Build a dataset, computing its statistics.
    ///
    /// Fails with [`Error::EmptyDataset`] when `records` is empty.
    pub fn new(
        file_path: PathBuf,
        file_size: u64,
        version: String,
        mapping: String,
        records: Vec<Record>,
    ) -> Result<Self> {
        let file_name = file_name_of(&file_path);
        let counts: Vec<u64> = records.iter().map(|r| r.play_count).collect();
        let stats = PlayStats::compute(&counts, &file_path.display().to_string())?;

        Ok(Self {
            file_name,
            file_path,
            file_size,
            version,
            mapping,
            records,
            stats,
        })
    }

    pub fn entry_count(&self) -> usize {
        self.stats.entry_count
    }

    pub fn total_plays(&self) -> u64 {
        self.stats.total_plays
    }

    pub fn average(&self) -> f64 {
        self.stats.average
    }

    pub fn deviation(&self) -> f64 {
        self.stats.deviation
    }

    /// Raw play-counts in record order
    pub fn counts(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.play_count).collect()
    }

    /// Find a record by key
    pub fn find_record(&self, key: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.key == key)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
