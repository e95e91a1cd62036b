//! Per-dataset statistics summaries in text, JSON and CSV form

use crate::error::Result;
use crate::merger::MergedDataset;
use crate::record::FileDataset;
use serde::Serialize;
use std::io::Write;

/// Summary row for one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub version: String,
    pub mapping: String,
    pub entry_count: usize,
    pub total_plays: u64,
    pub average: f64,
    pub deviation: f64,
}

impl From<&FileDataset> for DatasetSummary {
    fn from(ds: &FileDataset) -> Self {
        Self {
            file_name: ds.file_name.clone(),
            file_path: ds.file_path.display().to_string(),
            file_size: ds.file_size,
            version: ds.version.clone(),
            mapping: ds.mapping.clone(),
            entry_count: ds.stats.entry_count,
            total_plays: ds.stats.total_plays,
            average: ds.stats.average,
            deviation: ds.stats.deviation,
        }
    }
}

impl DatasetSummary {
    /// Summarise a merge result; it has no file of its own yet
    pub fn from_merged(merged: &MergedDataset, label: &str) -> Self {
        Self {
            file_name: label.to_string(),
            file_path: String::new(),
            file_size: 0,
            version: merged.version.clone(),
            mapping: merged.mapping.clone(),
            entry_count: merged.stats.entry_count,
            total_plays: merged.stats.total_plays,
            average: merged.stats.average,
            deviation: merged.stats.deviation,
        }
    }

    /// Multi-line human readable form
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("File:        {}\n", self.file_name));
        if !self.file_path.is_empty() {
            out.push_str(&format!("Path:        {}\n", self.file_path));
            out.push_str(&format!("Size:        {} bytes\n", self.file_size));
        }
        out.push_str(&format!("Version:     {}\n", self.version));
        out.push_str(&format!("Mapping:     {}\n", self.mapping));
        out.push_str(&format!("Entries:     {}\n", self.entry_count));
        out.push_str(&format!("Total plays: {}\n", self.total_plays));
        out.push_str(&format!("Average:     {:.4}\n", self.average));
        out.push_str(&format!("Deviation:   {:.4}\n", self.deviation));
        out
    }
}

/// Write summaries as CSV with a header row
pub fn write_csv<W: Write>(summaries: &[DatasetSummary], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for summary in summaries {
        csv_writer.serialize(summary)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write summaries as a pretty-printed JSON array
pub fn write_json<W: Write>(summaries: &[DatasetSummary], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, summaries)?;
    writeln!(writer)?;
    Ok(())
}
