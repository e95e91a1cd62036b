//! Merge engine for combining play-count datasets

use crate::error::{Error, Result};
use crate::record::{FileDataset, PlayStats, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// How play-counts for the same key are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Add all counts together
    #[default]
    Sum,
    /// Keep the largest count
    UseLargest,
    /// Keep the smallest count
    UseSmallest,
}

impl MergePolicy {
    pub const ALL: [MergePolicy; 3] = [
        MergePolicy::Sum,
        MergePolicy::UseLargest,
        MergePolicy::UseSmallest,
    ];

    /// Combine an existing merged count with another file's count.
    ///
    /// Returns `None` only when a sum overflows.
    fn combine(self, current: u64, incoming: u64) -> Option<u64> {
        match self {
            MergePolicy::Sum => current.checked_add(incoming),
            MergePolicy::UseLargest => Some(current.max(incoming)),
            MergePolicy::UseSmallest => Some(current.min(incoming)),
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Sum => write!(f, "sum"),
            MergePolicy::UseLargest => write!(f, "largest"),
            MergePolicy::UseSmallest => write!(f, "smallest"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sum" | "add" => Ok(MergePolicy::Sum),
            "largest" | "use-largest" | "max" => Ok(MergePolicy::UseLargest),
            "smallest" | "use-smallest" | "min" => Ok(MergePolicy::UseSmallest),
            _ => Err(Error::UnknownPolicy(s.to_string())),
        }
    }
}

/// The result of merging several datasets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedDataset {
    /// Version carried over from the first input
    pub version: String,
    /// Mapping descriptor carried over from the first input
    pub mapping: String,
    /// Merged records in first-seen key order
    pub records: Vec<Record>,
    /// Statistics recomputed over `records`
    pub stats: PlayStats,
    /// Files that contributed to this dataset, in merge order
    pub sources: Vec<PathBuf>,
    /// Policy used for conflicting keys
    pub policy: MergePolicy,
}

impl MergedDataset {
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

/// Merge datasets by key under the given policy.
///
/// Keys keep the order in which they are first seen across `datasets`. A key
/// missing from a dataset contributes nothing for that dataset. Each merged
/// record keeps the extra attributes of the first dataset containing its key.
pub fn merge_datasets(datasets: &[FileDataset], policy: MergePolicy) -> Result<MergedDataset> {
    if datasets.len() < 2 {
        return Err(Error::InsufficientInput {
            found: datasets.len(),
        });
    }

    if let Some(empty) = datasets.iter().find(|d| d.records.is_empty()) {
        return Err(Error::DegenerateInput {
            path: empty.file_path.clone(),
        });
    }

    let mut records: Vec<Record> = Vec::new();
    let mut index_by_key: HashMap<&str, usize> = HashMap::new();

    for dataset in datasets {
        for record in &dataset.records {
            match index_by_key.get(record.key.as_str()) {
                Some(&idx) => {
                    let merged = &mut records[idx];
                    merged.play_count = policy
                        .combine(merged.play_count, record.play_count)
                        .ok_or_else(|| Error::PlayCountOverflow {
                            name: record.key.clone(),
                        })?;
                }
                None => {
                    index_by_key.insert(record.key.as_str(), records.len());
                    records.push(record.clone());
                }
            }
        }
    }

    let counts: Vec<u64> = records.iter().map(|r| r.play_count).collect();
    let stats = PlayStats::compute(&counts, "merged dataset")?;

    let first = &datasets[0];
    let sources: Vec<PathBuf> = datasets.iter().map(|d| d.file_path.clone()).collect();

    info!(
        files = datasets.len(),
        keys = stats.entry_count,
        total_plays = stats.total_plays,
        %policy,
        "merged datasets"
    );

    Ok(MergedDataset {
        version: first.version.clone(),
        mapping: first.mapping.clone(),
        records,
        stats,
        sources,
        policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_export_str;

    fn dataset(name: &str, entries: &[(&str, u64)]) -> FileDataset {
        let mut xml = String::from(
            "<PlaybackStatistics><Version>3.0</Version><Mapping>%title%</Mapping><Entries>",
        );
        for (key, count) in entries {
            xml.push_str(&format!(r#"<Entry ID="{key}" Count="{count}"/>"#));
        }
        xml.push_str("</Entries></PlaybackStatistics>");
        parse_export_str(&xml, name).unwrap()
    }

    fn pairs(merged: &MergedDataset) -> Vec<(&str, u64)> {
        merged
            .records
            .iter()
            .map(|r| (r.key.as_str(), r.play_count))
            .collect()
    }

    #[test]
    fn test_merge_sum() {
        let a = dataset("a.xml", &[("a", 3), ("b", 5)]);
        let b = dataset("b.xml", &[("a", 2), ("c", 7)]);

        let merged = merge_datasets(&[a, b], MergePolicy::Sum).unwrap();

        assert_eq!(pairs(&merged), vec![("a", 5), ("b", 5), ("c", 7)]);
        assert_eq!(merged.total_plays(), 17);
        assert_eq!(merged.entry_count(), 3);
    }

    #[test]
    fn test_merge_use_largest() {
        let a = dataset("a.xml", &[("a", 3), ("b", 5)]);
        let b = dataset("b.xml", &[("a", 8), ("c", 1)]);

        let merged = merge_datasets(&[a, b], MergePolicy::UseLargest).unwrap();

        assert_eq!(pairs(&merged), vec![("a", 8), ("b", 5), ("c", 1)]);
    }

    #[test]
    fn test_merge_use_smallest() {
        let a = dataset("a.xml", &[("a", 3), ("b", 5)]);
        let b = dataset("b.xml", &[("a", 8), ("c", 1)]);

        let merged = merge_datasets(&[a, b], MergePolicy::UseSmallest).unwrap();

        // Missing keys are not treated as zero
        assert_eq!(pairs(&merged), vec![("a", 3), ("b", 5), ("c", 1)]);
    }

    #[test]
    fn test_merge_key_order_is_first_seen() {
        let a = dataset("a.xml", &[("z", 1), ("m", 1)]);
        let b = dataset("b.xml", &[("a", 1), ("m", 1)]);
        let c = dataset("c.xml", &[("b", 1), ("z", 1), ("a", 1)]);

        let merged = merge_datasets(&[a, b, c], MergePolicy::Sum).unwrap();

        let keys: Vec<&str> = merged.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "m", "a", "b"]);
        assert_eq!(merged.find_record("z").unwrap().play_count, 2);
        assert_eq!(merged.find_record("a").unwrap().play_count, 2);
    }

    #[test]
    fn test_merge_recomputes_stats() {
        let a = dataset("a.xml", &[("a", 3), ("b", 5)]);
        let b = dataset("b.xml", &[("a", 2), ("c", 7)]);

        let merged = merge_datasets(&[a, b], MergePolicy::Sum).unwrap();
        let expected = PlayStats::compute(&[5, 5, 7], "x").unwrap();

        assert!((merged.average() - expected.average).abs() < 1e-9);
        assert!((merged.deviation() - expected.deviation).abs() < 1e-9);
    }

    #[test]
    fn test_merge_carries_first_metadata_and_sources() {
        let a = dataset("a.xml", &[("a", 1)]);
        let mut b = dataset("b.xml", &[("a", 1)]);
        b.version = "9".to_string();
        b.mapping = "other".to_string();

        let merged = merge_datasets(&[a, b], MergePolicy::UseLargest).unwrap();

        assert_eq!(merged.version, "3.0");
        assert_eq!(merged.mapping, "%title%");
        assert_eq!(
            merged.sources,
            vec![PathBuf::from("a.xml"), PathBuf::from("b.xml")]
        );
        assert_eq!(merged.policy, MergePolicy::UseLargest);
    }

    #[test]
    fn test_merge_keeps_first_attributes() {
        let a = parse_export_str(
            r#"<PlaybackStatistics><Version>1</Version><Mapping>m</Mapping>
               <Entry ID="k" Count="1" Rating="5"/></PlaybackStatistics>"#,
            "a.xml",
        )
        .unwrap();
        let b = parse_export_str(
            r#"<PlaybackStatistics><Version>1</Version><Mapping>m</Mapping>
               <Entry ID="k" Count="4" Rating="1"/></PlaybackStatistics>"#,
            "b.xml",
        )
        .unwrap();

        let merged = merge_datasets(&[a, b], MergePolicy::Sum).unwrap();
        let k = merged.find_record("k").unwrap();

        assert_eq!(k.play_count, 5);
        assert_eq!(k.attribute("Rating"), Some("5"));
    }

    #[test]
    fn test_merge_single_dataset_rejected() {
        let a = dataset("a.xml", &[("a", 1)]);
        let err = merge_datasets(&[a], MergePolicy::Sum).unwrap_err();
        assert!(matches!(err, Error::InsufficientInput { found: 1 }));

        let err = merge_datasets(&[], MergePolicy::Sum).unwrap_err();
        assert!(matches!(err, Error::InsufficientInput { found: 0 }));
    }

    #[test]
    fn test_merge_rejects_empty_dataset() {
        let a = dataset("a.xml", &[("a", 1)]);
        let mut b = dataset("b.xml", &[("b", 1)]);
        b.records.clear();

        let err = merge_datasets(&[a, b], MergePolicy::Sum).unwrap_err();
        assert!(matches!(err, Error::DegenerateInput { ref path } if path == &PathBuf::from("b.xml")));
    }

    #[test]
    fn test_merge_sum_overflow() {
        let a = dataset("a.xml", &[("a", u64::MAX)]);
        let b = dataset("b.xml", &[("a", 1)]);

        let err = merge_datasets(&[a, b], MergePolicy::Sum).unwrap_err();
        assert!(matches!(err, Error::PlayCountOverflow { ref name } if name == "a"));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("sum".parse::<MergePolicy>().unwrap(), MergePolicy::Sum);
        assert_eq!("Add".parse::<MergePolicy>().unwrap(), MergePolicy::Sum);
        assert_eq!("largest".parse::<MergePolicy>().unwrap(), MergePolicy::UseLargest);
        assert_eq!("min".parse::<MergePolicy>().unwrap(), MergePolicy::UseSmallest);
        assert!(matches!(
            "median".parse::<MergePolicy>(),
            Err(Error::UnknownPolicy(_))
        ));

        for policy in MergePolicy::ALL {
            assert_eq!(policy.to_string().parse::<MergePolicy>().unwrap(), policy);
        }
    }
}
