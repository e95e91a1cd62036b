//! playstat-core: Core library for merging playback statistics exports
//!
//! This library provides functionality to:
//! - Parse playback statistics XML exports into keyed play-count records
//! - Compute per-file statistics (total plays, average, standard deviation)
//! - Merge several exports under a sum / largest / smallest policy
//! - Write the merged result back out in the same export schema
//! - Keep a session of loaded files and run saved merge jobs

pub mod error;
pub mod job;
pub mod merger;
pub mod parser;
pub mod record;
pub mod report;
pub mod scanner;
pub mod session;
pub mod writer;

pub use error::{Error, Result};
pub use job::MergeJob;
pub use merger::{merge_datasets, MergePolicy, MergedDataset};
pub use parser::{parse_export, parse_export_str};
pub use record::{FileDataset, PlayStats, Record};
pub use report::DatasetSummary;
pub use scanner::{scan_directory, ScanResult};
pub use session::{MergeOutcome, OutputTarget, Session};
pub use writer::write_export;
