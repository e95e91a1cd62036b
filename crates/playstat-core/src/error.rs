//! Error types for playstat-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in playstat-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed XML in an export file
    #[error("XML error in '{path}': {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    /// The document is not a single complete element tree
    #[error("malformed export '{path}': {message}")]
    Structure { path: PathBuf, message: String },

    /// A file-level metadata element is missing
    #[error("missing <{field}> in '{path}'")]
    MissingMetadata { path: PathBuf, field: &'static str },

    /// An entry lacks a required attribute
    #[error("entry {index} in '{path}' has no '{attribute}' attribute")]
    MissingAttribute {
        path: PathBuf,
        index: usize,
        attribute: &'static str,
    },

    /// A play-count is not a non-negative integer
    #[error("invalid play count '{value}' for key '{key}' in '{path}'")]
    InvalidPlayCount {
        path: PathBuf,
        key: String,
        value: String,
    },

    /// The same key appears twice within one file
    #[error("duplicate key '{key}' in '{path}'")]
    DuplicateKey { path: PathBuf, key: String },

    /// A record set has no entries, so its statistics are undefined
    #[error("'{name}' contains no entries")]
    EmptyDataset { name: String },

    /// A play-count sum does not fit in 64 bits
    #[error("play count overflow in '{name}'")]
    PlayCountOverflow { name: String },

    /// Fewer than two datasets were given to a merge
    #[error("at least 2 files are required to merge, got {found}")]
    InsufficientInput { found: usize },

    /// A dataset taking part in a merge has no entries
    #[error("cannot merge '{path}': it contains no entries")]
    DegenerateInput { path: PathBuf },

    /// The file is already loaded in the session
    #[error("file already added: {0}")]
    DuplicateFile(PathBuf),

    /// The file is not loaded in the session
    #[error("file not loaded: {0}")]
    FileNotLoaded(PathBuf),

    /// The output directory does not exist
    #[error("output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),

    /// No output file name was supplied
    #[error("output file name is empty")]
    EmptyOutputName,

    /// Unrecognised merge policy name
    #[error("unknown merge policy '{0}' (expected sum, largest or smallest)")]
    UnknownPolicy(String),

    /// Failed to write an export file
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV error from the csv crate
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
