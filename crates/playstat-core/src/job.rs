//! Merge job files
//!
//! A job file (JSON) records which exports to merge, how, and where the
//! result goes, so a merge can be repeated without retyping arguments.

use crate::error::{Error, Result};
use crate::merger::MergePolicy;
use crate::scanner::scan_directory;
use crate::session::{MergeOutcome, OutputTarget, Session, DEFAULT_OUTPUT_NAME};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// A saved merge job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeJob {
    /// Export files to merge, in merge order
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    /// Directories scanned for further `.xml` exports
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    /// Policy for conflicting keys
    #[serde(default)]
    pub policy: MergePolicy,
    /// Output directory (must exist)
    pub output_dir: PathBuf,
    /// Output file name
    #[serde(default = "default_output_name")]
    pub output_name: String,
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

impl MergeJob {
    /// Load a job file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the job file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn target(&self) -> OutputTarget {
        OutputTarget::new(self.output_dir.clone(), self.output_name.clone())
    }

    /// Build a session from the job's inputs and roots.
    ///
    /// Explicit inputs come first; scanned files already listed are skipped.
    pub fn load_session(&self) -> Result<Session> {
        let mut session = Session::new();
        for input in &self.inputs {
            session.add_file(input)?;
        }

        if !self.roots.is_empty() {
            let scan = scan_directory(&self.roots)?;
            for file in &scan.files {
                if !session.contains(file) {
                    session.add_file(file)?;
                }
            }
        }

        Ok(session)
    }

    /// Load every input, merge, and write the output
    pub fn run(&self) -> Result<MergeOutcome> {
        let session = self.load_session()?;
        info!(files = session.len(), policy = %self.policy, "running merge job");
        session.merge_to(self.policy, &self.target())
    }
}
