//! Directory scanner for discovering export files

use crate::error::Result;
use crate::parser::parse_export;
use crate::record::FileDataset;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Result of scanning directories
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered `.xml` files, sorted by path
    pub files: Vec<PathBuf>,
}

impl ScanResult {
    /// Parse every discovered file, skipping ones that fail.
    ///
    /// Failures are returned alongside the datasets that parsed.
    pub fn load(&self) -> (Vec<FileDataset>, Vec<(PathBuf, String)>) {
        let mut datasets = Vec::new();
        let mut errors = Vec::new();

        for path in &self.files {
            match parse_export(path) {
                Ok(dataset) => datasets.push(dataset),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable export");
                    errors.push((path.clone(), e.to_string()));
                }
            }
        }

        (datasets, errors)
    }
}

/// Scan one or more directories for export files
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut files = Vec::new();

    for root in roots {
        for entry in WalkDir::new(root.as_ref()).follow_links(true) {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type().is_file() && is_export_file(path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
    })
}

fn is_export_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = r#"<PlaybackStatistics><Version>1</Version><Mapping>m</Mapping>
        <Entry ID="a" Count="1"/></PlaybackStatistics>"#;

    #[test]
    fn test_is_export_file() {
        assert!(is_export_file(Path::new("stats.xml")));
        assert!(is_export_file(Path::new("dir/STATS.XML")));
        assert!(!is_export_file(Path::new("stats.csv")));
        assert!(!is_export_file(Path::new("xml")));
    }

    #[test]
    fn test_scan_finds_nested_files_sorted() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("b.xml"), VALID).unwrap();
        fs::write(nested.join("a.xml"), VALID).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = scan_directory(&[dir.path()]).unwrap();

        assert_eq!(result.files.len(), 2);
        let mut expected = vec![dir.path().join("b.xml"), nested.join("a.xml")];
        expected.sort();
        assert_eq!(result.files, expected);
    }

    #[test]
    fn test_load_separates_failures() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.xml"), VALID).unwrap();
        fs::write(dir.path().join("bad.xml"), "<PlaybackStatistics/>").unwrap();

        let result = scan_directory(&[dir.path()]).unwrap();
        let (datasets, errors) = result.load();

        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].file_name, "good.xml");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, dir.path().join("bad.xml"));
    }
}
