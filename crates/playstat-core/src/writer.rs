//! Export writer for merged datasets
//!
//! Output is written to a temporary file next to the target and renamed into
//! place, so a failed write never leaves a truncated export behind.

use crate::error::{Error, Result};
use crate::merger::MergedDataset;
use crate::parser::{
    COUNT_ATTRIBUTE, ENTRIES_ELEMENT, ENTRY_ELEMENT, KEY_ATTRIBUTE, MAPPING_ELEMENT, ROOT_ELEMENT,
    VERSION_ELEMENT,
};
use crate::record::Record;
use quick_xml::escape::escape;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Write a merged dataset to `output` in the export schema
pub fn write_export<P: AsRef<Path>>(dataset: &MergedDataset, output: P) -> Result<()> {
    let output = output.as_ref();
    write_document(&dataset.version, &dataset.mapping, &dataset.records, output)?;

    info!(
        path = %output.display(),
        entries = dataset.records.len(),
        "wrote merged export"
    );
    Ok(())
}

fn write_document(version: &str, mapping: &str, records: &[Record], output: &Path) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(Error::OutputDirMissing(dir.to_path_buf()));
    }

    let write_err = |source: std::io::Error| Error::Write {
        path: output.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        render(&mut writer, version, mapping, records).map_err(write_err)?;
        writer.flush().map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(output).map_err(|e| write_err(e.error))?;

    Ok(())
}

fn render<W: Write>(w: &mut W, version: &str, mapping: &str, records: &[Record]) -> std::io::Result<()> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, "<{ROOT_ELEMENT}>")?;
    writeln!(w, "  <{VERSION_ELEMENT}>{}</{VERSION_ELEMENT}>", escape(version))?;
    writeln!(w, "  <{MAPPING_ELEMENT}>{}</{MAPPING_ELEMENT}>", escape(mapping))?;
    writeln!(w, "  <{ENTRIES_ELEMENT}>")?;

    for record in records {
        write!(
            w,
            r#"    <{ENTRY_ELEMENT} {KEY_ATTRIBUTE}="{}" {COUNT_ATTRIBUTE}="{}""#,
            escape(record.key.as_str()),
            record.play_count
        )?;
        for (name, value) in &record.attributes {
            write!(w, r#" {}="{}""#, name, escape(value.as_str()))?;
        }
        writeln!(w, "/>")?;
    }

    writeln!(w, "  </{ENTRIES_ELEMENT}>")?;
    writeln!(w, "</{ROOT_ELEMENT}>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::{merge_datasets, MergePolicy};
    use crate::parser::{parse_export, parse_export_str};
    use tempfile::TempDir;

    fn merged_sample() -> MergedDataset {
        let a = parse_export_str(
            r#"<PlaybackStatistics><Version>3.0</Version><Mapping>%artist% &amp; %title%</Mapping>
               <Entry ID="a" Count="3" Rating="4"/><Entry ID="b&lt;2" Count="5"/></PlaybackStatistics>"#,
            "a.xml",
        )
        .unwrap();
        let b = parse_export_str(
            r#"<PlaybackStatistics><Version>3.0</Version><Mapping>m</Mapping>
               <Entry ID="a" Count="2"/><Entry ID="c" Count="7"/></PlaybackStatistics>"#,
            "b.xml",
        )
        .unwrap();
        merge_datasets(&[a, b], MergePolicy::Sum).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("merged.xml");
        let merged = merged_sample();

        write_export(&merged, &out).unwrap();
        let reread = parse_export(&out).unwrap();

        assert_eq!(reread.version, merged.version);
        assert_eq!(reread.mapping, "%artist% & %title%");
        assert_eq!(reread.records, merged.records);
        assert_eq!(reread.entry_count(), merged.entry_count());
        assert_eq!(reread.total_plays(), merged.total_plays());
        assert!((reread.average() - merged.average()).abs() < 1e-9);
        assert!((reread.deviation() - merged.deviation()).abs() < 1e-9);
        assert_eq!(reread.find_record("a").unwrap().attribute("Rating"), Some("4"));
        assert_eq!(reread.find_record("b<2").unwrap().play_count, 5);
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("merged.xml");
        std::fs::write(&out, "stale contents").unwrap();

        write_export(&merged_sample(), &out).unwrap();

        let reread = parse_export(&out).unwrap();
        assert_eq!(reread.entry_count(), 3);
    }

    #[test]
    fn test_missing_directory_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let out = missing.join("merged.xml");

        let err = write_export(&merged_sample(), &out).unwrap_err();

        assert!(matches!(err, Error::OutputDirMissing(ref p) if p == &missing));
        assert!(!out.exists());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("merged.xml");

        write_export(&merged_sample(), &out).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
