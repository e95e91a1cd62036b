//! XML parser for playback statistics export files

use crate::error::{Error, Result};
use crate::record::{FileDataset, Record};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(crate) const ROOT_ELEMENT: &str = "PlaybackStatistics";
pub(crate) const VERSION_ELEMENT: &str = "Version";
pub(crate) const MAPPING_ELEMENT: &str = "Mapping";
pub(crate) const ENTRIES_ELEMENT: &str = "Entries";
pub(crate) const ENTRY_ELEMENT: &str = "Entry";
pub(crate) const KEY_ATTRIBUTE: &str = "ID";
pub(crate) const COUNT_ATTRIBUTE: &str = "Count";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Metadata {
    Version,
    Mapping,
}

impl Metadata {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            n if n == VERSION_ELEMENT.as_bytes() => Some(Metadata::Version),
            n if n == MAPPING_ELEMENT.as_bytes() => Some(Metadata::Mapping),
            _ => None,
        }
    }
}

/// Parse an export file into a dataset
pub fn parse_export<P: AsRef<Path>>(path: P) -> Result<FileDataset> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let dataset = parse_document(&content, path)?;
    debug!(
        path = %path.display(),
        entries = dataset.entry_count(),
        total_plays = dataset.total_plays(),
        "parsed export file"
    );
    Ok(dataset)
}

/// Parse export XML from a string (useful for testing)
pub fn parse_export_str(content: &str, source_name: &str) -> Result<FileDataset> {
    parse_document(content, Path::new(source_name))
}

fn parse_document(content: &str, path: &Path) -> Result<FileDataset> {
    // Text is not trimmed: the mapping descriptor passes through as written
    let mut reader = Reader::from_str(content);

    let mut version: Option<String> = None;
    let mut mapping: Option<String> = None;
    let mut records: Vec<Record> = Vec::new();
    let mut seen_keys: HashSet<String> = HashSet::new();

    // Metadata element whose text is being collected
    let mut capture: Option<Metadata> = None;
    let mut text = String::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(path, e))?;

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    seen_root = true;
                    read_root_attributes(&e, path, &mut version, &mut mapping)?;
                } else if let Some(field) = Metadata::from_name(e.name().as_ref()) {
                    capture = Some(field);
                    text.clear();
                } else if e.name().as_ref() == ENTRY_ELEMENT.as_bytes() {
                    let record = read_entry(&e, path, records.len())?;
                    push_record(record, path, &mut records, &mut seen_keys)?;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    seen_root = true;
                    read_root_attributes(&e, path, &mut version, &mut mapping)?;
                } else if let Some(field) = Metadata::from_name(e.name().as_ref()) {
                    match field {
                        Metadata::Version => version = Some(String::new()),
                        Metadata::Mapping => mapping = Some(String::new()),
                    }
                } else if e.name().as_ref() == ENTRY_ELEMENT.as_bytes() {
                    let record = read_entry(&e, path, records.len())?;
                    push_record(record, path, &mut records, &mut seen_keys)?;
                }
            }
            Event::Text(t) if capture.is_some() => {
                let value = t.unescape().map_err(|e| xml_error(path, e))?;
                text.push_str(&value);
            }
            Event::CData(c) if capture.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if let Some(field) = capture {
                    if Metadata::from_name(e.name().as_ref()) == Some(field) {
                        match field {
                            Metadata::Version => version = Some(text.trim().to_string()),
                            Metadata::Mapping => mapping = Some(text.clone()),
                        }
                        capture = None;
                    }
                }
            }
            Event::Eof => {
                if !seen_root {
                    return Err(structure_error(path, "no root element"));
                }
                if depth != 0 {
                    return Err(structure_error(
                        path,
                        format!("document ends with {} unclosed element(s)", depth),
                    ));
                }
                break;
            }
            _ => {}
        }
    }

    let version = version.ok_or_else(|| Error::MissingMetadata {
        path: path.to_path_buf(),
        field: VERSION_ELEMENT,
    })?;
    let mapping = mapping.ok_or_else(|| Error::MissingMetadata {
        path: path.to_path_buf(),
        field: MAPPING_ELEMENT,
    })?;

    FileDataset::new(
        path.to_path_buf(),
        content.len() as u64,
        version,
        mapping,
        records,
    )
}

/// Version and Mapping may also be given as attributes of the root element
fn read_root_attributes(
    root: &BytesStart<'_>,
    path: &Path,
    version: &mut Option<String>,
    mapping: &mut Option<String>,
) -> Result<()> {
    for attr in root.attributes() {
        let attr = attr.map_err(|e| xml_error(path, e.into()))?;
        let Some(field) = Metadata::from_name(attr.key.as_ref()) else {
            continue;
        };
        let value = attr.unescape_value().map_err(|e| xml_error(path, e))?;
        match field {
            Metadata::Version => *version = Some(value.trim().to_string()),
            Metadata::Mapping => *mapping = Some(value.into_owned()),
        }
    }
    Ok(())
}

fn read_entry(entry: &BytesStart<'_>, path: &Path, index: usize) -> Result<Record> {
    let mut key: Option<String> = None;
    let mut count: Option<String> = None;
    let mut attributes = Vec::new();

    for attr in entry.attributes() {
        let attr = attr.map_err(|e| xml_error(path, e.into()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| xml_error(path, e))?
            .into_owned();

        match attr.key.as_ref() {
            k if k == KEY_ATTRIBUTE.as_bytes() => key = Some(value),
            k if k == COUNT_ATTRIBUTE.as_bytes() => count = Some(value),
            k => attributes.push((String::from_utf8_lossy(k).into_owned(), value)),
        }
    }

    let key = key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::MissingAttribute {
            path: path.to_path_buf(),
            index,
            attribute: KEY_ATTRIBUTE,
        })?;

    let count = count.ok_or_else(|| Error::MissingAttribute {
        path: path.to_path_buf(),
        index,
        attribute: COUNT_ATTRIBUTE,
    })?;

    let play_count = count
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::InvalidPlayCount {
            path: path.to_path_buf(),
            key: key.clone(),
            value: count.clone(),
        })?;

    Ok(Record {
        key,
        play_count,
        attributes,
    })
}

fn push_record(
    record: Record,
    path: &Path,
    records: &mut Vec<Record>,
    seen_keys: &mut HashSet<String>,
) -> Result<()> {
    if !seen_keys.insert(record.key.clone()) {
        return Err(Error::DuplicateKey {
            path: path.to_path_buf(),
            key: record.key,
        });
    }
    records.push(record);
    Ok(())
}

fn structure_error(path: &Path, message: impl Into<String>) -> Error {
    Error::Structure {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn xml_error(path: &Path, source: quick_xml::Error) -> Error {
    Error::Xml {
        path: PathBuf::from(path),
        source,
    }
}
