//! Per-document metadata and the text source the lexicon is built from.
//!
//! A corpus folder holds one `{doc_id}.property` file per document. Each has
//! four lines: title, URL, date and the path of the content file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{IndexError, Result};
use crate::DocId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub url: String,
    pub date: String,
    pub file_path: PathBuf,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Title: {}    URL: {}    Date: {}", self.title, self.url, self.date)
    }
}

/// Supplies raw text for documents `0..len()`.
pub trait DocumentSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Location of the document, for diagnostics only.
    fn path(&self, doc_id: DocId) -> Option<&Path>;

    fn text(&self, doc_id: DocId) -> Result<String>;
}

/// Reads each document's content from the file named in its record.
pub struct RecordSource<'a> {
    records: &'a [Record],
}

impl<'a> RecordSource<'a> {
    pub fn new(records: &'a [Record]) -> Self {
        Self { records }
    }
}

impl DocumentSource for RecordSource<'_> {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn path(&self, doc_id: DocId) -> Option<&Path> {
        self.records.get(doc_id as usize).map(|r| r.file_path.as_path())
    }

    fn text(&self, doc_id: DocId) -> Result<String> {
        let Some(record) = self.records.get(doc_id as usize) else {
            return Err(IndexError::MissingDocument { doc_id, path: PathBuf::new() });
        };
        read_content(&record.file_path)
    }
}

/// Read a content file, reporting invalid UTF-8 as a tokenize error.
pub fn read_content(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::InvalidData => IndexError::Tokenize { path: path.to_path_buf(), message: e.to_string() },
        _ => IndexError::Io(e),
    })
}

pub fn property_path(folder: &Path, doc_id: DocId) -> PathBuf {
    folder.join(format!("{doc_id}.property"))
}

/// Load records `0..count` from `folder`. Fails on the first missing or malformed file.
pub fn load_records(folder: &Path, count: usize) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(count);
    for doc_id in 0..count as DocId {
        records.push(load_record(folder, doc_id)?);
    }
    tracing::debug!(folder = %folder.display(), count, "loaded records");
    Ok(records)
}

fn load_record(folder: &Path, doc_id: DocId) -> Result<Record> {
    let path = property_path(folder, doc_id);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(IndexError::MissingDocument { doc_id, path });
        }
        Err(e) => return Err(e.into()),
    };
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    if lines.len() < 4 {
        return Err(IndexError::Record { path, message: format!("expected 4 lines, found {}", lines.len()) });
    }
    let file_path = PathBuf::from(lines[3]);
    // Relative content paths are taken relative to the corpus folder.
    let file_path = if file_path.is_absolute() { file_path } else { folder.join(file_path) };
    Ok(Record { title: lines[0].to_string(), url: lines[1].to_string(), date: lines[2].to_string(), file_path })
}

/// Number of `.property` files directly inside `folder`.
pub fn count_records(folder: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(folder).max_depth(1) {
        let entry = entry.map_err(|e| IndexError::Io(e.into()))?;
        let p = entry.path();
        if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("property") {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_records_and_reports_missing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("0.content"), "hello world").unwrap();
        fs::write(dir.path().join("0.property"), "Hello\nhttp://a\n2020-01-01\n0.content\n").unwrap();

        let records = load_records(dir.path(), 1).unwrap();
        assert_eq!(records[0].title, "Hello");
        assert_eq!(records[0].file_path, dir.path().join("0.content"));
        assert_eq!(count_records(dir.path()).unwrap(), 1);

        let err = load_records(dir.path(), 2).unwrap_err();
        assert!(matches!(err, IndexError::MissingDocument { doc_id: 1, .. }));
    }

    #[test]
    fn short_record_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("0.property"), "only title\n").unwrap();
        assert!(matches!(load_records(dir.path(), 1), Err(IndexError::Record { .. })));
    }

    #[test]
    fn invalid_utf8_is_a_tokenize_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.content");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(read_content(&path), Err(IndexError::Tokenize { .. })));
    }
}
