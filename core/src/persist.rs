//! Line-oriented lexicon dump plus the `meta.json` sidecar.
//!
//! Each entry is written as its token, then two lines per posting (document
//! id, then positions each followed by a space), then one blank line:
//!
//! ```text
//! cat
//! 0
//! 1 4
//! 2
//! 0
//!
//! ```

use crate::error::{IndexError, Result};
use crate::{DocId, Lexicon, LexiconEntry, Posting};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    /// Corpus folder holding the `.property` records, if known.
    #[serde(default)]
    pub docs_dir: Option<PathBuf>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn lexicon(&self) -> PathBuf { self.root.join("lexicon.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write `lexicon` in dump format. Entries and postings keep their insertion order.
pub fn encode<W: Write>(lexicon: &Lexicon, out: &mut W) -> Result<()> {
    for entry in lexicon.entries() {
        writeln!(out, "{}", entry.token())?;
        for posting in entry.postings() {
            writeln!(out, "{}", posting.doc_id)?;
            for pos in &posting.positions {
                write!(out, "{pos} ")?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn encode_to_string(lexicon: &Lexicon) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = encode(lexicon, &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

enum State {
    Token,
    PostingId(LexiconEntry),
    Positions(LexiconEntry, DocId),
}

/// Parse a dump back into a lexicon.
///
/// Any malformed line aborts the whole decode. A missing blank line after the
/// last entry is accepted; a stream that stops right after a document id is not.
pub fn decode<R: BufRead>(input: R) -> Result<Lexicon> {
    let mut lexicon = Lexicon::new();
    let mut state = State::Token;
    // Set once a blank line is seen between entries; only more blank lines may follow.
    let mut trailing_blank = false;
    let mut line_no = 0;

    for line in input.lines() {
        line_no += 1;
        let line = line.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => IndexError::decode(line_no, format!("line is not valid UTF-8: {e}")),
            _ => IndexError::Io(e),
        })?;
        let x = line.trim();
        state = match state {
            State::Token => {
                if x.is_empty() {
                    trailing_blank = true;
                    State::Token
                } else if trailing_blank {
                    return Err(IndexError::decode(line_no, "blank line before token"));
                } else {
                    State::PostingId(LexiconEntry::new(x.to_string()))
                }
            }
            State::PostingId(entry) => {
                if x.is_empty() {
                    close_entry(&mut lexicon, entry, line_no)?;
                    State::Token
                } else {
                    let doc_id = x
                        .parse::<DocId>()
                        .map_err(|e| IndexError::decode(line_no, format!("invalid document id {x:?}: {e}")))?;
                    State::Positions(entry, doc_id)
                }
            }
            State::Positions(mut entry, doc_id) => {
                let positions = parse_positions(x, line_no)?;
                if !entry.attach(Posting { doc_id, positions }) {
                    return Err(IndexError::decode(line_no, format!("document {doc_id} listed twice for {:?}", entry.token())));
                }
                State::PostingId(entry)
            }
        };
    }

    match state {
        State::Token => {}
        State::PostingId(entry) => close_entry(&mut lexicon, entry, line_no)?,
        State::Positions(entry, doc_id) => {
            return Err(IndexError::decode(
                line_no,
                format!("stream ended before positions of document {doc_id} for {:?}", entry.token()),
            ));
        }
    }
    tracing::info!(num_terms = lexicon.len(), "decoded lexicon");
    Ok(lexicon)
}

pub fn decode_str(text: &str) -> Result<Lexicon> {
    decode(text.as_bytes())
}

fn close_entry(lexicon: &mut Lexicon, entry: LexiconEntry, line_no: usize) -> Result<()> {
    let token = entry.token().to_string();
    lexicon
        .add_entry(entry)
        .map(|_| ())
        .ok_or_else(|| IndexError::decode(line_no, format!("duplicate token {token:?}")))
}

fn parse_positions(line: &str, line_no: usize) -> Result<Vec<u32>> {
    line.split(' ')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .map_err(|e| IndexError::decode(line_no, format!("invalid position {s:?}: {e}")))
        })
        .collect()
}

pub fn save_lexicon(paths: &IndexPaths, lexicon: &Lexicon) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_lexicon_file(&paths.lexicon(), lexicon)
}

pub fn save_lexicon_file(path: &Path, lexicon: &Lexicon) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    encode(lexicon, &mut f)?;
    f.flush()?;
    tracing::debug!(path = %path.display(), num_terms = lexicon.len(), "wrote lexicon");
    Ok(())
}

pub fn load_lexicon(paths: &IndexPaths) -> Result<Lexicon> {
    load_lexicon_file(&paths.lexicon())
}

pub fn load_lexicon_file(path: &Path) -> Result<Lexicon> {
    let f = File::open(path)?;
    tracing::debug!(path = %path.display(), "reading lexicon");
    decode(BufReader::new(f))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Like `load_meta`, but a missing meta file is `None` rather than an error.
pub fn load_meta_if_present(paths: &IndexPaths) -> Result<Option<MetaFile>> {
    match load_meta(paths) {
        Ok(meta) => Ok(Some(meta)),
        Err(IndexError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Load the lexicon and its meta file together.
pub fn load_index(paths: &IndexPaths) -> Result<(Lexicon, MetaFile)> {
    let meta = load_meta(paths)?;
    let lexicon = load_lexicon(paths)?;
    Ok((lexicon, meta))
}
