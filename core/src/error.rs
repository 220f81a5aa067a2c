//! Error type shared by the tokenizer, lexicon builder, codec and record loader.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::DocId;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Document text was not valid UTF-8, so it could not be tokenized.
    #[error("cannot tokenize {path}: {message}")]
    Tokenize { path: PathBuf, message: String },

    /// The lexicon dump does not follow the line grammar. `line` is 1-based.
    #[error("malformed lexicon dump at line {line}: {message}")]
    DecodeFormat { line: usize, message: String },

    #[error("document {doc_id} has no record file at {path}")]
    MissingDocument { doc_id: DocId, path: PathBuf },

    #[error("malformed record {path}: {message}")]
    Record { path: PathBuf, message: String },

    #[error("meta file error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IndexError {
    pub(crate) fn decode(line: usize, message: impl Into<String>) -> Self {
        IndexError::DecodeFormat { line, message: message.into() }
    }
}
