//! Positional inverted index over a small text corpus, with a line-oriented
//! dump format and binary vector-space ranking.

pub mod error;
pub mod index;
pub mod persist;
pub mod records;
pub mod search;
pub mod tokenizer;

pub use error::{IndexError, Result};
pub use index::{DocId, Lexicon, LexiconEntry, Posting, TermId, TermMatch};
pub use records::{DocumentSource, Record, RecordSource};
pub use search::{search, QueryVector, ScoredResult};
