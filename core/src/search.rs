//! Binary vector-space ranking.
//!
//! For every document a query vector holds one 0/1 slot per keyword, set when
//! the keyword occurs in that document. The score is the cosine between this
//! vector and the all-ones query vector.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::tokenizer::split_query;
use crate::{DocId, Lexicon, TermMatch};

/// One slot per query keyword, duplicates included.
pub type QueryVector = Vec<u8>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult<'a> {
    pub doc_id: DocId,
    /// In `(0, 1]`.
    pub score: f64,
    pub vector: QueryVector,
    /// The keywords found in this document, each restricted to it.
    pub matches: Vec<TermMatch<'a>>,
}

impl fmt::Display for ScoredResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fileID: {}    correlation: {:?}    vector: {:?}", self.doc_id, self.score, self.vector)?;
        writeln!(f)?;
        writeln!(f, "keywords location:")?;
        for m in &self.matches {
            writeln!(f, "{}: {:?}", m.token, m.posting.positions)?;
        }
        Ok(())
    }
}

/// Rank documents `0..num_docs` against `query`, best first.
///
/// Documents matching no keyword are left out. Equal scores keep ascending
/// document id order.
pub fn search<'a>(query: &str, lexicon: &'a Lexicon, num_docs: u32) -> Vec<ScoredResult<'a>> {
    let keywords = split_query(query);
    let mut results = Vec::new();
    for doc_id in 0..num_docs {
        let mut vector: QueryVector = vec![0; keywords.len()];
        let mut matches = Vec::new();
        for (slot, keyword) in vector.iter_mut().zip(&keywords) {
            if let Some(m) = lexicon.find(doc_id, keyword) {
                *slot = 1;
                matches.push(m);
            }
        }
        let score = cosine(&vector);
        if !score.is_nan() && score != 0.0 {
            results.push(ScoredResult { doc_id, score, vector, matches });
        }
    }
    // sort_by is stable, which keeps ties in evaluation order.
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    tracing::debug!(query, hits = results.len(), "search complete");
    results
}

/// `matched / sqrt(present * len)`. The two sums are kept separate; for a
/// 0/1 vector they agree. An empty vector yields NaN.
pub fn cosine(d: &[u8]) -> f64 {
    let mut matched: u64 = 0;
    let mut present: u64 = 0;
    for &slot in d {
        matched += u64::from(slot);
        if slot != 0 {
            present += 1;
        }
    }
    matched as f64 / ((present * d.len() as u64) as f64).sqrt()
}
