use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::records::DocumentSource;
use crate::tokenizer::tokenize;

pub type TermId = u32;
pub type DocId = u32;

/// Positions of one token inside one document, in increasing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Vec<u32>,
}

/// A token together with every document it occurs in.
///
/// Postings keep their insertion order so the dump is stable; `docs` maps a
/// document id to its slot in `postings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    token: String,
    postings: Vec<Posting>,
    docs: HashMap<DocId, usize>,
}

impl LexiconEntry {
    pub(crate) fn new(token: String) -> Self {
        Self { token, postings: Vec::new(), docs: HashMap::new() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn posting(&self, doc_id: DocId) -> Option<&Posting> {
        self.docs.get(&doc_id).map(|&slot| &self.postings[slot])
    }

    /// Attach a complete posting. Returns false if the document already has one.
    pub(crate) fn attach(&mut self, posting: Posting) -> bool {
        if self.docs.contains_key(&posting.doc_id) {
            return false;
        }
        self.docs.insert(posting.doc_id, self.postings.len());
        self.postings.push(posting);
        true
    }

    fn add_position(&mut self, doc_id: DocId, pos: u32) {
        match self.docs.get(&doc_id) {
            Some(&slot) => {
                let positions = &mut self.postings[slot].positions;
                debug_assert!(positions.last().map_or(true, |&last| pos > last), "positions must increase");
                positions.push(pos);
            }
            None => {
                self.attach(Posting { doc_id, positions: vec![pos] });
            }
        }
    }
}

/// A lexicon entry restricted to a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TermMatch<'a> {
    pub token: &'a str,
    pub posting: &'a Posting,
}

/// In-memory inverted index: token -> documents -> positions.
///
/// Entries are stored in creation order and addressed through `dictionary`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Lexicon {
    dictionary: HashMap<String, TermId>,
    entries: Vec<LexiconEntry>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `(doc_id, text)` pairs in the order given.
    pub fn build<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (DocId, S)>,
        S: AsRef<str>,
    {
        let mut lexicon = Self::new();
        let mut num_docs = 0usize;
        for (doc_id, text) in documents {
            lexicon.index_document(doc_id, text.as_ref());
            num_docs += 1;
        }
        tracing::info!(num_docs, num_terms = lexicon.len(), "built lexicon");
        lexicon
    }

    /// Index every document of `source`, reading texts in id order.
    ///
    /// The first read error aborts the build and nothing is returned.
    pub fn build_from_source<D: DocumentSource + ?Sized>(source: &D) -> Result<Self> {
        let mut lexicon = Self::new();
        for doc_id in 0..source.len() as DocId {
            let text = source.text(doc_id).inspect_err(|e| {
                tracing::warn!(doc_id, path = ?source.path(doc_id), error = %e, "aborting build");
            })?;
            lexicon.index_document(doc_id, &text);
        }
        tracing::info!(num_docs = source.len(), num_terms = lexicon.len(), "built lexicon");
        Ok(lexicon)
    }

    fn index_document(&mut self, doc_id: DocId, text: &str) {
        for (token, pos) in tokenize(text) {
            self.insert(token, doc_id, pos as u32);
        }
    }

    /// Record that `token` occurs in `doc_id` at `pos`.
    ///
    /// Positions for a document must arrive in increasing order.
    pub(crate) fn insert(&mut self, token: String, doc_id: DocId, pos: u32) {
        let tid = match self.dictionary.get(&token) {
            Some(&tid) => tid,
            None => self.push_entry(LexiconEntry::new(token)),
        };
        self.entries[tid as usize].add_position(doc_id, pos);
    }

    /// Append a fresh entry. Returns None if the token is already present.
    pub(crate) fn add_entry(&mut self, entry: LexiconEntry) -> Option<TermId> {
        if self.dictionary.contains_key(&entry.token) {
            return None;
        }
        Some(self.push_entry(entry))
    }

    fn push_entry(&mut self, entry: LexiconEntry) -> TermId {
        let tid = self.entries.len() as TermId;
        self.dictionary.insert(entry.token.clone(), tid);
        self.entries.push(entry);
        tid
    }

    pub fn get(&self, token: &str) -> Option<&LexiconEntry> {
        self.dictionary.get(token).map(|&tid| &self.entries[tid as usize])
    }

    /// Look up `token` in one document. Unknown tokens and documents outside
    /// the corpus both yield None.
    pub fn find(&self, doc_id: DocId, token: &str) -> Option<TermMatch<'_>> {
        let entry = self.get(token)?;
        let posting = entry.posting(doc_id)?;
        Some(TermMatch { token: entry.token(), posting })
    }

    /// Entries in creation order.
    pub fn entries(&self) -> impl Iterator<Item = &LexiconEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
