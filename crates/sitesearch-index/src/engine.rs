//! Document index: stored documents plus per-field postings.
//!
//! Indexing is synchronous and in-memory. A query is split into words; a
//! document matches a field when every query word is a substring of some word
//! in that field. Matches from several fields are merged per document.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

use sitesearch_types::Document;
use tracing::debug;

use crate::analyzer::{Analyzer, DEFAULT_MAX_TERM_CHARS};
use crate::error::IndexError;
use crate::postings::FieldPostings;
use crate::schema::Field;
use crate::search::{merge_matches, SearchHit, SearchOptions};
use crate::segments::IndexHeader;

/// Default number of documents per exported store segment.
pub const DEFAULT_STORE_CHUNK_SIZE: usize = 256;

/// Index tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Documents per `store.{n}` segment
    pub store_chunk_size: usize,
    /// Longest substring, in characters, kept as a posting key
    pub max_term_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            store_chunk_size: DEFAULT_STORE_CHUNK_SIZE,
            max_term_chars: DEFAULT_MAX_TERM_CHARS,
        }
    }
}

impl IndexConfig {
    pub fn with_store_chunk_size(mut self, size: usize) -> Self {
        self.store_chunk_size = size.max(1);
        self
    }
}

/// Summary counts for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    /// Distinct posting keys per field
    pub terms: BTreeMap<Field, usize>,
}

/// In-memory full-text index over [`Document`]s keyed by id.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    pub(crate) config: IndexConfig,
    pub(crate) analyzer: Analyzer,
    pub(crate) documents: HashMap<String, Document>,
    pub(crate) postings: BTreeMap<Field, FieldPostings>,
    /// Header read from an imported `cfg` segment, if any.
    pub(crate) imported_header: Option<IndexHeader>,
}

impl Default for DocumentIndex {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl DocumentIndex {
    pub fn new(config: IndexConfig) -> Self {
        let postings = Field::ALL
            .iter()
            .map(|field| (*field, FieldPostings::new()))
            .collect();
        Self {
            config,
            analyzer: Analyzer::new(config.max_term_chars),
            documents: HashMap::new(),
            postings,
            imported_header: None,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Add a document, replacing any document with the same id.
    pub fn add(&mut self, doc: Document) {
        if let Some(old) = self.documents.remove(&doc.id) {
            for (field, postings) in self.postings.iter_mut() {
                let terms = self.analyzer.index_terms(field.value(&old));
                postings.remove_document(&old.id, terms.keys());
            }
        }

        for (field, postings) in self.postings.iter_mut() {
            let terms = self.analyzer.index_terms(field.value(&doc));
            postings.insert_document(&doc.id, &terms);
        }

        self.documents.insert(doc.id.clone(), doc);
    }

    /// Add many documents. Returns the number of documents now indexed.
    pub fn add_all(&mut self, docs: impl IntoIterator<Item = Document>) -> usize {
        for doc in docs {
            self.add(doc);
        }
        self.documents.len()
    }

    /// Search the index.
    ///
    /// A query with no words yields no results rather than every document.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let mut seen = HashSet::new();
        let words: Vec<String> = self
            .analyzer
            .words(query)
            .into_iter()
            .filter(|w| seen.insert(w.clone()))
            .collect();

        if words.is_empty() || self.documents.is_empty() || options.limit == 0 {
            return Vec::new();
        }

        let per_field = options
            .resolved_fields()
            .into_iter()
            .map(|field| (field, self.search_field(field, &words)))
            .collect();

        let hits: Vec<SearchHit> = merge_matches(per_field)
            .into_iter()
            .filter_map(|m| {
                self.documents.get(&m.doc_id).map(|doc| SearchHit {
                    document: doc.clone(),
                    score: m.score,
                    fields: m.fields,
                })
            })
            .take(options.limit)
            .collect();

        debug!(query, results = hits.len(), "Search complete");
        hits
    }

    /// Score documents where every word occurs in `field`.
    fn search_field(&self, field: Field, words: &[String]) -> Vec<(String, f32)> {
        let Some(postings) = self.postings.get(&field) else {
            return Vec::new();
        };

        let mut lists: Vec<Cow<'_, HashMap<String, u32>>> = Vec::with_capacity(words.len());
        for word in words {
            let docs = if self.analyzer.exceeds_term_len(word) {
                self.long_word_postings(field, postings, word)
            } else {
                postings.get(word).map(Cow::Borrowed)
            };
            match docs {
                Some(docs) if !docs.is_empty() => lists.push(docs),
                _ => return Vec::new(),
            }
        }
        lists.sort_by_key(|docs| docs.len());

        let n = self.documents.len() as f32;
        let (first, rest) = match lists.split_first() {
            Some(split) => split,
            None => return Vec::new(),
        };

        first
            .keys()
            .filter(|id| self.documents.contains_key(*id))
            .filter(|id| rest.iter().all(|docs| docs.contains_key(*id)))
            .map(|id| {
                let score: f32 = lists
                    .iter()
                    .map(|docs| {
                        let tf = docs.get(id).copied().unwrap_or(0).max(1) as f32;
                        let idf = (1.0 + n / docs.len() as f32).ln();
                        (1.0 + tf.ln()) * idf
                    })
                    .sum();
                (id.clone(), score * field.weight())
            })
            .collect()
    }

    /// Postings for a word longer than any stored key: candidates come from
    /// its leading key and are confirmed against the stored field text.
    fn long_word_postings<'a>(
        &self,
        field: Field,
        postings: &'a FieldPostings,
        word: &str,
    ) -> Option<Cow<'a, HashMap<String, u32>>> {
        let candidates = postings.get(self.analyzer.candidate_term(word))?;
        let confirmed: HashMap<String, u32> = candidates
            .keys()
            .filter_map(|id| {
                let doc = self.documents.get(id)?;
                let tf = self.analyzer.occurrences(field.value(doc), word);
                (tf > 0).then(|| (id.clone(), tf))
            })
            .collect();
        Some(Cow::Owned(confirmed))
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Stored documents sorted by id.
    pub fn documents(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.documents.values().collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.documents.len(),
            terms: self
                .postings
                .iter()
                .map(|(field, postings)| (*field, postings.term_count()))
                .collect(),
        }
    }

    /// Check that the index is internally consistent.
    ///
    /// Every posting must reference a stored document, and after an import the
    /// stored document count must match the imported header.
    pub fn verify(&self) -> Result<(), IndexError> {
        for (field, postings) in &self.postings {
            if let Some(id) = postings.doc_ids().find(|id| !self.documents.contains_key(*id)) {
                return Err(IndexError::Integrity(format!(
                    "{} postings reference unknown document {}",
                    field, id
                )));
            }
        }

        if let Some(header) = &self.imported_header {
            if header.document_count != self.documents.len() {
                return Err(IndexError::Integrity(format!(
                    "expected {} documents, found {}",
                    header.document_count,
                    self.documents.len()
                )));
            }
        }

        Ok(())
    }
}
