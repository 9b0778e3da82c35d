//! Query options, results and multi-field result merging.

use std::cmp::Ordering;
use std::collections::HashMap;

use sitesearch_types::Document;

use crate::schema::Field;

/// Default maximum number of results.
pub const DEFAULT_LIMIT: usize = 100;

/// A search result with relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The stored document
    pub document: Document,
    /// Combined score across all matching fields
    pub score: f32,
    /// Fields in which the query matched
    pub fields: Vec<Field>,
}

/// Search options for field selection and limiting results.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Fields to search (empty = all indexed fields)
    pub fields: Vec<Field>,
    /// Maximum results to return
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        for field in fields {
            self = self.with_field(field);
        }
        self
    }

    /// Fields actually searched, in a stable order.
    pub fn resolved_fields(&self) -> Vec<Field> {
        if self.fields.is_empty() {
            return Field::ALL.to_vec();
        }
        let mut fields = self.fields.clone();
        fields.sort();
        fields.dedup();
        fields
    }
}

/// A document's merged score before hydration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MergedMatch {
    pub doc_id: String,
    pub score: f32,
    pub fields: Vec<Field>,
}

/// Merge per-field matches into one entry per document.
///
/// Scores of the same document across fields are summed; the result is ordered
/// by score descending with ties broken by document id.
pub(crate) fn merge_matches(per_field: Vec<(Field, Vec<(String, f32)>)>) -> Vec<MergedMatch> {
    let mut merged: HashMap<String, MergedMatch> = HashMap::new();

    for (field, matches) in per_field {
        for (doc_id, score) in matches {
            let entry = merged
                .entry(doc_id.clone())
                .or_insert_with(|| MergedMatch {
                    doc_id,
                    score: 0.0,
                    fields: Vec::new(),
                });
            entry.score += score;
            if !entry.fields.contains(&field) {
                entry.fields.push(field);
            }
        }
    }

    let mut results: Vec<MergedMatch> = merged.into_values().collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    results
}
