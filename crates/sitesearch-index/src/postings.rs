//! Per-field postings: term -> (document id -> term frequency).

use std::collections::{BTreeMap, HashMap};

/// Postings for one field.
#[derive(Debug, Clone, Default)]
pub struct FieldPostings {
    terms: HashMap<String, HashMap<String, u32>>,
}

impl FieldPostings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `doc_id` under each term with its frequency.
    pub fn insert_document(&mut self, doc_id: &str, terms: &HashMap<String, u32>) {
        for (term, tf) in terms {
            self.terms
                .entry(term.clone())
                .or_default()
                .insert(doc_id.to_string(), *tf);
        }
    }

    /// Remove `doc_id` from the given terms, dropping emptied posting lists.
    pub fn remove_document<'a>(&mut self, doc_id: &str, terms: impl IntoIterator<Item = &'a String>) {
        for term in terms {
            if let Some(docs) = self.terms.get_mut(term) {
                docs.remove(doc_id);
                if docs.is_empty() {
                    self.terms.remove(term);
                }
            }
        }
    }

    /// Posting list for a term.
    pub fn get(&self, term: &str) -> Option<&HashMap<String, u32>> {
        self.terms.get(term)
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Every document id referenced by any posting list.
    pub fn doc_ids(&self) -> impl Iterator<Item = &String> {
        self.terms.values().flat_map(|docs| docs.keys())
    }

    /// Sorted copy for stable serialization.
    pub fn to_sorted(&self) -> BTreeMap<&str, BTreeMap<&str, u32>> {
        self.terms
            .iter()
            .map(|(term, docs)| {
                let docs = docs.iter().map(|(id, tf)| (id.as_str(), *tf)).collect();
                (term.as_str(), docs)
            })
            .collect()
    }

    /// Merge imported postings. Frequencies are assigned, not summed, so
    /// merging the same payload twice leaves the postings unchanged.
    pub fn merge(&mut self, imported: HashMap<String, HashMap<String, u32>>) {
        for (term, docs) in imported {
            let entry = self.terms.entry(term).or_default();
            for (doc_id, tf) in docs {
                entry.insert(doc_id, tf);
            }
        }
    }
}
