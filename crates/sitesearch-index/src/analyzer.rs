//! Text analysis shared by indexing and querying.
//!
//! Text is split on non-alphanumeric characters and lowercased. Indexing
//! additionally expands every word into its substrings of up to
//! `max_term_chars` characters, so a query word matches any word containing
//! it. Longer query words are resolved against the stored text.

use std::collections::HashMap;

use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};

/// Longest substring, in characters, stored as a posting key.
pub const DEFAULT_MAX_TERM_CHARS: usize = 24;

/// Tokenization policy for documents and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Analyzer {
    max_term_chars: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TERM_CHARS)
    }
}

impl Analyzer {
    pub fn new(max_term_chars: usize) -> Self {
        Self {
            max_term_chars: max_term_chars.max(1),
        }
    }

    pub fn max_term_chars(&self) -> usize {
        self.max_term_chars
    }

    fn text_analyzer(&self) -> TextAnalyzer {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .build()
    }

    /// Whole lowercased words, in order of appearance.
    pub fn words(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.text_analyzer();
        let mut stream = analyzer.token_stream(text);
        let mut words = Vec::new();
        while stream.advance() {
            words.push(stream.token().text.clone());
        }
        words
    }

    /// Posting keys for indexing: every substring of every word up to
    /// `max_term_chars` characters, with the number of times it occurs.
    pub fn index_terms(&self, text: &str) -> HashMap<String, u32> {
        let mut terms: HashMap<String, u32> = HashMap::new();
        for word in self.words(text) {
            let bounds: Vec<usize> = word
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(word.len()))
                .collect();
            for (a, &start) in bounds.iter().enumerate() {
                let last = (a + self.max_term_chars).min(bounds.len() - 1);
                for &end in &bounds[a + 1..=last] {
                    *terms.entry(word[start..end].to_string()).or_insert(0) += 1;
                }
            }
        }
        terms
    }

    /// Whether `word` is longer than any posting key.
    pub fn exceeds_term_len(&self, word: &str) -> bool {
        word.chars().count() > self.max_term_chars
    }

    /// The posting key used to find candidates for a long query word.
    pub fn candidate_term<'a>(&self, word: &'a str) -> &'a str {
        match word.char_indices().nth(self.max_term_chars) {
            Some((end, _)) => &word[..end],
            None => word,
        }
    }

    /// How many words of `text` contain `word`.
    pub fn occurrences(&self, text: &str, word: &str) -> u32 {
        self.words(text).iter().filter(|w| w.contains(word)).count() as u32
    }
}
