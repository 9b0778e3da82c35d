//! Export and import of an index as named segments.
//!
//! Segment keys:
//! - `cfg`: format version, fields and document counts
//! - `store.{n}`: the n-th chunk of stored documents, sorted by id
//! - `{field}.map`: postings for one field
//!
//! Payloads are JSON. Segments may be imported in any order and importing the
//! same segment twice has no further effect. No key starts with `_`, which is
//! left free for the snapshot layer.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use sitesearch_types::Document;
use tracing::debug;

use crate::engine::{DocumentIndex, IndexConfig};
use crate::error::IndexError;
use crate::schema::Field;

/// Version written to and required from the `cfg` segment.
pub const FORMAT_VERSION: u32 = 1;

/// Exported index: segment key -> payload.
pub type Segments = BTreeMap<String, Vec<u8>>;

/// A parsed segment key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentKey {
    Config,
    Store(usize),
    Postings(Field),
}

impl SegmentKey {
    pub fn parse(key: &str) -> Option<Self> {
        if key == "cfg" {
            return Some(SegmentKey::Config);
        }
        if let Some(n) = key.strip_prefix("store.") {
            return n.parse().ok().map(SegmentKey::Store);
        }
        key.strip_suffix(".map")
            .and_then(Field::parse)
            .map(SegmentKey::Postings)
    }

    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKey::Config => f.write_str("cfg"),
            SegmentKey::Store(n) => write!(f, "store.{}", n),
            SegmentKey::Postings(field) => write!(f, "{}.map", field),
        }
    }
}

/// Contents of the `cfg` segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub format_version: u32,
    pub fields: Vec<String>,
    pub document_count: usize,
    pub store_chunks: usize,
}

impl DocumentIndex {
    /// Serialize the index into segments.
    pub fn export_segments(&self) -> Result<Segments, IndexError> {
        let mut segments = Segments::new();
        let docs = self.documents();
        let chunk_size = self.config.store_chunk_size.max(1);
        let chunks: Vec<&[&Document]> = docs.chunks(chunk_size).collect();

        let header = IndexHeader {
            format_version: FORMAT_VERSION,
            fields: Field::ALL.iter().map(|f| f.as_str().to_string()).collect(),
            document_count: docs.len(),
            store_chunks: chunks.len(),
        };
        segments.insert(SegmentKey::Config.as_key(), serde_json::to_vec(&header)?);

        for (n, chunk) in chunks.iter().enumerate() {
            segments.insert(SegmentKey::Store(n).as_key(), serde_json::to_vec(chunk)?);
        }

        for (field, postings) in &self.postings {
            segments.insert(
                SegmentKey::Postings(*field).as_key(),
                serde_json::to_vec(&postings.to_sorted())?,
            );
        }

        debug!(
            segments = segments.len(),
            documents = docs.len(),
            "Exported index segments"
        );
        Ok(segments)
    }

    /// Merge one exported segment into this index.
    pub fn import_segment(&mut self, key: &str, payload: &[u8]) -> Result<SegmentKey, IndexError> {
        let parsed =
            SegmentKey::parse(key).ok_or_else(|| IndexError::UnknownSegment(key.to_string()))?;

        match parsed {
            SegmentKey::Config => {
                let header: IndexHeader = serde_json::from_slice(payload)?;
                if header.format_version != FORMAT_VERSION {
                    return Err(IndexError::IncompatibleSnapshot {
                        expected: FORMAT_VERSION,
                        found: header.format_version,
                    });
                }
                if let Some(unknown) = header.fields.iter().find(|f| Field::parse(f).is_none()) {
                    return Err(IndexError::Integrity(format!(
                        "unknown field in header: {}",
                        unknown
                    )));
                }
                self.imported_header = Some(header);
            }
            SegmentKey::Store(_) => {
                let docs: Vec<Document> = serde_json::from_slice(payload)?;
                for doc in docs {
                    if doc.id.trim().is_empty() {
                        return Err(IndexError::Integrity(format!(
                            "segment {} contains a document without an id",
                            key
                        )));
                    }
                    self.documents.insert(doc.id.clone(), doc);
                }
            }
            SegmentKey::Postings(field) => {
                let imported: HashMap<String, HashMap<String, u32>> =
                    serde_json::from_slice(payload)?;
                self.postings.entry(field).or_default().merge(imported);
            }
        }

        Ok(parsed)
    }

    /// Import every segment in `segments`.
    pub fn import_segments<'a>(
        &mut self,
        segments: impl IntoIterator<Item = (&'a String, &'a Vec<u8>)>,
    ) -> Result<(), IndexError> {
        for (key, payload) in segments {
            self.import_segment(key, payload)?;
        }
        Ok(())
    }

    /// Build an index from a complete set of segments and verify it.
    pub fn from_segments(
        config: IndexConfig,
        segments: &Segments,
    ) -> Result<Self, IndexError> {
        let mut index = DocumentIndex::new(config);
        index.import_segments(segments)?;
        index.verify()?;
        Ok(index)
    }
}
