//! In-memory vector index with brute-force cosine similarity search.
//!
//! Menus produce a few dozen chunks, so an O(n) scan per query is plenty.
//! Entries are addressed by insertion ordinal, which also breaks score ties.

use thali_core::error::ThaliError;

/// A single hit returned from a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Insertion ordinal of the matching entry.
    pub ordinal: usize,
    /// Cosine similarity score (-1.0 to 1.0).
    pub score: f64,
    /// Text stored alongside the vector.
    pub text: String,
}

/// An entry stored in the vector index.
#[derive(Debug, Clone)]
struct VectorEntry {
    text: String,
    embedding: Vec<f32>,
}

/// In-memory vector index using brute-force cosine similarity.
///
/// Built once per processed menu and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vector with its source text; returns the entry's ordinal.
    ///
    /// The first insert fixes the dimensionality; later inserts must match.
    pub fn insert(&mut self, text: String, embedding: Vec<f32>) -> Result<usize, ThaliError> {
        match self.dimensions {
            Some(dim) if dim != embedding.len() => {
                return Err(ThaliError::Search(format!(
                    "Dimension mismatch: index has {}, got {}",
                    dim,
                    embedding.len()
                )));
            }
            None => self.dimensions = Some(embedding.len()),
            _ => {}
        }
        self.entries.push(VectorEntry { text, embedding });
        Ok(self.entries.len() - 1)
    }

    /// Search for the k nearest neighbors to the query vector by cosine similarity.
    ///
    /// Returns results sorted by descending similarity; equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, ThaliError> {
        if let Some(dim) = self.dimensions {
            if dim != query.len() {
                return Err(ThaliError::Search(format!(
                    "Query has {} dimensions, index has {}",
                    query.len(),
                    dim
                )));
            }
        }

        let mut scored: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(ordinal, entry)| SearchHit {
                ordinal,
                score: cosine_similarity(query, &entry.embedding),
                text: entry.text.clone(),
            })
            .collect();

        // Stable: equal scores stay in insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and forget the dimensionality.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dimensions = None;
    }
}

/// Cosine similarity of two vectors, accumulated in f64.
///
/// Zero-magnitude inputs and length mismatches score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (&x, &y)| {
        let (x, y) = (f64::from(x), f64::from(y));
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
