//! Thali vector crate - text splitting, embedding service, vector index and
//! the retrieval index built over a processed menu.
//!
//! Provides in-memory vector indexing with cosine similarity search,
//! an embedding service trait with ONNX and mock implementations, and a
//! recursive splitter that produces overlapping chunks.

pub mod embedding;
pub mod index;
pub mod retrieval;
pub mod splitter;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OnnxEmbeddingService};
pub use index::{cosine_similarity, SearchHit, VectorIndex};
pub use retrieval::RetrievalIndex;
pub use splitter::RecursiveTextSplitter;
