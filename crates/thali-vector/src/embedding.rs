//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` loads a sentence-transformer ONNX model (e.g.
//!   all-MiniLM-L6-v2) via ort and tokenizes with the HuggingFace tokenizers
//!   crate. This is the production embedding backend.
//! - `MockEmbedding` provides deterministic feature-hashed bag-of-words
//!   vectors, so texts sharing words score as similar without a model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use thali_core::error::ThaliError;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::info;

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors that capture
/// semantic meaning. Used both when building the retrieval index over menu
/// chunks and when embedding a customer's question.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, ThaliError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// Because `EmbeddingService::embed` returns `impl Future` it is not
/// object-safe. This trait uses a boxed future instead, allowing
/// `Box<dyn DynEmbeddingService>` to be stored in structs without generics.
///
/// A blanket implementation is provided so that every `EmbeddingService`
/// automatically implements `DynEmbeddingService`.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, ThaliError>> + Send + 'a>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Blanket impl: any `EmbeddingService` automatically implements `DynEmbeddingService`.
impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, ThaliError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - sentence-transformer inference via ONNX Runtime
// ---------------------------------------------------------------------------

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const FALLBACK_DIMENSIONS: usize = 384;

/// Embedding backend for a sentence-transformer ONNX export such as
/// all-MiniLM-L6-v2.
///
/// The model takes `input_ids`, `attention_mask` and `token_type_ids` (i64,
/// shape `[1, seq_len]`) and returns token embeddings `[1, seq_len, dim]`,
/// which are mean-pooled over unmasked tokens and L2-normalized.
#[derive(Clone)]
pub struct OnnxEmbeddingService {
    model: Arc<OnnxModel>,
}

struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
}

// ort::Session is Send + Sync internally (uses Arc<SharedSessionInner>).
unsafe impl Send for OnnxModel {}
unsafe impl Sync for OnnxModel {}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("dimensions", &self.model.dimensions)
            .finish()
    }
}

fn embedding_err(context: &str, detail: impl std::fmt::Display) -> ThaliError {
    ThaliError::Embedding(format!("{}: {}", context, detail))
}

impl OnnxEmbeddingService {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn from_directory(model_dir: &Path) -> Result<Self, ThaliError> {
        Self::from_files(&model_dir.join(MODEL_FILE), &model_dir.join(TOKENIZER_FILE))
    }

    pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self, ThaliError> {
        for (what, path) in [("ONNX model", model_path), ("tokenizer", tokenizer_path)] {
            if !path.is_file() {
                return Err(ThaliError::Embedding(format!(
                    "{} not found at {}",
                    what,
                    path.display()
                )));
            }
        }

        let session = Session::builder()
            .map_err(|e| embedding_err("ONNX session builder", e))?
            .with_intra_threads(1)
            .map_err(|e| embedding_err("ONNX thread setup", e))?
            .commit_from_file(model_path)
            .map_err(|e| embedding_err("loading ONNX model", e))?;

        let dimensions = session
            .outputs()
            .first()
            .and_then(|output| output.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .filter(|d| *d > 0)
            .map_or(FALLBACK_DIMENSIONS, |d| d as usize);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| embedding_err("loading tokenizer", e))?;

        info!(model = %model_path.display(), dimensions, "ONNX embedding model loaded");
        Ok(Self {
            model: Arc::new(OnnxModel {
                session: Mutex::new(session),
                tokenizer,
                dimensions,
            }),
        })
    }
}

impl OnnxModel {
    fn embed_blocking(&self, text: &str) -> Result<Vec<f32>, ThaliError> {
        if text.is_empty() {
            return Err(ThaliError::Embedding("Cannot embed empty text".to_string()));
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embedding_err("tokenizing", e))?;
        let mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| i64::from(m)).collect();
        let ids = as_batch(encoding.get_ids())?;
        let types = as_batch(encoding.get_type_ids())?;
        let mask_batch = ndarray::Array2::from_shape_vec((1, mask.len()), mask.clone())
            .map_err(|e| embedding_err("attention mask", e))?;

        let ids_ref =
            TensorRef::from_array_view(&ids).map_err(|e| embedding_err("input_ids tensor", e))?;
        let mask_ref = TensorRef::from_array_view(&mask_batch)
            .map_err(|e| embedding_err("attention_mask tensor", e))?;
        let types_ref = TensorRef::from_array_view(&types)
            .map_err(|e| embedding_err("token_type_ids tensor", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| embedding_err("session lock", e))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, types_ref])
            .map_err(|e| embedding_err("running inference", e))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embedding_err("reading output", e))?;

        let hidden = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
            [.., seq, dim] if *seq as usize == mask.len() && *dim > 0 => *dim as usize,
            other => {
                return Err(ThaliError::Embedding(format!(
                    "unexpected output shape {:?}",
                    other
                )))
            }
        };

        let mut pooled = mean_pool(data, &mask, hidden);
        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

/// `[1, len]` i64 batch from tokenizer output.
fn as_batch(values: &[u32]) -> Result<ndarray::Array2<i64>, ThaliError> {
    let row: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
    ndarray::Array2::from_shape_vec((1, row.len()), row)
        .map_err(|e| embedding_err("input batch", e))
}

/// Average the token vectors in `data` (row-major `[seq, hidden]`) whose
/// mask entry is non-zero.
fn mean_pool(data: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut used = 0usize;
    for (token, row) in data.chunks_exact(hidden).enumerate() {
        if mask.get(token).copied().unwrap_or(0) == 0 {
            continue;
        }
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
        used += 1;
    }
    if used > 0 {
        let n = used as f32;
        pooled.iter_mut().for_each(|v| *v /= n);
    }
    pooled
}

/// Scale `vector` to unit length; zero vectors are left unchanged.
fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ThaliError> {
        // Inference is CPU-bound; keep it off the async workers.
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || model.embed_blocking(&text))
            .await
            .map_err(|e| embedding_err("embedding task", e))?
    }

    fn dimensions(&self) -> usize {
        self.model.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic feature-hashed vectors
// ---------------------------------------------------------------------------

const MOCK_DIMENSIONS: usize = 384;

/// Mock embedding service that returns deterministic 384-dimensional vectors.
///
/// Each lowercase alphanumeric token is hashed into one signed bucket, so
/// identical inputs produce identical outputs and texts that share words
/// have positive cosine similarity. Used in tests and when no ONNX model is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result = vec![0.0f32; MOCK_DIMENSIONS];
        let lower = text.to_lowercase();
        let mut tokens = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .peekable();

        if tokens.peek().is_none() {
            // Punctuation-only input still gets a stable, non-zero vector.
            Self::add_feature(&mut result, &lower);
        } else {
            for token in tokens {
                Self::add_feature(&mut result, token);
            }
        }

        l2_normalize(&mut result);
        result
    }

    fn add_feature(vector: &mut [f32], token: &str) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let h = hasher.finish();
        let bucket = (h % vector.len() as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ThaliError> {
        if text.is_empty() {
            return Err(ThaliError::Embedding(
                "Cannot embed empty text".to_string(),
            ));
        }
        Ok(Self::hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        MOCK_DIMENSIONS
    }
}
