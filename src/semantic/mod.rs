//! Semantic ranking infrastructure for candidate images.
//!
//! This module ranks image candidates by how close their descriptions are to
//! a slide's text, using fastembed-rs for embeddings.
//!
//! # Architecture
//!
//! - `embeddings`: `Embedder` trait and the fastembed-backed model
//! - `vector`: normalized embedding vectors and cosine similarity
//! - `provider`: lazily-initialized, cached, timeout-bounded embedding access
//! - `preprocess`: slide context construction
//! - `ranker`: similarity ranking and threshold-based picking

pub mod embeddings;
pub mod preprocess;
pub mod provider;
pub mod ranker;
pub mod vector;

pub use embeddings::{Embedder, EmbeddingError, EmbeddingModel};
pub use preprocess::slide_context;
pub use provider::EmbeddingProvider;
pub use ranker::{PickOutcome, RankedCandidate, SimilarityRanker};
pub use vector::EmbeddingVector;

/// Default embedding model (CLIP text tower, 512 dimensions)
pub const DEFAULT_MODEL: &str = "clip-ViT-B-32";

/// Default minimum top-1 similarity to accept a match
pub const DEFAULT_THRESHOLD: f32 = 0.30;
