//! Semantic image selection for generated slide decks.
//!
//! - `semantic`: embeddings, similarity and ranking
//! - `translation`: optional query translation with fallback to the input
//! - `search`: candidate search collaborators
//! - `selector`: per-slide orchestration and the presentation exclusion set

pub mod cache;
pub mod config;
pub mod search;
pub mod selector;
pub mod semantic;
pub mod translation;

#[cfg(test)]
mod tests;

pub use config::{Config, ConfigError, ProviderConfig};
pub use search::{Candidate, CandidateSearch, ExclusionSet};
pub use selector::{ImageSelector, PresentationRun, Selection, SelectionPath, SlideRequest};
pub use semantic::EmbeddingProvider;
pub use translation::{TranslationOutcome, Translator};
