//! Candidate search collaborators.
//!
//! The engine never fetches images itself; it asks a `CandidateSearch`
//! for a slate of candidates and picks one of them.

pub mod catalog;
pub mod pexels;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::SearchBackend;

pub use catalog::CatalogSearch;
pub use pexels::PexelsSearch;

/// One image option returned by a search collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
}

impl Candidate {
    pub fn new(url: impl Into<String>, description: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
            source: source.into(),
        }
    }
}

/// Urls already used within one presentation. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    urls: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the url was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search transport error: {0}")]
    Transport(String),

    #[error("search provider returned status {0}")]
    Status(u16),

    #[error("malformed search response: {0}")]
    Malformed(String),
}

impl SearchError {
    /// Transport-level failures are retried; everything else is final.
    pub fn is_transport(&self) -> bool {
        matches!(self, SearchError::Transport(_))
    }
}

/// External image search. Zero results is `Ok(vec![])`, never an error.
pub trait CandidateSearch: Send + Sync {
    fn search_candidates(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError>;

    /// Get the name of this collaborator for logging
    fn name(&self) -> &'static str;
}

/// Build the configured search collaborator.
pub fn from_backend(backend: &SearchBackend) -> anyhow::Result<Arc<dyn CandidateSearch>> {
    match backend {
        SearchBackend::Pexels {
            endpoint,
            api_key,
            timeout,
        } => {
            let search = PexelsSearch::new(endpoint, api_key, *timeout)
                .context("failed to build pexels client")?;
            Ok(Arc::new(search))
        }
        SearchBackend::Catalog { path } => {
            let search = CatalogSearch::load(path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?;
            Ok(Arc::new(search))
        }
    }
}
