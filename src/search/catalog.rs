//! Offline search over a fixed list of candidates loaded from JSON.
//!
//! A candidate matches when its description shares at least one word with
//! the query. Results keep file order.

use crate::search::{Candidate, CandidateSearch, SearchError};
use std::path::Path;

pub struct CatalogSearch {
    candidates: Vec<Candidate>,
}

impl CatalogSearch {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Load a JSON array of `{url, description, source}` objects.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)?;
        let candidates: Vec<Candidate> = serde_json::from_slice(&data)?;
        log::info!("loaded {} catalog candidates from {}", candidates.len(), path.display());
        Ok(Self::new(candidates))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

impl CandidateSearch for CatalogSearch {
    fn search_candidates(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError> {
        let terms: Vec<String> = words(query).collect();
        if terms.is_empty() {
            return Ok(vec![]);
        }

        Ok(self
            .candidates
            .iter()
            .filter(|c| words(&c.description).any(|w| terms.contains(&w)))
            .take(max_results)
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "catalog"
    }
}
