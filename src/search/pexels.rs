use crate::search::{Candidate, CandidateSearch, SearchError};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.pexels.com/v1";

/// Pexels caps `per_page` at 80.
const MAX_PER_PAGE: usize = 80;

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PexelsSrc,
    #[serde(default)]
    alt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    large: String,
}

/// Photo search against the Pexels REST API.
pub struct PexelsSearch {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl PexelsSearch {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn into_candidates(resp: PexelsResponse) -> Vec<Candidate> {
        resp.photos
            .into_iter()
            .filter(|p| !p.src.large.is_empty())
            .map(|p| Candidate::new(p.src.large, p.alt.unwrap_or_default(), "Pexels"))
            .collect()
    }
}

impl CandidateSearch for PexelsSearch {
    fn search_candidates(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError> {
        let query = query.trim();
        if query.is_empty() || max_results == 0 {
            return Ok(vec![]);
        }

        let per_page = max_results.min(MAX_PER_PAGE).to_string();
        log::debug!("pexels search query='{query}' per_page={per_page}");

        let resp = self
            .client
            .get(format!("{}/search", self.endpoint))
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", per_page.as_str())])
            .send()
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            log::warn!("pexels error status={status} query='{query}'");
            return Err(SearchError::Status(status.as_u16()));
        }

        let body: PexelsResponse = resp
            .json()
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        let mut candidates = Self::into_candidates(body);
        candidates.truncate(max_results);
        log::info!("pexels query='{query}' candidates={}", candidates.len());

        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "pexels"
    }
}
