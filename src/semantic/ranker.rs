//! Similarity ranking of candidates against a slide context.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::search::{Candidate, ExclusionSet};
use crate::semantic::embeddings::EmbeddingError;
use crate::semantic::preprocess::slide_context;
use crate::semantic::provider::EmbeddingProvider;

/// A candidate with its similarity to the context.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub similarity: f32,
}

/// Why `pick` did or did not produce a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    Picked(RankedCandidate),
    /// Nothing left after removing excluded urls.
    AllExcluded,
    /// No model, or the context itself could not be embedded.
    Unavailable,
    /// Every candidate description failed to embed.
    NothingScored,
    /// Best match scored below the threshold.
    LowConfidence(RankedCandidate),
}

impl PickOutcome {
    pub fn into_candidate(self) -> Option<Candidate> {
        match self {
            PickOutcome::Picked(ranked) => Some(ranked.candidate),
            _ => None,
        }
    }
}

pub struct SimilarityRanker {
    provider: Arc<EmbeddingProvider>,
}

impl SimilarityRanker {
    pub fn new(provider: Arc<EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Rank candidates by similarity to `context_text`, highest first.
    ///
    /// Ties keep input order. Candidates whose description cannot be embedded
    /// are dropped; only a context embedding failure is an error.
    pub fn rank(
        &self,
        context_text: &str,
        candidates: &[Candidate],
    ) -> Result<Vec<RankedCandidate>, EmbeddingError> {
        let context = self.provider.embed(context_text)?;

        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .filter_map(|candidate| match self.provider.embed(&candidate.description) {
                Ok(v) => Some(RankedCandidate {
                    candidate: candidate.clone(),
                    similarity: context.similarity(&v),
                }),
                Err(e) => {
                    log::warn!("dropping candidate url={} embed error: {e}", candidate.url);
                    None
                }
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });

        Ok(ranked)
    }

    /// Top `k` of `rank`, with an empty list when ranking is impossible.
    pub fn rank_top_k(
        &self,
        title: &str,
        content: &str,
        candidates: &[Candidate],
        k: usize,
    ) -> Vec<RankedCandidate> {
        if !self.provider.is_available() {
            return vec![];
        }

        match self.rank(&slide_context(title, content), candidates) {
            Ok(mut ranked) => {
                ranked.truncate(k);
                ranked
            }
            Err(e) => {
                log::warn!("ranking failed: {e}");
                vec![]
            }
        }
    }

    /// Similarity between a slide and a single description.
    /// Returns `None` if either side cannot be embedded.
    pub fn similarity_for(&self, title: &str, content: &str, description: &str) -> Option<f32> {
        let context = self.provider.embed(&slide_context(title, content)).ok()?;
        let image = self.provider.embed(description).ok()?;
        Some(context.similarity(&image))
    }

    /// Pick the most similar non-excluded candidate at or above `threshold`.
    pub fn pick(
        &self,
        context_text: &str,
        candidates: &[Candidate],
        exclude: &ExclusionSet,
        threshold: f32,
    ) -> PickOutcome {
        let remaining: Vec<Candidate> = candidates
            .iter()
            .filter(|c| !exclude.contains(&c.url))
            .cloned()
            .collect();

        if remaining.is_empty() {
            return PickOutcome::AllExcluded;
        }

        if !self.provider.is_available() {
            return PickOutcome::Unavailable;
        }

        let ranked = match self.rank(context_text, &remaining) {
            Ok(ranked) => ranked,
            Err(e) => {
                log::warn!("context embedding failed: {e}");
                return PickOutcome::Unavailable;
            }
        };

        for (i, r) in ranked.iter().take(3).enumerate() {
            log::debug!(
                "top[{}] similarity={:.3} source={} description='{}'",
                i + 1,
                r.similarity,
                r.candidate.source,
                r.candidate.description.chars().take(40).collect::<String>()
            );
        }

        let Some(best) = ranked.into_iter().next() else {
            return PickOutcome::NothingScored;
        };

        if best.similarity < threshold {
            log::info!(
                "best match {:.3} below threshold {:.3}",
                best.similarity,
                threshold
            );
            return PickOutcome::LowConfidence(best);
        }

        PickOutcome::Picked(best)
    }

    /// `pick`, collapsed to the chosen candidate.
    pub fn pick_best(
        &self,
        context_text: &str,
        candidates: &[Candidate],
        exclude: &ExclusionSet,
        threshold: f32,
    ) -> Option<Candidate> {
        self.pick(context_text, candidates, exclude, threshold)
            .into_candidate()
    }
}
