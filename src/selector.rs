//! Per-slide image selection.
//!
//! For each slide the selector translates the query if configured, asks the
//! search collaborator for a slate of candidates, ranks them semantically
//! when the slate is large enough, and otherwise falls back to plain
//! first-unused selection over a ladder of narrower queries. Every external
//! failure ends in `Selection::NoImage`, never in an error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::SemanticSettings;
use crate::search::{Candidate, CandidateSearch, ExclusionSet, SearchError};
use crate::semantic::{slide_context, EmbeddingProvider, PickOutcome, SimilarityRanker};
use crate::translation::Translator;

/// One slide's text as handed over by the content generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Short search phrase; the title is used when absent
    #[serde(default)]
    pub keywords: Option<String>,
    /// Presentation topic, last-resort query and translation cache scope
    #[serde(default)]
    pub topic: Option<String>,
}

impl SlideRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or_default()
    }

    fn primary_query(&self) -> &str {
        [self.keywords.as_deref(), Some(self.title.as_str()), self.topic.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|q| !q.is_empty())
            .unwrap_or_default()
    }
}

/// How a candidate was chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionPath {
    Semantic { similarity: f32 },
    /// Slate smaller than `min_candidates`; ranking skipped.
    SmallSample,
    /// Ranking disabled or the model is unavailable.
    RankingUnavailable,
    /// First unused candidate of a fallback query.
    SecondaryQuery { query: String },
}

impl std::fmt::Display for SelectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPath::Semantic { similarity } => write!(f, "semantic ({similarity:.3})"),
            SelectionPath::SmallSample => f.write_str("small-sample"),
            SelectionPath::RankingUnavailable => f.write_str("ranking-unavailable"),
            SelectionPath::SecondaryQuery { query } => write!(f, "secondary-query '{query}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoImageReason {
    /// The search collaborator failed, including the narrower retry.
    SearchFailed,
    /// Every query was tried without an acceptable unused candidate.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected { candidate: Candidate, path: SelectionPath },
    NoImage { reason: NoImageReason },
}

impl Selection {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Selection::Selected { candidate, .. } => Some(candidate),
            Selection::NoImage { .. } => None,
        }
    }

    pub fn into_candidate(self) -> Option<Candidate> {
        match self {
            Selection::Selected { candidate, .. } => Some(candidate),
            Selection::NoImage { .. } => None,
        }
    }
}

fn first_unused(candidates: &[Candidate], exclude: &ExclusionSet) -> Option<Candidate> {
    candidates.iter().find(|c| !exclude.contains(&c.url)).cloned()
}

/// First word of a multi-word query; the query itself otherwise.
fn narrower_query(query: &str) -> &str {
    query.split_whitespace().next().unwrap_or(query)
}

pub struct ImageSelector {
    settings: SemanticSettings,
    ranker: SimilarityRanker,
    translator: Arc<Translator>,
    search: Arc<dyn CandidateSearch>,
}

impl ImageSelector {
    pub fn new(
        settings: SemanticSettings,
        embeddings: Arc<EmbeddingProvider>,
        translator: Arc<Translator>,
        search: Arc<dyn CandidateSearch>,
    ) -> Self {
        Self {
            settings,
            ranker: SimilarityRanker::new(embeddings),
            translator,
            search,
        }
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }

    /// Select an image for a bare title/content pair.
    pub fn select_image(&self, slide_title: &str, slide_content: &str, exclude: &ExclusionSet) -> Option<Candidate> {
        self.select(&SlideRequest::new(slide_title, slide_content), exclude)
            .into_candidate()
    }

    /// Run the full selection pipeline for one slide.
    ///
    /// `exclude` is not modified; the caller records the chosen url before
    /// the next slide (see `PresentationRun`).
    pub fn select(&self, slide: &SlideRequest, exclude: &ExclusionSet) -> Selection {
        let primary = slide.primary_query();
        if primary.is_empty() {
            log::info!("slide has no text to search with");
            return Selection::NoImage {
                reason: NoImageReason::Exhausted,
            };
        }

        let query = self.translator.translate_query(primary, slide.topic()).into_text();
        log::info!("search query='{query}' slide='{}'", slide.title);

        let (searched, candidates) = match self.search_with_retry(&query) {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("giving up on slide '{}': {e}", slide.title);
                return Selection::NoImage {
                    reason: NoImageReason::SearchFailed,
                };
            }
        };

        match self.choose_from_primary(slide, &candidates, exclude) {
            Some(selection) => selection,
            None => self.select_from_fallback_queries(slide, &[&query, &searched], exclude),
        }
    }

    /// Decide on the primary slate. `None` moves on to the fallback queries.
    fn choose_from_primary(
        &self,
        slide: &SlideRequest,
        candidates: &[Candidate],
        exclude: &ExclusionSet,
    ) -> Option<Selection> {
        if candidates.len() < self.settings.min_candidates {
            log::info!(
                "only {} candidates (min {}), skipping semantic ranking",
                candidates.len(),
                self.settings.min_candidates
            );
            return first_unused(candidates, exclude).map(|candidate| Selection::Selected {
                candidate,
                path: SelectionPath::SmallSample,
            });
        }

        let ranking_possible = self.settings.enabled && self.ranker.provider().is_available();
        if ranking_possible {
            let context = slide_context(&slide.title, &slide.content);
            match self.ranker.pick(
                &context,
                candidates,
                exclude,
                self.settings.similarity_threshold,
            ) {
                PickOutcome::Picked(best) => {
                    log::info!(
                        "semantic match similarity={:.3} url={}",
                        best.similarity,
                        best.candidate.url
                    );
                    return Some(Selection::Selected {
                        candidate: best.candidate,
                        path: SelectionPath::Semantic {
                            similarity: best.similarity,
                        },
                    });
                }
                // a rejected slate is not reused by the plain fallback
                PickOutcome::LowConfidence(_) | PickOutcome::AllExcluded => return None,
                PickOutcome::Unavailable | PickOutcome::NothingScored => {}
            }
        }

        first_unused(candidates, exclude).map(|candidate| Selection::Selected {
            candidate,
            path: SelectionPath::RankingUnavailable,
        })
    }

    /// Secondary attempts: first word of the query, the title, the topic.
    ///
    /// `searched` holds the queries already sent for the primary slate; the
    /// first one is the translated primary query.
    fn fallback_queries(&self, slide: &SlideRequest, searched: &[&str]) -> Vec<String> {
        let primary = searched.first().copied().unwrap_or_default();
        let mut queries: Vec<String> = Vec::new();
        let mut seen: Vec<String> = searched.iter().map(|q| q.trim().to_lowercase()).collect();

        let candidates = [
            narrower_query(primary).to_string(),
            self.translator.translate_query(&slide.title, slide.topic()).into_text(),
            self.translator.translate_query(slide.topic(), slide.topic()).into_text(),
        ];

        for q in candidates {
            let q = q.trim().to_string();
            let key = q.to_lowercase();
            if q.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            queries.push(q);
        }

        queries
    }

    fn select_from_fallback_queries(
        &self,
        slide: &SlideRequest,
        searched: &[&str],
        exclude: &ExclusionSet,
    ) -> Selection {
        for query in self.fallback_queries(slide, searched) {
            log::info!("fallback query='{query}'");

            let candidates = match self.search_with_retry(&query) {
                Ok((_, candidates)) => candidates,
                Err(e) => {
                    log::warn!("fallback search failed: {e}");
                    return Selection::NoImage {
                        reason: NoImageReason::SearchFailed,
                    };
                }
            };

            if let Some(candidate) = first_unused(&candidates, exclude) {
                return Selection::Selected {
                    candidate,
                    path: SelectionPath::SecondaryQuery { query },
                };
            }
        }

        log::info!("no unused image found for slide '{}'", slide.title);
        Selection::NoImage {
            reason: NoImageReason::Exhausted,
        }
    }

    /// One search, retried once with a narrower query on a transport failure.
    ///
    /// Returns the query that produced the slate along with it.
    fn search_with_retry(&self, query: &str) -> Result<(String, Vec<Candidate>), SearchError> {
        let max = self.settings.max_candidates;
        let name = self.search.name();

        let first_error = match self.search.search_candidates(query, max) {
            Ok(mut candidates) => {
                candidates.truncate(max);
                return Ok((query.to_string(), candidates));
            }
            Err(e) if !e.is_transport() => {
                log::warn!("search={name} outcome=error err={e}");
                return Err(e);
            }
            Err(e) => e,
        };

        let narrower = narrower_query(query);
        log::warn!("search={name} outcome=error err={first_error}, retrying with '{narrower}'");

        let mut candidates = self.search.search_candidates(narrower, max)?;
        candidates.truncate(max);
        Ok((narrower.to_string(), candidates))
    }
}

/// One presentation's slide sequence with its exclusion set.
///
/// Slides are processed strictly in order; a selected url is recorded before
/// the next slide is looked at.
pub struct PresentationRun<'a> {
    selector: &'a ImageSelector,
    used: ExclusionSet,
}

impl<'a> PresentationRun<'a> {
    pub fn new(selector: &'a ImageSelector) -> Self {
        Self {
            selector,
            used: ExclusionSet::new(),
        }
    }

    pub fn select_next(&mut self, slide: &SlideRequest) -> Selection {
        let selection = self.selector.select(slide, &self.used);
        if let Some(candidate) = selection.candidate() {
            self.used.insert(candidate.url.clone());
        }
        selection
    }

    pub fn select_all(&mut self, slides: &[SlideRequest]) -> Vec<Selection> {
        slides.iter().map(|s| self.select_next(s)).collect()
    }

    pub fn used(&self) -> &ExclusionSet {
        &self.used
    }
}
