//! In-process fakes for the embedding, translation and search seams.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::search::{Candidate, CandidateSearch, SearchError};
use crate::semantic::{Embedder, EmbeddingError, EmbeddingProvider};
use crate::translation::providers::TranslationProvider;
use crate::translation::TranslationError;

/// Shared call counter handed out before a fake is boxed.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hashes lowercase word tokens into buckets. Texts sharing words score
/// high, unrelated texts score near zero.
pub struct BagOfWordsEmbedder {
    dims: usize,
    calls: CallCounter,
}

impl BagOfWordsEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: CallCounter::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Embedder for BagOfWordsEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.bump();

        let mut v = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % self.dims as u64) as usize] += 1.0;
        }
        Ok(v)
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }
}

pub fn bag_of_words_provider(dims: usize) -> Arc<EmbeddingProvider> {
    Arc::new(EmbeddingProvider::with_embedder(
        Arc::new(BagOfWordsEmbedder::new(dims)),
        1000,
        Duration::from_secs(5),
    ))
}

/// Sleeps before answering, to trip the inference timeout.
pub struct SlowEmbedder {
    delay: Duration,
    calls: CallCounter,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: CallCounter::default(),
        }
    }

    /// Number of texts actually run through the model.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Embedder for SlowEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.bump();
        std::thread::sleep(self.delay);
        Ok(vec![1.0, 0.0])
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Exact text -> vector table. Unknown text is an embedding failure.
pub struct FixedEmbedder {
    dims: usize,
    table: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
}

impl FixedEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            table: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        assert_eq!(vector.len(), self.dims, "vector for {text:?} has wrong length");
        self.table.insert(text.to_string(), vector.to_vec());
        self
    }

    pub fn failing(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }
}

impl Embedder for FixedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.failing.contains(text) {
            return Err(EmbeddingError::EmbeddingFailed(format!("scripted failure for {text:?}")));
        }
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed(format!("no vector for {text:?}")))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Translation provider answering every request the same way.
pub struct ScriptedProvider {
    reply: Option<String>,
    calls: CallCounter,
}

impl ScriptedProvider {
    pub fn ok(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: CallCounter::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: CallCounter::default(),
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl TranslationProvider for ScriptedProvider {
    fn translate(
        &self,
        _text: &str,
        _source_lang: Option<&str>,
        _target_lang: &str,
    ) -> Result<String, TranslationError> {
        self.calls.bump();
        self.reply
            .clone()
            .ok_or_else(|| TranslationError::Transport("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

enum Scripted {
    Results(Vec<Candidate>),
    Fails,
    Rejects(u16),
}

/// Search collaborator with canned slates per query. Unknown queries
/// return nothing. Every query received is recorded.
#[derive(Default)]
pub struct ScriptedSearch {
    slates: HashMap<String, Scripted>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, candidates: Vec<Candidate>) -> Self {
        self.slates.insert(query.to_string(), Scripted::Results(candidates));
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.slates.insert(query.to_string(), Scripted::Fails);
        self
    }

    /// Answer `query` with a non-success status instead of a transport error.
    pub fn rejecting(mut self, query: &str, status: u16) -> Self {
        self.slates.insert(query.to_string(), Scripted::Rejects(status));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CandidateSearch for ScriptedSearch {
    fn search_candidates(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>, SearchError> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.to_string());

        match self.slates.get(query) {
            Some(Scripted::Results(candidates)) => Ok(candidates.iter().take(max_results).cloned().collect()),
            Some(Scripted::Fails) => Err(SearchError::Transport("connection reset".to_string())),
            Some(Scripted::Rejects(status)) => Err(SearchError::Status(*status)),
            None => Ok(vec![]),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
