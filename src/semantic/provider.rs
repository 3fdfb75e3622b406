//! Process-wide embedding provider.
//!
//! Wraps an `Embedder` with:
//! - one-shot lazy initialization (success or failure is memoized)
//! - exact-text FIFO cache of normalized vectors
//! - a per-call inference timeout, served by a single worker thread

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::{BoundedCache, CacheStats};
use crate::config::SemanticSettings;
use crate::semantic::embeddings::{Embedder, EmbeddingError, EmbeddingModel};
use crate::semantic::vector::EmbeddingVector;

type EmbedderLoader = Box<dyn Fn() -> Result<Arc<dyn Embedder>, EmbeddingError> + Send + Sync>;
type EmbedReply = Result<Vec<f32>, EmbeddingError>;

struct EmbedJob {
    text: String,
    deadline: Instant,
    reply: mpsc::Sender<EmbedReply>,
}

/// The loaded model, owned by its inference thread.
///
/// Jobs run one at a time. A job whose caller already gave up is dropped
/// without touching the model, so a stalled model never builds a backlog.
struct InferenceWorker {
    model_name: String,
    jobs: Mutex<mpsc::Sender<EmbedJob>>,
}

impl InferenceWorker {
    fn spawn(model: Arc<dyn Embedder>) -> Result<Self, EmbeddingError> {
        let model_name = model.name().to_string();
        let (tx, rx) = mpsc::channel::<EmbedJob>();

        std::thread::Builder::new()
            .name("embedding-inference".to_string())
            .spawn(move || {
                for job in rx {
                    if Instant::now() >= job.deadline {
                        log::debug!("skipping expired embedding job");
                        continue;
                    }
                    let _ = job.reply.send(model.embed(&job.text));
                }
            })
            .map_err(|e| EmbeddingError::InitFailed(format!("failed to start inference thread: {e}")))?;

        Ok(Self {
            model_name,
            jobs: Mutex::new(tx),
        })
    }

    fn infer(&self, text: String, timeout: Duration) -> EmbedReply {
        let (reply, rx) = mpsc::channel();
        let job = EmbedJob {
            text,
            deadline: Instant::now() + timeout,
            reply,
        };

        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .send(job)
            .map_err(|_| EmbeddingError::EmbeddingFailed("inference thread has exited".to_string()))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(EmbeddingError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(EmbeddingError::EmbeddingFailed(
                "inference job dropped without a result".to_string(),
            )),
        }
    }
}

pub struct EmbeddingProvider {
    loader: EmbedderLoader,
    worker: OnceCell<Option<InferenceWorker>>,
    cache: BoundedCache<String, EmbeddingVector>,
    timeout: Duration,
}

impl EmbeddingProvider {
    /// Provider that loads its model with `loader` on first use.
    pub fn new<F>(loader: F, cache_size: usize, timeout: Duration) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>, EmbeddingError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            worker: OnceCell::new(),
            cache: BoundedCache::new(cache_size),
            timeout,
        }
    }

    /// Provider around an already constructed embedder.
    pub fn with_embedder(embedder: Arc<dyn Embedder>, cache_size: usize, timeout: Duration) -> Self {
        Self::new(move || Ok(embedder.clone()), cache_size, timeout)
    }

    /// Provider that always reports the model as unavailable.
    pub fn disabled() -> Self {
        Self::new(|| Err(EmbeddingError::Unavailable), 0, Duration::from_secs(1))
    }

    /// Provider backed by a fastembed model stored under `base_path/models`.
    pub fn from_settings(settings: &SemanticSettings, base_path: PathBuf) -> Self {
        if !settings.enabled {
            return Self::disabled();
        }

        let model_name = settings.model.clone();
        Self::new(
            move || {
                let model = EmbeddingModel::new(&model_name, base_path.clone())?;
                Ok(Arc::new(model) as Arc<dyn Embedder>)
            },
            settings.cache_size,
            Duration::from_secs(settings.inference_timeout_secs),
        )
    }

    fn worker(&self) -> Option<&InferenceWorker> {
        self.worker
            .get_or_init(|| match (self.loader)().and_then(InferenceWorker::spawn) {
                Ok(worker) => {
                    log::info!("embedding model '{}' available", worker.model_name);
                    Some(worker)
                }
                Err(e) => {
                    log::warn!("embedding model unavailable, semantic ranking disabled: {e}");
                    None
                }
            })
            .as_ref()
    }

    /// Whether the model initialized. The first call triggers initialization.
    pub fn is_available(&self) -> bool {
        self.worker().is_some()
    }

    /// Embed `text` (trimmed) into a unit-norm vector.
    ///
    /// Never panics; failures come back as `EmbeddingError` and callers are
    /// expected to skip semantic ranking.
    pub fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let worker = self.worker().ok_or(EmbeddingError::Unavailable)?;
        let key = text.trim();

        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }

        let raw = worker.infer(key.to_string(), self.timeout)?;
        let vector = EmbeddingVector::from_raw(&raw).ok_or_else(|| {
            EmbeddingError::EmbeddingFailed(format!(
                "model returned an unusable vector ({} values)",
                raw.len()
            ))
        })?;

        self.cache.insert(key.to_string(), vector.clone());
        Ok(vector)
    }

    pub fn similarity(a: &EmbeddingVector, b: &EmbeddingVector) -> f32 {
        a.similarity(b)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        log::debug!("embedding cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
