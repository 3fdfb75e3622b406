//! Optional query translation ahead of image search.
//!
//! `Translator::translate_for_search` never fails: every problem resolves to
//! the original text, and the returned `TranslationOutcome` records why.
//!
//! Backends live in `providers` and are chosen once from configuration.

pub mod language;
pub mod providers;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::{BoundedCache, CacheStats};
use crate::config::{ConfigError, ProviderConfig, TranslationBackend};
use providers::{DeepLProvider, LibreTranslateProvider, NoOpProvider, TranslationProvider};

static NON_SEARCH_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("static regex"));

/// Errors from a translation backend. Always recovered by the `Translator`.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Transport(String),

    #[error("translation request timed out")]
    Timeout,

    #[error("translation provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed translation response: {0}")]
    Malformed(String),

    #[error("translation came back empty")]
    Empty,
}

impl TranslationError {
    pub(crate) fn transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslationError::Timeout
        } else {
            TranslationError::Transport(e.to_string())
        }
    }
}

/// Why the original text was kept.
#[derive(Debug)]
pub enum UnchangedReason {
    Disabled,
    EmptyInput,
    AlreadyTargetLanguage,
    NoProvider,
    Failed(TranslationError),
}

#[derive(Debug)]
pub enum TranslationOutcome {
    Translated {
        text: String,
        provider: &'static str,
        cached: bool,
    },
    Unchanged {
        text: String,
        reason: UnchangedReason,
    },
}

impl TranslationOutcome {
    pub fn text(&self) -> &str {
        match self {
            TranslationOutcome::Translated { text, .. } => text,
            TranslationOutcome::Unchanged { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            TranslationOutcome::Translated { text, .. } => text,
            TranslationOutcome::Unchanged { text, .. } => text,
        }
    }

    pub fn was_translated(&self) -> bool {
        matches!(self, TranslationOutcome::Translated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    target: String,
    context: String,
}

#[derive(Debug, Clone)]
struct CachedTranslation {
    text: String,
    provider: &'static str,
}

pub struct Translator {
    enabled: bool,
    provider: Box<dyn TranslationProvider>,
    target_language: String,
    source_language: Option<String>,
    cache: BoundedCache<CacheKey, CachedTranslation>,
}

impl Translator {
    pub fn new(
        provider: Box<dyn TranslationProvider>,
        target_language: &str,
        source_language: Option<&str>,
        cache_size: usize,
    ) -> Self {
        Self {
            enabled: true,
            provider,
            target_language: target_language.to_string(),
            source_language: source_language.map(str::to_string),
            cache: BoundedCache::new(cache_size),
        }
    }

    /// Translation switched off globally.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            provider: Box::new(NoOpProvider),
            target_language: "en".to_string(),
            source_language: None,
            cache: BoundedCache::new(0),
        }
    }

    /// Build the configured strategy. Fails only on client construction.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let settings = &config.translation;
        if !settings.enabled {
            return Ok(Self::disabled());
        }

        let provider: Box<dyn TranslationProvider> = match &settings.backend {
            TranslationBackend::None => Box::new(NoOpProvider),
            TranslationBackend::Local {
                endpoint,
                api_key,
                timeout,
            } => Box::new(
                LibreTranslateProvider::new(endpoint, api_key.clone(), *timeout)
                    .map_err(|e| ConfigError::Invalid(format!("translation client: {e}")))?,
            ),
            TranslationBackend::External {
                endpoint,
                api_key,
                timeout,
            } => Box::new(
                DeepLProvider::new(endpoint, api_key, *timeout)
                    .map_err(|e| ConfigError::Invalid(format!("translation client: {e}")))?,
            ),
        };

        log::info!(
            "translation enabled provider={} target={}",
            provider.name(),
            settings.target_language
        );

        Ok(Self::new(
            provider,
            &settings.target_language,
            settings.source_language.as_deref(),
            settings.cache_size,
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Probe the backend. A disabled translator is never reachable.
    pub fn is_reachable(&self) -> bool {
        self.enabled && !self.provider.is_passthrough() && self.provider.is_reachable()
    }

    /// Translate with the configured source and target languages.
    pub fn translate_query(&self, text: &str, context: &str) -> TranslationOutcome {
        self.translate_for_search(
            text,
            self.source_language.as_deref(),
            &self.target_language,
            context,
        )
    }

    /// Translate `text` for use as a search query.
    ///
    /// `context` (e.g. the presentation topic) only scopes the cache.
    pub fn translate_for_search(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
        context: &str,
    ) -> TranslationOutcome {
        let unchanged = |reason| TranslationOutcome::Unchanged {
            text: text.to_string(),
            reason,
        };

        if !self.enabled {
            return unchanged(UnchangedReason::Disabled);
        }

        if text.trim().is_empty() {
            return unchanged(UnchangedReason::EmptyInput);
        }

        let source = source_lang.or_else(|| language::detect_language(text));
        if source.is_some_and(|s| language::same_language(s, target_lang)) {
            return unchanged(UnchangedReason::AlreadyTargetLanguage);
        }

        if self.provider.is_passthrough() {
            return unchanged(UnchangedReason::NoProvider);
        }

        let key = CacheKey {
            text: text.to_string(),
            target: language::normalize_language(target_lang),
            context: context.to_string(),
        };

        if let Some(hit) = self.cache.get(&key) {
            log::debug!("translation cache hit '{text}' -> '{}'", hit.text);
            return TranslationOutcome::Translated {
                text: hit.text,
                provider: hit.provider,
                cached: true,
            };
        }

        let name = self.provider.name();
        let result = self
            .provider
            .translate(text, source_lang, target_lang)
            .and_then(|raw| sanitize(&raw, target_lang).ok_or(TranslationError::Empty));

        match result {
            Ok(translated) => {
                log::info!("provider={name} outcome=success '{text}' -> '{translated}'");
                self.cache.insert(
                    key,
                    CachedTranslation {
                        text: translated.clone(),
                        provider: name,
                    },
                );
                TranslationOutcome::Translated {
                    text: translated,
                    provider: name,
                    cached: false,
                }
            }
            Err(e) => {
                log::warn!("provider={name} outcome=error err={e}, using original");
                unchanged(UnchangedReason::Failed(e))
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Tidy provider output into a search phrase.
///
/// Whitespace is collapsed; for an English target anything other than ASCII
/// letters and digits is dropped. `None` if nothing is left.
fn sanitize(raw: &str, target_lang: &str) -> Option<String> {
    let cleaned = if language::same_language(target_lang, "en") {
        NON_SEARCH_CHARS.replace_all(raw, " ").into_owned()
    } else {
        raw.to_string()
    };

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::ScriptedProvider;
    use std::time::Duration;

    fn translator(provider: ScriptedProvider) -> Translator {
        Translator::new(Box::new(provider), "en", None, 100)
    }

    #[test]
    fn test_disabled_returns_input_unchanged() {
        let translator = Translator::disabled();

        for text in ["", "Revenue growth", "Рост выручки", "売上の成長", "   "] {
            let outcome = translator.translate_for_search(text, None, "en", "topic");
            assert_eq!(outcome.text(), text);
            assert!(matches!(
                outcome,
                TranslationOutcome::Unchanged { reason: UnchangedReason::Disabled, .. }
            ));
        }
    }

    #[test]
    fn test_already_target_language_skips_provider() {
        let provider = ScriptedProvider::ok("should not be used");
        let calls = provider.calls();
        let translator = translator(provider);

        let outcome = translator.translate_for_search("Revenue growth", None, "en", "");
        assert_eq!(outcome.text(), "Revenue growth");
        assert!(matches!(
            outcome,
            TranslationOutcome::Unchanged { reason: UnchangedReason::AlreadyTargetLanguage, .. }
        ));

        let outcome = translator.translate_for_search("рост", Some("en-US"), "en", "");
        assert!(!outcome.was_translated());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_translates_and_caches() {
        let provider = ScriptedProvider::ok("revenue growth");
        let calls = provider.calls();
        let translator = translator(provider);

        let first = translator.translate_for_search("рост выручки", None, "en", "finance");
        assert!(matches!(
            first,
            TranslationOutcome::Translated { ref text, cached: false, provider: "scripted" } if text == "revenue growth"
        ));

        let second = translator.translate_for_search("рост выручки", None, "en", "finance");
        assert!(matches!(second, TranslationOutcome::Translated { cached: true, .. }));
        assert_eq!(second.text(), "revenue growth");
        assert_eq!(calls.get(), 1);

        // different context is a different cache entry
        translator.translate_for_search("рост выручки", None, "en", "biology");
        assert_eq!(calls.get(), 2);
        assert_eq!(translator.cache_stats().size, 2);
    }

    #[test]
    fn test_failure_returns_original() {
        let translator = translator(ScriptedProvider::failing());

        let outcome = translator.translate_for_search("рост выручки", None, "en", "");
        assert_eq!(outcome.text(), "рост выручки");
        assert!(matches!(
            outcome,
            TranslationOutcome::Unchanged { reason: UnchangedReason::Failed(_), .. }
        ));
        assert_eq!(translator.cache_stats().size, 0);
    }

    #[test]
    fn test_unreachable_endpoint_returns_original() {
        let provider =
            LibreTranslateProvider::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let translator = Translator::new(Box::new(provider), "en", None, 10);

        let outcome = translator.translate_for_search("рост выручки", None, "en", "");
        assert_eq!(outcome.text(), "рост выручки");
        assert!(matches!(
            outcome,
            TranslationOutcome::Unchanged { reason: UnchangedReason::Failed(_), .. }
        ));
        assert!(!translator.is_reachable());
    }

    #[test]
    fn test_empty_translation_is_failure() {
        let translator = translator(ScriptedProvider::ok("  !!! "));

        let outcome = translator.translate_for_search("рост", None, "en", "");
        assert_eq!(outcome.text(), "рост");
        assert!(matches!(
            outcome,
            TranslationOutcome::Unchanged { reason: UnchangedReason::Failed(TranslationError::Empty), .. }
        ));
    }

    #[test]
    fn test_noop_provider() {
        let translator = Translator::new(Box::new(NoOpProvider), "en", None, 10);
        let outcome = translator.translate_for_search("рост", None, "en", "");
        assert!(matches!(
            outcome,
            TranslationOutcome::Unchanged { reason: UnchangedReason::NoProvider, .. }
        ));
        assert!(!translator.is_reachable());
    }

    #[test]
    fn test_empty_input_enabled() {
        let translator = translator(ScriptedProvider::ok("x"));
        let outcome = translator.translate_for_search("", None, "en", "");
        assert_eq!(outcome.text(), "");
        assert!(matches!(
            outcome,
            TranslationOutcome::Unchanged { reason: UnchangedReason::EmptyInput, .. }
        ));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  Revenue,  growth! 2024 ", "en").as_deref(), Some("Revenue growth 2024"));
        assert_eq!(sanitize("Umsatz-Wachstum", "de").as_deref(), Some("Umsatz-Wachstum"));
        assert_eq!(sanitize(" ... ", "en"), None);
    }

    #[test]
    fn test_translate_query_uses_configured_languages() {
        let provider = ScriptedProvider::ok("growth");
        let calls = provider.calls();
        let translator = Translator::new(Box::new(provider), "en", Some("ru"), 10);

        assert_eq!(translator.translate_query("рост", "t").text(), "growth");
        assert_eq!(calls.get(), 1);
    }
}
