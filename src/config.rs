use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::search::pexels;
use crate::semantic::{DEFAULT_MODEL, DEFAULT_THRESHOLD};
use crate::translation::providers::deepl;

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_MIN_CANDIDATES: usize = 8;
const DEFAULT_MAX_CANDIDATES: usize = 20;
const DEFAULT_CACHE_SIZE: usize = 1000;
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TARGET_LANGUAGE: &str = "en";
const DEFAULT_LIBRETRANSLATE_URL: &str = "http://localhost:5001";
const DEFAULT_TRANSLATION_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;

/// Deployment mistakes. The only error surfaced at process start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown {kind} provider '{name}'")]
    UnknownProvider { kind: &'static str, name: String },

    #[error("{provider} provider requires an endpoint")]
    MissingEndpoint { provider: &'static str },

    #[error("{provider} provider requires an api key")]
    MissingApiKey { provider: &'static str },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Parse(#[from] serde_yml::Error),
}

/// Semantic ranking settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticSettings {
    /// Master switch; when off the selector always takes the fallback path
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model name for embeddings (e.g., "clip-ViT-B-32")
    #[serde(default = "default_model")]
    pub model: String,

    /// Minimum top-1 similarity to accept a semantic match
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f32,

    /// Below this many candidates, ranking is skipped
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// Upper bound requested from the search collaborator
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,
}

impl Default for SemanticSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_model(),
            similarity_threshold: DEFAULT_THRESHOLD,
            min_candidates: DEFAULT_MIN_CANDIDATES,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            cache_size: DEFAULT_CACHE_SIZE,
            inference_timeout_secs: DEFAULT_INFERENCE_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,
}

/// Translation settings as written in the file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationSettings {
    #[serde(default)]
    pub enabled: bool,

    /// "none", "local" or "external"
    #[serde(default = "default_translation_provider")]
    pub provider: String,

    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Fixed source language; detected from the text when unset
    #[serde(default)]
    pub source_language: Option<String>,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// LibreTranslate
    #[serde(default = "default_local_endpoint")]
    pub local: EndpointSettings,

    /// DeepL
    #[serde(default = "default_external_endpoint")]
    pub external: EndpointSettings,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_translation_provider(),
            target_language: default_target_language(),
            source_language: None,
            cache_size: DEFAULT_CACHE_SIZE,
            local: default_local_endpoint(),
            external: default_external_endpoint(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchSettings {
    /// "pexels" or "catalog"
    #[serde(default = "default_search_provider")]
    pub provider: String,

    #[serde(default)]
    pub pexels_api_key: Option<String>,

    #[serde(default = "default_pexels_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    /// JSON candidate file used by the catalog provider
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            pexels_api_key: None,
            endpoint: default_pexels_endpoint(),
            timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
            catalog_path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_min_candidates() -> usize {
    DEFAULT_MIN_CANDIDATES
}

fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_inference_timeout_secs() -> u64 {
    DEFAULT_INFERENCE_TIMEOUT_SECS
}

fn default_translation_provider() -> String {
    "none".to_string()
}

fn default_target_language() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}

fn default_translation_timeout_secs() -> u64 {
    DEFAULT_TRANSLATION_TIMEOUT_SECS
}

fn default_local_endpoint() -> EndpointSettings {
    EndpointSettings {
        endpoint: Some(DEFAULT_LIBRETRANSLATE_URL.to_string()),
        api_key: None,
        timeout_secs: DEFAULT_TRANSLATION_TIMEOUT_SECS,
    }
}

fn default_external_endpoint() -> EndpointSettings {
    EndpointSettings {
        endpoint: Some(deepl::DEFAULT_ENDPOINT.to_string()),
        api_key: None,
        timeout_secs: DEFAULT_TRANSLATION_TIMEOUT_SECS,
    }
}

fn default_search_provider() -> String {
    "pexels".to_string()
}

fn default_pexels_endpoint() -> String {
    pexels::DEFAULT_ENDPOINT.to_string()
}

fn default_search_timeout_secs() -> u64 {
    DEFAULT_SEARCH_TIMEOUT_SECS
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub semantic: SemanticSettings,
    #[serde(default)]
    pub translation: TranslationSettings,
    #[serde(default)]
    pub search: SearchSettings,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

/// Resolved translation strategy
#[derive(Clone, Debug, PartialEq)]
pub enum TranslationBackend {
    None,
    Local {
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    },
    External {
        endpoint: String,
        api_key: String,
        timeout: Duration,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTranslation {
    pub enabled: bool,
    pub backend: TranslationBackend,
    pub target_language: String,
    pub source_language: Option<String>,
    pub cache_size: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchBackend {
    Pexels {
        endpoint: String,
        api_key: String,
        timeout: Duration,
    },
    Catalog {
        path: PathBuf,
    },
}

/// Immutable configuration handed to the engine at startup.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub semantic: SemanticSettings,
    pub translation: ResolvedTranslation,
    pub search: SearchBackend,
    pub base_path: PathBuf,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} has an invalid value '{raw}'"))),
        None => Ok(None),
    }
}

fn env_flag(name: &str) -> Result<Option<bool>, ConfigError> {
    match env_var(name) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid(format!(
                "{name} must be a boolean (true/false, 1/0, yes/no, on/off), got '{raw}'"
            ))),
        },
        None => Ok(None),
    }
}

impl Config {
    /// Load `config.yaml` from `base_path`, creating it with defaults if missing,
    /// then apply environment overrides and validate.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(base_path)?;
        let path = base_path.join(CONFIG_FILE);

        if !path.exists() {
            log::info!("creating default config at {}", path.display());
            std::fs::write(&path, serde_yml::to_string(&Self::default())?)?;
        }

        let config_str = std::fs::read_to_string(&path)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;
        config.base_path = base_path.to_path_buf();

        config.apply_env()?;
        config.validate()?;

        Ok(config)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Environment variables win over the file.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_flag("SEMANTIC_ENABLED")? {
            self.semantic.enabled = v;
        }
        if let Some(v) = env_parse("SIMILARITY_THRESHOLD")? {
            self.semantic.similarity_threshold = v;
        }
        if let Some(v) = env_parse("MIN_CANDIDATES")? {
            self.semantic.min_candidates = v;
        }
        if let Some(v) = env_parse("MAX_CANDIDATES")? {
            self.semantic.max_candidates = v;
        }

        if let Some(v) = env_flag("TRANSLATION_ENABLED")? {
            self.translation.enabled = v;
        }
        if let Some(v) = env_var("TRANSLATION_PROVIDER") {
            self.translation.provider = v;
        }
        if let Some(v) = env_var("TARGET_LANGUAGE") {
            self.translation.target_language = v;
        }
        if let Some(v) = env_var("LIBRETRANSLATE_URL") {
            self.translation.local.endpoint = Some(v);
        }
        if let Some(v) = env_parse("LIBRETRANSLATE_TIMEOUT")? {
            self.translation.local.timeout_secs = v;
        }
        if let Some(v) = env_var("DEEPL_URL") {
            self.translation.external.endpoint = Some(v);
        }
        if let Some(v) = env_var("DEEPL_API_KEY") {
            self.translation.external.api_key = Some(v);
        }

        if let Some(v) = env_var("PEXELS_API_KEY") {
            self.search.pexels_api_key = Some(v);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sem = &self.semantic;
        if !(-1.0..=1.0).contains(&sem.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "semantic.similarity_threshold must be between -1.0 and 1.0, got {}",
                sem.similarity_threshold
            )));
        }
        if sem.max_candidates == 0 {
            return Err(ConfigError::Invalid(
                "semantic.max_candidates must be greater than 0".to_string(),
            ));
        }
        if sem.min_candidates > sem.max_candidates {
            return Err(ConfigError::Invalid(format!(
                "semantic.min_candidates ({}) exceeds semantic.max_candidates ({})",
                sem.min_candidates, sem.max_candidates
            )));
        }
        if sem.cache_size == 0 || self.translation.cache_size == 0 {
            return Err(ConfigError::Invalid("cache sizes must be greater than 0".to_string()));
        }
        if sem.inference_timeout_secs == 0
            || self.translation.local.timeout_secs == 0
            || self.translation.external.timeout_secs == 0
            || self.search.timeout_secs == 0
        {
            return Err(ConfigError::Invalid("timeouts must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Resolve provider tags into concrete backends.
    ///
    /// Unknown tags and missing endpoints or keys for the selected provider
    /// are rejected here, once, instead of at call sites.
    pub fn resolve(&self) -> Result<ProviderConfig, ConfigError> {
        self.validate()?;

        Ok(ProviderConfig {
            semantic: self.semantic.clone(),
            translation: self.resolve_translation()?,
            search: self.resolve_search()?,
            base_path: self.base_path.clone(),
        })
    }

    fn resolve_translation(&self) -> Result<ResolvedTranslation, ConfigError> {
        let t = &self.translation;

        let backend = match t.provider.trim().to_lowercase().as_str() {
            "none" | "" => TranslationBackend::None,
            "local" | "libretranslate" => TranslationBackend::Local {
                endpoint: t
                    .local
                    .endpoint
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .ok_or(ConfigError::MissingEndpoint { provider: "local" })?,
                api_key: t.local.api_key.clone(),
                timeout: Duration::from_secs(t.local.timeout_secs),
            },
            "external" | "deepl" => TranslationBackend::External {
                endpoint: t
                    .external
                    .endpoint
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .ok_or(ConfigError::MissingEndpoint { provider: "external" })?,
                api_key: t
                    .external
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(ConfigError::MissingApiKey { provider: "external" })?,
                timeout: Duration::from_secs(t.external.timeout_secs),
            },
            other => {
                return Err(ConfigError::UnknownProvider {
                    kind: "translation",
                    name: other.to_string(),
                })
            }
        };

        Ok(ResolvedTranslation {
            enabled: t.enabled,
            backend,
            target_language: t.target_language.clone(),
            source_language: t.source_language.clone(),
            cache_size: t.cache_size,
        })
    }

    fn resolve_search(&self) -> Result<SearchBackend, ConfigError> {
        let s = &self.search;

        match s.provider.trim().to_lowercase().as_str() {
            "pexels" => Ok(SearchBackend::Pexels {
                endpoint: s.endpoint.clone(),
                api_key: s
                    .pexels_api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(ConfigError::MissingApiKey { provider: "pexels" })?,
                timeout: Duration::from_secs(s.timeout_secs),
            }),
            "catalog" => Ok(SearchBackend::Catalog {
                path: s
                    .catalog_path
                    .clone()
                    .ok_or(ConfigError::MissingEndpoint { provider: "catalog" })?,
            }),
            other => Err(ConfigError::UnknownProvider {
                kind: "search",
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // apply_env reads process-wide variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 12] = [
        "SEMANTIC_ENABLED",
        "SIMILARITY_THRESHOLD",
        "MIN_CANDIDATES",
        "MAX_CANDIDATES",
        "TRANSLATION_ENABLED",
        "TRANSLATION_PROVIDER",
        "TARGET_LANGUAGE",
        "LIBRETRANSLATE_URL",
        "LIBRETRANSLATE_TIMEOUT",
        "DEEPL_URL",
        "DEEPL_API_KEY",
        "PEXELS_API_KEY",
    ];

    /// Run `f` with exactly `vars` set among the override variables.
    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let result = f();

        for (key, _) in vars {
            std::env::remove_var(key);
        }
        result
    }

    fn parse(yaml: &str) -> Config {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_env_flags() {
        let config = with_env(
            &[("SEMANTIC_ENABLED", "off"), ("TRANSLATION_ENABLED", " On ")],
            || {
                let mut config = parse("{}");
                config.apply_env().map(|_| config)
            },
        )
        .unwrap();

        assert!(!config.semantic.enabled);
        assert!(config.translation.enabled);
    }

    #[test]
    fn test_env_invalid_flag_rejected() {
        let result = with_env(&[("SEMANTIC_ENABLED", "enabled")], || parse("{}").apply_env());
        assert!(matches!(result, Err(ConfigError::Invalid(ref msg)) if msg.contains("SEMANTIC_ENABLED")));
    }

    #[test]
    fn test_env_numbers_and_strings() {
        let config = with_env(
            &[
                ("SIMILARITY_THRESHOLD", "0.45"),
                ("MIN_CANDIDATES", "4"),
                ("TRANSLATION_PROVIDER", "local"),
                ("LIBRETRANSLATE_URL", "http://lt:5000"),
                ("PEXELS_API_KEY", "px-key"),
            ],
            || {
                let mut config = parse("semantic:\n  min_candidates: 10\n");
                config.apply_env().map(|_| config)
            },
        )
        .unwrap();

        assert!((config.semantic.similarity_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.semantic.min_candidates, 4);
        assert_eq!(config.translation.provider, "local");
        assert_eq!(config.translation.local.endpoint.as_deref(), Some("http://lt:5000"));
        assert_eq!(config.search.pexels_api_key.as_deref(), Some("px-key"));
    }

    #[test]
    fn test_env_invalid_number_rejected() {
        let result = with_env(&[("MAX_CANDIDATES", "twenty")], || parse("{}").apply_env());
        assert!(matches!(result, Err(ConfigError::Invalid(ref msg)) if msg.contains("MAX_CANDIDATES")));
    }

    #[test]
    fn test_load_applies_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = with_env(&[("TARGET_LANGUAGE", "de")], || Config::load_with(dir.path())).unwrap();
        assert_eq!(config.translation.target_language, "de");
    }

    #[test]
    fn test_defaults() {
        let config = parse("{}");
        assert!(config.semantic.enabled);
        assert!((config.semantic.similarity_threshold - 0.30).abs() < f32::EPSILON);
        assert_eq!(config.semantic.min_candidates, 8);
        assert_eq!(config.semantic.max_candidates, 20);
        assert!(!config.translation.enabled);
        assert_eq!(config.translation.target_language, "en");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_local_translation() {
        let config = parse(
            r#"
translation:
  enabled: true
  provider: local
  local:
    endpoint: http://translate:5000
    timeout_secs: 3
search:
  provider: catalog
  catalog_path: /tmp/catalog.json
"#,
        );

        let resolved = config.resolve().unwrap();
        assert_eq!(
            resolved.translation.backend,
            TranslationBackend::Local {
                endpoint: "http://translate:5000".to_string(),
                api_key: None,
                timeout: Duration::from_secs(3),
            }
        );
        assert_eq!(
            resolved.search,
            SearchBackend::Catalog { path: PathBuf::from("/tmp/catalog.json") }
        );
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = parse(
            r#"
translation:
  provider: babelfish
search:
  provider: catalog
  catalog_path: c.json
"#,
        );

        let err = config.resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownProvider { kind: "translation", ref name } if name == "babelfish"
        ));
    }

    #[test]
    fn test_external_requires_api_key() {
        let config = parse(
            r#"
translation:
  enabled: true
  provider: external
search:
  provider: catalog
  catalog_path: c.json
"#,
        );

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::MissingApiKey { provider: "external" })
        ));
    }

    #[test]
    fn test_local_requires_endpoint() {
        let config = parse(
            r#"
translation:
  provider: local
  local:
    endpoint: ""
search:
  provider: catalog
  catalog_path: c.json
"#,
        );

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::MissingEndpoint { provider: "local" })
        ));
    }

    #[test]
    fn test_pexels_requires_api_key() {
        let config = parse("search:\n  provider: pexels\n");
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::MissingApiKey { provider: "pexels" })
        ));
    }

    #[test]
    fn test_validate_candidate_bounds() {
        let config = parse("semantic:\n  min_candidates: 30\n  max_candidates: 20\n");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = parse("semantic:\n  similarity_threshold: 1.5\n");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();

        let config = with_env(&[], || Config::load_with(dir.path())).unwrap();
        assert!(dir.path().join(CONFIG_FILE).exists());
        assert_eq!(config.base_path(), dir.path());
        assert_eq!(config.semantic.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_load_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "semantic:\n  similarity_threshold: 0.42\n  min_candidates: 3\n",
        )
        .unwrap();

        let config = with_env(&[], || Config::load_with(dir.path())).unwrap();
        assert!((config.semantic.similarity_threshold - 0.42).abs() < f32::EPSILON);
        assert_eq!(config.semantic.min_candidates, 3);
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "semantic: [unclosed").unwrap();

        assert!(matches!(
            with_env(&[], || Config::load_with(dir.path())),
            Err(ConfigError::Parse(_))
        ));
    }
}
