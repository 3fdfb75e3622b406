pub mod deepl;
pub mod libretranslate;

pub use deepl::DeepLProvider;
pub use libretranslate::LibreTranslateProvider;

use crate::translation::TranslationError;

/// Longest slice of an error body kept in logs and errors.
const BODY_PREVIEW_CHARS: usize = 120;

/// Trait for the different translation backends
pub trait TranslationProvider: Send + Sync {
    /// Translate `text` into `target_lang`. `source_lang` of `None` means auto-detect.
    fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<String, TranslationError>;

    /// Get the name of this provider for logging/debugging
    fn name(&self) -> &'static str;

    /// Whether the backend answers at all.
    fn is_reachable(&self) -> bool {
        true
    }

    /// A pass-through provider never changes text and is never called.
    fn is_passthrough(&self) -> bool {
        false
    }
}

/// Enabled translation with provider "none".
pub struct NoOpProvider;

impl TranslationProvider for NoOpProvider {
    fn translate(&self, text: &str, _: Option<&str>, _: &str) -> Result<String, TranslationError> {
        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "none"
    }

    fn is_passthrough(&self) -> bool {
        true
    }
}

/// Turn a non-success response into a `TranslationError::Status`.
pub(crate) fn status_error(resp: reqwest::blocking::Response) -> TranslationError {
    let status = resp.status().as_u16();
    let body: String = resp
        .text()
        .unwrap_or_default()
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect();
    TranslationError::Status { status, body }
}
