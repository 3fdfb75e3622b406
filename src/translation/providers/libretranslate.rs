use crate::translation::providers::{status_error, TranslationProvider};
use crate::translation::TranslationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

/// Self-hosted LibreTranslate instance (`POST /translate`).
pub struct LibreTranslateProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl LibreTranslateProvider {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl TranslationProvider for LibreTranslateProvider {
    fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let payload = TranslateRequest {
            q: text,
            source: source_lang.unwrap_or("auto"),
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        log::debug!("libretranslate request '{text}' -> {target_lang} at {}", self.endpoint);
        let resp = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&payload)
            .send()
            .map_err(TranslationError::transport)?;

        if !resp.status().is_success() {
            return Err(status_error(resp));
        }

        let body: TranslateResponse = resp
            .json()
            .map_err(|e| TranslationError::Malformed(e.to_string()))?;

        match (body.translated_text, body.error) {
            (Some(text), _) => Ok(text),
            (None, Some(err)) => Err(TranslationError::Malformed(err)),
            (None, None) => Err(TranslationError::Malformed(
                "response has no translatedText".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "libretranslate"
    }

    fn is_reachable(&self) -> bool {
        self.client
            .get(format!("{}/languages", self.endpoint))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
