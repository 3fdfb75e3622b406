use crate::translation::providers::{status_error, TranslationProvider};
use crate::translation::TranslationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api-free.deepl.com";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

/// Hosted DeepL API (`POST /v2/translate`).
pub struct DeepLProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl DeepLProvider {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }
}

impl TranslationProvider for DeepLProvider {
    fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let payload = TranslateRequest {
            text: [text],
            target_lang: target_lang.to_uppercase(),
            source_lang: source_lang.map(str::to_uppercase),
        };

        let resp = self
            .client
            .post(format!("{}/v2/translate", self.endpoint))
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .map_err(TranslationError::transport)?;

        if !resp.status().is_success() {
            return Err(status_error(resp));
        }

        let body: TranslateResponse = resp
            .json()
            .map_err(|e| TranslationError::Malformed(e.to_string()))?;

        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| TranslationError::Malformed("response has no translations".to_string()))
    }

    fn name(&self) -> &'static str {
        "deepl"
    }

    fn is_reachable(&self) -> bool {
        self.client
            .get(format!("{}/v2/usage", self.endpoint))
            .header("Authorization", self.auth_header())
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
