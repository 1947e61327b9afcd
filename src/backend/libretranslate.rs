use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{LanguagePair, TranslationBackend};
use crate::config::LibreTranslateConfig;
use crate::error::{Result, SubtransError};

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageEntry {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Absent on older servers, where every language translates to every other
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

/// `q` is a single string or a list of strings
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Query<'a> {
    One(&'a str),
    Many(&'a [String]),
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: Query<'a>,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslatedText {
    One(String),
    Many(Vec<String>),
}

impl TranslatedText {
    fn into_lines(self) -> Vec<String> {
        match self {
            Self::One(text) => vec![text],
            Self::Many(texts) => texts,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: TranslatedText,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Expand the `/languages` listing into translation directions
pub fn pairs_from_languages(languages: &[LanguageEntry]) -> Vec<LanguagePair> {
    let mut pairs = Vec::new();
    for language in languages {
        match &language.targets {
            Some(targets) => pairs.extend(
                targets
                    .iter()
                    .filter(|target| **target != language.code)
                    .map(|target| LanguagePair::new(&language.code, target)),
            ),
            None => pairs.extend(
                languages
                    .iter()
                    .filter(|other| other.code != language.code)
                    .map(|other| LanguagePair::new(&language.code, &other.code)),
            ),
        }
    }
    pairs
}

/// LibreTranslate HTTP backend. The server owns its models, so installed and
/// available pairs are the same listing.
pub struct LibreTranslateBackend {
    client: Client,
    config: LibreTranslateConfig,
    api_key: Option<String>,
    languages: OnceCell<Vec<LanguageEntry>>,
}

impl LibreTranslateBackend {
    pub fn new(config: LibreTranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.resolve_api_key(),
            config,
            languages: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn languages(&self) -> Result<&Vec<LanguageEntry>> {
        self.languages.get_or_try_init(|| self.fetch_languages()).await
    }

    async fn fetch_languages(&self) -> Result<Vec<LanguageEntry>> {
        let url = self.url("languages");
        debug!("Fetching language list from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            SubtransError::BackendUnavailable(format!("LibreTranslate not available at {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SubtransError::BackendUnavailable(format!(
                "LibreTranslate language listing failed with status {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(response.json().await?)
    }

    /// POST `/translate` and return one translation per line sent
    async fn post_translate(&self, pair: &LanguagePair, q: Query<'_>, expected: usize) -> Result<Vec<String>> {
        let request = TranslateRequest {
            q,
            source: &pair.from_code,
            target: &pair.to_code,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self.client.post(self.url("translate")).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(SubtransError::TranslationFailure(format!(
                "LibreTranslate error {}: {}",
                status,
                message.trim()
            )));
        }

        let translated = response.json::<TranslateResponse>().await?.translated_text.into_lines();
        if translated.len() != expected {
            return Err(SubtransError::TranslationFailure(format!(
                "LibreTranslate returned {} translations for {} lines",
                translated.len(),
                expected
            )));
        }

        Ok(translated)
    }
}

#[async_trait]
impl TranslationBackend for LibreTranslateBackend {
    fn name(&self) -> &'static str {
        "LibreTranslate"
    }

    async fn check_availability(&self) -> Result<()> {
        let languages = self.languages().await?;
        debug!("LibreTranslate offers {} languages", languages.len());
        Ok(())
    }

    async fn list_installed(&self) -> Result<Vec<LanguagePair>> {
        Ok(pairs_from_languages(self.languages().await?))
    }

    async fn list_available(&self) -> Result<Vec<LanguagePair>> {
        self.list_installed().await
    }

    async fn install(&self, pair: &LanguagePair) -> Result<()> {
        Err(SubtransError::ModelUnavailable(format!(
            "No {} package for {}: models are managed by the server at {}",
            self.name(),
            pair,
            self.config.endpoint
        )))
    }

    async fn translate(&self, pair: &LanguagePair, text: &str) -> Result<String> {
        let mut translated = self.post_translate(pair, Query::One(text), 1).await?;
        Ok(translated.pop().unwrap_or_default())
    }

    async fn translate_batch(&self, pair: &LanguagePair, texts: &[String]) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.post_translate(pair, Query::Many(texts), texts.len()).await
    }
}
