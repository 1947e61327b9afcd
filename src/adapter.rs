use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{BackendFactory, LanguagePair, TranslationBackend};
use crate::config::BackendConfig;
use crate::error::{Result, SubtransError};
use crate::payload;

/// Lines to translate for a distinct language pair
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationJob {
    pub pair: LanguagePair,
    pub texts: Vec<String>,
}

/// What a request needs once the payload has been validated
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Source equals target: echo the lines untouched
    Passthrough(Vec<Value>),
    Translate(TranslationJob),
}

impl Plan {
    /// Validate the payload and decide whether a backend is needed at all.
    pub fn prepare(source: &str, target: &str, raw: &[u8]) -> Result<Self> {
        let lines = payload::parse_payload(raw)?;
        let pair = LanguagePair::new(source, target);

        if pair.is_identity() {
            debug!("Source and target are both '{}', passing {} lines through", pair.from_code, lines.len());
            return Ok(Self::Passthrough(lines));
        }

        let texts = payload::line_texts(&lines)?;
        Ok(Self::Translate(TranslationJob { pair, texts }))
    }
}

/// Drives a translation backend for one job
pub struct Adapter {
    backend: Box<dyn TranslationBackend>,
}

impl Adapter {
    pub fn new(backend: Box<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Make sure a model for `pair` is installed, installing it when the
    /// backend offers one.
    pub async fn ensure_model(&self, pair: &LanguagePair) -> Result<()> {
        let installed = self.backend.list_installed().await?;
        if installed.contains(pair) {
            debug!("Model {} already installed", pair);
            return Ok(());
        }

        let available = self.backend.list_available().await?;
        if !available.contains(pair) {
            return Err(SubtransError::ModelUnavailable(format!(
                "No {} package for {}",
                self.backend.name(),
                pair
            )));
        }

        info!("Installing {} model for {}", self.backend.name(), pair);
        self.backend.install(pair).await
    }

    /// Translate every line in order with a single backend call. Empty lines
    /// never reach the backend.
    pub async fn translate_lines(&self, pair: &LanguagePair, texts: &[String]) -> Result<Vec<String>> {
        let pending: Vec<String> = texts.iter().filter(|t| !t.is_empty()).cloned().collect();
        if pending.is_empty() {
            return Ok(vec![String::new(); texts.len()]);
        }

        debug!("Translating {} of {} lines in one batch", pending.len(), texts.len());
        let translated = self.backend.translate_batch(pair, &pending).await?;
        if translated.len() != pending.len() {
            return Err(SubtransError::TranslationFailure(format!(
                "{} returned {} translations for {} lines",
                self.backend.name(),
                translated.len(),
                pending.len()
            )));
        }

        let mut translated = translated.into_iter();
        Ok(texts
            .iter()
            .map(|text| {
                if text.is_empty() {
                    String::new()
                } else {
                    translated.next().unwrap_or_default()
                }
            })
            .collect())
    }

    /// Resolve the model, then translate the job's lines
    pub async fn execute(&self, job: &TranslationJob) -> Result<Vec<String>> {
        info!("Translating {} lines {} with {}", job.texts.len(), job.pair, self.backend.name());

        let result = async {
            self.backend.check_availability().await?;
            self.ensure_model(&job.pair).await?;
            self.translate_lines(&job.pair, &job.texts).await
        }
        .await;

        result.map_err(SubtransError::into_backend_failure)
    }
}

/// Full request: validate, short-circuit identity pairs, otherwise load the
/// backend configuration, build the backend and translate.
///
/// `load_config` only runs on the translation path, so configuration problems
/// never affect identity requests or payload validation.
pub async fn run<F>(source: &str, target: &str, raw: &[u8], load_config: F) -> Result<Vec<Value>>
where
    F: FnOnce() -> Result<BackendConfig>,
{
    match Plan::prepare(source, target, raw)? {
        Plan::Passthrough(lines) => Ok(lines),
        Plan::Translate(job) => {
            let config = load_config()?;
            let backend = BackendFactory::create_backend(&config)?;
            let translated = Adapter::new(backend).execute(&job).await?;
            Ok(translated.into_iter().map(Value::String).collect())
        }
    }
}
