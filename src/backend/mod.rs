// Translation backends
//
// The adapter talks to translation engines only through `TranslationBackend`:
// - Argos: argospm for package management, argos-translate for text
// - LibreTranslate: HTTP server with server-managed models

pub mod argos;
pub mod command;
pub mod libretranslate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use argos::ArgosBackend;
pub use command::BackendCommand;
pub use libretranslate::LibreTranslateBackend;

use crate::config::{BackendConfig, BackendKind};
use crate::error::Result;

/// Ordered translation direction. Codes are lower-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub from_code: String,
    pub to_code: String,
}

impl LanguagePair {
    pub fn new(from_code: &str, to_code: &str) -> Self {
        Self {
            from_code: from_code.to_lowercase(),
            to_code: to_code.to_lowercase(),
        }
    }

    /// Source and target are the same language
    pub fn is_identity(&self) -> bool {
        self.from_code == self.to_code
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from_code, self.to_code)
    }
}

/// Model management and translation operations of a translation engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Human readable backend name, used in error messages
    fn name(&self) -> &'static str;

    /// Verify the backend can be reached at all
    async fn check_availability(&self) -> Result<()>;

    /// Language pairs with a locally installed model
    async fn list_installed(&self) -> Result<Vec<LanguagePair>>;

    /// Language pairs that can be downloaded and installed
    async fn list_available(&self) -> Result<Vec<LanguagePair>>;

    /// Download and install the model for `pair`
    async fn install(&self, pair: &LanguagePair) -> Result<()>;

    /// Translate one line of text with the installed model for `pair`
    async fn translate(&self, pair: &LanguagePair, text: &str) -> Result<String>;

    /// Translate several lines with one model load. Returns exactly one
    /// translation per input line, in input order.
    async fn translate_batch(&self, pair: &LanguagePair, texts: &[String]) -> Result<Vec<String>>;
}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create the backend selected by `config.kind`. Performs no I/O.
    pub fn create_backend(config: &BackendConfig) -> Result<Box<dyn TranslationBackend>> {
        match config.kind {
            BackendKind::Argos => Ok(Box::new(ArgosBackend::new(config.argos.clone())?)),
            BackendKind::LibreTranslate => Ok(Box::new(LibreTranslateBackend::new(
                config.libretranslate.clone(),
            )?)),
        }
    }
}
