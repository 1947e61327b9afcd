use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubtransError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    TranslationFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SubtransError {
    /// Short name of the error kind, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::BackendUnavailable(_) => "BackendUnavailable",
            Self::ModelUnavailable(_) => "ModelUnavailable",
            Self::TranslationFailure(_) => "TranslationFailure",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Http(_) => "Http",
        }
    }

    /// Fold plumbing errors raised inside a backend call into `TranslationFailure`.
    /// Taxonomy kinds pass through untouched.
    pub fn into_backend_failure(self) -> Self {
        match self {
            Self::InvalidInput(_)
            | Self::BackendUnavailable(_)
            | Self::ModelUnavailable(_)
            | Self::TranslationFailure(_) => self,
            other => Self::TranslationFailure(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubtransError>;
