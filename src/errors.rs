//! Typed error hierarchy for lessongate.
//!
//! `GateError` is the single taxonomy shared by the Progress Writer, the
//! Access Gate and the Redirect Advisor. Engine failures from
//! `lessongate-common` convert into it; store failures arrive as
//! `anyhow::Error` and are wrapped in `StoreUnavailable`.

use lessongate_common::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Content not found: {}{}", .module, .section.as_deref().map(|s| format!("/{}", s)).unwrap_or_default())]
    ContentNotFound {
        module: String,
        section: Option<String>,
    },

    #[error("Invalid status '{0}'. Valid values: not_started, in_progress, completed, skipped")]
    InvalidStatus(String),

    #[error("Invalid completion percentage {0}: must be between 0 and 100")]
    InvalidPercentage(f64),

    #[error("No enrollment profile for learner '{learner_id}'")]
    ProfileNotFound { learner_id: String },

    #[error("Catalog has no modules with sections")]
    CatalogEmpty,

    #[error("Module '{slug}' has no sections")]
    EmptyModule { slug: String },

    #[error("'{caller}' may not act on learner '{learner_id}'")]
    Forbidden { caller: String, learner_id: String },

    #[error("Request carries no learner identity")]
    Unauthenticated,

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Progress store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),
}

impl GateError {
    /// Machine-readable kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContentNotFound { .. } => "ContentNotFound",
            Self::InvalidStatus(_) => "InvalidStatus",
            Self::InvalidPercentage(_) => "InvalidPercentage",
            Self::ProfileNotFound { .. } => "ProfileNotFound",
            Self::CatalogEmpty => "CatalogEmpty",
            Self::EmptyModule { .. } => "EmptyModule",
            Self::Forbidden { .. } => "Forbidden",
            Self::Unauthenticated => "Unauthenticated",
            Self::InvalidCatalog(_) => "InvalidCatalog",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::StoreUnavailable(_) => "StoreUnavailable",
        }
    }

    /// Data-integrity or I/O fault: details stay in the logs.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::CatalogEmpty | Self::EmptyModule { .. } | Self::StoreUnavailable(_)
        )
    }
}

impl From<EngineError> for GateError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CatalogEmpty => Self::CatalogEmpty,
            EngineError::EmptyModule { slug } => Self::EmptyModule { slug },
            EngineError::ContentNotFound { module, section } => {
                Self::ContentNotFound { module, section }
            }
            EngineError::InvalidStatus(s) => Self::InvalidStatus(s),
        }
    }
}
