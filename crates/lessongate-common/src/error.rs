use thiserror::Error;

/// Failures the pure engine can report. None of them involve I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Catalog has no modules with sections")]
    CatalogEmpty,

    #[error("Module '{slug}' has no sections")]
    EmptyModule { slug: String },

    #[error("Content not found: {}{}", .module, .section.as_deref().map(|s| format!("/{}", s)).unwrap_or_default())]
    ContentNotFound {
        module: String,
        section: Option<String>,
    },

    #[error("Invalid status '{0}'. Valid values: not_started, in_progress, completed, skipped")]
    InvalidStatus(String),
}
