//! Shared error type for exporters and the registry.

use super::{Format, Rendered};
use crate::model::ValidationError;
use thiserror::Error;

/// Errors from constructing an exporter, rendering an article, or writing the sink.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A renderer's optional rendering capability is missing. Raised at construction only.
    #[error("{format} export is unavailable: {reason}")]
    Configuration { format: Format, reason: String },

    #[error("Unsupported format: '{format}'{}", reason_suffix(.reason))]
    UnsupportedFormat {
        format: String,
        reason: Option<String>,
    },

    #[error("Invalid article: {0}")]
    Validation(#[from] ValidationError),

    /// The format library failed to serialize the document.
    #[error("Failed to render {format}: {message}")]
    Render { format: Format, message: String },

    /// Writing the sink failed after rendering completed. The rendered output is kept.
    #[error("Failed to write output: {target}: {source}")]
    Io {
        target: String,
        rendered: Box<Rendered>,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub(crate) fn render(format: Format, err: impl std::fmt::Display) -> Self {
        ExportError::Render {
            format,
            message: err.to_string(),
        }
    }

    /// Rendered output carried by a sink failure.
    pub fn rendered(&self) -> Option<&Rendered> {
        match self {
            ExportError::Io { rendered, .. } => Some(rendered),
            _ => None,
        }
    }

    pub fn into_rendered(self) -> Option<Rendered> {
        match self {
            ExportError::Io { rendered, .. } => Some(*rendered),
            _ => None,
        }
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default()
}
