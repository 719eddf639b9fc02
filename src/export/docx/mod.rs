//! DOCX renderer.
//!
//! Rendering needs docx-rs and image, compiled in by the `docx` feature. Without it the
//! exporter refuses to construct and the registry reports the format as absent.

#[cfg(feature = "docx")]
mod numbering;
#[cfg(feature = "docx")]
mod styles;
#[cfg(feature = "docx")]
mod writer;

use super::{ExportError, Exporter, Format, Rendered};
use crate::model::Article;

/// Whether this build can render DOCX.
pub(crate) const AVAILABLE: bool = cfg!(feature = "docx");
pub(crate) const UNAVAILABLE_REASON: &str = "built without the `docx` feature";

#[derive(Debug, Clone)]
pub struct DocxExporter {
    _capability: (),
}

impl DocxExporter {
    /// Fails with [ExportError::Configuration] when DOCX support is not compiled in.
    pub fn new() -> Result<Self, ExportError> {
        if !AVAILABLE {
            return Err(ExportError::Configuration {
                format: Format::Docx,
                reason: UNAVAILABLE_REASON.to_string(),
            });
        }
        Ok(Self { _capability: () })
    }
}

impl Exporter for DocxExporter {
    fn format(&self) -> Format {
        Format::Docx
    }

    #[cfg(feature = "docx")]
    fn render(&self, article: &Article) -> Result<Rendered, ExportError> {
        writer::render_docx(article).map(Rendered::Binary)
    }

    #[cfg(not(feature = "docx"))]
    fn render(&self, _article: &Article) -> Result<Rendered, ExportError> {
        Err(ExportError::Configuration {
            format: Format::Docx,
            reason: UNAVAILABLE_REASON.to_string(),
        })
    }
}
