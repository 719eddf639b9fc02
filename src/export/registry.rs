//! Format identifier to exporter lookup.
//!
//! Each format's availability is probed once per process. Asking for an absent format fails
//! with [ExportError::UnsupportedFormat]; it never affects the other formats.

use super::docx;
use super::{
    DocxExporter, EpubExporter, ExportError, Exporter, Format, HtmlExporter, JsonExporter,
    LatexExporter, MarkdownExporter, TextExporter,
};
use std::sync::OnceLock;

/// Whether an exporter for a format can be constructed in this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Present,
    Absent { reason: String },
}

impl Availability {
    pub fn is_present(&self) -> bool {
        matches!(self, Availability::Present)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatStatus {
    pub format: Format,
    pub availability: Availability,
}

/// Construction options for exporters that take them.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Custom minijinja page template for HTML.
    pub html_template: Option<String>,
    /// Custom minijinja document template for LaTeX.
    pub latex_template: Option<String>,
    /// Include toc.ncx in EPUB output.
    pub epub_ncx: bool,
}

/// Availability of `format` in this build.
pub fn probe(format: Format) -> Availability {
    match format {
        Format::Docx if !docx::AVAILABLE => Availability::Absent {
            reason: docx::UNAVAILABLE_REASON.to_string(),
        },
        _ => Availability::Present,
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    statuses: Vec<FormatStatus>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Process-wide registry, probed on first use and read-only afterwards.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(|| Registry::from_probe(probe))
    }

    /// Build a registry with a custom availability probe.
    pub fn from_probe(probe: impl Fn(Format) -> Availability) -> Self {
        let statuses = Format::ALL
            .iter()
            .map(|&format| {
                let availability = probe(format);
                if let Availability::Absent { reason } = &availability {
                    log::debug!("{} export unavailable: {}", format, reason);
                }
                FormatStatus {
                    format,
                    availability,
                }
            })
            .collect();
        Self { statuses }
    }

    pub fn statuses(&self) -> &[FormatStatus] {
        &self.statuses
    }

    /// Formats whose exporter can be constructed.
    pub fn available(&self) -> Vec<Format> {
        self.statuses
            .iter()
            .filter(|s| s.availability.is_present())
            .map(|s| s.format)
            .collect()
    }

    pub fn is_available(&self, format: Format) -> bool {
        self.availability(format).is_some_and(Availability::is_present)
    }

    fn availability(&self, format: Format) -> Option<&Availability> {
        self.statuses
            .iter()
            .find(|s| s.format == format)
            .map(|s| &s.availability)
    }

    /// Exporter for a format identifier or alias.
    pub fn exporter(
        &self,
        id: &str,
        options: &ExportOptions,
    ) -> Result<Box<dyn Exporter>, ExportError> {
        let format: Format = id.parse()?;
        self.exporter_for(format, options)
    }

    pub fn exporter_for(
        &self,
        format: Format,
        options: &ExportOptions,
    ) -> Result<Box<dyn Exporter>, ExportError> {
        match self.availability(format) {
            Some(Availability::Present) => construct(format, options),
            Some(Availability::Absent { reason }) => Err(ExportError::UnsupportedFormat {
                format: format.id().to_string(),
                reason: Some(reason.clone()),
            }),
            None => Err(ExportError::UnsupportedFormat {
                format: format.id().to_string(),
                reason: None,
            }),
        }
    }
}

fn construct(format: Format, options: &ExportOptions) -> Result<Box<dyn Exporter>, ExportError> {
    Ok(match format {
        Format::Markdown => Box::new(MarkdownExporter::new()),
        Format::Text => Box::new(TextExporter::new()),
        Format::Html => match &options.html_template {
            Some(template) => Box::new(HtmlExporter::with_template(template.clone())?),
            None => Box::new(HtmlExporter::new()),
        },
        Format::Latex => match &options.latex_template {
            Some(template) => Box::new(LatexExporter::with_template(template.clone())?),
            None => Box::new(LatexExporter::new()),
        },
        Format::Epub => Box::new(EpubExporter::new().with_ncx(options.epub_ncx)),
        Format::Docx => Box::new(DocxExporter::new()?),
        Format::Json => Box::new(JsonExporter::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_article;
    use std::error::Error;

    fn without_docx(format: Format) -> Availability {
        match format {
            Format::Docx => Availability::Absent {
                reason: "docx support missing".to_string(),
            },
            _ => Availability::Present,
        }
    }

    #[test]
    fn absent_format_is_unlisted_and_unsupported() {
        let registry = Registry::from_probe(without_docx);
        let available = registry.available();
        assert!(available.contains(&Format::Markdown));
        assert!(!available.contains(&Format::Docx));
        assert!(!registry.is_available(Format::Docx));

        match registry.exporter("docx", &ExportOptions::default()) {
            Err(ExportError::UnsupportedFormat { format, reason }) => {
                assert_eq!(format, "docx");
                assert_eq!(reason.as_deref(), Some("docx support missing"));
            }
            other => panic!("expected UnsupportedFormat, got {:?}", other.map(|e| e.format())),
        }
    }

    #[test]
    fn other_formats_still_export_when_one_is_absent() -> Result<(), Box<dyn Error>> {
        let registry = Registry::from_probe(without_docx);
        let exporter = registry.exporter("md", &ExportOptions::default())?;
        assert_eq!(exporter.format(), Format::Markdown);
        let rendered = exporter.export(&sample_article(), None)?;
        assert!(rendered
            .as_text()
            .is_some_and(|t| t.starts_with("# Sample Article Title")));
        Ok(())
    }

    #[test]
    fn unknown_identifier_is_unsupported_without_reason() {
        let registry = Registry::from_probe(|_| Availability::Present);
        assert!(matches!(
            registry.exporter("pdf", &ExportOptions::default()),
            Err(ExportError::UnsupportedFormat { reason: None, .. })
        ));
    }

    #[test]
    fn options_reach_constructed_exporters() -> Result<(), Box<dyn Error>> {
        let registry = Registry::from_probe(|_| Availability::Present);
        let options = ExportOptions {
            html_template: Some("<b>{{ title }}</b>".to_string()),
            ..ExportOptions::default()
        };
        let rendered = registry
            .exporter_for(Format::Html, &options)?
            .render(&sample_article())?;
        assert_eq!(rendered.as_text(), Some("<b>Sample Article Title</b>\n"));

        let broken = ExportOptions {
            latex_template: Some("{% if %}".to_string()),
            ..ExportOptions::default()
        };
        assert!(matches!(
            registry.exporter_for(Format::Latex, &broken),
            Err(ExportError::Configuration { .. })
        ));
        Ok(())
    }

    #[test]
    fn global_probe_matches_build_features() {
        let registry = Registry::global();
        assert_eq!(registry.statuses().len(), Format::ALL.len());
        assert_eq!(registry.is_available(Format::Docx), cfg!(feature = "docx"));
        for format in [Format::Markdown, Format::Text, Format::Html, Format::Latex, Format::Epub] {
            assert!(registry.is_available(format));
        }
    }
}
