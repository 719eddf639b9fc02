//! Exporter contract and format renderers.
//!
//! Every renderer implements [Exporter]: it turns a read-only [Article] into [Rendered]
//! output and optionally writes it to a [Sink]. [Registry] maps format identifiers to
//! renderers and reports which ones this build can construct.

mod docx;
mod epub;
mod error;
mod html;
mod json;
mod latex;
mod markdown;
mod registry;
mod text;

pub use docx::DocxExporter;
pub use epub::EpubExporter;
pub use error::ExportError;
pub use html::HtmlExporter;
pub use json::JsonExporter;
pub use latex::LatexExporter;
pub use markdown::MarkdownExporter;
pub use registry::{probe, Availability, ExportOptions, FormatStatus, Registry};
pub use text::TextExporter;

use crate::model::{Article, ContentBlock, ContentItem};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Output format identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    Markdown,
    Text,
    Html,
    Latex,
    Epub,
    Docx,
    Json,
}

impl Format {
    pub const ALL: [Format; 7] = [
        Format::Markdown,
        Format::Text,
        Format::Html,
        Format::Latex,
        Format::Epub,
        Format::Docx,
        Format::Json,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Format::Markdown => "markdown",
            Format::Text => "text",
            Format::Html => "html",
            Format::Latex => "latex",
            Format::Epub => "epub",
            Format::Docx => "docx",
            Format::Json => "json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Markdown => "md",
            Format::Text => "txt",
            Format::Html => "html",
            Format::Latex => "tex",
            Format::Epub => "epub",
            Format::Docx => "docx",
            Format::Json => "json",
        }
    }

    /// DOCX and EPUB are zip containers; everything else is UTF-8 text.
    pub fn is_binary(self) -> bool {
        matches!(self, Format::Epub | Format::Docx)
    }

    /// Case-insensitive lookup by identifier or common alias.
    pub fn from_id(s: &str) -> Option<Format> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Some(Format::Markdown),
            "text" | "txt" | "plain" => Some(Format::Text),
            "html" | "htm" => Some(Format::Html),
            "latex" | "tex" => Some(Format::Latex),
            "epub" => Some(Format::Epub),
            "docx" | "word" => Some(Format::Docx),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Format {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::from_id(s).ok_or_else(|| ExportError::UnsupportedFormat {
            format: s.to_string(),
            reason: None,
        })
    }
}

/// Fully rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Text(String),
    Binary(Vec<u8>),
}

impl Rendered {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Rendered::Text(s) => s.as_bytes(),
            Rendered::Binary(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Rendered::Text(s) => s.into_bytes(),
            Rendered::Binary(b) => b,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Rendered::Text(s) => Some(s),
            Rendered::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Optional destination an export also writes to.
pub enum Sink<'a> {
    /// Written atomically: a temporary file in the same directory is renamed into place.
    Path(&'a Path),
    /// Any open writer (file handle, stdout, in-memory buffer).
    Writer(&'a mut dyn Write),
}

impl Sink<'_> {
    fn describe(&self) -> String {
        match self {
            Sink::Path(path) => path.display().to_string(),
            Sink::Writer(_) => "output stream".to_string(),
        }
    }

    fn write(self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Sink::Path(path) => {
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                let mut tmp = temp_file_in(dir)?;
                tmp.write_all(bytes)?;
                if let Ok(existing) = std::fs::metadata(path) {
                    tmp.as_file().set_permissions(existing.permissions())?;
                }
                tmp.as_file().sync_all()?;
                tmp.persist(path).map_err(|e| e.error)?;
                Ok(())
            }
            Sink::Writer(w) => {
                w.write_all(bytes)?;
                w.flush()
            }
        }
    }
}

/// A temporary file created with the mode a plain `File::create` would get (0666 less umask).
fn temp_file_in(dir: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// A format renderer.
///
/// Implementors provide [render](Exporter::render); [export](Exporter::export) validates the
/// article, renders it, and writes the optional sink. Renderers hold no per-call state, so one
/// instance can serve many threads.
pub trait Exporter: Send + Sync {
    fn format(&self) -> Format;

    /// Render the article in memory. Must not mutate or retain the article.
    fn render(&self, article: &Article) -> Result<Rendered, ExportError>;

    /// Render the article and, if given, write it to `sink`.
    ///
    /// On a sink failure the returned [ExportError::Io] still carries the rendered output.
    fn export(&self, article: &Article, sink: Option<Sink<'_>>) -> Result<Rendered, ExportError> {
        article.validate()?;
        let rendered = self.render(article)?;
        log::debug!(
            "rendered \"{}\" as {} ({} bytes)",
            article.title,
            self.format(),
            rendered.len()
        );
        if let Some(sink) = sink {
            let target = sink.describe();
            if let Err(source) = sink.write(rendered.as_bytes()) {
                return Err(ExportError::Io {
                    target,
                    rendered: Box::new(rendered),
                    source,
                });
            }
        }
        Ok(rendered)
    }
}

/// One step of an article's render order: a section heading or a block.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Node<'a> {
    SectionTitle(&'a str),
    Block(&'a ContentBlock),
}

/// Flatten `article.content` into render order. Untitled sections contribute blocks only.
pub(crate) fn nodes(article: &Article) -> impl Iterator<Item = Node<'_>> {
    article.content.iter().flat_map(|item| {
        let (title, blocks) = match item {
            ContentItem::Section(s) => (s.heading(), s.blocks.as_slice()),
            ContentItem::Block(b) => (None, std::slice::from_ref(b)),
        };
        title
            .map(Node::SectionTitle)
            .into_iter()
            .chain(blocks.iter().map(Node::Block))
    })
}
