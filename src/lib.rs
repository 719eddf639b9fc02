//! mediumconv: convert Medium articles to Markdown, DOCX, HTML, LaTeX, EPUB, text, and JSON.

pub mod cli;
pub mod config;
pub mod export;
pub mod model;
pub mod providers;
pub mod source;

// Re-exports for CLI and consumers.
pub use export::{
    Availability, ExportError, ExportOptions, Exporter, Format, FormatStatus, Registry, Rendered,
    Sink,
};
pub use model::{Article, ArticleDate, BlockKind, ContentBlock, ContentItem, Section};
pub use source::{load_article, parse_article, ArticleSource, Fetcher, SourceError};
