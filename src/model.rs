//! Canonical document model for a converted article.
//!
//! Source adapters produce this shape; every exporter consumes it read-only.
//! Serialized field names match the JSON article files accepted by `convert`.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Heading level used when a heading block carries no `level`.
pub const DEFAULT_HEADING_LEVEL: u8 = 2;
pub const MIN_HEADING_LEVEL: u8 = 1;
pub const MAX_HEADING_LEVEL: u8 = 9;
/// Section titles sit one level above the default block heading.
pub const SECTION_HEADING_LEVEL: u8 = DEFAULT_HEADING_LEVEL - 1;

/// String-keyed auxiliary data on a block. Ordered so iteration is deterministic.
pub type Metadata = BTreeMap<String, Value>;

/// Kind of a [ContentBlock].
///
/// Serialized as its lowercase name. Names outside the known set are kept as
/// `Unrecognized` and render as plain paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Text,
    Image,
    Code,
    Quote,
    List,
    Heading,
    Unrecognized(String),
}

impl BlockKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Code => "code",
            BlockKind::Quote => "quote",
            BlockKind::List => "list",
            BlockKind::Heading => "heading",
            BlockKind::Unrecognized(name) => name,
        }
    }
}

impl From<String> for BlockKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => BlockKind::Text,
            "image" => BlockKind::Image,
            "code" => BlockKind::Code,
            "quote" => BlockKind::Quote,
            "list" => BlockKind::List,
            "heading" => BlockKind::Heading,
            _ => BlockKind::Unrecognized(s),
        }
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered or unordered list, from the `list_type` metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

/// Where an image block points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Remote(&'a str),
    Local(&'a Path),
}

/// Smallest typed unit of article content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl ContentBlock {
    pub fn new(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(BlockKind::Text, content)
    }

    pub fn heading(content: impl Into<String>, level: i64) -> Self {
        Self::new(BlockKind::Heading, content).with_meta("level", level)
    }

    pub fn code(content: impl Into<String>, language: Option<&str>) -> Self {
        let block = Self::new(BlockKind::Code, content);
        match language {
            Some(lang) => block.with_meta("language", lang),
            None => block,
        }
    }

    pub fn quote(content: impl Into<String>) -> Self {
        Self::new(BlockKind::Quote, content)
    }

    pub fn list(content: impl Into<String>, kind: ListKind) -> Self {
        let list_type = match kind {
            ListKind::Ordered => "ordered",
            ListKind::Unordered => "unordered",
        };
        Self::new(BlockKind::List, content).with_meta("list_type", list_type)
    }

    pub fn image(source: impl Into<String>, alt: Option<&str>) -> Self {
        let block = Self::new(BlockKind::Image, source);
        match alt {
            Some(alt) => block.with_meta("alt", alt),
            None => block,
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Heading level clamped to 1..=9; 2 when absent or not an integer.
    pub fn heading_level(&self) -> u8 {
        let level = match self.metadata.get("level") {
            Some(v) => match (v.as_i64(), v.as_u64()) {
                (Some(l), _) => l,
                (None, Some(_)) => i64::MAX,
                (None, None) => return DEFAULT_HEADING_LEVEL,
            },
            None => return DEFAULT_HEADING_LEVEL,
        };
        level.clamp(MIN_HEADING_LEVEL as i64, MAX_HEADING_LEVEL as i64) as u8
    }

    /// Code language hint, if non-empty.
    pub fn language(&self) -> Option<&str> {
        self.str_meta("language")
    }

    /// Image alt text, if non-empty.
    pub fn alt(&self) -> Option<&str> {
        self.str_meta("alt")
    }

    pub fn list_kind(&self) -> ListKind {
        match self.str_meta("list_type") {
            Some("ordered") => ListKind::Ordered,
            _ => ListKind::Unordered,
        }
    }

    /// List items: one per line, blank lines dropped.
    pub fn list_items(&self) -> Vec<&str> {
        self.content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn image_source(&self) -> ImageSource<'_> {
        let src = self.content.trim();
        if src.starts_with("http://") || src.starts_with("https://") {
            ImageSource::Remote(src)
        } else {
            ImageSource::Local(Path::new(src))
        }
    }

    /// Text substituted for an image that cannot be embedded.
    pub fn image_placeholder(&self) -> String {
        format!("[Image: {}]", self.alt().unwrap_or("Image"))
    }

    fn str_meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Optional named grouping of blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            blocks: Vec::new(),
        }
    }

    pub fn untitled() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Title, if present and non-blank.
    pub fn heading(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// One element of [Article::content]: a section or a bare block.
///
/// Untagged in JSON; a block is recognized by its `type` and `content` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentItem {
    Block(ContentBlock),
    Section(Section),
}

impl ContentItem {
    /// Blocks of this item in render order.
    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            ContentItem::Block(block) => std::slice::from_ref(block),
            ContentItem::Section(section) => &section.blocks,
        }
    }
}

impl From<ContentBlock> for ContentItem {
    fn from(block: ContentBlock) -> Self {
        ContentItem::Block(block)
    }
}

impl From<Section> for ContentItem {
    fn from(section: Section) -> Self {
        ContentItem::Section(section)
    }
}

/// Publication date: free text or an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleDate {
    Timestamp(DateTime<FixedOffset>),
    Text(String),
}

impl fmt::Display for ArticleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleDate::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d")),
            ArticleDate::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ArticleDate {
    fn from(s: &str) -> Self {
        ArticleDate::Text(s.to_string())
    }
}

impl From<String> for ArticleDate {
    fn from(s: String) -> Self {
        ArticleDate::Text(s)
    }
}

impl From<DateTime<FixedOffset>> for ArticleDate {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        ArticleDate::Timestamp(ts)
    }
}

/// Root document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub author: String,
    pub date: ArticleDate,
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_reading_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Malformed article input rejected before rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("heading \"{heading}\" has negative level {level}")]
    NegativeHeadingLevel { heading: String, level: i64 },

    #[error("heading \"{heading}\" has non-integer level {value}")]
    InvalidHeadingLevel { heading: String, value: String },
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        date: impl Into<ArticleDate>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            date: date.into(),
            content: Vec::new(),
            estimated_reading_time: None,
            url: None,
            tags: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: impl Into<ContentItem>) -> Self {
        self.content.push(item.into());
        self
    }

    /// All blocks in document order, sections flattened.
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.content.iter().flat_map(ContentItem::blocks)
    }

    /// `By <author> | <date>`, or `By <author>` when the date is blank.
    pub fn byline(&self) -> String {
        let date = self.date.to_string();
        if date.trim().is_empty() {
            format!("By {}", self.author)
        } else {
            format!("By {} | {}", self.author, date)
        }
    }

    /// Tags as `#tag` (inner spaces removed), comma separated. None when there are no tags.
    pub fn tag_line(&self) -> Option<String> {
        if self.tags.is_empty() {
            return None;
        }
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| format!("#{}", t.replace(' ', "")))
            .collect();
        Some(tags.join(", "))
    }

    /// `<n> min read`, or None when the reading time is absent or zero.
    pub fn reading_time_label(&self) -> Option<String> {
        self.estimated_reading_time
            .filter(|&m| m > 0)
            .map(|m| format!("{} min read", m))
    }

    /// Reject input no exporter can render faithfully.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for block in self.blocks() {
            if block.kind != BlockKind::Heading {
                continue;
            }
            let Some(level) = block.metadata.get("level") else {
                continue;
            };
            if let Some(l) = level.as_i64() {
                if l < 0 {
                    return Err(ValidationError::NegativeHeadingLevel {
                        heading: block.content.clone(),
                        level: l,
                    });
                }
            } else if level.as_u64().is_none() {
                return Err(ValidationError::InvalidHeadingLevel {
                    heading: block.content.clone(),
                    value: level.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_article() -> Article {
    Article {
        title: "Sample Article Title".to_string(),
        author: "Sample Author".to_string(),
        date: "2023-01-01".into(),
        content: vec![
            ContentBlock::text("This is a sample paragraph of text for testing purposes.").into(),
            Section::new("Sample Section")
                .with_block(ContentBlock::text("This is text inside a section."))
                .with_block(ContentBlock::code("print('Hello, world!')", Some("python")))
                .into(),
            ContentBlock::image("https://example.com/image.jpg", Some("Sample image")).into(),
        ],
        estimated_reading_time: Some(5),
        url: Some("https://medium.com/sample-article".to_string()),
        tags: vec!["test".to_string(), "sample".to_string()],
    }
}
