//! Article page parser. Produces the canonical [Article] from raw HTML.
//!
//! Metadata comes from Open Graph / article meta tags with `<h1>`/`<title>` fallbacks. The
//! body is walked in document order: `h1`/`h2` open sections, deeper headings become heading
//! blocks, and paragraphs, code, quotes, lists and images become blocks of the open section
//! (or top-level blocks before the first section).

use super::{strip_title_site_suffix, SourceError};
use crate::model::{Article, ArticleDate, ContentBlock, ContentItem, ListKind, Section};
use chrono::DateTime;
use scraper::{ElementRef, Html, Node, Selector};

const TITLE_SUFFIXES: &[&str] = &[" | Medium", " - Medium"];

/// Elements whose subtree never carries article content.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "aside", "form", "button", "svg", "iframe",
];

/// Parse a CSS selector or return a parse error (avoids panics from Selector::parse).
fn parse_selector(sel: &str) -> Result<Selector, SourceError> {
    Selector::parse(sel).map_err(|e| SourceError::Parse {
        message: format!("invalid selector {:?}: {}", sel, e),
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn meta_content(doc: &Html, selector: &str) -> Result<Option<String>, SourceError> {
    let sel = parse_selector(selector)?;
    Ok(doc
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|s| !s.is_empty()))
}

fn first_text(doc: &Html, selector: &str) -> Result<Option<String>, SourceError> {
    let sel = parse_selector(selector)?;
    Ok(doc.select(&sel).map(element_text).find(|s| !s.is_empty()))
}

/// Leading minutes of an `N min read` label.
fn parse_reading_time(label: &str) -> Option<u32> {
    let lower = label.to_lowercase();
    let idx = lower.find("min read")?;
    lower[..idx].trim().rsplit(' ').next()?.parse().ok()
}

/// Parse an article page. `url` is recorded on the article when given.
pub fn parse_article(html: &str, url: Option<&str>) -> Result<Article, SourceError> {
    let doc = Html::parse_document(html);

    let title = match meta_content(&doc, r#"meta[property="og:title"]"#)? {
        Some(t) => Some(t),
        None => match first_text(&doc, "h1")? {
            Some(t) => Some(t),
            None => first_text(&doc, "title")?,
        },
    }
    .map(|t| strip_title_site_suffix(&t, TITLE_SUFFIXES))
    .unwrap_or_default();

    let author = match meta_content(&doc, r#"meta[name="author"]"#)? {
        Some(a) => a,
        None => first_text(&doc, r#"[rel="author"]"#)?.unwrap_or_default(),
    };

    let date = match meta_content(&doc, r#"meta[property="article:published_time"]"#)? {
        Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
            Ok(ts) => ArticleDate::Timestamp(ts),
            Err(_) => ArticleDate::Text(raw),
        },
        None => ArticleDate::Text(String::new()),
    };

    let tag_sel = parse_selector(r#"meta[property="article:tag"]"#)?;
    let mut tags: Vec<String> = Vec::new();
    for tag in doc
        .select(&tag_sel)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
    {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let estimated_reading_time = match meta_content(&doc, r#"meta[name="twitter:data1"]"#)? {
        Some(label) => parse_reading_time(&label),
        None => None,
    }
    .or_else(|| {
        doc.root_element()
            .text()
            .find(|t| t.contains("min read"))
            .and_then(parse_reading_time)
    });

    let article_sel = parse_selector("article")?;
    let body_sel = parse_selector("body")?;
    let root = doc
        .select(&article_sel)
        .next()
        .or_else(|| doc.select(&body_sel).next())
        .unwrap_or_else(|| doc.root_element());

    let mut builder = ContentBuilder::new(&title);
    builder.walk(root);
    let content = builder.finish();

    if title.is_empty() && content.is_empty() {
        return Err(SourceError::Parse {
            message: "no title or article content found".to_string(),
        });
    }
    log::debug!(
        "parsed \"{}\": {} top-level items, {} tags",
        title,
        content.len(),
        tags.len()
    );

    let mut article = Article::new(title, author, date);
    article.content = content;
    article.tags = tags;
    article.estimated_reading_time = estimated_reading_time;
    article.url = url.map(str::to_string);
    Ok(article)
}

/// Accumulates blocks into top-level items and the currently open section.
struct ContentBuilder<'t> {
    title: &'t str,
    title_seen: bool,
    content: Vec<ContentItem>,
    current: Option<Section>,
}

impl<'t> ContentBuilder<'t> {
    fn new(title: &'t str) -> Self {
        Self {
            title,
            title_seen: false,
            content: Vec::new(),
            current: None,
        }
    }

    fn push(&mut self, block: ContentBlock) {
        match &mut self.current {
            Some(section) => section.blocks.push(block),
            None => self.content.push(block.into()),
        }
    }

    fn open_section(&mut self, title: String) {
        if let Some(section) = self.current.take() {
            self.content.push(section.into());
        }
        self.current = Some(Section::new(title));
    }

    fn finish(mut self) -> Vec<ContentItem> {
        if let Some(section) = self.current.take() {
            self.content.push(section.into());
        }
        self.content
    }

    fn walk(&mut self, el: ElementRef<'_>) {
        for child in el.children().filter_map(ElementRef::wrap) {
            self.visit(child);
        }
    }

    fn visit(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();
        if SKIPPED.contains(&name) {
            return;
        }
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let text = element_text(el);
                if text.is_empty() {
                    return;
                }
                // The page title usually repeats as the first h1.
                if name == "h1" && !self.title_seen && text == self.title {
                    self.title_seen = true;
                    return;
                }
                match name {
                    "h1" | "h2" => self.open_section(text),
                    _ => {
                        let level = name[1..].parse::<i64>().unwrap_or(2);
                        self.push(ContentBlock::heading(text, level));
                    }
                }
            }
            "p" => {
                let text = element_text(el);
                if !text.is_empty() {
                    self.push(ContentBlock::text(text));
                }
            }
            "pre" => {
                let code = preformatted_text(el);
                if !code.trim().is_empty() {
                    let language = code_language(el);
                    self.push(ContentBlock::code(code, language.as_deref()));
                }
            }
            "blockquote" => {
                let text = element_text(el);
                if !text.is_empty() {
                    self.push(ContentBlock::quote(text));
                }
            }
            "ul" | "ol" => {
                let items: Vec<String> = el
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|li| li.value().name() == "li")
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                if !items.is_empty() {
                    let kind = if name == "ol" {
                        ListKind::Ordered
                    } else {
                        ListKind::Unordered
                    };
                    self.push(ContentBlock::list(items.join("\n"), kind));
                }
            }
            "figure" => {
                let caption = el
                    .children()
                    .filter_map(ElementRef::wrap)
                    .find(|c| c.value().name() == "figcaption")
                    .map(element_text)
                    .filter(|t| !t.is_empty());
                match first_image(el) {
                    Some(img) => {
                        if let Some(block) = image_block(img, caption.as_deref()) {
                            self.push(block);
                        }
                    }
                    None => self.walk(el),
                }
            }
            "img" => {
                if let Some(block) = image_block(el, None) {
                    self.push(block);
                }
            }
            _ => self.walk(el),
        }
    }
}

fn first_image(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .find(|d| d.value().name() == "img")
}

fn image_block(img: ElementRef<'_>, caption: Option<&str>) -> Option<ContentBlock> {
    let attrs = img.value();
    let src = attrs
        .attr("src")
        .or_else(|| attrs.attr("data-src"))
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    let alt = caption.or_else(|| attrs.attr("alt").map(str::trim).filter(|a| !a.is_empty()));
    Some(ContentBlock::image(src, alt))
}

/// Text of a `<pre>` with `<br>` as newlines and whitespace kept.
fn preformatted_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out.trim_matches('\n').to_string()
}

/// Language hint from a `language-*` or `lang-*` class on the `<pre>` or its `<code>`.
fn code_language(el: ElementRef<'_>) -> Option<String> {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .flat_map(|e| e.value().classes())
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .filter(|l| !l.is_empty())
                .map(str::to_string)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Rust in Practice | Medium</title>
  <meta property="og:title" content="Rust in Practice"/>
  <meta name="author" content="Jane Doe"/>
  <meta property="article:published_time" content="2023-05-21T10:30:00.000Z"/>
  <meta property="article:tag" content="Rust"/>
  <meta property="article:tag" content="Programming Languages"/>
  <meta property="article:tag" content="Rust"/>
  <meta name="twitter:data1" content="7 min read"/>
</head>
<body>
<nav><p>Sign in</p></nav>
<article>
  <h1>Rust in Practice</h1>
  <p>Intro paragraph.</p>
  <figure><img src="https://miro.medium.com/hero.png" alt="hero"/><figcaption>A crab</figcaption></figure>
  <h2>Ownership</h2>
  <p>Values have   one owner.</p>
  <pre class="language-rust"><span>fn main() {</span><br/><span>    let x = 1;</span><br/><span>}</span></pre>
  <blockquote>Borrow, don't copy.</blockquote>
  <h3>Details</h3>
  <ol><li>First</li><li> </li><li>Second</li></ol>
  <h2>Wrap up</h2>
  <ul><li>Done</li></ul>
  <script>var tracking = 1;</script>
</article>
</body>
</html>"#;

    #[test]
    fn metadata_from_meta_tags() -> Result<(), SourceError> {
        let article = parse_article(PAGE, Some("https://medium.com/@jane/rust"))?;
        assert_eq!(article.title, "Rust in Practice");
        assert_eq!(article.author, "Jane Doe");
        assert!(matches!(article.date, ArticleDate::Timestamp(_)));
        assert_eq!(article.date.to_string(), "2023-05-21");
        assert_eq!(article.tags, ["Rust", "Programming Languages"]);
        assert_eq!(article.estimated_reading_time, Some(7));
        assert_eq!(article.url.as_deref(), Some("https://medium.com/@jane/rust"));
        Ok(())
    }

    #[test]
    fn body_structure_follows_headings() -> Result<(), SourceError> {
        let article = parse_article(PAGE, None)?;
        assert_eq!(article.content.len(), 4);

        let ContentItem::Block(intro) = &article.content[0] else {
            panic!("expected top-level block, got {:?}", article.content[0]);
        };
        assert_eq!(intro.content, "Intro paragraph.");
        let ContentItem::Block(hero) = &article.content[1] else {
            panic!("expected top-level image, got {:?}", article.content[1]);
        };
        assert_eq!(hero.kind, BlockKind::Image);
        assert_eq!(hero.alt(), Some("A crab"));

        let ContentItem::Section(ownership) = &article.content[2] else {
            panic!("expected section, got {:?}", article.content[2]);
        };
        assert_eq!(ownership.heading(), Some("Ownership"));
        let kinds: Vec<&BlockKind> = ownership.blocks.iter().map(|b| &b.kind).collect();
        assert_eq!(
            kinds,
            [
                &BlockKind::Text,
                &BlockKind::Code,
                &BlockKind::Quote,
                &BlockKind::Heading,
                &BlockKind::List
            ]
        );
        assert_eq!(ownership.blocks[0].content, "Values have one owner.");
        assert_eq!(ownership.blocks[1].content, "fn main() {\n    let x = 1;\n}");
        assert_eq!(ownership.blocks[1].language(), Some("rust"));
        assert_eq!(ownership.blocks[3].heading_level(), 3);
        assert_eq!(ownership.blocks[4].content, "First\nSecond");
        assert_eq!(ownership.blocks[4].list_kind(), ListKind::Ordered);

        let ContentItem::Section(wrap) = &article.content[3] else {
            panic!("expected section, got {:?}", article.content[3]);
        };
        assert_eq!(wrap.heading(), Some("Wrap up"));
        assert_eq!(wrap.blocks.len(), 1);
        Ok(())
    }

    #[test]
    fn skipped_elements_do_not_leak_into_content() -> Result<(), SourceError> {
        let article = parse_article(PAGE, None)?;
        assert!(!article.blocks().any(|b| b.content.contains("Sign in")));
        assert!(!article.blocks().any(|b| b.content.contains("tracking")));
        Ok(())
    }

    #[test]
    fn title_falls_back_to_title_tag_without_site_suffix() -> Result<(), SourceError> {
        let html = "<html><head><title>Plain Post | Medium</title></head><body><p>x</p></body></html>";
        let article = parse_article(html, None)?;
        assert_eq!(article.title, "Plain Post");
        assert_eq!(article.author, "");
        assert!(article.tags.is_empty());
        assert_eq!(article.estimated_reading_time, None);
        Ok(())
    }

    #[test]
    fn non_rfc3339_date_is_kept_as_text() -> Result<(), SourceError> {
        let html = r#"<html><head><meta property="article:published_time" content="May 21, 2023"/>
            <title>T</title></head><body><p>x</p></body></html>"#;
        let article = parse_article(html, None)?;
        assert_eq!(article.date, ArticleDate::Text("May 21, 2023".to_string()));
        Ok(())
    }

    #[test]
    fn reading_time_from_body_label() -> Result<(), SourceError> {
        let html = "<html><head><title>T</title></head><body><span>12 min read</span><p>x</p></body></html>";
        assert_eq!(parse_article(html, None)?.estimated_reading_time, Some(12));
        Ok(())
    }

    #[test]
    fn empty_page_is_a_parse_error() {
        assert!(matches!(
            parse_article("<html><body></body></html>", None),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn reading_time_label_parsing() {
        assert_eq!(parse_reading_time("5 min read"), Some(5));
        assert_eq!(parse_reading_time("Published in X · 11 min read"), Some(11));
        assert_eq!(parse_reading_time("min read"), None);
    }
}
