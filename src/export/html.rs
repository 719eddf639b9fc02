//! HTML renderer driven by a minijinja page template.
//!
//! The block markup helpers here are XHTML-compatible and shared with the EPUB writer.

use super::{nodes, ExportError, Exporter, Format, Node, Rendered};
use crate::model::{Article, BlockKind, ContentBlock, ListKind, SECTION_HEADING_LEVEL};
use minijinja::{context, Environment, Value};

const TEMPLATE_NAME: &str = "article.html";

/// Default page. `header` and `content` are pre-rendered markup; every other variable is
/// auto-escaped.
pub const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8"/>
  <meta name="viewport" content="width=device-width, initial-scale=1"/>
  <title>{{ title }}</title>
{%- if author %}
  <meta name="author" content="{{ author }}"/>
{%- endif %}
{%- if tags %}
  <meta name="keywords" content="{{ tags | join(", ") }}"/>
{%- endif %}
  <style>
    body { max-width: 44rem; margin: 2rem auto; padding: 0 1rem; font-family: Georgia, serif; line-height: 1.6; }
    pre { background: #f6f8fa; padding: 1rem; overflow-x: auto; }
    blockquote { border-left: 3px solid #ccc; margin-left: 0; padding-left: 1rem; color: #555; }
    figure { margin: 1.5rem 0; text-align: center; }
    img { max-width: 100%; }
    .byline, .tags, .reading-time { color: #666; margin: 0.25rem 0; }
  </style>
</head>
<body>
<article>
{{ header }}
{{ content }}
{%- if url %}
<footer><p class="source">Originally published at <a href="{{ url }}">{{ url }}</a></p></footer>
{%- endif %}
</article>
</body>
</html>
"#;

/// Where an image element points, decided per block by the caller.
pub(crate) enum ImageTarget {
    Src(String),
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct HtmlExporter {
    template: String,
}

impl Default for HtmlExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlExporter {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_HTML_TEMPLATE.to_string(),
        }
    }

    /// Use a custom page template. It is compiled here so syntax errors surface at construction.
    pub fn with_template(template: impl Into<String>) -> Result<Self, ExportError> {
        let template = template.into();
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, &template)
            .map_err(|e| ExportError::Configuration {
                format: Format::Html,
                reason: format!("invalid HTML template: {}", e),
            })?;
        drop(env);
        Ok(Self { template })
    }
}

impl Exporter for HtmlExporter {
    fn format(&self) -> Format {
        Format::Html
    }

    fn render(&self, article: &Article) -> Result<Rendered, ExportError> {
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, &self.template)
            .map_err(|e| ExportError::render(Format::Html, e))?;
        let template = env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| ExportError::render(Format::Html, e))?;

        let header = render_header(article);
        let content = render_body(article, &mut |block: &ContentBlock| {
            ImageTarget::Src(block.content.trim().to_string())
        });
        let mut out = template
            .render(context! {
                title => article.title,
                author => article.author,
                date => article.date.to_string(),
                byline => article.byline(),
                url => article.url,
                tags => article.tags,
                tag_line => article.tag_line(),
                reading_time => article.reading_time_label(),
                header => Value::from_safe_string(header),
                content => Value::from_safe_string(content),
            })
            .map_err(|e| ExportError::render(Format::Html, e))?;
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(Rendered::Text(out))
    }
}

/// Title heading followed by the byline, tag and reading-time paragraphs present on the article.
pub(crate) fn render_header(article: &Article) -> String {
    let mut out = String::new();
    out.push_str("<header>\n");
    out.push_str(&format!("<h1>{}</h1>\n", html_escape(&article.title)));
    out.push_str(&format!(
        "<p class=\"byline\">{}</p>\n",
        html_escape(&article.byline())
    ));
    if let Some(tags) = article.tag_line() {
        out.push_str(&format!("<p class=\"tags\">{}</p>\n", html_escape(&tags)));
    }
    if let Some(reading_time) = article.reading_time_label() {
        out.push_str(&format!(
            "<p class=\"reading-time\"><em>{}</em></p>\n",
            html_escape(&reading_time)
        ));
    }
    out.push_str("</header>");
    out
}

/// Body markup in document order. `image` decides how each image block is referenced.
pub(crate) fn render_body(
    article: &Article,
    image: &mut dyn FnMut(&ContentBlock) -> ImageTarget,
) -> String {
    let mut out = String::new();
    for node in nodes(article) {
        match node {
            Node::SectionTitle(title) => push_heading(&mut out, SECTION_HEADING_LEVEL, title),
            Node::Block(block) => push_block(&mut out, block, image),
        }
    }
    let end = out.trim_end().len();
    out.truncate(end);
    out
}

/// One titled or untitled run of blocks, as the EPUB writer splits an article into documents.
pub(crate) fn render_part(
    title: Option<&str>,
    blocks: &[&ContentBlock],
    image: &mut dyn FnMut(&ContentBlock) -> ImageTarget,
) -> String {
    let mut out = String::new();
    if let Some(title) = title {
        push_heading(&mut out, SECTION_HEADING_LEVEL, title);
    }
    for block in blocks {
        push_block(&mut out, block, image);
    }
    let end = out.trim_end().len();
    out.truncate(end);
    out
}

fn push_block(
    out: &mut String,
    block: &ContentBlock,
    image: &mut dyn FnMut(&ContentBlock) -> ImageTarget,
) {
    match block.kind {
        BlockKind::Heading => push_heading(out, block.heading_level(), &block.content),
        BlockKind::Code => {
            let code = html_escape(block.content.trim_end_matches('\n'));
            match block.language() {
                Some(lang) => out.push_str(&format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>\n",
                    html_escape(lang),
                    code
                )),
                None => out.push_str(&format!("<pre><code>{}</code></pre>\n", code)),
            }
        }
        BlockKind::Quote => {
            out.push_str(&format!(
                "<blockquote><p>{}</p></blockquote>\n",
                with_line_breaks(block.content.trim())
            ));
        }
        BlockKind::List => {
            let items = block.list_items();
            if items.is_empty() {
                return;
            }
            let tag = match block.list_kind() {
                ListKind::Ordered => "ol",
                ListKind::Unordered => "ul",
            };
            out.push_str(&format!("<{}>\n", tag));
            for item in items {
                out.push_str(&format!("<li>{}</li>\n", html_escape(item)));
            }
            out.push_str(&format!("</{}>\n", tag));
        }
        BlockKind::Image => {
            out.push_str("<figure>\n");
            match image(block) {
                ImageTarget::Src(src) => out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"/>\n",
                    html_escape(&src),
                    html_escape(block.alt().unwrap_or_default())
                )),
                ImageTarget::Placeholder => out.push_str(&format!(
                    "<p class=\"image-placeholder\">{}</p>\n",
                    html_escape(&block.image_placeholder())
                )),
            }
            if let Some(alt) = block.alt() {
                out.push_str(&format!("<figcaption>{}</figcaption>\n", html_escape(alt)));
            }
            out.push_str("</figure>\n");
        }
        BlockKind::Text | BlockKind::Unrecognized(_) => {
            let text = block.content.trim();
            if !text.is_empty() {
                out.push_str(&format!("<p>{}</p>\n", with_line_breaks(text)));
            }
        }
    }
}

/// `<h1>`..`<h6>`; deeper levels keep their level through ARIA.
fn push_heading(out: &mut String, level: u8, text: &str) {
    let text = html_escape(text.trim());
    if level <= 6 {
        out.push_str(&format!("<h{level}>{text}</h{level}>\n"));
    } else {
        out.push_str(&format!(
            "<p role=\"heading\" aria-level=\"{level}\">{text}</p>\n"
        ));
    }
}

fn with_line_breaks(text: &str) -> String {
    text.lines()
        .map(html_escape)
        .collect::<Vec<_>>()
        .join("<br/>\n")
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
