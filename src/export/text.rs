//! Plain-text renderer.

use super::{nodes, ExportError, Exporter, Format, Node, Rendered};
use crate::model::{Article, BlockKind, ContentBlock, SECTION_HEADING_LEVEL};

#[derive(Debug, Clone, Default)]
pub struct TextExporter;

impl TextExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for TextExporter {
    fn format(&self) -> Format {
        Format::Text
    }

    fn render(&self, article: &Article) -> Result<Rendered, ExportError> {
        Ok(Rendered::Text(render_text(article)))
    }
}

fn render_text(article: &Article) -> String {
    let mut out = String::new();
    let title = article.title.to_uppercase();
    out.push_str(&title);
    out.push('\n');
    out.push_str(&underline(&title, '='));
    out.push_str("\n\n");
    out.push_str(&article.byline());
    out.push('\n');
    if let Some(tags) = article.tag_line() {
        out.push_str(&tags);
        out.push('\n');
    }
    if let Some(reading_time) = article.reading_time_label() {
        out.push_str(&reading_time);
        out.push('\n');
    }
    out.push('\n');

    for node in nodes(article) {
        match node {
            Node::SectionTitle(title) => push_heading(&mut out, SECTION_HEADING_LEVEL, title),
            Node::Block(block) => push_block(&mut out, block),
        }
    }

    let end = out.trim_end().len();
    out.truncate(end);
    out.push('\n');
    out
}

fn underline(text: &str, c: char) -> String {
    c.to_string().repeat(text.chars().count().max(3))
}

fn push_heading(out: &mut String, level: u8, text: &str) {
    let text = text.trim();
    match level {
        1 => {
            out.push_str(text);
            out.push('\n');
            out.push_str(&underline(text, '='));
        }
        2 => {
            out.push_str(text);
            out.push('\n');
            out.push_str(&underline(text, '-'));
        }
        _ => out.push_str(&text.to_uppercase()),
    }
    out.push_str("\n\n");
}

fn push_block(out: &mut String, block: &ContentBlock) {
    match block.kind {
        BlockKind::Heading => push_heading(out, block.heading_level(), &block.content),
        BlockKind::Code => {
            for line in block.content.trim_end_matches('\n').lines() {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        BlockKind::Quote => {
            let text = block.content.trim();
            if !text.is_empty() {
                out.push_str(&format!("\"{}\"\n\n", text));
            }
        }
        BlockKind::List => {
            let items = block.list_items();
            if items.is_empty() {
                return;
            }
            for item in &items {
                out.push_str(&format!("- {}\n", item));
            }
            out.push('\n');
        }
        BlockKind::Image => {
            out.push_str(&block.image_placeholder());
            out.push('\n');
            if let Some(alt) = block.alt() {
                out.push_str(alt);
                out.push('\n');
            }
            out.push('\n');
        }
        BlockKind::Text | BlockKind::Unrecognized(_) => {
            let text = block.content.trim_end();
            if !text.is_empty() {
                out.push_str(text);
                out.push_str("\n\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{sample_article, ListKind};

    #[test]
    fn header_has_underlined_title_byline_tags_and_reading_time() {
        let text = render_text(&sample_article());
        assert!(text.starts_with(
            "SAMPLE ARTICLE TITLE\n====================\n\nBy Sample Author | 2023-01-01\n#test, #sample\n5 min read\n\n"
        ));
    }

    #[test]
    fn minimal_article_omits_optional_header_lines() {
        let article = Article::new("T", "A", "2023-01-01").with_item(ContentBlock::text("hello"));
        assert_eq!(
            render_text(&article),
            "T\n===\n\nBy A | 2023-01-01\n\nhello\n"
        );
    }

    #[test]
    fn blocks_render_in_order_with_plain_markers() {
        let text = render_text(&sample_article());
        let intro = text.find("This is a sample paragraph").unwrap_or(usize::MAX);
        let section = text
            .find("Sample Section\n==============")
            .unwrap_or(usize::MAX);
        let code = text.find("    print('Hello, world!')").unwrap_or(usize::MAX);
        let image = text.find("[Image: Sample image]\nSample image").unwrap_or(usize::MAX);
        assert!(intro < section && section < code && code < image);
    }

    #[test]
    fn headings_lists_and_quotes() {
        let article = Article::new("T", "A", "d")
            .with_item(ContentBlock::heading("Sub", 2))
            .with_item(ContentBlock::heading("Minor", 5))
            .with_item(ContentBlock::list("a\n\nb", ListKind::Unordered))
            .with_item(ContentBlock::list("x\ny", ListKind::Ordered))
            .with_item(ContentBlock::quote("wise words"));
        let text = render_text(&article);
        assert!(text.contains("Sub\n---\n\n"));
        assert!(text.contains("MINOR\n\n"));
        assert!(text.contains("- a\n- b\n\n"));
        assert!(text.contains("- x\n- y\n\n"));
        assert!(!text.contains("1. x"));
        assert!(text.ends_with("\"wise words\"\n"));
    }

    #[test]
    fn image_without_alt_uses_generic_placeholder() {
        let article = Article::new("T", "A", "d")
            .with_item(ContentBlock::image("https://example.com/x.png", None));
        assert!(render_text(&article).ends_with("[Image: Image]\n"));
    }
}
