//! Markdown renderer. Output is CommonMark: ATX headings, fenced code, `>` quotes.

use super::{nodes, ExportError, Exporter, Format, Node, Rendered};
use crate::model::{Article, BlockKind, ContentBlock, ListKind, SECTION_HEADING_LEVEL};

/// CommonMark has six heading levels; deeper headings render at this level.
const MAX_ATX_LEVEL: u8 = 6;

#[derive(Debug, Clone, Default)]
pub struct MarkdownExporter;

impl MarkdownExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for MarkdownExporter {
    fn format(&self) -> Format {
        Format::Markdown
    }

    fn render(&self, article: &Article) -> Result<Rendered, ExportError> {
        Ok(Rendered::Text(render_markdown(article)))
    }
}

fn render_markdown(article: &Article) -> String {
    let mut out = String::new();
    push_heading(&mut out, 1, &article.title);
    push_paragraph(&mut out, &article.byline());
    if let Some(tags) = article.tag_line() {
        push_paragraph(&mut out, &tags);
    }
    if let Some(reading_time) = article.reading_time_label() {
        push_paragraph(&mut out, &format!("*{}*", reading_time));
    }
    out.push_str("---\n\n");

    for node in nodes(article) {
        match node {
            Node::SectionTitle(title) => push_heading(&mut out, SECTION_HEADING_LEVEL, title),
            Node::Block(block) => push_block(&mut out, block),
        }
    }

    let end = out.trim_end_matches('\n').len();
    out.truncate(end);
    out.push('\n');
    out
}

fn push_block(out: &mut String, block: &ContentBlock) {
    match block.kind {
        BlockKind::Heading => push_heading(out, block.heading_level(), &block.content),
        BlockKind::Code => push_code(out, &block.content, block.language()),
        BlockKind::Quote => push_quote(out, &block.content),
        BlockKind::List => push_list(out, block),
        BlockKind::Image => push_image(out, block),
        BlockKind::Text | BlockKind::Unrecognized(_) => push_paragraph(out, &block.content),
    }
}

fn push_paragraph(out: &mut String, text: &str) {
    let text = text.trim_end();
    if text.is_empty() {
        return;
    }
    let lines: Vec<String> = text.lines().map(escape_block_start).collect();
    out.push_str(&lines.join("\n"));
    out.push_str("\n\n");
}

/// Backslash-escape a leading marker that would turn `line` into a heading, list, quote, fence,
/// thematic break, setext underline or HTML block. Leading whitespace is dropped; paragraph
/// continuation ignores it anyway.
fn escape_block_start(line: &str) -> String {
    let line = line.trim_start();
    if let Some(delim) = ordered_marker_delimiter(line) {
        return format!("{}\\{}", &line[..delim], &line[delim..]);
    }
    if opens_block(line) {
        return format!("\\{}", line);
    }
    line.to_string()
}

/// Byte offset of the `.` or `)` in a leading ordered-list marker such as `12. ` or `3)`.
fn ordered_marker_delimiter(line: &str) -> Option<usize> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let after = &line[digits..];
    let mut chars = after.chars();
    match (chars.next(), chars.next()) {
        (Some('.' | ')'), None | Some(' ' | '\t')) => Some(digits),
        _ => None,
    }
}

fn opens_block(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let second = chars.next();
    let spaced = matches!(second, None | Some(' ' | '\t'));
    match first {
        '>' => true,
        '-' | '+' | '*' if spaced => true,
        '#' => {
            let hashes = line.chars().take_while(|&c| c == '#').count();
            let after = line[hashes..].chars().next();
            hashes <= 6 && matches!(after, None | Some(' ' | '\t'))
        }
        '`' => line.starts_with("```"),
        '~' => line.starts_with("~~~"),
        '<' => second.is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')),
        '-' | '*' | '_' | '=' => is_rule_line(line, first),
        _ => false,
    }
}

/// A line of one repeated marker (spaces allowed): a thematic break or setext underline.
fn is_rule_line(line: &str, marker: char) -> bool {
    let mut count = 0;
    for c in line.chars() {
        match c {
            ' ' | '\t' => {}
            c if c == marker => count += 1,
            _ => return false,
        }
    }
    matches!(marker, '-' | '=') || count >= 3
}

fn push_heading(out: &mut String, level: u8, text: &str) {
    let hashes = "#".repeat(level.clamp(1, MAX_ATX_LEVEL) as usize);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    out.push_str(&format!("{} {}\n\n", hashes, text));
}

fn push_code(out: &mut String, code: &str, language: Option<&str>) {
    let fence = "`".repeat(fence_len(code));
    out.push_str(&fence);
    if let Some(lang) = language {
        out.push_str(lang);
    }
    out.push('\n');
    let code = code.trim_end_matches('\n');
    if !code.is_empty() {
        out.push_str(code);
        out.push('\n');
    }
    out.push_str(&fence);
    out.push_str("\n\n");
}

/// A fence one backtick longer than the longest backtick run in `code`, at least three.
fn fence_len(code: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    (longest + 1).max(3)
}

fn push_quote(out: &mut String, text: &str) {
    let text = text.trim_end();
    if text.is_empty() {
        return;
    }
    for line in text.lines() {
        if line.trim().is_empty() {
            out.push_str(">\n");
        } else {
            out.push_str("> ");
            out.push_str(&escape_block_start(line));
            out.push('\n');
        }
    }
    out.push('\n');
}

fn push_list(out: &mut String, block: &ContentBlock) {
    let items = block.list_items();
    if items.is_empty() {
        return;
    }
    let ordered = block.list_kind() == ListKind::Ordered;
    for (i, item) in items.iter().enumerate() {
        if ordered {
            out.push_str(&format!("{}. {}\n", i + 1, escape_block_start(item)));
        } else {
            out.push_str(&format!("- {}\n", escape_block_start(item)));
        }
    }
    out.push('\n');
}

fn push_image(out: &mut String, block: &ContentBlock) {
    let src = block.content.trim();
    let target = if src.contains(' ') {
        format!("<{}>", src)
    } else {
        src.to_string()
    };
    out.push_str(&format!(
        "![{}]({})\n\n",
        block.alt().unwrap_or_default(),
        target
    ));
    if let Some(alt) = block.alt() {
        push_paragraph(out, &format!("*{}*", alt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{sample_article, Section};

    fn render(article: &Article) -> String {
        render_markdown(article)
    }

    #[test]
    fn minimal_article_has_title_byline_and_paragraph_only() {
        let article = Article::new("T", "A", "2023-01-01").with_item(ContentBlock::text("hello"));
        let md = render(&article);
        assert_eq!(md, "# T\n\nBy A | 2023-01-01\n\n---\n\nhello\n");
        assert!(!md.contains("min read"));
        assert!(!md.contains("#test"));
    }

    #[test]
    fn header_includes_tags_and_reading_time_in_order() {
        let md = render(&sample_article());
        let byline = md.find("By Sample Author | 2023-01-01").unwrap_or(usize::MAX);
        let tags = md.find("#test, #sample").unwrap_or(usize::MAX);
        let reading = md.find("*5 min read*").unwrap_or(usize::MAX);
        let body = md.find("This is a sample paragraph").unwrap_or(usize::MAX);
        assert!(byline < tags && tags < reading && reading < body);
    }

    #[test]
    fn sections_and_bare_blocks_keep_document_order() {
        let md = render(&sample_article());
        let intro = md.find("This is a sample paragraph").unwrap_or(usize::MAX);
        let section = md.find("# Sample Section").unwrap_or(usize::MAX);
        let inside = md.find("This is text inside a section.").unwrap_or(usize::MAX);
        let code = md.find("```python\nprint('Hello, world!')\n```").unwrap_or(usize::MAX);
        let image = md
            .find("![Sample image](https://example.com/image.jpg)")
            .unwrap_or(usize::MAX);
        assert!(intro < section && section < inside && inside < code && code < image);
        assert!(md.contains("*Sample image*"));
    }

    #[test]
    fn heading_levels_clamp_to_commonmark_range() {
        let article = Article::new("T", "A", "d")
            .with_item(ContentBlock::heading("Zero", 0))
            .with_item(ContentBlock::heading("Deep", 15))
            .with_item(ContentBlock::new(BlockKind::Heading, "Default"));
        let md = render(&article);
        assert!(md.contains("\n# Zero\n"));
        assert!(md.contains("\n###### Deep\n"));
        assert!(md.contains("\n## Default\n"));
    }

    #[test]
    fn list_drops_blank_lines_and_numbers_ordered_items() {
        let article = Article::new("T", "A", "d")
            .with_item(ContentBlock::list("Item 1\n\nItem 2", ListKind::Unordered))
            .with_item(ContentBlock::list("one\ntwo", ListKind::Ordered));
        let md = render(&article);
        assert!(md.contains("- Item 1\n- Item 2\n\n"));
        assert_eq!(md.matches("- Item").count(), 2);
        assert!(md.contains("1. one\n2. two\n"));
    }

    #[test]
    fn quote_prefixes_every_line() {
        let article = Article::new("T", "A", "d").with_item(ContentBlock::quote("first\n\nsecond"));
        assert!(render(&article).contains("> first\n>\n> second\n"));
    }

    #[test]
    fn code_fence_outgrows_backticks_in_content() {
        let article =
            Article::new("T", "A", "d").with_item(ContentBlock::code("use ```fences```", None));
        assert!(render(&article).contains("````\nuse ```fences```\n````"));
    }

    #[test]
    fn unrecognized_kind_renders_as_paragraph() {
        let article = Article::new("T", "A", "d").with_item(ContentBlock::new(
            BlockKind::Unrecognized("embed".to_string()),
            "raw embed text",
        ));
        assert!(render(&article).ends_with("\nraw embed text\n"));
    }

    #[test]
    fn empty_content_still_renders_header() {
        let md = render(&Article::new("", "", ""));
        assert!(md.starts_with("# \n\nBy\n\n---"));
    }

    #[test]
    fn untitled_section_adds_no_heading() {
        let article = Article::new("T", "A", "d")
            .with_item(Section::untitled().with_block(ContentBlock::text("body")));
        let md = render(&article);
        assert_eq!(md.matches("\n# ").count(), 0);
        assert!(md.ends_with("---\n\nbody\n"));
    }

    fn body(md: &str) -> &str {
        md.split_once("---\n\n").map(|(_, rest)| rest).unwrap_or_default()
    }

    fn paragraph(text: &str) -> String {
        body(&render(&Article::new("T", "A", "d").with_item(ContentBlock::text(text)))).to_string()
    }

    #[test]
    fn paragraph_hash_is_not_a_heading() {
        assert_eq!(paragraph("# not a heading"), "\\# not a heading\n");
        assert_eq!(paragraph("###"), "\\###\n");
        assert_eq!(paragraph("#hashtag stays"), "#hashtag stays\n");
        assert_eq!(paragraph("####### seven is text"), "####### seven is text\n");
    }

    #[test]
    fn paragraph_number_is_not_an_ordered_list() {
        assert_eq!(paragraph("1. not a list"), "1\\. not a list\n");
        assert_eq!(paragraph("42) answer"), "42\\) answer\n");
        assert_eq!(paragraph("2024. was a year"), "2024\\. was a year\n");
        assert_eq!(paragraph("3.14 is pi"), "3.14 is pi\n");
    }

    #[test]
    fn paragraph_bullet_is_not_a_list() {
        assert_eq!(paragraph("- dash"), "\\- dash\n");
        assert_eq!(paragraph("+ plus"), "\\+ plus\n");
        assert_eq!(paragraph("* star"), "\\* star\n");
        assert_eq!(paragraph("*emphasis* stays"), "*emphasis* stays\n");
    }

    #[test]
    fn paragraph_angle_is_not_a_quote() {
        assert_eq!(paragraph("> quoted?"), "\\> quoted?\n");
        assert_eq!(paragraph("<div>raw</div>"), "\\<div>raw</div>\n");
        assert_eq!(paragraph("< 3 apples"), "< 3 apples\n");
    }

    #[test]
    fn paragraph_fence_is_not_code() {
        assert_eq!(paragraph("```rust"), "\\```rust\n");
        assert_eq!(paragraph("~~~"), "\\~~~\n");
    }

    #[test]
    fn paragraph_rules_and_underlines_stay_text() {
        assert_eq!(paragraph("Title\n==="), "Title\n\\===\n");
        assert_eq!(paragraph("Title\n---"), "Title\n\\---\n");
        assert_eq!(paragraph("* * *"), "\\* * *\n");
        assert_eq!(paragraph("___"), "\\___\n");
    }

    #[test]
    fn continuation_lines_are_escaped_too() {
        assert_eq!(
            paragraph("first line\n  # second\n1. third"),
            "first line\n\\# second\n1\\. third\n"
        );
    }

    #[test]
    fn quote_and_list_lines_escape_markers() {
        let article = Article::new("T", "A", "d")
            .with_item(ContentBlock::quote("# loud\n> nested"))
            .with_item(ContentBlock::list("- dash\n1. one", ListKind::Unordered))
            .with_item(ContentBlock::list("> arrow", ListKind::Ordered));
        let md = body(&render(&article)).to_string();
        assert!(md.contains("> \\# loud\n> \\> nested\n"));
        assert!(md.contains("- \\- dash\n- 1\\. one\n"));
        assert!(md.contains("1. \\> arrow\n"));
    }

    #[test]
    fn header_lines_keep_their_markup() {
        let md = render(&sample_article());
        assert!(md.contains("\n#test, #sample\n"));
        assert!(md.contains("\n*5 min read*\n"));
    }

    #[test]
    fn render_is_deterministic() {
        let article = sample_article();
        assert_eq!(render(&article), render(&article));
    }
}
